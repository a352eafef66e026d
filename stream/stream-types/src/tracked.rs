//! Flat, mutable recording model: tracked frames and frame lists.
//!
//! This is the shape recordings take outside the real-time ring buffer: the
//! editor mutates it in place and the buffer's bulk loaders consume it.

use nalgebra::Matrix4;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::fields::{FieldMap, RESERVED_FIELD_FRAME_NUMBER, RESERVED_FIELD_TIMESTAMP,
    RESERVED_FIELD_UNFILTERED_TIMESTAMP};
use crate::frame::PixelFrame;
use crate::status::FieldStatus;
use crate::transform_name::TransformName;
use crate::Result;

/// One recorded frame: optional pixel data plus its field map.
///
/// Timestamps and the frame number live in the field map under the reserved
/// keys, exactly as recordings store them; the accessors below parse them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackedFrame {
    /// Pixel data, absent for tracking-only recordings.
    pub image: Option<PixelFrame>,
    /// String fields, including encoded transforms and the reserved axes.
    pub fields: FieldMap,
}

impl TrackedFrame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The filtered timestamp, if recorded.
    #[must_use]
    pub fn timestamp(&self) -> Option<f64> {
        self.fields.get_f64(RESERVED_FIELD_TIMESTAMP).ok()
    }

    /// Sets the filtered timestamp field.
    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.fields
            .set(RESERVED_FIELD_TIMESTAMP, format!("{timestamp}"));
    }

    /// The unfiltered timestamp, if recorded.
    #[must_use]
    pub fn unfiltered_timestamp(&self) -> Option<f64> {
        self.fields.get_f64(RESERVED_FIELD_UNFILTERED_TIMESTAMP).ok()
    }

    /// Sets the unfiltered timestamp field.
    pub fn set_unfiltered_timestamp(&mut self, timestamp: f64) {
        self.fields
            .set(RESERVED_FIELD_UNFILTERED_TIMESTAMP, format!("{timestamp}"));
    }

    /// The producer-supplied frame number, if recorded.
    #[must_use]
    pub fn frame_number(&self) -> Option<u64> {
        self.fields.get_u64(RESERVED_FIELD_FRAME_NUMBER).ok()
    }

    /// Sets the frame number field.
    pub fn set_frame_number(&mut self, number: u64) {
        self.fields
            .set(RESERVED_FIELD_FRAME_NUMBER, format!("{number}"));
    }

    /// Reads a transform from the field map.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] if absent or malformed.
    pub fn transform(&self, name: &TransformName) -> Result<Matrix4<f64>> {
        self.fields.transform(name)
    }

    /// Stores a transform and its status in the field map.
    pub fn set_transform(
        &mut self,
        name: &TransformName,
        matrix: &Matrix4<f64>,
        status: FieldStatus,
    ) {
        self.fields.set_transform(name, matrix, status);
    }

    /// The status of a stored transform.
    #[must_use]
    pub fn transform_status(&self, name: &TransformName) -> Option<FieldStatus> {
        self.fields.transform_status(name)
    }

    /// Names of all transforms stored on this frame.
    #[must_use]
    pub fn transform_names(&self) -> Vec<TransformName> {
        self.fields.transform_names()
    }
}

/// An ordered, mutable list of tracked frames plus recording-level fields.
///
/// # Example
///
/// ```
/// use stream_types::{TrackedFrame, TrackedFrameList};
///
/// let mut list = TrackedFrameList::new();
/// let mut frame = TrackedFrame::new();
/// frame.set_timestamp(0.5);
/// list.push(frame);
///
/// assert_eq!(list.len(), 1);
/// assert_eq!(list.frame(0).unwrap().timestamp(), Some(0.5));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackedFrameList {
    frames: Vec<TrackedFrame>,
    /// Recording-level custom fields (apply to the whole list).
    pub custom_fields: FieldMap,
}

impl TrackedFrameList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the list holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Appends a frame.
    pub fn push(&mut self, frame: TrackedFrame) {
        self.frames.push(frame);
    }

    /// Gets a frame by position.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&TrackedFrame> {
        self.frames.get(index)
    }

    /// Gets a mutable frame by position.
    pub fn frame_mut(&mut self, index: usize) -> Option<&mut TrackedFrame> {
        self.frames.get_mut(index)
    }

    /// Iterates over the frames.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedFrame> {
        self.frames.iter()
    }

    /// Iterates mutably over the frames.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedFrame> {
        self.frames.iter_mut()
    }

    /// Appends all frames of `other`, in order.
    pub fn extend_from(&mut self, other: TrackedFrameList) {
        self.frames.extend(other.frames);
    }

    /// Removes the frames in positions `[first, last]` (inclusive).
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidArgument`] if the range is empty or out
    /// of bounds.
    pub fn remove_range(&mut self, first: usize, last: usize) -> Result<()> {
        if first > last || last >= self.frames.len() {
            return Err(FormatError::invalid_argument(format!(
                "invalid frame range ({first}, {last}) for a list of {} frames",
                self.frames.len()
            )));
        }
        self.frames.drain(first..=last);
        Ok(())
    }

    /// Keeps only the frames selected by the predicate (by position).
    pub fn retain_positions(&mut self, mut keep: impl FnMut(usize) -> bool) {
        let mut index = 0;
        self.frames.retain(|_| {
            let kept = keep(index);
            index += 1;
            kept
        });
    }
}

impl FromIterator<TrackedFrame> for TrackedFrameList {
    fn from_iter<I: IntoIterator<Item = TrackedFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
            custom_fields: FieldMap::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn frame_with_timestamp(ts: f64) -> TrackedFrame {
        let mut frame = TrackedFrame::new();
        frame.set_timestamp(ts);
        frame
    }

    #[test]
    fn reserved_axis_round_trip() {
        let mut frame = TrackedFrame::new();
        frame.set_timestamp(1.5);
        frame.set_unfiltered_timestamp(1.45);
        frame.set_frame_number(7);

        assert_eq!(frame.timestamp(), Some(1.5));
        assert_eq!(frame.unfiltered_timestamp(), Some(1.45));
        assert_eq!(frame.frame_number(), Some(7));
    }

    #[test]
    fn absent_axes_are_none() {
        let frame = TrackedFrame::new();
        assert_eq!(frame.timestamp(), None);
        assert_eq!(frame.frame_number(), None);
    }

    #[test]
    fn list_push_and_get() {
        let mut list = TrackedFrameList::new();
        list.push(frame_with_timestamp(0.0));
        list.push(frame_with_timestamp(0.1));

        assert_eq!(list.len(), 2);
        assert_eq!(list.frame(1).unwrap().timestamp(), Some(0.1));
        assert!(list.frame(2).is_none());
    }

    #[test]
    fn remove_range_inclusive() {
        let mut list: TrackedFrameList =
            (0..10).map(|i| frame_with_timestamp(f64::from(i))).collect();
        list.remove_range(6, 9).unwrap();
        list.remove_range(0, 1).unwrap();

        assert_eq!(list.len(), 4);
        assert_eq!(list.frame(0).unwrap().timestamp(), Some(2.0));
        assert_eq!(list.frame(3).unwrap().timestamp(), Some(5.0));
    }

    #[test]
    fn remove_range_rejects_bad_bounds() {
        let mut list: TrackedFrameList =
            (0..3).map(|i| frame_with_timestamp(f64::from(i))).collect();
        assert!(list.remove_range(2, 1).is_err());
        assert!(list.remove_range(0, 3).is_err());
    }

    #[test]
    fn retain_positions_keeps_selected() {
        let mut list: TrackedFrameList =
            (0..10).map(|i| frame_with_timestamp(f64::from(i))).collect();
        list.retain_positions(|i| i % 3 == 0);

        assert_eq!(list.len(), 4);
        assert_eq!(list.frame(3).unwrap().timestamp(), Some(9.0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn list_serialization_round_trip() {
        let mut list: TrackedFrameList =
            (0..3).map(|i| frame_with_timestamp(f64::from(i))).collect();
        list.custom_fields.set("Device", "demo");

        let json = serde_json::to_string(&list).unwrap();
        let restored: TrackedFrameList = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, list);
    }

    #[test]
    fn extend_appends_in_order() {
        let mut a: TrackedFrameList =
            (0..2).map(|i| frame_with_timestamp(f64::from(i))).collect();
        let b: TrackedFrameList =
            (2..4).map(|i| frame_with_timestamp(f64::from(i))).collect();
        a.extend_from(b);

        assert_eq!(a.len(), 4);
        assert_eq!(a.frame(2).unwrap().timestamp(), Some(2.0));
    }
}
