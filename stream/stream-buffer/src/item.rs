//! One slot of the timestamped ring.

use nalgebra::Matrix4;

use stream_types::{FieldMap, FrameFormat, PixelFrame, ToolStatus};

use crate::error::Result;

/// Monotonic 64-bit identifier assigned at admission; stable across ring wrap.
pub type Uid = u64;

/// The payload carried by one buffer slot.
///
/// Slots are created once when the buffer's capacity or frame format is
/// configured, re-initialized on each admission, and overwritten in FIFO
/// order when the ring wraps. The pixel buffer is pre-allocated to the
/// buffer's frame format so the admission hot path never allocates.
///
/// Timestamps are stored on the device-local clock; the accessors take the
/// buffer's local-time offset so consumers see shared (global) time.
#[derive(Debug, Clone)]
pub struct StreamItem {
    uid: Uid,
    /// Producer-supplied sequence index.
    index: u64,
    filtered_timestamp: f64,
    unfiltered_timestamp: f64,
    status: ToolStatus,
    matrix: Matrix4<f64>,
    frame: PixelFrame,
    fields: FieldMap,
    valid_transform: bool,
    valid_video: bool,
    valid_fields: bool,
}

impl Default for StreamItem {
    fn default() -> Self {
        Self {
            uid: 0,
            index: 0,
            filtered_timestamp: 0.0,
            unfiltered_timestamp: 0.0,
            status: ToolStatus::Ok,
            matrix: Matrix4::identity(),
            frame: PixelFrame::default(),
            fields: FieldMap::new(),
            valid_transform: false,
            valid_video: false,
            valid_fields: false,
        }
    }
}

impl StreamItem {
    /// Creates an empty slot with a pixel buffer sized for `format`.
    ///
    /// # Errors
    ///
    /// Propagates allocation failures for degenerate geometries.
    pub fn with_format(format: &FrameFormat) -> Result<Self> {
        Ok(Self {
            frame: PixelFrame::allocate(format)?,
            ..Self::default()
        })
    }

    /// Re-initializes everything except the pixel allocation.
    ///
    /// The previous pixel content is intentionally kept: fields-only
    /// admissions leave the image untouched and consumers are expected to
    /// check [`StreamItem::has_valid_video`].
    pub fn reset_for_reuse(&mut self) {
        self.uid = 0;
        self.index = 0;
        self.filtered_timestamp = 0.0;
        self.unfiltered_timestamp = 0.0;
        self.status = ToolStatus::Ok;
        self.matrix = Matrix4::identity();
        self.fields.clear();
        self.valid_transform = false;
        self.valid_video = false;
        self.valid_fields = false;
    }

    /// The unique identifier assigned at admission.
    #[must_use]
    pub const fn uid(&self) -> Uid {
        self.uid
    }

    pub(crate) fn set_uid(&mut self, uid: Uid) {
        self.uid = uid;
    }

    /// The producer-supplied sequence index.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u64) {
        self.index = index;
    }

    /// The filtered timestamp on the shared clock (`local + offset`).
    #[must_use]
    pub fn filtered_timestamp(&self, local_time_offset_sec: f64) -> f64 {
        self.filtered_timestamp + local_time_offset_sec
    }

    /// The filtered timestamp on the device-local clock.
    #[must_use]
    pub const fn filtered_timestamp_local(&self) -> f64 {
        self.filtered_timestamp
    }

    pub(crate) fn set_filtered_timestamp(&mut self, timestamp: f64) {
        self.filtered_timestamp = timestamp;
    }

    /// The unfiltered (raw arrival) timestamp on the shared clock.
    #[must_use]
    pub fn unfiltered_timestamp(&self, local_time_offset_sec: f64) -> f64 {
        self.unfiltered_timestamp + local_time_offset_sec
    }

    /// The unfiltered timestamp on the device-local clock.
    #[must_use]
    pub const fn unfiltered_timestamp_local(&self) -> f64 {
        self.unfiltered_timestamp
    }

    pub(crate) fn set_unfiltered_timestamp(&mut self, timestamp: f64) {
        self.unfiltered_timestamp = timestamp;
    }

    /// Liveness/validity of the pose carried by this item.
    #[must_use]
    pub const fn status(&self) -> ToolStatus {
        self.status
    }

    /// Overrides the status (used by validity substitution on queries).
    pub fn set_status(&mut self, status: ToolStatus) {
        self.status = status;
    }

    /// The 4x4 pose matrix (identity when no pose was admitted).
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub(crate) fn set_matrix(&mut self, matrix: &Matrix4<f64>) {
        self.matrix.copy_from(matrix);
        self.valid_transform = true;
    }

    /// The pixel frame (previous content when no video was admitted).
    #[must_use]
    pub const fn frame(&self) -> &PixelFrame {
        &self.frame
    }

    pub(crate) fn frame_mut(&mut self) -> &mut PixelFrame {
        &mut self.frame
    }

    pub(crate) fn set_valid_video(&mut self, valid: bool) {
        self.valid_video = valid;
    }

    /// The custom field map.
    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Copies custom fields into the slot. A field name containing
    /// `"Transform"` marks the transform data valid.
    pub(crate) fn copy_fields_from(&mut self, fields: &FieldMap) {
        for (name, value) in fields.iter() {
            self.fields.set(name, value);
            if name.contains("Transform") {
                self.valid_transform = true;
            }
        }
        if !fields.is_empty() {
            self.valid_fields = true;
        }
    }

    /// True when the item carries pixel data written by a video admission.
    #[must_use]
    pub const fn has_valid_video(&self) -> bool {
        self.valid_video
    }

    /// True when the item carries usable transform data.
    #[must_use]
    pub const fn has_valid_transform(&self) -> bool {
        self.valid_transform
    }

    /// True when the item carries custom fields.
    #[must_use]
    pub const fn has_valid_fields(&self) -> bool {
        self.valid_fields
    }
}
