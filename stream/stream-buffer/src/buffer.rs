//! The bounded, time-indexed acquisition buffer.

use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use nalgebra::Matrix4;
use tracing::{debug, info, warn};

use stream_types::{
    is_reserved_field, ClipRect, FieldMap, FlipInfo, FrameFormat, FrameSize, ImageOrientation,
    ImageType, PixelType, ToolStatus, TrackedFrameList, TransformName, Transpose,
};

use crate::error::{BufferError, Result};
use crate::interp::{interpolate_rigid, orientation_difference_deg};
use crate::item::{StreamItem, Uid};
use crate::ring::{TimestampReportEntry, TimestampedRing};
use crate::{ANGLE_INTERPOLATION_WARNING_THRESHOLD_DEG, NEGLIGIBLE_TIME_DIFFERENCE_SEC};

/// Default ring capacity: a few seconds of data at typical frame rates
/// without holding on to an unbounded amount of pixel memory.
const DEFAULT_CAPACITY: usize = 150;

/// Default largest time gap interpolation is allowed to bridge (seconds).
const DEFAULT_MAX_ALLOWED_TIME_DIFFERENCE_SEC: f64 = 0.5;

/// Monotonic clock sample used when producers supply no timestamp.
fn system_time_sec() -> f64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// A borrowed video payload offered for admission.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrameInput<'a> {
    /// Pixel bytes, starting `skip_bytes` before the first pixel.
    pub bytes: &'a [u8],
    /// Orientation the payload is stored in.
    pub orientation: ImageOrientation,
    /// Payload geometry.
    pub size: FrameSize,
    /// Scalar type of each component.
    pub pixel_type: PixelType,
    /// Components per pixel.
    pub components: u32,
    /// Acquisition modality.
    pub image_type: ImageType,
    /// Header bytes to skip before the first pixel.
    pub skip_bytes: usize,
}

/// How `get_by_time` resolves the requested time to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalMode {
    /// The item's filtered timestamp must match within the negligible window.
    Exact,
    /// The item whose filtered timestamp is closest; ties prefer later items.
    Closest,
    /// SLERP/linear interpolation between the two bracketing items.
    Interpolated,
}

/// Which timestamp fields a bulk load reads, and whether the filter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampPolicy {
    /// Require both recorded timestamps and use them as-is.
    ReadFilteredAndUnfiltered,
    /// Require the unfiltered timestamp and recompute filtered ones.
    ReadUnfilteredComputeFiltered,
    /// Require the filtered timestamp and use it for both axes.
    ReadFilteredIgnoreUnfiltered,
}

impl TimestampPolicy {
    const fn requires_timestamp(self) -> bool {
        matches!(
            self,
            Self::ReadFilteredAndUnfiltered | Self::ReadFilteredIgnoreUnfiltered
        )
    }

    const fn requires_unfiltered(self) -> bool {
        matches!(
            self,
            Self::ReadFilteredAndUnfiltered | Self::ReadUnfilteredComputeFiltered
        )
    }

    const fn requires_frame_number(self) -> bool {
        matches!(self, Self::ReadUnfilteredComputeFiltered)
    }
}

#[derive(Debug)]
struct BufferCore {
    ring: TimestampedRing,
    format: FrameFormat,
    max_allowed_time_difference_sec: f64,
    name: Option<String>,
}

impl BufferCore {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("stream")
    }
}

/// Bounded, time-indexed store for tracked image and pose streams.
///
/// A single mutex serializes admission, query, resize, and inspection; the
/// lock is held for the full duration of each operation, including the
/// payload copy into (or out of) the pre-allocated slot.
///
/// # Silent drop on rejected filtered timestamps
///
/// When no filtered timestamp is supplied, the timestamp filter derives one.
/// If the filter judges the sample spurious the admission returns `Ok(None)`:
/// the call **succeeds but inserts nothing**, because producer sequence
/// numbers occasionally glitch and admitting such an item would break the
/// monotonic time axis. Callers that need to know whether an item landed
/// must check the returned option.
///
/// # Example
///
/// ```
/// use nalgebra::Matrix4;
/// use stream_buffer::{RetrievalMode, StreamBuffer};
/// use stream_types::ToolStatus;
///
/// let buffer = StreamBuffer::new();
/// for i in 0..4u64 {
///     let t = 0.1 * i as f64;
///     buffer
///         .add_pose(&Matrix4::identity(), ToolStatus::Ok, i, Some(t), Some(t), None)
///         .unwrap();
/// }
/// assert_eq!(buffer.len(), 4);
///
/// let item = buffer.get_by_time(0.2, RetrievalMode::Closest).unwrap();
/// assert_eq!(item.index(), 2);
/// ```
#[derive(Debug)]
pub struct StreamBuffer {
    core: Mutex<BufferCore>,
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBuffer {
    /// Creates a buffer with the default capacity and an empty frame format.
    ///
    /// Call [`StreamBuffer::set_frame_format`] before admitting video.
    #[must_use]
    pub fn new() -> Self {
        let format = FrameFormat::default();
        // An empty format allocates zero-byte frames; this cannot fail.
        #[allow(clippy::unwrap_used)]
        let ring = TimestampedRing::new(DEFAULT_CAPACITY, &format).unwrap();
        Self {
            core: Mutex::new(BufferCore {
                ring,
                format,
                max_allowed_time_difference_sec: DEFAULT_MAX_ALLOWED_TIME_DIFFERENCE_SEC,
                name: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches a descriptive name used in log events.
    pub fn set_descriptive_name(&self, name: impl Into<String>) {
        self.lock().name = Some(name.into());
    }

    // ---------------------------------------------------------------- format

    /// Declares the frame format; every slot buffer is re-allocated and all
    /// stored content is invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Allocation`] for degenerate geometries.
    pub fn set_frame_format(&self, format: FrameFormat) -> Result<()> {
        let mut core = self.lock();
        core.format = format;
        core.ring.reallocate_frames(&format)
    }

    /// The declared frame format.
    #[must_use]
    pub fn frame_format(&self) -> FrameFormat {
        self.lock().format
    }

    /// Re-allocates the ring with a new slot count; content is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidArgument`] for a zero capacity.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        let mut core = self.lock();
        let format = core.format;
        core.ring.set_capacity(capacity, &format)
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().ring.capacity()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().ring.len()
    }

    /// True when no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().ring.is_empty()
    }

    /// Forgets all items; UIDs restart from 0.
    pub fn clear(&self) {
        self.lock().ring.clear();
    }

    /// UID of the oldest retained item.
    #[must_use]
    pub fn oldest_uid(&self) -> Option<Uid> {
        self.lock().ring.oldest_uid()
    }

    /// UID of the latest admitted item.
    #[must_use]
    pub fn latest_uid(&self) -> Option<Uid> {
        self.lock().ring.latest_uid()
    }

    // ------------------------------------------------------------------ time

    /// Sets the device-to-shared clock offset (seconds).
    pub fn set_local_time_offset_sec(&self, offset: f64) {
        self.lock().ring.set_local_time_offset_sec(offset);
    }

    /// The device-to-shared clock offset (seconds).
    #[must_use]
    pub fn local_time_offset_sec(&self) -> f64 {
        self.lock().ring.local_time_offset_sec()
    }

    /// Sets the largest time gap interpolation may bridge (seconds).
    pub fn set_max_allowed_time_difference_sec(&self, max_diff: f64) {
        self.lock().max_allowed_time_difference_sec = max_diff;
    }

    /// The largest time gap interpolation may bridge (seconds).
    #[must_use]
    pub fn max_allowed_time_difference_sec(&self) -> f64 {
        self.lock().max_allowed_time_difference_sec
    }

    /// Resizes the timestamp filter window (0 disables filtering); older
    /// window entries are truncated, the most recent kept.
    pub fn set_averaged_items_for_filtering(&self, count: usize) {
        self.lock().ring.filter.set_window_size(count);
    }

    /// Anchors the timestamp filter's reference time.
    pub fn set_start_time(&self, start_time: f64) {
        self.lock().ring.filter.set_start_time(start_time);
    }

    /// Enables or disables the timestamp report table.
    pub fn set_timestamp_reporting(&self, enabled: bool) {
        self.lock().ring.set_timestamp_reporting(enabled);
    }

    /// True when the timestamp report table is being recorded.
    #[must_use]
    pub fn timestamp_reporting(&self) -> bool {
        self.lock().ring.timestamp_reporting()
    }

    /// Drains the accumulated timestamp report.
    #[must_use]
    pub fn take_timestamp_report(&self) -> Vec<TimestampReportEntry> {
        self.lock().ring.take_report()
    }

    // ------------------------------------------------------------- admission

    /// Admits a video frame.
    ///
    /// The payload is validated against the buffer's frame format (after
    /// clipping and any orientation transpose), then copied into the claimed
    /// slot's pre-allocated pixel buffer.
    ///
    /// Returns the UID of the admitted item, or `None` when the timestamp
    /// filter judged the sample spurious (see the type-level documentation).
    ///
    /// # Errors
    ///
    /// - [`BufferError::EmptyPayload`] when no pixel data remains after
    ///   `skip_bytes`
    /// - [`BufferError::FormatMismatch`] when the output geometry, pixel
    ///   type, component count, or image type disagrees with the buffer
    /// - [`BufferError::TimestampRegression`] when the filtered timestamp
    ///   does not advance
    pub fn add_video(
        &self,
        input: &VideoFrameInput<'_>,
        index: u64,
        clip: Option<ClipRect>,
        unfiltered_ts: Option<f64>,
        filtered_ts: Option<f64>,
        fields: Option<&FieldMap>,
    ) -> Result<Option<Uid>> {
        let mut core = self.lock();

        let Some((unfiltered, filtered)) =
            resolve_timestamps(&mut core, index, unfiltered_ts, filtered_ts)?
        else {
            return Ok(None);
        };

        let payload_bytes = input
            .size
            .pixel_count()
            .and_then(|px| px.checked_mul(
                input.pixel_type.bytes_per_scalar() * input.components as usize,
            ))
            .ok_or_else(|| BufferError::Allocation("input geometry overflow".into()))?;
        let available = input.bytes.len().saturating_sub(input.skip_bytes);
        if payload_bytes == 0 || available < payload_bytes {
            return Err(BufferError::EmptyPayload {
                skipped: input.skip_bytes,
            });
        }

        let flip = FlipInfo::between(input.orientation, core.format.orientation);

        // Every check runs before the slot is claimed; a refused frame must
        // leave the buffer untouched.
        if let Some(rect) = &clip {
            rect.validate_within(input.size)?;
        }
        let mut out_size = clip.map_or(input.size, |rect| rect.output_size());
        if flip.transpose == Transpose::IjkToKij {
            out_size = out_size.rotated_kij();
        }

        if out_size != core.format.size
            || input.pixel_type != core.format.pixel_type
            || input.components != core.format.components
            || input.image_type != core.format.image_type
        {
            let expected = describe_format(&core.format);
            let actual = format!(
                "{} {} x{} {}",
                out_size,
                input.pixel_type.name(),
                input.components,
                input.image_type.as_str()
            );
            warn!(
                buffer = core.name(),
                %expected,
                %actual,
                "rejecting frame: format mismatch"
            );
            return Err(BufferError::format_mismatch(expected, actual));
        }

        let (uid, slot) = match core.ring.prepare_new_item(filtered) {
            Ok(claimed) => claimed,
            Err(err) => {
                debug!(buffer = core.name(), %err, "cannot claim slot for video frame");
                return Err(err);
            }
        };

        let image_type = input.image_type;
        let orientation = core.format.orientation;
        let item = core
            .ring
            .item_at_slot_mut(slot)
            .ok_or_else(|| BufferError::invalid_argument("slot index out of range"))?;
        item.frame_mut()
            .oriented_copy_from(
                &input.bytes[input.skip_bytes..],
                input.size,
                &flip,
                clip.as_ref(),
            )?;
        item.frame_mut().set_image_type(image_type);
        item.frame_mut().set_orientation(orientation);
        item.set_filtered_timestamp(filtered);
        item.set_unfiltered_timestamp(unfiltered);
        item.set_index(index);
        item.set_valid_video(true);
        if let Some(fields) = fields {
            item.copy_fields_from(fields);
        }
        Ok(Some(uid))
    }

    /// Admits a tracked pose.
    ///
    /// The matrix is deep-copied into the claimed slot; no image copy or
    /// geometry check takes place. Returns the UID, or `None` on a filtered
    /// timestamp rejection.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::TimestampRegression`] when the filtered
    /// timestamp does not advance.
    pub fn add_pose(
        &self,
        matrix: &Matrix4<f64>,
        status: ToolStatus,
        index: u64,
        unfiltered_ts: Option<f64>,
        filtered_ts: Option<f64>,
        fields: Option<&FieldMap>,
    ) -> Result<Option<Uid>> {
        let mut core = self.lock();

        let Some((unfiltered, filtered)) =
            resolve_timestamps(&mut core, index, unfiltered_ts, filtered_ts)?
        else {
            return Ok(None);
        };

        let (uid, slot) = match core.ring.prepare_new_item(filtered) {
            Ok(claimed) => claimed,
            Err(err) => {
                debug!(buffer = core.name(), %err, "cannot claim slot for pose");
                return Err(err);
            }
        };

        let item = core
            .ring
            .item_at_slot_mut(slot)
            .ok_or_else(|| BufferError::invalid_argument("slot index out of range"))?;
        item.set_matrix(matrix);
        item.set_status(status);
        item.set_filtered_timestamp(filtered);
        item.set_unfiltered_timestamp(unfiltered);
        item.set_index(index);
        if let Some(fields) = fields {
            item.copy_fields_from(fields);
        }
        Ok(Some(uid))
    }

    /// Admits a fields-only item.
    ///
    /// The matrix stays identity and the slot's previous pixel content is
    /// left untouched; consumers check the item's validity flags. An empty
    /// field map is accepted and inserts nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::TimestampRegression`] when the filtered
    /// timestamp does not advance.
    pub fn add_fields(
        &self,
        fields: &FieldMap,
        index: u64,
        unfiltered_ts: Option<f64>,
        filtered_ts: Option<f64>,
    ) -> Result<Option<Uid>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let mut core = self.lock();

        let Some((unfiltered, filtered)) =
            resolve_timestamps(&mut core, index, unfiltered_ts, filtered_ts)?
        else {
            return Ok(None);
        };

        let (uid, slot) = match core.ring.prepare_new_item(filtered) {
            Ok(claimed) => claimed,
            Err(err) => {
                debug!(buffer = core.name(), %err, "cannot claim slot for fields");
                return Err(err);
            }
        };

        let item = core
            .ring
            .item_at_slot_mut(slot)
            .ok_or_else(|| BufferError::invalid_argument("slot index out of range"))?;
        item.set_filtered_timestamp(filtered);
        item.set_unfiltered_timestamp(unfiltered);
        item.set_index(index);
        item.copy_fields_from(fields);
        Ok(Some(uid))
    }

    // --------------------------------------------------------------- queries

    /// Returns a deep copy of the item with the given UID.
    ///
    /// # Errors
    ///
    /// [`BufferError::NotAvailableYet`] beyond the latest UID,
    /// [`BufferError::NotAvailableAnymore`] before the oldest.
    pub fn get_by_uid(&self, uid: Uid) -> Result<StreamItem> {
        Ok(self.lock().ring.item(uid)?.clone())
    }

    /// Resolves a time (shared clock) to an item copy using the given mode.
    ///
    /// # Errors
    ///
    /// - [`BufferError::NoExactMatch`] in exact mode when no item lies within
    ///   the negligible-time window
    /// - out-of-range errors when the buffer is empty
    ///
    /// In interpolated mode, when the two bracketing items cannot both be
    /// used (neighbor missing, invalid, or too far) the closest item is
    /// returned with its status forced to [`ToolStatus::Missing`] and both
    /// timestamps set to the requested time; this mirrors how trackers
    /// report a momentarily invisible tool.
    pub fn get_by_time(&self, time: f64, mode: RetrievalMode) -> Result<StreamItem> {
        let core = self.lock();
        match mode {
            RetrievalMode::Closest => closest_item(&core, time),
            RetrievalMode::Exact => {
                let item = closest_item(&core, time)?;
                let item_time = item.filtered_timestamp(core.ring.local_time_offset_sec());
                if (item_time - time).abs() > NEGLIGIBLE_TIME_DIFFERENCE_SEC {
                    debug!(
                        buffer = core.name(),
                        requested = time,
                        closest = item_time,
                        "no exact item at requested time"
                    );
                    return Err(BufferError::NoExactMatch {
                        requested: time,
                        closest: item_time,
                    });
                }
                Ok(item)
            }
            RetrievalMode::Interpolated => interpolated_item(&core, time),
        }
    }

    /// Filtered timestamp (shared clock) of the latest item.
    ///
    /// # Errors
    ///
    /// Fails with an out-of-range error when the buffer is empty.
    pub fn latest_timestamp(&self) -> Result<f64> {
        let core = self.lock();
        let uid = core
            .ring
            .latest_uid()
            .ok_or(BufferError::NotAvailableYet { uid: 0 })?;
        core.ring.uid_to_timestamp(uid)
    }

    /// Filtered timestamp (shared clock) of the oldest retained item.
    ///
    /// # Errors
    ///
    /// Fails with an out-of-range error when the buffer is empty.
    pub fn oldest_timestamp(&self) -> Result<f64> {
        let core = self.lock();
        let uid = core
            .ring
            .oldest_uid()
            .ok_or(BufferError::NotAvailableYet { uid: 0 })?;
        core.ring.uid_to_timestamp(uid)
    }

    /// Filtered timestamp (shared clock) of a UID.
    ///
    /// # Errors
    ///
    /// Propagates out-of-range errors.
    pub fn uid_to_timestamp(&self, uid: Uid) -> Result<f64> {
        self.lock().ring.uid_to_timestamp(uid)
    }

    /// Producer-supplied index of a UID.
    ///
    /// # Errors
    ///
    /// Propagates out-of-range errors.
    pub fn uid_to_index(&self, uid: Uid) -> Result<u64> {
        self.lock().ring.uid_to_index(uid)
    }

    /// Resolves a time to the internal slot position of the closest item.
    ///
    /// # Errors
    ///
    /// Fails when the buffer is empty.
    pub fn time_to_buffer_index(&self, time: f64) -> Result<usize> {
        let core = self.lock();
        let uid = core.ring.time_to_uid(time)?;
        core.ring.slot_index(uid)
    }

    /// True when the latest item carries pixel data from a video admission.
    #[must_use]
    pub fn has_latest_valid_video(&self) -> bool {
        self.lock()
            .ring
            .latest_item()
            .is_some_and(StreamItem::has_valid_video)
    }

    /// True when the latest item carries usable transform data.
    #[must_use]
    pub fn has_latest_valid_transform(&self) -> bool {
        self.lock()
            .ring
            .latest_item()
            .is_some_and(StreamItem::has_valid_transform)
    }

    /// True when the latest item carries custom fields.
    #[must_use]
    pub fn has_latest_valid_field(&self) -> bool {
        self.lock()
            .ring
            .latest_item()
            .is_some_and(StreamItem::has_valid_fields)
    }

    // ---------------------------------------------------------- bulk loading

    /// Replaces this buffer's configuration and content with a copy of
    /// `other` (metadata, slot storage, filter state, report).
    pub fn deep_copy_from(&self, other: &Self) {
        let copied = {
            let core = other.lock();
            BufferCore {
                ring: core.ring.clone(),
                format: core.format,
                max_allowed_time_difference_sec: core.max_allowed_time_difference_sec,
                name: core.name.clone(),
            }
        };
        *self.lock() = copied;
    }

    /// Loads the images of a recording into this buffer.
    ///
    /// Adopts the first frame's format, resizes the ring to hold the whole
    /// list, and admits every frame according to `policy`. Reserved fields
    /// are interpreted as the time/index axes; the rest are copied when
    /// `copy_custom_fields` is set.
    ///
    /// # Errors
    ///
    /// Fails when the list is empty or any frame misses a field the policy
    /// requires (after attempting every frame).
    pub fn copy_images_from(
        &self,
        list: &TrackedFrameList,
        policy: TimestampPolicy,
        copy_custom_fields: bool,
    ) -> Result<()> {
        let first = list
            .frame(0)
            .and_then(|frame| frame.image.as_ref())
            .ok_or_else(|| {
                BufferError::invalid_argument("recording holds no image to adopt a format from")
            })?;
        self.set_frame_format(*first.format())?;
        self.set_capacity(list.len())?;

        let mut errors = 0usize;
        for (position, frame) in list.iter().enumerate() {
            let Some(image) = frame.image.as_ref() else {
                warn!(frame = position, "skipping frame without image data");
                errors += 1;
                continue;
            };

            let Some(axes) = read_time_axes(frame.timestamp(), frame.unfiltered_timestamp(),
                frame.frame_number(), policy, position, &mut errors)
            else {
                continue;
            };

            let custom = copy_custom_fields.then(|| {
                frame
                    .fields
                    .iter()
                    .filter(|(name, _)| !is_reserved_field(name))
                    .collect::<FieldMap>()
            });

            let input = VideoFrameInput {
                bytes: image.bytes(),
                orientation: image.format().orientation,
                size: image.size(),
                pixel_type: image.format().pixel_type,
                components: image.format().components,
                image_type: image.format().image_type,
                skip_bytes: 0,
            };
            let result = match policy {
                TimestampPolicy::ReadFilteredAndUnfiltered => self.add_video(
                    &input,
                    axes.frame_number,
                    None,
                    Some(axes.unfiltered),
                    Some(axes.timestamp),
                    custom.as_ref(),
                ),
                TimestampPolicy::ReadUnfilteredComputeFiltered => self.add_video(
                    &input,
                    axes.frame_number,
                    None,
                    Some(axes.unfiltered),
                    None,
                    custom.as_ref(),
                ),
                TimestampPolicy::ReadFilteredIgnoreUnfiltered => self.add_video(
                    &input,
                    axes.frame_number,
                    None,
                    Some(axes.timestamp),
                    Some(axes.timestamp),
                    custom.as_ref(),
                ),
            };
            if let Err(err) = result {
                warn!(frame = position, %err, "failed to admit recorded video frame");
            }
        }

        if errors > 0 {
            return Err(BufferError::invalid_argument(format!(
                "{errors} recorded frames could not be read"
            )));
        }
        Ok(())
    }

    /// Loads one named transform of a recording into this buffer as poses.
    ///
    /// # Errors
    ///
    /// Fails when any frame misses the transform or a field the policy
    /// requires (after attempting every frame).
    pub fn copy_transforms_from(
        &self,
        list: &TrackedFrameList,
        policy: TimestampPolicy,
        name: &TransformName,
    ) -> Result<()> {
        self.set_capacity(list.len() + 1)?;

        let mut errors = 0usize;
        for (position, frame) in list.iter().enumerate() {
            let Some(axes) = read_time_axes(frame.timestamp(), frame.unfiltered_timestamp(),
                frame.frame_number(), policy, position, &mut errors)
            else {
                continue;
            };

            let matrix = match frame.transform(name) {
                Ok(matrix) => matrix,
                Err(err) => {
                    warn!(frame = position, transform = %name, %err, "cannot read transform");
                    errors += 1;
                    continue;
                }
            };
            let status: ToolStatus = frame
                .transform_status(name)
                .unwrap_or(stream_types::FieldStatus::Ok)
                .into();

            let result = match policy {
                TimestampPolicy::ReadFilteredAndUnfiltered => self.add_pose(
                    &matrix,
                    status,
                    axes.frame_number,
                    Some(axes.unfiltered),
                    Some(axes.timestamp),
                    None,
                ),
                TimestampPolicy::ReadUnfilteredComputeFiltered => self.add_pose(
                    &matrix,
                    status,
                    axes.frame_number,
                    Some(axes.unfiltered),
                    None,
                    None,
                ),
                TimestampPolicy::ReadFilteredIgnoreUnfiltered => self.add_pose(
                    &matrix,
                    status,
                    axes.frame_number,
                    Some(axes.timestamp),
                    Some(axes.timestamp),
                    None,
                ),
            };
            if let Err(err) = result {
                warn!(frame = position, %err, "failed to admit recorded pose");
            }
        }

        if errors > 0 {
            return Err(BufferError::invalid_argument(format!(
                "{errors} recorded frames could not be read"
            )));
        }
        Ok(())
    }
}

/// The authoritative time/index axes read from a recorded frame.
struct TimeAxes {
    timestamp: f64,
    unfiltered: f64,
    frame_number: u64,
}

fn read_time_axes(
    timestamp: Option<f64>,
    unfiltered: Option<f64>,
    frame_number: Option<u64>,
    policy: TimestampPolicy,
    position: usize,
    errors: &mut usize,
) -> Option<TimeAxes> {
    if timestamp.is_none() && policy.requires_timestamp() {
        warn!(frame = position, "recorded frame misses its Timestamp field");
        *errors += 1;
        return None;
    }
    if unfiltered.is_none() && policy.requires_unfiltered() {
        warn!(frame = position, "recorded frame misses its UnfilteredTimestamp field");
        *errors += 1;
        return None;
    }
    if frame_number.is_none() && policy.requires_frame_number() {
        warn!(frame = position, "recorded frame misses its FrameNumber field");
        *errors += 1;
        return None;
    }
    Some(TimeAxes {
        timestamp: timestamp.unwrap_or(0.0),
        unfiltered: unfiltered.unwrap_or(0.0),
        frame_number: frame_number.unwrap_or(0),
    })
}

fn describe_format(format: &FrameFormat) -> String {
    format!(
        "{} {} x{} {}",
        format.size,
        format.pixel_type.name(),
        format.components,
        format.image_type.as_str()
    )
}

/// Resolves the two timestamps of an admission, running the filter and the
/// report table as configured. `Ok(None)` means the sample was judged
/// spurious and must be silently dropped.
fn resolve_timestamps(
    core: &mut BufferCore,
    index: u64,
    unfiltered_ts: Option<f64>,
    filtered_ts: Option<f64>,
) -> Result<Option<(f64, f64)>> {
    let unfiltered = unfiltered_ts.unwrap_or_else(system_time_sec);
    let filtered = match filtered_ts {
        Some(filtered) => {
            core.ring.add_to_report(index, unfiltered, filtered);
            filtered
        }
        None => {
            let outcome = core.ring.filter.filter(index, unfiltered);
            if !outcome.probably_valid {
                info!(
                    buffer = core.name(),
                    index,
                    unfiltered,
                    "filtered timestamp is probably invalid; the item will not be recorded"
                );
                return Ok(None);
            }
            core.ring.add_to_report(index, unfiltered, outcome.filtered);
            outcome.filtered
        }
    };
    Ok(Some((unfiltered, filtered)))
}

/// Copy of the item whose filtered timestamp is closest to `time`.
fn closest_item(core: &BufferCore, time: f64) -> Result<StreamItem> {
    let uid = core.ring.time_to_uid(time)?;
    Ok(core.ring.item(uid)?.clone())
}

enum PrevNext {
    /// The closest item matches the requested time within the negligible
    /// window; no interpolation needed.
    Exact(StreamItem),
    /// Two valid bracketing items.
    Pair(StreamItem, StreamItem),
    /// Interpolation is impossible; substitute the closest item.
    Substitute,
}

/// Finds the closest item A and its neighbor B so that `time` lies between
/// their filtered timestamps, validating status and time-gap bounds.
fn prev_next_items(core: &BufferCore, time: f64) -> Result<PrevNext> {
    let offset = core.ring.local_time_offset_sec();
    let a_uid = core.ring.time_to_uid(time)?;
    let a = core.ring.item(a_uid)?.clone();

    if !a.status().is_ok() {
        debug!(
            buffer = core.name(),
            time,
            uid = a_uid,
            "closest item is invalid; cannot interpolate"
        );
        return Ok(PrevNext::Substitute);
    }

    let a_time = a.filtered_timestamp(offset);
    if (a_time - time).abs() < NEGLIGIBLE_TIME_DIFFERENCE_SEC {
        return Ok(PrevNext::Exact(a));
    }
    if (a_time - time).abs() > core.max_allowed_time_difference_sec {
        debug!(
            buffer = core.name(),
            time,
            item_time = a_time,
            "closest item is too far for interpolation"
        );
        return Ok(PrevNext::Substitute);
    }

    let b_uid = if time < a_time {
        let Some(prev) = a_uid.checked_sub(1) else {
            return Ok(PrevNext::Substitute);
        };
        prev
    } else {
        a_uid + 1
    };
    let Ok(b) = core.ring.item(b_uid) else {
        debug!(
            buffer = core.name(),
            time,
            uid = b_uid,
            "no neighbor on the other side of the requested time"
        );
        return Ok(PrevNext::Substitute);
    };
    let b = b.clone();

    let b_time = b.filtered_timestamp(offset);
    if (b_time - time).abs() > core.max_allowed_time_difference_sec {
        debug!(
            buffer = core.name(),
            time,
            item_time = b_time,
            "neighbor is too far for interpolation"
        );
        return Ok(PrevNext::Substitute);
    }
    if !b.status().is_ok() {
        debug!(
            buffer = core.name(),
            time,
            uid = b_uid,
            "neighbor is invalid; cannot interpolate"
        );
        return Ok(PrevNext::Substitute);
    }
    Ok(PrevNext::Pair(a, b))
}

/// SLERP/linear interpolation at `time`, with validity substitution.
fn interpolated_item(core: &BufferCore, time: f64) -> Result<StreamItem> {
    let offset = core.ring.local_time_offset_sec();
    let (a, b) = match prev_next_items(core, time)? {
        PrevNext::Exact(item) => return Ok(item),
        PrevNext::Pair(a, b) => (a, b),
        PrevNext::Substitute => {
            let mut item = closest_item(core, time)?;
            item.set_filtered_timestamp(time - offset);
            item.set_unfiltered_timestamp(time - offset);
            item.set_status(ToolStatus::Missing);
            return Ok(item);
        }
    };

    let a_time = a.filtered_timestamp(offset);
    let b_time = b.filtered_timestamp(offset);
    if (a_time - b_time).abs() < NEGLIGIBLE_TIME_DIFFERENCE_SEC {
        let mut item = a;
        item.set_filtered_timestamp(time - offset);
        item.set_unfiltered_timestamp(time - offset);
        return Ok(item);
    }

    let weight_a = (b_time - time).abs() / (a_time - b_time).abs();
    let weight_b = 1.0 - weight_a;

    let interpolated = interpolate_rigid(a.matrix(), b.matrix(), weight_b);
    let unfiltered = weight_a.mul_add(
        a.unfiltered_timestamp_local(),
        weight_b * b.unfiltered_timestamp_local(),
    );

    let angle_a = orientation_difference_deg(&interpolated, a.matrix()).abs();
    let angle_b = orientation_difference_deg(&interpolated, b.matrix()).abs();
    if angle_a > ANGLE_INTERPOLATION_WARNING_THRESHOLD_DEG
        && angle_b > ANGLE_INTERPOLATION_WARNING_THRESHOLD_DEG
    {
        warn!(
            buffer = core.name(),
            angle_a,
            angle_b,
            threshold = ANGLE_INTERPOLATION_WARNING_THRESHOLD_DEG,
            "interpolated orientation is far from both endpoints; consider moving the tools slower"
        );
    }

    let mut item = a;
    item.set_matrix(&interpolated);
    item.set_filtered_timestamp(time - offset);
    item.set_unfiltered_timestamp(unfiltered);
    Ok(item)
}
