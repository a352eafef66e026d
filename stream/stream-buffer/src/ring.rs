//! Fixed-capacity, pre-allocated ring of timestamped slots.

use stream_types::FrameFormat;

use crate::error::{BufferError, Result};
use crate::filter::TimestampFilter;
use crate::item::{StreamItem, Uid};

/// One row of the timestamp report table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampReportEntry {
    /// Producer-supplied frame index.
    pub index: u64,
    /// Raw arrival timestamp (device-local).
    pub unfiltered: f64,
    /// Filtered timestamp (device-local).
    pub filtered: f64,
}

/// The time-indexed circular store behind [`crate::StreamBuffer`].
///
/// Slots are pre-allocated; accepted items receive monotonically increasing
/// UIDs and the occupied UIDs always form the contiguous range
/// `[oldest, latest]` with `latest - oldest + 1 <= capacity`.
///
/// This type is not synchronized; the owning buffer serializes access.
#[derive(Debug, Clone)]
pub(crate) struct TimestampedRing {
    items: Vec<StreamItem>,
    /// Slot that the next admission will overwrite.
    write_head: usize,
    /// UID assigned to the next admitted item.
    next_uid: Uid,
    /// Occupied slots (saturates at capacity once the ring wraps).
    num_items: usize,
    /// Filtered timestamp of the latest admitted item (device-local).
    current_filtered: f64,
    local_time_offset_sec: f64,
    pub(crate) filter: TimestampFilter,
    report_enabled: bool,
    report: Vec<TimestampReportEntry>,
}

impl TimestampedRing {
    pub(crate) fn new(capacity: usize, format: &FrameFormat) -> Result<Self> {
        let mut ring = Self {
            items: Vec::new(),
            write_head: 0,
            next_uid: 0,
            num_items: 0,
            current_filtered: 0.0,
            local_time_offset_sec: 0.0,
            filter: TimestampFilter::default(),
            report_enabled: false,
            report: Vec::new(),
        };
        ring.set_capacity(capacity, format)?;
        Ok(ring)
    }

    /// Re-allocates the slots; all stored content is discarded.
    pub(crate) fn set_capacity(&mut self, capacity: usize, format: &FrameFormat) -> Result<()> {
        if capacity == 0 {
            return Err(BufferError::invalid_argument(
                "buffer capacity must be at least 1",
            ));
        }
        let mut items = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            items.push(StreamItem::with_format(format)?);
        }
        self.items = items;
        self.clear();
        Ok(())
    }

    /// Re-allocates every slot's pixel buffer for a new frame format;
    /// all stored content is discarded.
    pub(crate) fn reallocate_frames(&mut self, format: &FrameFormat) -> Result<()> {
        let capacity = self.items.len();
        self.set_capacity(capacity, format)
    }

    /// Forgets all items; UIDs restart from 0.
    pub(crate) fn clear(&mut self) {
        self.write_head = 0;
        self.next_uid = 0;
        self.num_items = 0;
        self.current_filtered = 0.0;
        self.filter.reset();
        self.report.clear();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.num_items
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    pub(crate) fn oldest_uid(&self) -> Option<Uid> {
        (self.num_items > 0).then(|| self.next_uid - self.num_items as Uid)
    }

    pub(crate) fn latest_uid(&self) -> Option<Uid> {
        (self.num_items > 0).then(|| self.next_uid - 1)
    }

    pub(crate) fn local_time_offset_sec(&self) -> f64 {
        self.local_time_offset_sec
    }

    pub(crate) fn set_local_time_offset_sec(&mut self, offset: f64) {
        self.local_time_offset_sec = offset;
    }

    pub(crate) fn set_timestamp_reporting(&mut self, enabled: bool) {
        self.report_enabled = enabled;
    }

    pub(crate) fn timestamp_reporting(&self) -> bool {
        self.report_enabled
    }

    /// Appends a row to the timestamp report when reporting is enabled.
    pub(crate) fn add_to_report(&mut self, index: u64, unfiltered: f64, filtered: f64) {
        if self.report_enabled {
            self.report.push(TimestampReportEntry {
                index,
                unfiltered,
                filtered,
            });
        }
    }

    /// Drains the accumulated timestamp report.
    pub(crate) fn take_report(&mut self) -> Vec<TimestampReportEntry> {
        std::mem::take(&mut self.report)
    }

    /// Claims the next slot for an item with the given filtered timestamp.
    ///
    /// This is the single commit point of the admission pipeline: the UID is
    /// assigned, the write head advances, and the slot is reset for reuse.
    /// A non-increasing filtered timestamp is refused before any state
    /// changes.
    pub(crate) fn prepare_new_item(&mut self, filtered_local: f64) -> Result<(Uid, usize)> {
        if self.num_items > 0 && filtered_local <= self.current_filtered {
            return Err(BufferError::timestamp_regression(
                filtered_local,
                self.current_filtered,
            ));
        }
        let uid = self.next_uid;
        let slot = self.write_head;
        self.next_uid += 1;
        self.write_head = (self.write_head + 1) % self.items.len();
        self.num_items = (self.num_items + 1).min(self.items.len());
        self.current_filtered = filtered_local;

        self.items[slot].reset_for_reuse();
        self.items[slot].set_uid(uid);
        Ok((uid, slot))
    }

    /// Maps a UID to its slot position.
    pub(crate) fn slot_index(&self, uid: Uid) -> Result<usize> {
        let oldest = self
            .oldest_uid()
            .ok_or(BufferError::NotAvailableYet { uid })?;
        let latest = self.next_uid - 1;
        if uid > latest {
            return Err(BufferError::NotAvailableYet { uid });
        }
        if uid < oldest {
            return Err(BufferError::NotAvailableAnymore { uid });
        }
        let back = usize::try_from(latest - uid)
            .map_err(|_| BufferError::NotAvailableAnymore { uid })?;
        let capacity = self.items.len();
        Ok((self.write_head + capacity - 1 - back) % capacity)
    }

    pub(crate) fn item(&self, uid: Uid) -> Result<&StreamItem> {
        let slot = self.slot_index(uid)?;
        Ok(&self.items[slot])
    }

    pub(crate) fn item_mut(&mut self, uid: Uid) -> Result<&mut StreamItem> {
        let slot = self.slot_index(uid)?;
        Ok(&mut self.items[slot])
    }

    pub(crate) fn item_at_slot(&self, slot: usize) -> Option<&StreamItem> {
        self.items.get(slot)
    }

    pub(crate) fn item_at_slot_mut(&mut self, slot: usize) -> Option<&mut StreamItem> {
        self.items.get_mut(slot)
    }

    /// The latest admitted item, if any.
    pub(crate) fn latest_item(&self) -> Option<&StreamItem> {
        self.latest_uid().and_then(|uid| self.item(uid).ok())
    }

    /// Filtered timestamp of a UID on the shared clock.
    pub(crate) fn uid_to_timestamp(&self, uid: Uid) -> Result<f64> {
        Ok(self.item(uid)?.filtered_timestamp(self.local_time_offset_sec))
    }

    /// Producer index of a UID.
    pub(crate) fn uid_to_index(&self, uid: Uid) -> Result<u64> {
        Ok(self.item(uid)?.index())
    }

    /// Finds the UID whose filtered timestamp is closest to `time` (shared
    /// clock). Ties break toward the later UID; times outside the retained
    /// range resolve to the nearest end item.
    pub(crate) fn time_to_uid(&self, time: f64) -> Result<Uid> {
        let oldest = self
            .oldest_uid()
            .ok_or(BufferError::NotAvailableYet { uid: self.next_uid })?;
        let latest = self.next_uid - 1;

        let ts = |uid: Uid| -> f64 {
            // Occupied range is contiguous; the lookup cannot fail here.
            self.item(uid)
                .map(|item| item.filtered_timestamp(self.local_time_offset_sec))
                .unwrap_or(f64::NAN)
        };

        if time <= ts(oldest) {
            return Ok(oldest);
        }
        if time >= ts(latest) {
            return Ok(latest);
        }

        // Binary search for the first UID at or after the requested time.
        let mut lo = oldest;
        let mut hi = latest;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if ts(mid) < time {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        // lo >= oldest + 1 here because time > ts(oldest).
        let after = lo;
        let before = lo - 1;
        if (ts(after) - time).abs() <= (time - ts(before)).abs() {
            Ok(after)
        } else {
            Ok(before)
        }
    }

}
