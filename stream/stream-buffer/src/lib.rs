//! Real-time acquisition buffer for tracked image and pose streams.
//!
//! Producers (ultrasound probes, optical/electromagnetic trackers) push
//! timestamped items into a bounded, time-indexed store; consumers query
//! items by unique identifier, by exact time, by closest time, or by
//! temporal interpolation.
//!
//! # Components
//!
//! - [`TimestampFilter`] - recovers a smooth, monotonic time axis from noisy
//!   hardware timestamps via a sliding-window least-squares fit
//! - [`StreamItem`] - one pre-allocated buffer slot (pixels, pose, status,
//!   timestamps, custom fields)
//! - [`StreamBuffer`] - the bounded ring with its admission pipeline and
//!   temporal query engine
//!
//! # Concurrency
//!
//! One mutex per buffer serializes admission, query, resize, and inspection.
//! Producers hand in borrowed payloads that are copied into pre-allocated
//! slot storage under the lock; queries copy items out under the lock. No
//! references to slot memory ever escape.
//!
//! # Example
//!
//! ```
//! use nalgebra::Matrix4;
//! use stream_buffer::{RetrievalMode, StreamBuffer};
//! use stream_types::ToolStatus;
//!
//! let buffer = StreamBuffer::new();
//! buffer
//!     .add_pose(&Matrix4::identity(), ToolStatus::Ok, 0, Some(0.0), Some(1.0), None)
//!     .unwrap();
//!
//! let item = buffer.get_by_time(1.0, RetrievalMode::Closest).unwrap();
//! assert_eq!(item.uid(), 0);
//! ```
//!
//! # Silent drop on rejected filtered timestamps
//!
//! When the timestamp filter judges a sample's timestamp to be spurious the
//! admission call returns `Ok(None)`: success, but **nothing was inserted**.
//! Producer sequence numbers occasionally glitch and inserting such an item
//! would break the buffer's time monotonicity. See
//! [`StreamBuffer::add_video`] for details.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod buffer;
mod error;
mod filter;
mod interp;
mod item;
mod ring;

pub use buffer::{
    RetrievalMode, StreamBuffer, TimestampPolicy, VideoFrameInput,
};
pub use error::{BufferError, Result};
pub use filter::{FilterOutcome, TimestampFilter, DEFAULT_AVERAGED_ITEMS};
pub use interp::{interpolate_rigid, orientation_difference_deg};
pub use item::{StreamItem, Uid};
pub use ring::TimestampReportEntry;

/// Two timestamps closer than this are considered equal (seconds).
pub const NEGLIGIBLE_TIME_DIFFERENCE_SEC: f64 = 1e-5;

/// Interpolated orientations farther than this from both endpoints trigger
/// a warning (degrees).
pub const ANGLE_INTERPOLATION_WARNING_THRESHOLD_DEG: f64 = 10.0;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        BufferError, RetrievalMode, StreamBuffer, StreamItem, TimestampFilter, TimestampPolicy,
        Uid, VideoFrameInput,
    };
}
