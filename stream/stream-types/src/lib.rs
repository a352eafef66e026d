//! Hardware-agnostic data types for tracked acquisition streams.
//!
//! This crate provides the foundational types shared by the real-time
//! acquisition buffer (`stream-buffer`) and the offline recording editor
//! (`stream-edit`):
//!
//! # Pixel data
//!
//! - [`PixelType`], [`ImageType`], [`ImageOrientation`] - frame format axes
//! - [`FrameFormat`] - the shape every slot of a buffer must conform to
//! - [`PixelFrame`] - an owned pixel buffer with oriented/clipped copy-in
//!
//! # Tracking data
//!
//! - [`ToolStatus`], [`FieldStatus`] - liveness/validity of tracked poses
//! - [`TransformName`] - `"AToBTransform"` field-name algebra
//! - [`FieldMap`] - per-frame string fields, including encoded transforms
//!
//! # Recordings
//!
//! - [`TrackedFrame`], [`TrackedFrameList`] - flat, mutable recording model
//!   consumed by the editor and the buffer's bulk loaders
//!
//! # Layer 0 Crate
//!
//! No I/O and no concurrency live here; this crate can be used in:
//! - Real-time device drivers
//! - Offline analysis and editing tools
//! - Test fixtures
//!
//! # Example
//!
//! ```
//! use stream_types::{FrameFormat, FrameSize, ImageOrientation, ImageType, PixelType};
//!
//! let format = FrameFormat::new(
//!     FrameSize::new(640, 480, 1),
//!     PixelType::U8,
//!     1,
//!     ImageType::Brightness,
//!     ImageOrientation::Mf,
//! );
//! assert_eq!(format.frame_bytes().unwrap(), 640 * 480);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod fields;
mod frame;
mod pixel;
mod status;
mod tracked;
mod transform_name;

pub use error::FormatError;
pub use fields::{
    FieldMap, RESERVED_FIELD_FRAME_NUMBER, RESERVED_FIELD_TIMESTAMP,
    RESERVED_FIELD_UNFILTERED_TIMESTAMP, is_reserved_field,
};
pub use frame::{ClipRect, FrameFormat, FrameSize, PixelFrame};
pub use pixel::{FlipInfo, ImageOrientation, ImageType, PixelType, Transpose};
pub use status::{FieldStatus, ToolStatus};
pub use tracked::{TrackedFrame, TrackedFrameList};
pub use transform_name::TransformName;

/// Result type for data-model operations.
pub type Result<T> = std::result::Result<T, FormatError>;
