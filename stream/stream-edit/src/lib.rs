//! Offline transformations of recorded acquisition sequences.
//!
//! A recording is a flat, mutable [`stream_types::TrackedFrameList`]; the
//! operations in this crate edit it in place:
//!
//! - [`trim`], [`decimate`], [`merge`] - structural edits
//! - [`update_frame_fields`], [`delete_frame_field`] - per-frame field edits,
//!   including the `{frame-scalar}` and `{frame-transform}` expansions
//! - [`update_field_name`], [`update_field_value`], [`delete_field`] -
//!   recording-level field edits
//! - [`add_transforms`] - derived transforms composed through a
//!   [`TransformSource`]
//! - [`fill_rectangle`], [`crop_rectangle`] - pixel edits
//! - [`rewrite_reference_transforms`] - the ToolToReference -> ToolToTracker
//!   migration for old recordings
//!
//! Recordings are read and written as JSON documents ([`io`]); the
//! `edit-sequence` binary exposes the whole surface on the command line.

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
pub mod io;
mod ops;

pub use error::{EditError, Result};
pub use ops::{
    add_transforms, crop_rectangle, decimate, delete_field, delete_frame_field, fill_rectangle,
    merge, rewrite_reference_transforms, trim, update_field_name, update_field_value,
    update_frame_fields, FrameFieldUpdate, FrameGraphSource, TransformSource,
    FIELD_VALUE_FRAME_SCALAR, FIELD_VALUE_FRAME_TRANSFORM,
};
