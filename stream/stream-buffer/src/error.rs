//! Error types for buffer operations.

use thiserror::Error;

use crate::item::Uid;

/// Errors that can occur in buffer admission and queries.
///
/// A rejected filtered timestamp is deliberately *not* represented here: the
/// admission entry points return `Ok(None)` for that case (the item is
/// considered spurious and silently dropped).
#[derive(Debug, Error)]
pub enum BufferError {
    /// Out-of-range sizes, indices, or enum values.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An incoming frame disagrees with the buffer's frame format.
    #[error("format mismatch: buffer expects {expected}, received {actual}")]
    FormatMismatch {
        /// The buffer's configured format.
        expected: String,
        /// The offending frame's format.
        actual: String,
    },

    /// A video admission carried no pixel data.
    #[error("empty payload: no pixel data after skipping {skipped} header bytes")]
    EmptyPayload {
        /// Header bytes skipped before the payload would start.
        skipped: usize,
    },

    /// Admitting the item would violate filtered-timestamp monotonicity.
    ///
    /// Callers typically retry with a corrected timestamp.
    #[error("timestamp regression: attempted {attempted}, latest is {latest}")]
    TimestampRegression {
        /// The refused filtered timestamp.
        attempted: f64,
        /// The filtered timestamp of the latest admitted item.
        latest: f64,
    },

    /// The item has not been produced yet (UID beyond the latest).
    #[error("item {uid} not available yet")]
    NotAvailableYet {
        /// The requested UID.
        uid: Uid,
    },

    /// The item has been overwritten by the ring (UID before the oldest).
    #[error("item {uid} not available anymore")]
    NotAvailableAnymore {
        /// The requested UID.
        uid: Uid,
    },

    /// No item lies within the negligible-time window of the requested time.
    #[error("no exact match at {requested}: closest item is at {closest}")]
    NoExactMatch {
        /// The requested time.
        requested: f64,
        /// The filtered timestamp of the closest item.
        closest: f64,
    },

    /// Temporal interpolation could not be performed.
    #[error("interpolation failed: {0}")]
    InterpolationFailed(String),

    /// The requested geometry cannot be allocated.
    #[error("allocation failure: {0}")]
    Allocation(String),
}

impl BufferError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Creates a format mismatch error.
    #[must_use]
    pub fn format_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::FormatMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a timestamp regression error.
    #[must_use]
    pub const fn timestamp_regression(attempted: f64, latest: f64) -> Self {
        Self::TimestampRegression { attempted, latest }
    }

    /// Creates an interpolation failure.
    #[must_use]
    pub fn interpolation_failed(reason: impl Into<String>) -> Self {
        Self::InterpolationFailed(reason.into())
    }

    /// Returns true for the two out-of-window query outcomes.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self, Self::NotAvailableYet { .. } | Self::NotAvailableAnymore { .. })
    }
}

impl From<stream_types::FormatError> for BufferError {
    fn from(err: stream_types::FormatError) -> Self {
        match err {
            stream_types::FormatError::Allocation { .. } => Self::Allocation(err.to_string()),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

/// Result type for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;
