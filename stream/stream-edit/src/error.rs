//! Error types for sequence editing.

use thiserror::Error;

/// Errors that can occur while editing or storing a recording.
#[derive(Debug, Error)]
pub enum EditError {
    /// Out-of-range frame indices, factors, or rectangle parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A frame or recording field could not be read or parsed.
    #[error(transparent)]
    Format(#[from] stream_types::FormatError),

    /// Reading or writing a recording file failed.
    #[error("recording i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A recording document could not be encoded or decoded.
    #[error("recording codec failed: {0}")]
    Codec(#[from] serde_json::Error),
}

impl EditError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}

/// Result type for sequence editing operations.
pub type Result<T> = std::result::Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EditError::invalid_argument("decimation factor must be >= 2");
        assert!(err.to_string().contains("decimation factor"));
    }
}
