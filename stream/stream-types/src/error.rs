//! Error types for the stream data model.

use thiserror::Error;

/// Errors that can occur when constructing or transforming frame data.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A dimension, component count, or rectangle is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A pixel buffer does not match the size implied by its format.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected buffer size in bytes.
        expected: usize,
        /// Actual buffer size in bytes.
        actual: usize,
    },

    /// The requested frame geometry overflows addressable memory.
    #[error("frame allocation overflow: {width}x{height}x{depth} with {bytes_per_pixel} bytes/pixel")]
    Allocation {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
        /// Frame depth in pixels.
        depth: u32,
        /// Bytes per pixel.
        bytes_per_pixel: usize,
    },

    /// An operation is only defined for a subset of pixel types.
    #[error("unsupported pixel type {actual} for {operation}")]
    UnsupportedPixelType {
        /// The operation that was attempted.
        operation: &'static str,
        /// The offending pixel type name.
        actual: &'static str,
    },

    /// A string field could not be parsed into the requested value.
    #[error("cannot parse {what} from '{value}'")]
    Parse {
        /// What was being parsed (e.g. "transform matrix").
        what: &'static str,
        /// The offending string value.
        value: String,
    },

    /// A rectangle does not fit inside the frame it is applied to.
    #[error("rectangle out of bounds: origin ({ox}, {oy}), size ({sx}, {sy}) in a {width}x{height} frame")]
    RectOutOfBounds {
        /// Rectangle origin x.
        ox: u32,
        /// Rectangle origin y.
        oy: u32,
        /// Rectangle width.
        sx: u32,
        /// Rectangle height.
        sy: u32,
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
    },
}

impl FormatError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Creates a buffer size mismatch error.
    #[must_use]
    pub const fn buffer_mismatch(expected: usize, actual: usize) -> Self {
        Self::BufferSizeMismatch { expected, actual }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(what: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            what,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FormatError::buffer_mismatch(100, 50);
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));

        let err = FormatError::parse("transform matrix", "not a number");
        assert!(err.to_string().contains("transform matrix"));
    }
}
