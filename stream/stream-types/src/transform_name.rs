//! Names of rigid transforms between coordinate frames.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::Result;

/// A transform name of the form `"<From>To<To>"`.
///
/// Transforms are stored in frame field maps under the key
/// `"<From>To<To>Transform"` with a paired `"...TransformStatus"` field;
/// this type handles the parsing and formatting of those keys.
///
/// # Example
///
/// ```
/// use stream_types::TransformName;
///
/// let name = TransformName::parse("ProbeToTrackerTransform").unwrap();
/// assert_eq!(name.from(), "Probe");
/// assert_eq!(name.to(), "Tracker");
/// assert_eq!(name.field_key(), "ProbeToTrackerTransform");
/// assert_eq!(name.status_key(), "ProbeToTrackerTransformStatus");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformName {
    from: String,
    to: String,
}

impl TransformName {
    /// Creates a transform name from its two frame names.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidArgument`] if either frame name is empty
    /// or contains the separator `"To"` followed by an uppercase letter
    /// (which would make the rendered key ambiguous).
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self> {
        let (from, to) = (from.into(), to.into());
        if from.is_empty() || to.is_empty() {
            return Err(FormatError::invalid_argument(
                "transform frame names must be non-empty",
            ));
        }
        if contains_separator(&from) || contains_separator(&to) {
            return Err(FormatError::invalid_argument(format!(
                "frame name '{from}To{to}' is ambiguous"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parses `"AToB"` or `"AToBTransform"`.
    ///
    /// The split happens at the first `"To"` followed by an uppercase letter,
    /// so frame names like `"Stylus"` and `"Tracker"` survive round trips.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] if no separator is found.
    pub fn parse(name: &str) -> Result<Self> {
        let stripped = name.strip_suffix("Transform").unwrap_or(name);
        let bytes = stripped.as_bytes();
        let mut split = None;
        for i in 1..stripped.len() {
            if bytes[i..].starts_with(b"To")
                && bytes.get(i + 2).is_some_and(u8::is_ascii_uppercase)
            {
                split = Some(i);
                break;
            }
        }
        let Some(i) = split else {
            return Err(FormatError::parse("transform name", name));
        };
        Ok(Self {
            from: stripped[..i].to_string(),
            to: stripped[i + 2..].to_string(),
        })
    }

    /// The source coordinate frame.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The destination coordinate frame.
    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// The bare `"AToB"` name.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}To{}", self.from, self.to)
    }

    /// The field-map key carrying the matrix: `"AToBTransform"`.
    #[must_use]
    pub fn field_key(&self) -> String {
        format!("{}To{}Transform", self.from, self.to)
    }

    /// The field-map key carrying the validity: `"AToBTransformStatus"`.
    #[must_use]
    pub fn status_key(&self) -> String {
        format!("{}To{}TransformStatus", self.from, self.to)
    }

    /// Returns the same source frame re-targeted at a new destination.
    #[must_use]
    pub fn retargeted(&self, to: impl Into<String>) -> Self {
        Self {
            from: self.from.clone(),
            to: to.into(),
        }
    }
}

fn contains_separator(frame: &str) -> bool {
    let bytes = frame.as_bytes();
    (0..frame.len().saturating_sub(2))
        .any(|i| bytes[i..].starts_with(b"To") && bytes[i + 2].is_ascii_uppercase())
}

impl std::fmt::Display for TransformName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}To{}", self.from, self.to)
    }
}
