//! Per-frame string fields, including encoded transforms.

use std::collections::BTreeMap;

use nalgebra::Matrix4;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::status::FieldStatus;
use crate::transform_name::TransformName;
use crate::Result;

/// Reserved key carrying the filtered timestamp of a recorded frame.
pub const RESERVED_FIELD_TIMESTAMP: &str = "Timestamp";
/// Reserved key carrying the unfiltered timestamp of a recorded frame.
pub const RESERVED_FIELD_UNFILTERED_TIMESTAMP: &str = "UnfilteredTimestamp";
/// Reserved key carrying the producer-supplied frame number.
pub const RESERVED_FIELD_FRAME_NUMBER: &str = "FrameNumber";

/// Returns true for the reserved time/index-axis keys.
///
/// Bulk loaders interpret these as the authoritative axes and exclude them
/// from custom-field copies.
#[must_use]
pub fn is_reserved_field(name: &str) -> bool {
    matches!(
        name,
        RESERVED_FIELD_TIMESTAMP
            | RESERVED_FIELD_UNFILTERED_TIMESTAMP
            | RESERVED_FIELD_FRAME_NUMBER
    )
}

/// String-valued fields attached to a frame or to a whole recording.
///
/// Keys are unique; insertion order is irrelevant. Rigid transforms are
/// stored as 16 whitespace-separated numbers (row-major) under a
/// `"...Transform"` key with a paired `"...TransformStatus"` field.
///
/// # Example
///
/// ```
/// use nalgebra::Matrix4;
/// use stream_types::{FieldMap, FieldStatus, TransformName};
///
/// let mut fields = FieldMap::new();
/// let name = TransformName::new("Probe", "Tracker").unwrap();
/// fields.set_transform(&name, &Matrix4::identity(), FieldStatus::Ok);
///
/// assert!(fields.transform(&name).is_ok());
/// assert_eq!(fields.transform_status(&name), Some(FieldStatus::Ok));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FieldMap {
    entries: BTreeMap<String, String>,
}

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Sets a field value, replacing any previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Removes a field; returns its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    /// Returns true if the field exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes all fields.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses a field as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] if the field is absent or malformed.
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let value = self
            .get(name)
            .ok_or_else(|| FormatError::parse("number", format!("<missing field {name}>")))?;
        value
            .trim()
            .parse()
            .map_err(|_| FormatError::parse("number", value))
    }

    /// Parses a field as `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] if the field is absent or malformed.
    pub fn get_u64(&self, name: &str) -> Result<u64> {
        let value = self
            .get(name)
            .ok_or_else(|| FormatError::parse("integer", format!("<missing field {name}>")))?;
        value
            .trim()
            .parse()
            .map_err(|_| FormatError::parse("integer", value))
    }

    /// Stores a transform matrix and its status under the conventional keys.
    pub fn set_transform(
        &mut self,
        name: &TransformName,
        matrix: &Matrix4<f64>,
        status: FieldStatus,
    ) {
        self.set(name.field_key(), format_matrix(matrix));
        self.set(name.status_key(), status.as_str());
    }

    /// Reads a transform matrix.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Parse`] if the field is absent or does not hold
    /// 16 numbers.
    pub fn transform(&self, name: &TransformName) -> Result<Matrix4<f64>> {
        let key = name.field_key();
        let value = self
            .get(&key)
            .ok_or_else(|| FormatError::parse("transform matrix", format!("<missing field {key}>")))?;
        parse_matrix(value)
    }

    /// Reads a transform's status field; absent status means unknown.
    #[must_use]
    pub fn transform_status(&self, name: &TransformName) -> Option<FieldStatus> {
        self.get(&name.status_key())
            .and_then(FieldStatus::from_str_opt)
    }

    /// Removes a transform and its status field.
    pub fn delete_transform(&mut self, name: &TransformName) {
        self.remove(&name.field_key());
        self.remove(&name.status_key());
    }

    /// Names of all transforms stored in this map, in key order.
    #[must_use]
    pub fn transform_names(&self) -> Vec<TransformName> {
        self.entries
            .keys()
            .filter(|key| key.ends_with("Transform"))
            .filter_map(|key| TransformName::parse(key).ok())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Renders a matrix as 16 whitespace-separated numbers, row-major.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn format_matrix(matrix: &Matrix4<f64>) -> String {
    let mut out = String::with_capacity(16 * 8);
    for row in 0..4 {
        for col in 0..4 {
            if !out.is_empty() {
                out.push(' ');
            }
            // Keep integral values compact, as recordings in the wild do.
            let v = matrix[(row, col)];
            if (v - v.round()).abs() < 1e-12 {
                out.push_str(&format!("{}", v.round() as i64));
            } else {
                out.push_str(&format!("{v}"));
            }
        }
    }
    out
}

/// Parses 16 whitespace-separated numbers into a row-major matrix.
pub(crate) fn parse_matrix(value: &str) -> Result<Matrix4<f64>> {
    let numbers: Vec<f64> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| FormatError::parse("transform matrix", value))?;
    if numbers.len() != 16 {
        return Err(FormatError::parse("transform matrix", value));
    }
    Ok(Matrix4::from_row_slice(&numbers))
}
