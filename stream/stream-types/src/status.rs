//! Liveness/validity enumerations for tracked poses and frame fields.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Liveness/validity of a tracked pose at acquisition time.
///
/// Anything other than [`ToolStatus::Ok`] means the matrix stored alongside
/// it must not be trusted by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ToolStatus {
    /// The tool is tracked and the pose is valid.
    #[default]
    Ok,
    /// The tool is not detected at all.
    Missing,
    /// The tool is visible but outside the tracking field of view.
    OutOfView,
    /// The tool is outside the calibrated tracking volume.
    OutOfVolume,
    /// Auxiliary switch 1 is pressed.
    Switch1On,
    /// Auxiliary switch 2 is pressed.
    Switch2On,
    /// Auxiliary switch 3 is pressed.
    Switch3On,
}

impl ToolStatus {
    /// Returns the canonical field-value encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Missing => "MISSING",
            Self::OutOfView => "OUT_OF_VIEW",
            Self::OutOfVolume => "OUT_OF_VOLUME",
            Self::Switch1On => "SWITCH1_ON",
            Self::Switch2On => "SWITCH2_ON",
            Self::Switch3On => "SWITCH3_ON",
        }
    }

    /// Parses the canonical field-value encoding.
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "OK" => Some(Self::Ok),
            "MISSING" => Some(Self::Missing),
            "OUT_OF_VIEW" => Some(Self::OutOfView),
            "OUT_OF_VOLUME" => Some(Self::OutOfVolume),
            "SWITCH1_ON" => Some(Self::Switch1On),
            "SWITCH2_ON" => Some(Self::Switch2On),
            "SWITCH3_ON" => Some(Self::Switch3On),
            _ => None,
        }
    }

    /// Returns true when the pose can be used by consumers.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Validity of a per-frame field value (e.g. a transform status field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldStatus {
    /// The field value is valid.
    #[default]
    Ok,
    /// The field value is present but must not be used.
    Invalid,
}

impl FieldStatus {
    /// Returns the canonical field-value encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Invalid => "INVALID",
        }
    }

    /// Parses the canonical field-value encoding.
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "OK" => Some(Self::Ok),
            "INVALID" => Some(Self::Invalid),
            _ => None,
        }
    }
}

impl From<ToolStatus> for FieldStatus {
    fn from(status: ToolStatus) -> Self {
        if status.is_ok() { Self::Ok } else { Self::Invalid }
    }
}

impl From<FieldStatus> for ToolStatus {
    /// Field statuses carry less information; anything invalid maps to
    /// [`ToolStatus::Missing`].
    fn from(status: FieldStatus) -> Self {
        match status {
            FieldStatus::Ok => Self::Ok,
            FieldStatus::Invalid => Self::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_status_round_trip() {
        for status in [
            ToolStatus::Ok,
            ToolStatus::Missing,
            ToolStatus::OutOfView,
            ToolStatus::OutOfVolume,
            ToolStatus::Switch1On,
            ToolStatus::Switch2On,
            ToolStatus::Switch3On,
        ] {
            assert_eq!(ToolStatus::from_str_opt(status.as_str()), Some(status));
        }
    }

    #[test]
    fn tool_status_validity() {
        assert!(ToolStatus::Ok.is_ok());
        assert!(!ToolStatus::OutOfView.is_ok());
    }

    #[test]
    fn field_status_conversions() {
        assert_eq!(FieldStatus::from(ToolStatus::Ok), FieldStatus::Ok);
        assert_eq!(FieldStatus::from(ToolStatus::OutOfVolume), FieldStatus::Invalid);
        assert_eq!(ToolStatus::from(FieldStatus::Invalid), ToolStatus::Missing);
    }
}
