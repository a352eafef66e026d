//! Pixel format axes for acquired frames.
//!
//! A buffer declares one [`PixelType`] + [`ImageType`] + [`ImageOrientation`]
//! combination at configuration time; every admitted frame must conform.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar type of a single pixel component.
///
/// # Example
///
/// ```
/// use stream_types::PixelType;
///
/// assert_eq!(PixelType::U8.bytes_per_scalar(), 1);
/// assert_eq!(PixelType::F64.bytes_per_scalar(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PixelType {
    /// Unsigned 8-bit (B-mode brightness data).
    #[default]
    U8,
    /// Signed 8-bit.
    I8,
    /// Unsigned 16-bit.
    U16,
    /// Signed 16-bit (typical for RF data).
    I16,
    /// Unsigned 32-bit.
    U32,
    /// Signed 32-bit.
    I32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl PixelType {
    /// Returns the number of bytes occupied by one scalar of this type.
    #[must_use]
    pub const fn bytes_per_scalar(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Returns the short type name (e.g. `"u8"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Acquisition modality of an image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImageType {
    /// Envelope-detected brightness (B-mode) image.
    #[default]
    Brightness,
    /// Radio-frequency samples, real component only.
    RfReal,
    /// Radio-frequency samples, interleaved I/Q per line.
    RfIqLine,
    /// Radio-frequency samples, I lines followed by Q lines.
    RfILineQLine,
    /// Color image (e.g. screen capture of a scan converter).
    RgbColor,
}

impl ImageType {
    /// Returns the canonical field-value encoding of the image type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brightness => "BRIGHTNESS",
            Self::RfReal => "RF_REAL",
            Self::RfIqLine => "RF_IQ_LINE",
            Self::RfILineQLine => "RF_I_LINE_Q_LINE",
            Self::RgbColor => "RGB_COLOR",
        }
    }

    /// Parses the canonical field-value encoding.
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "BRIGHTNESS" => Some(Self::Brightness),
            "RF_REAL" => Some(Self::RfReal),
            "RF_IQ_LINE" => Some(Self::RfIqLine),
            "RF_I_LINE_Q_LINE" => Some(Self::RfILineQLine),
            "RGB_COLOR" => Some(Self::RgbColor),
            _ => None,
        }
    }
}

/// Two-letter image orientation code.
///
/// The first letter names the sense of the +x (column) axis, the second the
/// sense of the +y (row) axis: `M`arked/`U`nmarked transducer side and
/// `F`ar/`N`ear from the transducer surface. Codes whose first letter is a
/// depth letter (`FM`, `NM`, `FU`, `NU`) describe transposed images, where
/// columns run along depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImageOrientation {
    /// Columns toward marked side, rows toward far field.
    #[default]
    Mf,
    /// Columns toward marked side, rows toward near field.
    Mn,
    /// Columns toward unmarked side, rows toward far field.
    Uf,
    /// Columns toward unmarked side, rows toward near field.
    Un,
    /// Transposed: columns toward far field, rows toward marked side.
    Fm,
    /// Transposed: columns toward near field, rows toward marked side.
    Nm,
    /// Transposed: columns toward far field, rows toward unmarked side.
    Fu,
    /// Transposed: columns toward near field, rows toward unmarked side.
    Nu,
}

impl ImageOrientation {
    /// Returns the two-letter code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mf => "MF",
            Self::Mn => "MN",
            Self::Uf => "UF",
            Self::Un => "UN",
            Self::Fm => "FM",
            Self::Nm => "NM",
            Self::Fu => "FU",
            Self::Nu => "NU",
        }
    }

    /// Parses a two-letter code.
    #[must_use]
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "MF" => Some(Self::Mf),
            "MN" => Some(Self::Mn),
            "UF" => Some(Self::Uf),
            "UN" => Some(Self::Un),
            "FM" => Some(Self::Fm),
            "NM" => Some(Self::Nm),
            "FU" => Some(Self::Fu),
            "NU" => Some(Self::Nu),
            _ => None,
        }
    }

    /// Returns true for the transposed (depth-first) code family.
    #[must_use]
    pub const fn is_transposed(self) -> bool {
        matches!(self, Self::Fm | Self::Nm | Self::Fu | Self::Nu)
    }

    /// Axis senses relative to `MF`, expressed in the non-transposed frame:
    /// `(lateral_flipped, depth_flipped)`.
    const fn axis_flips(self) -> (bool, bool) {
        match self {
            Self::Mf => (false, false),
            Self::Mn => (false, true),
            Self::Uf => (true, false),
            Self::Un => (true, true),
            // Transposed family: first letter is depth, second is lateral.
            Self::Fm => (false, false),
            Self::Nm => (false, true),
            Self::Fu => (true, false),
            Self::Nu => (true, true),
        }
    }
}

/// Whether an orientation change requires re-ordering the image axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Transpose {
    /// Axes keep their order.
    #[default]
    None,
    /// Axes rotate IJK -> KIJ (the new x axis is the old z axis).
    IjkToKij,
}

/// Flip/transpose recipe taking an image from one orientation to another.
///
/// # Example
///
/// ```
/// use stream_types::{FlipInfo, ImageOrientation, Transpose};
///
/// let flip = FlipInfo::between(ImageOrientation::Uf, ImageOrientation::Mf);
/// assert!(flip.flip_x);
/// assert!(!flip.flip_y);
/// assert_eq!(flip.transpose, Transpose::None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlipInfo {
    /// Mirror the output along its x axis.
    pub flip_x: bool,
    /// Mirror the output along its y axis.
    pub flip_y: bool,
    /// Mirror the output along its z axis (volumes only).
    pub flip_z: bool,
    /// Axis re-ordering between source and destination.
    pub transpose: Transpose,
}

impl FlipInfo {
    /// Creates a plain flip recipe with no transpose.
    #[must_use]
    pub const fn flips(flip_x: bool, flip_y: bool, flip_z: bool) -> Self {
        Self {
            flip_x,
            flip_y,
            flip_z,
            transpose: Transpose::None,
        }
    }

    /// Derives the recipe taking `src`-oriented pixels to `dst` orientation.
    ///
    /// Two-letter codes carry no z-axis information, so `flip_z` is always
    /// false here; volume flips are only reachable through explicit flip
    /// requests (e.g. the editor's crop operation).
    #[must_use]
    pub fn between(src: ImageOrientation, dst: ImageOrientation) -> Self {
        let transpose = if src.is_transposed() == dst.is_transposed() {
            Transpose::None
        } else {
            Transpose::IjkToKij
        };
        let (src_lat, src_depth) = src.axis_flips();
        let (dst_lat, dst_depth) = dst.axis_flips();
        // Flips are expressed in the destination frame: after any transpose
        // the x axis is lateral iff the destination is non-transposed.
        let (flip_lat, flip_depth) = (src_lat != dst_lat, src_depth != dst_depth);
        let (flip_x, flip_y) = if dst.is_transposed() {
            (flip_depth, flip_lat)
        } else {
            (flip_lat, flip_depth)
        };
        Self {
            flip_x,
            flip_y,
            flip_z: false,
            transpose,
        }
    }

    /// Returns true if no pixel movement is required.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        !self.flip_x && !self.flip_y && !self.flip_z && matches!(self.transpose, Transpose::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_type_sizes() {
        assert_eq!(PixelType::U8.bytes_per_scalar(), 1);
        assert_eq!(PixelType::I16.bytes_per_scalar(), 2);
        assert_eq!(PixelType::F32.bytes_per_scalar(), 4);
        assert_eq!(PixelType::F64.bytes_per_scalar(), 8);
    }

    #[test]
    fn image_type_round_trip() {
        for ty in [
            ImageType::Brightness,
            ImageType::RfReal,
            ImageType::RfIqLine,
            ImageType::RfILineQLine,
            ImageType::RgbColor,
        ] {
            assert_eq!(ImageType::from_str_opt(ty.as_str()), Some(ty));
        }
        assert_eq!(ImageType::from_str_opt("BOGUS"), None);
    }

    #[test]
    fn orientation_round_trip() {
        for code in ["MF", "MN", "UF", "UN", "FM", "NM", "FU", "NU"] {
            let orient = ImageOrientation::from_str_opt(code).unwrap();
            assert_eq!(orient.as_str(), code);
        }
    }

    #[test]
    fn orientation_transposed_family() {
        assert!(!ImageOrientation::Mf.is_transposed());
        assert!(!ImageOrientation::Un.is_transposed());
        assert!(ImageOrientation::Fm.is_transposed());
        assert!(ImageOrientation::Nu.is_transposed());
    }

    #[test]
    fn flip_identity() {
        let flip = FlipInfo::between(ImageOrientation::Mf, ImageOrientation::Mf);
        assert!(flip.is_identity());
    }

    #[test]
    fn flip_horizontal() {
        let flip = FlipInfo::between(ImageOrientation::Uf, ImageOrientation::Mf);
        assert!(flip.flip_x);
        assert!(!flip.flip_y);
        assert_eq!(flip.transpose, Transpose::None);
    }

    #[test]
    fn flip_vertical() {
        let flip = FlipInfo::between(ImageOrientation::Mn, ImageOrientation::Mf);
        assert!(!flip.flip_x);
        assert!(flip.flip_y);
    }

    #[test]
    fn flip_both() {
        let flip = FlipInfo::between(ImageOrientation::Un, ImageOrientation::Mf);
        assert!(flip.flip_x);
        assert!(flip.flip_y);
    }

    #[test]
    fn flip_transpose() {
        let flip = FlipInfo::between(ImageOrientation::Fm, ImageOrientation::Mf);
        assert_eq!(flip.transpose, Transpose::IjkToKij);
    }
}
