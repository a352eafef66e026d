//! Frame geometry and owned pixel storage.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::pixel::{FlipInfo, ImageOrientation, ImageType, PixelType, Transpose};
use crate::Result;

/// Frame dimensions in pixels, `(x, y, z)` with `z >= 1`.
///
/// Single-slice (2-D) images have `z = 1`; a zero depth is coerced to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameSize(pub [u32; 3]);

impl FrameSize {
    /// Creates a frame size; `z = 0` is coerced to 1.
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self([x, y, if z == 0 { 1 } else { z }])
    }

    /// Width in pixels.
    #[must_use]
    pub const fn x(self) -> u32 {
        self.0[0]
    }

    /// Height in pixels.
    #[must_use]
    pub const fn y(self) -> u32 {
        self.0[1]
    }

    /// Depth in pixels (1 for 2-D images).
    #[must_use]
    pub const fn z(self) -> u32 {
        self.0[2]
    }

    /// Total pixel count, or `None` on overflow.
    #[must_use]
    pub fn pixel_count(self) -> Option<usize> {
        let [x, y, z] = self.0;
        (x as usize).checked_mul(y as usize)?.checked_mul(z as usize)
    }

    /// Rotates the dimensions IJK -> KIJ (new x = old z, new y = old x).
    #[must_use]
    pub const fn rotated_kij(self) -> Self {
        let [x, y, z] = self.0;
        Self([z, x, y])
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(0, 0, 1)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.0[0], self.0[1], self.0[2])
    }
}

/// A clipping rectangle (cuboid for volumes) in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipRect {
    /// Top-left(-front) corner.
    pub origin: [u32; 3],
    /// Extent along each axis; all components must be >= 1.
    pub size: [u32; 3],
}

impl ClipRect {
    /// Creates a 2-D clip rectangle (full depth).
    #[must_use]
    pub const fn new_2d(ox: u32, oy: u32, sx: u32, sy: u32) -> Self {
        Self {
            origin: [ox, oy, 0],
            size: [sx, sy, 1],
        }
    }

    /// The output size produced by this clip.
    #[must_use]
    pub const fn output_size(&self) -> FrameSize {
        FrameSize::new(self.size[0], self.size[1], self.size[2])
    }

    /// Checks that the rectangle fits inside an image of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::RectOutOfBounds`] when it does not.
    pub fn validate_within(&self, size: FrameSize) -> Result<()> {
        let fits = |axis: usize, limit: u32| {
            self.size[axis] >= 1
                && self.origin[axis] < limit
                && self.origin[axis].saturating_add(self.size[axis]) <= limit
        };
        if fits(0, size.x()) && fits(1, size.y()) && fits(2, size.z()) {
            Ok(())
        } else {
            Err(FormatError::RectOutOfBounds {
                ox: self.origin[0],
                oy: self.origin[1],
                sx: self.size[0],
                sy: self.size[1],
                width: size.x(),
                height: size.y(),
            })
        }
    }
}

/// The shape every slot of a buffer conforms to.
///
/// # Example
///
/// ```
/// use stream_types::{FrameFormat, FrameSize, ImageOrientation, ImageType, PixelType};
///
/// let format = FrameFormat::new(
///     FrameSize::new(4, 3, 1),
///     PixelType::I16,
///     2,
///     ImageType::RfIqLine,
///     ImageOrientation::Mf,
/// );
/// assert_eq!(format.frame_bytes().unwrap(), 4 * 3 * 2 * 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameFormat {
    /// Frame dimensions.
    pub size: FrameSize,
    /// Scalar type of each component.
    pub pixel_type: PixelType,
    /// Components per pixel (1 for grayscale/RF, 3 for RGB).
    pub components: u32,
    /// Acquisition modality.
    pub image_type: ImageType,
    /// Storage orientation of the pixel rows.
    pub orientation: ImageOrientation,
}

impl FrameFormat {
    /// Creates a frame format.
    #[must_use]
    pub const fn new(
        size: FrameSize,
        pixel_type: PixelType,
        components: u32,
        image_type: ImageType,
        orientation: ImageOrientation,
    ) -> Self {
        Self {
            size,
            pixel_type,
            components,
            image_type,
            orientation,
        }
    }

    /// Bytes per pixel (all components).
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> usize {
        self.pixel_type.bytes_per_scalar() * self.components as usize
    }

    /// Total buffer size in bytes for one frame.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Allocation`] if the product overflows.
    pub fn frame_bytes(&self) -> Result<usize> {
        self.size
            .pixel_count()
            .and_then(|pixels| pixels.checked_mul(self.bytes_per_pixel()))
            .ok_or(FormatError::Allocation {
                width: self.size.x(),
                height: self.size.y(),
                depth: self.size.z(),
                bytes_per_pixel: self.bytes_per_pixel(),
            })
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::new(
            FrameSize::default(),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Mf,
        )
    }
}

/// An owned pixel buffer with the format it was allocated for.
///
/// The buffer is allocated once (at buffer configuration or recording load)
/// and written in place by [`PixelFrame::oriented_copy_from`]; the hot
/// admission path performs no per-frame allocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelFrame {
    format: FrameFormat,
    bytes: Vec<u8>,
}

impl PixelFrame {
    /// Allocates a zero-filled frame for the given format.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Allocation`] if the geometry overflows.
    pub fn allocate(format: &FrameFormat) -> Result<Self> {
        let len = format.frame_bytes()?;
        Ok(Self {
            format: *format,
            bytes: vec![0; len],
        })
    }

    /// Builds a frame from existing pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::BufferSizeMismatch`] if `bytes` does not match
    /// the format's frame size.
    pub fn from_bytes(format: &FrameFormat, bytes: Vec<u8>) -> Result<Self> {
        let expected = format.frame_bytes()?;
        if bytes.len() != expected {
            return Err(FormatError::buffer_mismatch(expected, bytes.len()));
        }
        Ok(Self {
            format: *format,
            bytes,
        })
    }

    /// The format this frame was allocated for.
    #[must_use]
    pub const fn format(&self) -> &FrameFormat {
        &self.format
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn size(&self) -> FrameSize {
        self.format.size
    }

    /// Raw pixel bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable raw pixel bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Returns true if the frame holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Updates the stored image type (the pixel bytes are reinterpreted).
    pub fn set_image_type(&mut self, image_type: ImageType) {
        self.format.image_type = image_type;
    }

    /// Updates the stored orientation code without touching pixels.
    pub fn set_orientation(&mut self, orientation: ImageOrientation) {
        self.format.orientation = orientation;
    }

    /// Copies `src` into this pre-allocated frame, applying a clip followed
    /// by the flip/transpose recipe.
    ///
    /// `src` is interpreted with this frame's pixel type and component count;
    /// `src_size` is its geometry. The clipped (or full) region, with its
    /// dimensions rotated when the recipe transposes, must match this frame's
    /// size exactly.
    ///
    /// # Errors
    ///
    /// - [`FormatError::BufferSizeMismatch`] if `src` is shorter than its
    ///   declared geometry
    /// - [`FormatError::RectOutOfBounds`] if the clip does not fit in `src`
    /// - [`FormatError::InvalidArgument`] if the resulting geometry differs
    ///   from this frame's size
    pub fn oriented_copy_from(
        &mut self,
        src: &[u8],
        src_size: FrameSize,
        flip: &FlipInfo,
        clip: Option<&ClipRect>,
    ) -> Result<()> {
        let bpp = self.format.bytes_per_pixel();
        let src_pixels = src_size
            .pixel_count()
            .ok_or_else(|| FormatError::invalid_argument("source geometry overflow"))?;
        let src_len = src_pixels
            .checked_mul(bpp)
            .ok_or_else(|| FormatError::invalid_argument("source geometry overflow"))?;
        if src.len() < src_len {
            return Err(FormatError::buffer_mismatch(src_len, src.len()));
        }

        let region = match clip {
            Some(rect) => {
                rect.validate_within(src_size)?;
                *rect
            }
            None => ClipRect {
                origin: [0, 0, 0],
                size: src_size.0,
            },
        };

        let out_size = match flip.transpose {
            Transpose::None => region.output_size(),
            Transpose::IjkToKij => region.output_size().rotated_kij(),
        };
        if out_size != self.size() {
            return Err(FormatError::invalid_argument(format!(
                "output geometry {out_size} does not match the allocated frame {}",
                self.size()
            )));
        }

        let (out_w, out_h, out_d) = (out_size.x(), out_size.y(), out_size.z());
        let (src_w, src_h) = (src_size.x() as usize, src_size.y() as usize);
        let row_bytes = region.size[0] as usize * bpp;

        // Fast path: rows survive intact, copy them whole.
        let whole_rows = matches!(flip.transpose, Transpose::None) && !flip.flip_x;
        for z in 0..out_d {
            let zz = if flip.flip_z { out_d - 1 - z } else { z };
            for y in 0..out_h {
                let yy = if flip.flip_y { out_h - 1 - y } else { y };
                if whole_rows {
                    let sz = region.origin[2] as usize + zz as usize;
                    let sy = region.origin[1] as usize + yy as usize;
                    let sx = region.origin[0] as usize;
                    let src_off = ((sz * src_h + sy) * src_w + sx) * bpp;
                    let dst_off = (z as usize * out_h as usize + y as usize)
                        * out_w as usize
                        * bpp;
                    self.bytes[dst_off..dst_off + row_bytes]
                        .copy_from_slice(&src[src_off..src_off + row_bytes]);
                    continue;
                }
                for x in 0..out_w {
                    let xx = if flip.flip_x { out_w - 1 - x } else { x };
                    // Map the flipped output coordinate back into the region.
                    let (rx, ry, rz) = match flip.transpose {
                        Transpose::None => (xx, yy, zz),
                        // Output axes (x, y, z) index the old (z, x, y).
                        Transpose::IjkToKij => (yy, zz, xx),
                    };
                    let sx = region.origin[0] as usize + rx as usize;
                    let sy = region.origin[1] as usize + ry as usize;
                    let sz = region.origin[2] as usize + rz as usize;
                    let src_off = ((sz * src_h + sy) * src_w + sx) * bpp;
                    let dst_off = ((z as usize * out_h as usize + y as usize)
                        * out_w as usize
                        + x as usize)
                        * bpp;
                    self.bytes[dst_off..dst_off + bpp]
                        .copy_from_slice(&src[src_off..src_off + bpp]);
                }
            }
        }
        Ok(())
    }

    /// Fills a 2-D rectangle with a gray level on every slice.
    ///
    /// Only single-component `u8` frames are supported (B-mode images).
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnsupportedPixelType`] for other formats and
    /// [`FormatError::RectOutOfBounds`] if the rectangle does not fit.
    pub fn fill_rect(&mut self, origin: [u32; 2], size: [u32; 2], gray: u8) -> Result<()> {
        if self.format.pixel_type != PixelType::U8 || self.format.components != 1 {
            return Err(FormatError::UnsupportedPixelType {
                operation: "fill_rect",
                actual: self.format.pixel_type.name(),
            });
        }
        let frame = self.size();
        let rect = ClipRect::new_2d(origin[0], origin[1], size[0], size[1]);
        rect.validate_within(FrameSize::new(frame.x(), frame.y(), 1))?;

        let (w, h) = (frame.x() as usize, frame.y() as usize);
        for z in 0..frame.z() as usize {
            for y in 0..size[1] as usize {
                let row = (z * h + origin[1] as usize + y) * w + origin[0] as usize;
                self.bytes[row..row + size[0] as usize].fill(gray);
            }
        }
        Ok(())
    }

    /// Returns a new frame holding the given rectangle, with flips applied.
    ///
    /// # Errors
    ///
    /// Propagates geometry errors from the underlying copy.
    pub fn crop(&self, rect: &ClipRect, flip: FlipInfo) -> Result<Self> {
        let out_size = match flip.transpose {
            Transpose::None => rect.output_size(),
            Transpose::IjkToKij => rect.output_size().rotated_kij(),
        };
        let format = FrameFormat {
            size: out_size,
            ..self.format
        };
        let mut out = Self::allocate(&format)?;
        out.oriented_copy_from(&self.bytes, self.size(), &flip, Some(rect))?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gray_format(w: u32, h: u32) -> FrameFormat {
        FrameFormat::new(
            FrameSize::new(w, h, 1),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Mf,
        )
    }

    #[test]
    fn frame_size_coerces_zero_depth() {
        assert_eq!(FrameSize::new(10, 10, 0).z(), 1);
    }

    #[test]
    fn frame_size_rotation() {
        assert_eq!(FrameSize::new(2, 3, 4).rotated_kij(), FrameSize::new(4, 2, 3));
    }

    #[test]
    fn allocate_zeroed() {
        let frame = PixelFrame::allocate(&gray_format(4, 3)).unwrap();
        assert_eq!(frame.bytes().len(), 12);
        assert!(frame.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let result = PixelFrame::from_bytes(&gray_format(4, 3), vec![0; 11]);
        assert!(matches!(result, Err(FormatError::BufferSizeMismatch { .. })));
    }

    #[test]
    fn copy_identity() {
        let src: Vec<u8> = (0..12).collect();
        let mut frame = PixelFrame::allocate(&gray_format(4, 3)).unwrap();
        frame
            .oriented_copy_from(&src, FrameSize::new(4, 3, 1), &FlipInfo::default(), None)
            .unwrap();
        assert_eq!(frame.bytes(), &src[..]);
    }

    #[test]
    fn copy_flip_x() {
        let src: Vec<u8> = vec![1, 2, 3, 4, 5, 6];
        let mut frame = PixelFrame::allocate(&gray_format(3, 2)).unwrap();
        frame
            .oriented_copy_from(
                &src,
                FrameSize::new(3, 2, 1),
                &FlipInfo::flips(true, false, false),
                None,
            )
            .unwrap();
        assert_eq!(frame.bytes(), &[3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn copy_flip_y() {
        let src: Vec<u8> = vec![1, 2, 3, 4, 5, 6];
        let mut frame = PixelFrame::allocate(&gray_format(3, 2)).unwrap();
        frame
            .oriented_copy_from(
                &src,
                FrameSize::new(3, 2, 1),
                &FlipInfo::flips(false, true, false),
                None,
            )
            .unwrap();
        assert_eq!(frame.bytes(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn copy_clipped() {
        // 4x3 source, clip the center 2x2.
        #[rustfmt::skip]
        let src: Vec<u8> = vec![
            0,  1,  2,  3,
            4,  5,  6,  7,
            8,  9, 10, 11,
        ];
        let mut frame = PixelFrame::allocate(&gray_format(2, 2)).unwrap();
        frame
            .oriented_copy_from(
                &src,
                FrameSize::new(4, 3, 1),
                &FlipInfo::default(),
                Some(&ClipRect::new_2d(1, 0, 2, 2)),
            )
            .unwrap();
        assert_eq!(frame.bytes(), &[1, 2, 5, 6]);
    }

    #[test]
    fn copy_clip_out_of_bounds() {
        let src = vec![0u8; 12];
        let mut frame = PixelFrame::allocate(&gray_format(2, 2)).unwrap();
        let result = frame.oriented_copy_from(
            &src,
            FrameSize::new(4, 3, 1),
            &FlipInfo::default(),
            Some(&ClipRect::new_2d(3, 2, 2, 2)),
        );
        assert!(matches!(result, Err(FormatError::RectOutOfBounds { .. })));
    }

    #[test]
    fn copy_transpose_rotates_volume() {
        // 2x1x3 source volume; KIJ rotation yields 3x2x1.
        let src: Vec<u8> = vec![1, 2, 3, 4, 5, 6];
        let format = FrameFormat::new(
            FrameSize::new(3, 2, 1),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Fm,
        );
        let mut frame = PixelFrame::allocate(&format).unwrap();
        let flip = FlipInfo {
            transpose: Transpose::IjkToKij,
            ..FlipInfo::default()
        };
        frame
            .oriented_copy_from(&src, FrameSize::new(2, 1, 3), &flip, None)
            .unwrap();
        // Output (x, y, z) reads source (y=x_out? mapping): x indexes old z,
        // y indexes old x. Slices of the source are [1,2], [3,4], [5,6].
        assert_eq!(frame.bytes(), &[1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn copy_multibyte_pixels() {
        let format = FrameFormat::new(
            FrameSize::new(2, 1, 1),
            PixelType::I16,
            1,
            ImageType::RfReal,
            ImageOrientation::Mf,
        );
        let src: Vec<u8> = vec![0xAA, 0xBB, 0xCC, 0xDD];
        let mut frame = PixelFrame::allocate(&format).unwrap();
        frame
            .oriented_copy_from(
                &src,
                FrameSize::new(2, 1, 1),
                &FlipInfo::flips(true, false, false),
                None,
            )
            .unwrap();
        // Pixels swap as 2-byte units, bytes within a pixel keep their order.
        assert_eq!(frame.bytes(), &[0xCC, 0xDD, 0xAA, 0xBB]);
    }

    #[test]
    fn fill_rect_basic() {
        let mut frame = PixelFrame::allocate(&gray_format(10, 10)).unwrap();
        frame.fill_rect([2, 2], [3, 4], 200).unwrap();

        for y in 0..10u32 {
            for x in 0..10u32 {
                let value = frame.bytes()[(y * 10 + x) as usize];
                let inside = (2..5).contains(&x) && (2..6).contains(&y);
                assert_eq!(value, if inside { 200 } else { 0 }, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn fill_rect_rejects_non_u8() {
        let format = FrameFormat::new(
            FrameSize::new(4, 4, 1),
            PixelType::I16,
            1,
            ImageType::RfReal,
            ImageOrientation::Mf,
        );
        let mut frame = PixelFrame::allocate(&format).unwrap();
        let result = frame.fill_rect([0, 0], [2, 2], 10);
        assert!(matches!(result, Err(FormatError::UnsupportedPixelType { .. })));
    }

    #[test]
    fn crop_returns_rectangle() {
        #[rustfmt::skip]
        let src: Vec<u8> = vec![
            0,  1,  2,  3,
            4,  5,  6,  7,
            8,  9, 10, 11,
        ];
        let frame = PixelFrame::from_bytes(&gray_format(4, 3), src).unwrap();
        let cropped = frame
            .crop(&ClipRect::new_2d(1, 1, 2, 2), FlipInfo::default())
            .unwrap();
        assert_eq!(cropped.size(), FrameSize::new(2, 2, 1));
        assert_eq!(cropped.bytes(), &[5, 6, 9, 10]);
    }
}
