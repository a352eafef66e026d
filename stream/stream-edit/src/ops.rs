//! In-place operations on recorded frame lists.

use nalgebra::Matrix4;
use tracing::{info, warn};

use stream_types::{
    ClipRect, FieldStatus, FlipInfo, TrackedFrame, TrackedFrameList, TransformName,
};

use crate::error::{EditError, Result};

/// Sentinel field value expanded to an incrementing scalar per frame.
pub const FIELD_VALUE_FRAME_SCALAR: &str = "{frame-scalar}";
/// Sentinel field value expanded to an incrementing transform per frame.
pub const FIELD_VALUE_FRAME_TRANSFORM: &str = "{frame-transform}";

/// Keeps only the frames in positions `[first, last]` (inclusive).
///
/// # Errors
///
/// Returns [`EditError::InvalidArgument`] when the range is empty or reaches
/// past the end of the list.
pub fn trim(list: &mut TrackedFrameList, first: usize, last: usize) -> Result<()> {
    info!(first, last, "trimming recording");
    if first > last || last >= list.len() {
        return Err(EditError::invalid_argument(format!(
            "invalid trim range ({first}, {last}); permitted range is (0, {})",
            list.len().saturating_sub(1)
        )));
    }
    if last + 1 < list.len() {
        list.remove_range(last + 1, list.len() - 1)?;
    }
    if first > 0 {
        list.remove_range(0, first - 1)?;
    }
    Ok(())
}

/// Keeps every `factor`-th frame, starting with the first.
///
/// # Errors
///
/// Returns [`EditError::InvalidArgument`] for factors below 2.
pub fn decimate(list: &mut TrackedFrameList, factor: usize) -> Result<()> {
    info!(factor, "decimating recording");
    if factor < 2 {
        return Err(EditError::invalid_argument(format!(
            "invalid decimation factor {factor}; it must be an integer >= 2"
        )));
    }
    list.retain_positions(|position| position % factor == 0);
    Ok(())
}

/// Concatenates recordings in order.
///
/// With `increment_timestamps`, each recording's timestamps are shifted so
/// that its first frame lands on the previous recording's last timestamp,
/// producing one continuous time axis.
#[must_use]
pub fn merge(lists: Vec<TrackedFrameList>, increment_timestamps: bool) -> TrackedFrameList {
    let mut merged = TrackedFrameList::new();
    let mut offset = 0.0;
    for mut list in lists {
        if increment_timestamps {
            for frame in list.iter_mut() {
                if let Some(timestamp) = frame.timestamp() {
                    frame.set_timestamp(timestamp + offset);
                }
            }
            if let Some(last) = list.len().checked_sub(1) {
                if let Some(timestamp) = list.frame(last).and_then(TrackedFrame::timestamp) {
                    offset = timestamp;
                }
            }
        }
        merged.extend_from(list);
    }
    merged
}

/// Parameters of a per-frame field rename/update sweep.
#[derive(Debug, Clone)]
pub struct FrameFieldUpdate {
    /// Field to rename and/or update.
    pub field_name: Option<String>,
    /// New name for the field (the old field is removed).
    pub updated_field_name: Option<String>,
    /// New value; the [`FIELD_VALUE_FRAME_SCALAR`] and
    /// [`FIELD_VALUE_FRAME_TRANSFORM`] sentinels trigger per-frame expansion.
    pub updated_field_value: Option<String>,
    /// First value of the scalar expansion.
    pub frame_scalar_start: f64,
    /// Scalar expansion step.
    pub frame_scalar_increment: f64,
    /// Decimal digits written for expanded values.
    pub frame_scalar_decimal_digits: usize,
    /// First matrix of the transform expansion.
    pub frame_transform_start: Matrix4<f64>,
    /// Transform expansion step.
    pub frame_transform_increment: Matrix4<f64>,
    /// When set, the increment is applied as many times as the value of this
    /// per-frame field; otherwise it accumulates once per frame.
    pub frame_transform_index_field_name: Option<String>,
}

impl Default for FrameFieldUpdate {
    fn default() -> Self {
        Self {
            field_name: None,
            updated_field_name: None,
            updated_field_value: None,
            frame_scalar_start: 0.0,
            frame_scalar_increment: 1.0,
            frame_scalar_decimal_digits: 5,
            frame_transform_start: Matrix4::identity(),
            frame_transform_increment: Matrix4::identity(),
            frame_transform_index_field_name: None,
        }
    }
}

/// Renames and/or rewrites a field on every frame.
///
/// # Errors
///
/// Returns [`EditError::InvalidArgument`] when a frame's transform index
/// field cannot be parsed.
pub fn update_frame_fields(list: &mut TrackedFrameList, update: &FrameFieldUpdate) -> Result<()> {
    info!("updating frame fields");
    let mut scalar = update.frame_scalar_start;
    let mut running_transform = update.frame_transform_start;
    let digits = update.frame_scalar_decimal_digits;

    for frame in list.iter_mut() {
        // Rename pass.
        if let (Some(old), Some(new)) = (&update.field_name, &update.updated_field_name) {
            if let Some(value) = frame.fields.remove(old) {
                frame.fields.set(new.clone(), value);
            }
        }

        let Some(target) = update
            .updated_field_name
            .as_ref()
            .or(update.field_name.as_ref())
        else {
            continue;
        };
        let Some(value) = &update.updated_field_value else {
            continue;
        };

        if value.eq_ignore_ascii_case(FIELD_VALUE_FRAME_SCALAR) {
            frame.fields.set(target.clone(), format!("{scalar:.digits$}"));
            scalar += update.frame_scalar_increment;
        } else if value.eq_ignore_ascii_case(FIELD_VALUE_FRAME_TRANSFORM) {
            let matrix = match &update.frame_transform_index_field_name {
                None => running_transform,
                Some(index_field) => {
                    let count = frame.fields.get_u64(index_field).map_err(|_| {
                        EditError::invalid_argument(format!(
                            "cannot read transform index from field '{index_field}'"
                        ))
                    })?;
                    let mut cumulative = update.frame_transform_start;
                    for _ in 0..count {
                        cumulative = update.frame_transform_increment * cumulative;
                    }
                    cumulative
                }
            };
            frame
                .fields
                .set(target.clone(), format_matrix_with_digits(&matrix, digits));
            if update.frame_transform_index_field_name.is_none() {
                running_transform *= update.frame_transform_increment;
            }
        } else {
            frame.fields.set(target.clone(), value.clone());
        }
    }
    Ok(())
}

/// Removes a field from every frame that carries it.
///
/// # Errors
///
/// Returns [`EditError::InvalidArgument`] for an empty field name.
pub fn delete_frame_field(list: &mut TrackedFrameList, field_name: &str) -> Result<()> {
    if field_name.is_empty() {
        return Err(EditError::invalid_argument("field name is empty"));
    }
    info!(field = field_name, "deleting frame field");
    for frame in list.iter_mut() {
        frame.fields.remove(field_name);
    }
    Ok(())
}

/// Renames a recording-level field, keeping its value.
pub fn update_field_name(list: &mut TrackedFrameList, field_name: &str, updated_name: &str) {
    info!(field = field_name, updated = updated_name, "renaming recording field");
    if let Some(value) = list.custom_fields.remove(field_name) {
        list.custom_fields.set(updated_name, value);
    }
}

/// Sets a recording-level field, adding it when absent.
pub fn update_field_value(list: &mut TrackedFrameList, field_name: &str, value: &str) {
    info!(field = field_name, "updating recording field");
    list.custom_fields.set(field_name, value);
}

/// Removes a recording-level field.
pub fn delete_field(list: &mut TrackedFrameList, field_name: &str) {
    info!(field = field_name, "deleting recording field");
    list.custom_fields.remove(field_name);
}

/// Resolves derived transforms for single frames.
///
/// The production transform repository (configuration-driven pose graph)
/// lives outside this crate; editors that have one wire it in through this
/// seam.
pub trait TransformSource {
    /// Returns the named transform for the given frame, or `None` when it
    /// cannot be derived.
    fn resolve(&self, name: &TransformName, frame: &TrackedFrame) -> Option<Matrix4<f64>>;
}

/// Derives transforms by chaining the transforms already present on the
/// frame, inverting them as needed.
///
/// # Example
///
/// ```
/// use nalgebra::{Matrix4, Vector3};
/// use stream_edit::{FrameGraphSource, TransformSource};
/// use stream_types::{FieldStatus, TrackedFrame, TransformName};
///
/// let mut frame = TrackedFrame::new();
/// let probe_to_ref = TransformName::new("Probe", "Reference").unwrap();
/// let ref_to_tracker = TransformName::new("Reference", "Tracker").unwrap();
/// frame.set_transform(
///     &probe_to_ref,
///     &Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)),
///     FieldStatus::Ok,
/// );
/// frame.set_transform(
///     &ref_to_tracker,
///     &Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0)),
///     FieldStatus::Ok,
/// );
///
/// let derived = FrameGraphSource
///     .resolve(&TransformName::new("Probe", "Tracker").unwrap(), &frame)
///     .unwrap();
/// assert!((derived[(0, 3)] - 1.0).abs() < 1e-12);
/// assert!((derived[(1, 3)] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameGraphSource;

impl TransformSource for FrameGraphSource {
    fn resolve(&self, name: &TransformName, frame: &TrackedFrame) -> Option<Matrix4<f64>> {
        // Edges of the frame's pose graph: (from, to, matrix), both ways.
        let mut edges: Vec<(String, String, Matrix4<f64>)> = Vec::new();
        for stored in frame.transform_names() {
            if frame.transform_status(&stored) == Some(FieldStatus::Invalid) {
                continue;
            }
            let Ok(matrix) = frame.transform(&stored) else {
                continue;
            };
            if let Some(inverse) = matrix.try_inverse() {
                edges.push((stored.to().to_string(), stored.from().to_string(), inverse));
            }
            edges.push((stored.from().to_string(), stored.to().to_string(), matrix));
        }

        // Breadth-first walk from the source frame, accumulating the mapping
        // into each visited frame.
        let mut reached: Vec<(String, Matrix4<f64>)> =
            vec![(name.from().to_string(), Matrix4::identity())];
        let mut visited = vec![name.from().to_string()];
        let mut cursor = 0;
        while cursor < reached.len() {
            let (current, accumulated) = reached[cursor].clone();
            if current == name.to() {
                return Some(accumulated);
            }
            for (from, to, matrix) in &edges {
                if *from == current && !visited.contains(to) {
                    visited.push(to.clone());
                    reached.push((to.clone(), matrix * accumulated));
                }
            }
            cursor += 1;
        }
        None
    }
}

/// Adds the named derived transforms to every frame.
///
/// A transform the source cannot derive is written as identity with
/// [`FieldStatus::Invalid`], so downstream consumers see the gap instead of
/// a missing field.
pub fn add_transforms(
    list: &mut TrackedFrameList,
    names: &[TransformName],
    source: &dyn TransformSource,
) {
    info!(count = names.len(), "adding derived transforms");
    for (position, frame) in list.iter_mut().enumerate() {
        for name in names {
            match source.resolve(name, frame) {
                Some(matrix) => {
                    frame.set_transform(name, &matrix, FieldStatus::Ok);
                }
                None => {
                    warn!(frame = position, transform = %name, "cannot derive transform");
                    frame.set_transform(name, &Matrix4::identity(), FieldStatus::Invalid);
                }
            }
        }
    }
}

/// Fills a rectangle with a gray level on every frame's image.
///
/// The gray level is clamped to `[0, 255]`. Frames without image data, with
/// unsupported pixel formats, or too small for the rectangle are skipped
/// with a warning.
pub fn fill_rectangle(
    list: &mut TrackedFrameList,
    origin: [u32; 2],
    size: [u32; 2],
    gray_level: i32,
) {
    let gray = u8::try_from(gray_level.clamp(0, 255)).unwrap_or(0);
    info!(?origin, ?size, gray, "filling image rectangle");
    for (position, frame) in list.iter_mut().enumerate() {
        let Some(image) = frame.image.as_mut() else {
            warn!(frame = position, "no image data; fill skipped");
            continue;
        };
        if let Err(err) = image.fill_rect(origin, size, gray) {
            warn!(frame = position, %err, "fill skipped");
        }
    }
}

/// Replaces every frame's image with the given rectangle and records the
/// `Image` -> `CroppedImage` translation alongside it.
///
/// # Errors
///
/// Returns the first cropping failure (the rectangle must fit every frame).
pub fn crop_rectangle(
    list: &mut TrackedFrameList,
    flip: FlipInfo,
    rect: &ClipRect,
) -> Result<()> {
    info!(?rect, "cropping images");
    let image_to_cropped = TransformName::new("Image", "CroppedImage")
        .map_err(EditError::Format)?;
    let mut offset_matrix = Matrix4::identity();
    offset_matrix[(0, 3)] = -f64::from(rect.origin[0]);
    offset_matrix[(1, 3)] = -f64::from(rect.origin[1]);
    offset_matrix[(2, 3)] = -f64::from(rect.origin[2]);

    for (position, frame) in list.iter_mut().enumerate() {
        let Some(image) = frame.image.as_mut() else {
            warn!(frame = position, "no image data; crop skipped");
            continue;
        };
        let cropped = image.crop(rect, flip)?;
        frame.image = Some(cropped);
        frame.set_transform(&image_to_cropped, &offset_matrix, FieldStatus::Ok);
    }
    Ok(())
}

/// Rewrites every `XTo<Reference>` transform into `XTo<Tracker>` using the
/// recorded reference transform, then removes the originals.
///
/// For each frame: read the reference transform (e.g. `ReferenceToTracker`);
/// for every other stored transform compose
/// `XToTracker := ReferenceToTracker * XToReference`, keep the source
/// transform's status, and delete the source transform together with its
/// status field. Frames without the reference transform are left untouched.
pub fn rewrite_reference_transforms(list: &mut TrackedFrameList, reference: &TransformName) {
    info!(reference = %reference, "rewriting reference transforms");
    for (position, frame) in list.iter_mut().enumerate() {
        let Ok(reference_matrix) = frame.transform(reference) else {
            warn!(frame = position, reference = %reference, "reference transform not found");
            continue;
        };

        for name in frame.transform_names() {
            if name == *reference {
                continue;
            }
            let Ok(matrix) = frame.transform(&name) else {
                warn!(transform = %name, "cannot read transform; skipped");
                continue;
            };
            let Some(status) = frame.transform_status(&name) else {
                warn!(transform = %name, "transform carries no status; skipped");
                continue;
            };

            let rewritten = reference_matrix * matrix;
            let new_name = name.retargeted(reference.to());
            frame.set_transform(&new_name, &rewritten, status);
            frame.fields.delete_transform(&name);
        }
    }
}

/// Renders a matrix as 16 numbers with a fixed number of decimal digits.
fn format_matrix_with_digits(matrix: &Matrix4<f64>, digits: usize) -> String {
    let mut out = String::with_capacity(16 * (digits + 4));
    for row in 0..4 {
        for col in 0..4 {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("{:.digits$}", matrix[(row, col)]));
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn list_of(count: usize) -> TrackedFrameList {
        (0..count)
            .map(|i| {
                let mut frame = TrackedFrame::new();
                frame.set_frame_number(i as u64);
                frame.set_timestamp(0.1 * i as f64);
                frame
            })
            .collect()
    }

    fn frame_numbers(list: &TrackedFrameList) -> Vec<u64> {
        list.iter().map(|f| f.frame_number().unwrap()).collect()
    }

    fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn trim_keeps_inclusive_range() {
        let mut list = list_of(10);
        trim(&mut list, 2, 5).unwrap();
        assert_eq!(frame_numbers(&list), vec![2, 3, 4, 5]);
    }

    #[test]
    fn trim_full_range_is_a_no_op() {
        let mut list = list_of(4);
        trim(&mut list, 0, 3).unwrap();
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn trim_rejects_bad_ranges() {
        let mut list = list_of(4);
        assert!(trim(&mut list, 3, 2).is_err());
        assert!(trim(&mut list, 0, 4).is_err());
    }

    #[test]
    fn decimate_keeps_every_nth() {
        let mut list = list_of(10);
        decimate(&mut list, 3).unwrap();
        assert_eq!(frame_numbers(&list), vec![0, 3, 6, 9]);
    }

    #[test]
    fn decimate_rejects_small_factors() {
        let mut list = list_of(10);
        assert!(decimate(&mut list, 1).is_err());
    }

    #[test]
    fn merge_plain_concatenates() {
        let merged = merge(vec![list_of(2), list_of(3)], false);
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.frame(2).unwrap().timestamp(), Some(0.0));
    }

    #[test]
    fn merge_increments_timestamps() {
        // Both recordings carry timestamps 0.0 and 0.1; incrementing shifts
        // the second onto the end of the first.
        let merged = merge(vec![list_of(2), list_of(2)], true);
        let timestamps: Vec<f64> = merged.iter().map(|f| f.timestamp().unwrap()).collect();
        assert_eq!(timestamps, vec![0.0, 0.1, 0.1, 0.2]);
    }

    #[test]
    fn frame_field_rename() {
        let mut list = list_of(3);
        for frame in list.iter_mut() {
            frame.fields.set("Probe", "linear");
        }
        let update = FrameFieldUpdate {
            field_name: Some("Probe".into()),
            updated_field_name: Some("ProbeModel".into()),
            ..FrameFieldUpdate::default()
        };
        update_frame_fields(&mut list, &update).unwrap();

        for frame in list.iter() {
            assert_eq!(frame.fields.get("ProbeModel"), Some("linear"));
            assert!(frame.fields.get("Probe").is_none());
        }
    }

    #[test]
    fn frame_scalar_expansion() {
        let mut list = list_of(3);
        let update = FrameFieldUpdate {
            field_name: Some("Depth".into()),
            updated_field_value: Some(FIELD_VALUE_FRAME_SCALAR.into()),
            frame_scalar_start: 2.0,
            frame_scalar_increment: 0.5,
            frame_scalar_decimal_digits: 2,
            ..FrameFieldUpdate::default()
        };
        update_frame_fields(&mut list, &update).unwrap();

        let values: Vec<&str> = list.iter().map(|f| f.fields.get("Depth").unwrap()).collect();
        assert_eq!(values, vec!["2.00", "2.50", "3.00"]);
    }

    #[test]
    fn frame_transform_expansion_accumulates() {
        let mut list = list_of(3);
        let update = FrameFieldUpdate {
            field_name: Some("StageToBaseTransform".into()),
            updated_field_value: Some(FIELD_VALUE_FRAME_TRANSFORM.into()),
            frame_transform_increment: translation(1.0, 0.0, 0.0),
            frame_scalar_decimal_digits: 1,
            ..FrameFieldUpdate::default()
        };
        update_frame_fields(&mut list, &update).unwrap();

        let name = TransformName::parse("StageToBaseTransform").unwrap();
        let offsets: Vec<f64> = list
            .iter()
            .map(|f| f.transform(&name).unwrap()[(0, 3)])
            .collect();
        assert_eq!(offsets, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn frame_transform_expansion_by_index_field() {
        let mut list = list_of(3);
        for (i, frame) in list.iter_mut().enumerate() {
            frame.fields.set("StepCount", format!("{}", i * 2));
        }
        let update = FrameFieldUpdate {
            field_name: Some("StageToBaseTransform".into()),
            updated_field_value: Some(FIELD_VALUE_FRAME_TRANSFORM.into()),
            frame_transform_increment: translation(1.0, 0.0, 0.0),
            frame_transform_index_field_name: Some("StepCount".into()),
            ..FrameFieldUpdate::default()
        };
        update_frame_fields(&mut list, &update).unwrap();

        let name = TransformName::parse("StageToBaseTransform").unwrap();
        let offsets: Vec<f64> = list
            .iter()
            .map(|f| f.transform(&name).unwrap()[(0, 3)])
            .collect();
        assert_eq!(offsets, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn delete_frame_field_sweeps_all_frames() {
        let mut list = list_of(3);
        for frame in list.iter_mut() {
            frame.fields.set("Scratch", "x");
        }
        delete_frame_field(&mut list, "Scratch").unwrap();
        assert!(list.iter().all(|f| f.fields.get("Scratch").is_none()));
    }

    #[test]
    fn recording_level_field_edits() {
        let mut list = list_of(1);
        update_field_value(&mut list, "Device", "demo");
        assert_eq!(list.custom_fields.get("Device"), Some("demo"));

        update_field_name(&mut list, "Device", "DeviceId");
        assert_eq!(list.custom_fields.get("DeviceId"), Some("demo"));
        assert!(list.custom_fields.get("Device").is_none());

        delete_field(&mut list, "DeviceId");
        assert!(list.custom_fields.is_empty());
    }

    #[test]
    fn add_transforms_derives_through_chain() {
        let mut list = list_of(2);
        let probe_to_ref = TransformName::new("Probe", "Reference").unwrap();
        let ref_to_tracker = TransformName::new("Reference", "Tracker").unwrap();
        for frame in list.iter_mut() {
            frame.set_transform(&probe_to_ref, &translation(1.0, 0.0, 0.0), FieldStatus::Ok);
            frame.set_transform(&ref_to_tracker, &translation(0.0, 2.0, 0.0), FieldStatus::Ok);
        }

        let probe_to_tracker = TransformName::new("Probe", "Tracker").unwrap();
        add_transforms(&mut list, std::slice::from_ref(&probe_to_tracker), &FrameGraphSource);

        for frame in list.iter() {
            let derived = frame.transform(&probe_to_tracker).unwrap();
            assert_eq!(derived[(0, 3)], 1.0);
            assert_eq!(derived[(1, 3)], 2.0);
            assert_eq!(frame.transform_status(&probe_to_tracker), Some(FieldStatus::Ok));
        }
    }

    #[test]
    fn add_transforms_inverts_edges_when_needed() {
        let mut list = list_of(1);
        let tracker_to_probe = TransformName::new("Tracker", "Probe").unwrap();
        list.frame_mut(0).unwrap().set_transform(
            &tracker_to_probe,
            &translation(3.0, 0.0, 0.0),
            FieldStatus::Ok,
        );

        let probe_to_tracker = TransformName::new("Probe", "Tracker").unwrap();
        add_transforms(&mut list, std::slice::from_ref(&probe_to_tracker), &FrameGraphSource);

        let derived = list.frame(0).unwrap().transform(&probe_to_tracker).unwrap();
        assert_eq!(derived[(0, 3)], -3.0);
    }

    #[test]
    fn add_transforms_marks_underivable_invalid() {
        let mut list = list_of(1);
        let name = TransformName::new("Stylus", "Tracker").unwrap();
        add_transforms(&mut list, std::slice::from_ref(&name), &FrameGraphSource);

        let frame = list.frame(0).unwrap();
        assert_eq!(frame.transform(&name).unwrap(), Matrix4::identity());
        assert_eq!(frame.transform_status(&name), Some(FieldStatus::Invalid));
    }

    #[test]
    fn rewrite_reference_transforms_scenario() {
        let mut list = list_of(1);
        let ref_to_tracker = TransformName::new("Ref", "Tracker").unwrap();
        let tool_to_ref = TransformName::new("Tool", "Ref").unwrap();
        {
            let frame = list.frame_mut(0).unwrap();
            frame.set_transform(&ref_to_tracker, &translation(1.0, 0.0, 0.0), FieldStatus::Ok);
            frame.set_transform(&tool_to_ref, &translation(0.0, 1.0, 0.0), FieldStatus::Ok);
        }

        rewrite_reference_transforms(&mut list, &ref_to_tracker);

        let frame = list.frame(0).unwrap();
        let tool_to_tracker = TransformName::new("Tool", "Tracker").unwrap();
        let rewritten = frame.transform(&tool_to_tracker).unwrap();
        assert_eq!(rewritten[(0, 3)], 1.0);
        assert_eq!(rewritten[(1, 3)], 1.0);
        assert_eq!(frame.transform_status(&tool_to_tracker), Some(FieldStatus::Ok));

        // The original transform and its status field are gone; the
        // reference itself stays.
        assert!(frame.transform(&tool_to_ref).is_err());
        assert!(frame.fields.get("ToolToRefTransformStatus").is_none());
        assert!(frame.transform(&ref_to_tracker).is_ok());
    }

    #[test]
    fn rewrite_keeps_source_status() {
        let mut list = list_of(1);
        let ref_to_tracker = TransformName::new("Ref", "Tracker").unwrap();
        let tool_to_ref = TransformName::new("Tool", "Ref").unwrap();
        {
            let frame = list.frame_mut(0).unwrap();
            frame.set_transform(&ref_to_tracker, &translation(1.0, 0.0, 0.0), FieldStatus::Ok);
            frame.set_transform(&tool_to_ref, &translation(0.0, 1.0, 0.0), FieldStatus::Invalid);
        }

        rewrite_reference_transforms(&mut list, &ref_to_tracker);

        let frame = list.frame(0).unwrap();
        let tool_to_tracker = TransformName::new("Tool", "Tracker").unwrap();
        assert_eq!(frame.transform_status(&tool_to_tracker), Some(FieldStatus::Invalid));
    }

    #[test]
    fn fill_rectangle_scenario() {
        use stream_types::{
            FrameFormat, FrameSize, ImageOrientation, ImageType, PixelFrame, PixelType,
        };

        let format = FrameFormat::new(
            FrameSize::new(10, 10, 1),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Mf,
        );
        let mut list = list_of(1);
        list.frame_mut(0).unwrap().image = Some(PixelFrame::allocate(&format).unwrap());

        fill_rectangle(&mut list, [2, 2], [3, 4], 200);

        let image = list.frame(0).unwrap().image.as_ref().unwrap();
        for y in 0..10u32 {
            for x in 0..10u32 {
                let inside = (2..5).contains(&x) && (2..6).contains(&y);
                let value = image.bytes()[(y * 10 + x) as usize];
                assert_eq!(value, if inside { 200 } else { 0 }, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn fill_gray_level_is_clamped() {
        use stream_types::{
            FrameFormat, FrameSize, ImageOrientation, ImageType, PixelFrame, PixelType,
        };

        let format = FrameFormat::new(
            FrameSize::new(2, 2, 1),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Mf,
        );
        let mut list = list_of(1);
        list.frame_mut(0).unwrap().image = Some(PixelFrame::allocate(&format).unwrap());

        fill_rectangle(&mut list, [0, 0], [2, 2], 9000);
        let image = list.frame(0).unwrap().image.as_ref().unwrap();
        assert!(image.bytes().iter().all(|&b| b == 255));
    }

    #[test]
    fn crop_rectangle_replaces_image_and_records_offset() {
        use stream_types::{
            FrameFormat, FrameSize, ImageOrientation, ImageType, PixelFrame, PixelType,
        };

        let format = FrameFormat::new(
            FrameSize::new(4, 3, 1),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Mf,
        );
        let mut list = list_of(1);
        list.frame_mut(0).unwrap().image =
            Some(PixelFrame::from_bytes(&format, (0..12).collect()).unwrap());

        crop_rectangle(&mut list, FlipInfo::default(), &ClipRect::new_2d(1, 1, 2, 2)).unwrap();

        let frame = list.frame(0).unwrap();
        let image = frame.image.as_ref().unwrap();
        assert_eq!(image.size(), FrameSize::new(2, 2, 1));
        assert_eq!(image.bytes(), &[5, 6, 9, 10]);

        let name = TransformName::new("Image", "CroppedImage").unwrap();
        let offset = frame.transform(&name).unwrap();
        assert_eq!(offset[(0, 3)], -1.0);
        assert_eq!(offset[(1, 3)], -1.0);
        assert_eq!(frame.transform_status(&name), Some(FieldStatus::Ok));
    }
}
