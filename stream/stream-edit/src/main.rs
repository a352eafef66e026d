//! Command-line editor for recorded acquisition sequences.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use nalgebra::Matrix4;
use tracing::{info, warn};

use stream_edit::io::{read_list, write_list, WriteOptions};
use stream_edit::{
    add_transforms, crop_rectangle, decimate, delete_field, delete_frame_field, fill_rectangle,
    merge, rewrite_reference_transforms, trim, update_field_name, update_field_value,
    update_frame_fields, FrameFieldUpdate, FrameGraphSource,
};
use stream_types::{ClipRect, FlipInfo, TrackedFrameList, TransformName};

/// Modification applied to the input recording before it is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
enum Operation {
    /// Rename a field on each frame.
    UpdateFrameFieldName,
    /// Update (or add) a field value on each frame.
    UpdateFrameFieldValue,
    /// Delete a field from each frame.
    DeleteFrameField,
    /// Rename a recording-level field.
    UpdateFieldName,
    /// Update (or add) a recording-level field value.
    UpdateFieldValue,
    /// Delete a recording-level field.
    DeleteField,
    /// Add derived transforms to each frame.
    AddTransform,
    /// Keep only the frames between the first and last index.
    Trim,
    /// Merge the input recordings into one.
    Merge,
    /// Keep every N-th frame.
    Decimate,
    /// Fill a rectangle in each image (e.g. to blank out burnt-in data).
    FillImageRectangle,
    /// Crop each image to a rectangle.
    Crop,
    /// Drop pixel data on write, keeping only tracking data and fields.
    RemoveImageData,
}

#[derive(Parser)]
#[command(name = "edit-sequence")]
#[command(about = "Edit recorded acquisition sequences", long_about = None)]
#[command(version)]
struct Cli {
    /// Input recording to edit.
    #[arg(long = "source-seq-file")]
    source_seq_file: Option<PathBuf>,

    /// Input recording list (for MERGE, in order).
    #[arg(long = "source-seq-files", num_args = 1..)]
    source_seq_files: Vec<PathBuf>,

    /// Where to write the result.
    #[arg(long = "output-seq-file")]
    output_seq_file: PathBuf,

    /// Operation to apply; without one the input is copied through.
    #[arg(long, value_enum)]
    operation: Option<Operation>,

    /// First kept frame index for TRIM (0-based).
    #[arg(long = "first-frame-index", default_value_t = 0)]
    first_frame_index: usize,

    /// Last kept frame index for TRIM (inclusive).
    #[arg(long = "last-frame-index", default_value_t = 0)]
    last_frame_index: usize,

    /// Keep every N-th frame for DECIMATE (N >= 2).
    #[arg(long = "decimation-factor", default_value_t = 2)]
    decimation_factor: usize,

    /// Field to edit.
    #[arg(long = "field-name")]
    field_name: Option<String>,

    /// New field name.
    #[arg(long = "updated-field-name")]
    updated_field_name: Option<String>,

    /// New field value; `{frame-scalar}` and `{frame-transform}` expand per
    /// frame.
    #[arg(long = "updated-field-value")]
    updated_field_value: Option<String>,

    /// First value of the `{frame-scalar}` expansion.
    #[arg(long = "frame-scalar-start", default_value_t = 0.0)]
    frame_scalar_start: f64,

    /// Step of the `{frame-scalar}` expansion.
    #[arg(long = "frame-scalar-increment", default_value_t = 1.0)]
    frame_scalar_increment: f64,

    /// Decimal digits written for expanded values.
    #[arg(long = "frame-scalar-decimal-digits", default_value_t = 5)]
    frame_scalar_decimal_digits: usize,

    /// First matrix of the `{frame-transform}` expansion (16 numbers).
    #[arg(long = "frame-transform-start")]
    frame_transform_start: Option<String>,

    /// Step matrix of the `{frame-transform}` expansion (16 numbers).
    #[arg(long = "frame-transform-increment")]
    frame_transform_increment: Option<String>,

    /// Apply the increment as many times as the value of this frame field.
    #[arg(long = "frame-transform-index-field-name")]
    frame_transform_index_field_name: Option<String>,

    /// Rewrite all ToolToReference transforms through this reference
    /// transform (e.g. ReferenceToTracker) into ToolToTracker.
    #[arg(long = "update-reference-transform")]
    update_reference_transform: Option<String>,

    /// Transforms to add to each frame, comma separated
    /// (e.g. StylusTipToReference,ProbeToReference).
    #[arg(long = "add-transform")]
    add_transform: Option<String>,

    /// Device configuration for the transform repository; unused by the
    /// built-in frame-local resolver.
    #[arg(long = "config-file")]
    config_file: Option<PathBuf>,

    /// Rectangle top-left corner for FILL_IMAGE_RECTANGLE and CROP.
    #[arg(long = "rect-origin", num_args = 2..=3)]
    rect_origin: Vec<u32>,

    /// Rectangle size for FILL_IMAGE_RECTANGLE and CROP.
    #[arg(long = "rect-size", num_args = 2..=3)]
    rect_size: Vec<u32>,

    /// Flip images along X while cropping.
    #[arg(long = "flipX")]
    flip_x: bool,

    /// Flip images along Y while cropping.
    #[arg(long = "flipY")]
    flip_y: bool,

    /// Flip images along Z while cropping.
    #[arg(long = "flipZ")]
    flip_z: bool,

    /// Gray level for FILL_IMAGE_RECTANGLE, clamped to 0..=255.
    #[arg(long = "fill-gray-level", default_value_t = 0)]
    fill_gray_level: i32,

    /// Write the compact recording encoding.
    #[arg(long = "use-compression")]
    use_compression: bool,

    /// Offset timestamps so merged recordings form one continuous time axis.
    #[arg(long = "increment-timestamps")]
    increment_timestamps: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let mut inputs = cli.source_seq_files.clone();
    if let Some(input) = &cli.source_seq_file {
        inputs.insert(0, input.clone());
    }
    if inputs.is_empty() {
        bail!("at least one input recording is required");
    }

    let mut lists = Vec::with_capacity(inputs.len());
    for path in &inputs {
        lists.push(
            read_list(path).with_context(|| format!("cannot read {}", path.display()))?,
        );
    }
    let mut list = merge(lists, cli.increment_timestamps);

    apply_operation(&cli, &mut list)?;

    if let Some(reference) = &cli.update_reference_transform {
        let reference = TransformName::parse(reference)
            .with_context(|| format!("invalid reference transform name '{reference}'"))?;
        rewrite_reference_transforms(&mut list, &reference);
    }

    write_list(
        &cli.output_seq_file,
        &list,
        WriteOptions {
            omit_images: cli.operation == Some(Operation::RemoveImageData),
            compact: cli.use_compression,
        },
    )
    .with_context(|| format!("cannot write {}", cli.output_seq_file.display()))?;

    info!("sequence editing finished");
    Ok(())
}

fn apply_operation(cli: &Cli, list: &mut TrackedFrameList) -> Result<()> {
    let Some(operation) = cli.operation else {
        info!("no operation specified; copying the input through");
        return Ok(());
    };

    match operation {
        // Merging happened while reading the inputs; image removal happens
        // when writing the output.
        Operation::Merge | Operation::RemoveImageData => {}
        Operation::Trim => {
            trim(list, cli.first_frame_index, cli.last_frame_index)?;
        }
        Operation::Decimate => {
            decimate(list, cli.decimation_factor)?;
        }
        Operation::UpdateFrameFieldName => {
            let update = FrameFieldUpdate {
                field_name: cli.field_name.clone(),
                updated_field_name: cli.updated_field_name.clone(),
                ..FrameFieldUpdate::default()
            };
            update_frame_fields(list, &update)?;
        }
        Operation::UpdateFrameFieldValue => {
            let update = FrameFieldUpdate {
                field_name: cli.field_name.clone(),
                updated_field_name: cli.updated_field_name.clone(),
                updated_field_value: cli.updated_field_value.clone(),
                frame_scalar_start: cli.frame_scalar_start,
                frame_scalar_increment: cli.frame_scalar_increment,
                frame_scalar_decimal_digits: cli.frame_scalar_decimal_digits,
                frame_transform_start: parse_matrix_arg(
                    cli.frame_transform_start.as_deref(),
                    "--frame-transform-start",
                )?,
                frame_transform_increment: parse_matrix_arg(
                    cli.frame_transform_increment.as_deref(),
                    "--frame-transform-increment",
                )?,
                frame_transform_index_field_name: cli.frame_transform_index_field_name.clone(),
            };
            update_frame_fields(list, &update)?;
        }
        Operation::DeleteFrameField => {
            let name = cli
                .field_name
                .as_deref()
                .context("--field-name is required for DELETE_FRAME_FIELD")?;
            delete_frame_field(list, name)?;
        }
        Operation::UpdateFieldName => {
            let (name, updated) = (
                cli.field_name
                    .as_deref()
                    .context("--field-name is required for UPDATE_FIELD_NAME")?,
                cli.updated_field_name
                    .as_deref()
                    .context("--updated-field-name is required for UPDATE_FIELD_NAME")?,
            );
            update_field_name(list, name, updated);
        }
        Operation::UpdateFieldValue => {
            let name = cli
                .field_name
                .as_deref()
                .context("--field-name is required for UPDATE_FIELD_VALUE")?;
            let value = cli
                .updated_field_value
                .as_deref()
                .context("--updated-field-value is required for UPDATE_FIELD_VALUE")?;
            update_field_value(list, name, value);
        }
        Operation::DeleteField => {
            let name = cli
                .field_name
                .as_deref()
                .context("--field-name is required for DELETE_FIELD")?;
            delete_field(list, name);
        }
        Operation::AddTransform => {
            let raw = cli
                .add_transform
                .as_deref()
                .context("--add-transform is required for ADD_TRANSFORM")?;
            let names = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(TransformName::parse)
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("invalid transform name in --add-transform")?;
            if names.is_empty() {
                bail!("--add-transform names no transforms");
            }
            if cli.config_file.is_some() {
                warn!("--config-file is ignored; transforms are derived from each frame");
            }
            add_transforms(list, &names, &FrameGraphSource);
        }
        Operation::FillImageRectangle => {
            let (origin, size) = rect_args(cli, 2)?;
            fill_rectangle(
                list,
                [origin[0], origin[1]],
                [size[0], size[1]],
                cli.fill_gray_level,
            );
        }
        Operation::Crop => {
            let (origin, size) = rect_args(cli, 2)?;
            let rect = ClipRect {
                origin: [origin[0], origin[1], *origin.get(2).unwrap_or(&0)],
                size: [size[0], size[1], *size.get(2).unwrap_or(&1)],
            };
            let flip = FlipInfo::flips(cli.flip_x, cli.flip_y, cli.flip_z);
            crop_rectangle(list, flip, &rect)?;
        }
    }
    Ok(())
}

fn rect_args(cli: &Cli, minimum: usize) -> Result<(&[u32], &[u32])> {
    if cli.rect_origin.len() < minimum || cli.rect_size.len() < minimum {
        bail!("--rect-origin and --rect-size must be given as X Y <Z> and I J <K>");
    }
    Ok((&cli.rect_origin, &cli.rect_size))
}

fn parse_matrix_arg(value: Option<&str>, flag: &str) -> Result<Matrix4<f64>> {
    let Some(value) = value else {
        return Ok(Matrix4::identity());
    };
    let numbers = value
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<Vec<f64>, _>>()
        .with_context(|| format!("{flag} must hold 16 numbers"))?;
    if numbers.len() != 16 {
        bail!("{flag} must hold 16 numbers, got {}", numbers.len());
    }
    Ok(Matrix4::from_row_slice(&numbers))
}
