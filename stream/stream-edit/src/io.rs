//! Reading and writing recordings as JSON documents.
//!
//! The native sequence-file codec lives outside this crate; recordings pass
//! through this seam as serde documents holding the recording-level fields
//! plus per-frame field maps and optional pixel frames.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use stream_types::TrackedFrameList;

use crate::error::Result;

/// Options for writing a recording.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Strip pixel data from every frame (keep only tracking/fields).
    pub omit_images: bool,
    /// Write the compact encoding instead of the pretty one.
    pub compact: bool,
}

/// Reads a recording from a JSON document.
///
/// # Errors
///
/// Fails on file I/O or codec errors.
pub fn read_list(path: &Path) -> Result<TrackedFrameList> {
    info!(path = %path.display(), "reading recording");
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes a recording to a JSON document.
///
/// # Errors
///
/// Fails on file I/O or codec errors.
pub fn write_list(path: &Path, list: &TrackedFrameList, options: WriteOptions) -> Result<()> {
    info!(path = %path.display(), frames = list.len(), "writing recording");
    let writer = BufWriter::new(File::create(path)?);

    if options.omit_images {
        let mut stripped = list.clone();
        for frame in stripped.iter_mut() {
            frame.image = None;
        }
        encode(writer, &stripped, options.compact)?;
    } else {
        encode(writer, list, options.compact)?;
    }
    Ok(())
}

fn encode(
    writer: BufWriter<File>,
    list: &TrackedFrameList,
    compact: bool,
) -> std::result::Result<(), serde_json::Error> {
    if compact {
        serde_json::to_writer(writer, list)
    } else {
        serde_json::to_writer_pretty(writer, list)
    }
}
