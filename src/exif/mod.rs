//! EXIF timestamp reading and writing for JPEG files.
//!
//! - [`tiff`] decodes and re-encodes the TIFF block inside the JPEG APP1 segment
//! - [`timestamps`] maps the five date/offset fields onto a small record
//! - [`jpeg`] swaps the APP1 segment in and out of the file with `img-parts`

pub mod jpeg;
pub mod tiff;
pub mod timestamps;

#[cfg(test)]
pub(crate) mod fixtures;

pub use tiff::{ByteOrder, IfdGroup, TiffBlock};
pub use timestamps::{
    TIMESTAMP_FORMAT, Timestamps, TimezoneOffset, format_timestamp, parse_timestamp,
};

use anyhow::{Context, Result};
use std::path::Path;

/// Read the date and offset fields of a JPEG file.
///
/// Returns `None` when the file has no EXIF segment.
pub fn read_timestamps(path: &Path) -> Result<Option<Timestamps>> {
    let jpeg = jpeg::read_jpeg(path)?;
    let Some(payload) = jpeg::exif_payload(&jpeg) else {
        log::debug!("No EXIF segment in {}", path.display());
        return Ok(None);
    };
    let tiff = TiffBlock::parse(payload.to_vec()).context("Failed to decode EXIF block")?;
    Timestamps::read(&tiff).map(Some)
}
