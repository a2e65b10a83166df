//! # exif-timeshift
//!
//! Shift the EXIF capture timestamps of JPEG files by a fixed offset, e.g. to
//! correct a camera whose clock was set wrong, and optionally record the UTC
//! offset the photos were taken in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_timeshift::config::OutputConfig;
//! use exif_timeshift::exif::TimezoneOffset;
//! use exif_timeshift::patcher::TimeShift;
//! use exif_timeshift::pipeline::{collect_jpegs, process_image};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Camera was 1h05m behind and the trip was in UTC+10
//!     let shift = TimeShift::new(1, 5, TimezoneOffset::from_hours(10))?;
//!
//!     for path in collect_jpegs(Path::new("./photos"), false)? {
//!         let result = process_image(&path, &shift, &OutputConfig::default());
//!         if let Some(ref err) = result.error {
//!             eprintln!("Error processing {}: {err}", path.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## What is written
//!
//! | Field | Group | Value |
//! |-------|-------|-------|
//! | DateTimeOriginal (0x9003) | Exif | shifted time |
//! | DateTimeDigitized (0x9004) | Exif | shifted time |
//! | DateTime (0x0132) | IFD0 | shifted time |
//! | OffsetTimeOriginal (0x9011) | Exif | `±HH:00`, only with a timezone |
//! | OffsetTimeDigitized (0x9012) | Exif | `±HH:00`, only with a timezone |
//!
//! DateTimeOriginal is the source; files without it are skipped untouched.
//! All other metadata and the image data are kept byte for byte.
//!
//! ## Modules
//!
//! - [`exif`] - EXIF block codec and the timestamp record
//! - [`patcher`] - the per-file timestamp patch
//! - [`pipeline`] - file collection and batch processing
//! - [`prompt`] - interactive input
//! - [`config`] - configuration loading/saving

pub mod config;
pub mod exif;
pub mod patcher;
pub mod pipeline;
pub mod prompt;
