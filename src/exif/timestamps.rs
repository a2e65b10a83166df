use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use super::tiff::{
    IfdGroup, TAG_DATE_TIME, TAG_DATE_TIME_DIGITIZED, TAG_DATE_TIME_ORIGINAL,
    TAG_OFFSET_TIME_DIGITIZED, TAG_OFFSET_TIME_ORIGINAL, TiffBlock,
};

/// EXIF date-time layout: `YYYY:MM:DD HH:MM:SS`, 24-hour clock, no zone.
pub const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The five EXIF fields this crate reads and writes.
///
/// `None` means the tag is absent (on read) or left alone (on write).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timestamps {
    /// `0th.DateTime` (0x0132)
    pub date_time: Option<String>,
    /// `Exif.DateTimeOriginal` (0x9003)
    pub date_time_original: Option<String>,
    /// `Exif.DateTimeDigitized` (0x9004)
    pub date_time_digitized: Option<String>,
    /// `Exif.OffsetTimeOriginal` (0x9011)
    pub offset_time_original: Option<String>,
    /// `Exif.OffsetTimeDigitized` (0x9012)
    pub offset_time_digitized: Option<String>,
}

impl Timestamps {
    /// Read the five fields from a decoded EXIF block.
    pub fn read(tiff: &TiffBlock) -> Result<Self> {
        Ok(Self {
            date_time: tiff.ascii(IfdGroup::Primary, TAG_DATE_TIME)?,
            date_time_original: tiff.ascii(IfdGroup::Exif, TAG_DATE_TIME_ORIGINAL)?,
            date_time_digitized: tiff.ascii(IfdGroup::Exif, TAG_DATE_TIME_DIGITIZED)?,
            offset_time_original: tiff.ascii(IfdGroup::Exif, TAG_OFFSET_TIME_ORIGINAL)?,
            offset_time_digitized: tiff.ascii(IfdGroup::Exif, TAG_OFFSET_TIME_DIGITIZED)?,
        })
    }

    /// Write every field that is `Some` into the EXIF block.
    pub fn write(&self, tiff: &mut TiffBlock) -> Result<()> {
        let fields = [
            (IfdGroup::Primary, TAG_DATE_TIME, &self.date_time),
            (IfdGroup::Exif, TAG_DATE_TIME_ORIGINAL, &self.date_time_original),
            (IfdGroup::Exif, TAG_DATE_TIME_DIGITIZED, &self.date_time_digitized),
            (IfdGroup::Exif, TAG_OFFSET_TIME_ORIGINAL, &self.offset_time_original),
            (IfdGroup::Exif, TAG_OFFSET_TIME_DIGITIZED, &self.offset_time_digitized),
        ];

        for (group, tag, value) in fields {
            if let Some(text) = value {
                tiff.set_ascii(group, tag, text)
                    .with_context(|| format!("Failed to set tag 0x{tag:04X}"))?;
            }
        }
        Ok(())
    }
}

/// Parse an EXIF date-time string.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .with_context(|| format!("Malformed timestamp {text:?}, expected YYYY:MM:DD HH:MM:SS"))
}

/// Format a date-time in the fixed-width EXIF layout.
pub fn format_timestamp(dt: &NaiveDateTime) -> Result<String> {
    if !(0..=9999).contains(&dt.year()) {
        bail!("Year {} cannot be stored in an EXIF timestamp", dt.year());
    }
    Ok(dt.format(TIMESTAMP_FORMAT).to_string())
}

/// A UTC offset in whole hours, written as `±HH:00`.
///
/// Minutes are always `:00`; half-hour zones are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneOffset(i8);

impl TimezoneOffset {
    pub const MIN_HOURS: i32 = -12;
    pub const MAX_HOURS: i32 = 14;

    pub fn from_hours(hours: i32) -> Option<Self> {
        if (Self::MIN_HOURS..=Self::MAX_HOURS).contains(&hours) {
            Some(Self(hours as i8))
        } else {
            None
        }
    }

    pub fn hours(self) -> i32 {
        i32::from(self.0)
    }
}

impl fmt::Display for TimezoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        write!(f, "{sign}{:02}:00", self.0.unsigned_abs())
    }
}

impl FromStr for TimezoneOffset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let hours: i32 = s
            .trim()
            .parse()
            .with_context(|| format!("{s:?} is not a whole number of hours"))?;
        Self::from_hours(hours).with_context(|| {
            format!(
                "UTC offset {hours} is outside {}..={}",
                Self::MIN_HOURS,
                Self::MAX_HOURS
            )
        })
    }
}
