use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;
use std::path::Path;

use crate::exif::jpeg;
use crate::exif::{TiffBlock, Timestamps, TimezoneOffset, format_timestamp, parse_timestamp};

/// How every processed file is adjusted.
///
/// The delta is applied to the naive timestamp stored in the file; the
/// timezone, when set, is only recorded in the offset fields and never takes
/// part in the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeShift {
    pub delta: TimeDelta,
    pub timezone: Option<TimezoneOffset>,
}

impl TimeShift {
    /// Build a shift from signed hours and minutes.
    ///
    /// ```rust
    /// use exif_timeshift::patcher::TimeShift;
    ///
    /// let shift = TimeShift::new(-1, 30, None).unwrap();
    /// assert_eq!(shift.delta.num_minutes(), -30);
    /// ```
    pub fn new(hours: i64, minutes: i64, timezone: Option<TimezoneOffset>) -> Result<Self> {
        let delta = TimeDelta::try_hours(hours)
            .zip(TimeDelta::try_minutes(minutes))
            .and_then(|(h, m)| h.checked_add(&m))
            .with_context(|| format!("Time offset of {hours}h {minutes}m is out of range"))?;
        Ok(Self { delta, timezone })
    }
}

impl fmt::Display for TimeShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.delta.num_minutes();
        let sign = if total < 0 { '-' } else { '+' };
        let total = total.unsigned_abs();
        write!(f, "{sign}{}h{:02}m", total / 60, total % 60)?;
        if let Some(tz) = self.timezone {
            write!(f, " (UTC{tz})")?;
        }
        Ok(())
    }
}

/// Why a file was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The JPEG carries no EXIF segment at all.
    NoExif,
    /// The EXIF block has no DateTimeOriginal field.
    NoDateTimeOriginal,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExif => write!(f, "no EXIF metadata"),
            Self::NoDateTimeOriginal => write!(f, "no DateTimeOriginal found"),
        }
    }
}

/// What a successful patch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub original: NaiveDateTime,
    pub updated: NaiveDateTime,
    /// OffsetTimeOriginal as found before the patch.
    pub previous_offset: Option<String>,
    /// Offset written to both offset fields, if any.
    pub offset_written: Option<TimezoneOffset>,
    /// `false` for a dry run.
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Updated(PatchReport),
    Skipped(SkipReason),
}

/// Shift the capture timestamps of one JPEG file in place.
///
/// DateTimeOriginal is the source of truth: it is shifted and the result is
/// written to DateTimeOriginal, DateTimeDigitized and the primary DateTime.
/// With a timezone, both offset fields are overwritten with `±HH:00`.
///
/// A missing DateTimeOriginal is reported as [`PatchOutcome::Skipped`] and the
/// file is not touched. Everything else (unreadable file, broken JPEG or EXIF
/// block, malformed timestamp) is returned as an error, also before any write.
/// With `dry_run` the new block is built but not written.
pub fn patch(path: &Path, shift: &TimeShift, dry_run: bool) -> Result<PatchOutcome> {
    let mut image = jpeg::read_jpeg(path)?;

    let Some(payload) = jpeg::exif_payload(&image) else {
        log::info!("No DateTimeOriginal found in {} (no EXIF)", path.display());
        return Ok(PatchOutcome::Skipped(SkipReason::NoExif));
    };

    let mut tiff = TiffBlock::parse(payload.to_vec()).context("Failed to decode EXIF block")?;
    let existing = Timestamps::read(&tiff)?;

    let Some(original_text) = existing.date_time_original.as_deref() else {
        log::info!("No DateTimeOriginal found in {}", path.display());
        return Ok(PatchOutcome::Skipped(SkipReason::NoDateTimeOriginal));
    };
    log::debug!("  DateTimeOriginal: {original_text}");

    let original = parse_timestamp(original_text)?;
    let updated = original
        .checked_add_signed(shift.delta)
        .with_context(|| format!("Shifting {original_text} by {shift} is out of range"))?;
    let updated_text = format_timestamp(&updated)?;

    let mut changes = Timestamps {
        date_time: Some(updated_text.clone()),
        date_time_original: Some(updated_text.clone()),
        date_time_digitized: Some(updated_text.clone()),
        ..Default::default()
    };

    if let Some(tz) = shift.timezone {
        match existing.offset_time_original.as_deref() {
            Some(previous) => log::info!("  Existing offset {previous} replaced with {tz}"),
            None => log::info!("  No existing offset, setting {tz}"),
        }
        changes.offset_time_original = Some(tz.to_string());
        changes.offset_time_digitized = Some(tz.to_string());
    }

    changes.write(&mut tiff)?;
    let new_payload = tiff.encode()?;
    jpeg::replace_exif_payload(&mut image, &new_payload);

    if !dry_run {
        jpeg::write_jpeg(path, image)?;
    }

    let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
    if dry_run {
        log::info!("Would update timestamp for {name}: {original_text} -> {updated_text}");
    } else {
        log::info!("Updated timestamp for {name}: {original_text} -> {updated_text}");
    }

    Ok(PatchOutcome::Updated(PatchReport {
        original,
        updated,
        previous_offset: existing.offset_time_original.clone(),
        offset_written: shift.timezone,
        written: !dry_run,
    }))
}
