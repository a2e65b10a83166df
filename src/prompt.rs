//! Interactive line-based prompts, used when no path is given on the command line.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::exif::TimezoneOffset;
use crate::patcher::TimeShift;

/// What the prompt sequence collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAnswers {
    pub path: PathBuf,
    pub shift: TimeShift,
}

/// Ask for the folder or file, the hour and minute offsets and the timezone.
///
/// Invalid hours or minutes fall back to `0`. An invalid timezone means no
/// offset is written; nothing is asked twice.
pub fn run_prompts<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<PromptAnswers> {
    let path = ask(input, output, "Folder or JPEG file to process: ")?;
    if path.is_empty() {
        bail!("No folder or file given");
    }

    let hours = parse_or_zero(
        &ask(input, output, "Hours to add (negative to subtract) [0]: ")?,
        "hours",
    );
    let minutes = parse_or_zero(
        &ask(input, output, "Minutes to add (negative to subtract) [0]: ")?,
        "minutes",
    );
    let timezone = parse_timezone(&ask(
        input,
        output,
        "UTC offset in hours to record, e.g. 10 or -5 (empty for none): ",
    )?);

    Ok(PromptAnswers {
        path: PathBuf::from(path),
        shift: TimeShift::new(hours, minutes, timezone)?,
    })
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}").context("Failed to write prompt")?;
    output.flush().context("Failed to write prompt")?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

/// Parse a signed integer; empty or invalid input counts as `0`.
pub fn parse_or_zero(text: &str, label: &str) -> i64 {
    if text.is_empty() {
        return 0;
    }
    match text.parse() {
        Ok(value) => value,
        Err(_) => {
            log::warn!("Invalid {label} {text:?}, using 0");
            0
        }
    }
}

/// Parse a timezone in whole hours; empty, invalid or out-of-range input means none.
pub fn parse_timezone(text: &str) -> Option<TimezoneOffset> {
    if text.is_empty() {
        return None;
    }
    match text.parse() {
        Ok(tz) => Some(tz),
        Err(e) => {
            log::warn!("{e:#}; no timezone offset will be written");
            None
        }
    }
}
