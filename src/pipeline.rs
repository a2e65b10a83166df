use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::OutputConfig;
use crate::exif::format_timestamp;
use crate::patcher::{self, PatchOutcome, TimeShift};

/// Extensions treated as JPEG (compared case-insensitively).
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// The result of running the patcher on a single file.
///
/// `error` holds any failure the patcher propagated; the batch carries on
/// with the next file regardless.
#[derive(Debug)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub outcome: Option<PatchOutcome>,
    pub error: Option<String>,
    /// Backup copy made before the file was modified.
    pub backup_path: Option<PathBuf>,
}

impl ProcessResult {
    pub fn is_updated(&self) -> bool {
        matches!(self.outcome, Some(PatchOutcome::Updated(_)))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Some(PatchOutcome::Skipped(_)))
    }

    /// JSON view used by `--json`.
    pub fn to_json(&self) -> serde_json::Value {
        let status = if self.error.is_some() {
            "failed"
        } else if self.is_updated() {
            "updated"
        } else {
            "skipped"
        };
        let mut value = serde_json::json!({
            "path": self.path.display().to_string(),
            "status": status,
            "error": self.error,
            "backup": self.backup_path.as_ref().map(|p| p.display().to_string()),
        });

        match &self.outcome {
            Some(PatchOutcome::Updated(report)) => {
                value["original"] = format_timestamp(&report.original).ok().into();
                value["updated"] = format_timestamp(&report.updated).ok().into();
                value["previous_offset"] = report.previous_offset.clone().into();
                value["offset"] = report.offset_written.map(|tz| tz.to_string()).into();
                value["written"] = report.written.into();
            }
            Some(PatchOutcome::Skipped(reason)) => {
                value["reason"] = reason.to_string().into();
            }
            None => {}
        }

        value
    }
}

/// Counts for the end-of-run summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub fn summarize(results: &[ProcessResult]) -> Summary {
    let mut summary = Summary::default();
    for result in results {
        if result.error.is_some() {
            summary.failed += 1;
        } else if result.is_updated() {
            summary.updated += 1;
        } else if result.is_skipped() {
            summary.skipped += 1;
        }
    }
    summary
}

/// Check if a file has a JPEG extension.
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect the JPEG files to process.
///
/// A file path must itself be a JPEG; anything else stops the run. A directory
/// yields the JPEGs directly inside it, or its whole tree when `recursive`.
/// Paths are returned sorted.
///
/// ```rust,no_run
/// use exif_timeshift::pipeline::collect_jpegs;
/// use std::path::Path;
///
/// let images = collect_jpegs(Path::new("./photos"), false).unwrap();
/// println!("Found {} images", images.len());
/// ```
pub fn collect_jpegs(path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if !is_jpeg(path) {
            bail!("{} is not a JPEG file", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        bail!("Path {} does not exist", path.display());
    }

    let mut images: Vec<PathBuf> = if recursive {
        WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_jpeg(p))
            .collect()
    } else {
        std::fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_jpeg(p))
            .collect()
    };
    images.sort();

    Ok(images)
}

/// Create a backup of the original file.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Run the patcher on one file, capturing any failure in the result.
pub fn process_image(path: &Path, shift: &TimeShift, output: &OutputConfig) -> ProcessResult {
    let mut result = ProcessResult {
        path: path.to_path_buf(),
        outcome: None,
        error: None,
        backup_path: None,
    };

    if output.backup_originals && !output.dry_run {
        match backup_file(path) {
            Ok(backup) => result.backup_path = Some(backup),
            Err(e) => log::warn!("Failed to backup {}: {e}", path.display()),
        }
    }

    match patcher::patch(path, shift, output.dry_run) {
        Ok(outcome) => result.outcome = Some(outcome),
        Err(e) => result.error = Some(format!("{e:#}")),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::fixtures;
    use crate::exif::tiff::ByteOrder;
    use crate::patcher::SkipReason;
    use std::fs;
    use tempfile::TempDir;

    fn shift() -> TimeShift {
        TimeShift::new(0, 5, None).unwrap()
    }

    // ── is_jpeg ──────────────────────────────────────────────────────

    #[test]
    fn jpeg_extensions() {
        assert!(is_jpeg(Path::new("photo.jpg")));
        assert!(is_jpeg(Path::new("photo.jpeg")));
        assert!(is_jpeg(Path::new("PHOTO.JPG")));
        assert!(is_jpeg(Path::new("photo.JpEg")));
    }

    #[test]
    fn non_jpeg_extensions() {
        assert!(!is_jpeg(Path::new("photo.png")));
        assert!(!is_jpeg(Path::new("photo.jpg.bak")));
        assert!(!is_jpeg(Path::new("jpg")));
        assert!(!is_jpeg(Path::new("noext")));
    }

    // ── collect_jpegs ────────────────────────────────────────────────

    #[test]
    fn collect_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.JPG");
        fs::write(&jpg, b"fake").unwrap();

        assert_eq!(collect_jpegs(&jpg, false).unwrap(), vec![jpg]);
    }

    #[test]
    fn collect_single_non_jpeg_stops() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("test.png");
        fs::write(&png, b"fake").unwrap();

        assert!(collect_jpegs(&png, false).is_err());
    }

    #[test]
    fn collect_missing_path_fails() {
        assert!(collect_jpegs(Path::new("/nonexistent/path"), false).is_err());
    }

    #[test]
    fn collect_directory_flat_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("b.jpeg"), b"fake").unwrap();
        fs::write(dir.path().join("a.JPG"), b"fake").unwrap();
        fs::write(dir.path().join("c.png"), b"fake").unwrap();
        fs::write(sub.join("d.jpg"), b"fake").unwrap();

        let images = collect_jpegs(dir.path(), false).unwrap();
        assert_eq!(
            images,
            vec![dir.path().join("a.JPG"), dir.path().join("b.jpeg")]
        );
    }

    #[test]
    fn collect_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("d.jpg"), b"fake").unwrap();
        fs::write(sub.join("e.txt"), b"fake").unwrap();

        let images = collect_jpegs(dir.path(), true).unwrap();
        assert_eq!(images.len(), 2);
        assert!(images.contains(&sub.join("d.jpg")));
    }

    #[test]
    fn collect_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(collect_jpegs(dir.path(), false).unwrap().is_empty());
    }

    // ── process_image ────────────────────────────────────────────────

    #[test]
    fn process_batch_continues_past_failures() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.jpg"),
            fixtures::camera_jpeg(ByteOrder::LittleEndian, "2024:01:15 10:00:00"),
        )
        .unwrap();
        fs::write(dir.path().join("b.jpg"), b"not a jpeg").unwrap();
        fs::write(dir.path().join("c.jpg"), fixtures::plain_jpeg()).unwrap();
        fs::write(
            dir.path().join("d.jpg"),
            fixtures::camera_jpeg(ByteOrder::BigEndian, "2024:01:15 10:00:00"),
        )
        .unwrap();

        let output = OutputConfig::default();
        let results: Vec<ProcessResult> = collect_jpegs(dir.path(), false)
            .unwrap()
            .iter()
            .map(|p| process_image(p, &shift(), &output))
            .collect();

        assert!(results[0].is_updated());
        assert!(results[1].error.is_some());
        assert_eq!(
            results[2].outcome,
            Some(PatchOutcome::Skipped(SkipReason::NoExif))
        );
        assert!(results[3].is_updated());
        assert_eq!(
            summarize(&results),
            Summary {
                updated: 2,
                skipped: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn process_creates_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        let bytes = fixtures::camera_jpeg(ByteOrder::LittleEndian, "2024:01:15 10:00:00");
        fs::write(&path, &bytes).unwrap();

        let output = OutputConfig {
            backup_originals: true,
            ..OutputConfig::default()
        };
        let result = process_image(&path, &shift(), &output);

        let backup = result.backup_path.unwrap();
        assert_eq!(backup, dir.path().join("a.jpg.bak"));
        assert_eq!(fs::read(&backup).unwrap(), bytes);
        assert_ne!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn process_dry_run_skips_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(
            &path,
            fixtures::camera_jpeg(ByteOrder::LittleEndian, "2024:01:15 10:00:00"),
        )
        .unwrap();

        let output = OutputConfig {
            dry_run: true,
            backup_originals: true,
            ..OutputConfig::default()
        };
        let result = process_image(&path, &shift(), &output);
        assert!(result.backup_path.is_none());
        assert!(!dir.path().join("a.jpg.bak").exists());
    }

    #[test]
    fn result_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(
            &path,
            fixtures::camera_jpeg(ByteOrder::LittleEndian, "2024:01:15 10:00:00"),
        )
        .unwrap();

        let json = process_image(&path, &shift(), &OutputConfig::default()).to_json();
        assert_eq!(json["status"], "updated");
        assert_eq!(json["original"], "2024:01:15 10:00:00");
        assert_eq!(json["updated"], "2024:01:15 10:05:00");
        assert!(json["offset"].is_null());
        assert_eq!(json["written"], true);
    }
}
