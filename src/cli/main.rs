use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_timeshift::exif::{self, TimezoneOffset};
use exif_timeshift::patcher::TimeShift;
use exif_timeshift::{config, pipeline, prompt};

#[derive(Parser, Debug)]
#[command(
    name = "exif-timeshift",
    version,
    about = "Shift EXIF capture timestamps of JPEG images and record their UTC offset",
    allow_negative_numbers = true
)]
struct Cli {
    /// JPEG file or folder to process (asked for interactively when omitted)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Hours to add to the capture time (negative to subtract)
    #[arg(long, value_name = "H")]
    hours: Option<i64>,

    /// Minutes to add to the capture time (negative to subtract)
    #[arg(long, value_name = "M")]
    minutes: Option<i64>,

    /// UTC offset in whole hours to record, e.g. 10 or -5
    #[arg(short = 'z', long, value_name = "TZ", value_parser = parse_timezone_arg)]
    timezone: Option<TimezoneOffset>,

    /// Also process JPEGs in subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Keep a .bak copy of every modified file
    #[arg(long)]
    backup: bool,

    /// Print the current timestamps and exit
    #[arg(long)]
    show: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_timezone_arg(s: &str) -> Result<TimezoneOffset, String> {
    s.parse::<TimezoneOffset>().map_err(|e| format!("{e:#}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config, CLI flags take precedence
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.backup {
        config.output.backup_originals = true;
    }
    if cli.recursive {
        config.output.recursive = true;
    }

    let (path, shift) = match cli.path.clone() {
        Some(path) => {
            let shift = TimeShift::new(
                cli.hours.unwrap_or(config.shift.hours),
                cli.minutes.unwrap_or(config.shift.minutes),
                match cli.timezone {
                    Some(tz) => Some(tz),
                    None => config.shift.timezone()?,
                },
            )?;
            (path, shift)
        }
        None => {
            let stdin = std::io::stdin();
            let answers = prompt::run_prompts(&mut stdin.lock(), &mut std::io::stdout())?;
            (answers.path, answers.shift)
        }
    };

    let images = pipeline::collect_jpegs(&path, config.output.recursive)?;
    if images.is_empty() {
        anyhow::bail!("No JPEG files found in {}", path.display());
    }

    if cli.show {
        for image_path in &images {
            print_timestamps(image_path);
        }
        return Ok(());
    }

    log::info!("Found {} image(s), shifting by {shift}", images.len());
    if config.output.dry_run {
        log::info!("DRY RUN - no files will be modified");
    }

    let total = images.len();
    let mut results = Vec::with_capacity(total);
    for (i, image_path) in images.iter().enumerate() {
        log::debug!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        let result = pipeline::process_image(image_path, &shift, &config.output);
        if let Some(ref err) = result.error {
            log::error!("{}: {err}", image_path.display());
        }
        results.push(result);
    }

    // JSON output
    if cli.json {
        let json_results: Vec<serde_json::Value> = results.iter().map(|r| r.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    let summary = pipeline::summarize(&results);
    log::info!(
        "Done: {} updated, {} skipped, {} failed out of {total} images",
        summary.updated,
        summary.skipped,
        summary.failed
    );

    Ok(())
}

fn print_timestamps(path: &Path) {
    println!("{}", path.display());
    match exif::read_timestamps(path) {
        Ok(Some(stamps)) => {
            let fields = [
                ("DateTimeOriginal", &stamps.date_time_original),
                ("DateTimeDigitized", &stamps.date_time_digitized),
                ("DateTime", &stamps.date_time),
                ("OffsetTimeOriginal", &stamps.offset_time_original),
                ("OffsetTimeDigitized", &stamps.offset_time_digitized),
            ];
            for (name, value) in fields {
                println!("  {name:<20} {}", value.as_deref().unwrap_or("-"));
            }
        }
        Ok(None) => println!("  (no EXIF metadata)"),
        Err(e) => println!("  Error: {e:#}"),
    }
}
