//! tagbatch - batch metadata tagging for scanned images
//!
//! Matches the image files of a directory with the rows of a spreadsheet and
//! writes each row's fields into the matching files with exiftool.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tagbatch_common::config::{load_config, TomlConfig};
use tagbatch_common::events::RunEvent;
use tagbatch_engine::config::{resolve_exiftool_binary, ResolutionSettings, ResolutionUnit, RunConfig};
use tagbatch_engine::models::RecordStore;
use tagbatch_engine::services::{load_record_store, ExifToolWriter, XlsxReader};
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for tagbatch
#[derive(Parser, Debug)]
#[command(name = "tagbatch")]
#[command(about = "Write spreadsheet metadata into scanned image files")]
#[command(version)]
struct Args {
    /// Directory holding the image files
    #[arg(short, long, env = "TAGBATCH_DIR")]
    dir: PathBuf,

    /// Spreadsheet with one row per record (xlsx, xls or ods)
    #[arg(short, long, env = "TAGBATCH_SHEET")]
    sheet: Option<PathBuf>,

    /// Config file (overrides TAGBATCH_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write resolution tags only, without record data
    #[arg(long)]
    no_records: bool,

    /// Ceiling on concurrent writer processes
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Regex removed from file names before matching (repeatable)
    #[arg(long = "ignore-pattern")]
    ignore_patterns: Vec<String>,

    /// Drop a two-digit page number from the end of file names
    #[arg(long)]
    ignore_trailing_digits: bool,

    /// Keep trailing page numbers even when the config file drops them
    #[arg(long, conflicts_with = "ignore_trailing_digits")]
    no_ignore_trailing_digits: bool,

    /// Resolution unit (none, inches, cm); enables resolution tags
    #[arg(long)]
    resolution_unit: Option<ResolutionUnit>,

    /// Horizontal resolution; enables resolution tags
    #[arg(long)]
    x_resolution: Option<f64>,

    /// Vertical resolution; enables resolution tags
    #[arg(long)]
    y_resolution: Option<f64>,

    /// exiftool binary
    #[arg(long)]
    exiftool: Option<PathBuf>,

    /// Include sub-directories
    #[arg(short, long)]
    recursive: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Layer command-line overrides over the file configuration
    fn run_config(&self, toml: &TomlConfig) -> Result<RunConfig> {
        let mut config = RunConfig::from_toml(toml).context("Invalid configuration")?;

        if let Some(max) = self.max_concurrency {
            config.max_concurrency = max;
        }
        if !self.ignore_patterns.is_empty() {
            config.matching.ignore_patterns = self.ignore_patterns.clone();
        }
        if self.ignore_trailing_digits {
            config.matching.ignore_trailing_digits = true;
        }
        if self.no_ignore_trailing_digits {
            config.matching.ignore_trailing_digits = false;
        }
        if self.recursive {
            config.recursive = true;
        }
        if self.no_records {
            config.update_from_store = false;
        }

        if self.resolution_unit.is_some() || self.x_resolution.is_some() || self.y_resolution.is_some() {
            let base = &config.resolution;
            config.resolution = ResolutionSettings::new(
                self.resolution_unit.unwrap_or(base.unit),
                self.x_resolution.unwrap_or(base.x),
                self.y_resolution.unwrap_or(base.y),
            );
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first so its log level can seed the filter
    let toml = load_config(args.config.as_deref());
    let level = toml
        .as_ref()
        .map(|t| t.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting tagbatch v{}", tagbatch_engine::version_string());

    let toml = toml.context("Failed to load configuration")?;
    let config = args.run_config(&toml)?;

    let store = if config.update_from_store {
        let Some(sheet) = args.sheet.clone() else {
            error!("No spreadsheet given");
            bail!(
                "Records are required but no spreadsheet was given. \
                 Pass --sheet, or rerun with --no-records to write resolution tags only."
            );
        };

        let reader = XlsxReader::from_config(&toml.spreadsheet, &config.tag_table)
            .context("Invalid spreadsheet layout")?;
        let store: RecordStore = tokio::task::spawn_blocking(move || load_record_store(&reader, &sheet))
            .await
            .context("Spreadsheet task failed")?
            .context("Failed to load spreadsheet")?;
        info!(records = store.len(), "Record store ready");
        Some(Arc::new(store))
    } else {
        if args.sheet.is_some() {
            warn!("--no-records given; ignoring the spreadsheet");
        }
        None
    };

    let exiftool = ExifToolWriter::new(resolve_exiftool_binary(args.exiftool.as_deref(), &toml));
    match exiftool.check_available().await {
        Ok(version) => info!("exiftool {} at {}", version, exiftool.binary().display()),
        Err(e) => warn!("exiftool check failed ({}); every file will fail", e),
    }

    let mut handle = tagbatch_engine::start(&args.dir, store, config, Arc::new(exiftool))
        .await
        .context("Run not started")?;

    let stop = handle.stop_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, finishing running jobs");
            stop.cancel();
        } else {
            warn!("Failed to install Ctrl+C handler");
        }
    });

    while let Some(event) = handle.next_event().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match &event {
            RunEvent::TotalQueued { total, unmatched, .. } => {
                println!("{} files queued, {} without record", total, unmatched);
            }
            RunEvent::ItemCompleted {
                file_name,
                outcome,
                processed,
                total,
                ..
            } => {
                println!("[{}/{}] {}: {}", processed, total, file_name, outcome);
            }
            RunEvent::RunCompleted {
                written,
                failed,
                unmatched,
                skipped,
                duration_ms,
                ..
            } => {
                println!(
                    "Done in {:.1}s: {} written, {} failed, {} not found, {} skipped",
                    *duration_ms as f64 / 1000.0,
                    written,
                    failed,
                    unmatched,
                    skipped
                );
            }
            RunEvent::RunStarted { .. } => {}
        }
    }

    let result = handle.wait().await?;
    if result.has_failures() {
        bail!("{} of {} files failed", result.failed(), result.queued);
    }
    Ok(())
}
