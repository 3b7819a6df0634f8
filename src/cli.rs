//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::SourceMode;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// exparte-dash - Medicaid ex parte renewal dashboard builder
///
/// Downloads the CMS Medicaid renewal CSV, computes ex parte renewal
/// rates from "Updated" submissions, and injects them into the
/// dashboard template.
///
/// Examples:
///   CSV_URL=https://example.org/renewals.csv exparte-dash
///   exparte-dash --source metadata --metadata-url https://example.org/items/abc
///   exparte-dash --csv-url https://example.org/renewals.csv --dry-run
///   exparte-dash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// How to locate the CSV (direct, metadata)
    #[arg(long, value_name = "MODE")]
    pub source: Option<SourceMode>,

    /// URL of the renewal CSV (direct mode)
    #[arg(long, value_name = "URL", env = "CSV_URL")]
    pub csv_url: Option<String>,

    /// URL of the dataset metadata document (metadata mode)
    #[arg(long, value_name = "URL", env = "METADATA_URL")]
    pub metadata_url: Option<String>,

    /// Dashboard template containing the injection markers
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Output path for the rendered dashboard
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Network timeout in seconds for each request
    #[arg(long, value_name = "SECS", env = "EXPARTE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .exparte-dash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: download and aggregate without writing the dashboard
    #[arg(long)]
    pub dry_run: bool,

    /// Print the aggregated dataset as JSON to stdout
    ///
    /// Progress lines move to stderr so the JSON can be piped.
    #[arg(long)]
    pub print_json: bool,

    /// Generate a default .exparte-dash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// Usage errors (unknown flags, unparsable values such as a non-numeric
    /// `--timeout` or `EXPARTE_TIMEOUT`) exit with status 1 like every
    /// other configuration error.
    pub fn parse_args() -> Self {
        Self::try_parse().unwrap_or_else(|e| {
            let code = usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code)
        })
    }

    /// Validate the parsed arguments.
    ///
    /// Source URLs are checked after merging with the config file.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Logging filter: `--verbose`/`--quiet` win, then `RUST_LOG`, then INFO.
    pub fn log_filter(&self, rust_log: Option<&str>) -> EnvFilter {
        let flag_level = EnvFilter::new(self.log_level().to_string().to_lowercase());
        if self.verbose || self.quiet {
            return flag_level;
        }

        rust_log
            .filter(|directives| !directives.trim().is_empty())
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or(flag_level)
    }
}

/// Exit status for a failed argument parse: 0 for help/version, 1 otherwise.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}
