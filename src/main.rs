//! exparte-dash - Medicaid ex parte renewal dashboard builder
//!
//! Downloads the CMS Medicaid renewal CSV (directly or via the dataset
//! metadata service), computes ex parte renewal rates per state and
//! month, and injects the result into the static dashboard page.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any fatal error (configuration, fetch, resolution, CSV format,
//!       template markers, write failure)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use error::BuildError;
use models::{AggregatedDataset, AggregationStats};
use source::Fetcher;
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("exparte-dash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_build(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{}", failure_diagnostic(&e));
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .exparte-dash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Set source.csv_url (or CSV_URL) before running a build.");
    Ok(())
}

/// The single stderr line reported for a failed build.
fn failure_diagnostic(err: &anyhow::Error) -> String {
    format!("\n❌ Error: {:#}", err)
}

/// Initialize logging based on verbosity settings and `RUST_LOG`.
fn init_logging(args: &Args) {
    let rust_log = std::env::var("RUST_LOG").ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(args.log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the whole pipeline: resolve, fetch, aggregate, render, write.
///
/// Nothing is written unless every earlier step succeeded.
async fn run_build(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Configuration problems stop the run before any network call.
    let resolver = config.source_resolver()?;

    // A missing template should fail fast too.
    let template = if args.dry_run {
        None
    } else {
        Some(report::read_template(&config.paths.template)?)
    };

    let fetcher = Fetcher::new(config.source.timeout_seconds, !args.quiet)?;

    progress(&args, format!("📥 Resolving source: {}", resolver.describe()));
    let csv_url = resolver.resolve(&fetcher).await?;

    progress(&args, format!("📥 Downloading CSV from {}", csv_url));
    let raw_csv = fetcher.fetch_text(&csv_url).await?;

    progress(&args, "🔬 Aggregating ex parte rates...".to_string());
    let aggregation = analysis::aggregate(&raw_csv)?;
    let dataset = aggregation.dataset;
    let summary = summarize(&dataset, &aggregation.stats);
    info!("Parsed {}", summary);
    if dataset.rows.is_empty() {
        warn!("No \"Updated\" rows found; the dashboard will be empty");
    }

    if args.print_json {
        println!("{}", dataset.to_json().context("Failed to serialize dataset")?);
    }

    let Some(template) = template else {
        progress(&args, format!("\n✅ Dry run complete: {}", summary));
        progress(&args, "   Nothing was written.".to_string());
        return Ok(());
    };

    progress(&args, "📝 Rendering dashboard...".to_string());
    let page = report::render(&dataset, &template)?;
    report::write_output(&page, &config.paths.output)?;

    progress(
        &args,
        format!(
            "\n✅ Build complete! {} → {}",
            summary,
            config.paths.output.display()
        ),
    );
    Ok(())
}

/// Where human-facing progress lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressTarget {
    Hidden,
    Stdout,
    /// Keeps stdout clean for `--print-json`.
    Stderr,
}

fn progress_target(args: &Args) -> ProgressTarget {
    if args.quiet {
        ProgressTarget::Hidden
    } else if args.print_json {
        ProgressTarget::Stderr
    } else {
        ProgressTarget::Stdout
    }
}

/// Print a progress line unless running quietly.
fn progress(args: &Args, line: String) {
    match progress_target(args) {
        ProgressTarget::Hidden => {}
        ProgressTarget::Stdout => println!("{}", line),
        ProgressTarget::Stderr => eprintln!("{}", line),
    }
}

/// One-line description of an aggregation, e.g. `24 months × 51 states (202301–202412), 1224 of 2448 rows used`.
fn summarize(dataset: &AggregatedDataset, stats: &AggregationStats) -> String {
    let span = match dataset.span() {
        Some((first, last)) => format!(" ({}–{})", first, last),
        None => String::new(),
    };
    format!(
        "{} months × {} states{}, {} of {} rows used",
        dataset.rows.len(),
        dataset.states.len(),
        span,
        stats.rows_used,
        stats.rows_read
    )
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // An explicit config file must load
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path)
            .map_err(|e| BuildError::Config(format!("{:#}", e)).into());
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthRow;
    use std::collections::BTreeMap;

    fn row(month: &str) -> MonthRow {
        MonthRow {
            month: month.to_string(),
            date: String::new(),
            rates: BTreeMap::new(),
        }
    }

    #[test]
    fn test_summarize_with_rows() {
        let dataset = AggregatedDataset {
            states: vec!["CA".to_string(), "TX".to_string()],
            rows: vec![row("202301"), row("202302")],
        };
        let stats = AggregationStats {
            rows_read: 6,
            rows_used: 4,
            null_cells: 0,
        };
        assert_eq!(
            summarize(&dataset, &stats),
            "2 months × 2 states (202301–202302), 4 of 6 rows used"
        );
    }

    fn plain_args() -> Args {
        Args {
            source: None,
            csv_url: None,
            metadata_url: None,
            template: None,
            output: None,
            timeout: None,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            print_json: false,
            init_config: false,
        }
    }

    #[test]
    fn test_progress_moves_to_stderr_for_print_json() {
        let mut args = plain_args();
        assert_eq!(progress_target(&args), ProgressTarget::Stdout);

        args.print_json = true;
        assert_eq!(progress_target(&args), ProgressTarget::Stderr);

        args.quiet = true;
        assert_eq!(progress_target(&args), ProgressTarget::Hidden);
    }

    #[test]
    fn test_failure_diagnostic_reports_error_once() {
        let err: anyhow::Error = BuildError::Template("no region".to_string()).into();
        let message = failure_diagnostic(&err);
        assert_eq!(message.matches("no region").count(), 1);
        assert!(message.contains("template error"));
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&AggregatedDataset::default(), &AggregationStats::default());
        assert_eq!(summary, "0 months × 0 states, 0 of 0 rows used");
    }

    #[test]
    fn test_pipeline_core_without_network() {
        let raw = "Original or Updated,State Abbreviation,Reporting Period,\
Beneficiaries with a Renewal Due,\
Beneficiaries Whose Coverage Was Renewed on an Ex Parte Basis\n\
U,CA,202301,1000,800\n\
O,CA,202301,1000,999\n\
U,TX,202305,0,0\n";
        let template = "<script>\n// INJECT_DATA_START\n// INJECT_DATA_END\n</script>";

        let dataset = analysis::aggregate(raw).unwrap().dataset;
        let page = report::render(&dataset, template).unwrap();

        assert_eq!(
            page,
            "<script>\n// INJECT_DATA_START\nconst INJECTED = {\"states\":[\"CA\",\"TX\"],\"rows\":[\
{\"month\":\"202301\",\"date\":\"1/1/2023\",\"CA\":80.0,\"TX\":null},\
{\"month\":\"202305\",\"date\":\"5/1/2023\",\"CA\":null,\"TX\":null}]};\n\
// INJECT_DATA_END\n</script>"
        );
    }

    #[tokio::test]
    async fn test_missing_csv_url_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("dash.toml");
        std::fs::write(&config_path, "[source]\nmode = \"direct\"\n").unwrap();

        let args = Args {
            source: None,
            csv_url: None,
            metadata_url: None,
            template: Some(dir.path().join("missing_template.html")),
            output: Some(dir.path().join("out").join("index.html")),
            timeout: None,
            config: Some(config_path),
            verbose: false,
            quiet: true,
            dry_run: false,
            print_json: false,
            init_config: false,
        };

        let err = run_build(args).await.unwrap_err();
        let build_err = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(build_err, BuildError::Config(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_missing_template_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("dash.toml");
        std::fs::write(&config_path, "").unwrap();

        let args = Args {
            source: None,
            csv_url: Some("http://127.0.0.1:1/renewals.csv".to_string()),
            metadata_url: None,
            template: Some(dir.path().join("missing_template.html")),
            output: Some(dir.path().join("index.html")),
            timeout: Some(1),
            config: Some(config_path),
            verbose: false,
            quiet: true,
            dry_run: false,
            print_json: false,
            init_config: false,
        };

        let err = run_build(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::Io { .. })
        ));
        assert!(!dir.path().join("index.html").exists());
    }
}
