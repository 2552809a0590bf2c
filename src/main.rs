//! QuakeStats - earthquake statistics from the USGS event service
//!
//! A CLI tool that fetches earthquake records for a fixed region and time
//! window, reports the strongest event(s) and charts the number of
//! earthquakes and their average magnitude per year.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (network, malformed feed, no events, config, I/O)

mod analysis;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use fetch::{EventFetcher, EventSource, FetchConfig};
use models::{Summary, SummaryMetadata};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("QuakeStats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .quakestats.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    println!("   Edit it to change the query window, bounding box and chart options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so the text and JSON summaries on stdout stay clean.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Fetch, aggregate and report.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().map_err(anyhow::Error::msg)?;

    // Step 1: Fetch
    let source = build_source(&args, &config)?;
    let events = source
        .load(args.save_response.as_deref())
        .await
        .with_context(|| format!("Failed to load earthquakes from {}", source.describe()))?;

    info!("Loaded {} earthquakes", events.len());

    // Step 2: Aggregate
    let analysis = analysis::analyze(&events, &config.analysis)?;

    // Step 3: Report
    if args.mode.wants_text() {
        let output = match args.format {
            OutputFormat::Text => {
                report::generate_text_report(analysis.total_count, &analysis.strongest)
            }
            OutputFormat::Json => {
                let summary = Summary {
                    metadata: SummaryMetadata {
                        source: source.describe(),
                        query: query_metadata(&config),
                        generated_at: Utc::now(),
                        year_zone: config.analysis.year_zone,
                        events_received: events.len(),
                        duration_seconds: start_time.elapsed().as_secs_f64(),
                    },
                    total_count: analysis.total_count,
                    strongest: analysis.strongest.clone(),
                    years: analysis.years.clone(),
                };
                report::generate_json_report(&summary)?
            }
        };
        println!("{}", output);
    }

    if args.mode.wants_charts() {
        let options = report::ChartOptions::from(&config.report);
        let paths = report::render_charts(&analysis.years, &config.report.output_dir, options)
            .context("Failed to render charts")?;

        if !args.quiet {
            for path in &paths {
                println!("Chart saved to: {}", path.display());
            }
        }
    }

    info!("Done in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Query parameters as recorded in the JSON summary.
fn query_metadata(config: &Config) -> std::collections::BTreeMap<String, String> {
    config
        .query
        .query_pairs()
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Pick the event source: a saved file or the live service.
fn build_source(args: &Args, config: &Config) -> Result<EventSource> {
    if let Some(ref input) = args.input {
        info!("Using saved response: {}", input.display());
        return Ok(EventSource::File(input.clone()));
    }

    let mut fetch_config = FetchConfig::from(&config.fetch);
    fetch_config.show_progress = !args.quiet;

    let fetcher = EventFetcher::new(fetch_config, &config.query)?;
    Ok(EventSource::Remote(fetcher))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
