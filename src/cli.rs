//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Query and fetch options are optional here so
//! that values from `.quakestats.toml` are only overridden when given.

use clap::Parser;
use std::path::PathBuf;

/// QuakeStats - earthquake statistics from the USGS event service
///
/// Fetches earthquakes for a date range and bounding box (by default the
/// British Isles, 2000-01-01 to 2018-10-11, magnitude 1 and above), then
/// reports the strongest events and charts yearly counts and average
/// magnitudes.
///
/// Examples:
///   quakestats
///   quakestats --mode chart --output-dir charts
///   quakestats --mode all --start-time 2010-01-01 --min-magnitude 2.5
///   quakestats --save-response response.json
///   quakestats --input response.json --format json
///   quakestats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// What to produce: text summary, charts, or both
    #[arg(long, default_value = "text", value_name = "MODE")]
    pub mode: RunMode,

    /// Text summary format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// First day of the query window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start_time: Option<String>,

    /// Last day of the query window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end_time: Option<String>,

    /// Minimum magnitude to include
    #[arg(long, value_name = "MAG", allow_hyphen_values = true)]
    pub min_magnitude: Option<f64>,

    /// Southern edge of the bounding box
    #[arg(long, value_name = "DEG", allow_hyphen_values = true)]
    pub min_latitude: Option<f64>,

    /// Northern edge of the bounding box
    #[arg(long, value_name = "DEG", allow_hyphen_values = true)]
    pub max_latitude: Option<f64>,

    /// Western edge of the bounding box
    #[arg(long, value_name = "DEG", allow_hyphen_values = true)]
    pub min_longitude: Option<f64>,

    /// Eastern edge of the bounding box
    #[arg(long, value_name = "DEG", allow_hyphen_values = true)]
    pub max_longitude: Option<f64>,

    /// GeoJSON event query endpoint
    #[arg(long, value_name = "URL", env = "QUAKESTATS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Retries on transient network failures
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Read events from a saved GeoJSON response instead of the network
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Save the raw response body to a file
    #[arg(long, value_name = "FILE", conflicts_with = "input")]
    pub save_response: Option<PathBuf>,

    /// Directory for chart files
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Assign events to years in the local time zone instead of UTC
    #[arg(long)]
    pub local_time: bool,

    /// Start the maximum-magnitude search at negative infinity instead of 0
    #[arg(long)]
    pub unbounded_max: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .quakestats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .quakestats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which presentation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    /// Count and strongest earthquake on the console (default)
    #[default]
    Text,
    /// Per-year SVG charts
    Chart,
    /// Console summary followed by the charts
    All,
}

impl RunMode {
    pub fn wants_text(self) -> bool {
        matches!(self, RunMode::Text | RunMode::All)
    }

    pub fn wants_charts(self) -> bool {
        matches!(self, RunMode::Chart | RunMode::All)
    }
}

/// Output format for the console summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Two plain-text lines (default)
    #[default]
    Text,
    /// Full summary as JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Query values are checked after merging with the config file.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
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

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
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
}
