//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.quakestats.toml` files. Every setting has a default, so an empty or
//! missing file reproduces the standard query against the USGS service.

use crate::models::{MaxSeed, YearZone};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".quakestats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Event query filters.
    #[serde(default)]
    pub query: QueryConfig,

    /// HTTP settings.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Filters sent to the event service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// First day of the query window (`YYYY-MM-DD`).
    #[serde(default = "default_start_time")]
    pub start_time: String,

    /// Last day of the query window (`YYYY-MM-DD`).
    #[serde(default = "default_end_time")]
    pub end_time: String,

    #[serde(default = "default_min_latitude")]
    pub min_latitude: f64,

    #[serde(default = "default_max_latitude")]
    pub max_latitude: f64,

    #[serde(default = "default_min_longitude")]
    pub min_longitude: f64,

    #[serde(default = "default_max_longitude")]
    pub max_longitude: f64,

    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: f64,

    /// Result ordering requested from the service.
    #[serde(default = "default_order_by")]
    pub order_by: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            end_time: default_end_time(),
            min_latitude: default_min_latitude(),
            max_latitude: default_max_latitude(),
            min_longitude: default_min_longitude(),
            max_longitude: default_max_longitude(),
            min_magnitude: default_min_magnitude(),
            order_by: default_order_by(),
        }
    }
}

fn default_start_time() -> String {
    "2000-01-01".to_string()
}

fn default_end_time() -> String {
    "2018-10-11".to_string()
}

fn default_min_latitude() -> f64 {
    50.008
}

fn default_max_latitude() -> f64 {
    58.723
}

fn default_min_longitude() -> f64 {
    -9.756
}

fn default_max_longitude() -> f64 {
    1.67
}

fn default_min_magnitude() -> f64 {
    1.0
}

fn default_order_by() -> String {
    "time-asc".to_string()
}

impl QueryConfig {
    /// Query string parameters in the service's naming.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("starttime", self.start_time.clone()),
            ("endtime", self.end_time.clone()),
            ("minlatitude", self.min_latitude.to_string()),
            ("maxlatitude", self.max_latitude.to_string()),
            ("minlongitude", self.min_longitude.to_string()),
            ("maxlongitude", self.max_longitude.to_string()),
            ("minmagnitude", self.min_magnitude.to_string()),
            ("orderby", self.order_by.clone()),
        ]
    }

    /// Check dates and bounding box.
    pub fn validate(&self) -> Result<(), String> {
        let start = parse_date("start time", &self.start_time)?;
        let end = parse_date("end time", &self.end_time)?;
        if start > end {
            return Err(format!(
                "Start time {} is after end time {}",
                self.start_time, self.end_time
            ));
        }

        for (name, value) in [
            ("Minimum latitude", self.min_latitude),
            ("Maximum latitude", self.max_latitude),
        ] {
            if !(-90.0..=90.0).contains(&value) {
                return Err(format!("{} must be between -90 and 90", name));
            }
        }
        if self.min_latitude > self.max_latitude {
            return Err("Minimum latitude must not exceed maximum latitude".to_string());
        }

        for (name, value) in [
            ("Minimum longitude", self.min_longitude),
            ("Maximum longitude", self.max_longitude),
        ] {
            if !(-180.0..=180.0).contains(&value) {
                return Err(format!("{} must be between -180 and 180", name));
            }
        }
        if self.min_longitude > self.max_longitude {
            return Err("Minimum longitude must not exceed maximum longitude".to_string());
        }

        if !self.min_magnitude.is_finite() {
            return Err("Minimum magnitude must be a finite number".to_string());
        }

        Ok(())
    }
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid {} '{}', expected YYYY-MM-DD", name, value))
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// GeoJSON query endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on transient failures.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

fn default_endpoint() -> String {
    "https://earthquake.usgs.gov/fdsnws/event/1/query.geojson".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    500
}

/// Aggregation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Zone used to assign events to calendar years.
    #[serde(default)]
    pub year_zone: YearZone,

    /// Starting value of the maximum-magnitude search.
    #[serde(default)]
    pub max_seed: MaxSeed,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the chart files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Chart width in pixels.
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    /// Chart height in pixels.
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    /// Decimal digits shown for average magnitudes.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            decimals: default_decimals(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_chart_width() -> u32 {
    1024
}

fn default_chart_height() -> u32 {
    640
}

fn default_decimals() -> u32 {
    4
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Query window and bounding box
        if let Some(ref start) = args.start_time {
            self.query.start_time = start.clone();
        }
        if let Some(ref end) = args.end_time {
            self.query.end_time = end.clone();
        }
        if let Some(value) = args.min_latitude {
            self.query.min_latitude = value;
        }
        if let Some(value) = args.max_latitude {
            self.query.max_latitude = value;
        }
        if let Some(value) = args.min_longitude {
            self.query.min_longitude = value;
        }
        if let Some(value) = args.max_longitude {
            self.query.max_longitude = value;
        }
        if let Some(value) = args.min_magnitude {
            self.query.min_magnitude = value;
        }

        // HTTP
        if let Some(ref endpoint) = args.endpoint {
            self.fetch.endpoint = endpoint.clone();
        }
        if let Some(timeout) = args.timeout {
            self.fetch.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.fetch.retries = retries;
        }

        // Flags only ever switch away from the defaults
        if args.local_time {
            self.analysis.year_zone = YearZone::Local;
        }
        if args.unbounded_max {
            self.analysis.max_seed = MaxSeed::Unbounded;
        }

        if let Some(ref dir) = args.output_dir {
            self.report.output_dir = dir.clone();
        }
    }

    /// Validate settings that may come from either the file or the CLI.
    pub fn validate(&self) -> Result<(), String> {
        self.query.validate()?;

        if !self.fetch.endpoint.starts_with("http://")
            && !self.fetch.endpoint.starts_with("https://")
        {
            return Err("Endpoint must start with 'http://' or 'https://'".to_string());
        }

        if self.fetch.timeout_seconds == 0 {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.report.chart_width < 200 || self.report.chart_height < 150 {
            return Err("Charts must be at least 200x150 pixels".to_string());
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
