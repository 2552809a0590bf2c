//! Data models for the earthquake statistics pipeline.
//!
//! This module contains the core data structures shared by the fetcher,
//! the aggregator and the reporters: decoded event records, per-year
//! buckets and the serializable run summary.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Geographic position of an event (depth is not kept).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl Location {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.longitude, self.latitude)
    }
}

/// Time zone used to derive the calendar year of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearZone {
    /// Coordinated Universal Time (default, reproducible across machines)
    #[default]
    Utc,
    /// The time zone of the machine running the analysis
    Local,
}

impl fmt::Display for YearZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearZone::Utc => write!(f, "utc"),
            YearZone::Local => write!(f, "local"),
        }
    }
}

/// Starting candidate for the maximum-magnitude search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxSeed {
    /// Start at 0.0. Sets whose magnitudes are all negative report 0 with
    /// no locations.
    #[default]
    Zero,
    /// Start at negative infinity.
    Unbounded,
}

impl MaxSeed {
    /// The initial value of the running maximum.
    pub fn initial(self) -> f64 {
        match self {
            MaxSeed::Zero => 0.0,
            MaxSeed::Unbounded => f64::NEG_INFINITY,
        }
    }
}

/// A single seismic event as returned by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Origin time in milliseconds since the Unix epoch.
    pub time_ms: i64,
    /// Event magnitude (may be negative).
    pub magnitude: f64,
    /// Epicenter.
    pub location: Location,
}

impl EventRecord {
    /// Origin time as a UTC timestamp.
    ///
    /// The decoder rejects timestamps chrono cannot represent, so the epoch
    /// fallback is never reached for decoded records.
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.time_ms).unwrap_or_default()
    }

    /// Calendar year of the event in the given zone.
    pub fn year(&self, zone: YearZone) -> i32 {
        let time = self.time();
        match zone {
            YearZone::Utc => time.year(),
            YearZone::Local => time.with_timezone(&Local).year(),
        }
    }
}

/// All events fetched for one run, plus the count the provider declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSet {
    /// `metadata.count` from the response.
    pub declared_count: u64,
    /// Events in response order.
    pub events: Vec<EventRecord>,
}

impl EventSet {
    pub fn new(declared_count: u64, events: Vec<EventRecord>) -> Self {
        Self {
            declared_count,
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether the declared count agrees with the number of events received.
    pub fn count_matches(&self) -> bool {
        self.declared_count == self.events.len() as u64
    }
}

/// Magnitudes of all events that fall in one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearBucket {
    pub year: i32,
    /// Magnitudes in input order.
    pub magnitudes: Vec<f64>,
}

impl YearBucket {
    pub fn count(&self) -> usize {
        self.magnitudes.len()
    }
}

/// The strongest magnitude found and every event location sharing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxMagnitudeResult {
    pub max_magnitude: f64,
    /// One entry per tied event, in discovery order.
    pub locations: Vec<Location>,
}

impl MaxMagnitudeResult {
    /// Number of events sharing the maximum magnitude.
    pub fn tie_count(&self) -> usize {
        self.locations.len()
    }
}

/// Everything the reporters need from one event set.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Count declared by the provider.
    pub total_count: u64,
    pub strongest: MaxMagnitudeResult,
    pub years: Vec<YearStat>,
}

/// One row of the per-year charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStat {
    pub year: i32,
    pub count: usize,
    pub average_magnitude: f64,
}

/// Metadata about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    /// Endpoint URL or input file the events came from.
    pub source: String,
    /// Query parameters sent to the service.
    pub query: BTreeMap<String, String>,
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
    /// Zone used for year boundaries.
    pub year_zone: YearZone,
    /// Number of events actually decoded.
    pub events_received: usize,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Complete result of one run, serialized by the JSON reporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub metadata: SummaryMetadata,
    /// Count declared by the provider.
    pub total_count: u64,
    pub strongest: MaxMagnitudeResult,
    pub years: Vec<YearStat>,
}
