//! Console report generation.
//!
//! Text mode prints the declared total and the strongest event(s); JSON
//! mode serializes the whole [`Summary`].

use crate::models::{Location, MaxMagnitudeResult, Summary};
use anyhow::Result;

/// Format a list of locations as `[(lon,lat),(lon,lat)]`.
pub fn format_locations(locations: &[Location]) -> String {
    let items: Vec<String> = locations.iter().map(Location::to_string).collect();
    format!("[{}]", items.join(","))
}

/// Format a magnitude the way it is printed in the text report.
///
/// Whole values keep one decimal place (`4.0`, not `4`).
pub fn format_magnitude(magnitude: f64) -> String {
    format!("{:?}", magnitude)
}

/// Generate the total-count line.
pub fn generate_count_line(count: u64) -> String {
    format!("Loaded {}", count)
}

/// Generate the strongest-earthquake sentence.
///
/// A single location uses the singular form; anything else, including the
/// degenerate case of no location, uses the plural form with the tie count.
pub fn generate_strongest_line(result: &MaxMagnitudeResult) -> String {
    match result.locations.as_slice() {
        [only] => format!(
            "The strongest earthquake was at {} with magnitude {}",
            only,
            format_magnitude(result.max_magnitude)
        ),
        locations => format!(
            "The strongest earthquakes were at {} with magnitude {}, and there were {} earthquakes with the same strongest magnitude.",
            format_locations(locations),
            format_magnitude(result.max_magnitude),
            locations.len()
        ),
    }
}

/// Generate the two-line text report.
pub fn generate_text_report(count: u64, strongest: &MaxMagnitudeResult) -> String {
    format!(
        "{}\n{}",
        generate_count_line(count),
        generate_strongest_line(strongest)
    )
}

/// Generate a JSON report.
pub fn generate_json_report(summary: &Summary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}
