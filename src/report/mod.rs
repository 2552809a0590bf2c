//! Report generation.
//!
//! Console text/JSON output and the per-year SVG charts.

pub mod chart;
pub mod generator;

pub use chart::{render_charts, ChartOptions};
pub use generator::{generate_json_report, generate_text_report};
