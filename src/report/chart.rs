//! SVG chart rendering.
//!
//! Two line charts are drawn one after the other, each on its own freshly
//! cleared canvas: earthquakes per year and average magnitude per year.
//! Every point carries its value as a label and the x axis has one tick per
//! year.

use crate::analysis::round_to;
use crate::models::YearStat;
use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const COUNT_CHART_FILE: &str = "earthquakes_per_year.svg";
pub const AVERAGE_CHART_FILE: &str = "average_magnitude_per_year.svg";

const FONT: &str = "sans-serif";

/// Chart dimensions and label precision.
#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    /// Decimal digits shown on average-magnitude labels.
    pub decimals: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 640,
            decimals: 4,
        }
    }
}

impl From<&crate::config::ReportConfig> for ChartOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            width: config.chart_width,
            height: config.chart_height,
            decimals: config.decimals,
        }
    }
}

/// One series to plot against the year axis.
struct LineChart<'a> {
    title: &'a str,
    y_desc: &'a str,
    years: Vec<i32>,
    values: Vec<f64>,
    labels: Vec<String>,
}

/// Render both charts into `output_dir`, count chart first.
pub fn render_charts(
    stats: &[YearStat],
    output_dir: &Path,
    options: ChartOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let count_path = output_dir.join(COUNT_CHART_FILE);
    render_count_chart(stats, &count_path, options)?;
    info!("Wrote {}", count_path.display());

    let average_path = output_dir.join(AVERAGE_CHART_FILE);
    render_average_chart(stats, &average_path, options)?;
    info!("Wrote {}", average_path.display());

    Ok(vec![count_path, average_path])
}

/// Line chart of earthquake counts per year.
pub fn render_count_chart(
    stats: &[YearStat],
    path: &Path,
    options: ChartOptions,
) -> Result<()> {
    let chart = LineChart {
        title: "The number of earthquakes per year",
        y_desc: "The number of earthquakes",
        years: stats.iter().map(|s| s.year).collect(),
        values: stats.iter().map(|s| s.count as f64).collect(),
        labels: stats.iter().map(|s| s.count.to_string()).collect(),
    };
    draw_line_chart(&chart, path, options)
}

/// Line chart of average magnitude per year, labels rounded for display.
pub fn render_average_chart(
    stats: &[YearStat],
    path: &Path,
    options: ChartOptions,
) -> Result<()> {
    let rounded: Vec<f64> = stats
        .iter()
        .map(|s| round_to(s.average_magnitude, options.decimals))
        .collect();

    let chart = LineChart {
        title: "The average magnitude of earthquakes per year",
        y_desc: "The average magnitude",
        years: stats.iter().map(|s| s.year).collect(),
        labels: rounded.iter().map(f64::to_string).collect(),
        values: rounded,
    };
    draw_line_chart(&chart, path, options)
}

fn draw_line_chart(chart: &LineChart<'_>, path: &Path, options: ChartOptions) -> Result<()> {
    debug!("Drawing '{}' with {} points", chart.title, chart.values.len());

    let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let (y_min, y_max) = value_range(&chart.values);
    let last_index = chart.years.len() as i32;
    let years = &chart.years;

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.title, (FONT, 22))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(70)
        .build_cartesian_2d(-1i32..last_index, y_min..y_max)
        .map_err(draw_error)?;

    // Index-based x axis, one tick per year; the padding ticks stay blank
    let year_label = |x: &i32| {
        usize::try_from(*x)
            .ok()
            .and_then(|i| years.get(i))
            .map(|year| year.to_string())
            .unwrap_or_default()
    };

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(years.len() + 3)
        .x_label_formatter(&year_label)
        .x_label_style((FONT, 12).into_font().transform(FontTransform::Rotate90))
        .x_desc("Year")
        .y_desc(chart.y_desc)
        .draw()
        .map_err(draw_error)?;

    let points: Vec<(i32, f64)> = chart
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| (i as i32, *v))
        .collect();

    ctx.draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(draw_error)?;

    ctx.draw_series(points.iter().map(|&(x, y)| {
        let label = chart.labels.get(x as usize).cloned().unwrap_or_default();
        EmptyElement::at((x, y))
            + Circle::new((0, 0), 3, BLUE.filled())
            + Text::new(label, (-10, -18), (FONT, 12).into_font())
    }))
    .map_err(draw_error)?;

    root.present().map_err(draw_error)?;
    Ok(())
}

/// Y range with headroom for the point labels.
fn value_range(values: &[f64]) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let span = if max > min { max - min } else { max.abs().max(1.0) };
    let low = if min >= 0.0 && min - span * 0.15 < 0.0 {
        0.0
    } else {
        min - span * 0.15
    };
    (low, max + span * 0.15)
}

fn draw_error<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("chart rendering failed: {}", e)
}
