//! Results Aggregator - joins timings with detection metrics per experiment
//!
//! The registry drives the join: every registered experiment gets exactly one
//! [`SummaryRow`], in registry order, whether or not a timing or a result
//! document was found for it. Missing values stay `None` and are written as
//! empty cells (CSV) or `-` (report), never as zero.
//!
//! FPS is derived from the recorded duration alone, independent of whether
//! the run succeeded, so a run that failed quickly reports a high FPS.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use csv::Writer;
use serde::Serialize;
use tracing::{info, warn};

use crate::experiment::{ExperimentSpec, Registry};
use crate::metrics::{extract_metrics, DetectionMetrics};
use crate::timing::Timings;
use crate::Result;

/// Header of the persisted summary table.
pub const SUMMARY_HEADER: [&str; 7] = [
    "experiment",
    "dataset",
    "model",
    "time_sec",
    "fps",
    "num_dets",
    "avg_score",
];

/// Frames per second for a per-frame duration; `None` unless `seconds > 0`.
#[must_use]
pub fn fps_from_duration(seconds: Option<f64>) -> Option<f64> {
    seconds.filter(|s| *s > 0.0).map(|s| 1.0 / s)
}

/// One joined row of the summary table.
///
/// Field order is the column order of the persisted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    experiment: String,
    dataset: String,
    model: String,
    time_sec: Option<f64>,
    fps: Option<f64>,
    num_dets: usize,
    avg_score: Option<f64>,
}

impl SummaryRow {
    /// Join a spec with its (possibly missing) duration and metrics.
    #[must_use]
    pub fn new(spec: &ExperimentSpec, time_sec: Option<f64>, metrics: DetectionMetrics) -> Self {
        Self {
            experiment: spec.name().to_string(),
            dataset: spec.dataset().to_string(),
            model: spec.model().to_string(),
            time_sec,
            fps: fps_from_duration(time_sec),
            num_dets: metrics.num_detections(),
            avg_score: metrics.avg_score(),
        }
    }

    /// Get the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the dataset tag.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Get the model tag.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the recorded duration in seconds.
    #[must_use]
    pub const fn time_sec(&self) -> Option<f64> {
        self.time_sec
    }

    /// Get the derived frames per second.
    #[must_use]
    pub const fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// Get the detection count.
    #[must_use]
    pub const fn num_dets(&self) -> usize {
        self.num_dets
    }

    /// Get the mean detection score.
    #[must_use]
    pub const fn avg_score(&self) -> Option<f64> {
        self.avg_score
    }
}

/// Builds summary rows for a registry from loaded timings.
#[derive(Debug, Clone, Copy)]
pub struct ResultsAggregator<'a> {
    registry: &'a Registry,
    timings: &'a Timings,
}

impl<'a> ResultsAggregator<'a> {
    /// Create an aggregator over `registry` using `timings` for durations.
    #[must_use]
    pub const fn new(registry: &'a Registry, timings: &'a Timings) -> Self {
        Self { registry, timings }
    }

    /// One row per registered experiment, in registry order.
    #[must_use]
    pub fn aggregate(&self) -> Vec<SummaryRow> {
        self.registry
            .iter()
            .map(|spec| {
                let time_sec = self.timings.get(spec.name()).copied();
                if time_sec.is_none() {
                    warn!(experiment = spec.name(), "No timing found");
                }
                SummaryRow::new(spec, time_sec, extract_metrics(spec.result_path()))
            })
            .collect()
    }
}

/// Write the summary table, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(SUMMARY_HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Metrics summary written");
    Ok(())
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

/// Render the rows as a Markdown table for inclusion in a report.
///
/// Times and FPS use two decimals, scores three; missing values show `-`.
#[must_use]
pub fn render_markdown(rows: &[SummaryRow]) -> String {
    let mut out = String::new();
    out.push_str("| Dataset | Model | Time / frame (s) | FPS | #Detections | Avg Score |\n");
    out.push_str("|---------|-------|------------------|-----|------------:|----------:|\n");
    for r in rows {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:>10} | {} |",
            r.dataset,
            r.model,
            fixed(r.time_sec, 2),
            fixed(r.fps, 2),
            r.num_dets,
            fixed(r.avg_score, 3),
        );
    }
    out
}
