/// Output writers: trigger table, metrics table and run summary.
///
/// Every output is rendered to memory first and then written in one go,
/// replacing whatever a previous run left behind. Rendering depends only
/// on the selections and metrics passed in (no timestamps, no hash-map
/// iteration order), so re-running on the same inputs produces
/// byte-identical files.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::contingency::{Metric, MetricsTable};
use crate::analysis::sweep::ThresholdGrid;
use crate::analysis::triggers::TriggerSelection;
use crate::config::{PathConfig, RankingMetric};
use crate::logging::{self, Stage};
use crate::model::TriggerError;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const STATION_COLUMN: &str = "station_name";
pub const BUCKET_COLUMN: &str = "lead_time_category";
/// Holds the severity label; the name is kept for existing consumers.
pub const SEVERITY_COLUMN: &str = "threshold";
pub const TRIGGER_COLUMN: &str = "best_trigger";
pub const METRIC_COLUMN: &str = "metric";

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counts describing one run, written as JSON next to the tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub stations: usize,
    pub forecast_sources: usize,
    pub combinations: usize,
    pub skipped_observations: usize,
    pub events: usize,
    pub probability_rows: usize,
    pub thresholds: usize,
    pub rank_by: RankingMetric,
    pub groups: usize,
    pub groups_with_trigger: usize,
    pub groups_without_trigger: usize,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn csv_error(target: &str, err: impl std::fmt::Display) -> TriggerError {
    TriggerError::Io {
        path: target.to_string(),
        message: err.to_string(),
    }
}

fn finish(writer: csv::Writer<Vec<u8>>, target: &str) -> Result<String, TriggerError> {
    let bytes = writer.into_inner().map_err(|e| csv_error(target, e))?;
    String::from_utf8(bytes).map_err(|e| csv_error(target, e))
}

/// Renders the trigger table. `best_trigger` is empty for groups without
/// a feasible threshold.
pub fn triggers_csv(selections: &[TriggerSelection], grid: &ThresholdGrid) -> Result<String, TriggerError> {
    let target = "trigger table";
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([STATION_COLUMN, BUCKET_COLUMN, SEVERITY_COLUMN, TRIGGER_COLUMN])
        .map_err(|e| csv_error(target, e))?;

    for selection in selections {
        let trigger = selection
            .trigger
            .as_ref()
            .map(|column| grid.format_value(column.value))
            .unwrap_or_default();
        writer
            .write_record([
                selection.key.station.as_str(),
                selection.key.bucket.as_str(),
                selection.key.severity.as_str(),
                trigger.as_str(),
            ])
            .map_err(|e| csv_error(target, e))?;
    }

    finish(writer, target)
}

fn format_metric(metric: Metric, value: f64) -> String {
    if metric.is_count() {
        format!("{}", value as u64)
    } else {
        format!("{}", value)
    }
}

/// Renders the wide metrics table: one row per (group, metric), one
/// column per threshold.
pub fn metrics_csv(metrics: &MetricsTable) -> Result<String, TriggerError> {
    let target = "metrics table";
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        STATION_COLUMN.to_string(),
        BUCKET_COLUMN.to_string(),
        SEVERITY_COLUMN.to_string(),
        METRIC_COLUMN.to_string(),
    ];
    header.extend(metrics.grid.columns().iter().map(|c| c.label.clone()));
    writer.write_record(&header).map_err(|e| csv_error(target, e))?;

    for group in &metrics.groups {
        for metric in Metric::ALL {
            let mut record = vec![
                group.key.station.clone(),
                group.key.bucket.clone(),
                group.key.severity.clone(),
                metric.label().to_string(),
            ];
            record.extend(group.scores.iter().map(|s| format_metric(metric, metric.value(s))));
            writer.write_record(&record).map_err(|e| csv_error(target, e))?;
        }
    }

    finish(writer, target)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Paths written by `write_outputs`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFiles {
    pub triggers: PathBuf,
    pub metrics: PathBuf,
    pub summary: PathBuf,
}

impl OutputFiles {
    pub fn in_dir(dir: &Path, paths: &PathConfig) -> Self {
        Self {
            triggers: dir.join(&paths.triggers_file),
            metrics: dir.join(&paths.metrics_file),
            summary: dir.join(&paths.summary_file),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), TriggerError> {
    fs::write(path, contents).map_err(|e| TriggerError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Writes all three outputs into `dir`, creating it if needed.
pub fn write_outputs(
    dir: &Path,
    paths: &PathConfig,
    selections: &[TriggerSelection],
    metrics: &MetricsTable,
    summary: &RunSummary,
) -> Result<OutputFiles, TriggerError> {
    fs::create_dir_all(dir).map_err(|e| TriggerError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let files = OutputFiles::in_dir(dir, paths);
    let summary_json = serde_json::to_string_pretty(summary).map_err(|e| csv_error("run summary", e))?;

    write_file(&files.triggers, &triggers_csv(selections, &metrics.grid)?)?;
    write_file(&files.metrics, &metrics_csv(metrics)?)?;
    write_file(&files.summary, &(summary_json + "\n"))?;

    logging::info(
        Stage::Export,
        None,
        &format!(
            "wrote {}, {} and {}",
            files.triggers.display(),
            files.metrics.display(),
            files.summary.display()
        ),
    );

    Ok(files)
}
