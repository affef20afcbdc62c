/// Run configuration loader - parses flotrig.toml
///
/// Separates the verification parameters from code, making it easy to
/// change the ensemble size, the probability grid, lead-time buckets or the
/// feasibility bounds for a new country without recompiling.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::TriggerError;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "flotrig.toml";

/// Environment variable that overrides the default configuration path.
pub const CONFIG_ENV_VAR: &str = "FLOTRIG_CONFIG";

/// Upper bound on candidate thresholds. Every probability row carries one
/// flag per threshold, so the grid size multiplies memory use.
pub const MAX_GRID_POINTS: usize = 10_000;

// ---------------------------------------------------------------------------
// Configuration structures
// ---------------------------------------------------------------------------

/// Root configuration for one verification run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of ensemble members per forecast (GloFAS: 11).
    pub ensemble_size: usize,
    /// Forecast variables whose name starts with this prefix are members.
    pub member_prefix: String,
    /// First lead time evaluated, in days.
    pub lead_time_min: u32,
    /// Last lead time evaluated, in days (inclusive).
    pub lead_time_max: u32,
    /// Worker threads used for skill scoring (1 = score inline).
    pub workers: usize,
    pub severities: SeverityConfig,
    pub metadata: MetadataColumns,
    pub thresholds: ThresholdGridConfig,
    pub lead_time_buckets: BucketConfig,
    pub selection: SelectionConfig,
    pub paths: PathConfig,
}

/// Severity labels and the metadata column prefixes for their thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub labels: Vec<String>,
    pub observed_prefix: String,
    pub forecast_prefix: String,
}

/// Column names in the station metadata file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataColumns {
    pub station: String,
    pub latitude: String,
    pub longitude: String,
}

/// Candidate probability thresholds, start..=stop in increments of step.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdGridConfig {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

/// Number of points in start..=stop by step, computed without allocating.
/// The 1e-9 slack keeps a stop reached by accumulated steps inside the grid.
pub fn grid_point_count(start: f64, stop: f64, step: f64) -> f64 {
    ((stop - start) / step + 1e-9).floor() + 1.0
}

/// Lead-time bins as left-inclusive edges, plus the all-lead-times label.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub edges: Vec<u32>,
    pub labels: Vec<String>,
    pub aggregate_label: String,
}

/// Metric used to rank feasible thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMetric {
    Csi,
    Pss,
    F1,
}

/// Feasibility bounds and ranking for trigger selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub hit_rate_min: f64,
    pub false_alarm_rate_max: f64,
    pub rank_by: RankingMetric,
}

/// Input and output locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub station_metadata: PathBuf,
    pub observed: PathBuf,
    pub forecast_dir: PathBuf,
    pub output_dir: PathBuf,
    pub triggers_file: String,
    pub metrics_file: String,
    pub summary_file: String,
}

// ---------------------------------------------------------------------------
// Defaults (reference values used for the Mozambique pre-season analysis)
// ---------------------------------------------------------------------------

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ensemble_size: 11,
            member_prefix: "dis24_".to_string(),
            lead_time_min: 0,
            lead_time_max: 45,
            workers: 1,
            severities: SeverityConfig::default(),
            metadata: MetadataColumns::default(),
            thresholds: ThresholdGridConfig::default(),
            lead_time_buckets: BucketConfig::default(),
            selection: SelectionConfig::default(),
            paths: PathConfig::default(),
        }
    }
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            labels: vec!["bankfull".to_string(), "moderate".to_string(), "severe".to_string()],
            observed_prefix: "obs_".to_string(),
            forecast_prefix: "glofas_".to_string(),
        }
    }
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self {
            station: "station name".to_string(),
            latitude: "lisflood_y".to_string(),
            longitude: "lisflood_x".to_string(),
        }
    }
}

impl Default for ThresholdGridConfig {
    fn default() -> Self {
        Self { start: 0.01, stop: 0.99, step: 0.01 }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            edges: vec![0, 5, 10, 15, 20, 25, 30, 35, 40, 46],
            labels: ["0-5", "6-10", "11-15", "16-20", "21-25", "26-30", "31-35", "36-40", "41-46"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            aggregate_label: "0-46".to_string(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            hit_rate_min: 0.5,
            false_alarm_rate_max: 0.5,
            rank_by: RankingMetric::Csi,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            station_metadata: PathBuf::from("data/metadata.csv"),
            observed: PathBuf::from("data/observed.csv"),
            forecast_dir: PathBuf::from("data/forecasts"),
            output_dir: PathBuf::from("outputs"),
            triggers_file: "flood_triggers.csv".to_string(),
            metrics_file: "flood_metrics.csv".to_string(),
            summary_file: "run_summary.json".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl PipelineConfig {
    /// Rejects configurations that would make the run meaningless or
    /// silently drop rows.
    pub fn validate(&self) -> Result<(), TriggerError> {
        if self.ensemble_size == 0 {
            return Err(TriggerError::Config("ensemble_size must be at least 1".to_string()));
        }
        if self.member_prefix.is_empty() {
            return Err(TriggerError::Config("member_prefix must not be empty".to_string()));
        }
        if self.lead_time_min > self.lead_time_max {
            return Err(TriggerError::Config(format!(
                "lead_time_min ({}) is greater than lead_time_max ({})",
                self.lead_time_min, self.lead_time_max
            )));
        }
        if self.workers == 0 {
            return Err(TriggerError::Config("workers must be at least 1".to_string()));
        }
        if self.severities.labels.is_empty() {
            return Err(TriggerError::Config("at least one severity label is required".to_string()));
        }

        let grid = &self.thresholds;
        if !(grid.step > 0.0) {
            return Err(TriggerError::Config(format!("threshold step must be positive, got {}", grid.step)));
        }
        if grid.start > grid.stop {
            return Err(TriggerError::Config(format!(
                "threshold start ({}) is greater than stop ({})",
                grid.start, grid.stop
            )));
        }
        if !(grid.start > 0.0 && grid.stop <= 1.0) {
            return Err(TriggerError::Config(format!(
                "threshold grid must lie in (0, 1], got {}..{}",
                grid.start, grid.stop
            )));
        }
        let points = grid_point_count(grid.start, grid.stop, grid.step);
        if points > MAX_GRID_POINTS as f64 {
            return Err(TriggerError::Config(format!(
                "threshold step {} gives {} grid points (max {})",
                grid.step, points, MAX_GRID_POINTS
            )));
        }

        let buckets = &self.lead_time_buckets;
        if buckets.edges.len() < 2 {
            return Err(TriggerError::Config("lead_time_buckets needs at least two edges".to_string()));
        }
        if buckets.edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TriggerError::Config("lead_time_buckets edges must be strictly increasing".to_string()));
        }
        if buckets.labels.len() != buckets.edges.len() - 1 {
            return Err(TriggerError::Config(format!(
                "lead_time_buckets has {} edges but {} labels (expected {})",
                buckets.edges.len(),
                buckets.labels.len(),
                buckets.edges.len() - 1
            )));
        }
        let first = buckets.edges[0];
        let last = buckets.edges[buckets.edges.len() - 1];
        if first > self.lead_time_min || last <= self.lead_time_max {
            return Err(TriggerError::Config(format!(
                "lead_time_buckets [{}, {}) do not cover lead times {}..={}",
                first, last, self.lead_time_min, self.lead_time_max
            )));
        }
        if buckets.labels.iter().any(|l| l == &buckets.aggregate_label) {
            return Err(TriggerError::Config(format!(
                "aggregate_label '{}' collides with a bucket label",
                buckets.aggregate_label
            )));
        }

        let sel = &self.selection;
        for (name, value) in [("hit_rate_min", sel.hit_rate_min), ("false_alarm_rate_max", sel.false_alarm_rate_max)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TriggerError::Config(format!("{} must lie in [0, 1], got {}", name, value)));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads and validates a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, TriggerError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| TriggerError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_config(&contents, &path.display().to_string())
}

/// Parses and validates configuration text. `origin` names the source in errors.
pub fn parse_config(contents: &str, origin: &str) -> Result<PipelineConfig, TriggerError> {
    let config: PipelineConfig = toml::from_str(contents).map_err(|e| TriggerError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Resolves the configuration path: `FLOTRIG_CONFIG` (also read from a
/// `.env` file) or `flotrig.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    dotenv::dotenv().ok();
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads the configuration from its default location.
pub fn load_config_default() -> Result<PipelineConfig, TriggerError> {
    load_config(default_config_path())
}
