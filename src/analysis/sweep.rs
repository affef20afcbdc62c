/// Threshold sweep: turns each probability row into a triggered/not
/// triggered decision at every candidate threshold, and assigns each row
/// its lead-time bucket.
///
/// Threshold columns carry their own identity (index, value, label) through
/// scoring and selection, so nothing downstream depends on column position.

use crate::analysis::ensemble::ProbabilityRow;
use crate::config::{BucketConfig, MAX_GRID_POINTS, ThresholdGridConfig, grid_point_count};
use crate::model::TriggerError;

// ---------------------------------------------------------------------------
// Threshold grid
// ---------------------------------------------------------------------------

/// One candidate probability threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdColumn {
    pub index: usize,
    pub value: f64,
    /// Column label, e.g. `threshold_0.70`.
    pub label: String,
}

/// Ascending candidate thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdGrid {
    columns: Vec<ThresholdColumn>,
    decimals: usize,
}

/// Grid points are snapped to this resolution so that 0.01 + 69 * 0.01
/// compares equal to 0.70 and to 7/10.
const GRID_SNAP: f64 = 1e9;

impl ThresholdGrid {
    /// Builds start, start + step, ... up to and including stop.
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, TriggerError> {
        if !(step > 0.0) || !start.is_finite() || !stop.is_finite() {
            return Err(TriggerError::Config(format!("invalid threshold step {}", step)));
        }
        if start > stop {
            return Err(TriggerError::Config(format!(
                "threshold start ({}) is greater than stop ({})",
                start, stop
            )));
        }

        let points = grid_point_count(start, stop, step);
        if points > MAX_GRID_POINTS as f64 {
            return Err(TriggerError::Config(format!(
                "threshold step {} gives {} grid points (max {})",
                step, points, MAX_GRID_POINTS
            )));
        }
        let intervals = points as usize - 1;
        let decimals = decimals_for(step).max(decimals_for(start));
        let columns = (0..=intervals)
            .map(|i| {
                let value = ((start + i as f64 * step) * GRID_SNAP).round() / GRID_SNAP;
                ThresholdColumn {
                    index: i,
                    value,
                    label: format!("threshold_{:.*}", decimals, value),
                }
            })
            .collect();

        Ok(Self { columns, decimals })
    }

    pub fn from_config(config: &ThresholdGridConfig) -> Result<Self, TriggerError> {
        Self::new(config.start, config.stop, config.step)
    }

    pub fn columns(&self) -> &[ThresholdColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ThresholdColumn> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Formats a threshold value at grid precision, e.g. `0.70`.
    pub fn format_value(&self, value: f64) -> String {
        format!("{:.*}", self.decimals, value)
    }
}

/// Smallest number of decimals that represents `value` exactly (max 9).
fn decimals_for(value: f64) -> usize {
    (0..9)
        .find(|&d| {
            let scaled = value * 10f64.powi(d as i32);
            (scaled - scaled.round()).abs() < 1e-6
        })
        .unwrap_or(9)
}

// ---------------------------------------------------------------------------
// Lead-time buckets
// ---------------------------------------------------------------------------

/// A half-open lead-time interval [start, end).
#[derive(Debug, Clone, PartialEq)]
pub struct LeadTimeBucket {
    pub label: String,
    pub start: u32,
    pub end: u32,
}

impl LeadTimeBucket {
    pub fn contains(&self, lead_time: u32) -> bool {
        self.start <= lead_time && lead_time < self.end
    }
}

/// Lead-time bins plus the label of the all-lead-times aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadTimeBuckets {
    bins: Vec<LeadTimeBucket>,
    aggregate_label: String,
}

impl LeadTimeBuckets {
    pub fn from_config(config: &BucketConfig) -> Result<Self, TriggerError> {
        if config.edges.len() < 2 || config.labels.len() != config.edges.len() - 1 {
            return Err(TriggerError::Config(
                "lead_time_buckets needs one more edge than labels".to_string(),
            ));
        }
        if config.edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TriggerError::Config(
                "lead_time_buckets edges must be strictly increasing".to_string(),
            ));
        }

        let bins = config
            .edges
            .windows(2)
            .zip(&config.labels)
            .map(|(edge, label)| LeadTimeBucket {
                label: label.clone(),
                start: edge[0],
                end: edge[1],
            })
            .collect();

        Ok(Self {
            bins,
            aggregate_label: config.aggregate_label.clone(),
        })
    }

    pub fn bins(&self) -> &[LeadTimeBucket] {
        &self.bins
    }

    pub fn aggregate_label(&self) -> &str {
        &self.aggregate_label
    }

    /// Index of the bin holding a lead time. Bins are left-inclusive: a lead
    /// time equal to a bin's lower edge belongs to that bin.
    pub fn assign(&self, lead_time: u32) -> Option<usize> {
        self.bins.iter().position(|b| b.contains(lead_time))
    }

    /// All bucket labels in output order: the bins, then the aggregate.
    pub fn labels(&self) -> Vec<&str> {
        self.bins
            .iter()
            .map(|b| b.label.as_str())
            .chain(std::iter::once(self.aggregate_label.as_str()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// A probability row with its bucket and per-threshold decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct SweptRow {
    pub row: ProbabilityRow,
    /// Index into `LeadTimeBuckets::bins`.
    pub bucket: usize,
    /// `triggered[i]` is `probability_of_detection >= grid.columns()[i].value`.
    pub triggered: Vec<bool>,
}

/// The threshold-swept matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSweep {
    pub grid: ThresholdGrid,
    pub buckets: LeadTimeBuckets,
    pub rows: Vec<SweptRow>,
}

/// Sweeps every row across the grid and buckets it by lead time.
pub fn sweep_thresholds(
    rows: Vec<ProbabilityRow>,
    grid: &ThresholdGrid,
    buckets: &LeadTimeBuckets,
) -> Result<ThresholdSweep, TriggerError> {
    let swept = rows
        .into_iter()
        .map(|row| -> Result<SweptRow, TriggerError> {
            let bucket = buckets.assign(row.lead_time).ok_or_else(|| {
                TriggerError::Config(format!(
                    "lead time {} is not covered by any lead_time_buckets bin",
                    row.lead_time
                ))
            })?;
            let triggered = grid
                .columns()
                .iter()
                .map(|c| row.probability_of_detection >= c.value)
                .collect();
            Ok(SweptRow { row, bucket, triggered })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ThresholdSweep {
        grid: grid.clone(),
        buckets: buckets.clone(),
        rows: swept,
    })
}
