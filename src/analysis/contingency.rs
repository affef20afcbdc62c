/// Contingency tables and skill scores per skill group.
///
/// For every group and every candidate threshold the group's rows are
/// tallied into a 2×2 table of observed vs. triggered, and the usual
/// verification scores are derived from it. Every ratio with a zero
/// denominator is 0, so the metrics table is dense and thresholds compare
/// uniformly even for groups that never saw an observed event.
///
/// Groups are independent, so `score_groups` fans them out over a thread
/// pool. Results are put back in the input group order before returning,
/// which keeps the output identical for any worker count. A group whose
/// worker died fails the run.

use std::sync::Arc;
use std::sync::mpsc;
use threadpool::ThreadPool;

use crate::analysis::groupings::{SkillGroup, SkillGroupKey};
use crate::analysis::sweep::{ThresholdGrid, ThresholdSweep};
use crate::model::TriggerError;

// ---------------------------------------------------------------------------
// Contingency table
// ---------------------------------------------------------------------------

/// Outcome counts for one group at one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContingencyTable {
    pub hits: usize,
    pub false_alarms: usize,
    pub misses: usize,
    pub correct_rejections: usize,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

impl ContingencyTable {
    pub fn record(&mut self, observed: bool, triggered: bool) {
        match (observed, triggered) {
            (true, true) => self.hits += 1,
            (false, true) => self.false_alarms += 1,
            (true, false) => self.misses += 1,
            (false, false) => self.correct_rejections += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.hits + self.false_alarms + self.misses + self.correct_rejections
    }

    /// hits / (hits + misses)
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits as f64, (self.hits + self.misses) as f64)
    }

    /// false_alarms / (hits + false_alarms): the share of triggers that
    /// were not followed by an observed event.
    pub fn false_alarm_rate(&self) -> f64 {
        ratio(self.false_alarms as f64, (self.hits + self.false_alarms) as f64)
    }

    /// hits / (hits + false_alarms + misses)
    pub fn critical_success_index(&self) -> f64 {
        ratio(self.hits as f64, (self.hits + self.false_alarms + self.misses) as f64)
    }

    /// Peirce skill score from the counts directly.
    pub fn peirce_skill_score(&self) -> f64 {
        let (h, fa, m, cr) = (
            self.hits as f64,
            self.false_alarms as f64,
            self.misses as f64,
            self.correct_rejections as f64,
        );
        ratio(h * cr - fa * m, (h + m) * (fa + cr))
    }

    pub fn precision(&self) -> f64 {
        ratio(self.hits as f64, (self.hits + self.false_alarms) as f64)
    }

    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.hit_rate();
        ratio(2.0 * precision * recall, precision + recall)
    }

    pub fn scores(&self) -> SkillScores {
        SkillScores {
            table: *self,
            hit_rate: self.hit_rate(),
            false_alarm_rate: self.false_alarm_rate(),
            csi: self.critical_success_index(),
            pss: self.peirce_skill_score(),
            f1: self.f1_score(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// A contingency table with its derived scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillScores {
    pub table: ContingencyTable,
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub csi: f64,
    pub pss: f64,
    pub f1: f64,
}

/// Rows of the metrics table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Hits,
    FalseAlarms,
    Misses,
    CorrectRejections,
    HitRate,
    FalseAlarmRate,
    Csi,
    Pss,
    F1,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Hits,
        Metric::FalseAlarms,
        Metric::Misses,
        Metric::CorrectRejections,
        Metric::HitRate,
        Metric::FalseAlarmRate,
        Metric::Csi,
        Metric::Pss,
        Metric::F1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Hits => "hits",
            Metric::FalseAlarms => "false alarms",
            Metric::Misses => "misses",
            Metric::CorrectRejections => "correct rejections",
            Metric::HitRate => "hit rates",
            Metric::FalseAlarmRate => "false alarm rates",
            Metric::Csi => "csi",
            Metric::Pss => "pss",
            Metric::F1 => "f1 score",
        }
    }

    /// True for the four raw counts.
    pub fn is_count(&self) -> bool {
        matches!(
            self,
            Metric::Hits | Metric::FalseAlarms | Metric::Misses | Metric::CorrectRejections
        )
    }

    pub fn value(&self, scores: &SkillScores) -> f64 {
        match self {
            Metric::Hits => scores.table.hits as f64,
            Metric::FalseAlarms => scores.table.false_alarms as f64,
            Metric::Misses => scores.table.misses as f64,
            Metric::CorrectRejections => scores.table.correct_rejections as f64,
            Metric::HitRate => scores.hit_rate,
            Metric::FalseAlarmRate => scores.false_alarm_rate,
            Metric::Csi => scores.csi,
            Metric::Pss => scores.pss,
            Metric::F1 => scores.f1,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics table
// ---------------------------------------------------------------------------

/// Scores for one group, one entry per grid column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMetrics {
    pub key: SkillGroupKey,
    pub row_count: usize,
    pub scores: Vec<SkillScores>,
}

/// Scores for every group, in canonical group order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    pub grid: ThresholdGrid,
    pub groups: Vec<GroupMetrics>,
}

/// Tallies one group across every threshold.
pub fn score_group(sweep: &ThresholdSweep, group: &SkillGroup) -> GroupMetrics {
    let mut tables = vec![ContingencyTable::default(); sweep.grid.len()];
    for &index in &group.rows {
        let swept = &sweep.rows[index];
        for (table, &triggered) in tables.iter_mut().zip(&swept.triggered) {
            table.record(swept.row.observed_event, triggered);
        }
    }

    GroupMetrics {
        key: group.key.clone(),
        row_count: group.rows.len(),
        scores: tables.iter().map(|t| t.scores()).collect(),
    }
}

/// Scores every group, using a pool of `workers` threads when more than one.
pub fn score_groups(
    sweep: Arc<ThresholdSweep>,
    groups: Vec<SkillGroup>,
    workers: usize,
) -> Result<MetricsTable, TriggerError> {
    let grid = sweep.grid.clone();
    if workers <= 1 || groups.len() <= 1 {
        let scored = groups.iter().map(|g| score_group(&sweep, g)).collect();
        return Ok(MetricsTable { grid, groups: scored });
    }

    let pool = ThreadPool::new(workers);
    let (tx, rx) = mpsc::channel();
    for (position, group) in groups.iter().cloned().enumerate() {
        let tx = tx.clone();
        let sweep = Arc::clone(&sweep);
        pool.execute(move || {
            let metrics = score_group(&sweep, &group);
            // The receiver outlives the pool; a send error only means the
            // collector gave up.
            let _ = tx.send((position, metrics));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<GroupMetrics>> = vec![None; groups.len()];
    for (position, metrics) in rx.iter() {
        slots[position] = Some(metrics);
    }
    pool.join();

    let scored = slots
        .into_iter()
        .zip(&groups)
        .map(|(slot, group)| {
            slot.ok_or_else(|| {
                TriggerError::Scoring(format!(
                    "no result for {}/{}/{} (worker panicked)",
                    group.key.station, group.key.bucket, group.key.severity
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MetricsTable { grid, groups: scored })
}
