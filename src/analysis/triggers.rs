/// Trigger selection: picks one probability threshold per skill group.
///
/// A threshold is feasible when its hit rate reaches the minimum and its
/// false alarm rate stays under the maximum. Among feasible thresholds the
/// one with the highest ranking score wins; on a tie the first in ascending
/// threshold order is kept. A group with no feasible threshold gets `None`,
/// which is a valid outcome and is written out as such.

use crate::analysis::contingency::{MetricsTable, SkillScores};
use crate::analysis::groupings::SkillGroupKey;
use crate::analysis::sweep::ThresholdColumn;
use crate::config::{RankingMetric, SelectionConfig};
use crate::logging::{self, Stage};

/// Minimum hit rate and maximum false alarm rate, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeasibilityBounds {
    pub hit_rate_min: f64,
    pub false_alarm_rate_max: f64,
}

impl FeasibilityBounds {
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self {
            hit_rate_min: config.hit_rate_min,
            false_alarm_rate_max: config.false_alarm_rate_max,
        }
    }

    pub fn is_feasible(&self, scores: &SkillScores) -> bool {
        scores.hit_rate >= self.hit_rate_min && scores.false_alarm_rate <= self.false_alarm_rate_max
    }
}

impl RankingMetric {
    pub fn score(&self, scores: &SkillScores) -> f64 {
        match self {
            RankingMetric::Csi => scores.csi,
            RankingMetric::Pss => scores.pss,
            RankingMetric::F1 => scores.f1,
        }
    }
}

/// The selected threshold for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSelection {
    pub key: SkillGroupKey,
    pub trigger: Option<ThresholdColumn>,
}

/// Index of the winning threshold column, if any is feasible.
pub fn select_threshold(
    scores: &[SkillScores],
    bounds: &FeasibilityBounds,
    rank_by: RankingMetric,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, s) in scores.iter().enumerate() {
        if !bounds.is_feasible(s) {
            continue;
        }
        let value = rank_by.score(s);
        match best {
            // Strict comparison keeps the earliest maximum.
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Selects a trigger for every group in the metrics table, in table order.
/// A group without rows has nothing to verify and never gets a trigger,
/// whatever the bounds.
pub fn select_triggers(
    metrics: &MetricsTable,
    bounds: &FeasibilityBounds,
    rank_by: RankingMetric,
) -> Vec<TriggerSelection> {
    metrics
        .groups
        .iter()
        .map(|group| {
            let trigger = if group.row_count == 0 {
                None
            } else {
                select_threshold(&group.scores, bounds, rank_by)
                    .and_then(|index| metrics.grid.column(index).cloned())
            };
            if trigger.is_none() {
                logging::debug(
                    Stage::Selector,
                    Some(&group.key.station),
                    &format!(
                        "no feasible threshold for {}/{} ({} rows)",
                        group.key.bucket, group.key.severity, group.row_count
                    ),
                );
            }
            TriggerSelection {
                key: group.key.clone(),
                trigger,
            }
        })
        .collect()
}
