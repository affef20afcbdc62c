/// Skill-group organization.
///
/// `group_by_skill_group` takes the flat threshold-swept matrix and
/// partitions it into (station, lead-time bucket, severity) groups, the unit
/// every contingency table and trigger is computed for. Groups hold row
/// indices into the sweep rather than copies, so they can be handed to
/// scoring workers alongside a shared sweep.
///
/// Every row lands in exactly one lead-time bin for its station and
/// severity, and also in that station's all-lead-times aggregate.
///
/// The group list is dense and in a fixed order: stations in registry
/// order, buckets in configured order with the aggregate last, severities
/// in configured order. A combination without rows is still present with
/// an empty row list, which keeps the output shape independent of which
/// observations happened to be missing.

use std::collections::HashMap;

use crate::analysis::sweep::ThresholdSweep;
use crate::model::TriggerError;
use crate::stations::StationRegistry;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity of a skill group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SkillGroupKey {
    pub station: String,
    /// Bucket label, e.g. `0-5` or the aggregate `0-46`.
    pub bucket: String,
    pub severity: String,
}

/// A skill group and the sweep rows that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillGroup {
    pub key: SkillGroupKey,
    /// Indices into `ThresholdSweep::rows`.
    pub rows: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partitions the swept rows into skill groups in canonical order.
///
/// Fails if a row names a station outside the registry or a severity
/// outside the configured labels, either of which would otherwise vanish
/// from the output.
pub fn group_by_skill_group(
    sweep: &ThresholdSweep,
    registry: &StationRegistry,
    severities: &[String],
) -> Result<Vec<SkillGroup>, TriggerError> {
    let bucket_labels = sweep.buckets.labels();
    let aggregate = bucket_labels.len() - 1;

    let station_pos: HashMap<&str, usize> =
        registry.names().into_iter().enumerate().map(|(i, n)| (n, i)).collect();
    let severity_pos: HashMap<&str, usize> =
        severities.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();

    // Flat index: ((station * buckets) + bucket) * severities + severity
    let per_station = bucket_labels.len() * severities.len();
    let slot = |station: usize, bucket: usize, severity: usize| {
        station * per_station + bucket * severities.len() + severity
    };

    let mut groups: Vec<SkillGroup> = Vec::with_capacity(registry.len() * per_station);
    for station in registry.stations() {
        for label in &bucket_labels {
            for severity in severities {
                groups.push(SkillGroup {
                    key: SkillGroupKey {
                        station: station.name.clone(),
                        bucket: label.to_string(),
                        severity: severity.clone(),
                    },
                    rows: Vec::new(),
                });
            }
        }
    }

    for (index, swept) in sweep.rows.iter().enumerate() {
        let s = *station_pos
            .get(swept.row.station.as_str())
            .ok_or_else(|| TriggerError::UnlistedStation(swept.row.station.clone()))?;
        let v = *severity_pos.get(swept.row.severity.as_str()).ok_or_else(|| {
            TriggerError::Config(format!("severity '{}' is not a configured label", swept.row.severity))
        })?;

        groups[slot(s, swept.bucket, v)].rows.push(index);
        groups[slot(s, aggregate, v)].rows.push(index);
    }

    Ok(groups)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
