/// Ensemble aggregation: collapses per-member forecast flags into a
/// probability of detection.
///
/// Rows are keyed by (source, lead time, station, forecasted date,
/// severity, observed_event) and the probability is the share of members
/// forecasting an event. The denominator is the configured ensemble size,
/// not the number of members seen, so a row can never report a higher
/// probability than the full ensemble would.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::model::{EventRecord, TriggerError};

/// One aggregated forecast row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityRow {
    pub source: String,
    pub lead_time: u32,
    pub station: String,
    pub forecasted_date: NaiveDate,
    pub severity: String,
    pub observed_event: bool,
    /// forecast_event per member, keyed by member name.
    pub members: BTreeMap<String, bool>,
    pub probability_of_detection: f64,
}

impl ProbabilityRow {
    pub fn triggered_members(&self) -> usize {
        self.members.values().filter(|&&flag| flag).count()
    }
}

type RowKey = (String, u32, String, NaiveDate, String);

struct Accumulator {
    observed_event: bool,
    members: BTreeMap<String, bool>,
}

/// Aggregates event records into probability rows, ordered by
/// (source, lead time, station, date, severity).
pub fn aggregate_ensemble(
    events: &[EventRecord],
    ensemble_size: usize,
) -> Result<Vec<ProbabilityRow>, TriggerError> {
    if ensemble_size == 0 {
        return Err(TriggerError::Config("ensemble_size must be at least 1".to_string()));
    }

    let mut groups: BTreeMap<RowKey, Accumulator> = BTreeMap::new();
    for event in events {
        let key = (
            event.source.clone(),
            event.lead_time,
            event.station.clone(),
            event.forecasted_date,
            event.severity.clone(),
        );

        match groups.entry(key) {
            Entry::Vacant(slot) => {
                let mut members = BTreeMap::new();
                members.insert(event.member.clone(), event.forecast_event);
                slot.insert(Accumulator {
                    observed_event: event.observed_event,
                    members,
                });
            }
            Entry::Occupied(mut slot) => {
                let acc = slot.get_mut();
                if acc.observed_event != event.observed_event {
                    return Err(TriggerError::InconsistentObservation {
                        source: event.source.clone(),
                        station: event.station.clone(),
                        date: event.forecasted_date,
                        severity: event.severity.clone(),
                    });
                }
                if acc.members.insert(event.member.clone(), event.forecast_event).is_some() {
                    return Err(TriggerError::DuplicateMember {
                        source: event.source.clone(),
                        station: event.station.clone(),
                        member: event.member.clone(),
                    });
                }
                if acc.members.len() > ensemble_size {
                    return Err(TriggerError::EnsembleSizeMismatch {
                        source: event.source.clone(),
                        expected: ensemble_size,
                        found: acc.members.len(),
                    });
                }
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|((source, lead_time, station, forecasted_date, severity), acc)| {
            let mut row = ProbabilityRow {
                source,
                lead_time,
                station,
                forecasted_date,
                severity,
                observed_event: acc.observed_event,
                members: acc.members,
                probability_of_detection: 0.0,
            };
            row.probability_of_detection = row.triggered_members() as f64 / ensemble_size as f64;
            row
        })
        .collect();

    Ok(rows)
}
