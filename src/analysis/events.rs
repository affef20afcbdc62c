/// Event resolution: turns observed series and forecast fields into
/// per-member (observed_event, forecast_event) pairs.
///
/// For every forecast run and lead time the forecasted date is the issue
/// date plus the lead time in days. The observed value for each station on
/// that date decides `observed_event`; each member's value at the station's
/// grid cell decides `forecast_event`. Both comparisons are strict, so a
/// value sitting exactly on a threshold is a non-event.
///
/// A (run, lead time, station) without an observation is skipped and
/// recorded, never imputed. Structural problems (a station missing from
/// either dataset, a forecast without the station's grid cell or date)
/// abort the resolution.

use chrono::{Days, NaiveDate};
use std::ops::RangeInclusive;

use crate::ingest::forecast::ForecastField;
use crate::ingest::observed::ObservedSeries;
use crate::logging::{self, Stage};
use crate::model::{EventRecord, ObservationLookup, TriggerError};
use crate::stations::StationRegistry;

/// A (run, lead time, station) combination dropped for lack of ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedObservation {
    pub source: String,
    pub lead_time: u32,
    pub station: String,
    pub forecasted_date: NaiveDate,
}

/// Output of the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub events: Vec<EventRecord>,
    /// Number of (run, lead time, station) combinations examined.
    pub combinations: usize,
    pub skipped: Vec<SkippedObservation>,
}

/// Resolves every forecast run against the observed series.
pub fn resolve_events(
    forecasts: &[ForecastField],
    observed: &ObservedSeries,
    registry: &StationRegistry,
    lead_times: RangeInclusive<u32>,
) -> Result<Resolution, TriggerError> {
    observed.check_against(registry)?;

    let mut events = Vec::new();
    let mut skipped = Vec::new();
    let mut combinations = 0;

    for forecast in forecasts {
        for lead_time in lead_times.clone() {
            let forecasted_date = forecast
                .issue_date()
                .checked_add_days(Days::new(u64::from(lead_time)))
                .ok_or_else(|| {
                    TriggerError::Config(format!(
                        "lead time {} overflows the calendar from {}",
                        lead_time,
                        forecast.issue_date()
                    ))
                })?;

            for station in registry.stations() {
                combinations += 1;

                let observed_value = match observed.lookup(&station.name, forecasted_date)? {
                    ObservationLookup::Found(value) => value,
                    ObservationLookup::Missing => {
                        logging::debug(
                            Stage::Resolver,
                            Some(&station.name),
                            &format!(
                                "no observation on {} (lead {} of {}), skipping",
                                forecasted_date,
                                lead_time,
                                forecast.source()
                            ),
                        );
                        skipped.push(SkippedObservation {
                            source: forecast.source().to_string(),
                            lead_time,
                            station: station.name.clone(),
                            forecasted_date,
                        });
                        continue;
                    }
                };

                let member_values = forecast
                    .sample(station.latitude, station.longitude, forecasted_date)
                    .ok_or_else(|| TriggerError::ForecastCoverage {
                        source: forecast.source().to_string(),
                        station: station.name.clone(),
                        date: forecasted_date,
                    })?;

                for threshold in &station.thresholds {
                    let observed_event = observed_value > threshold.observed;
                    for (member, &value) in forecast.members().iter().zip(member_values) {
                        events.push(EventRecord {
                            source: forecast.source().to_string(),
                            lead_time,
                            station: station.name.clone(),
                            member: member.clone(),
                            forecasted_date,
                            severity: threshold.severity.clone(),
                            observed_event,
                            forecast_event: value > threshold.forecast,
                        });
                    }
                }
            }
        }
    }

    Ok(Resolution {
        events,
        combinations,
        skipped,
    })
}
