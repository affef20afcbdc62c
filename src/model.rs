/// Core data types for the flood trigger verification pipeline.
///
/// This module defines the shared domain model imported by all other
/// modules: station metadata, the per-event records produced by the
/// resolver, and the error type every stage returns. It contains no I/O.

use chrono::NaiveDate;
use std::fmt;

// ---------------------------------------------------------------------------
// Station types
// ---------------------------------------------------------------------------

/// Observed-scale and forecast-scale thresholds for one severity level.
///
/// Observed values are gauge units (m³/s or stage), forecast values are in
/// the forecast model's own climatology, so the two rarely coincide.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityThreshold {
    pub severity: String,
    pub observed: f64,
    pub forecast: f64,
}

/// A gauging station with the coordinates used to sample gridded forecasts.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Ordered as the configured severity labels.
    pub thresholds: Vec<SeverityThreshold>,
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// One observation instant × forecast source × lead time × member × severity.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Forecast file the member value was sampled from.
    pub source: String,
    pub lead_time: u32,
    pub station: String,
    pub member: String,
    pub forecasted_date: NaiveDate,
    pub severity: String,
    pub observed_event: bool,
    pub forecast_event: bool,
}

/// Outcome of looking up an observed value for a station and date.
///
/// Absence is an expected outcome, not an error: skill cannot be assessed
/// without ground truth, so the caller skips and counts it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObservationLookup {
    Found(f64),
    Missing,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a verification run.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerError {
    /// A file could not be read or written.
    Io { path: String, message: String },
    /// A file was readable but its contents could not be parsed.
    Parse { path: String, message: String },
    /// The run configuration is invalid.
    Config(String),
    /// A station listed in metadata has no column in the observed dataset.
    UnknownStation(String),
    /// The observed dataset has a column for a station missing from metadata.
    UnlistedStation(String),
    /// A forecast file has a different number of members than configured.
    EnsembleSizeMismatch { source: String, expected: usize, found: usize },
    /// A forecast field has no value at a station's coordinates or date.
    ForecastCoverage { source: String, station: String, date: NaiveDate },
    /// observed_event differs across members of the same forecast row.
    InconsistentObservation { source: String, station: String, date: NaiveDate, severity: String },
    /// The same member appears twice for one forecast row.
    DuplicateMember { source: String, station: String, member: String },
    /// A scoring worker stopped without returning its group.
    Scoring(String),
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerError::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
            TriggerError::Parse { path, message } => write!(f, "Parse error in {}: {}", path, message),
            TriggerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TriggerError::UnknownStation(station) => write!(
                f,
                "Station '{}' is listed in metadata but has no column in the observed data",
                station
            ),
            TriggerError::UnlistedStation(station) => write!(
                f,
                "Observed data has a column for '{}' which is not listed in station metadata",
                station
            ),
            TriggerError::EnsembleSizeMismatch { source, expected, found } => write!(
                f,
                "Ensemble size mismatch in {}: expected {} members, found {}",
                source, expected, found
            ),
            TriggerError::ForecastCoverage { source, station, date } => write!(
                f,
                "Forecast {} has no value for station '{}' on {}",
                source, station, date
            ),
            TriggerError::InconsistentObservation { source, station, date, severity } => write!(
                f,
                "Observed event varies across members in {} for '{}' on {} ({})",
                source, station, date, severity
            ),
            TriggerError::DuplicateMember { source, station, member } => write!(
                f,
                "Member {} appears more than once in {} for '{}'",
                member, source, station
            ),
            TriggerError::Scoring(msg) => write!(f, "Scoring error: {}", msg),
        }
    }
}

impl std::error::Error for TriggerError {}

impl TriggerError {
    /// True for errors caused by the input data rather than the
    /// configuration or the filesystem.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            TriggerError::UnknownStation(_)
                | TriggerError::UnlistedStation(_)
                | TriggerError::EnsembleSizeMismatch { .. }
                | TriggerError::ForecastCoverage { .. }
                | TriggerError::InconsistentObservation { .. }
                | TriggerError::DuplicateMember { .. }
        )
    }
}
