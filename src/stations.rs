/// Station registry for the flood trigger pipeline.
///
/// Station metadata (name, LISFLOOD grid coordinates and per-severity
/// thresholds) is loaded once per run from the metadata table and is the
/// single source of truth for which stations are verified. Every other
/// input is checked against it, and the output tables list stations in
/// registry order.

use std::collections::HashSet;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::ingest::{
    csv_reader, header_index, parse_error, parse_required_finite, read_input, record_line,
    require_column,
};
use crate::model::{SeverityThreshold, Station, TriggerError};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All stations of one run, in metadata file order.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    /// Builds a registry, rejecting empty or duplicate station names.
    pub fn new(stations: Vec<Station>) -> Result<Self, TriggerError> {
        let mut seen = HashSet::new();
        for station in &stations {
            if station.name.is_empty() {
                return Err(TriggerError::Config("station name must not be empty".to_string()));
            }
            if !seen.insert(station.name.as_str()) {
                return Err(TriggerError::Config(format!(
                    "station '{}' is listed more than once in metadata",
                    station.name
                )));
            }
        }
        Ok(Self { stations })
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Looks up a station by name. Returns `None` if not found.
    pub fn find_station(&self, name: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_station(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.stations.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Metadata parsing
// ---------------------------------------------------------------------------

/// Parses the station metadata table.
///
/// Required columns are the configured station/latitude/longitude names
/// and, for every configured severity, `<observed_prefix><severity>` and
/// `<forecast_prefix><severity>`. Any other columns are ignored.
pub fn parse_station_metadata(
    text: &str,
    origin: &str,
    config: &PipelineConfig,
) -> Result<StationRegistry, TriggerError> {
    let mut reader = csv_reader(text);
    let (_, index) = header_index(&mut reader, origin)?;

    let name_col = require_column(&index, &config.metadata.station, origin)?;
    let lat_col = require_column(&index, &config.metadata.latitude, origin)?;
    let lon_col = require_column(&index, &config.metadata.longitude, origin)?;

    let mut severity_cols = Vec::with_capacity(config.severities.labels.len());
    for severity in &config.severities.labels {
        let obs_name = format!("{}{}", config.severities.observed_prefix, severity);
        let sim_name = format!("{}{}", config.severities.forecast_prefix, severity);
        let obs_col = require_column(&index, &obs_name, origin)?;
        let sim_col = require_column(&index, &sim_name, origin)?;
        severity_cols.push((severity.clone(), obs_name, obs_col, sim_name, sim_col));
    }

    let mut stations = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| parse_error(origin, e))?;
        let line = record_line(&record, i + 2);
        let field = |col: usize| record.get(col).unwrap_or("");

        let name = field(name_col).to_string();
        if name.is_empty() {
            return Err(TriggerError::Parse {
                path: origin.to_string(),
                message: format!("line {}: empty station name", line),
            });
        }

        let latitude = parse_required_finite(field(lat_col), origin, line, &config.metadata.latitude)?;
        let longitude = parse_required_finite(field(lon_col), origin, line, &config.metadata.longitude)?;

        let mut thresholds = Vec::with_capacity(severity_cols.len());
        for (severity, obs_name, obs_col, sim_name, sim_col) in &severity_cols {
            thresholds.push(SeverityThreshold {
                severity: severity.clone(),
                observed: parse_required_finite(field(*obs_col), origin, line, obs_name)?,
                forecast: parse_required_finite(field(*sim_col), origin, line, sim_name)?,
            });
        }

        stations.push(Station {
            name,
            latitude,
            longitude,
            thresholds,
        });
    }

    StationRegistry::new(stations)
}

/// Loads the station metadata table from disk.
pub fn load_station_metadata(path: &Path, config: &PipelineConfig) -> Result<StationRegistry, TriggerError> {
    let text = read_input(path)?;
    parse_station_metadata(&text, &path.display().to_string(), config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
