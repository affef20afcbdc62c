/// Observed gauge series: a date-indexed table with one column per station.
///
/// Values are in physical units (discharge, m³/s). A blank or non-finite
/// cell means the gauge has no reading for that day. Station columns are
/// checked against the registry before any lookups happen so a mismatch
/// between metadata and data stops the run instead of silently dropping
/// a station.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::ingest::{
    csv_reader, header_index, parse_error, parse_required_date, read_input, record_line,
    require_column,
};
use crate::model::{ObservationLookup, TriggerError};
use crate::stations::StationRegistry;

/// Name of the date column in the observed table.
pub const DATE_COLUMN: &str = "date";

/// Observed values for every station, keyed by date.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSeries {
    stations: Vec<String>,
    columns: HashMap<String, usize>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl ObservedSeries {
    /// Station names in column order.
    pub fn station_names(&self) -> &[String] {
        &self.stations
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a station's observed value on an exact date.
    ///
    /// A station without a column is an integrity error; a date without a
    /// row, or an empty cell, is `Missing`.
    pub fn lookup(&self, station: &str, date: NaiveDate) -> Result<ObservationLookup, TriggerError> {
        let col = *self
            .columns
            .get(station)
            .ok_or_else(|| TriggerError::UnknownStation(station.to_string()))?;

        Ok(match self.rows.get(&date).and_then(|row| row[col]) {
            Some(value) => ObservationLookup::Found(value),
            None => ObservationLookup::Missing,
        })
    }

    /// Fails on any station present on one side only.
    pub fn check_against(&self, registry: &StationRegistry) -> Result<(), TriggerError> {
        for station in registry.stations() {
            if !self.columns.contains_key(&station.name) {
                return Err(TriggerError::UnknownStation(station.name.clone()));
            }
        }
        for name in &self.stations {
            if !registry.contains(name) {
                return Err(TriggerError::UnlistedStation(name.clone()));
            }
        }
        Ok(())
    }
}

/// Parses an observed table.
///
/// If the same date appears on more than one row, the last one wins.
pub fn parse_observed(text: &str, origin: &str) -> Result<ObservedSeries, TriggerError> {
    let mut reader = csv_reader(text);
    let (names, index) = header_index(&mut reader, origin)?;
    let date_col = require_column(&index, DATE_COLUMN, origin)?;

    // Column position in the file -> position in each stored row.
    let station_positions: Vec<usize> = (0..names.len()).filter(|&i| i != date_col).collect();
    let stations: Vec<String> = station_positions.iter().map(|&i| names[i].clone()).collect();
    let columns: HashMap<String, usize> = stations
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();
    if columns.len() != stations.len() {
        return Err(TriggerError::Parse {
            path: origin.to_string(),
            message: "duplicate station column".to_string(),
        });
    }

    let mut rows = BTreeMap::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| parse_error(origin, e))?;
        let line = record_line(&record, i + 2);
        let date = parse_required_date(record.get(date_col).unwrap_or(""), origin, line, DATE_COLUMN)?;

        let mut values = Vec::with_capacity(station_positions.len());
        for &pos in &station_positions {
            let cell = record.get(pos).unwrap_or("");
            values.push(parse_observation(cell, origin, line, &names[pos])?);
        }
        rows.insert(date, values);
    }

    Ok(ObservedSeries { stations, columns, rows })
}

/// Loads an observed table from disk.
pub fn load_observed(path: &Path) -> Result<ObservedSeries, TriggerError> {
    let text = read_input(path)?;
    parse_observed(&text, &path.display().to_string())
}

fn parse_observation(cell: &str, origin: &str, line: usize, column: &str) -> Result<Option<f64>, TriggerError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    let value = cell.parse::<f64>().map_err(|_| TriggerError::Parse {
        path: origin.to_string(),
        message: format!("line {}: column '{}' has non-numeric value '{}'", line, column, cell),
    })?;
    // NaN and infinities are gaps in the record, not readings.
    Ok(value.is_finite().then_some(value))
}
