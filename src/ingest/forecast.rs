/// Ensemble forecast fields, one per issue date.
///
/// Each file holds a single forecast run: one row per (day, grid cell)
/// with one discharge value per ensemble member. Member columns are
/// recognised by name prefix (`dis24_0` .. `dis24_10` for GloFAS) and
/// their count is checked against the configured ensemble size, so a file
/// with a dropped member fails loudly instead of skewing every
/// probability computed from it.
///
/// Grid cells are matched on coordinates rounded to micro-degrees, which
/// is well below LISFLOOD grid spacing and absorbs float formatting noise.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::ingest::{
    csv_reader, header_index, parse_error, parse_required_date, parse_required_f64, parse_required_finite, read_input,
    record_line, require_column,
};
use crate::model::TriggerError;

pub const TIME_COLUMN: &str = "time";
pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "lon";

// ---------------------------------------------------------------------------
// Grid cells
// ---------------------------------------------------------------------------

/// A grid cell keyed by coordinates in micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPoint {
    lat_micro: i64,
    lon_micro: i64,
}

impl GridPoint {
    pub fn from_coords(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_micro: (latitude * 1e6).round() as i64,
            lon_micro: (longitude * 1e6).round() as i64,
        }
    }
}

// ---------------------------------------------------------------------------
// Forecast field
// ---------------------------------------------------------------------------

/// One forecast run: member values per grid cell and day.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastField {
    source: String,
    issue_date: NaiveDate,
    members: Vec<String>,
    values: HashMap<(GridPoint, NaiveDate), Vec<f64>>,
}

impl ForecastField {
    /// Identifier of the run (the file name).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// First time step of the run.
    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    /// Member names in column order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Member values at a grid cell on a day, in member order.
    pub fn sample(&self, latitude: f64, longitude: f64, date: NaiveDate) -> Option<&[f64]> {
        self.values
            .get(&(GridPoint::from_coords(latitude, longitude), date))
            .map(|v| v.as_slice())
    }
}

/// Parses one forecast file.
///
/// `expected_members` is the configured ensemble size; any other member
/// count is an `EnsembleSizeMismatch`. A blank member cell is read as NaN,
/// which compares false against every threshold.
pub fn parse_forecast(
    text: &str,
    source: &str,
    member_prefix: &str,
    expected_members: usize,
) -> Result<ForecastField, TriggerError> {
    let mut reader = csv_reader(text);
    let (names, index) = header_index(&mut reader, source)?;
    let time_col = require_column(&index, TIME_COLUMN, source)?;
    let lat_col = require_column(&index, LAT_COLUMN, source)?;
    let lon_col = require_column(&index, LON_COLUMN, source)?;

    let member_cols: Vec<usize> = (0..names.len())
        .filter(|&i| names[i].starts_with(member_prefix))
        .collect();
    if member_cols.len() != expected_members {
        return Err(TriggerError::EnsembleSizeMismatch {
            source: source.to_string(),
            expected: expected_members,
            found: member_cols.len(),
        });
    }
    let members: Vec<String> = member_cols.iter().map(|&i| names[i].clone()).collect();

    let mut values = HashMap::new();
    let mut issue_date: Option<NaiveDate> = None;
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| parse_error(source, e))?;
        let line = record_line(&record, i + 2);
        let field = |col: usize| record.get(col).unwrap_or("");

        let date = parse_required_date(field(time_col), source, line, TIME_COLUMN)?;
        let lat = parse_required_finite(field(lat_col), source, line, LAT_COLUMN)?;
        let lon = parse_required_finite(field(lon_col), source, line, LON_COLUMN)?;

        let mut row = Vec::with_capacity(member_cols.len());
        for &col in &member_cols {
            let cell = field(col).trim();
            if cell.is_empty() {
                row.push(f64::NAN);
            } else {
                row.push(parse_required_f64(cell, source, line, &names[col])?);
            }
        }

        if values.insert((GridPoint::from_coords(lat, lon), date), row).is_some() {
            return Err(TriggerError::Parse {
                path: source.to_string(),
                message: format!("line {}: duplicate row for ({}, {}) on {}", line, lat, lon, date),
            });
        }
        issue_date = Some(issue_date.map_or(date, |d| d.min(date)));
    }

    let issue_date = issue_date.ok_or_else(|| TriggerError::Parse {
        path: source.to_string(),
        message: "forecast file has no rows".to_string(),
    })?;

    Ok(ForecastField {
        source: source.to_string(),
        issue_date,
        members,
        values,
    })
}

/// Loads one forecast file; the source id is the file name.
pub fn load_forecast(path: &Path, config: &PipelineConfig) -> Result<ForecastField, TriggerError> {
    let text = read_input(path)?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_forecast(&text, &source, &config.member_prefix, config.ensemble_size)
}

/// Lists `*.csv` forecast files in a directory, sorted by file name.
pub fn forecast_files(dir: &Path) -> Result<Vec<PathBuf>, TriggerError> {
    let io_error = |e: std::io::Error| TriggerError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every forecast file in a directory, in file name order.
pub fn load_forecasts(dir: &Path, config: &PipelineConfig) -> Result<Vec<ForecastField>, TriggerError> {
    forecast_files(dir)?
        .iter()
        .map(|path| load_forecast(path, config))
        .collect()
}
