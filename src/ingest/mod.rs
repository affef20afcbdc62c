/// Flat-file ingest for the verification pipeline.
///
/// Each input has its own file under ingest/:
///   - `observed` — date-indexed gauge observations, one column per station
///   - `forecast` — one ensemble forecast field per issue date
///   - `fixtures` (test only) — representative input payloads
///
/// Station metadata lives in `stations` since it doubles as the registry.
/// The helpers below are shared by every loader: they read a whole file,
/// build a header index, and turn cell text into typed values with the
/// file and row named in any error.

pub mod forecast;
pub mod observed;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::model::TriggerError;

/// Reads a whole input file, naming the path in the error.
pub fn read_input(path: &Path) -> Result<String, TriggerError> {
    fs::read_to_string(path).map_err(|e| TriggerError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Builds a comma-delimited reader over in-memory text.
pub(crate) fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

/// Maps header names to column positions.
pub(crate) fn header_index(
    reader: &mut csv::Reader<&[u8]>,
    origin: &str,
) -> Result<(Vec<String>, HashMap<String, usize>), TriggerError> {
    let headers = reader.headers().map_err(|e| parse_error(origin, e))?;
    let names: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let index = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();
    Ok((names, index))
}

/// Looks up a required column, failing with the column name.
pub(crate) fn require_column(
    index: &HashMap<String, usize>,
    column: &str,
    origin: &str,
) -> Result<usize, TriggerError> {
    index.get(column).copied().ok_or_else(|| TriggerError::Parse {
        path: origin.to_string(),
        message: format!("missing required column '{}'", column),
    })
}

/// Parses a date cell. Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS`
/// (timestamps written by dataframe exports); the time part is dropped.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parses a numeric cell that must be present.
pub(crate) fn parse_required_f64(
    text: &str,
    origin: &str,
    line: usize,
    column: &str,
) -> Result<f64, TriggerError> {
    text.trim().parse::<f64>().map_err(|_| TriggerError::Parse {
        path: origin.to_string(),
        message: format!("line {}: column '{}' has non-numeric value '{}'", line, column, text),
    })
}

/// Like `parse_required_f64`, but NaN and infinities are errors. Used for
/// coordinates and thresholds, where a non-finite value can never match.
pub(crate) fn parse_required_finite(
    text: &str,
    origin: &str,
    line: usize,
    column: &str,
) -> Result<f64, TriggerError> {
    let value = parse_required_f64(text, origin, line, column)?;
    if !value.is_finite() {
        return Err(TriggerError::Parse {
            path: origin.to_string(),
            message: format!("line {}: column '{}' has non-finite value '{}'", line, column, text),
        });
    }
    Ok(value)
}

/// Parses a date cell that must be present.
pub(crate) fn parse_required_date(
    text: &str,
    origin: &str,
    line: usize,
    column: &str,
) -> Result<NaiveDate, TriggerError> {
    parse_date(text).ok_or_else(|| TriggerError::Parse {
        path: origin.to_string(),
        message: format!("line {}: column '{}' has invalid date '{}'", line, column, text),
    })
}

pub(crate) fn parse_error(origin: &str, err: csv::Error) -> TriggerError {
    TriggerError::Parse {
        path: origin.to_string(),
        message: err.to_string(),
    }
}

/// Line number of a record for error messages (header is line 1).
pub(crate) fn record_line(record: &csv::StringRecord, fallback: usize) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(fallback)
}
