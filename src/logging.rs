/// Structured logging for the trigger verification pipeline
///
/// Provides context-rich logging with pipeline stage and station
/// identifiers, timestamps, and severity levels. Supports both console
/// output and file-based logging for batch runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::TriggerError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Observed,
    Forecast,
    Resolver,
    Aggregator,
    Sweep,
    Scoring,
    Selector,
    Export,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Metadata => write!(f, "META"),
            Stage::Observed => write!(f, "OBS"),
            Stage::Forecast => write!(f, "FCST"),
            Stage::Resolver => write!(f, "RESOLVE"),
            Stage::Aggregator => write!(f, "ENSEMBLE"),
            Stage::Sweep => write!(f, "SWEEP"),
            Stage::Scoring => write!(f, "SCORE"),
            Stage::Selector => write!(f, "SELECT"),
            Stage::Export => write!(f, "EXPORT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Input data contradicts itself or the station metadata
    DataIntegrity,
    /// The run configuration is unusable
    Configuration,
    /// Filesystem or parse failure
    Input,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::DataIntegrity => write!(f, "DATA INTEGRITY"),
            FailureType::Configuration => write!(f, "CONFIGURATION"),
            FailureType::Input => write!(f, "INPUT"),
        }
    }
}

/// Classify a run-aborting error for reporting
pub fn classify_failure(err: &TriggerError) -> FailureType {
    if err.is_integrity_error() {
        FailureType::DataIntegrity
    } else if matches!(err, TriggerError::Config(_)) {
        FailureType::Configuration
    } else {
        FailureType::Input
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut guard) = LOGGER.lock() {
            *guard = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, stage: Stage, station: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, stage, station_part, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, station_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, station_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", stage, station_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, stage: Stage, station: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, stage, station, message);
        }
    }
}

/// Log a general informational message
pub fn info(stage: Stage, station: Option<&str>, message: &str) {
    emit(LogLevel::Info, stage, station, message);
}

/// Log a warning message
pub fn warn(stage: Stage, station: Option<&str>, message: &str) {
    emit(LogLevel::Warning, stage, station, message);
}

/// Log an error message
pub fn error(stage: Stage, station: Option<&str>, message: &str) {
    emit(LogLevel::Error, stage, station, message);
}

/// Log a debug message
pub fn debug(stage: Stage, station: Option<&str>, message: &str) {
    emit(LogLevel::Debug, stage, station, message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a run-aborting failure with its classification
pub fn log_failure(stage: Stage, operation: &str, err: &TriggerError) {
    let message = format!("{} failed [{}]: {}", operation, classify_failure(err), err);
    error(stage, None, &message);
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log how many (source, lead time, station) combinations were skipped
/// for lack of an observation
pub fn log_skip_summary(total: usize, skipped: usize) {
    let message = format!(
        "Observation lookup: {}/{} combinations resolved, {} skipped (no observation)",
        total - skipped.min(total),
        total,
        skipped
    );

    if skipped == 0 {
        info(Stage::Resolver, None, &message);
    } else if skipped == total {
        error(Stage::Resolver, None, &message);
    } else {
        warn(Stage::Resolver, None, &message);
    }
}

/// Log how many skill groups produced a usable trigger
pub fn log_selection_summary(groups: usize, with_trigger: usize) {
    let message = format!(
        "Trigger selection: {}/{} groups have a feasible trigger, {} without",
        with_trigger,
        groups,
        groups - with_trigger.min(groups)
    );

    if with_trigger == 0 && groups > 0 {
        warn(Stage::Selector, None, &message);
    } else {
        info(Stage::Selector, None, &message);
    }
}
