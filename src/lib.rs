/// flotrig: flood forecast verification and trigger selection.
///
/// # Module structure
///
/// ```text
/// flotrig
/// ├── model       — shared data types (Station, EventRecord, TriggerError, …)
/// ├── config      — run configuration loader (flotrig.toml)
/// ├── logging     — stage-tagged console/file logging
/// ├── stations    — station registry built from the metadata table
/// ├── ingest
/// │   ├── observed — date-indexed gauge observations
/// │   ├── forecast — ensemble forecast fields, one per issue date
/// │   └── fixtures (test only) — representative input files
/// ├── analysis
/// │   ├── events      — observed/forecast event resolution per member
/// │   ├── ensemble    — probability of detection per forecast row
/// │   ├── sweep       — threshold grid and lead-time buckets
/// │   ├── groupings   — (station, bucket, severity) skill groups
/// │   ├── contingency — contingency tables and skill scores
/// │   └── triggers    — feasibility filter and trigger selection
/// ├── export      — trigger table, metrics table, run summary
/// └── pipeline    — stage wiring for one run
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod stations;
