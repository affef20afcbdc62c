/// Verification analysis, in pipeline order.
///
/// Submodules:
/// - `events`      — resolves forecasts and observations into per-member event pairs
/// - `ensemble`    — collapses members into a probability of detection
/// - `sweep`       — threshold grid, lead-time buckets, triggered flags per threshold
/// - `groupings`   — partitions swept rows into (station, bucket, severity) groups
/// - `contingency` — contingency tables and skill scores per group and threshold
/// - `triggers`    — feasibility filter and best-threshold selection

pub mod contingency;
pub mod ensemble;
pub mod events;
pub mod groupings;
pub mod sweep;
pub mod triggers;
