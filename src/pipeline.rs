/// Pipeline driver for one verification run.
///
/// This module wires the stages together:
/// 1. Loads station metadata, observed series and forecast fields
/// 2. Resolves per-member events (skipping dates without observations)
/// 3. Aggregates the ensemble into probabilities of detection
/// 4. Sweeps the threshold grid and buckets rows by lead time
/// 5. Scores every (station, bucket, severity) group
/// 6. Selects a trigger per group and writes the outputs
///
/// Any integrity error aborts the run before anything is written.

use std::path::Path;
use std::sync::Arc;

use crate::analysis::contingency::{MetricsTable, score_groups};
use crate::analysis::ensemble::aggregate_ensemble;
use crate::analysis::events::{SkippedObservation, resolve_events};
use crate::analysis::groupings::group_by_skill_group;
use crate::analysis::sweep::{LeadTimeBuckets, ThresholdGrid, sweep_thresholds};
use crate::analysis::triggers::{FeasibilityBounds, TriggerSelection, select_triggers};
use crate::config::PipelineConfig;
use crate::export::{self, OutputFiles, RunSummary};
use crate::ingest::forecast::{ForecastField, load_forecasts};
use crate::ingest::observed::{ObservedSeries, load_observed};
use crate::logging::{self, Stage};
use crate::model::TriggerError;
use crate::stations::{StationRegistry, load_station_metadata};

// ---------------------------------------------------------------------------
// Inputs and outcome
// ---------------------------------------------------------------------------

/// Everything read from disk for a run.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub registry: StationRegistry,
    pub observed: ObservedSeries,
    pub forecasts: Vec<ForecastField>,
}

/// Result of a run, before anything is written.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub selections: Vec<TriggerSelection>,
    pub metrics: MetricsTable,
    pub skipped: Vec<SkippedObservation>,
    pub summary: RunSummary,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validates the configuration up front so a bad grid or bucket layout
    /// fails before any file is read.
    pub fn new(config: PipelineConfig) -> Result<Self, TriggerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads metadata, observations and every forecast file.
    pub fn load_inputs(&self) -> Result<PipelineInputs, TriggerError> {
        let paths = &self.config.paths;

        let registry = load_station_metadata(&paths.station_metadata, &self.config)?;
        logging::info(
            Stage::Metadata,
            None,
            &format!("{} stations from {}", registry.len(), paths.station_metadata.display()),
        );

        let observed = load_observed(&paths.observed)?;
        let period = match (observed.first_date(), observed.last_date()) {
            (Some(first), Some(last)) => format!("{} to {}", first, last),
            _ => "no dates".to_string(),
        };
        logging::info(
            Stage::Observed,
            None,
            &format!(
                "{} dates ({}) for {} stations from {}",
                observed.len(),
                period,
                observed.station_names().len(),
                paths.observed.display()
            ),
        );

        let forecasts = load_forecasts(&paths.forecast_dir, &self.config)?;
        if forecasts.is_empty() {
            logging::warn(
                Stage::Forecast,
                None,
                &format!("no forecast files in {}", paths.forecast_dir.display()),
            );
        } else {
            logging::info(
                Stage::Forecast,
                None,
                &format!("{} forecast runs from {}", forecasts.len(), paths.forecast_dir.display()),
            );
        }

        Ok(PipelineInputs { registry, observed, forecasts })
    }

    /// Runs every stage on loaded inputs.
    pub fn run(&self, inputs: &PipelineInputs) -> Result<RunOutcome, TriggerError> {
        let config = &self.config;

        let resolution = resolve_events(
            &inputs.forecasts,
            &inputs.observed,
            &inputs.registry,
            config.lead_time_min..=config.lead_time_max,
        )?;
        logging::log_skip_summary(resolution.combinations, resolution.skipped.len());
        logging::info(
            Stage::Resolver,
            None,
            &format!("{} member events resolved", resolution.events.len()),
        );

        let rows = aggregate_ensemble(&resolution.events, config.ensemble_size)?;
        let probability_rows = rows.len();
        logging::info(
            Stage::Aggregator,
            None,
            &format!("{} probability rows (ensemble of {})", probability_rows, config.ensemble_size),
        );

        let grid = ThresholdGrid::from_config(&config.thresholds)?;
        let buckets = LeadTimeBuckets::from_config(&config.lead_time_buckets)?;
        let sweep = sweep_thresholds(rows, &grid, &buckets)?;
        logging::info(
            Stage::Sweep,
            None,
            &format!("{} thresholds x {} lead-time buckets", grid.len(), buckets.labels().len()),
        );

        let groups = group_by_skill_group(&sweep, &inputs.registry, &config.severities.labels)?;
        let group_count = groups.len();
        let metrics = score_groups(Arc::new(sweep), groups, config.workers)?;
        logging::info(
            Stage::Scoring,
            None,
            &format!("{} skill groups scored on {} worker(s)", group_count, config.workers),
        );

        let bounds = FeasibilityBounds::from_config(&config.selection);
        let selections = select_triggers(&metrics, &bounds, config.selection.rank_by);
        let with_trigger = selections.iter().filter(|s| s.trigger.is_some()).count();
        logging::log_selection_summary(selections.len(), with_trigger);

        let summary = RunSummary {
            stations: inputs.registry.len(),
            forecast_sources: inputs.forecasts.len(),
            combinations: resolution.combinations,
            skipped_observations: resolution.skipped.len(),
            events: resolution.events.len(),
            probability_rows,
            thresholds: grid.len(),
            rank_by: config.selection.rank_by,
            groups: selections.len(),
            groups_with_trigger: with_trigger,
            groups_without_trigger: selections.len() - with_trigger,
        };

        Ok(RunOutcome {
            selections,
            metrics,
            skipped: resolution.skipped,
            summary,
        })
    }

    /// Writes the outcome into `dir` (the configured output directory
    /// unless overridden).
    pub fn write_outputs(&self, outcome: &RunOutcome, dir: Option<&Path>) -> Result<OutputFiles, TriggerError> {
        let dir = dir.unwrap_or(self.config.paths.output_dir.as_path());
        export::write_outputs(dir, &self.config.paths, &outcome.selections, &outcome.metrics, &outcome.summary)
    }

    /// Load, run and write in one call.
    pub fn execute(&self, output_dir: Option<&Path>) -> Result<(RunOutcome, OutputFiles), TriggerError> {
        let inputs = self.load_inputs()?;
        let outcome = self.run(&inputs)?;
        let files = self.write_outputs(&outcome, output_dir)?;
        Ok((outcome, files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use crate::ingest::forecast::parse_forecast;
    use crate::ingest::observed::parse_observed;
    use crate::stations::parse_station_metadata;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.ensemble_size = 3;
        config.lead_time_max = 2;
        config
    }

    fn inputs(config: &PipelineConfig) -> PipelineInputs {
        PipelineInputs {
            registry: parse_station_metadata(fixture_metadata_csv(), "metadata.csv", config).unwrap(),
            observed: parse_observed(fixture_observed_csv(), "observed.csv").unwrap(),
            forecasts: vec![parse_forecast(fixture_forecast_csv(), "f.csv", "dis24_", 3).unwrap()],
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let mut config = config();
        config.workers = 0;
        assert!(matches!(Pipeline::new(config), Err(TriggerError::Config(_))));
    }

    #[test]
    fn test_run_summary_counts() {
        let pipeline = Pipeline::new(config()).unwrap();
        let outcome = pipeline.run(&inputs(pipeline.config())).unwrap();
        let s = &outcome.summary;

        assert_eq!(s.stations, 2);
        assert_eq!(s.forecast_sources, 1);
        assert_eq!(s.combinations, 6);
        assert_eq!(s.skipped_observations, 1);
        assert_eq!(s.events, 45);
        // 5 resolved (station, lead) pairs x 3 severities.
        assert_eq!(s.probability_rows, 15);
        assert_eq!(s.thresholds, 99);
        // 2 stations x 10 buckets x 3 severities.
        assert_eq!(s.groups, 60);
        assert_eq!(s.groups_with_trigger + s.groups_without_trigger, 60);
    }

    #[test]
    fn test_selections_follow_metrics_order() {
        let pipeline = Pipeline::new(config()).unwrap();
        let outcome = pipeline.run(&inputs(pipeline.config())).unwrap();
        assert_eq!(outcome.selections.len(), outcome.metrics.groups.len());
        for (selection, group) in outcome.selections.iter().zip(&outcome.metrics.groups) {
            assert_eq!(selection.key, group.key);
        }
    }

    #[test]
    fn test_chokwe_bankfull_trigger() {
        // Chokwe bankfull, leads 0-2: observed 1600/2600/1400 against 1500
        // gives events on days 0 and 1. Members above 1200: day 0 2/3,
        // day 1 3/3, day 2 1/3.
        //   t <= 0.33: hits 2, FA 1, CSI 2/3
        //   0.34..0.66: hits 2, FA 0, CSI 1
        //   t >= 0.67: hits 1, misses 1, CSI 0.5
        // The first threshold reaching CSI 1 wins.
        let pipeline = Pipeline::new(config()).unwrap();
        let outcome = pipeline.run(&inputs(pipeline.config())).unwrap();
        let selection = outcome
            .selections
            .iter()
            .find(|s| s.key.station == "Chokwe" && s.key.bucket == "0-5" && s.key.severity == "bankfull")
            .unwrap();
        let trigger = selection.trigger.as_ref().expect("Chokwe bankfull should have a trigger");
        assert_eq!(trigger.value, 0.34);
    }

    #[test]
    fn test_empty_buckets_have_no_trigger() {
        let pipeline = Pipeline::new(config()).unwrap();
        let outcome = pipeline.run(&inputs(pipeline.config())).unwrap();
        assert!(
            outcome
                .selections
                .iter()
                .filter(|s| s.key.bucket == "6-10")
                .all(|s| s.trigger.is_none())
        );
    }

    #[test]
    fn test_zero_hit_rate_minimum_leaves_empty_buckets_without_trigger() {
        let mut config = config();
        config.selection.hit_rate_min = 0.0;
        let pipeline = Pipeline::new(config).unwrap();
        let outcome = pipeline.run(&inputs(pipeline.config())).unwrap();
        let empty: Vec<_> = outcome.selections.iter().filter(|s| s.key.bucket == "41-46").collect();
        assert!(!empty.is_empty());
        assert!(
            empty.iter().all(|s| s.trigger.is_none()),
            "buckets without rows should have no trigger"
        );
        for (selection, group) in outcome.selections.iter().zip(&outcome.metrics.groups) {
            if group.row_count == 0 {
                assert!(selection.trigger.is_none(), "{:?} has no rows", group.key);
            }
        }
    }
}
