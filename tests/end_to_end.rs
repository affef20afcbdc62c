/// End-to-end verification runs over small on-disk scenarios.
///
/// Three stations, an 11-member ensemble issued once, lead times 0-2 and a
/// single "moderate" severity (observed and forecast thresholds both 100):
///
///   Station A: event on day 0 only. 8/11 members exceed on day 0,
///              7/11 on days 1 and 2, so only thresholds above 7/11 and
///              up to 8/11 avoid the two false alarms.
///   Station B: event every day, no member ever exceeds.
///   Station C: no event, every member exceeds every day.
///
/// B and C can never reach the hit-rate floor, so they get no trigger.

use std::fs;
use std::path::{Path, PathBuf};

use flotrig::config::PipelineConfig;
use flotrig::model::TriggerError;
use flotrig::pipeline::Pipeline;
use tempfile::TempDir;

const MEMBERS: usize = 11;

struct Scenario {
    dir: TempDir,
    config: PipelineConfig,
}

impl Scenario {
    fn output_dir(&self) -> PathBuf {
        self.config.paths.output_dir.clone()
    }

    fn read_output(&self, file: &str) -> String {
        fs::read_to_string(self.output_dir().join(file)).expect("output file should exist")
    }

    fn data(&self, file: &str) -> PathBuf {
        self.dir.path().join("data").join(file)
    }
}

fn metadata_csv() -> String {
    "station name,lisflood_x,lisflood_y,obs_moderate,glofas_moderate
A,30.05,-20.05,100,100
B,31.05,-21.05,100,100
C,32.05,-22.05,100,100
"
    .to_string()
}

fn observed_csv() -> String {
    "date,A,B,C
2022-03-01,150,150,50
2022-03-02,50,150,50
2022-03-03,50,150,50
"
    .to_string()
}

/// One forecast row: `exceeding` members at 200, the rest at 10.
fn forecast_row(date: &str, lat: f64, lon: f64, exceeding: usize, members: usize) -> String {
    let values: Vec<&str> = (0..members).map(|m| if m < exceeding { "200" } else { "10" }).collect();
    format!("{},{},{},{}\n", date, lat, lon, values.join(","))
}

fn forecast_csv(members: usize) -> String {
    let header: Vec<String> = (0..members).map(|m| format!("dis24_{}", m)).collect();
    let mut text = format!("time,lat,lon,{}\n", header.join(","));
    let a_exceeding = [8, 7, 7];
    for (day, date) in ["2022-03-01", "2022-03-02", "2022-03-03"].iter().enumerate() {
        text += &forecast_row(date, -20.05, 30.05, a_exceeding[day].min(members), members);
        text += &forecast_row(date, -21.05, 31.05, 0, members);
        text += &forecast_row(date, -22.05, 32.05, members, members);
    }
    text
}

fn write_inputs(root: &Path, observed: &str, forecast: &str) {
    let data = root.join("data");
    fs::create_dir_all(data.join("forecasts")).unwrap();
    fs::write(data.join("metadata.csv"), metadata_csv()).unwrap();
    fs::write(data.join("observed.csv"), observed).unwrap();
    fs::write(data.join("forecasts").join("2022-03-01.csv"), forecast).unwrap();
}

fn scenario_config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.ensemble_size = MEMBERS;
    config.lead_time_min = 0;
    config.lead_time_max = 2;
    config.severities.labels = vec!["moderate".to_string()];
    // Decile grid: 0.7 is the only point between 7/11 and 8/11.
    config.thresholds.start = 0.1;
    config.thresholds.stop = 0.9;
    config.thresholds.step = 0.1;
    config.paths.station_metadata = root.join("data/metadata.csv");
    config.paths.observed = root.join("data/observed.csv");
    config.paths.forecast_dir = root.join("data/forecasts");
    config.paths.output_dir = root.join("outputs");
    config
}

fn scenario_with(observed: &str, forecast: &str) -> Scenario {
    let dir = tempfile::tempdir().expect("temp dir");
    write_inputs(dir.path(), observed, forecast);
    let config = scenario_config(dir.path());
    Scenario { dir, config }
}

fn scenario() -> Scenario {
    scenario_with(&observed_csv(), &forecast_csv(MEMBERS))
}

/// best_trigger cell for a (station, bucket) row of the trigger table.
fn trigger_cell(triggers: &str, station: &str, bucket: &str) -> String {
    let mut reader = csv::Reader::from_reader(triggers.as_bytes());
    for record in reader.records() {
        let record = record.expect("trigger table should be valid csv");
        if &record[0] == station && &record[1] == bucket && &record[2] == "moderate" {
            return record[3].to_string();
        }
    }
    panic!("no trigger row for {} {}", station, bucket);
}

// ---------------------------------------------------------------------------
// Trigger selection
// ---------------------------------------------------------------------------

#[test]
fn test_station_a_selects_seventy_percent() {
    let s = scenario();
    let pipeline = Pipeline::new(s.config.clone()).unwrap();
    let (outcome, _) = pipeline.execute(None).expect("scenario should run");

    let selection = outcome
        .selections
        .iter()
        .find(|sel| sel.key.station == "A" && sel.key.bucket == "0-5")
        .expect("A 0-5 should be in the output");
    let trigger = selection.trigger.as_ref().expect("A should have a trigger");
    assert_eq!(trigger.value, 0.7);
    assert_eq!(trigger.label, "threshold_0.7");

    let triggers = s.read_output("flood_triggers.csv");
    let cell = trigger_cell(&triggers, "A", "0-5");
    assert_eq!(cell.parse::<f64>().unwrap(), 0.7, "written value was '{}'", cell);
}

#[test]
fn test_stations_without_skill_have_no_trigger() {
    let s = scenario();
    Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();
    let triggers = s.read_output("flood_triggers.csv");

    assert_eq!(trigger_cell(&triggers, "B", "0-5"), "");
    assert_eq!(trigger_cell(&triggers, "C", "0-5"), "");
}

#[test]
fn test_aggregate_bucket_matches_only_populated_bin() {
    let s = scenario();
    Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();
    let triggers = s.read_output("flood_triggers.csv");

    // All leads fall in 0-5, so the all-lead-times row agrees with it.
    assert_eq!(trigger_cell(&triggers, "A", "0-46"), trigger_cell(&triggers, "A", "0-5"));
    // Bins without rows are listed with no trigger.
    assert_eq!(trigger_cell(&triggers, "A", "41-46"), "");
}

#[test]
fn test_trigger_table_is_dense_and_ordered() {
    let s = scenario();
    Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();
    let triggers = s.read_output("flood_triggers.csv");
    let lines: Vec<&str> = triggers.lines().collect();

    assert_eq!(lines[0], "station_name,lead_time_category,threshold,best_trigger");
    // 3 stations x (9 bins + aggregate) x 1 severity.
    assert_eq!(lines.len(), 1 + 30);
    assert!(lines[1].starts_with("A,0-5,moderate,"));
    assert!(lines[10].starts_with("A,0-46,moderate,"));
    assert!(lines[11].starts_with("B,0-5,moderate,"));
    assert!(lines[30].starts_with("C,0-46,moderate,"));
}

#[test]
fn test_reference_grid_picks_first_point_above_seven_elevenths() {
    let mut s = scenario();
    s.config.thresholds.start = 0.01;
    s.config.thresholds.stop = 0.99;
    s.config.thresholds.step = 0.01;
    let (outcome, _) = Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();

    let trigger = outcome
        .selections
        .iter()
        .find(|sel| sel.key.station == "A" && sel.key.bucket == "0-5")
        .and_then(|sel| sel.trigger.clone())
        .expect("A should have a trigger");
    // 0.64..=0.72 all separate 8/11 from 7/11; ties keep the lowest.
    assert_eq!(trigger.value, 0.64);
    assert_eq!(trigger_cell(&s.read_output("flood_triggers.csv"), "A", "0-5"), "0.64");
}

// ---------------------------------------------------------------------------
// Metrics and summary
// ---------------------------------------------------------------------------

#[test]
fn test_metrics_table_for_station_a() {
    let s = scenario();
    Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();
    let metrics = s.read_output("flood_metrics.csv");
    let mut reader = csv::Reader::from_reader(metrics.as_bytes());

    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[3], "metric");
    assert_eq!(&headers[4], "threshold_0.1");
    assert_eq!(&headers[10], "threshold_0.7");

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .map(|r| r.unwrap())
        .filter(|r| &r[0] == "A" && &r[1] == "0-5")
        .collect();
    let metric = |name: &str| rows.iter().find(|r| &r[3] == name).expect("metric row").clone();

    // At 0.6 all three rows trigger: one hit, two false alarms.
    assert_eq!(&metric("hits")[9], "1");
    assert_eq!(&metric("false alarms")[9], "2");
    // At 0.7 only the day-0 row triggers.
    assert_eq!(&metric("false alarms")[10], "0");
    assert_eq!(&metric("correct rejections")[10], "2");
    assert_eq!(&metric("csi")[10], "1");
    // At 0.8 nothing triggers.
    assert_eq!(&metric("misses")[11], "1");
    assert_eq!(&metric("hit rates")[11], "0");
}

#[test]
fn test_run_summary_json() {
    let s = scenario();
    Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&s.read_output("run_summary.json")).unwrap();

    assert_eq!(summary["stations"], 3);
    assert_eq!(summary["forecast_sources"], 1);
    assert_eq!(summary["combinations"], 9);
    assert_eq!(summary["skipped_observations"], 0);
    assert_eq!(summary["events"], 9 * MEMBERS);
    assert_eq!(summary["probability_rows"], 9);
    assert_eq!(summary["groups"], 30);
    // A's 0-5 and 0-46 rows.
    assert_eq!(summary["groups_with_trigger"], 2);
    assert_eq!(summary["groups_without_trigger"], 28);
}

#[test]
fn test_missing_observation_is_skipped_and_counted() {
    let observed = "date,A,B,C
2022-03-01,150,150,50
2022-03-02,50,,50
2022-03-03,50,150,50
";
    let s = scenario_with(observed, &forecast_csv(MEMBERS));
    let (outcome, _) = Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap();

    assert_eq!(outcome.summary.skipped_observations, 1);
    assert_eq!(outcome.skipped[0].station, "B");
    assert_eq!(outcome.skipped[0].lead_time, 1);
    assert_eq!(outcome.summary.probability_rows, 8);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn test_rerun_is_byte_identical() {
    let s = scenario();
    let pipeline = Pipeline::new(s.config.clone()).unwrap();

    pipeline.execute(None).unwrap();
    let first: Vec<String> = ["flood_triggers.csv", "flood_metrics.csv", "run_summary.json"]
        .iter()
        .map(|f| s.read_output(f))
        .collect();

    pipeline.execute(None).unwrap();
    let second: Vec<String> = ["flood_triggers.csv", "flood_metrics.csv", "run_summary.json"]
        .iter()
        .map(|f| s.read_output(f))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn test_worker_count_does_not_change_output() {
    let s = scenario();
    let sequential_dir = s.dir.path().join("sequential");
    let parallel_dir = s.dir.path().join("parallel");

    let mut config = s.config.clone();
    config.workers = 1;
    Pipeline::new(config.clone()).unwrap().execute(Some(&sequential_dir)).unwrap();
    config.workers = 4;
    Pipeline::new(config).unwrap().execute(Some(&parallel_dir)).unwrap();

    for file in ["flood_triggers.csv", "flood_metrics.csv", "run_summary.json"] {
        let a = fs::read(sequential_dir.join(file)).unwrap();
        let b = fs::read(parallel_dir.join(file)).unwrap();
        assert_eq!(a, b, "{} differs between worker counts", file);
    }
}

// ---------------------------------------------------------------------------
// Integrity failures
// ---------------------------------------------------------------------------

#[test]
fn test_station_missing_from_observed_fails() {
    let observed = "date,A,B
2022-03-01,150,150
";
    let s = scenario_with(observed, &forecast_csv(MEMBERS));
    let err = Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap_err();
    assert_eq!(err, TriggerError::UnknownStation("C".to_string()));
    assert!(!s.output_dir().exists(), "nothing is written on failure");
}

#[test]
fn test_ensemble_size_mismatch_fails() {
    let s = scenario_with(&observed_csv(), &forecast_csv(MEMBERS - 1));
    let err = Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap_err();
    assert!(matches!(
        err,
        TriggerError::EnsembleSizeMismatch { expected: 11, found: 10, .. }
    ));
}

#[test]
fn test_missing_metadata_file_is_io_error() {
    let s = scenario();
    fs::remove_file(s.data("metadata.csv")).unwrap();
    let err = Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap_err();
    assert!(matches!(err, TriggerError::Io { .. }));
}

#[test]
fn test_forecast_grid_gap_fails() {
    let mut forecast = forecast_csv(MEMBERS);
    // Drop station C's cell on the last day.
    let last_c = forecast.rfind("2022-03-03,-22.05").unwrap();
    forecast.truncate(last_c);
    let s = scenario_with(&observed_csv(), &forecast);
    let err = Pipeline::new(s.config.clone()).unwrap().execute(None).unwrap_err();
    assert!(matches!(err, TriggerError::ForecastCoverage { ref station, .. } if station == "C"));
}
