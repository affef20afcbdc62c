//! Flood Trigger Verification - batch run
//!
//! Verifies archived ensemble forecasts against gauge observations and
//! selects, per station, lead-time bucket and severity, the probability
//! threshold that should trigger anticipatory action:
//! 1. Loads station metadata, observed series and forecast fields
//! 2. Resolves events and aggregates the ensemble
//! 3. Sweeps the threshold grid and scores every skill group
//! 4. Selects triggers and writes the trigger, metrics and summary files
//!
//! Usage:
//!   cargo run --release                              # flotrig.toml or $FLOTRIG_CONFIG
//!   cargo run --release -- --config runs/moz.toml    # explicit configuration
//!   cargo run --release -- --output /tmp/triggers    # override output directory
//!   cargo run --release -- --workers 8 --verbose     # parallel scoring, debug logs
//!   cargo run --release -- --log-file run.log        # also append logs to a file
//!
//! Environment:
//!   FLOTRIG_CONFIG - configuration file path (also read from .env)

use flotrig::config::{self, PipelineConfig};
use flotrig::logging::{self, LogLevel, Stage};
use flotrig::pipeline::Pipeline;
use std::env;
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug)]
struct CliArgs {
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    workers: Option<usize>,
    log_file: Option<String>,
    verbose: bool,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--config PATH] [--output DIR] [--workers N] [--log-file PATH] [--verbose]",
        program
    )
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        config: None,
        output: None,
        workers: None,
        log_file: None,
        verbose: false,
    };

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{} requires a value", flag))
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                cli.config = Some(PathBuf::from(value(i, "--config")?));
                i += 2;
            }
            "--output" => {
                cli.output = Some(PathBuf::from(value(i, "--output")?));
                i += 2;
            }
            "--workers" => {
                let raw = value(i, "--workers")?;
                let n = raw
                    .parse::<usize>()
                    .map_err(|_| format!("--workers expects a positive integer, got '{}'", raw))?;
                cli.workers = Some(n);
                i += 2;
            }
            "--log-file" => {
                cli.log_file = Some(value(i, "--log-file")?);
                i += 2;
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
                i += 1;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(cli)
}

fn load_configuration(cli: &CliArgs) -> Result<PipelineConfig, Box<dyn Error>> {
    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    println!("📋 Loading configuration from {}", path.display());
    let mut config = config::load_config(&path)?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Ok(config)
}

fn run(cli: &CliArgs) -> Result<(), Box<dyn Error>> {
    let config = load_configuration(cli)?;
    let pipeline = Pipeline::new(config)?;

    println!("📥 Loading inputs...");
    let inputs = pipeline.load_inputs().inspect_err(|e| logging::log_failure(Stage::System, "load inputs", e))?;
    println!(
        "   ✓ {} stations, {} observed dates, {} forecast runs\n",
        inputs.registry.len(),
        inputs.observed.len(),
        inputs.forecasts.len()
    );

    println!("🔎 Verifying forecasts...");
    let outcome = pipeline
        .run(&inputs)
        .inspect_err(|e| logging::log_failure(Stage::System, "verification run", e))?;
    let s = &outcome.summary;
    println!("   ✓ {} member events, {} probability rows", s.events, s.probability_rows);
    if s.skipped_observations > 0 {
        println!(
            "   ⚠ {}/{} combinations skipped (no observation)",
            s.skipped_observations, s.combinations
        );
    }
    println!(
        "   ✓ {} groups: {} with a trigger, {} without\n",
        s.groups, s.groups_with_trigger, s.groups_without_trigger
    );

    println!("💾 Writing outputs...");
    let files = pipeline
        .write_outputs(&outcome, cli.output.as_deref())
        .inspect_err(|e| logging::log_failure(Stage::Export, "write outputs", e))?;
    println!("   ✓ {}", files.triggers.display());
    println!("   ✓ {}", files.metrics.display());
    println!("   ✓ {}", files.summary.display());

    Ok(())
}

fn main() {
    println!("🌊 Flood Trigger Verification");
    println!("=============================\n");

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("flotrig");
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", usage(program));
            std::process::exit(1);
        }
    };

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    logging::init_logger(level, cli.log_file.as_deref(), false);

    if let Err(e) = run(&cli) {
        eprintln!("\n❌ Run failed: {}\n", e);
        std::process::exit(1);
    }

    println!("\n✓ Done");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("flotrig").chain(list.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn test_no_arguments_uses_defaults() {
        let cli = parse_args(&args(&[])).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.output.is_none());
        assert!(cli.workers.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_all_flags() {
        let cli = parse_args(&args(&[
            "--config", "moz.toml", "--output", "out", "--workers", "8", "--log-file", "run.log", "-v",
        ]))
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("moz.toml")));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.workers, Some(8));
        assert_eq!(cli.log_file.as_deref(), Some("run.log"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_parsed_arguments_are_printable() {
        let cli = parse_args(&args(&["--workers", "4", "--verbose"])).unwrap();
        let shown = format!("{:?}", cli);
        assert!(shown.contains("workers: Some(4)"), "got {}", shown);
        assert!(shown.contains("verbose: true"));
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = parse_args(&args(&["--config"])).unwrap_err();
        assert!(err.contains("--config"));
    }

    #[test]
    fn test_bad_worker_count_is_error() {
        assert!(parse_args(&args(&["--workers", "many"])).is_err());
    }

    #[test]
    fn test_unknown_flag_is_error() {
        let err = parse_args(&args(&["--endpoint", "8080"])).unwrap_err();
        assert!(err.contains("--endpoint"));
    }
}
