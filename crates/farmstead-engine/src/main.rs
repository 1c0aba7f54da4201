//! Command-line runner for Farmstead scenarios.
//!
//! Loads a scenario, resolves equipment and drivers, runs it, and writes the
//! decision log and summary. With `FARMSTEAD_SWEEP_FARM` set, it instead
//! runs one variant per water policy for that farm in parallel.
//!
//! # Startup Sequence
//!
//! 1. Load the scenario from the first argument, `FARMSTEAD_SCENARIO`, or
//!    `scenario.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load reference data (`FARMSTEAD_REFERENCE` or the built-in catalogue)
//! 4. Load drivers (`FARMSTEAD_DRIVERS` or synthetic from the scenario seed)
//! 5. Run, or sweep
//! 6. Write `decision_log.jsonl` and `summary.json` under
//!    `FARMSTEAD_OUTPUT_DIR` (default `output`)
//!
//! A run that stops on an error still writes its partial log and summary
//! before the error is reported.

mod error;
mod progress;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use farmstead_core::clock::PeriodClock;
use farmstead_core::config::{LoggingConfig, ScenarioConfig};
use farmstead_core::exogenous::ExogenousSeries;
use farmstead_core::orchestrator::{RunOutput, run};
use farmstead_core::reference::ReferenceData;
use farmstead_core::scenario::ScenarioState;
use farmstead_core::sweep::{ScenarioRun, SweepError, policy_variants, run_sweep};
use farmstead_policies::WaterPolicy;
use farmstead_types::Granularity;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::progress::ProgressObserver;

/// Water policies compared by a sweep.
const SWEEP_WATER_POLICIES: [WaterPolicy; 4] = [
    WaterPolicy::AlwaysGroundwater,
    WaterPolicy::AlwaysMunicipal,
    WaterPolicy::CheapestSource,
    WaterPolicy::ConserveGroundwater {
        max_groundwater_fraction: 0.5,
    },
];

/// Application entry point.
///
/// # Errors
///
/// Returns an error if loading, running, or writing output fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load the scenario.
    let scenario_path = scenario_path();
    let config = ScenarioConfig::from_file(&scenario_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        path = %scenario_path.display(),
        scenario = config.scenario.name,
        farms = config.farms.len(),
        horizon = config.scenario.horizon_periods,
        "Scenario loaded"
    );

    // 3. Reference data.
    let reference = match std::env::var("FARMSTEAD_REFERENCE") {
        Ok(path) => ReferenceData::from_file(Path::new(&path))?,
        Err(_) => ReferenceData::builtin()?,
    };
    info!(entries = reference.equipment.len(), "Reference data loaded");

    // 4. Drivers.
    let drivers = load_drivers(&config)?;
    info!(periods = drivers.len(), "Exogenous drivers ready");

    let output_dir = std::env::var("FARMSTEAD_OUTPUT_DIR")
        .map_or_else(|_| PathBuf::from("output"), PathBuf::from);
    create_dir(&output_dir)?;

    // 5-6. Run or sweep, then write results.
    if let Ok(farm) = std::env::var("FARMSTEAD_SWEEP_FARM") {
        sweep(&config, &reference, &drivers, &farm, &output_dir)?;
    } else {
        run_single(&config, &reference, &drivers, &output_dir)?;
    }
    Ok(())
}

fn scenario_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FARMSTEAD_SCENARIO").ok())
        .map_or_else(|| PathBuf::from("scenario.yaml"), PathBuf::from)
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_drivers(config: &ScenarioConfig) -> Result<ExogenousSeries, EngineError> {
    if let Ok(path) = std::env::var("FARMSTEAD_DRIVERS") {
        info!(path, "Loading exogenous drivers");
        return Ok(ExogenousSeries::from_file(Path::new(&path))?);
    }
    let section = &config.scenario;
    info!(seed = section.seed, "Generating synthetic drivers");
    let clock = PeriodClock::new(section.start_date, section.granularity);
    Ok(ExogenousSeries::synthetic(
        section.seed,
        section.horizon_periods,
        &clock,
    )?)
}

fn run_single(
    config: &ScenarioConfig,
    reference: &ReferenceData,
    drivers: &ExogenousSeries,
    output_dir: &Path,
) -> Result<(), EngineError> {
    let mut state = ScenarioState::build(config, reference)?;
    let every = match config.scenario.granularity {
        Granularity::Daily => 30,
        Granularity::Annual => 1,
    };
    let mut observer = ProgressObserver::new(every);
    let horizon = state.horizon();

    match run(&mut state, drivers, horizon, &mut observer) {
        Ok(output) => {
            write_output(&output, output_dir)?;
            info!(
                periods_observed = observer.periods_seen(),
                output_dir = %output_dir.display(),
                "Results written"
            );
            Ok(())
        }
        Err(failure) => {
            write_output(&failure.partial, output_dir)?;
            error!(error = %failure.error, "Run failed; partial results written");
            Err(failure.into())
        }
    }
}

fn sweep(
    config: &ScenarioConfig,
    reference: &ReferenceData,
    drivers: &ExogenousSeries,
    farm: &str,
    output_dir: &Path,
) -> Result<(), EngineError> {
    let variants = policy_variants(config, farm, &SWEEP_WATER_POLICIES)?;
    let runs = variants
        .into_iter()
        .map(|(label, config)| ScenarioRun {
            label,
            config,
            reference,
            drivers,
        })
        .collect();

    let outcomes = run_sweep(runs);
    let total = outcomes.len();
    let mut failed = 0_usize;
    for outcome in &outcomes {
        let dir = output_dir.join(outcome.label.replace([':', '/'], "_"));
        create_dir(&dir)?;
        match &outcome.result {
            Ok(output) => {
                write_output(output, &dir)?;
                info!(
                    label = outcome.label,
                    sustainability_ratio = ?output.summary.sustainability_ratio,
                    final_aquifer_remaining_fraction =
                        output.summary.final_aquifer_remaining_fraction,
                    "Sweep run complete"
                );
            }
            Err(err) => {
                failed = failed.saturating_add(1);
                if let SweepError::Run { source } = err {
                    write_output(&source.partial, &dir)?;
                }
                warn!(label = outcome.label, error = %err, "Sweep run failed");
            }
        }
    }

    if failed > 0 {
        return Err(EngineError::Sweep { failed, total });
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), EngineError> {
    std::fs::create_dir_all(path).map_err(|source| EngineError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn create_file(path: &Path) -> Result<BufWriter<File>, EngineError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| EngineError::Output {
            path: path.to_path_buf(),
            source,
        })
}

fn write_output(output: &RunOutput, dir: &Path) -> Result<(), EngineError> {
    output
        .log
        .write_jsonl(create_file(&dir.join("decision_log.jsonl"))?)?;

    let summary_path = dir.join("summary.json");
    let mut writer = create_file(&summary_path)?;
    serde_json::to_writer_pretty(&mut writer, &output.summary)?;
    writer.flush().map_err(|source| EngineError::Output {
        path: summary_path,
        source,
    })
}
