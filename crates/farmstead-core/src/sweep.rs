//! Scenario sweeps: many independent runs in parallel.
//!
//! Every run builds its own [`ScenarioState`], so runs share nothing
//! mutable and can go to rayon's pool as-is. Reference data and drivers are
//! read-only and borrowed by all runs. Outcomes come back in input order,
//! and each equals what a sequential [`run`] of the same inputs produces.

use farmstead_policies::{Policy, WaterPolicy};
use rayon::prelude::*;
use tracing::info;

use crate::config::{ConfigError, ScenarioConfig};
use crate::exogenous::ExogenousSeries;
use crate::orchestrator::{NoOpObserver, RunFailure, RunOutput, run};
use crate::reference::ReferenceData;
use crate::scenario::ScenarioState;

/// One run of a sweep.
#[derive(Debug, Clone)]
pub struct ScenarioRun<'a> {
    /// Label identifying the run in the results.
    pub label: String,
    /// The scenario to run.
    pub config: ScenarioConfig,
    /// Equipment catalogue.
    pub reference: &'a ReferenceData,
    /// Drivers covering the scenario's horizon.
    pub drivers: &'a ExogenousSeries,
}

/// Why one run of a sweep produced no complete output.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The scenario could not be built.
    #[error("scenario build failed: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The run stopped on an error.
    #[error("{source}")]
    Run {
        /// The failure, with its partial output.
        #[from]
        source: RunFailure,
    },
}

/// The result of one run of a sweep.
#[derive(Debug)]
pub struct SweepOutcome {
    /// The run's label.
    pub label: String,
    /// Its output or error.
    pub result: Result<RunOutput, SweepError>,
}

/// Run every scenario in parallel and return outcomes in input order.
pub fn run_sweep(runs: Vec<ScenarioRun<'_>>) -> Vec<SweepOutcome> {
    info!(runs = runs.len(), "Sweep starting");
    let outcomes: Vec<SweepOutcome> = runs
        .into_par_iter()
        .map(|scenario| SweepOutcome {
            result: run_one(&scenario),
            label: scenario.label,
        })
        .collect();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(runs = outcomes.len(), failed, "Sweep finished");
    outcomes
}

fn run_one(scenario: &ScenarioRun<'_>) -> Result<RunOutput, SweepError> {
    let mut state = ScenarioState::build(&scenario.config, scenario.reference)?;
    let horizon = state.horizon();
    Ok(run(&mut state, scenario.drivers, horizon, &mut NoOpObserver)?)
}

/// One copy of `base` per water policy, with `farm` switched to it.
///
/// Each copy's label is `"{farm}:{policy}"` and its scenario name gets the
/// label appended, so logs from different variants are distinguishable.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if `base` has no farm named `farm`.
pub fn policy_variants(
    base: &ScenarioConfig,
    farm: &str,
    policies: &[WaterPolicy],
) -> Result<Vec<(String, ScenarioConfig)>, ConfigError> {
    if base.farm(farm).is_none() {
        return Err(ConfigError::Invalid {
            reason: format!("no farm named {farm} to vary"),
        });
    }
    Ok(policies
        .iter()
        .map(|policy| {
            let label = format!("{farm}:{}", policy.name());
            let mut config = base.clone();
            config.scenario.name = format!("{}/{label}", base.scenario.name);
            if let Some(target) = config.farm_mut(farm) {
                target.policies.water = *policy;
            }
            (label, config)
        })
        .collect())
}
