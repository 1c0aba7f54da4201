//! The period loop.
//!
//! [`run`] drives a [`ScenarioState`] through its horizon. Each period:
//!
//! 1. On the first period of a new calendar year, recharge the aquifer for
//!    the share of the finished year the run covered, escalate prices, and
//!    charge interest on farm debt.
//! 2. Add the period's inflow to community storage, then evaporate.
//! 3. For each farm in declaration order: build its context, evaluate the
//!    six policies in domain order, validate every decision, draw water
//!    from storage and the aquifer, and settle the farm's books.
//! 4. Append the period record to the decision log and notify the
//!    observer.
//! 5. Stop early if the aquifer is exhausted and early stop is enabled.
//!
//! Farms later in the order see what earlier farms left: contention is
//! resolved by evaluation order alone.
//!
//! A period is applied whole or not at all. If anything in it fails, such as
//! a decision that fails closure, the state is rolled back to the end of
//! the last logged period. The run ends with that log and
//! [`EndReason::InvalidDecision`] (or [`EndReason::Aborted`]); the caller
//! gets the log inside [`RunFailure`], and it replays to the state left
//! behind.

use farmstead_ledger::closure::{
    check_crop, check_economic, check_energy, check_market, check_processing, check_water,
};
use farmstead_ledger::{ClosureViolation, DecisionLog, LedgerError, SummaryMetrics, summarize};
use farmstead_policies::{Policy, PolicySet};
use farmstead_resources::{AquiferState, ResourceError, WaterStorageState};
use farmstead_types::{
    AllocationContext, Domain, DrawShortfall, EndReason, FarmDecisions, FarmPeriodRecord,
    PeriodRecord, ResourceSnapshot, WaterDecision,
};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, PeriodSlot};
use crate::config::{ConfigError, PriceConfig};
use crate::context::{
    SharedView, build_context, crop_context, economic_context, energy_context, market_context,
    processing_context, water_context,
};
use crate::exogenous::ExogenousSeries;
use crate::scenario::{FarmState, ScenarioState};

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A policy decision failed closure validation and was not applied.
    #[error("period {period}, farm {farm}: invalid {domain} decision: {reason}")]
    InvalidDecision {
        /// Period in which the decision was made.
        period: u32,
        /// Farm whose policy made it.
        farm: String,
        /// Domain of the offending policy.
        domain: Domain,
        /// What the closure check found.
        reason: String,
    },

    /// Inputs could not support the run.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The calendar could not place a period.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A resource rejected an operation.
    #[error("resource error: {source}")]
    Resource {
        /// The underlying resource error.
        #[from]
        source: ResourceError,
    },

    /// The decision log rejected a record.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}

impl OrchestratorError {
    fn invalid_decision(period: u32, farm: &str, violation: ClosureViolation) -> Self {
        Self::InvalidDecision {
            period,
            farm: farm.to_owned(),
            domain: violation.domain,
            reason: violation.reason,
        }
    }

    /// The end reason a run stopped by this error reports.
    pub const fn end_reason(&self) -> EndReason {
        match self {
            Self::InvalidDecision { .. } => EndReason::InvalidDecision,
            Self::Config { .. } | Self::Clock { .. } | Self::Resource { .. } | Self::Ledger { .. } => {
                EndReason::Aborted
            }
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Every completed period.
    pub log: DecisionLog,
    /// Metrics reduced from `log`.
    pub summary: SummaryMetrics,
    /// Why the run stopped.
    pub end_reason: EndReason,
    /// Number of completed periods.
    pub periods_completed: u32,
}

/// A run that stopped on an error, with everything recorded before it.
#[derive(Debug, thiserror::Error)]
#[error("run failed after {} periods: {error}", .partial.periods_completed)]
pub struct RunFailure {
    /// The error that stopped the run.
    #[source]
    pub error: OrchestratorError,
    /// Output covering the periods completed before the error.
    pub partial: Box<RunOutput>,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// Hook called once per completed period, before the record is logged.
pub trait PeriodObserver {
    /// Called with each period's record.
    fn on_period(&mut self, record: &PeriodRecord);
}

/// An observer that ignores every period.
pub struct NoOpObserver;

impl PeriodObserver for NoOpObserver {
    fn on_period(&mut self, _record: &PeriodRecord) {}
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Run `state` for up to `horizon` periods against `drivers`.
///
/// # Errors
///
/// Returns [`RunFailure`] carrying the partial output if the drivers do not
/// cover the horizon, a decision fails validation, or a resource or ledger
/// operation fails.
pub fn run(
    state: &mut ScenarioState,
    drivers: &ExogenousSeries,
    horizon: u32,
    observer: &mut dyn PeriodObserver,
) -> Result<RunOutput, RunFailure> {
    let mut log = DecisionLog::new(state.log_header());
    info!(
        scenario = state.name(),
        farms = state.farms().len(),
        horizon,
        start_date = %state.clock().start_date(),
        granularity = ?state.clock().granularity(),
        "Run starting"
    );

    if let Err(source) = drivers.ensure_covers(horizon) {
        return Err(fail(log, source.into()));
    }

    let mut year_covered = 0.0;
    let mut end_reason = EndReason::HorizonReached;
    for period in 0..horizon {
        let checkpoint = Checkpoint::take(state);
        let record = match step(state, drivers, period, &mut year_covered) {
            Ok(record) => record,
            Err(error) => {
                checkpoint.restore(state);
                return Err(fail(log, error));
            }
        };
        observer.on_period(&record);
        if let Err(source) = log.append(record) {
            checkpoint.restore(state);
            return Err(fail(log, source.into()));
        }

        if state.stop_on_depletion && state.aquifer.is_depleted() {
            info!(period, "Aquifer depleted, stopping early");
            end_reason = EndReason::AquiferDepleted;
            break;
        }
    }

    let output = finish(log, end_reason);
    log_run_end(&output);
    Ok(output)
}

/// The parts of the state a period mutates, as they stood before it.
struct Checkpoint {
    aquifer: AquiferState,
    storage: WaterStorageState,
    prices: PriceConfig,
    farms: Vec<FarmState>,
}

impl Checkpoint {
    fn take(state: &ScenarioState) -> Self {
        Self {
            aquifer: state.aquifer.clone(),
            storage: state.storage.clone(),
            prices: state.prices,
            farms: state.farms.clone(),
        }
    }

    fn restore(self, state: &mut ScenarioState) {
        state.aquifer = self.aquifer;
        state.storage = self.storage;
        state.prices = self.prices;
        state.farms = self.farms;
    }
}

fn finish(log: DecisionLog, end_reason: EndReason) -> RunOutput {
    let periods_completed = u32::try_from(log.len()).unwrap_or(u32::MAX);
    RunOutput {
        summary: summarize(&log),
        log,
        end_reason,
        periods_completed,
    }
}

fn fail(log: DecisionLog, error: OrchestratorError) -> RunFailure {
    let partial = finish(log, error.end_reason());
    warn!(
        error = %error,
        periods_completed = partial.periods_completed,
        "Run stopped on error"
    );
    RunFailure {
        error,
        partial: Box::new(partial),
    }
}

fn log_run_end(output: &RunOutput) {
    info!(
        end_reason = ?output.end_reason,
        periods_completed = output.periods_completed,
        total_extraction_m3 = output.summary.total_extraction_m3,
        total_recharge_m3 = output.summary.total_recharge_m3,
        sustainability_ratio = ?output.summary.sustainability_ratio,
        final_aquifer_remaining_fraction = output.summary.final_aquifer_remaining_fraction,
        "Run finished"
    );
}

// ---------------------------------------------------------------------------
// One period
// ---------------------------------------------------------------------------

fn step(
    state: &mut ScenarioState,
    drivers: &ExogenousSeries,
    period: u32,
    year_covered: &mut f64,
) -> Result<PeriodRecord, OrchestratorError> {
    let slot = state.clock.slot(period)?;
    let period_drivers = drivers
        .get(period)
        .ok_or_else(|| ConfigError::SeriesTooShort {
            needed: period.saturating_add(1),
            available: drivers.len(),
        })?;

    let recharge_m3 = if state.clock.is_year_boundary(period)? {
        let recharge = close_year(state, *year_covered, slot.year_index)?;
        *year_covered = 0.0;
        recharge
    } else {
        0.0
    };
    *year_covered += slot.year_fraction;

    let deposit = state.storage.deposit(period_drivers.storage_inflow_m3)?;
    let evaporation_m3 = state.storage.apply_evaporation(slot.year_fraction)?;

    let ScenarioState {
        aquifer,
        storage,
        prices,
        farms,
        ..
    } = state;
    let mut records = Vec::with_capacity(farms.len());
    for farm in farms.iter_mut() {
        let shared = SharedView {
            aquifer: &*aquifer,
            storage: &*storage,
            prices: &*prices,
        };
        let ctx = build_context(&shared, farm, &slot, period_drivers);
        let decisions = decide(farm.policies(), &ctx)
            .map_err(|v| OrchestratorError::invalid_decision(period, farm.name(), v))?;
        let shortfall = draw(aquifer, storage, &decisions.water)?;
        records.push(settle(farm, &slot, decisions, shortfall));
    }

    let resources = ResourceSnapshot {
        aquifer_remaining_m3: aquifer.remaining_m3(),
        aquifer_remaining_fraction: aquifer.remaining_fraction(),
        cumulative_extraction_m3: aquifer.cumulative_extraction_m3(),
        drawdown_m: aquifer.drawdown_m(),
        pumping_energy_kwh_per_m3: aquifer.pumping_energy_per_m3(),
        recharge_m3,
        storage_volume_m3: storage.current_volume_m3(),
        storage_fill_fraction: storage.fill_fraction(),
        storage_inflow_m3: deposit.accepted,
        storage_spill_m3: deposit.overflow,
        evaporation_m3,
    };
    debug!(
        period,
        date = %slot.date,
        aquifer_remaining_m3 = resources.aquifer_remaining_m3,
        drawdown_m = resources.drawdown_m,
        storage_volume_m3 = resources.storage_volume_m3,
        "Period complete"
    );

    Ok(PeriodRecord {
        period,
        date: slot.date,
        year_index: slot.year_index,
        farms: records,
        resources,
    })
}

/// Annual updates at the first period of a new year. Returns the recharge
/// applied for the finished year.
fn close_year(
    state: &mut ScenarioState,
    covered_fraction: f64,
    year_index: u32,
) -> Result<f64, OrchestratorError> {
    let recharge_m3 = state.aquifer.apply_recharge(covered_fraction)?;

    let prices = &mut state.prices;
    prices.energy_price_per_kwh *= 1.0 + prices.energy_escalation_pct / 100.0;
    prices.municipal_tariff_per_m3 *= 1.0 + prices.tariff_escalation_pct / 100.0;
    let interest = 1.0 + prices.debt_interest_pct / 100.0;
    for farm in &mut state.farms {
        farm.carried.debt *= interest;
        farm.carried.groundwater_ytd_m3 = 0.0;
    }

    info!(
        year_index,
        covered_fraction,
        recharge_m3,
        energy_price_per_kwh = state.prices.energy_price_per_kwh,
        municipal_tariff_per_m3 = state.prices.municipal_tariff_per_m3,
        "Year closed"
    );
    Ok(recharge_m3)
}

/// Evaluate one farm's policies in domain order, validating each decision
/// before the next domain sees it.
fn decide(
    policies: &PolicySet,
    ctx: &AllocationContext,
) -> Result<FarmDecisions, ClosureViolation> {
    let crop_ctx = crop_context(ctx);
    let crop = policies.crop.decide(&crop_ctx);
    check_crop(&crop, &crop_ctx)?;

    let processing_ctx = processing_context(ctx);
    let processing = policies.processing.decide(&processing_ctx);
    check_processing(&processing, &processing_ctx)?;

    let water_ctx = water_context(ctx, &crop, &processing);
    let water = policies.water.decide(&water_ctx);
    check_water(&water, &water_ctx)?;

    let energy_ctx = energy_context(ctx, &processing);
    let energy = policies.energy.decide(&energy_ctx);
    check_energy(&energy, &energy_ctx)?;

    let market_ctx = market_context(ctx, &processing);
    let market = policies.market.decide(&market_ctx);
    check_market(&market, &market_ctx)?;

    let economic_ctx = economic_context(ctx, &water, &energy, &processing, &market);
    let economic = policies.economic.decide(&economic_ctx);
    check_economic(&economic, &economic_ctx)?;

    Ok(FarmDecisions {
        crop,
        processing,
        water,
        energy,
        market,
        economic,
    })
}

/// Apply a water decision's draws to the shared resources.
fn draw(
    aquifer: &mut AquiferState,
    storage: &mut WaterStorageState,
    water: &WaterDecision,
) -> Result<DrawShortfall, ResourceError> {
    let from_storage = storage.draw_clamped(water.storage_m3.max(0.0))?;
    let from_aquifer = aquifer.extract_clamped(water.groundwater_m3.max(0.0))?;
    Ok(DrawShortfall {
        storage_m3: from_storage.shortfall,
        groundwater_m3: from_aquifer.shortfall,
    })
}

/// Carry the period's outcome into the farm's state and build its record.
fn settle(
    farm: &mut FarmState,
    slot: &PeriodSlot,
    decisions: FarmDecisions,
    shortfall: DrawShortfall,
) -> FarmPeriodRecord {
    let economic = decisions.economic;
    let carried = &mut farm.carried;
    carried.cash += economic.net_income - economic.debt_repayment - economic.reinvestment;
    carried.debt = (carried.debt - economic.debt_repayment).max(0.0);
    carried.inventory_kg = decisions.market.stored_kg;
    carried.groundwater_ytd_m3 += decisions.water.groundwater_m3 - shortfall.groundwater_m3;

    if shortfall.total_m3() > 0.0 {
        warn!(
            period = slot.period,
            farm = farm.name,
            storage_shortfall_m3 = shortfall.storage_m3,
            groundwater_shortfall_m3 = shortfall.groundwater_m3,
            "Draw fell short of decision"
        );
    }

    FarmPeriodRecord {
        farm_id: farm.id,
        farm_name: farm.name.clone(),
        decisions,
        shortfall,
        net_income: economic.net_income,
        cash_after: carried.cash,
        debt_after: carried.debt,
        inventory_after_kg: carried.inventory_kg,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmstead_policies::{CropPolicy, EconomicPolicy, WaterPolicy};

    use super::*;
    use crate::config::tests::make_config;
    use crate::exogenous::tests::make_series;
    use crate::reference::ReferenceData;

    fn make_state_with(edit: impl FnOnce(&mut crate::config::ScenarioConfig)) -> ScenarioState {
        let mut config = make_config();
        edit(&mut config);
        ScenarioState::build(&config, &ReferenceData::builtin().unwrap()).unwrap()
    }

    struct Counter(Vec<u32>);

    impl PeriodObserver for Counter {
        fn on_period(&mut self, record: &PeriodRecord) {
            self.0.push(record.period);
        }
    }

    #[test]
    fn runs_full_horizon() {
        let mut state = make_state_with(|_| {});
        let mut counter = Counter(Vec::new());
        let output = run(&mut state, &make_series(10, 30.0), 10, &mut counter).unwrap();
        assert_eq!(output.end_reason, EndReason::HorizonReached);
        assert_eq!(output.periods_completed, 10);
        assert_eq!(output.log.len(), 10);
        assert_eq!(counter.0, (0..10).collect::<Vec<_>>());
        assert_eq!(output.summary.periods_recorded, 10);
    }

    #[test]
    fn short_series_fails_before_first_period() {
        let mut state = make_state_with(|_| {});
        let failure = run(&mut state, &make_series(3, 30.0), 10, &mut NoOpObserver).unwrap_err();
        assert!(matches!(
            failure.error,
            OrchestratorError::Config {
                source: ConfigError::SeriesTooShort { .. }
            }
        ));
        assert_eq!(failure.partial.periods_completed, 0);
        assert_eq!(failure.partial.end_reason, EndReason::Aborted);
    }

    #[test]
    fn invalid_decision_stops_with_partial_log() {
        // Build-time validation rejects a NaN fraction; injected afterwards
        // it yields a non-finite application that cannot close.
        let mut state = make_state_with(|_| {});
        if let Some(farm) = state.farms.get_mut(1) {
            farm.policies.crop = CropPolicy::DeficitIrrigation { fraction: f64::NAN };
        }
        let failure = run(&mut state, &make_series(10, 30.0), 10, &mut NoOpObserver).unwrap_err();
        match &failure.error {
            OrchestratorError::InvalidDecision {
                period,
                farm,
                domain,
                ..
            } => {
                assert_eq!(*period, 0);
                assert_eq!(farm, "south");
                assert_eq!(*domain, Domain::Crop);
            }
            other => panic!("expected invalid decision, got {other:?}"),
        }
        assert_eq!(failure.partial.end_reason, EndReason::InvalidDecision);
        assert!(failure.partial.log.is_empty());
    }

    #[test]
    fn failed_period_is_rolled_back() {
        // North settles first and draws water before south's decision fails.
        let mut state = make_state_with(|_| {});
        if let Some(farm) = state.farms.get_mut(1) {
            farm.policies.crop = CropPolicy::DeficitIrrigation { fraction: f64::NAN };
        }
        let aquifer_before = state.aquifer().clone();
        let storage_before = state.storage().clone();
        let carried_before: Vec<_> = state.farms().iter().map(|f| *f.carried()).collect();

        let failure = run(&mut state, &make_series(3, 30.0), 3, &mut NoOpObserver).unwrap_err();
        assert!(failure.partial.log.is_empty());
        assert!(
            (failure.partial.summary.total_extraction_m3
                - state.aquifer().cumulative_extraction_m3())
            .abs()
                < 1e-9
        );
        assert_eq!(state.aquifer(), &aquifer_before);
        assert_eq!(state.storage(), &storage_before);
        let carried_after: Vec<_> = state.farms().iter().map(|f| *f.carried()).collect();
        assert_eq!(carried_after, carried_before);
    }

    #[test]
    fn quota_caps_groundwater_per_period() {
        let mut state = make_state_with(|_| {});
        let output = run(&mut state, &make_series(5, 60.0), 5, &mut NoOpObserver).unwrap();
        for record in output.log.periods() {
            let north = record.farms.first().unwrap();
            assert!(north.decisions.water.groundwater_m3 <= 300.0 + 1e-9);
        }
    }

    #[test]
    fn storage_is_shared_in_declaration_order() {
        // 50 m³ in storage, both farms allowed 50 m³: north takes it all.
        let mut state = make_state_with(|c| {
            for farm in &mut c.farms {
                farm.policies.water = WaterPolicy::CheapestSource;
            }
        });
        let output = run(&mut state, &make_series(1, 30.0), 1, &mut NoOpObserver).unwrap();
        let record = output.log.periods().first().unwrap();
        let north = record.farms.first().unwrap();
        let south = record.farms.get(1).unwrap();
        assert!((north.decisions.water.storage_m3 - 50.0).abs() < 1e-9);
        assert!(south.decisions.water.storage_m3.abs() < 1e-9);
        assert!(record.resources.storage_volume_m3.abs() < 1e-9);
    }

    #[test]
    fn cash_tracks_net_income_and_allocation() {
        let mut state = make_state_with(|c| {
            let farm = c.farm_mut("south").unwrap();
            farm.initial_debt = 1_000.0;
            farm.policies.economic = EconomicPolicy::Balanced { debt_share: 0.5 };
        });
        let output = run(&mut state, &make_series(3, 30.0), 3, &mut NoOpObserver).unwrap();
        let mut cash = 0.0;
        let mut debt = 1_000.0;
        for record in output.log.periods() {
            let south = record.farms.get(1).unwrap();
            let e = &south.decisions.economic;
            cash += e.net_income - e.debt_repayment - e.reinvestment;
            debt -= e.debt_repayment;
            assert!((south.cash_after - cash).abs() < 1e-9);
            assert!((south.debt_after - debt.max(0.0)).abs() < 1e-9);
        }
        let final_debt = state.farms().get(1).unwrap().carried().debt;
        assert!((final_debt - debt.max(0.0)).abs() < 1e-9);
    }

    #[test]
    fn recharge_applies_at_year_boundary() {
        let mut state = make_state_with(|c| {
            c.scenario.start_date = chrono::NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        });
        let output = run(&mut state, &make_series(4, 30.0), 4, &mut NoOpObserver).unwrap();
        let recharges: Vec<f64> = output
            .log
            .periods()
            .iter()
            .map(|r| r.resources.recharge_m3)
            .collect();
        // Two days of 2025 covered: 5000 m³/yr x 2/365.
        assert!(recharges.first().unwrap().abs() < f64::EPSILON);
        assert!((recharges.get(2).unwrap() - 5_000.0 * 2.0 / 365.0).abs() < 1e-9);
        assert!(recharges.get(3).unwrap().abs() < f64::EPSILON);
        // Tariff escalated by 3% at the boundary.
        assert!((state.prices().municipal_tariff_per_m3 - 0.65 * 1.03).abs() < 1e-12);
    }

    #[test]
    fn depletion_stops_run_when_enabled() {
        let mut state = make_state_with(|c| {
            c.scenario.stop_on_aquifer_depletion = true;
            c.aquifer.initial_volume_m3 = 500.0;
            for farm in &mut c.farms {
                farm.policies.water = WaterPolicy::AlwaysGroundwater;
            }
        });
        let output = run(&mut state, &make_series(10, 60.0), 10, &mut NoOpObserver).unwrap();
        assert_eq!(output.end_reason, EndReason::AquiferDepleted);
        assert!(output.periods_completed < 10);
        assert!(state.aquifer().is_depleted());
    }
}
