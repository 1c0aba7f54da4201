//! Metrics aggregation over a recorded decision log.
//!
//! [`summarize`] is a pure reduction: everything in [`SummaryMetrics`] is
//! derived from the [`DecisionLog`] alone, so a stored log replays to the
//! identical summary.
//!
//! Money totals are [`Decimal`]. Each per-period amount is rounded to four
//! decimal places before it is added, which keeps totals exact and
//! independent of floating-point summation drift.
//!
//! Indices:
//! - Herfindahl-Hirschman index (HHI): `sum(share_i^2)`, 1.0 when one source
//!   supplies everything.
//! - Shannon entropy: `-sum(share_i * ln(share_i))`, 0.0 for a single source.
//! - Gini coefficient of farm cumulative net income (floored at zero):
//!   `sum |xi - xj| / (2 * n * sum xi)`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use farmstead_types::{EnergySource, FarmId, FarmPeriodRecord, WaterSource};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::log::DecisionLog;

/// Decimal places kept for each money entry before summation.
pub const MONEY_DECIMAL_PLACES: u32 = 4;

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

/// Cumulative money flows across all farms ($).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostTotals {
    /// Groundwater pumping, treatment, and maintenance.
    pub groundwater: Decimal,
    /// Municipal water purchases.
    pub municipal: Decimal,
    /// Grid energy imports.
    pub grid: Decimal,
    /// Backup generator fuel.
    pub generator: Decimal,
    /// Credit earned on exported renewables.
    pub export_credit: Decimal,
    /// Processing running cost.
    pub processing: Decimal,
    /// Groundwater plus municipal.
    pub water_total: Decimal,
    /// Grid plus generator minus export credit.
    pub energy_net: Decimal,
    /// Market revenue.
    pub revenue: Decimal,
    /// Revenue minus water, energy, and processing cost.
    pub net_income: Decimal,
}

/// Cumulative delivered volumes by source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeTotals {
    /// Water delivered per source (m³).
    pub water_by_source: BTreeMap<WaterSource, f64>,
    /// Energy supplied on site per source (kWh).
    pub energy_by_source: BTreeMap<EnergySource, f64>,
    /// Renewable energy exported (kWh).
    pub exported_kwh: f64,
}

/// Demand that went unserved over the run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnmetTotals {
    /// Water demand no source served, including draw shortfalls (m³).
    pub water_m3: f64,
    /// Energy demand no source served (kWh).
    pub energy_kwh: f64,
    /// Irrigation requirement deliberately not applied (m³).
    pub irrigation_deficit_m3: f64,
    /// Storage withdrawals clamped at the stored volume (m³).
    pub storage_shortfall_m3: f64,
    /// Aquifer extractions clamped at the remaining volume (m³).
    pub groundwater_shortfall_m3: f64,
}

/// Shared resource state at the end of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePoint {
    /// Period index.
    pub period: u32,
    /// Period start date.
    pub date: NaiveDate,
    /// Aquifer remaining as a fraction of its initial volume.
    pub aquifer_remaining_fraction: f64,
    /// Storage fill as a fraction of capacity.
    pub storage_fill_fraction: f64,
    /// Drawdown (m).
    pub drawdown_m: f64,
    /// Pumping energy (kWh/m³).
    pub pumping_energy_kwh_per_m3: f64,
}

/// Diversity and concentration indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiversityIndices {
    /// HHI of delivered water by source.
    pub water_source_hhi: f64,
    /// Shannon entropy of delivered water by source.
    pub water_source_shannon: f64,
    /// HHI of on-site energy supply by source.
    pub energy_source_hhi: f64,
    /// Shannon entropy of on-site energy supply by source.
    pub energy_source_shannon: f64,
    /// HHI of groundwater extraction across farms.
    pub groundwater_farm_hhi: f64,
    /// Gini coefficient of farm cumulative net income.
    pub net_income_gini: Decimal,
}

/// Per-farm totals over the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmTotals {
    /// The farm.
    pub farm_id: FarmId,
    /// Water delivered from all sources (m³).
    pub water_delivered_m3: f64,
    /// Groundwater delivered (m³).
    pub groundwater_m3: f64,
    /// Unserved water demand including draw shortfalls (m³).
    pub unmet_water_m3: f64,
    /// Energy demand (kWh).
    pub energy_demand_kwh: f64,
    /// Unserved energy demand (kWh).
    pub unmet_energy_kwh: f64,
    /// Water cost ($).
    pub water_cost: Decimal,
    /// Net energy cost ($).
    pub energy_cost: Decimal,
    /// Processing cost ($).
    pub processing_cost: Decimal,
    /// Market revenue ($).
    pub revenue: Decimal,
    /// Net income ($).
    pub net_income: Decimal,
    /// Cash at the end of the last recorded period ($).
    pub final_cash: f64,
    /// Debt at the end of the last recorded period ($).
    pub final_debt: f64,
    /// Storable inventory at the end of the last recorded period (kg).
    pub final_inventory_kg: f64,
}

/// Everything the reporting layers need about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// Scenario name.
    pub scenario_name: String,
    /// Number of recorded periods.
    pub periods_recorded: usize,
    /// Money flows.
    pub costs: CostTotals,
    /// Delivered volumes.
    pub volumes: VolumeTotals,
    /// Unserved demand.
    pub unmet: UnmetTotals,
    /// Resource trajectory, one point per period.
    pub series: Vec<ResourcePoint>,
    /// Diversity and concentration.
    pub diversity: DiversityIndices,
    /// Aquifer recharge applied over the run (m³).
    pub total_recharge_m3: f64,
    /// Aquifer extraction over the run (m³).
    pub total_extraction_m3: f64,
    /// Recharge divided by extraction; `None` when nothing was extracted.
    pub sustainability_ratio: Option<f64>,
    /// Aquifer remaining fraction after the last period.
    pub final_aquifer_remaining_fraction: f64,
    /// Per-farm totals keyed by farm name.
    pub farms: BTreeMap<String, FarmTotals>,
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

/// Convert a per-period money amount to a rounded [`Decimal`].
///
/// Non-finite amounts cannot pass closure validation; they map to zero.
pub fn money(amount: f64) -> Decimal {
    Decimal::from_f64(amount).map_or(Decimal::ZERO, |d| d.round_dp(MONEY_DECIMAL_PLACES))
}

fn add_money(total: &mut Decimal, amount: f64) {
    *total = total.saturating_add(money(amount));
}

fn sub_money(total: &mut Decimal, amount: f64) {
    *total = total.saturating_sub(money(amount));
}

fn add_to<K: Ord>(map: &mut BTreeMap<K, f64>, key: K, amount: f64) {
    *map.entry(key).or_insert(0.0) += amount;
}

/// Reduce a decision log to its summary metrics.
pub fn summarize(log: &DecisionLog) -> SummaryMetrics {
    let header = log.header();
    let mut costs = CostTotals::default();
    let mut volumes = VolumeTotals::default();
    let mut unmet = UnmetTotals::default();
    let mut series = Vec::with_capacity(log.len());
    let mut farms: BTreeMap<String, FarmTotals> = BTreeMap::new();
    let mut total_recharge_m3 = 0.0;
    let mut total_extraction_m3 = 0.0;

    for record in log.periods() {
        for farm in &record.farms {
            let delivered = delivered_water(farm);
            total_extraction_m3 += delivered.groundwater;
            accumulate_costs(&mut costs, farm);
            accumulate_volumes(&mut volumes, farm, &delivered);
            accumulate_unmet(&mut unmet, farm);
            let totals = farms
                .entry(farm.farm_name.clone())
                .or_insert_with(|| FarmTotals::empty(farm.farm_id));
            totals.absorb(farm, &delivered);
        }

        let r = &record.resources;
        total_recharge_m3 += r.recharge_m3;
        series.push(ResourcePoint {
            period: record.period,
            date: record.date,
            aquifer_remaining_fraction: r.aquifer_remaining_fraction,
            storage_fill_fraction: r.storage_fill_fraction,
            drawdown_m: r.drawdown_m,
            pumping_energy_kwh_per_m3: r.pumping_energy_kwh_per_m3,
        });
    }

    let diversity = DiversityIndices {
        water_source_hhi: hhi(volumes.water_by_source.values().copied()),
        water_source_shannon: shannon(volumes.water_by_source.values().copied()),
        energy_source_hhi: hhi(volumes.energy_by_source.values().copied()),
        energy_source_shannon: shannon(volumes.energy_by_source.values().copied()),
        groundwater_farm_hhi: hhi(farms.values().map(|f| f.groundwater_m3)),
        net_income_gini: gini(
            &farms
                .values()
                .map(|f| f.net_income.max(Decimal::ZERO))
                .collect::<Vec<_>>(),
        ),
    };

    let sustainability_ratio =
        (total_extraction_m3 > 0.0).then(|| total_recharge_m3 / total_extraction_m3);
    let final_aquifer_remaining_fraction = log
        .last()
        .map_or(1.0, |r| r.resources.aquifer_remaining_fraction);

    debug!(
        periods = log.len(),
        farms = farms.len(),
        total_extraction_m3,
        "decision log summarized"
    );

    SummaryMetrics {
        scenario_name: header.scenario_name.clone(),
        periods_recorded: log.len(),
        costs,
        volumes,
        unmet,
        series,
        diversity,
        total_recharge_m3,
        total_extraction_m3,
        sustainability_ratio,
        final_aquifer_remaining_fraction,
        farms,
    }
}

/// Water a farm actually received, after draw shortfalls.
struct Delivered {
    storage: f64,
    groundwater: f64,
    municipal: f64,
}

impl Delivered {
    fn total(&self) -> f64 {
        self.storage + self.groundwater + self.municipal
    }
}

fn delivered_water(farm: &FarmPeriodRecord) -> Delivered {
    let water = &farm.decisions.water;
    Delivered {
        storage: (water.storage_m3 - farm.shortfall.storage_m3).max(0.0),
        groundwater: (water.groundwater_m3 - farm.shortfall.groundwater_m3).max(0.0),
        municipal: water.municipal_m3,
    }
}

fn accumulate_costs(costs: &mut CostTotals, farm: &FarmPeriodRecord) {
    let d = &farm.decisions;
    add_money(&mut costs.groundwater, d.water.groundwater_cost);
    add_money(&mut costs.municipal, d.water.municipal_cost);
    add_money(&mut costs.water_total, d.water.groundwater_cost);
    add_money(&mut costs.water_total, d.water.municipal_cost);
    add_money(&mut costs.grid, d.energy.grid_cost);
    add_money(&mut costs.generator, d.energy.generator_cost);
    add_money(&mut costs.export_credit, d.energy.export_credit);
    add_money(&mut costs.energy_net, d.energy.grid_cost);
    add_money(&mut costs.energy_net, d.energy.generator_cost);
    sub_money(&mut costs.energy_net, d.energy.export_credit);
    add_money(&mut costs.processing, d.processing.cost);
    add_money(&mut costs.revenue, d.market.revenue);
    add_money(&mut costs.net_income, farm.net_income);
}

fn accumulate_volumes(volumes: &mut VolumeTotals, farm: &FarmPeriodRecord, delivered: &Delivered) {
    let e = &farm.decisions.energy;
    add_to(&mut volumes.water_by_source, WaterSource::Storage, delivered.storage);
    add_to(
        &mut volumes.water_by_source,
        WaterSource::Groundwater,
        delivered.groundwater,
    );
    add_to(&mut volumes.water_by_source, WaterSource::Municipal, delivered.municipal);
    add_to(&mut volumes.energy_by_source, EnergySource::Renewable, e.renewable_kwh);
    add_to(&mut volumes.energy_by_source, EnergySource::Grid, e.grid_kwh);
    add_to(&mut volumes.energy_by_source, EnergySource::Generator, e.generator_kwh);
    volumes.exported_kwh += e.exported_kwh;
}

fn accumulate_unmet(unmet: &mut UnmetTotals, farm: &FarmPeriodRecord) {
    let d = &farm.decisions;
    unmet.water_m3 += d.water.unmet_m3 + farm.shortfall.total_m3();
    unmet.energy_kwh += d.energy.unmet_kwh;
    unmet.irrigation_deficit_m3 += d.crop.deficit_m3;
    unmet.storage_shortfall_m3 += farm.shortfall.storage_m3;
    unmet.groundwater_shortfall_m3 += farm.shortfall.groundwater_m3;
}

impl FarmTotals {
    const fn empty(farm_id: FarmId) -> Self {
        Self {
            farm_id,
            water_delivered_m3: 0.0,
            groundwater_m3: 0.0,
            unmet_water_m3: 0.0,
            energy_demand_kwh: 0.0,
            unmet_energy_kwh: 0.0,
            water_cost: Decimal::ZERO,
            energy_cost: Decimal::ZERO,
            processing_cost: Decimal::ZERO,
            revenue: Decimal::ZERO,
            net_income: Decimal::ZERO,
            final_cash: 0.0,
            final_debt: 0.0,
            final_inventory_kg: 0.0,
        }
    }

    fn absorb(&mut self, farm: &FarmPeriodRecord, delivered: &Delivered) {
        let d = &farm.decisions;
        self.water_delivered_m3 += delivered.total();
        self.groundwater_m3 += delivered.groundwater;
        self.unmet_water_m3 += d.water.unmet_m3 + farm.shortfall.total_m3();
        self.energy_demand_kwh += d.energy.demand_kwh;
        self.unmet_energy_kwh += d.energy.unmet_kwh;
        add_money(&mut self.water_cost, d.water.cost());
        add_money(&mut self.energy_cost, d.energy.net_cost());
        add_money(&mut self.processing_cost, d.processing.cost);
        add_money(&mut self.revenue, d.market.revenue);
        add_money(&mut self.net_income, farm.net_income);
        self.final_cash = farm.cash_after;
        self.final_debt = farm.debt_after;
        self.final_inventory_kg = farm.inventory_after_kg;
    }
}

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

fn shares(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let values: Vec<f64> = values.filter(|v| *v > 0.0).collect();
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        Vec::new()
    }
}

/// Herfindahl-Hirschman index of the given quantities; 0.0 when all are zero.
pub fn hhi(values: impl Iterator<Item = f64>) -> f64 {
    shares(values).iter().map(|s| s * s).sum()
}

/// Shannon entropy (natural log) of the given quantities; +0.0 for one
/// source or none.
pub fn shannon(values: impl Iterator<Item = f64>) -> f64 {
    0.0 - shares(values).iter().map(|s| s * s.ln()).sum::<f64>()
}

/// Gini coefficient of non-negative values; 0.0 for empty or all-zero input.
pub fn gini(values: &[Decimal]) -> Decimal {
    gini_checked(values).unwrap_or(Decimal::ZERO)
}

fn gini_checked(values: &[Decimal]) -> Option<Decimal> {
    let total = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    if values.is_empty() || total <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }

    let mut sum_abs_diff = Decimal::ZERO;
    for (i, vi) in values.iter().enumerate() {
        for vj in values.iter().skip(i.saturating_add(1)) {
            // Each unordered pair appears twice in the full double sum.
            let diff = vi.checked_sub(*vj)?.abs();
            sum_abs_diff = sum_abs_diff.checked_add(diff.checked_mul(Decimal::TWO)?)?;
        }
    }

    let denominator = Decimal::TWO
        .checked_mul(Decimal::from(values.len()))?
        .checked_mul(total)?;
    sum_abs_diff.checked_div(denominator)
}
