//! Allocation contexts: the immutable inputs every policy decides from.
//!
//! The context builder in `farmstead-core` assembles one
//! [`AllocationContext`] per farm per period from the scenario state and the
//! exogenous drivers. Domain contexts ([`WaterContext`], [`EnergyContext`],
//! ...) are narrower views derived from it together with the decisions of
//! upstream domains. Policies only ever see these read-only snapshots; they
//! never touch the shared aquifer or storage directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::FarmId;

// ---------------------------------------------------------------------------
// Base snapshot components
// ---------------------------------------------------------------------------

/// Readings of the shared depletable resources at context-build time.
///
/// For farms later in declaration order these readings already reflect the
/// draws of earlier farms in the same period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceReading {
    /// Exploitable aquifer volume still available (m³).
    pub aquifer_remaining_m3: f64,
    /// Remaining aquifer volume as a fraction of the initial volume.
    pub aquifer_remaining_fraction: f64,
    /// Current drawdown (m).
    pub drawdown_m: f64,
    /// Well depth plus drawdown (m).
    pub effective_head_m: f64,
    /// Pumping energy at the current head (kWh/m³).
    pub pumping_energy_kwh_per_m3: f64,
    /// Water currently held in community storage (m³).
    pub storage_volume_m3: f64,
    /// Community storage capacity (m³).
    pub storage_capacity_m3: f64,
}

/// Prices in force for the period (after annual escalation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PriceSnapshot {
    /// Grid energy price ($/kWh); also prices pumping and treatment energy.
    pub energy_price_per_kwh: f64,
    /// Municipal water tariff ($/m³).
    pub municipal_tariff_per_m3: f64,
    /// Well and treatment maintenance ($/m³ of groundwater).
    pub groundwater_maintenance_per_m3: f64,
    /// Price paid for exported surplus renewables ($/kWh).
    pub grid_export_price_per_kwh: f64,
    /// Backup generator fuel cost ($/kWh).
    pub generator_cost_per_kwh: f64,
    /// Crop price for the period, base price times the market multiplier ($/kg).
    pub crop_price_per_kg: f64,
}

/// Exogenous, period-aligned drivers (weather-driven demand and supply).
///
/// Supplied precomputed by an external collaborator; the engine performs no
/// interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PeriodDrivers {
    /// Irrigation requirement per hectare (m³/ha).
    pub irrigation_m3_per_ha: f64,
    /// Non-irrigation water demand per farm (m³).
    pub base_water_m3: f64,
    /// Non-processing energy demand per farm (kWh).
    pub base_energy_kwh: f64,
    /// Photovoltaic yield per installed kW (kWh/kW).
    pub pv_kwh_per_kw: f64,
    /// Harvest per hectare (kg/ha).
    pub harvest_kg_per_ha: f64,
    /// Community storage inflow, e.g. harvested rainwater (m³).
    pub storage_inflow_m3: f64,
    /// Mean air temperature (°C).
    pub temperature_c: f64,
    /// Market price multiplier relative to the base crop price.
    pub price_multiplier: f64,
}

/// Per-period processing capacities of a farm (kg).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessingCapacity {
    /// Packaging line capacity (kg).
    pub packaged_kg: f64,
    /// Canning line capacity (kg).
    pub canned_kg: f64,
    /// Dryer capacity (kg).
    pub dried_kg: f64,
}

/// Per-kg running rates of one processing line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LineRates {
    /// Energy per processed kg (kWh).
    pub energy_kwh_per_kg: f64,
    /// Water per processed kg (m³).
    pub water_m3_per_kg: f64,
    /// Running cost per processed kg ($).
    pub cost_per_kg: f64,
}

/// Running rates of the three processing lines. Fresh product has none.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessingRates {
    /// Packaging line.
    pub packaged: LineRates,
    /// Canning line.
    pub canned: LineRates,
    /// Dryer.
    pub dried: LineRates,
}

impl ProcessingRates {
    fn weighted(
        &self,
        packaged_kg: f64,
        canned_kg: f64,
        dried_kg: f64,
        rate: fn(&LineRates) -> f64,
    ) -> f64 {
        packaged_kg * rate(&self.packaged)
            + canned_kg * rate(&self.canned)
            + dried_kg * rate(&self.dried)
    }

    /// Running cost of processing the given amounts ($).
    pub fn cost(&self, packaged_kg: f64, canned_kg: f64, dried_kg: f64) -> f64 {
        self.weighted(packaged_kg, canned_kg, dried_kg, |r| r.cost_per_kg)
    }

    /// Energy needed to process the given amounts (kWh).
    pub fn energy_kwh(&self, packaged_kg: f64, canned_kg: f64, dried_kg: f64) -> f64 {
        self.weighted(packaged_kg, canned_kg, dried_kg, |r| r.energy_kwh_per_kg)
    }

    /// Water needed to process the given amounts (m³).
    pub fn water_m3(&self, packaged_kg: f64, canned_kg: f64, dried_kg: f64) -> f64 {
        self.weighted(packaged_kg, canned_kg, dried_kg, |r| r.water_m3_per_kg)
    }
}

/// Static farm parameters resolved from configuration and reference data,
/// already scaled to one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FarmProfile {
    /// Cultivated area (ha).
    pub area_ha: f64,
    /// Installed photovoltaic capacity (kW).
    pub pv_kw: f64,
    /// Well pumping capacity (m³ per period).
    pub well_capacity_m3: f64,
    /// Groundwater treatment capacity (m³ per period).
    pub treatment_capacity_m3: f64,
    /// Treatment energy (kWh/m³ of groundwater).
    pub treatment_energy_kwh_per_m3: f64,
    /// Municipal connection capacity (m³ per period).
    pub municipal_capacity_m3: f64,
    /// Grid connection capacity (kWh per period).
    pub grid_capacity_kwh: f64,
    /// Backup generator capacity (kWh per period).
    pub generator_capacity_kwh: f64,
    /// Maximum draw from community storage (m³ per period).
    pub storage_allowance_m3: f64,
    /// Processing line capacities.
    pub processing: ProcessingCapacity,
    /// Per-kg running rates of each processing line.
    pub processing_rates: ProcessingRates,
    /// Storable product warehouse capacity (kg).
    pub inventory_capacity_kg: f64,
}

/// Farm state carried from one period to the next by the orchestrator.
///
/// Policies are stateless; any history they need arrives through here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FarmCarried {
    /// Storable product on hand (kg).
    pub inventory_kg: f64,
    /// Cash balance ($); negative means overdraft.
    pub cash: f64,
    /// Outstanding debt ($).
    pub debt: f64,
    /// Groundwater drawn so far this calendar year (m³).
    pub groundwater_ytd_m3: f64,
}

/// The immutable per-farm, per-period input snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AllocationContext {
    /// Zero-based period index.
    pub period: u32,
    /// Calendar date on which the period starts.
    pub date: NaiveDate,
    /// Zero-based year index relative to the run start.
    pub year_index: u32,
    /// The farm this context belongs to.
    pub farm_id: FarmId,
    /// The farm's declared name.
    pub farm_name: String,
    /// Shared resource readings (residual after earlier farms).
    pub resources: ResourceReading,
    /// Prices in force.
    pub prices: PriceSnapshot,
    /// Drawdown-adjusted marginal groundwater cost ($/m³), computed once by
    /// the builder so policies never recompute pumping cost themselves.
    pub groundwater_cost_per_m3: f64,
    /// This period's exogenous drivers.
    pub drivers: PeriodDrivers,
    /// Static farm parameters.
    pub profile: FarmProfile,
    /// Carried farm state.
    pub carried: FarmCarried,
}

// ---------------------------------------------------------------------------
// Domain contexts
// ---------------------------------------------------------------------------

/// Input to a crop (irrigation) policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CropContext {
    /// Full irrigation requirement for the period (m³).
    pub requirement_m3: f64,
    /// Mean air temperature (°C).
    pub temperature_c: f64,
}

/// Input to a food-processing policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessingContext {
    /// Harvest to route this period (kg).
    pub harvest_kg: f64,
    /// Processing line capacities (kg).
    pub capacity: ProcessingCapacity,
    /// Per-kg running rates of each line.
    pub rates: ProcessingRates,
}

/// Input to a water-sourcing policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WaterContext {
    /// Total water demand (m³).
    pub demand_m3: f64,
    /// Water this farm may take from community storage (m³).
    pub storage_available_m3: f64,
    /// Groundwater this farm can draw this period (m³): the smallest of well
    /// capacity, treatment capacity, and residual aquifer volume.
    pub groundwater_capacity_m3: f64,
    /// Municipal supply available this period (m³).
    pub municipal_capacity_m3: f64,
    /// Marginal groundwater cost ($/m³).
    pub groundwater_cost_per_m3: f64,
    /// Groundwater energy, pumping plus treatment (kWh/m³).
    pub groundwater_energy_kwh_per_m3: f64,
    /// Municipal tariff ($/m³).
    pub municipal_tariff_per_m3: f64,
}

/// Input to an energy-dispatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EnergyContext {
    /// Energy demand to serve (kWh).
    pub demand_kwh: f64,
    /// Renewable generation available (kWh).
    pub renewable_available_kwh: f64,
    /// Grid import capacity (kWh).
    pub grid_capacity_kwh: f64,
    /// Generator capacity (kWh).
    pub generator_capacity_kwh: f64,
    /// Grid import price ($/kWh).
    pub grid_price_per_kwh: f64,
    /// Generator fuel cost ($/kWh).
    pub generator_cost_per_kwh: f64,
    /// Export price for surplus renewables ($/kWh).
    pub export_price_per_kwh: f64,
}

/// Input to a market policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketContext {
    /// Fresh product that must be sold this period (kg).
    pub fresh_kg: f64,
    /// Storable product: inventory on hand plus this period's processed
    /// output (kg).
    pub storable_kg: f64,
    /// Price this period ($/kg).
    pub price_per_kg: f64,
    /// Price relative to the base crop price.
    pub price_multiplier: f64,
    /// Warehouse capacity for storable product (kg).
    pub storage_capacity_kg: f64,
}

impl MarketContext {
    /// Everything that could be sold this period (kg).
    pub fn sellable_kg(&self) -> f64 {
        self.fresh_kg + self.storable_kg
    }
}

/// Input to an economic policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EconomicContext {
    /// Revenue minus water, energy, and processing cost for the period ($).
    pub net_income: f64,
    /// Cash on hand before this period's allocation ($).
    pub cash_on_hand: f64,
    /// Outstanding debt ($).
    pub debt_outstanding: f64,
}

impl EconomicContext {
    /// The amount a policy must allocate: positive net income, else zero.
    pub fn allocable(&self) -> f64 {
        self.net_income.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sellable_is_fresh_plus_storable() {
        let ctx = MarketContext {
            fresh_kg: 120.0,
            storable_kg: 30.0,
            price_per_kg: 1.0,
            price_multiplier: 1.0,
            storage_capacity_kg: 500.0,
        };
        assert!((ctx.sellable_kg() - 150.0).abs() < 1e-12);
    }

    #[test]
    fn processing_rates_weight_by_line() {
        let rates = ProcessingRates {
            packaged: LineRates {
                energy_kwh_per_kg: 0.1,
                water_m3_per_kg: 0.001,
                cost_per_kg: 0.05,
            },
            canned: LineRates {
                energy_kwh_per_kg: 0.5,
                water_m3_per_kg: 0.004,
                cost_per_kg: 0.2,
            },
            dried: LineRates::default(),
        };
        assert!((rates.cost(100.0, 10.0, 1_000.0) - 7.0).abs() < 1e-12);
        assert!((rates.energy_kwh(100.0, 10.0, 0.0) - 15.0).abs() < 1e-12);
        assert!((rates.water_m3(100.0, 10.0, 0.0) - 0.14).abs() < 1e-12);
    }

    #[test]
    fn losses_are_not_allocable() {
        let ctx = EconomicContext {
            net_income: -40.0,
            cash_on_hand: 100.0,
            debt_outstanding: 0.0,
        };
        assert!(ctx.allocable().abs() < 1e-12);
    }
}
