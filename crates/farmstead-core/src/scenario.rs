//! Mutable scenario state: the shared resources, prices, and farms.
//!
//! [`ScenarioState::build`] validates a [`ScenarioConfig`], resolves every
//! farm's equipment against [`ReferenceData`], and constructs the aquifer
//! and storage. The resulting state is owned by exactly one orchestrator
//! run; nothing else holds a mutable reference to the shared resources.

use farmstead_ledger::LogHeader;
use farmstead_policies::PolicySet;
use farmstead_resources::{AquiferState, WaterStorageState};
use farmstead_types::{
    FarmCarried, FarmEntry, FarmId, FarmProfile, LineRates, ProcessingCapacity, ProcessingRates,
    ScenarioId,
};
use tracing::debug;

use crate::clock::PeriodClock;
use crate::config::{ConfigError, FarmConfig, PriceConfig, ScenarioConfig};
use crate::reference::{EquipmentCategory, EquipmentSpec, ReferenceData};

// ---------------------------------------------------------------------------
// Farm specification
// ---------------------------------------------------------------------------

/// A farm's equipment and connections resolved to per-day figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarmSpec {
    /// Cultivated area (ha).
    pub area_ha: f64,
    /// Installed photovoltaic capacity (kW).
    pub pv_kw: f64,
    /// Well capacity (m³/day).
    pub well_capacity_m3_per_day: f64,
    /// Treatment capacity (m³/day).
    pub treatment_capacity_m3_per_day: f64,
    /// Treatment energy (kWh/m³).
    pub treatment_energy_kwh_per_m3: f64,
    /// Well plus treatment maintenance ($/m³).
    pub equipment_maintenance_per_m3: f64,
    /// Municipal connection capacity (m³/day).
    pub municipal_capacity_m3_per_day: f64,
    /// Grid connection capacity (kWh/day).
    pub grid_capacity_kwh_per_day: f64,
    /// Generator capacity (kWh/day); zero without a generator.
    pub generator_capacity_kwh_per_day: f64,
    /// Generator maintenance ($/kWh) on top of fuel.
    pub generator_maintenance_per_kwh: f64,
    /// Storage draw allowance (m³/day).
    pub storage_allowance_m3_per_day: f64,
    /// Processing line capacities (kg/day).
    pub processing_per_day: ProcessingCapacity,
    /// Processing line running rates.
    pub processing_rates: ProcessingRates,
    /// Warehouse capacity (kg); not scaled with period length.
    pub inventory_capacity_kg: f64,
    /// Total up-front equipment cost ($).
    pub capital_cost: f64,
}

fn line(spec: Option<&EquipmentSpec>) -> (f64, LineRates) {
    spec.map_or((0.0, LineRates::default()), |s| {
        (
            s.capacity_per_day,
            LineRates {
                energy_kwh_per_kg: s.energy_kwh_per_unit,
                water_m3_per_kg: s.water_m3_per_unit,
                cost_per_kg: s.maintenance_per_unit,
            },
        )
    })
}

impl FarmSpec {
    /// Resolve a farm's equipment keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEquipment`] or
    /// [`ConfigError::WrongCategory`] for a bad key.
    pub fn resolve(farm: &FarmConfig, reference: &ReferenceData) -> Result<Self, ConfigError> {
        let name = farm.name.as_str();
        let eq = &farm.equipment;
        let well = reference.lookup(name, &eq.well, EquipmentCategory::Well)?;
        let treatment = reference.lookup(name, &eq.treatment, EquipmentCategory::Treatment)?;
        let packaging =
            reference.lookup_optional(name, eq.packaging.as_deref(), EquipmentCategory::Packaging)?;
        let canning =
            reference.lookup_optional(name, eq.canning.as_deref(), EquipmentCategory::Canning)?;
        let drying =
            reference.lookup_optional(name, eq.drying.as_deref(), EquipmentCategory::Drying)?;
        let generator =
            reference.lookup_optional(name, eq.generator.as_deref(), EquipmentCategory::Generator)?;

        let (packaged_kg, packaged) = line(packaging);
        let (canned_kg, canned) = line(canning);
        let (dried_kg, dried) = line(drying);

        let capital_cost = [Some(well), Some(treatment), packaging, canning, drying, generator]
            .into_iter()
            .flatten()
            .map(|s| s.capital_cost)
            .sum();

        Ok(Self {
            area_ha: farm.area_ha,
            pv_kw: farm.pv_kw,
            well_capacity_m3_per_day: well.capacity_per_day,
            treatment_capacity_m3_per_day: treatment.capacity_per_day,
            treatment_energy_kwh_per_m3: treatment.energy_kwh_per_unit,
            equipment_maintenance_per_m3: well.maintenance_per_unit
                + treatment.maintenance_per_unit,
            municipal_capacity_m3_per_day: farm.municipal_capacity_m3_per_day,
            grid_capacity_kwh_per_day: farm.grid_capacity_kwh_per_day,
            generator_capacity_kwh_per_day: generator.map_or(0.0, |g| g.capacity_per_day),
            generator_maintenance_per_kwh: generator.map_or(0.0, |g| g.maintenance_per_unit),
            storage_allowance_m3_per_day: farm.storage_allowance_m3_per_day,
            processing_per_day: ProcessingCapacity {
                packaged_kg,
                canned_kg,
                dried_kg,
            },
            processing_rates: ProcessingRates {
                packaged,
                canned,
                dried,
            },
            inventory_capacity_kg: farm.inventory_capacity_kg,
            capital_cost,
        })
    }

    /// The farm's profile for a period `days` long.
    pub fn profile(&self, days: u32) -> FarmProfile {
        let d = f64::from(days);
        FarmProfile {
            area_ha: self.area_ha,
            pv_kw: self.pv_kw,
            well_capacity_m3: self.well_capacity_m3_per_day * d,
            treatment_capacity_m3: self.treatment_capacity_m3_per_day * d,
            treatment_energy_kwh_per_m3: self.treatment_energy_kwh_per_m3,
            municipal_capacity_m3: self.municipal_capacity_m3_per_day * d,
            grid_capacity_kwh: self.grid_capacity_kwh_per_day * d,
            generator_capacity_kwh: self.generator_capacity_kwh_per_day * d,
            storage_allowance_m3: self.storage_allowance_m3_per_day * d,
            processing: ProcessingCapacity {
                packaged_kg: self.processing_per_day.packaged_kg * d,
                canned_kg: self.processing_per_day.canned_kg * d,
                dried_kg: self.processing_per_day.dried_kg * d,
            },
            processing_rates: self.processing_rates,
            inventory_capacity_kg: self.inventory_capacity_kg,
        }
    }
}

// ---------------------------------------------------------------------------
// Farm state
// ---------------------------------------------------------------------------

/// One farm within a running scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmState {
    pub(crate) id: FarmId,
    pub(crate) name: String,
    pub(crate) spec: FarmSpec,
    pub(crate) policies: PolicySet,
    pub(crate) carried: FarmCarried,
}

impl FarmState {
    /// Name-derived farm identifier.
    pub const fn id(&self) -> FarmId {
        self.id
    }

    /// Declared farm name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved equipment.
    pub const fn spec(&self) -> &FarmSpec {
        &self.spec
    }

    /// Selected policies.
    pub const fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// State carried into the next period.
    pub const fn carried(&self) -> &FarmCarried {
        &self.carried
    }

    fn entry(&self) -> FarmEntry {
        FarmEntry {
            farm_id: self.id,
            farm_name: self.name.clone(),
            capital_cost: self.spec.capital_cost,
            policies: self.policies.names(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario state
// ---------------------------------------------------------------------------

/// Everything a run mutates, plus the facts it needs to describe itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioState {
    pub(crate) name: String,
    pub(crate) id: ScenarioId,
    pub(crate) clock: PeriodClock,
    pub(crate) horizon: u32,
    pub(crate) stop_on_depletion: bool,
    pub(crate) aquifer: AquiferState,
    pub(crate) storage: WaterStorageState,
    pub(crate) prices: PriceConfig,
    pub(crate) farms: Vec<FarmState>,
}

impl ScenarioState {
    /// Validate `config` and build the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid values, unresolvable equipment,
    /// rejected resource parameters, or a horizon the calendar cannot
    /// cover. Nothing is built unless everything checks out.
    pub fn build(config: &ScenarioConfig, reference: &ReferenceData) -> Result<Self, ConfigError> {
        config.validate()?;
        let aquifer = AquiferState::new(config.aquifer)?;
        let storage = WaterStorageState::new(config.storage)?;

        let section = &config.scenario;
        let clock = PeriodClock::new(section.start_date, section.granularity);
        // The last period's length depends on the date after it.
        clock.days_in_period(section.horizon_periods.saturating_sub(1))?;

        let farms = config
            .farms
            .iter()
            .map(|farm| {
                let spec = FarmSpec::resolve(farm, reference)?;
                debug!(
                    farm = farm.name,
                    capital_cost = spec.capital_cost,
                    well_m3_per_day = spec.well_capacity_m3_per_day,
                    "Farm equipment resolved"
                );
                Ok(FarmState {
                    id: FarmId::from_name(&farm.name),
                    name: farm.name.clone(),
                    spec,
                    policies: farm.policies,
                    carried: FarmCarried {
                        cash: farm.initial_cash,
                        debt: farm.initial_debt,
                        ..FarmCarried::default()
                    },
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            name: section.name.clone(),
            id: ScenarioId::from_name(&section.name),
            clock,
            horizon: section.horizon_periods,
            stop_on_depletion: section.stop_on_aquifer_depletion,
            aquifer,
            storage,
            prices: config.prices,
            farms,
        })
    }

    /// Scenario name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name-derived scenario identifier.
    pub const fn id(&self) -> ScenarioId {
        self.id
    }

    /// The run calendar.
    pub const fn clock(&self) -> &PeriodClock {
        &self.clock
    }

    /// Configured number of periods.
    pub const fn horizon(&self) -> u32 {
        self.horizon
    }

    /// The shared aquifer.
    pub const fn aquifer(&self) -> &AquiferState {
        &self.aquifer
    }

    /// The shared community storage.
    pub const fn storage(&self) -> &WaterStorageState {
        &self.storage
    }

    /// Prices currently in force.
    pub const fn prices(&self) -> &PriceConfig {
        &self.prices
    }

    /// Farms in evaluation order.
    pub fn farms(&self) -> &[FarmState] {
        &self.farms
    }

    /// The decision log header describing this scenario.
    pub fn log_header(&self) -> LogHeader {
        LogHeader {
            scenario_name: self.name.clone(),
            scenario_id: self.id,
            granularity: self.clock.granularity(),
            start_date: self.clock.start_date(),
            aquifer_initial_m3: self.aquifer.initial_volume_m3(),
            farms: self.farms.iter().map(FarmState::entry).collect(),
        }
    }
}
