//! Scenario configuration and typed config structures.
//!
//! A scenario file is YAML. It names the run, sets the calendar, describes
//! the shared aquifer and storage, lists prices, and declares the farms in
//! the order they are evaluated each period:
//!
//! ```yaml
//! scenario:
//!   name: valley
//!   start_date: 2025-01-01
//!   granularity: daily
//!   horizon_periods: 365
//! aquifer:
//!   initial_volume_m3: 1000000.0
//!   recharge_rate_m3_per_year: 50000.0
//!   max_drawdown_m: 20.0
//!   well_depth_m: 60.0
//! storage:
//!   capacity_m3: 2000.0
//! farms:
//!   - name: north
//!     area_ha: 10.0
//!     equipment: { well: well_standard, treatment: treatment_standard }
//!     policies:
//!       water: { name: quota_enforced, groundwater_quota_m3: 300.0 }
//! ```
//!
//! Every optional field has a default. Loading only checks syntax;
//! [`ScenarioConfig::validate`] checks values and runs before any state is
//! built.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use farmstead_policies::{PolicyError, PolicySet};
use farmstead_resources::{AquiferParams, ResourceError, StorageParams};
use farmstead_types::Granularity;
use serde::Deserialize;

use crate::clock::ClockError;
use crate::reference::EquipmentCategory;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when loading or validating configuration, reference
/// data, or exogenous series.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What was wrong.
        reason: String,
    },

    /// A farm names equipment the reference data does not contain.
    #[error("farm {farm}: unknown equipment key {key}")]
    UnknownEquipment {
        /// The farm naming the key.
        farm: String,
        /// The missing key.
        key: String,
    },

    /// A farm put equipment of one category in a slot for another.
    #[error("farm {farm}: equipment {key} is {actual}, expected {expected}")]
    WrongCategory {
        /// The farm naming the key.
        farm: String,
        /// The offending key.
        key: String,
        /// Category the slot requires.
        expected: EquipmentCategory,
        /// Category the key actually has.
        actual: EquipmentCategory,
    },

    /// The exogenous series is shorter than the horizon.
    #[error("exogenous series has {available} periods, horizon needs {needed}")]
    SeriesTooShort {
        /// Periods the run needs.
        needed: u32,
        /// Periods the series holds.
        available: usize,
    },

    /// An exogenous series entry holds an unusable value.
    #[error("exogenous series period {period}: {reason}")]
    InvalidSeries {
        /// Zero-based period of the bad entry.
        period: usize,
        /// What was wrong.
        reason: String,
    },

    /// A farm selected a policy with bad parameters.
    #[error("farm {farm}: {source}")]
    Policy {
        /// The farm whose policy is invalid.
        farm: String,
        /// The underlying policy error.
        source: PolicyError,
    },

    /// Aquifer or storage parameters were rejected.
    #[error("resource parameters rejected: {source}")]
    Resource {
        /// The underlying resource error.
        #[from]
        source: ResourceError,
    },

    /// The calendar cannot cover the horizon.
    #[error("calendar error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Reject NaN, infinities, and negatives.
pub(crate) fn check_non_negative(what: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{what} must be finite and non-negative, got {value}")))
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// A complete scenario as loaded from YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Name, calendar, and horizon.
    pub scenario: ScenarioSection,

    /// The shared aquifer.
    pub aquifer: AquiferParams,

    /// The shared community storage.
    pub storage: StorageParams,

    /// Base prices and their annual escalation.
    #[serde(default)]
    pub prices: PriceConfig,

    /// Farms in evaluation order.
    pub farms: Vec<FarmConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScenarioConfig {
    /// Load a scenario from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the contents are not a valid scenario.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }

    /// Parse a scenario from a YAML string. No environment overrides are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not a valid scenario.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Check every value that YAML typing alone cannot.
    ///
    /// Aquifer and storage parameters are checked when their state is
    /// constructed; equipment keys are checked against reference data when
    /// the scenario is built.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scenario.validate()?;
        self.prices.validate()?;
        if self.farms.is_empty() {
            return Err(invalid("scenario declares no farms"));
        }
        let mut seen = BTreeSet::new();
        for farm in &self.farms {
            if !seen.insert(farm.name.as_str()) {
                return Err(invalid(format!("duplicate farm name {}", farm.name)));
            }
            farm.validate()?;
        }
        Ok(())
    }

    /// Look up a farm by name.
    pub fn farm(&self, name: &str) -> Option<&FarmConfig> {
        self.farms.iter().find(|f| f.name == name)
    }

    /// Mutable lookup of a farm by name.
    pub fn farm_mut(&mut self, name: &str) -> Option<&mut FarmConfig> {
        self.farms.iter_mut().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Scenario section
// ---------------------------------------------------------------------------

/// Run identity and calendar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSection {
    /// Scenario name; also the source of the scenario ID.
    pub name: String,

    /// Date of period zero.
    pub start_date: NaiveDate,

    /// Period length.
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,

    /// Number of periods to run.
    pub horizon_periods: u32,

    /// End the run early once the aquifer is exhausted.
    #[serde(default)]
    pub stop_on_aquifer_depletion: bool,

    /// Seed for synthetic exogenous drivers.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl ScenarioSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(invalid("scenario name must not be empty"));
        }
        if self.horizon_periods == 0 {
            return Err(invalid("horizon_periods must be at least 1"));
        }
        Ok(())
    }
}

const fn default_granularity() -> Granularity {
    Granularity::Daily
}

const fn default_seed() -> u64 {
    42
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Base prices in force at period zero, and their annual escalation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceConfig {
    /// Grid energy price ($/kWh).
    #[serde(default = "default_energy_price")]
    pub energy_price_per_kwh: f64,

    /// Municipal water tariff ($/m³).
    #[serde(default = "default_municipal_tariff")]
    pub municipal_tariff_per_m3: f64,

    /// Base groundwater maintenance ($/m³), before equipment-specific
    /// maintenance is added.
    #[serde(default = "default_groundwater_maintenance")]
    pub groundwater_maintenance_per_m3: f64,

    /// Price paid for exported renewable surplus ($/kWh).
    #[serde(default = "default_export_price")]
    pub grid_export_price_per_kwh: f64,

    /// Generator fuel cost ($/kWh).
    #[serde(default = "default_generator_cost")]
    pub generator_cost_per_kwh: f64,

    /// Base crop price ($/kg) before the seasonal multiplier.
    #[serde(default = "default_crop_price")]
    pub crop_price_per_kg: f64,

    /// Annual grid price escalation (percent).
    #[serde(default = "default_energy_escalation")]
    pub energy_escalation_pct: f64,

    /// Annual municipal tariff escalation (percent).
    #[serde(default = "default_tariff_escalation")]
    pub tariff_escalation_pct: f64,

    /// Annual interest charged on outstanding farm debt (percent).
    #[serde(default)]
    pub debt_interest_pct: f64,
}

impl PriceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("energy_price_per_kwh", self.energy_price_per_kwh)?;
        check_non_negative("municipal_tariff_per_m3", self.municipal_tariff_per_m3)?;
        check_non_negative(
            "groundwater_maintenance_per_m3",
            self.groundwater_maintenance_per_m3,
        )?;
        check_non_negative("grid_export_price_per_kwh", self.grid_export_price_per_kwh)?;
        check_non_negative("generator_cost_per_kwh", self.generator_cost_per_kwh)?;
        check_non_negative("crop_price_per_kg", self.crop_price_per_kg)?;
        check_non_negative("debt_interest_pct", self.debt_interest_pct)?;
        for (what, pct) in [
            ("energy_escalation_pct", self.energy_escalation_pct),
            ("tariff_escalation_pct", self.tariff_escalation_pct),
        ] {
            if !pct.is_finite() || pct <= -100.0 {
                return Err(invalid(format!("{what} must be finite and above -100, got {pct}")));
            }
        }
        Ok(())
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            energy_price_per_kwh: default_energy_price(),
            municipal_tariff_per_m3: default_municipal_tariff(),
            groundwater_maintenance_per_m3: default_groundwater_maintenance(),
            grid_export_price_per_kwh: default_export_price(),
            generator_cost_per_kwh: default_generator_cost(),
            crop_price_per_kg: default_crop_price(),
            energy_escalation_pct: default_energy_escalation(),
            tariff_escalation_pct: default_tariff_escalation(),
            debt_interest_pct: 0.0,
        }
    }
}

const fn default_energy_price() -> f64 {
    0.12
}

const fn default_municipal_tariff() -> f64 {
    0.65
}

const fn default_groundwater_maintenance() -> f64 {
    0.05
}

const fn default_export_price() -> f64 {
    0.04
}

const fn default_generator_cost() -> f64 {
    0.35
}

const fn default_crop_price() -> f64 {
    1.2
}

const fn default_energy_escalation() -> f64 {
    2.0
}

const fn default_tariff_escalation() -> f64 {
    3.0
}

// ---------------------------------------------------------------------------
// Farms
// ---------------------------------------------------------------------------

/// One farm's declaration. Capacities are per day and are scaled to the
/// period length when contexts are built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FarmConfig {
    /// Unique farm name; also the source of the farm ID.
    pub name: String,

    /// Cultivated area (ha).
    pub area_ha: f64,

    /// Installed photovoltaic capacity (kW).
    #[serde(default)]
    pub pv_kw: f64,

    /// Reference-data keys of the farm's equipment.
    pub equipment: EquipmentSelection,

    /// Policy per domain.
    #[serde(default)]
    pub policies: PolicySet,

    /// Maximum daily draw from community storage (m³).
    #[serde(default = "default_storage_allowance")]
    pub storage_allowance_m3_per_day: f64,

    /// Municipal connection capacity (m³ per day).
    #[serde(default = "default_municipal_capacity")]
    pub municipal_capacity_m3_per_day: f64,

    /// Grid connection capacity (kWh per day).
    #[serde(default = "default_grid_capacity")]
    pub grid_capacity_kwh_per_day: f64,

    /// Warehouse capacity for storable product (kg).
    #[serde(default = "default_inventory_capacity")]
    pub inventory_capacity_kg: f64,

    /// Cash at period zero ($).
    #[serde(default)]
    pub initial_cash: f64,

    /// Debt at period zero ($).
    #[serde(default)]
    pub initial_debt: f64,
}

impl FarmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(invalid("farm name must not be empty"));
        }
        let scoped = |what: &str| format!("farm {}: {what}", self.name);
        if !self.area_ha.is_finite() || self.area_ha <= 0.0 {
            return Err(invalid(scoped("area_ha must be positive")));
        }
        check_non_negative(&scoped("pv_kw"), self.pv_kw)?;
        check_non_negative(
            &scoped("storage_allowance_m3_per_day"),
            self.storage_allowance_m3_per_day,
        )?;
        check_non_negative(
            &scoped("municipal_capacity_m3_per_day"),
            self.municipal_capacity_m3_per_day,
        )?;
        check_non_negative(
            &scoped("grid_capacity_kwh_per_day"),
            self.grid_capacity_kwh_per_day,
        )?;
        check_non_negative(&scoped("inventory_capacity_kg"), self.inventory_capacity_kg)?;
        check_non_negative(&scoped("initial_debt"), self.initial_debt)?;
        if !self.initial_cash.is_finite() {
            return Err(invalid(scoped("initial_cash must be finite")));
        }
        self.policies
            .validate()
            .map_err(|source| ConfigError::Policy {
                farm: self.name.clone(),
                source,
            })
    }
}

/// Reference-data keys for a farm's equipment. Processing lines and the
/// generator are optional; a missing line has zero capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipmentSelection {
    /// Well and pump.
    pub well: String,
    /// Groundwater treatment unit.
    pub treatment: String,
    /// Packaging line.
    #[serde(default)]
    pub packaging: Option<String>,
    /// Canning line.
    #[serde(default)]
    pub canning: Option<String>,
    /// Dryer.
    #[serde(default)]
    pub drying: Option<String>,
    /// Backup generator.
    #[serde(default)]
    pub generator: Option<String>,
}

const fn default_storage_allowance() -> f64 {
    50.0
}

const fn default_municipal_capacity() -> f64 {
    500.0
}

const fn default_grid_capacity() -> f64 {
    1_000.0
}

const fn default_inventory_capacity() -> f64 {
    20_000.0
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// Override fields from `FARMSTEAD_LOG_LEVEL` and `FARMSTEAD_LOG_JSON`
    /// when they are set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FARMSTEAD_LOG_LEVEL") {
            self.level = val;
        }
        if let Ok(val) = std::env::var("FARMSTEAD_LOG_JSON") {
            self.json = matches!(val.as_str(), "1" | "true" | "yes");
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    String::from("info")
}
