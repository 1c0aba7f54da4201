//! Equipment reference data.
//!
//! Farms name their equipment by key; the [`ReferenceData`] catalogue maps
//! each key to capacities and unit rates. A catalogue ships with the crate
//! ([`ReferenceData::builtin`]) and can be replaced by a YAML file of the
//! same shape.
//!
//! Units depend on the category:
//!
//! | Category | Capacity | Energy | Water | Maintenance |
//! |---|---|---|---|---|
//! | well, treatment | m³/day | kWh/m³ | - | $/m³ |
//! | packaging, canning, drying | kg/day | kWh/kg | m³/kg | $/kg |
//! | generator | kWh/day | - | - | $/kWh |

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::config::{ConfigError, check_non_negative};

const BUILTIN_REFERENCE: &str = include_str!("../data/reference.yaml");

/// What slot a piece of equipment fills on a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCategory {
    /// Well and pump.
    Well,
    /// Groundwater treatment.
    Treatment,
    /// Packaging line.
    Packaging,
    /// Canning line.
    Canning,
    /// Dryer.
    Drying,
    /// Backup generator.
    Generator,
}

impl EquipmentCategory {
    /// Snake-case name, as written in YAML.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Well => "well",
            Self::Treatment => "treatment",
            Self::Packaging => "packaging",
            Self::Canning => "canning",
            Self::Drying => "drying",
            Self::Generator => "generator",
        }
    }
}

impl fmt::Display for EquipmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquipmentSpec {
    /// Slot the equipment fills.
    pub category: EquipmentCategory,
    /// Throughput per day, in the category's unit.
    pub capacity_per_day: f64,
    /// Up-front purchase cost ($).
    #[serde(default)]
    pub capital_cost: f64,
    /// Energy per unit of throughput (kWh).
    #[serde(default)]
    pub energy_kwh_per_unit: f64,
    /// Water per unit of throughput (m³).
    #[serde(default)]
    pub water_m3_per_unit: f64,
    /// Running cost per unit of throughput ($).
    #[serde(default)]
    pub maintenance_per_unit: f64,
}

/// Equipment catalogue keyed by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceData {
    /// Entries by key.
    pub equipment: BTreeMap<String, EquipmentSpec>,
}

impl ReferenceData {
    /// The catalogue shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] only if the embedded file is malformed.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_REFERENCE)
    }

    /// Load and validate a catalogue from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not a catalogue, and
    /// [`ConfigError::Invalid`] for negative or non-finite values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate a catalogue from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let data: Self = serde_yml::from_str(yaml)?;
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, spec) in &self.equipment {
            check_non_negative(&format!("{key}.capacity_per_day"), spec.capacity_per_day)?;
            check_non_negative(&format!("{key}.capital_cost"), spec.capital_cost)?;
            check_non_negative(&format!("{key}.energy_kwh_per_unit"), spec.energy_kwh_per_unit)?;
            check_non_negative(&format!("{key}.water_m3_per_unit"), spec.water_m3_per_unit)?;
            check_non_negative(
                &format!("{key}.maintenance_per_unit"),
                spec.maintenance_per_unit,
            )?;
        }
        Ok(())
    }

    /// Resolve `key` for `farm`, requiring it to be of `expected` category.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEquipment`] if the key is absent and
    /// [`ConfigError::WrongCategory`] if it belongs to another slot.
    pub fn lookup(
        &self,
        farm: &str,
        key: &str,
        expected: EquipmentCategory,
    ) -> Result<&EquipmentSpec, ConfigError> {
        let spec = self
            .equipment
            .get(key)
            .ok_or_else(|| ConfigError::UnknownEquipment {
                farm: farm.to_owned(),
                key: key.to_owned(),
            })?;
        if spec.category != expected {
            return Err(ConfigError::WrongCategory {
                farm: farm.to_owned(),
                key: key.to_owned(),
                expected,
                actual: spec.category,
            });
        }
        Ok(spec)
    }

    /// Resolve an optional slot; an empty slot resolves to `None`.
    ///
    /// # Errors
    ///
    /// Same as [`lookup`](Self::lookup) when a key is given.
    pub fn lookup_optional(
        &self,
        farm: &str,
        key: Option<&str>,
        expected: EquipmentCategory,
    ) -> Result<Option<&EquipmentSpec>, ConfigError> {
        key.map(|k| self.lookup(farm, k, expected)).transpose()
    }
}
