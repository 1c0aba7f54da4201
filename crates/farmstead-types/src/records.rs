//! Period records: the decision stream consumed by reporting and metrics.
//!
//! A run appends one [`PeriodRecord`] per completed period. Each record
//! holds every farm's decisions plus the post-update snapshot of the shared
//! resources, which is enough to re-derive all summary metrics without any
//! other state.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::decisions::FarmDecisions;
use crate::enums::Domain;
use crate::ids::FarmId;

/// Shortfalls discovered while applying a farm's draws to shared state.
///
/// These arise when the shared resource could not honour a validated
/// decision in full (for example after clamping at zero remaining volume).
/// They are recorded as unmet demand and never abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DrawShortfall {
    /// Storage withdrawal not delivered (m³).
    pub storage_m3: f64,
    /// Aquifer extraction not delivered (m³).
    pub groundwater_m3: f64,
}

impl DrawShortfall {
    /// Total undelivered water (m³).
    pub fn total_m3(&self) -> f64 {
        self.storage_m3 + self.groundwater_m3
    }
}

/// One farm's outcome for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FarmPeriodRecord {
    /// The farm.
    pub farm_id: FarmId,
    /// Declared farm name.
    pub farm_name: String,
    /// The validated decisions.
    pub decisions: FarmDecisions,
    /// Shortfalls found while applying draws.
    pub shortfall: DrawShortfall,
    /// Period net income ($).
    pub net_income: f64,
    /// Cash after the period ($).
    pub cash_after: f64,
    /// Debt after the period ($).
    pub debt_after: f64,
    /// Storable inventory after the period (kg).
    pub inventory_after_kg: f64,
}

/// Post-update state of the shared resources at the end of a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceSnapshot {
    /// Exploitable aquifer volume remaining (m³).
    pub aquifer_remaining_m3: f64,
    /// Remaining volume as a fraction of the initial volume.
    pub aquifer_remaining_fraction: f64,
    /// Cumulative extraction since the start of the run (m³).
    pub cumulative_extraction_m3: f64,
    /// Drawdown (m).
    pub drawdown_m: f64,
    /// Pumping energy at the new head (kWh/m³).
    pub pumping_energy_kwh_per_m3: f64,
    /// Aquifer recharge applied at the start of this period (m³).
    pub recharge_m3: f64,
    /// Water in community storage (m³).
    pub storage_volume_m3: f64,
    /// Storage volume as a fraction of capacity.
    pub storage_fill_fraction: f64,
    /// Inflow accepted into storage this period (m³).
    pub storage_inflow_m3: f64,
    /// Inflow spilled because storage was full (m³).
    pub storage_spill_m3: f64,
    /// Evaporation loss this period (m³).
    pub evaporation_m3: f64,
}

/// Everything recorded for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PeriodRecord {
    /// Zero-based period index.
    pub period: u32,
    /// Calendar date on which the period starts.
    pub date: NaiveDate,
    /// Zero-based year index relative to the run start.
    pub year_index: u32,
    /// Farm records in declaration order.
    pub farms: Vec<FarmPeriodRecord>,
    /// Shared resource state after all farms' draws.
    pub resources: ResourceSnapshot,
}

/// A farm as declared in the scenario, with its resolved policy names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FarmEntry {
    /// The farm.
    pub farm_id: FarmId,
    /// Declared farm name.
    pub farm_name: String,
    /// Up-front capital cost of the farm's selected equipment ($).
    pub capital_cost: f64,
    /// Selected policy name per domain.
    pub policies: BTreeMap<Domain, String>,
}
