//! Allocation decisions produced by policies.
//!
//! Each decision fully accounts for its domain's demand across sources and
//! sinks (the closure invariant). Verification lives in
//! `farmstead-ledger::closure`; the orchestrator refuses to apply any
//! decision that fails it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Irrigation decision for one farm and period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CropDecision {
    /// Full irrigation requirement (m³).
    pub requirement_m3: f64,
    /// Irrigation actually scheduled (m³).
    pub applied_m3: f64,
    /// Requirement deliberately left unirrigated (m³).
    pub deficit_m3: f64,
}

/// Routing of the harvest through processing pathways.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessingDecision {
    /// Harvest routed this period (kg).
    pub harvest_kg: f64,
    /// Sold fresh (kg).
    pub fresh_kg: f64,
    /// Packaged (kg).
    pub packaged_kg: f64,
    /// Canned (kg).
    pub canned_kg: f64,
    /// Dried (kg).
    pub dried_kg: f64,
    /// Running cost of the processed share ($).
    pub cost: f64,
}

impl ProcessingDecision {
    /// Product that went through a processing line (kg).
    pub fn processed_kg(&self) -> f64 {
        self.packaged_kg + self.canned_kg + self.dried_kg
    }
}

/// Water sourcing decision for one farm and period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WaterDecision {
    /// Total demand (m³).
    pub demand_m3: f64,
    /// Drawn from community storage (m³).
    pub storage_m3: f64,
    /// Drawn from the aquifer (m³).
    pub groundwater_m3: f64,
    /// Bought from the municipal network (m³).
    pub municipal_m3: f64,
    /// Demand no source could serve (m³).
    pub unmet_m3: f64,
    /// Pumping and treatment energy for the groundwater share (kWh).
    pub groundwater_energy_kwh: f64,
    /// Realized groundwater cost ($).
    pub groundwater_cost: f64,
    /// Realized municipal cost ($).
    pub municipal_cost: f64,
}

impl WaterDecision {
    /// Total realized water cost ($).
    pub fn cost(&self) -> f64 {
        self.groundwater_cost + self.municipal_cost
    }

    /// Water actually delivered (m³).
    pub fn delivered_m3(&self) -> f64 {
        self.storage_m3 + self.groundwater_m3 + self.municipal_m3
    }
}

/// Energy dispatch decision for one farm and period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EnergyDecision {
    /// Demand to serve (kWh).
    pub demand_kwh: f64,
    /// Renewables used on site (kWh).
    pub renewable_kwh: f64,
    /// Grid import (kWh).
    pub grid_kwh: f64,
    /// Generator output (kWh).
    pub generator_kwh: f64,
    /// Demand left unserved (kWh).
    pub unmet_kwh: f64,
    /// Renewable generation available (kWh).
    pub renewable_available_kwh: f64,
    /// Surplus renewables exported (kWh).
    pub exported_kwh: f64,
    /// Realized grid cost ($).
    pub grid_cost: f64,
    /// Realized generator cost ($).
    pub generator_cost: f64,
    /// Credit earned on exports ($).
    pub export_credit: f64,
}

impl EnergyDecision {
    /// Net realized energy cost ($); negative when exports dominate.
    pub fn net_cost(&self) -> f64 {
        self.grid_cost + self.generator_cost - self.export_credit
    }
}

/// Sell-or-store decision for one farm and period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketDecision {
    /// Everything that could be sold (kg).
    pub sellable_kg: f64,
    /// Fresh share of the sellable product (kg); always sold.
    pub fresh_kg: f64,
    /// Sold this period (kg).
    pub sold_kg: f64,
    /// Carried into the warehouse (kg).
    pub stored_kg: f64,
    /// Realized revenue ($).
    pub revenue: f64,
}

/// Allocation of period net income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EconomicDecision {
    /// Net income of the period ($); may be negative.
    pub net_income: f64,
    /// Positive part of the net income, the amount allocated ($).
    pub allocable: f64,
    /// Added to the cash reserve ($).
    pub reserve: f64,
    /// Paid against outstanding debt ($).
    pub debt_repayment: f64,
    /// Spent on reinvestment ($).
    pub reinvestment: f64,
}

/// All six domain decisions for one farm and period, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FarmDecisions {
    /// Irrigation.
    pub crop: CropDecision,
    /// Processing.
    pub processing: ProcessingDecision,
    /// Water sourcing.
    pub water: WaterDecision,
    /// Energy dispatch.
    pub energy: EnergyDecision,
    /// Market.
    pub market: MarketDecision,
    /// Income allocation.
    pub economic: EconomicDecision,
}
