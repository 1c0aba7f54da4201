//! Enumeration types for the Farmstead allocation engine.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Decision domains
// ---------------------------------------------------------------------------

/// A decision domain with its own pluggable policy.
///
/// Domains are evaluated per farm per period in [`Domain::EVALUATION_ORDER`]
/// because later domains consume the decisions of earlier ones (irrigation
/// drives water demand, water and processing drive costs, the market drives
/// revenue, and revenue drives the economic allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Irrigation volume applied to the crop.
    Crop,
    /// Routing of the harvest through processing pathways.
    Processing,
    /// Sourcing of water across storage, groundwater, and municipal supply.
    Water,
    /// Dispatch of energy across renewables, grid, and backup generation.
    Energy,
    /// Selling versus storing product.
    Market,
    /// Allocation of period net income.
    Economic,
}

impl Domain {
    /// The fixed order in which domains are evaluated for each farm.
    pub const EVALUATION_ORDER: [Self; 6] = [
        Self::Crop,
        Self::Processing,
        Self::Water,
        Self::Energy,
        Self::Market,
        Self::Economic,
    ];

    /// Stable lowercase name used in logs and error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Processing => "processing",
            Self::Water => "water",
            Self::Energy => "energy",
            Self::Market => "market",
            Self::Economic => "economic",
        }
    }
}

impl core::fmt::Display for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A source of water for a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum WaterSource {
    /// Community storage tank (already paid for, zero marginal cost).
    Storage,
    /// Shared aquifer via the farm's well and treatment train.
    Groundwater,
    /// Municipal network at a fixed tariff.
    Municipal,
}

/// A source of energy for a farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    /// On-site photovoltaic generation.
    Renewable,
    /// Grid import at the energy price.
    Grid,
    /// Backup diesel generator at its fuel cost.
    Generator,
}

/// A pathway the harvest can be routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPathway {
    /// Sold fresh in the period of harvest; not storable.
    Fresh,
    /// Washed and packaged; storable.
    Packaged,
    /// Canned; storable.
    Canned,
    /// Dried; storable.
    Dried,
}

// ---------------------------------------------------------------------------
// Time and run outcome
// ---------------------------------------------------------------------------

/// Length of one simulation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One period is one calendar day.
    Daily,
    /// One period is one calendar year.
    Annual,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Every period of the configured horizon completed.
    HorizonReached,
    /// The aquifer reached zero exploitable volume and early stop is enabled.
    AquiferDepleted,
    /// A policy produced a decision that violated its closure invariant.
    InvalidDecision,
    /// Any other error ended the run before the horizon.
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_order_is_complete_and_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for domain in Domain::EVALUATION_ORDER {
            assert!(seen.insert(domain));
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn crop_precedes_water_precedes_economic() {
        let pos = |d: Domain| Domain::EVALUATION_ORDER.iter().position(|x| *x == d);
        assert!(pos(Domain::Crop) < pos(Domain::Water));
        assert!(pos(Domain::Water) < pos(Domain::Energy));
        assert!(pos(Domain::Market) < pos(Domain::Economic));
    }

    #[test]
    fn snake_case_serialization() {
        let json = serde_json::to_string(&Granularity::Daily).ok();
        assert_eq!(json.as_deref(), Some("\"daily\""));
        let parsed: Result<EndReason, _> = serde_json::from_str("\"aquifer_depleted\"");
        assert_eq!(parsed.ok(), Some(EndReason::AquiferDepleted));
    }
}
