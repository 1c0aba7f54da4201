//! Shared type definitions for the Farmstead allocation engine.
//!
//! This crate is the single source of truth for the types that flow between
//! the resource states, the policies, the orchestrator, and the reporting
//! layers. Record types are exported to `TypeScript` via `ts-rs` for the
//! reporting dashboards.
//!
//! # Modules
//!
//! - [`ids`] -- Name-derived UUID wrappers for farms and scenarios
//! - [`enums`] -- Domains, sources, pathways, granularity, end reasons
//! - [`context`] -- Immutable allocation contexts consumed by policies
//! - [`decisions`] -- Per-domain allocation decisions
//! - [`records`] -- Period records making up the decision log

pub mod context;
pub mod decisions;
pub mod enums;
pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use context::{
    AllocationContext, CropContext, EconomicContext, EnergyContext, FarmCarried, FarmProfile,
    LineRates, MarketContext, PeriodDrivers, PriceSnapshot, ProcessingCapacity,
    ProcessingContext, ProcessingRates, ResourceReading, WaterContext,
};
pub use decisions::{
    CropDecision, EconomicDecision, EnergyDecision, FarmDecisions, MarketDecision,
    ProcessingDecision, WaterDecision,
};
pub use enums::{Domain, EndReason, EnergySource, Granularity, ProcessingPathway, WaterSource};
pub use ids::{FarmId, ScenarioId};
pub use records::{DrawShortfall, FarmEntry, FarmPeriodRecord, PeriodRecord, ResourceSnapshot};
