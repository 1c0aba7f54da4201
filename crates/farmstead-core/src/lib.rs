//! Scenario configuration, context building, and orchestration for the
//! Farmstead engine.
//!
//! This crate turns a scenario file into a run: it resolves each farm's
//! equipment, builds the shared aquifer and storage, and drives every
//! farm's policies through the period loop, recording each period in the
//! decision log.
//!
//! # Modules
//!
//! - [`clock`] -- Period calendar: dates, year boundaries, and year
//!   fractions.
//! - [`config`] -- Scenario loading from YAML into strongly-typed structs.
//! - [`reference`] -- Equipment catalogue and key resolution.
//! - [`exogenous`] -- Per-period drivers, loaded or generated from a seed.
//! - [`scenario`] -- The mutable state a run owns.
//! - [`context`] -- Pure derivation of every policy's input.
//! - [`orchestrator`] -- The period loop, [`PeriodObserver`], and run
//!   results.
//! - [`sweep`] -- Parallel runs of independent scenarios.
//!
//! [`PeriodObserver`]: orchestrator::PeriodObserver

pub mod clock;
pub mod config;
pub mod context;
pub mod exogenous;
pub mod orchestrator;
pub mod reference;
pub mod scenario;
pub mod sweep;
