//! Stateless allocation policies for the Farmstead engine.
//!
//! Every decision domain has one policy enum whose variants are the
//! interchangeable decision rules. Selections are resolved from the scenario
//! file once, when the scenario is built, and then dispatched by `match` each
//! period. Policies are pure: the same context always yields the same
//! decision, and any history a rule needs arrives through its context.
//!
//! # Modules
//!
//! - [`crop`] -- Irrigation scheduling.
//! - [`processing`] -- Routing the harvest through processing lines.
//! - [`water`] -- Sourcing water from storage, the aquifer, and the network.
//! - [`energy`] -- Dispatching renewables, grid import, and the generator.
//! - [`market`] -- Selling versus storing product.
//! - [`economic`] -- Allocating period net income.
//! - [`set`] -- [`PolicySet`], one farm's selection across all domains.

pub mod crop;
pub mod economic;
pub mod energy;
pub mod error;
pub mod market;
pub mod processing;
pub mod set;
pub mod water;

use farmstead_types::Domain;

pub use crop::CropPolicy;
pub use economic::EconomicPolicy;
pub use energy::EnergyPolicy;
pub use error::PolicyError;
pub use market::MarketPolicy;
pub use processing::ProcessingPolicy;
pub use set::PolicySet;
pub use water::WaterPolicy;

/// A named, stateless decision rule for one domain.
pub trait Policy {
    /// The domain this policy decides for.
    const DOMAIN: Domain;

    /// The read-only input the rule decides from.
    type Context;

    /// The allocation the rule produces.
    type Decision;

    /// Stable name used in logs and the decision log header.
    fn name(&self) -> &'static str;

    /// Produce a decision for `ctx`. Must be a pure function of its inputs.
    fn decide(&self, ctx: &Self::Context) -> Self::Decision;

    /// Check the rule's own parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidParameter`] if a parameter is out of
    /// range.
    fn validate(&self) -> Result<(), PolicyError> {
        Ok(())
    }
}

/// Take up to `capacity` from `remaining`, returning the amount taken.
///
/// Used to fill demand from an ordered list of sources.
pub(crate) fn take(remaining: &mut f64, capacity: f64) -> f64 {
    let taken = remaining.min(capacity).max(0.0);
    *remaining = (*remaining - taken).max(0.0);
    taken
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_fills_up_to_capacity() {
        let mut remaining = 100.0;
        assert!((take(&mut remaining, 30.0) - 30.0).abs() < 1e-12);
        assert!((remaining - 70.0).abs() < 1e-12);
        assert!((take(&mut remaining, 500.0) - 70.0).abs() < 1e-12);
        assert!(remaining.abs() < 1e-12);
    }

    #[test]
    fn take_ignores_negative_capacity() {
        let mut remaining = 10.0;
        assert!(take(&mut remaining, -5.0).abs() < 1e-12);
        assert!((remaining - 10.0).abs() < 1e-12);
    }
}
