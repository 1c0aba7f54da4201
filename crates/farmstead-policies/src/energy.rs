//! Energy-dispatch policies.
//!
//! Grid import and generator output are capped by their per-period
//! capacities. Renewable generation that is not used on site is exported at
//! the export price, so `renewable + exported` always equals what was
//! generated.

use farmstead_types::{Domain, EnergyContext, EnergyDecision};
use serde::{Deserialize, Serialize};

use crate::{Policy, take};

/// Selection of an energy-dispatch rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum EnergyPolicy {
    /// Renewables, then grid, then generator.
    #[default]
    RenewableFirst,
    /// Export all renewables and buy from the grid, generator as backup.
    GridOnly,
    /// Renewables, then the cheaper of grid and generator.
    CheapestEnergy,
}

impl Policy for EnergyPolicy {
    const DOMAIN: Domain = Domain::Energy;
    type Context = EnergyContext;
    type Decision = EnergyDecision;

    fn name(&self) -> &'static str {
        match self {
            Self::RenewableFirst => "renewable_first",
            Self::GridOnly => "grid_only",
            Self::CheapestEnergy => "cheapest_energy",
        }
    }

    fn decide(&self, ctx: &EnergyContext) -> EnergyDecision {
        let mut remaining = ctx.demand_kwh.max(0.0);
        let available = ctx.renewable_available_kwh.max(0.0);

        let renewable_kwh = match self {
            Self::GridOnly => 0.0,
            Self::RenewableFirst | Self::CheapestEnergy => take(&mut remaining, available),
        };

        let generator_first = matches!(self, Self::CheapestEnergy)
            && ctx.generator_cost_per_kwh < ctx.grid_price_per_kwh;
        let (grid_kwh, generator_kwh) = if generator_first {
            let generator = take(&mut remaining, ctx.generator_capacity_kwh);
            let grid = take(&mut remaining, ctx.grid_capacity_kwh);
            (grid, generator)
        } else {
            let grid = take(&mut remaining, ctx.grid_capacity_kwh);
            let generator = take(&mut remaining, ctx.generator_capacity_kwh);
            (grid, generator)
        };

        let exported_kwh = (available - renewable_kwh).max(0.0);
        EnergyDecision {
            demand_kwh: ctx.demand_kwh,
            renewable_kwh,
            grid_kwh,
            generator_kwh,
            unmet_kwh: remaining,
            renewable_available_kwh: ctx.renewable_available_kwh,
            exported_kwh,
            grid_cost: grid_kwh * ctx.grid_price_per_kwh,
            generator_cost: generator_kwh * ctx.generator_cost_per_kwh,
            export_credit: exported_kwh * ctx.export_price_per_kwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ctx(demand: f64, renewable: f64) -> EnergyContext {
        EnergyContext {
            demand_kwh: demand,
            renewable_available_kwh: renewable,
            grid_capacity_kwh: 1_000.0,
            generator_capacity_kwh: 500.0,
            grid_price_per_kwh: 0.15,
            generator_cost_per_kwh: 0.40,
            export_price_per_kwh: 0.05,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn renewable_first_exports_surplus() {
        let d = EnergyPolicy::RenewableFirst.decide(&make_ctx(100.0, 150.0));
        assert!(approx(d.renewable_kwh, 100.0));
        assert!(approx(d.exported_kwh, 50.0));
        assert!(approx(d.grid_kwh, 0.0));
        assert!(approx(d.net_cost(), -2.5));
    }

    #[test]
    fn renewable_first_falls_back_to_grid_then_generator() {
        let d = EnergyPolicy::RenewableFirst.decide(&make_ctx(1_700.0, 100.0));
        assert!(approx(d.renewable_kwh, 100.0));
        assert!(approx(d.grid_kwh, 1_000.0));
        assert!(approx(d.generator_kwh, 500.0));
        assert!(approx(d.unmet_kwh, 100.0));
    }

    #[test]
    fn grid_only_exports_everything() {
        let d = EnergyPolicy::GridOnly.decide(&make_ctx(200.0, 80.0));
        assert!(approx(d.renewable_kwh, 0.0));
        assert!(approx(d.exported_kwh, 80.0));
        assert!(approx(d.grid_kwh, 200.0));
    }

    #[test]
    fn cheapest_energy_prefers_cheap_generator() {
        let mut ctx = make_ctx(300.0, 0.0);
        ctx.generator_cost_per_kwh = 0.10;
        let d = EnergyPolicy::CheapestEnergy.decide(&ctx);
        assert!(approx(d.generator_kwh, 300.0));
        assert!(approx(d.grid_kwh, 0.0));
    }

    #[test]
    fn cheapest_energy_uses_grid_when_cheaper() {
        let d = EnergyPolicy::CheapestEnergy.decide(&make_ctx(300.0, 0.0));
        assert!(approx(d.grid_kwh, 300.0));
        assert!(approx(d.generator_kwh, 0.0));
    }

    mod properties {
        use farmstead_ledger::closure::check_energy;
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn every_energy_policy_closes(
                policy in prop_oneof![
                    Just(EnergyPolicy::RenewableFirst),
                    Just(EnergyPolicy::GridOnly),
                    Just(EnergyPolicy::CheapestEnergy),
                ],
                demand in 0.0_f64..5_000.0,
                renewable in 0.0_f64..5_000.0,
                grid in 0.0_f64..3_000.0,
                generator in 0.0_f64..3_000.0,
                grid_price in 0.0_f64..1.0,
                generator_cost in 0.0_f64..1.0,
            ) {
                let ctx = EnergyContext {
                    demand_kwh: demand,
                    renewable_available_kwh: renewable,
                    grid_capacity_kwh: grid,
                    generator_capacity_kwh: generator,
                    grid_price_per_kwh: grid_price,
                    generator_cost_per_kwh: generator_cost,
                    export_price_per_kwh: 0.05,
                };
                let decision = policy.decide(&ctx);
                prop_assert!(check_energy(&decision, &ctx).is_ok());
            }
        }
    }
}
