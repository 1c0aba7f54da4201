//! Closure verification for allocation decisions.
//!
//! Every decision must fully and non-negatively account for its domain's
//! demand across sources and sinks:
//!
//! ```text
//! |sum(parts) - demand| <= 1e-6 * max(1, |demand|)
//! every part finite and >= -1e-9
//! ```
//!
//! Each part must also respect the capacity its context advertised. The
//! orchestrator runs these checks on every decision before any of it
//! touches shared state; a failure is a policy bug and ends the run.

use farmstead_types::{
    CropContext, CropDecision, Domain, EconomicContext, EconomicDecision, EnergyContext,
    EnergyDecision, MarketContext, MarketDecision, ProcessingContext, ProcessingDecision,
    WaterContext, WaterDecision,
};

/// Relative tolerance on sums and caps.
pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// Smallest value accepted for a part that must be non-negative.
pub const NEGATIVE_TOLERANCE: f64 = -1e-9;

/// A decision that does not account for its demand.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{domain} decision violates closure: {reason}")]
pub struct ClosureViolation {
    /// The offending domain.
    pub domain: Domain,
    /// What was violated.
    pub reason: String,
}

/// Accumulates checks for one decision and reports the first failure.
struct Checker {
    domain: Domain,
}

impl Checker {
    const fn new(domain: Domain) -> Self {
        Self { domain }
    }

    fn fail(&self, reason: String) -> ClosureViolation {
        ClosureViolation {
            domain: self.domain,
            reason,
        }
    }

    fn part(&self, name: &str, value: f64) -> Result<(), ClosureViolation> {
        if value.is_finite() && value >= NEGATIVE_TOLERANCE {
            Ok(())
        } else {
            Err(self.fail(format!("{name} = {value} is negative or not finite")))
        }
    }

    fn equal(&self, what: &str, actual: f64, expected: f64) -> Result<(), ClosureViolation> {
        if within(actual, expected) {
            Ok(())
        } else {
            Err(self.fail(format!("{what}: {actual} != {expected}")))
        }
    }

    fn at_most(&self, name: &str, value: f64, cap: f64) -> Result<(), ClosureViolation> {
        if value <= cap + RELATIVE_TOLERANCE * cap.abs().max(1.0) {
            Ok(())
        } else {
            Err(self.fail(format!("{name} = {value} exceeds {cap}")))
        }
    }
}

fn within(actual: f64, expected: f64) -> bool {
    actual.is_finite() && (actual - expected).abs() <= RELATIVE_TOLERANCE * expected.abs().max(1.0)
}

/// Check an irrigation decision.
///
/// # Errors
///
/// Returns [`ClosureViolation`] if `applied + deficit != requirement`.
pub fn check_crop(decision: &CropDecision, ctx: &CropContext) -> Result<(), ClosureViolation> {
    let c = Checker::new(Domain::Crop);
    c.equal("requirement", decision.requirement_m3, ctx.requirement_m3)?;
    c.part("applied", decision.applied_m3)?;
    c.part("deficit", decision.deficit_m3)?;
    c.equal(
        "applied + deficit",
        decision.applied_m3 + decision.deficit_m3,
        ctx.requirement_m3,
    )
}

/// Check a processing decision.
///
/// # Errors
///
/// Returns [`ClosureViolation`] if the pathways do not sum to the harvest
/// or a line runs above capacity.
pub fn check_processing(
    decision: &ProcessingDecision,
    ctx: &ProcessingContext,
) -> Result<(), ClosureViolation> {
    let c = Checker::new(Domain::Processing);
    c.equal("harvest", decision.harvest_kg, ctx.harvest_kg)?;
    c.part("fresh", decision.fresh_kg)?;
    c.part("packaged", decision.packaged_kg)?;
    c.part("canned", decision.canned_kg)?;
    c.part("dried", decision.dried_kg)?;
    c.part("cost", decision.cost)?;
    c.at_most("packaged", decision.packaged_kg, ctx.capacity.packaged_kg)?;
    c.at_most("canned", decision.canned_kg, ctx.capacity.canned_kg)?;
    c.at_most("dried", decision.dried_kg, ctx.capacity.dried_kg)?;
    c.equal(
        "fresh + processed",
        decision.fresh_kg + decision.processed_kg(),
        ctx.harvest_kg,
    )
}

/// Check a water-sourcing decision.
///
/// # Errors
///
/// Returns [`ClosureViolation`] if the sources and unmet demand do not sum
/// to demand or a source exceeds what the context made available.
pub fn check_water(decision: &WaterDecision, ctx: &WaterContext) -> Result<(), ClosureViolation> {
    let c = Checker::new(Domain::Water);
    c.equal("demand", decision.demand_m3, ctx.demand_m3)?;
    c.part("storage", decision.storage_m3)?;
    c.part("groundwater", decision.groundwater_m3)?;
    c.part("municipal", decision.municipal_m3)?;
    c.part("unmet", decision.unmet_m3)?;
    c.part("groundwater energy", decision.groundwater_energy_kwh)?;
    c.part("groundwater cost", decision.groundwater_cost)?;
    c.part("municipal cost", decision.municipal_cost)?;
    c.at_most("storage", decision.storage_m3, ctx.storage_available_m3)?;
    c.at_most(
        "groundwater",
        decision.groundwater_m3,
        ctx.groundwater_capacity_m3,
    )?;
    c.at_most("municipal", decision.municipal_m3, ctx.municipal_capacity_m3)?;
    c.equal(
        "storage + groundwater + municipal + unmet",
        decision.delivered_m3() + decision.unmet_m3,
        ctx.demand_m3,
    )
}

/// Check an energy-dispatch decision.
///
/// # Errors
///
/// Returns [`ClosureViolation`] if supply and unmet demand do not sum to
/// demand, renewables are double-counted, or a source exceeds capacity.
pub fn check_energy(decision: &EnergyDecision, ctx: &EnergyContext) -> Result<(), ClosureViolation> {
    let c = Checker::new(Domain::Energy);
    c.equal("demand", decision.demand_kwh, ctx.demand_kwh)?;
    c.part("renewable", decision.renewable_kwh)?;
    c.part("grid", decision.grid_kwh)?;
    c.part("generator", decision.generator_kwh)?;
    c.part("unmet", decision.unmet_kwh)?;
    c.part("exported", decision.exported_kwh)?;
    c.part("grid cost", decision.grid_cost)?;
    c.part("generator cost", decision.generator_cost)?;
    c.part("export credit", decision.export_credit)?;
    c.at_most("grid", decision.grid_kwh, ctx.grid_capacity_kwh)?;
    c.at_most("generator", decision.generator_kwh, ctx.generator_capacity_kwh)?;
    c.equal(
        "renewable + exported",
        decision.renewable_kwh + decision.exported_kwh,
        ctx.renewable_available_kwh,
    )?;
    c.equal(
        "renewable + grid + generator + unmet",
        decision.renewable_kwh + decision.grid_kwh + decision.generator_kwh + decision.unmet_kwh,
        ctx.demand_kwh,
    )
}

/// Check a market decision.
///
/// # Errors
///
/// Returns [`ClosureViolation`] if sold and stored product do not sum to
/// what was sellable, fresh product was held back, or storage overflows.
pub fn check_market(decision: &MarketDecision, ctx: &MarketContext) -> Result<(), ClosureViolation> {
    let c = Checker::new(Domain::Market);
    let sellable = ctx.sellable_kg();
    c.equal("sellable", decision.sellable_kg, sellable)?;
    c.part("sold", decision.sold_kg)?;
    c.part("stored", decision.stored_kg)?;
    c.part("revenue", decision.revenue)?;
    c.at_most("stored", decision.stored_kg, ctx.storage_capacity_kg)?;
    c.at_most("stored", decision.stored_kg, ctx.storable_kg)?;
    c.at_most("fresh", ctx.fresh_kg, decision.sold_kg)?;
    c.equal(
        "sold + stored",
        decision.sold_kg + decision.stored_kg,
        sellable,
    )
}

/// Check an income-allocation decision.
///
/// # Errors
///
/// Returns [`ClosureViolation`] if the allocation does not sum to the
/// positive part of net income or repayment exceeds outstanding debt.
pub fn check_economic(
    decision: &EconomicDecision,
    ctx: &EconomicContext,
) -> Result<(), ClosureViolation> {
    let c = Checker::new(Domain::Economic);
    let allocable = ctx.allocable();
    c.equal("net income", decision.net_income, ctx.net_income)?;
    c.equal("allocable", decision.allocable, allocable)?;
    c.part("reserve", decision.reserve)?;
    c.part("debt repayment", decision.debt_repayment)?;
    c.part("reinvestment", decision.reinvestment)?;
    c.at_most(
        "debt repayment",
        decision.debt_repayment,
        ctx.debt_outstanding.max(0.0),
    )?;
    c.equal(
        "reserve + debt repayment + reinvestment",
        decision.reserve + decision.debt_repayment + decision.reinvestment,
        allocable,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_water_ctx() -> WaterContext {
        WaterContext {
            demand_m3: 1_000.0,
            storage_available_m3: 100.0,
            groundwater_capacity_m3: 500.0,
            municipal_capacity_m3: 1_000.0,
            groundwater_cost_per_m3: 0.3,
            groundwater_energy_kwh_per_m3: 0.2,
            municipal_tariff_per_m3: 0.65,
        }
    }

    fn make_water_decision() -> WaterDecision {
        WaterDecision {
            demand_m3: 1_000.0,
            storage_m3: 100.0,
            groundwater_m3: 500.0,
            municipal_m3: 400.0,
            unmet_m3: 0.0,
            groundwater_energy_kwh: 100.0,
            groundwater_cost: 150.0,
            municipal_cost: 260.0,
        }
    }

    #[test]
    fn balanced_water_decision_passes() {
        assert!(check_water(&make_water_decision(), &make_water_ctx()).is_ok());
    }

    #[test]
    fn dropped_demand_is_caught() {
        let mut decision = make_water_decision();
        decision.municipal_m3 = 300.0;
        let err = check_water(&decision, &make_water_ctx());
        assert!(matches!(err, Err(ClosureViolation { domain: Domain::Water, .. })));
    }

    #[test]
    fn over_capacity_groundwater_is_caught() {
        let mut decision = make_water_decision();
        decision.groundwater_m3 = 600.0;
        decision.municipal_m3 = 300.0;
        assert!(check_water(&decision, &make_water_ctx()).is_err());
    }

    #[test]
    fn negative_part_is_caught() {
        let mut decision = make_water_decision();
        decision.unmet_m3 = -5.0;
        decision.municipal_m3 = 405.0;
        assert!(check_water(&decision, &make_water_ctx()).is_err());
    }

    #[test]
    fn nan_part_is_caught() {
        let ctx = CropContext {
            requirement_m3: 10.0,
            temperature_c: 20.0,
        };
        let decision = CropDecision {
            requirement_m3: 10.0,
            applied_m3: f64::NAN,
            deficit_m3: 0.0,
        };
        assert!(check_crop(&decision, &ctx).is_err());
    }

    #[test]
    fn tiny_rounding_is_tolerated() {
        let mut decision = make_water_decision();
        decision.municipal_m3 = 400.000_000_1;
        assert!(check_water(&decision, &make_water_ctx()).is_ok());
    }

    #[test]
    fn repayment_beyond_debt_is_caught() {
        let ctx = EconomicContext {
            net_income: 100.0,
            cash_on_hand: 0.0,
            debt_outstanding: 10.0,
        };
        let decision = EconomicDecision {
            net_income: 100.0,
            allocable: 100.0,
            reserve: 50.0,
            debt_repayment: 50.0,
            reinvestment: 0.0,
        };
        assert!(check_economic(&decision, &ctx).is_err());
    }

    #[test]
    fn withheld_fresh_product_is_caught() {
        let ctx = MarketContext {
            fresh_kg: 100.0,
            storable_kg: 0.0,
            price_per_kg: 1.0,
            price_multiplier: 1.0,
            storage_capacity_kg: 500.0,
        };
        let decision = MarketDecision {
            sellable_kg: 100.0,
            fresh_kg: 100.0,
            sold_kg: 40.0,
            stored_kg: 60.0,
            revenue: 40.0,
        };
        assert!(check_market(&decision, &ctx).is_err());
    }

    #[test]
    fn display_names_domain() {
        let v = ClosureViolation {
            domain: Domain::Energy,
            reason: String::from("x"),
        };
        assert_eq!(v.to_string(), "energy decision violates closure: x");
    }
}
