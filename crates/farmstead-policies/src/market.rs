//! Market policies: sell now or store for later.
//!
//! Fresh product cannot be stored and is always sold in the period it
//! reaches the market. Only storable product (inventory on hand plus this
//! period's processed output) is subject to the rule, and what is kept back
//! never exceeds the warehouse capacity.

use farmstead_types::{Domain, MarketContext, MarketDecision};
use serde::{Deserialize, Serialize};

use crate::Policy;
use crate::error::{PolicyError, check_non_negative};

/// Selection of a market rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum MarketPolicy {
    /// Sell everything every period.
    #[default]
    SellImmediately,
    /// Hold storable product until the price multiplier reaches a threshold.
    HoldForPeak {
        /// Multiplier at or above which everything is sold.
        price_threshold: f64,
    },
    /// Sell a share of storable product proportional to the price
    /// multiplier: `clamp(multiplier / 2, 0, 1)`.
    Adaptive,
}

impl Policy for MarketPolicy {
    const DOMAIN: Domain = Domain::Market;
    type Context = MarketContext;
    type Decision = MarketDecision;

    fn name(&self) -> &'static str {
        match self {
            Self::SellImmediately => "sell_immediately",
            Self::HoldForPeak { .. } => "hold_for_peak",
            Self::Adaptive => "adaptive",
        }
    }

    fn decide(&self, ctx: &MarketContext) -> MarketDecision {
        let storable = ctx.storable_kg.max(0.0);
        let hold_share = match *self {
            Self::SellImmediately => 0.0,
            Self::HoldForPeak { price_threshold } => {
                if ctx.price_multiplier >= price_threshold {
                    0.0
                } else {
                    1.0
                }
            }
            Self::Adaptive => 1.0 - (ctx.price_multiplier / 2.0).clamp(0.0, 1.0),
        };
        let stored_kg = (storable * hold_share).min(ctx.storage_capacity_kg.max(0.0));
        let sellable_kg = ctx.sellable_kg();
        let sold_kg = (sellable_kg - stored_kg).max(0.0);
        MarketDecision {
            sellable_kg,
            fresh_kg: ctx.fresh_kg,
            sold_kg,
            stored_kg,
            revenue: sold_kg * ctx.price_per_kg,
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        match *self {
            Self::HoldForPeak { price_threshold } => {
                check_non_negative(self.name(), "price_threshold", price_threshold)
            }
            Self::SellImmediately | Self::Adaptive => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ctx(multiplier: f64) -> MarketContext {
        MarketContext {
            fresh_kg: 100.0,
            storable_kg: 200.0,
            price_per_kg: 2.0 * multiplier,
            price_multiplier: multiplier,
            storage_capacity_kg: 150.0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sell_immediately_sells_everything() {
        let d = MarketPolicy::SellImmediately.decide(&make_ctx(1.0));
        assert!(approx(d.sold_kg, 300.0));
        assert!(approx(d.stored_kg, 0.0));
        assert!(approx(d.revenue, 600.0));
    }

    #[test]
    fn hold_for_peak_stores_up_to_capacity() {
        let policy = MarketPolicy::HoldForPeak {
            price_threshold: 1.2,
        };
        let d = policy.decide(&make_ctx(1.0));
        assert!(approx(d.stored_kg, 150.0));
        assert!(approx(d.sold_kg, 150.0));
    }

    #[test]
    fn hold_for_peak_sells_at_peak() {
        let policy = MarketPolicy::HoldForPeak {
            price_threshold: 1.2,
        };
        let d = policy.decide(&make_ctx(1.3));
        assert!(approx(d.stored_kg, 0.0));
        assert!(approx(d.sold_kg, 300.0));
    }

    #[test]
    fn adaptive_sells_proportionally() {
        let d = MarketPolicy::Adaptive.decide(&make_ctx(1.0));
        assert!(approx(d.stored_kg, 100.0));
        assert!(approx(d.sold_kg, 200.0));
        let d = MarketPolicy::Adaptive.decide(&make_ctx(2.5));
        assert!(approx(d.stored_kg, 0.0));
    }

    #[test]
    fn fresh_is_always_sold() {
        let policy = MarketPolicy::HoldForPeak {
            price_threshold: 10.0,
        };
        let d = policy.decide(&make_ctx(0.5));
        assert!(d.sold_kg >= d.fresh_kg);
    }

    mod properties {
        use farmstead_ledger::closure::check_market;
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn every_market_policy_closes(
                fresh in 0.0_f64..10_000.0,
                storable in 0.0_f64..10_000.0,
                multiplier in 0.0_f64..3.0,
                capacity in 0.0_f64..5_000.0,
                threshold in 0.0_f64..3.0,
            ) {
                let ctx = MarketContext {
                    fresh_kg: fresh,
                    storable_kg: storable,
                    price_per_kg: multiplier,
                    price_multiplier: multiplier,
                    storage_capacity_kg: capacity,
                };
                for policy in [
                    MarketPolicy::SellImmediately,
                    MarketPolicy::HoldForPeak { price_threshold: threshold },
                    MarketPolicy::Adaptive,
                ] {
                    prop_assert!(check_market(&policy.decide(&ctx), &ctx).is_ok());
                }
            }
        }
    }
}
