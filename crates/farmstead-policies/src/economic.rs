//! Economic policies: what to do with a period's profit.
//!
//! Only positive net income is allocated. A loss is absorbed by the cash
//! balance directly, so every rule allocates zero in a losing period.

use farmstead_types::{Domain, EconomicContext, EconomicDecision};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, check_share};
use crate::{Policy, take};

/// Selection of an income-allocation rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum EconomicPolicy {
    /// Keep all profit as cash reserve.
    #[default]
    Conservative,
    /// Pay a share of profit against debt, keep the rest.
    Balanced {
        /// Share of profit used for repayment, in `[0, 1]`.
        debt_share: f64,
    },
    /// Reinvest a share of profit; the rest repays debt, then goes to reserve.
    AggressiveGrowth {
        /// Share of profit reinvested, in `[0, 1]`.
        reinvest_share: f64,
    },
}

impl Policy for EconomicPolicy {
    const DOMAIN: Domain = Domain::Economic;
    type Context = EconomicContext;
    type Decision = EconomicDecision;

    fn name(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced { .. } => "balanced",
            Self::AggressiveGrowth { .. } => "aggressive_growth",
        }
    }

    fn decide(&self, ctx: &EconomicContext) -> EconomicDecision {
        let allocable = ctx.allocable();
        let debt = ctx.debt_outstanding.max(0.0);
        let mut remaining = allocable;

        let (debt_repayment, reinvestment) = match *self {
            Self::Conservative => (0.0, 0.0),
            Self::Balanced { debt_share } => {
                let target = allocable * debt_share.clamp(0.0, 1.0);
                (take(&mut remaining, target.min(debt)), 0.0)
            }
            Self::AggressiveGrowth { reinvest_share } => {
                let reinvest = take(&mut remaining, allocable * reinvest_share.clamp(0.0, 1.0));
                (take(&mut remaining, debt), reinvest)
            }
        };

        EconomicDecision {
            net_income: ctx.net_income,
            allocable,
            reserve: remaining,
            debt_repayment,
            reinvestment,
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        match *self {
            Self::Conservative => Ok(()),
            Self::Balanced { debt_share } => check_share(self.name(), "debt_share", debt_share),
            Self::AggressiveGrowth { reinvest_share } => {
                check_share(self.name(), "reinvest_share", reinvest_share)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ctx(net: f64, debt: f64) -> EconomicContext {
        EconomicContext {
            net_income: net,
            cash_on_hand: 1_000.0,
            debt_outstanding: debt,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn conservative_reserves_everything() {
        let d = EconomicPolicy::Conservative.decide(&make_ctx(400.0, 100.0));
        assert!(approx(d.reserve, 400.0));
        assert!(approx(d.debt_repayment, 0.0));
    }

    #[test]
    fn balanced_repays_share_up_to_debt() {
        let policy = EconomicPolicy::Balanced { debt_share: 0.5 };
        let d = policy.decide(&make_ctx(400.0, 1_000.0));
        assert!(approx(d.debt_repayment, 200.0));
        assert!(approx(d.reserve, 200.0));

        let d = policy.decide(&make_ctx(400.0, 50.0));
        assert!(approx(d.debt_repayment, 50.0));
        assert!(approx(d.reserve, 350.0));
    }

    #[test]
    fn aggressive_growth_reinvests_then_repays() {
        let policy = EconomicPolicy::AggressiveGrowth {
            reinvest_share: 0.75,
        };
        let d = policy.decide(&make_ctx(400.0, 60.0));
        assert!(approx(d.reinvestment, 300.0));
        assert!(approx(d.debt_repayment, 60.0));
        assert!(approx(d.reserve, 40.0));
    }

    #[test]
    fn losses_allocate_nothing() {
        let policy = EconomicPolicy::AggressiveGrowth {
            reinvest_share: 1.0,
        };
        let d = policy.decide(&make_ctx(-250.0, 60.0));
        assert!(approx(d.allocable, 0.0));
        assert!(approx(d.reinvestment + d.reserve + d.debt_repayment, 0.0));
    }

    mod properties {
        use farmstead_ledger::closure::check_economic;
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn every_economic_policy_closes(
                net in -10_000.0_f64..10_000.0,
                debt in 0.0_f64..20_000.0,
                share in 0.0_f64..=1.0,
            ) {
                let ctx = make_ctx(net, debt);
                for policy in [
                    EconomicPolicy::Conservative,
                    EconomicPolicy::Balanced { debt_share: share },
                    EconomicPolicy::AggressiveGrowth { reinvest_share: share },
                ] {
                    prop_assert!(check_economic(&policy.decide(&ctx), &ctx).is_ok());
                }
            }
        }
    }
}
