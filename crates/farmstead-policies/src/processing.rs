//! Food-processing policies.
//!
//! Each rule splits the period's harvest across the fresh market and the
//! three processing lines. Lines never run above capacity; whatever is not
//! processed is sold fresh.

use farmstead_types::{Domain, ProcessingContext, ProcessingDecision};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, check_share};
use crate::{Policy, take};

/// Selection of a processing rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ProcessingPolicy {
    /// Sell the whole harvest fresh.
    #[default]
    AllFresh,
    /// Fill the most storable lines first: dried, then canned, then packaged.
    MaximizeStorage,
    /// Target shares per line, capped by capacity; the rest goes fresh.
    Balanced {
        /// Share of harvest to package.
        packaged: f64,
        /// Share of harvest to can.
        canned: f64,
        /// Share of harvest to dry.
        dried: f64,
    },
}

impl Policy for ProcessingPolicy {
    const DOMAIN: Domain = Domain::Processing;
    type Context = ProcessingContext;
    type Decision = ProcessingDecision;

    fn name(&self) -> &'static str {
        match self {
            Self::AllFresh => "all_fresh",
            Self::MaximizeStorage => "maximize_storage",
            Self::Balanced { .. } => "balanced",
        }
    }

    fn decide(&self, ctx: &ProcessingContext) -> ProcessingDecision {
        let harvest = ctx.harvest_kg.max(0.0);
        let mut remaining = harvest;
        let cap = ctx.capacity;

        let (packaged_kg, canned_kg, dried_kg) = match *self {
            Self::AllFresh => (0.0, 0.0, 0.0),
            Self::MaximizeStorage => {
                let dried = take(&mut remaining, cap.dried_kg);
                let canned = take(&mut remaining, cap.canned_kg);
                let packaged = take(&mut remaining, cap.packaged_kg);
                (packaged, canned, dried)
            }
            Self::Balanced {
                packaged,
                canned,
                dried,
            } => {
                let packaged = take(&mut remaining, (harvest * packaged).min(cap.packaged_kg));
                let canned = take(&mut remaining, (harvest * canned).min(cap.canned_kg));
                let dried = take(&mut remaining, (harvest * dried).min(cap.dried_kg));
                (packaged, canned, dried)
            }
        };

        ProcessingDecision {
            harvest_kg: ctx.harvest_kg,
            fresh_kg: remaining,
            packaged_kg,
            canned_kg,
            dried_kg,
            cost: ctx.rates.cost(packaged_kg, canned_kg, dried_kg),
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        match *self {
            Self::AllFresh | Self::MaximizeStorage => Ok(()),
            Self::Balanced {
                packaged,
                canned,
                dried,
            } => {
                check_share(self.name(), "packaged", packaged)?;
                check_share(self.name(), "canned", canned)?;
                check_share(self.name(), "dried", dried)?;
                let total = packaged + canned + dried;
                if total > 1.0 + 1e-9 {
                    return Err(PolicyError::InvalidParameter {
                        policy: self.name(),
                        reason: format!("shares sum to {total}, more than 1"),
                    });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use farmstead_types::{LineRates, ProcessingCapacity, ProcessingRates};

    use super::*;

    fn make_ctx(harvest: f64) -> ProcessingContext {
        ProcessingContext {
            harvest_kg: harvest,
            capacity: ProcessingCapacity {
                packaged_kg: 100.0,
                canned_kg: 50.0,
                dried_kg: 20.0,
            },
            rates: ProcessingRates {
                packaged: line(0.1),
                canned: line(0.1),
                dried: line(0.1),
            },
        }
    }

    fn line(cost_per_kg: f64) -> LineRates {
        LineRates {
            energy_kwh_per_kg: 0.2,
            water_m3_per_kg: 0.002,
            cost_per_kg,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn all_fresh_processes_nothing() {
        let d = ProcessingPolicy::AllFresh.decide(&make_ctx(500.0));
        assert!(approx(d.fresh_kg, 500.0));
        assert!(approx(d.cost, 0.0));
    }

    #[test]
    fn maximize_storage_fills_dried_first() {
        let d = ProcessingPolicy::MaximizeStorage.decide(&make_ctx(60.0));
        assert!(approx(d.dried_kg, 20.0));
        assert!(approx(d.canned_kg, 40.0));
        assert!(approx(d.packaged_kg, 0.0));
        assert!(approx(d.fresh_kg, 0.0));
    }

    #[test]
    fn maximize_storage_overflow_goes_fresh() {
        let d = ProcessingPolicy::MaximizeStorage.decide(&make_ctx(500.0));
        assert!(approx(d.processed_kg(), 170.0));
        assert!(approx(d.fresh_kg, 330.0));
        assert!(approx(d.cost, 17.0));
    }

    #[test]
    fn balanced_respects_capacity() {
        let policy = ProcessingPolicy::Balanced {
            packaged: 0.5,
            canned: 0.2,
            dried: 0.1,
        };
        let d = policy.decide(&make_ctx(400.0));
        assert!(approx(d.packaged_kg, 100.0));
        assert!(approx(d.canned_kg, 50.0));
        assert!(approx(d.dried_kg, 20.0));
        assert!(approx(d.fresh_kg, 230.0));
    }

    #[test]
    fn validate_rejects_oversubscribed_shares() {
        let policy = ProcessingPolicy::Balanced {
            packaged: 0.6,
            canned: 0.3,
            dried: 0.2,
        };
        assert!(policy.validate().is_err());
    }

    mod properties {
        use farmstead_ledger::closure::check_processing;
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn every_processing_policy_closes(
                harvest in 0.0_f64..100_000.0,
                packaged in 0.0_f64..0.33,
                canned in 0.0_f64..0.33,
                dried in 0.0_f64..0.33,
            ) {
                let ctx = make_ctx(harvest);
                for policy in [
                    ProcessingPolicy::AllFresh,
                    ProcessingPolicy::MaximizeStorage,
                    ProcessingPolicy::Balanced { packaged, canned, dried },
                ] {
                    prop_assert!(check_processing(&policy.decide(&ctx), &ctx).is_ok());
                }
            }
        }
    }
}
