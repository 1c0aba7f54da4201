//! Water-sourcing policies.
//!
//! Every rule first serves demand from community storage, which is already
//! paid for, up to the farm's allowance. The remainder is filled from the
//! aquifer and the municipal network in the order the rule dictates, each
//! capped by its per-period capacity. Whatever neither source can serve is
//! recorded as unmet; nothing is dropped.

use farmstead_types::{Domain, WaterContext, WaterDecision};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, check_non_negative, check_share};
use crate::{Policy, take};

/// Selection of a water-sourcing rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum WaterPolicy {
    /// Exhaust groundwater first; fall back to municipal on shortfall.
    AlwaysGroundwater,
    /// Exhaust municipal supply first; fall back to groundwater on shortfall.
    AlwaysMunicipal,
    /// Use whichever source is cheaper per m³, splitting only at capacity.
    /// Ties go to groundwater.
    #[default]
    CheapestSource,
    /// Like [`CheapestSource`](Self::CheapestSource), but never draw more
    /// than a fixed share of total demand from the aquifer, whatever it costs.
    ConserveGroundwater {
        /// Maximum groundwater share of demand, in `[0, 1]`.
        max_groundwater_fraction: f64,
    },
    /// Hard per-period ceiling on groundwater; excess goes municipal.
    QuotaEnforced {
        /// Groundwater ceiling per period (m³).
        groundwater_quota_m3: f64,
    },
}

#[derive(Clone, Copy)]
enum Order {
    GroundwaterFirst,
    MunicipalFirst,
}

impl Policy for WaterPolicy {
    const DOMAIN: Domain = Domain::Water;
    type Context = WaterContext;
    type Decision = WaterDecision;

    fn name(&self) -> &'static str {
        match self {
            Self::AlwaysGroundwater => "always_groundwater",
            Self::AlwaysMunicipal => "always_municipal",
            Self::CheapestSource => "cheapest_source",
            Self::ConserveGroundwater { .. } => "conserve_groundwater",
            Self::QuotaEnforced { .. } => "quota_enforced",
        }
    }

    fn decide(&self, ctx: &WaterContext) -> WaterDecision {
        let (order, groundwater_limit) = match *self {
            Self::AlwaysGroundwater => (Order::GroundwaterFirst, ctx.groundwater_capacity_m3),
            Self::AlwaysMunicipal => (Order::MunicipalFirst, ctx.groundwater_capacity_m3),
            Self::CheapestSource => (cheaper_first(ctx), ctx.groundwater_capacity_m3),
            Self::ConserveGroundwater {
                max_groundwater_fraction,
            } => (
                cheaper_first(ctx),
                ctx.groundwater_capacity_m3
                    .min(ctx.demand_m3 * max_groundwater_fraction.clamp(0.0, 1.0)),
            ),
            Self::QuotaEnforced {
                groundwater_quota_m3,
            } => (
                Order::GroundwaterFirst,
                ctx.groundwater_capacity_m3.min(groundwater_quota_m3.max(0.0)),
            ),
        };
        allocate(ctx, order, groundwater_limit)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        match *self {
            Self::ConserveGroundwater {
                max_groundwater_fraction,
            } => check_share(
                self.name(),
                "max_groundwater_fraction",
                max_groundwater_fraction,
            ),
            Self::QuotaEnforced {
                groundwater_quota_m3,
            } => check_non_negative(self.name(), "groundwater_quota_m3", groundwater_quota_m3),
            Self::AlwaysGroundwater | Self::AlwaysMunicipal | Self::CheapestSource => Ok(()),
        }
    }
}

fn cheaper_first(ctx: &WaterContext) -> Order {
    if ctx.groundwater_cost_per_m3 <= ctx.municipal_tariff_per_m3 {
        Order::GroundwaterFirst
    } else {
        Order::MunicipalFirst
    }
}

/// Serve storage first, then the two priced sources in `order`.
fn allocate(ctx: &WaterContext, order: Order, groundwater_limit: f64) -> WaterDecision {
    let mut remaining = ctx.demand_m3.max(0.0);
    let storage_m3 = take(&mut remaining, ctx.storage_available_m3);

    let (groundwater_m3, municipal_m3) = match order {
        Order::GroundwaterFirst => {
            let gw = take(&mut remaining, groundwater_limit);
            let muni = take(&mut remaining, ctx.municipal_capacity_m3);
            (gw, muni)
        }
        Order::MunicipalFirst => {
            let muni = take(&mut remaining, ctx.municipal_capacity_m3);
            let gw = take(&mut remaining, groundwater_limit);
            (gw, muni)
        }
    };

    WaterDecision {
        demand_m3: ctx.demand_m3,
        storage_m3,
        groundwater_m3,
        municipal_m3,
        unmet_m3: remaining,
        groundwater_energy_kwh: groundwater_m3 * ctx.groundwater_energy_kwh_per_m3,
        groundwater_cost: groundwater_m3 * ctx.groundwater_cost_per_m3,
        municipal_cost: municipal_m3 * ctx.municipal_tariff_per_m3,
    }
}
