//! Irrigation policies.

use farmstead_types::{CropContext, CropDecision, Domain};
use serde::{Deserialize, Serialize};

use crate::Policy;
use crate::error::{PolicyError, check_share};

/// Selection of an irrigation rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum CropPolicy {
    /// Apply the full requirement every period.
    #[default]
    FullIrrigation,
    /// Apply a fixed share of the requirement.
    DeficitIrrigation {
        /// Share of the requirement applied, in `[0, 1]`.
        fraction: f64,
    },
    /// Full irrigation in hot periods, a reduced share otherwise.
    WeatherAdaptive {
        /// Temperature at or above which the full requirement is applied (°C).
        hot_threshold_c: f64,
        /// Share applied below the threshold, in `[0, 1]`.
        cool_fraction: f64,
    },
}

impl Policy for CropPolicy {
    const DOMAIN: Domain = Domain::Crop;
    type Context = CropContext;
    type Decision = CropDecision;

    fn name(&self) -> &'static str {
        match self {
            Self::FullIrrigation => "full_irrigation",
            Self::DeficitIrrigation { .. } => "deficit_irrigation",
            Self::WeatherAdaptive { .. } => "weather_adaptive",
        }
    }

    fn decide(&self, ctx: &CropContext) -> CropDecision {
        let requirement = ctx.requirement_m3.max(0.0);
        let fraction = match *self {
            Self::FullIrrigation => 1.0,
            Self::DeficitIrrigation { fraction } => fraction,
            Self::WeatherAdaptive {
                hot_threshold_c,
                cool_fraction,
            } => {
                if ctx.temperature_c >= hot_threshold_c {
                    1.0
                } else {
                    cool_fraction
                }
            }
        };
        let applied_m3 = requirement * fraction.clamp(0.0, 1.0);
        CropDecision {
            requirement_m3: ctx.requirement_m3,
            applied_m3,
            deficit_m3: (requirement - applied_m3).max(0.0),
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        match *self {
            Self::FullIrrigation => Ok(()),
            Self::DeficitIrrigation { fraction } => check_share(self.name(), "fraction", fraction),
            Self::WeatherAdaptive {
                hot_threshold_c,
                cool_fraction,
            } => {
                if !hot_threshold_c.is_finite() {
                    return Err(PolicyError::InvalidParameter {
                        policy: self.name(),
                        reason: String::from("hot_threshold_c must be finite"),
                    });
                }
                check_share(self.name(), "cool_fraction", cool_fraction)
            }
        }
    }
}
