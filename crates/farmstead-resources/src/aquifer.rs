//! Shared aquifer with drawdown feedback on pumping energy.
//!
//! The aquifer is a scalar abstraction: an exploitable volume, the
//! cumulative extraction drawn from it, and an annual recharge rate. As
//! cumulative extraction grows the water table drops (drawdown), the pumping
//! head grows, and every cubic metre costs more energy to lift:
//!
//! - `drawdown = min(max_drawdown, max_drawdown * cumulative / initial)`
//! - `head = well_depth + drawdown`
//! - `kWh/m3 = rho * g * head / (3.6e6 * efficiency)`
//!
//! Drawdown is recomputed from cumulative extraction on every read; nothing
//! is cached, so cost always tracks depletion. Beyond saturation the
//! marginal cost is flat.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ResourceError, check_quantity};
use crate::transfer::Withdrawal;

/// Density of water (kg/m³).
pub const WATER_DENSITY_KG_PER_M3: f64 = 1000.0;

/// Gravitational acceleration (m/s²).
pub const GRAVITY_M_PER_S2: f64 = 9.81;

/// Joules per kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3.6e6;

/// Remaining volume at or below which the aquifer counts as depleted (m³).
pub const DEPLETION_EPSILON_M3: f64 = 1e-9;

const fn default_pump_efficiency() -> f64 {
    1.0
}

/// Initial aquifer parameters, as read from the scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AquiferParams {
    /// Exploitable volume at the start of the run (m³).
    pub initial_volume_m3: f64,
    /// Annual natural recharge (m³/yr).
    pub recharge_rate_m3_per_year: f64,
    /// Drawdown at full depletion (m).
    pub max_drawdown_m: f64,
    /// Static well depth to the water table (m).
    pub well_depth_m: f64,
    /// Wire-to-water pump efficiency in (0, 1].
    #[serde(default = "default_pump_efficiency")]
    pub pump_efficiency: f64,
}

/// The shared aquifer. Exclusively owned by the scenario state; policies
/// only see [`AquiferState`] readings through their context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AquiferState {
    initial_volume_m3: f64,
    exploitable_volume_remaining_m3: f64,
    cumulative_extraction_m3: f64,
    recharge_rate_m3_per_year: f64,
    max_drawdown_m: f64,
    well_depth_m: f64,
    pump_efficiency: f64,
}

impl AquiferState {
    /// Create a full aquifer from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidParameters`] if the volume is not
    /// positive, a rate or head is negative or non-finite, or the efficiency
    /// is outside (0, 1].
    pub fn new(params: AquiferParams) -> Result<Self, ResourceError> {
        let invalid = |reason: &str| ResourceError::InvalidParameters {
            resource: "aquifer",
            reason: reason.to_owned(),
        };
        if !(params.initial_volume_m3.is_finite() && params.initial_volume_m3 > 0.0) {
            return Err(invalid("initial volume must be positive and finite"));
        }
        for (name, value) in [
            ("recharge rate", params.recharge_rate_m3_per_year),
            ("max drawdown", params.max_drawdown_m),
            ("well depth", params.well_depth_m),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(&format!("{name} must be finite and non-negative")));
            }
        }
        if !(params.pump_efficiency > 0.0 && params.pump_efficiency <= 1.0) {
            return Err(invalid("pump efficiency must be in (0, 1]"));
        }

        Ok(Self {
            initial_volume_m3: params.initial_volume_m3,
            exploitable_volume_remaining_m3: params.initial_volume_m3,
            cumulative_extraction_m3: 0.0,
            recharge_rate_m3_per_year: params.recharge_rate_m3_per_year,
            max_drawdown_m: params.max_drawdown_m,
            well_depth_m: params.well_depth_m,
            pump_efficiency: params.pump_efficiency,
        })
    }

    /// Exploitable volume at the start of the run (m³).
    pub const fn initial_volume_m3(&self) -> f64 {
        self.initial_volume_m3
    }

    /// Exploitable volume still in the ground (m³).
    pub const fn remaining_m3(&self) -> f64 {
        self.exploitable_volume_remaining_m3
    }

    /// Total extracted since the start of the run (m³).
    pub const fn cumulative_extraction_m3(&self) -> f64 {
        self.cumulative_extraction_m3
    }

    /// Annual recharge (m³/yr).
    pub const fn recharge_rate_m3_per_year(&self) -> f64 {
        self.recharge_rate_m3_per_year
    }

    /// Current drawdown (m), saturating at the configured maximum.
    pub fn drawdown_m(&self) -> f64 {
        let proportional =
            self.max_drawdown_m * self.cumulative_extraction_m3 / self.initial_volume_m3;
        proportional.min(self.max_drawdown_m)
    }

    /// Pumping head: well depth plus drawdown (m).
    pub fn effective_head_m(&self) -> f64 {
        self.well_depth_m + self.drawdown_m()
    }

    /// Energy to lift one cubic metre at the current head (kWh/m³).
    pub fn pumping_energy_per_m3(&self) -> f64 {
        self.lift_energy(self.effective_head_m())
    }

    /// Pumping energy at saturated drawdown; an upper bound on
    /// [`pumping_energy_per_m3`](Self::pumping_energy_per_m3).
    pub fn max_pumping_energy_per_m3(&self) -> f64 {
        self.lift_energy(self.well_depth_m + self.max_drawdown_m)
    }

    fn lift_energy(&self, head_m: f64) -> f64 {
        WATER_DENSITY_KG_PER_M3 * GRAVITY_M_PER_S2 * head_m
            / (JOULES_PER_KWH * self.pump_efficiency)
    }

    /// Remaining volume as a fraction of the initial volume.
    pub fn remaining_fraction(&self) -> f64 {
        self.exploitable_volume_remaining_m3 / self.initial_volume_m3
    }

    /// Whether the exploitable volume has run out.
    pub fn is_depleted(&self) -> bool {
        self.exploitable_volume_remaining_m3 <= DEPLETION_EPSILON_M3
    }

    /// Extract exactly `volume` m³.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite volume and [`ResourceError::ResourceExhausted`] when the
    /// volume exceeds what remains. State is untouched on error.
    pub fn apply_extraction(&mut self, volume: f64) -> Result<(), ResourceError> {
        check_quantity("extraction", volume)?;
        if volume > self.exploitable_volume_remaining_m3 {
            return Err(ResourceError::ResourceExhausted {
                requested: volume,
                available: self.exploitable_volume_remaining_m3,
            });
        }
        self.exploitable_volume_remaining_m3 =
            (self.exploitable_volume_remaining_m3 - volume).max(0.0);
        self.cumulative_extraction_m3 += volume;
        Ok(())
    }

    /// Extract up to `volume` m³, clamping at what remains.
    ///
    /// A request beyond the remaining volume takes everything left and
    /// reports the rest as shortfall; the run carries on.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite volume.
    pub fn extract_clamped(&mut self, volume: f64) -> Result<Withdrawal, ResourceError> {
        match self.apply_extraction(volume) {
            Ok(()) => Ok(Withdrawal::full(volume)),
            Err(ResourceError::ResourceExhausted {
                requested,
                available,
            }) => {
                warn!(
                    requested_m3 = requested,
                    available_m3 = available,
                    "aquifer exhausted, clamping extraction"
                );
                self.apply_extraction(available)?;
                Ok(Withdrawal {
                    delivered: available,
                    shortfall: requested - available,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Add natural recharge for `year_fraction` of a year, capped at the
    /// initial exploitable volume. Returns the volume actually added.
    ///
    /// Cumulative extraction is not reduced, so drawdown is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite fraction.
    pub fn apply_recharge(&mut self, year_fraction: f64) -> Result<f64, ResourceError> {
        check_quantity("recharge", year_fraction)?;
        let headroom = (self.initial_volume_m3 - self.exploitable_volume_remaining_m3).max(0.0);
        let added = (self.recharge_rate_m3_per_year * year_fraction).min(headroom);
        self.exploitable_volume_remaining_m3 += added;
        Ok(added)
    }
}

/// Recharge-to-extraction ratio; above 1.0 the aquifer is used sustainably.
///
/// Infinite when nothing was extracted.
pub fn sustainability_ratio(recharge_m3: f64, extraction_m3: f64) -> f64 {
    if extraction_m3 > 0.0 {
        recharge_m3 / extraction_m3
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_params() -> AquiferParams {
        AquiferParams {
            initial_volume_m3: 500_000.0,
            recharge_rate_m3_per_year: 5_000.0,
            max_drawdown_m: 10.0,
            well_depth_m: 60.0,
            pump_efficiency: 1.0,
        }
    }

    fn make_aquifer() -> AquiferState {
        AquiferState::new(make_params()).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn extraction_raises_drawdown_and_head() {
        let mut aquifer = make_aquifer();
        aquifer.apply_extraction(50_000.0).unwrap();
        assert!(approx(aquifer.drawdown_m(), 1.0));
        assert!(approx(aquifer.effective_head_m(), 61.0));
        assert!(approx(aquifer.remaining_m3(), 450_000.0));
        assert!(approx(aquifer.cumulative_extraction_m3(), 50_000.0));
    }

    #[test]
    fn pumping_energy_matches_lift_formula() {
        let aquifer = make_aquifer();
        let expected = 1000.0 * 9.81 * 60.0 / 3.6e6;
        assert!(approx(aquifer.pumping_energy_per_m3(), expected));
    }

    #[test]
    fn efficiency_scales_energy() {
        let mut params = make_params();
        params.pump_efficiency = 0.5;
        let half = AquiferState::new(params).unwrap();
        let full = make_aquifer();
        assert!(approx(
            half.pumping_energy_per_m3(),
            2.0 * full.pumping_energy_per_m3()
        ));
    }

    #[test]
    fn over_extraction_fails_without_mutation() {
        let mut aquifer = make_aquifer();
        let result = aquifer.apply_extraction(600_000.0);
        assert!(matches!(
            result,
            Err(ResourceError::ResourceExhausted { .. })
        ));
        assert!(approx(aquifer.remaining_m3(), 500_000.0));
        assert!(approx(aquifer.cumulative_extraction_m3(), 0.0));
    }

    #[test]
    fn clamped_extraction_reports_shortfall() {
        let mut aquifer = make_aquifer();
        aquifer.apply_extraction(499_900.0).unwrap();
        let w = aquifer.extract_clamped(150.0).unwrap();
        assert!(approx(w.delivered, 100.0));
        assert!(approx(w.shortfall, 50.0));
        assert!(aquifer.is_depleted());
    }

    #[test]
    fn negative_extraction_is_invalid() {
        let mut aquifer = make_aquifer();
        assert!(matches!(
            aquifer.extract_clamped(-1.0),
            Err(ResourceError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn drawdown_saturates() {
        let mut aquifer = make_aquifer();
        aquifer.apply_extraction(500_000.0).unwrap();
        aquifer.apply_recharge(10.0).unwrap();
        aquifer.apply_extraction(40_000.0).unwrap();
        assert!(approx(aquifer.drawdown_m(), 10.0));
        assert!(approx(
            aquifer.pumping_energy_per_m3(),
            aquifer.max_pumping_energy_per_m3()
        ));
    }

    #[test]
    fn recharge_is_capped_at_initial_volume() {
        let mut aquifer = make_aquifer();
        aquifer.apply_extraction(1_000.0).unwrap();
        let added = aquifer.apply_recharge(1.0).unwrap();
        assert!(approx(added, 1_000.0));
        assert!(approx(aquifer.remaining_m3(), 500_000.0));
    }

    #[test]
    fn recharge_leaves_drawdown_unchanged() {
        let mut aquifer = make_aquifer();
        aquifer.apply_extraction(50_000.0).unwrap();
        aquifer.apply_recharge(1.0).unwrap();
        assert!(approx(aquifer.drawdown_m(), 1.0));
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut params = make_params();
        params.initial_volume_m3 = 0.0;
        assert!(AquiferState::new(params).is_err());

        let mut params = make_params();
        params.pump_efficiency = 1.5;
        assert!(AquiferState::new(params).is_err());

        let mut params = make_params();
        params.well_depth_m = f64::NAN;
        assert!(AquiferState::new(params).is_err());
    }

    #[test]
    fn sustainability_ratio_handles_zero_extraction() {
        assert!(sustainability_ratio(10.0, 0.0).is_infinite());
        assert!(approx(sustainability_ratio(5.0, 10.0), 0.5));
    }

    #[test]
    fn params_default_efficiency() {
        let json = r#"{
            "initial_volume_m3": 1000.0,
            "recharge_rate_m3_per_year": 0.0,
            "max_drawdown_m": 5.0,
            "well_depth_m": 20.0
        }"#;
        let params: AquiferParams = serde_json::from_str(json).unwrap();
        assert!(approx(params.pump_efficiency, 1.0));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn pumping_energy_monotone_and_bounded(
                draws in proptest::collection::vec(0.0_f64..50_000.0, 1..40)
            ) {
                let mut aquifer = make_aquifer();
                let mut previous = aquifer.pumping_energy_per_m3();
                for draw in draws {
                    let before_cumulative = aquifer.cumulative_extraction_m3();
                    let w = aquifer.extract_clamped(draw).unwrap();
                    let energy = aquifer.pumping_energy_per_m3();
                    prop_assert!(energy >= previous);
                    prop_assert!(energy <= aquifer.max_pumping_energy_per_m3() + 1e-12);
                    let saturated = aquifer.drawdown_m() >= 10.0 - 1e-12;
                    if w.delivered > 1e-6 && !saturated && before_cumulative < 500_000.0 {
                        prop_assert!(energy > previous);
                    }
                    prop_assert!(aquifer.remaining_m3() >= 0.0);
                    previous = energy;
                }
            }

            #[test]
            fn annual_recharge_equals_sum_of_fractions(
                extracted in 0.0_f64..500_000.0,
                pieces in 1_usize..366,
            ) {
                let mut whole = make_aquifer();
                whole.apply_extraction(extracted).unwrap();
                let mut split = whole.clone();

                let added_whole = whole.apply_recharge(1.0).unwrap();
                let fraction = 1.0 / f64::from(u32::try_from(pieces).unwrap());
                let mut added_split = 0.0;
                for _ in 0..pieces {
                    added_split += split.apply_recharge(fraction).unwrap();
                }
                prop_assert!((added_whole - added_split).abs() < 1e-6);
                prop_assert!((whole.remaining_m3() - split.remaining_m3()).abs() < 1e-6);
            }
        }
    }
}
