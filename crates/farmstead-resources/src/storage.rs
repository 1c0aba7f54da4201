//! Community water storage with capacity clamping and evaporation.
//!
//! The stored volume stays within `[0, capacity]` under any sequence of
//! deposits, withdrawals, and evaporation. Overflow on deposit is reported
//! back to the caller as spill, and over-withdrawal fails with
//! [`ResourceError::InsufficientStorage`] so the caller can reduce the draw
//! and record a shortfall.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ResourceError, check_quantity};
use crate::transfer::{Deposit, Withdrawal};

/// Initial storage parameters, as read from the scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageParams {
    /// Maximum volume (m³).
    pub capacity_m3: f64,
    /// Volume held at the start of the run (m³).
    #[serde(default)]
    pub initial_volume_m3: f64,
    /// Share of the stored volume lost to evaporation per year (%).
    #[serde(default)]
    pub evaporation_rate_annual_pct: f64,
}

/// The community storage tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterStorageState {
    capacity_m3: f64,
    current_volume_m3: f64,
    evaporation_rate_annual_pct: f64,
}

impl WaterStorageState {
    /// Create a storage tank from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidParameters`] unless
    /// `0 <= initial <= capacity` and the evaporation rate is in `[0, 100]`.
    pub fn new(params: StorageParams) -> Result<Self, ResourceError> {
        let invalid = |reason: &str| ResourceError::InvalidParameters {
            resource: "storage",
            reason: reason.to_owned(),
        };
        if !(params.capacity_m3.is_finite() && params.capacity_m3 >= 0.0) {
            return Err(invalid("capacity must be finite and non-negative"));
        }
        if !(params.initial_volume_m3 >= 0.0 && params.initial_volume_m3 <= params.capacity_m3) {
            return Err(invalid("initial volume must lie within [0, capacity]"));
        }
        if !(0.0..=100.0).contains(&params.evaporation_rate_annual_pct) {
            return Err(invalid("evaporation rate must lie within [0, 100] percent"));
        }
        Ok(Self {
            capacity_m3: params.capacity_m3,
            current_volume_m3: params.initial_volume_m3,
            evaporation_rate_annual_pct: params.evaporation_rate_annual_pct,
        })
    }

    /// Maximum volume (m³).
    pub const fn capacity_m3(&self) -> f64 {
        self.capacity_m3
    }

    /// Volume currently held (m³).
    pub const fn current_volume_m3(&self) -> f64 {
        self.current_volume_m3
    }

    /// Free space left (m³).
    pub fn headroom_m3(&self) -> f64 {
        (self.capacity_m3 - self.current_volume_m3).max(0.0)
    }

    /// Current volume as a fraction of capacity; zero for a zero-capacity tank.
    pub fn fill_fraction(&self) -> f64 {
        if self.capacity_m3 > 0.0 {
            self.current_volume_m3 / self.capacity_m3
        } else {
            0.0
        }
    }

    /// Add `volume` m³, clamping at capacity. The excess is reported as
    /// overflow, never silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite volume.
    pub fn deposit(&mut self, volume: f64) -> Result<Deposit, ResourceError> {
        check_quantity("deposit", volume)?;
        let accepted = volume.min(self.headroom_m3());
        self.current_volume_m3 = (self.current_volume_m3 + accepted).min(self.capacity_m3);
        let overflow = volume - accepted;
        if overflow > 0.0 {
            warn!(
                overflow_m3 = overflow,
                capacity_m3 = self.capacity_m3,
                "storage full, inflow spilled"
            );
        }
        Ok(Deposit { accepted, overflow })
    }

    /// Remove exactly `volume` m³.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite volume and [`ResourceError::InsufficientStorage`] when the
    /// volume exceeds what is stored. State is untouched on error.
    pub fn withdraw(&mut self, volume: f64) -> Result<(), ResourceError> {
        check_quantity("withdrawal", volume)?;
        if volume > self.current_volume_m3 {
            return Err(ResourceError::InsufficientStorage {
                requested: volume,
                available: self.current_volume_m3,
            });
        }
        self.current_volume_m3 = (self.current_volume_m3 - volume).max(0.0);
        Ok(())
    }

    /// Remove up to `volume` m³, delivering what is stored and reporting
    /// the rest as shortfall.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite volume.
    pub fn draw_clamped(&mut self, volume: f64) -> Result<Withdrawal, ResourceError> {
        match self.withdraw(volume) {
            Ok(()) => Ok(Withdrawal::full(volume)),
            Err(ResourceError::InsufficientStorage {
                requested,
                available,
            }) => {
                warn!(
                    requested_m3 = requested,
                    available_m3 = available,
                    "insufficient storage, clamping withdrawal"
                );
                self.withdraw(available)?;
                Ok(Withdrawal {
                    delivered: available,
                    shortfall: requested - available,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Evaporate for `period_fraction` of a year. Returns the volume lost.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidQuantity`] for a negative or
    /// non-finite fraction.
    pub fn apply_evaporation(&mut self, period_fraction: f64) -> Result<f64, ResourceError> {
        check_quantity("evaporation", period_fraction)?;
        let loss = (self.current_volume_m3 * self.evaporation_rate_annual_pct / 100.0
            * period_fraction)
            .min(self.current_volume_m3);
        self.current_volume_m3 = (self.current_volume_m3 - loss).max(0.0);
        Ok(loss)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_storage(capacity: f64, current: f64, evaporation_pct: f64) -> WaterStorageState {
        WaterStorageState::new(StorageParams {
            capacity_m3: capacity,
            initial_volume_m3: current,
            evaporation_rate_annual_pct: evaporation_pct,
        })
        .unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn deposit_overflow_then_withdraw_shortfall() {
        let mut storage = make_storage(200.0, 50.0, 0.0);

        let deposit = storage.deposit(300.0).unwrap();
        assert!(approx(storage.current_volume_m3(), 200.0));
        assert!(approx(deposit.accepted, 150.0));
        assert!(approx(deposit.overflow, 150.0));

        assert!(matches!(
            storage.withdraw(250.0),
            Err(ResourceError::InsufficientStorage { .. })
        ));
        assert!(approx(storage.current_volume_m3(), 200.0));

        let w = storage.draw_clamped(250.0).unwrap();
        assert!(approx(w.delivered, 200.0));
        assert!(approx(w.shortfall, 50.0));
        assert!(w.is_short());
        assert!(approx(storage.current_volume_m3(), 0.0));
    }

    #[test]
    fn full_draw_has_no_shortfall() {
        let mut storage = make_storage(100.0, 80.0, 0.0);
        let w = storage.draw_clamped(30.0).unwrap();
        assert!(!w.is_short());
        assert!(approx(storage.current_volume_m3(), 50.0));
    }

    #[test]
    fn evaporation_scales_with_period_fraction() {
        let mut storage = make_storage(1_000.0, 1_000.0, 36.5);
        let loss = storage.apply_evaporation(1.0 / 365.0).unwrap();
        assert!(approx(loss, 1.0));
        assert!(approx(storage.current_volume_m3(), 999.0));
    }

    #[test]
    fn fill_fraction_and_headroom() {
        let storage = make_storage(200.0, 50.0, 0.0);
        assert!(approx(storage.fill_fraction(), 0.25));
        assert!(approx(storage.headroom_m3(), 150.0));
        assert!(approx(make_storage(0.0, 0.0, 0.0).fill_fraction(), 0.0));
    }

    #[test]
    fn rejects_bad_parameters() {
        let params = StorageParams {
            capacity_m3: 10.0,
            initial_volume_m3: 20.0,
            evaporation_rate_annual_pct: 0.0,
        };
        assert!(WaterStorageState::new(params).is_err());

        let params = StorageParams {
            capacity_m3: 10.0,
            initial_volume_m3: 0.0,
            evaporation_rate_annual_pct: 120.0,
        };
        assert!(WaterStorageState::new(params).is_err());
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Deposit(f64),
            Withdraw(f64),
            Draw(f64),
            Evaporate(f64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0.0_f64..1_000.0).prop_map(Op::Deposit),
                (0.0_f64..1_000.0).prop_map(Op::Withdraw),
                (0.0_f64..1_000.0).prop_map(Op::Draw),
                (0.0_f64..2.0).prop_map(Op::Evaporate),
            ]
        }

        proptest! {
            #[test]
            fn volume_stays_within_bounds(
                capacity in 0.0_f64..500.0,
                fill in 0.0_f64..=1.0,
                evaporation in 0.0_f64..=100.0,
                ops in proptest::collection::vec(op(), 0..60),
            ) {
                let mut storage = make_storage(capacity, capacity * fill, evaporation);
                for op in ops {
                    let before = storage.current_volume_m3();
                    match op {
                        Op::Deposit(v) => {
                            let d = storage.deposit(v).unwrap();
                            prop_assert!((d.accepted + d.overflow - v).abs() < 1e-9);
                        }
                        Op::Withdraw(v) => {
                            let _ = storage.withdraw(v);
                        }
                        Op::Draw(v) => {
                            let w = storage.draw_clamped(v).unwrap();
                            prop_assert!((w.delivered + w.shortfall - v).abs() < 1e-9);
                            prop_assert!(w.delivered <= before + 1e-9);
                        }
                        Op::Evaporate(f) => {
                            let loss = storage.apply_evaporation(f).unwrap();
                            prop_assert!(loss <= before + 1e-9);
                        }
                    }
                    prop_assert!(storage.current_volume_m3() >= 0.0);
                    prop_assert!(storage.current_volume_m3() <= storage.capacity_m3());
                }
            }
        }
    }
}
