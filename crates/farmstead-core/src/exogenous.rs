//! Exogenous drivers: weather, demand, harvest, and prices per period.
//!
//! An [`ExogenousSeries`] holds one [`PeriodDrivers`] per period. It is
//! either loaded from a YAML (or JSON) file or generated by
//! [`ExogenousSeries::synthetic`] from a seed. Generation draws from a
//! seeded [`StdRng`], so the same seed, start date, and length always give
//! the same series.

use std::f64::consts::TAU;
use std::path::Path;

use chrono::{Datelike, Days, NaiveDate};
use farmstead_types::{Granularity, PeriodDrivers};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::clock::{ClockError, PeriodClock};
use crate::config::ConfigError;

/// Day of year on which the seasonal curve crosses zero going up.
const SPRING_ORIGIN_DAY: f64 = 105.0;
/// Mean year length used by the seasonal curve (days).
const SEASON_LENGTH_DAYS: f64 = 365.25;
/// Harvest window, as inclusive days of year (June through September).
const HARVEST_WINDOW: std::ops::RangeInclusive<u32> = 152..=273;

/// Drivers for every period of a run, in period order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExogenousSeries {
    periods: Vec<PeriodDrivers>,
}

impl ExogenousSeries {
    /// Wrap and validate explicit drivers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSeries`] for the first unusable entry.
    pub fn new(periods: Vec<PeriodDrivers>) -> Result<Self, ConfigError> {
        let series = Self { periods };
        series.validate()?;
        Ok(series)
    }

    /// Load a series from a file holding `{ periods: [...] }` as YAML or
    /// JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`], [`ConfigError::Yaml`], or
    /// [`ConfigError::InvalidSeries`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a series from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::InvalidSeries`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let series: Self = serde_yml::from_str(text)?;
        series.validate()?;
        Ok(series)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (period, d) in self.periods.iter().enumerate() {
            let bad = |reason: String| ConfigError::InvalidSeries { period, reason };
            if !d.temperature_c.is_finite() {
                return Err(bad(format!("temperature_c is {}", d.temperature_c)));
            }
            for (what, value) in [
                ("irrigation_m3_per_ha", d.irrigation_m3_per_ha),
                ("base_water_m3", d.base_water_m3),
                ("base_energy_kwh", d.base_energy_kwh),
                ("pv_kwh_per_kw", d.pv_kwh_per_kw),
                ("harvest_kg_per_ha", d.harvest_kg_per_ha),
                ("storage_inflow_m3", d.storage_inflow_m3),
                ("price_multiplier", d.price_multiplier),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(bad(format!("{what} must be finite and non-negative, got {value}")));
                }
            }
        }
        Ok(())
    }

    /// Number of periods covered.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether the series covers no period.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// All drivers in period order.
    pub fn periods(&self) -> &[PeriodDrivers] {
        &self.periods
    }

    /// Drivers for `period`, if covered.
    pub fn get(&self, period: u32) -> Option<&PeriodDrivers> {
        usize::try_from(period)
            .ok()
            .and_then(|index| self.periods.get(index))
    }

    /// Require the series to cover `horizon` periods.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SeriesTooShort`] otherwise.
    pub fn ensure_covers(&self, horizon: u32) -> Result<(), ConfigError> {
        let covered = usize::try_from(horizon).is_ok_and(|needed| needed <= self.periods.len());
        if covered {
            Ok(())
        } else {
            Err(ConfigError::SeriesTooShort {
                needed: horizon,
                available: self.periods.len(),
            })
        }
    }

    /// Generate `periods` periods of seasonal drivers from `seed`.
    ///
    /// Days are drawn one at a time. Annual periods aggregate their days:
    /// flows are summed, temperature and price multiplier averaged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Clock`] if the calendar cannot cover the
    /// requested length.
    pub fn synthetic(seed: u64, periods: u32, clock: &PeriodClock) -> Result<Self, ConfigError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = Vec::new();
        for period in 0..periods {
            let date = clock.date_of(period)?;
            let drivers = match clock.granularity() {
                Granularity::Daily => synthetic_day(&mut rng, date),
                Granularity::Annual => {
                    let days = clock.days_in_period(period)?;
                    aggregate_year(&mut rng, date, days, period)?
                }
            };
            out.push(drivers);
        }
        Ok(Self { periods: out })
    }
}

/// Seasonal position in [-1, 1], peaking in mid-July.
fn season(date: NaiveDate) -> f64 {
    let day = f64::from(date.ordinal());
    (TAU * (day - SPRING_ORIGIN_DAY) / SEASON_LENGTH_DAYS).sin()
}

fn synthetic_day(rng: &mut StdRng, date: NaiveDate) -> PeriodDrivers {
    let s = season(date);

    let cloud = if rng.random_bool(0.2) {
        rng.random_range(0.3..0.7_f64)
    } else {
        rng.random_range(0.85..1.0_f64)
    };
    let harvest_kg_per_ha = if HARVEST_WINDOW.contains(&date.ordinal()) {
        80.0 * rng.random_range(0.6..1.4_f64)
    } else {
        0.0
    };
    let rain_chance = 0.08f64.mul_add(-s, 0.12).clamp(0.0, 1.0);
    let storage_inflow_m3 = if rng.random_bool(rain_chance) {
        rng.random_range(20.0..300.0_f64)
    } else {
        0.0
    };

    PeriodDrivers {
        irrigation_m3_per_ha: 30.0f64.mul_add(s, 25.0).max(0.0) * rng.random_range(0.85..1.15_f64),
        base_water_m3: 2.0 * rng.random_range(0.9..1.1_f64),
        base_energy_kwh: 60.0 * rng.random_range(0.9..1.1_f64),
        pv_kwh_per_kw: 1.8f64.mul_add(s, 4.2) * cloud,
        harvest_kg_per_ha,
        storage_inflow_m3,
        temperature_c: 11.0f64.mul_add(s, 16.0) + rng.random_range(-3.0..3.0_f64),
        price_multiplier: (0.25f64.mul_add(-s, 1.0) + rng.random_range(-0.05..0.05_f64)).max(0.2),
    }
}

fn aggregate_year(
    rng: &mut StdRng,
    start: NaiveDate,
    days: u32,
    period: u32,
) -> Result<PeriodDrivers, ConfigError> {
    let mut total = PeriodDrivers {
        irrigation_m3_per_ha: 0.0,
        base_water_m3: 0.0,
        base_energy_kwh: 0.0,
        pv_kwh_per_kw: 0.0,
        harvest_kg_per_ha: 0.0,
        storage_inflow_m3: 0.0,
        temperature_c: 0.0,
        price_multiplier: 0.0,
    };
    for offset in 0..days {
        let date = start
            .checked_add_days(Days::new(u64::from(offset)))
            .ok_or(ClockError::DateOverflow { period })?;
        let day = synthetic_day(rng, date);
        total.irrigation_m3_per_ha += day.irrigation_m3_per_ha;
        total.base_water_m3 += day.base_water_m3;
        total.base_energy_kwh += day.base_energy_kwh;
        total.pv_kwh_per_kw += day.pv_kwh_per_kw;
        total.harvest_kg_per_ha += day.harvest_kg_per_ha;
        total.storage_inflow_m3 += day.storage_inflow_m3;
        total.temperature_c += day.temperature_c;
        total.price_multiplier += day.price_multiplier;
    }
    let n = f64::from(days.max(1));
    total.temperature_c /= n;
    total.price_multiplier /= n;
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Flat drivers: the same values every period.
    pub(crate) fn make_drivers(irrigation_m3_per_ha: f64, harvest_kg_per_ha: f64) -> PeriodDrivers {
        PeriodDrivers {
            irrigation_m3_per_ha,
            base_water_m3: 2.0,
            base_energy_kwh: 50.0,
            pv_kwh_per_kw: 5.0,
            harvest_kg_per_ha,
            storage_inflow_m3: 0.0,
            temperature_c: 20.0,
            price_multiplier: 1.0,
        }
    }

    pub(crate) fn make_series(periods: usize, irrigation_m3_per_ha: f64) -> ExogenousSeries {
        ExogenousSeries::new(vec![make_drivers(irrigation_m3_per_ha, 10.0); periods]).unwrap()
    }

    fn daily_clock() -> PeriodClock {
        PeriodClock::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), Granularity::Daily)
    }

    #[test]
    fn synthetic_is_deterministic_per_seed() {
        let a = ExogenousSeries::synthetic(7, 400, &daily_clock()).unwrap();
        let b = ExogenousSeries::synthetic(7, 400, &daily_clock()).unwrap();
        let c = ExogenousSeries::synthetic(8, 400, &daily_clock()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 400);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn synthetic_harvest_is_seasonal() {
        let series = ExogenousSeries::synthetic(1, 365, &daily_clock()).unwrap();
        // January has no harvest, July does.
        assert!(series.get(10).unwrap().harvest_kg_per_ha.abs() < f64::EPSILON);
        assert!(series.get(190).unwrap().harvest_kg_per_ha > 0.0);
        let winter = series.get(15).unwrap().irrigation_m3_per_ha;
        let summer = series.get(196).unwrap().irrigation_m3_per_ha;
        assert!(summer > winter);
    }

    #[test]
    fn annual_periods_aggregate_days() {
        let clock = PeriodClock::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            Granularity::Annual,
        );
        let annual = ExogenousSeries::synthetic(3, 2, &clock).unwrap();
        let daily = ExogenousSeries::synthetic(3, 365, &daily_clock()).unwrap();
        let first = annual.get(0).unwrap();
        let summed: f64 = daily.periods().iter().map(|d| d.irrigation_m3_per_ha).sum();
        assert!((first.irrigation_m3_per_ha - summed).abs() < 1e-6);
        assert!(first.temperature_c > 0.0 && first.temperature_c < 40.0);
    }

    #[test]
    fn parse_rejects_negative_values() {
        let yaml = "periods:\n  - irrigation_m3_per_ha: -1.0\n    base_water_m3: 0.0\n    base_energy_kwh: 0.0\n    pv_kwh_per_kw: 0.0\n    harvest_kg_per_ha: 0.0\n    storage_inflow_m3: 0.0\n    temperature_c: 10.0\n    price_multiplier: 1.0\n";
        assert!(matches!(
            ExogenousSeries::parse(yaml),
            Err(ConfigError::InvalidSeries { period: 0, .. })
        ));
    }

    #[test]
    fn parse_accepts_json() {
        let json = serde_json::json!({ "periods": [make_drivers(30.0, 0.0)] }).to_string();
        let series = ExogenousSeries::parse(&json).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn coverage_check() {
        let series = make_series(5, 10.0);
        assert!(series.ensure_covers(5).is_ok());
        assert!(matches!(
            series.ensure_covers(6),
            Err(ConfigError::SeriesTooShort {
                needed: 6,
                available: 5
            })
        ));
        assert!(series.get(5).is_none());
    }
}
