//! Period observer that logs run progress.

use farmstead_core::orchestrator::PeriodObserver;
use farmstead_types::PeriodRecord;
use tracing::{debug, info};

/// Logs a progress line every `every` periods and a debug line per period.
pub struct ProgressObserver {
    every: u32,
    periods_seen: u32,
}

impl ProgressObserver {
    /// Report every `every` periods; zero is treated as one.
    pub const fn new(every: u32) -> Self {
        Self {
            every: if every == 0 { 1 } else { every },
            periods_seen: 0,
        }
    }

    /// Periods observed so far.
    pub const fn periods_seen(&self) -> u32 {
        self.periods_seen
    }
}

impl PeriodObserver for ProgressObserver {
    fn on_period(&mut self, record: &PeriodRecord) {
        self.periods_seen = self.periods_seen.saturating_add(1);
        let net_income: f64 = record.farms.iter().map(|f| f.net_income).sum();
        debug!(
            period = record.period,
            date = %record.date,
            net_income,
            "Period recorded"
        );
        if self.periods_seen.checked_rem(self.every) == Some(0) {
            info!(
                period = record.period,
                date = %record.date,
                aquifer_remaining_fraction = record.resources.aquifer_remaining_fraction,
                drawdown_m = record.resources.drawdown_m,
                storage_fill_fraction = record.resources.storage_fill_fraction,
                "Progress"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use farmstead_types::ResourceSnapshot;

    use super::*;

    fn make_record(period: u32) -> PeriodRecord {
        PeriodRecord {
            period,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            year_index: 0,
            farms: Vec::new(),
            resources: ResourceSnapshot {
                aquifer_remaining_m3: 1_000.0,
                aquifer_remaining_fraction: 1.0,
                cumulative_extraction_m3: 0.0,
                drawdown_m: 0.0,
                pumping_energy_kwh_per_m3: 0.16,
                recharge_m3: 0.0,
                storage_volume_m3: 0.0,
                storage_fill_fraction: 0.0,
                storage_inflow_m3: 0.0,
                storage_spill_m3: 0.0,
                evaporation_m3: 0.0,
            },
        }
    }

    #[test]
    fn counts_every_period() {
        let mut observer = ProgressObserver::new(0);
        for period in 0..5 {
            observer.on_period(&make_record(period));
        }
        assert_eq!(observer.periods_seen(), 5);
    }
}
