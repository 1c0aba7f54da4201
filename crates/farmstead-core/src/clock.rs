//! Period calendar for the Farmstead engine.
//!
//! The [`PeriodClock`] maps a zero-based period index to the calendar. It is
//! stateless: every answer is a pure function of the start date, the
//! granularity, and the period asked about, so the orchestrator and the
//! context builder can never disagree about what day it is.
//!
//! A period is either one calendar day or one calendar year. Annually
//! scheduled updates (aquifer recharge, price escalation, debt interest)
//! happen on the first period of each new calendar year, which
//! [`PeriodClock::is_year_boundary`] reports.

use chrono::{Datelike, Days, Months, NaiveDate};
use farmstead_types::Granularity;

/// Errors from calendar arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The period's date falls outside the representable calendar.
    #[error("date overflow at period {period}")]
    DateOverflow {
        /// The period whose date could not be computed.
        period: u32,
    },
}

/// Everything the engine needs to know about one period's place in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSlot {
    /// Zero-based period index.
    pub period: u32,
    /// Calendar date on which the period starts.
    pub date: NaiveDate,
    /// Calendar years elapsed since the start date's year.
    pub year_index: u32,
    /// Length of the period in days.
    pub days: u32,
    /// Share of its calendar year the period covers.
    pub year_fraction: f64,
}

/// Maps period indices to calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodClock {
    start_date: NaiveDate,
    granularity: Granularity,
}

impl PeriodClock {
    /// Create a clock whose period zero starts on `start_date`.
    pub const fn new(start_date: NaiveDate, granularity: Granularity) -> Self {
        Self {
            start_date,
            granularity,
        }
    }

    /// Date of period zero.
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Period length.
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// The date on which `period` starts.
    pub fn date_of(&self, period: u32) -> Result<NaiveDate, ClockError> {
        let overflow = ClockError::DateOverflow { period };
        match self.granularity {
            Granularity::Daily => self
                .start_date
                .checked_add_days(Days::new(u64::from(period)))
                .ok_or(overflow),
            Granularity::Annual => {
                let months = period.checked_mul(12).ok_or_else(|| overflow.clone())?;
                self.start_date
                    .checked_add_months(Months::new(months))
                    .ok_or(overflow)
            }
        }
    }

    /// Calendar years between the start date and `period`.
    pub fn year_index(&self, period: u32) -> Result<u32, ClockError> {
        let date = self.date_of(period)?;
        date.year()
            .checked_sub(self.start_date.year())
            .and_then(|years| u32::try_from(years).ok())
            .ok_or(ClockError::DateOverflow { period })
    }

    /// Whether `period` is the first period of a new calendar year.
    ///
    /// Period zero is never a boundary: there is no completed year before
    /// it.
    pub fn is_year_boundary(&self, period: u32) -> Result<bool, ClockError> {
        let Some(previous) = period.checked_sub(1) else {
            return Ok(false);
        };
        Ok(self.date_of(period)?.year() != self.date_of(previous)?.year())
    }

    /// Length of `period` in days.
    pub fn days_in_period(&self, period: u32) -> Result<u32, ClockError> {
        match self.granularity {
            Granularity::Daily => Ok(1),
            Granularity::Annual => {
                let next = period
                    .checked_add(1)
                    .ok_or(ClockError::DateOverflow { period })?;
                let span = self
                    .date_of(next)?
                    .signed_duration_since(self.date_of(period)?)
                    .num_days();
                u32::try_from(span).map_err(|_err| ClockError::DateOverflow { period })
            }
        }
    }

    /// Share of its calendar year that `period` covers: one day over the
    /// year's length for daily periods, the whole year for annual ones.
    pub fn year_fraction(&self, period: u32) -> Result<f64, ClockError> {
        match self.granularity {
            Granularity::Daily => {
                let days = days_in_year(self.date_of(period)?.year())
                    .ok_or(ClockError::DateOverflow { period })?;
                Ok(1.0 / f64::from(days))
            }
            Granularity::Annual => Ok(1.0),
        }
    }

    /// All calendar facts about `period` at once.
    pub fn slot(&self, period: u32) -> Result<PeriodSlot, ClockError> {
        Ok(PeriodSlot {
            period,
            date: self.date_of(period)?,
            year_index: self.year_index(period)?,
            days: self.days_in_period(period)?,
            year_fraction: self.year_fraction(period)?,
        })
    }
}

/// Number of days in calendar `year` (365 or 366).
pub fn days_in_year(year: i32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, 12, 31).map(|d| d.ordinal())
}
