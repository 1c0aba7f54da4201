//! The decision log: an append-only record of every period of a run.
//!
//! The [`DecisionLog`] is the sole input to the metrics aggregator. It
//! holds a header describing the run and one [`PeriodRecord`] per completed
//! period, in strictly increasing period order.
//!
//! # JSON-lines format
//!
//! A stored log is one JSON object per line. The first line is the header,
//! every following line one period:
//!
//! ```text
//! {"kind":"header","scenario_name":"valley",...}
//! {"kind":"period","period":0,"date":"2025-01-01",...}
//! {"kind":"period","period":1,"date":"2025-01-02",...}
//! ```
//!
//! Serialization is deterministic (ordered maps, declaration-order farms),
//! so identical runs produce byte-identical files.

use std::io::{BufRead, Write};

use chrono::NaiveDate;
use farmstead_types::{FarmEntry, Granularity, PeriodRecord, ScenarioId};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Run-level facts recorded once at the top of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Scenario name.
    pub scenario_name: String,
    /// Name-derived scenario identifier.
    pub scenario_id: ScenarioId,
    /// Period length.
    pub granularity: Granularity,
    /// Date of period zero.
    pub start_date: NaiveDate,
    /// Exploitable aquifer volume at the start of the run (m³).
    pub aquifer_initial_m3: f64,
    /// Farms in declaration order, with their policy selections.
    pub farms: Vec<FarmEntry>,
}

/// One line of the JSON-lines encoding, as read.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogLine {
    Header(LogHeader),
    Period(PeriodRecord),
}

/// One line of the JSON-lines encoding, as written. Same shape as
/// [`LogLine`], borrowing from the log.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogLineRef<'a> {
    Header(&'a LogHeader),
    Period(&'a PeriodRecord),
}

/// Append-only log of period records.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionLog {
    header: LogHeader,
    periods: Vec<PeriodRecord>,
}

impl DecisionLog {
    /// Create an empty log for a run.
    pub const fn new(header: LogHeader) -> Self {
        Self {
            header,
            periods: Vec::new(),
        }
    }

    /// The run header.
    pub const fn header(&self) -> &LogHeader {
        &self.header
    }

    /// All recorded periods, in order.
    pub fn periods(&self) -> &[PeriodRecord] {
        &self.periods
    }

    /// Number of recorded periods.
    pub const fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether no period has been recorded.
    pub const fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// The most recently recorded period.
    pub fn last(&self) -> Option<&PeriodRecord> {
        self.periods.last()
    }

    /// The index the next appended record must carry.
    fn next_period(&self) -> Result<u32, LedgerError> {
        u32::try_from(self.periods.len()).map_err(|_err| LedgerError::PeriodOverflow)
    }

    /// Append the record for the next period.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OutOfOrderPeriod`] unless `record.period` is
    /// exactly one past the last recorded period (zero for an empty log).
    pub fn append(&mut self, record: PeriodRecord) -> Result<(), LedgerError> {
        let expected = self.next_period()?;
        if record.period != expected {
            return Err(LedgerError::OutOfOrderPeriod {
                expected,
                got: record.period,
            });
        }
        self.periods.push(record);
        Ok(())
    }

    /// Write the log as JSON lines.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialization`] or [`LedgerError::Io`] if a
    /// line cannot be encoded or written.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<(), LedgerError> {
        serde_json::to_writer(&mut writer, &LogLineRef::Header(&self.header))?;
        writer.write_all(b"\n")?;
        for record in &self.periods {
            serde_json::to_writer(&mut writer, &LogLineRef::Period(record))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Encode the log as a JSON-lines string.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialization`] if a record cannot be encoded.
    pub fn to_jsonl(&self) -> Result<String, LedgerError> {
        let mut buf = Vec::new();
        self.write_jsonl(&mut buf)?;
        String::from_utf8(buf).map_err(|err| LedgerError::Malformed {
            line: 0,
            reason: err.to_string(),
        })
    }

    /// Read a log written by [`write_jsonl`](Self::write_jsonl).
    ///
    /// Blank lines are skipped. Period order is re-validated on the way in.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Malformed`] if the first line is not a header
    /// or a later line is, [`LedgerError::Serialization`] for undecodable
    /// lines, and [`LedgerError::OutOfOrderPeriod`] for gaps.
    pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Self, LedgerError> {
        let mut log: Option<Self> = None;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = index.saturating_add(1);
            match (serde_json::from_str::<LogLine>(&line)?, log.as_mut()) {
                (LogLine::Header(header), None) => log = Some(Self::new(header)),
                (LogLine::Period(record), Some(existing)) => existing.append(record)?,
                (LogLine::Header(_), Some(_)) => {
                    return Err(LedgerError::Malformed {
                        line: line_no,
                        reason: String::from("duplicate header"),
                    });
                }
                (LogLine::Period(_), None) => {
                    return Err(LedgerError::Malformed {
                        line: line_no,
                        reason: String::from("period before header"),
                    });
                }
            }
        }
        log.ok_or(LedgerError::Malformed {
            line: 0,
            reason: String::from("empty log"),
        })
    }
}
