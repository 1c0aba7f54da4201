//! Decision log, closure verification, and metrics for the Farmstead engine.
//!
//! Every period of a run is recorded in the [`DecisionLog`]. Records are
//! never modified once appended, and the log alone is enough to recompute
//! every summary metric; nothing transient from the run is needed.
//!
//! # Modules
//!
//! - [`closure`] -- Closure checks that every decision fully and
//!   non-negatively accounts for its domain's demand.
//! - [`log`] -- The append-only [`DecisionLog`] and its JSON-lines format.
//! - [`metrics`] -- [`summarize`], the pure reduction into
//!   [`SummaryMetrics`].
//!
//! # Closure
//!
//! For every decision D in domain X:
//!
//! ```text
//! sum(parts of D) == demand of X   (within 1e-6 relative)
//! every part of D >= 0
//! ```
//!
//! A violation is a policy bug. The orchestrator refuses to apply the
//! decision and ends the run with the partial log.

pub mod closure;
pub mod log;
pub mod metrics;

pub use closure::ClosureViolation;
pub use log::{DecisionLog, LogHeader};
pub use metrics::{SummaryMetrics, summarize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording or loading a decision log.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A record was appended out of sequence.
    #[error("out-of-order period: expected {expected}, got {got}")]
    OutOfOrderPeriod {
        /// The period index the log expected next.
        expected: u32,
        /// The period index that was supplied.
        got: u32,
    },

    /// The log holds more periods than a period index can address.
    #[error("period index overflow")]
    PeriodOverflow,

    /// A line could not be encoded or decoded.
    #[error("log serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying reader or writer failed.
    #[error("log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored log does not have the expected shape.
    #[error("malformed log at line {line}: {reason}")]
    Malformed {
        /// One-based line number, zero when not tied to a line.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}
