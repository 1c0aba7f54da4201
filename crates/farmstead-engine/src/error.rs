//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode between reading the scenario
//! and writing the last output file, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Scenario, reference data, or drivers could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: farmstead_core::config::ConfigError,
    },

    /// The run stopped before its horizon.
    #[error("run error: {source}")]
    Run {
        /// The failure, with the partial output already written.
        #[from]
        source: farmstead_core::orchestrator::RunFailure,
    },

    /// The decision log could not be written.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: farmstead_ledger::LedgerError,
    },

    /// The summary could not be encoded.
    #[error("summary encoding failed: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// An output file or directory could not be written.
    #[error("failed to write {path}: {source}")]
    Output {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Sweep runs failed.
    #[error("{failed} of {total} sweep runs failed")]
    Sweep {
        /// Number of failed runs.
        failed: usize,
        /// Number of runs attempted.
        total: usize,
    },
}
