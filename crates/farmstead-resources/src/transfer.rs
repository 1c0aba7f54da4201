//! Outcomes of clamped transfers into and out of a resource state.

use serde::{Deserialize, Serialize};

/// Result of a clamped draw: what was delivered and what could not be.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Volume actually removed from the resource (m³).
    pub delivered: f64,
    /// Volume requested but not available (m³); recorded as unmet demand.
    pub shortfall: f64,
}

impl Withdrawal {
    /// A draw that was honoured in full.
    pub const fn full(volume: f64) -> Self {
        Self {
            delivered: volume,
            shortfall: 0.0,
        }
    }

    /// Whether any part of the request went unserved.
    pub fn is_short(&self) -> bool {
        self.shortfall > 0.0
    }
}

/// Result of a deposit into capacity-bounded storage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Deposit {
    /// Volume taken into storage (m³).
    pub accepted: f64,
    /// Volume that did not fit and spilled (m³).
    pub overflow: f64,
}
