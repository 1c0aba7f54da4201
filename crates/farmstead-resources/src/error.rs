//! Error types for the `farmstead-resources` crate.
//!
//! [`ResourceError::ResourceExhausted`] and
//! [`ResourceError::InsufficientStorage`] are recoverable: callers clamp the
//! request to what is available and record the rest as unmet demand. The
//! remaining variants indicate bad input and are never recovered from.

/// Errors that can occur while mutating a shared resource state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    /// An extraction asked for more water than the aquifer still holds.
    #[error("aquifer exhausted: requested {requested} m3, {available} m3 available")]
    ResourceExhausted {
        /// Volume requested (m³).
        requested: f64,
        /// Exploitable volume remaining (m³).
        available: f64,
    },

    /// A withdrawal asked for more water than the storage currently holds.
    #[error("insufficient storage: requested {requested} m3, {available} m3 stored")]
    InsufficientStorage {
        /// Volume requested (m³).
        requested: f64,
        /// Volume currently stored (m³).
        available: f64,
    },

    /// A quantity was negative, NaN, or infinite.
    #[error("invalid quantity for {operation}: {value}")]
    InvalidQuantity {
        /// The operation that rejected the value.
        operation: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Initial parameters for a resource state were out of range.
    #[error("invalid {resource} parameters: {reason}")]
    InvalidParameters {
        /// Which resource was being constructed.
        resource: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Reject negative or non-finite quantities.
pub(crate) fn check_quantity(operation: &'static str, value: f64) -> Result<(), ResourceError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ResourceError::InvalidQuantity { operation, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_nan() {
        assert!(check_quantity("deposit", -1.0).is_err());
        assert!(check_quantity("deposit", f64::NAN).is_err());
        assert!(check_quantity("deposit", f64::INFINITY).is_err());
        assert!(check_quantity("deposit", 0.0).is_ok());
    }

    #[test]
    fn display_names_the_volumes() {
        let err = ResourceError::InsufficientStorage {
            requested: 250.0,
            available: 200.0,
        };
        assert_eq!(
            err.to_string(),
            "insufficient storage: requested 250 m3, 200 m3 stored"
        );
    }
}
