//! Error types for the `farmstead-policies` crate.

/// A policy selection whose parameters are out of range.
///
/// Raised while the scenario is being built, never mid-run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A parameter failed its range check.
    #[error("policy {policy}: {reason}")]
    InvalidParameter {
        /// Name of the offending policy.
        policy: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Require `value` to be a finite share in `[0, 1]`.
pub(crate) fn check_share(policy: &'static str, field: &str, value: f64) -> Result<(), PolicyError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PolicyError::InvalidParameter {
            policy,
            reason: format!("{field} must lie within [0, 1], got {value}"),
        })
    }
}

/// Require `value` to be finite and non-negative.
pub(crate) fn check_non_negative(
    policy: &'static str,
    field: &str,
    value: f64,
) -> Result<(), PolicyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PolicyError::InvalidParameter {
            policy,
            reason: format!("{field} must be finite and non-negative, got {value}"),
        })
    }
}
