// Error taxonomy for the physics core
// Every failure is local and recoverable: callers fix the input and recompute.

use thiserror::Error;

/// Errors raised at the API boundary of the physics core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A physical input is outside its admissible range.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },

    /// A state vector describes a parabolic or hyperbolic trajectory.
    #[error("state is not on a closed orbit (eccentricity {eccentricity:.6})")]
    UnboundOrbit { eccentricity: f64 },

    /// An intermediate or input quantity became NaN or infinite.
    #[error("non-finite value for {quantity}")]
    NonFinite { quantity: &'static str },

    /// Engine configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A catalog record is missing data required to build elements.
    #[error("catalog record rejected: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;

pub(crate) fn ensure_finite(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PhysicsError::NonFinite { quantity })
    }
}

pub(crate) fn ensure_positive(field: &'static str, value: f64) -> Result<f64> {
    ensure_finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidInput {
            field,
            reason: format!("must be > 0, got {value}"),
        })
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> Result<f64> {
    ensure_finite(field, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidInput {
            field,
            reason: format!("must be >= 0, got {value}"),
        })
    }
}

/// Checks `min <= value < max_exclusive`.
pub(crate) fn ensure_range(
    field: &'static str,
    value: f64,
    min: f64,
    max_exclusive: f64,
) -> Result<f64> {
    ensure_finite(field, value)?;
    if (min..max_exclusive).contains(&value) {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidInput {
            field,
            reason: format!("must be in [{min}, {max_exclusive}), got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_helpers() {
        assert_eq!(ensure_positive("mass", 2.0), Ok(2.0));
        assert!(ensure_positive("mass", 0.0).is_err());
        assert!(ensure_non_negative("mass", 0.0).is_ok());
        assert_eq!(
            ensure_finite("velocity", f64::NAN),
            Err(PhysicsError::NonFinite {
                quantity: "velocity"
            })
        );
        assert!(ensure_range("eccentricity", 0.99, 0.0, 1.0).is_ok());
        assert!(ensure_range("eccentricity", 1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = PhysicsError::InvalidInput {
            field: "diameter_m",
            reason: "must be > 0, got -1".to_string(),
        };
        assert_eq!(err.to_string(), "invalid diameter_m: must be > 0, got -1");

        let err = PhysicsError::UnboundOrbit { eccentricity: 1.2 };
        assert!(err.to_string().contains("1.200000"));
    }
}
