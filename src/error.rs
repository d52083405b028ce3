//! Error types shared by every model
//!
//! The engine distinguishes three failure classes:
//!
//! - **Domain violations**: an input or intermediate quantity leaves the
//!   region where the expression is defined (zero inactivation rate,
//!   porosity outside `]0,1[`, negative discriminant, non-positive
//!   denominator). Evaluation stops instead of returning NaN or infinity.
//! - **Missing or non-finite inputs**: a model needs a field the
//!   [`ParameterRecord`](crate::physics::ParameterRecord) does not carry,
//!   or the field is NaN/∞.
//! - **Caller mistakes**: malformed sweep ranges, unknown string keys.
//!
//! Validity-range advisories are *not* errors. They travel with a valid
//! result as [`Advisory`](crate::physics::Advisory) values.

use thiserror::Error;

/// Result alias used throughout the crate
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by model evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A quantity is outside the domain of the expression
    #[error("{model}: {quantity} = {value} violates the requirement {requirement}")]
    DomainViolation {
        /// Model that rejected the input
        model: &'static str,
        /// Name of the offending quantity
        quantity: &'static str,
        /// Value that was supplied or computed
        value: f64,
        /// Human readable requirement (e.g. "> 0")
        requirement: &'static str,
    },

    /// A model needs a parameter the record does not provide
    #[error("{model}: missing required field '{field}'")]
    MissingField {
        /// Model that needs the field
        model: String,
        /// Name of the absent field
        field: &'static str,
    },

    /// A numeric field is NaN or infinite
    #[error("{model}: field '{field}' is not finite ({value})")]
    NonFinite {
        /// Model that read the field
        model: String,
        /// Name of the field
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Sweep range cannot be sampled
    #[error("invalid sweep range: {reason}")]
    InvalidRange {
        /// Why the range was rejected
        reason: String,
    },

    /// Model key does not resolve in the catalog
    #[error("unknown model '{key}'")]
    UnknownModel {
        /// Key as supplied by the caller
        key: String,
    },

    /// Parameter key does not resolve
    #[error("unknown parameter '{key}'")]
    UnknownParameter {
        /// Key as supplied by the caller
        key: String,
    },

    /// A sweep asked for a variable the model does not consume
    #[error("{model}: cannot sweep over '{variable}'")]
    UnsupportedVariable {
        /// Model being swept
        model: String,
        /// Requested sweep variable
        variable: String,
    },
}

impl ModelError {
    /// Shorthand for [`ModelError::DomainViolation`]
    pub fn domain(
        model: &'static str,
        quantity: &'static str,
        value: f64,
        requirement: &'static str,
    ) -> Self {
        Self::DomainViolation { model, quantity, value, requirement }
    }

    /// Shorthand for [`ModelError::MissingField`]
    pub fn missing(model: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField { model: model.into(), field }
    }

    /// Shorthand for [`ModelError::InvalidRange`]
    pub fn range(reason: impl Into<String>) -> Self {
        Self::InvalidRange { reason: reason.into() }
    }

    /// True for errors caused by the physics rather than by the caller
    pub fn is_domain_violation(&self) -> bool {
        matches!(self, Self::DomainViolation { .. })
    }
}

/// Reject NaN and infinities for a named scalar input
pub(crate) fn ensure_finite(model: &'static str, quantity: &'static str, value: f64) -> ModelResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::NonFinite { model: model.to_string(), field: quantity, value })
    }
}

/// Require a strictly positive, finite scalar
pub(crate) fn ensure_positive(model: &'static str, quantity: &'static str, value: f64) -> ModelResult<f64> {
    let value = ensure_finite(model, quantity, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::domain(model, quantity, value, "> 0"))
    }
}

/// Require a fraction strictly inside `]0,1[`
pub(crate) fn ensure_open_fraction(model: &'static str, quantity: &'static str, value: f64) -> ModelResult<f64> {
    let value = ensure_finite(model, quantity, value)?;
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(ModelError::domain(model, quantity, value, "in ]0,1["))
    }
}

/// Clamp a physically non-negative input at zero
///
/// Rates, concentrations and diameters are clamped rather than rejected.
pub(crate) fn clamp_non_negative(model: &'static str, quantity: &'static str, value: f64) -> ModelResult<f64> {
    let value = ensure_finite(model, quantity, value)?;
    if value < 0.0 {
        log::debug!("{}: clamping negative {} ({}) to 0", model, quantity, value);
        Ok(0.0)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_message() {
        let err = ModelError::domain("TwoSite", "mu_s1", 0.0, "> 0");
        assert_eq!(err.to_string(), "TwoSite: mu_s1 = 0 violates the requirement > 0");
        assert!(err.is_domain_violation());
    }

    #[test]
    fn test_missing_message_names_model_and_field() {
        let err = ModelError::missing("pilot/C", "carbohydrate");
        let message = err.to_string();
        assert!(message.contains("pilot/C"));
        assert!(message.contains("carbohydrate"));
        assert!(!err.is_domain_violation());
    }

    #[test]
    fn test_ensure_helpers() {
        assert!(ensure_finite("m", "x", f64::NAN).is_err());
        assert!(ensure_positive("m", "x", 0.0).is_err());
        assert_eq!(ensure_positive("m", "x", 2.0).unwrap(), 2.0);
        assert!(ensure_open_fraction("m", "x", 1.0).is_err());
        assert!(ensure_open_fraction("m", "x", 0.0).is_err());
        assert_eq!(clamp_non_negative("m", "x", -3.0).unwrap(), 0.0);
        assert!(clamp_non_negative("m", "x", f64::INFINITY).is_err());
    }
}
