// src/error.rs
use thiserror::Error;

/// Error types for the fast-basket library
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BasketError {
    /// Invalid parameter values (spots, strikes, maturities, weights, ...)
    #[error("Invalid parameter '{parameter}' = {value}: {constraint}")]
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration or structural input
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Correlation matrix breaks one of its structural invariants
    #[error("Invalid correlation matrix: {reason}")]
    InvalidCorrelation { reason: String },

    /// A curve was queried before any control point was defined
    #[error("Curve '{curve}' has no control points")]
    EmptyCurve { curve: String },

    /// Correlation matrix is not positive semi-definite
    #[error("Cholesky factorization failed at row {row}: {reason}")]
    CholeskyFailure { row: usize, reason: String },

    /// Numerical instability or non-finite estimate
    #[error("Numerical instability in {method}: {reason}")]
    NumericalInstability { method: String, reason: String },

    /// Monte Carlo simulation error
    #[error("Monte Carlo simulation error with {paths} paths: {reason}")]
    MonteCarloError { paths: usize, reason: String },

    /// Unsupported operation or variant
    #[error("Unsupported operation '{operation}' in context: {context}")]
    UnsupportedOperation { operation: String, context: String },
}

/// Coarse classification of a [`BasketError`].
///
/// Every kind is fatal and deterministic in its inputs, so none of them is
/// worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Numerical,
    Unsupported,
}

impl BasketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BasketError::InvalidParameters { .. }
            | BasketError::InvalidConfiguration { .. }
            | BasketError::InvalidCorrelation { .. }
            | BasketError::EmptyCurve { .. } => ErrorKind::Validation,
            BasketError::CholeskyFailure { .. }
            | BasketError::NumericalInstability { .. }
            | BasketError::MonteCarloError { .. } => ErrorKind::Numerical,
            BasketError::UnsupportedOperation { .. } => ErrorKind::Unsupported,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type alias for fast-basket operations
pub type BasketResult<T> = Result<T, BasketError>;

/// Validation utilities
pub mod validation {
    use super::{BasketError, BasketResult};

    /// Upper bound on time steps per path
    pub const MAX_STEPS: usize = 100_000;

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> BasketResult<()> {
        validate_finite(name, value)?;
        if value <= 0.0 {
            Err(BasketError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> BasketResult<()> {
        validate_finite(name, value)?;
        if value < 0.0 {
            Err(BasketError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> BasketResult<()> {
        if value.is_nan() || value < min || value > max {
            Err(BasketError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate correlation parameter
    pub fn validate_correlation(name: &str, rho: f64) -> BasketResult<()> {
        validate_range(name, rho, -1.0, 1.0)
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> BasketResult<()> {
        if !value.is_finite() {
            Err(BasketError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate paths count against a caller-imposed ceiling
    pub fn validate_paths(paths: usize, limit: usize) -> BasketResult<()> {
        if paths == 0 {
            Err(BasketError::InvalidConfiguration {
                field: "paths".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if paths > limit {
            Err(BasketError::InvalidConfiguration {
                field: "paths".to_string(),
                reason: format!("exceeds maximum allowed ({})", limit),
            })
        } else {
            Ok(())
        }
    }

    /// Validate steps count
    pub fn validate_steps(field: &str, steps: usize) -> BasketResult<()> {
        if steps == 0 {
            Err(BasketError::InvalidConfiguration {
                field: field.to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if steps > MAX_STEPS {
            Err(BasketError::InvalidConfiguration {
                field: field.to_string(),
                reason: format!("exceeds maximum allowed ({})", MAX_STEPS),
            })
        } else {
            Ok(())
        }
    }
}
