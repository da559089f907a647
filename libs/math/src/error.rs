//! Error types for replication math input validation

use thiserror::Error;

/// Errors raised when curve math is handed inputs outside its domain
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MathError {
    /// Value is NaN or infinite
    #[error("{name} is not finite: {value}")]
    NotFinite { name: &'static str, value: f64 },

    /// Value must be strictly positive
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    /// Value must not be negative
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    /// Fee fraction outside [0, 1)
    #[error("Fee {fee} outside [0, 1)")]
    InvalidFee { fee: f64 },
}

pub(crate) fn finite(name: &'static str, value: f64) -> Result<f64, MathError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MathError::NotFinite { name, value })
    }
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64, MathError> {
    let value = finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(MathError::NonPositive { name, value })
    }
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<f64, MathError> {
    let value = finite(name, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(MathError::Negative { name, value })
    }
}

pub(crate) fn fee_fraction(fee: f64) -> Result<f64, MathError> {
    if fee.is_finite() && (0.0..1.0).contains(&fee) {
        Ok(fee)
    } else {
        Err(MathError::InvalidFee { fee })
    }
}
