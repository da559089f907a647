//! Engine error types
//!
//! Every variant is returned before any pool, ledger or custody state changes.

use crate::custody::CustodyError;
use crate::pool_id::PoolId;
use rmm_math::MathError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Insufficient reserves: requested {requested}, available {available}")]
    InsufficientReserves {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient float: requested {requested}, available {available}")]
    InsufficientFloat {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Owner already holds a conflicting {held} position on this pool")]
    CollateralConflict { held: &'static str },

    #[error("Slippage exceeded: {amount} beyond bound {bound}")]
    SlippageExceeded { amount: Decimal, bound: Decimal },

    #[error("Invariant decreased from {before} to {after}")]
    InvariantViolation { before: Decimal, after: Decimal },

    #[error("Pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("Pool {0} already exists")]
    PoolAlreadyExists(PoolId),

    #[error("Pool {0} has expired")]
    PoolExpired(PoolId),

    #[error("Curve math error: {0}")]
    Math(#[from] MathError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
