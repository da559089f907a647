//! Deterministic pool identifiers
//!
//! A pool is addressed by the Keccak-256 hash of its option parameters, so the
//! same (strike, sigma, maturity) triple always resolves to the same pool.

use crate::error::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId([u8; 32]);

impl PoolId {
    /// Derive the identifier for an option parameter triple
    ///
    /// Decimals are normalized first so `1.50` and `1.5` map to one pool.
    pub fn derive(strike: Decimal, sigma: Decimal, maturity: u64) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(strike.normalize().serialize());
        hasher.update(sigma.normalize().serialize());
        hasher.update(maturity.to_be_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for PoolId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| EngineError::InvalidParameters(format!("malformed pool id '{s}': {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            EngineError::InvalidParameters(format!(
                "malformed pool id '{s}': expected 32 bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}
