//! Engine Configuration Module
//!
//! Loads engine parameters from defaults, an optional TOML file and
//! environment overrides, in that order of precedence.

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Environment variables prefixed with `RMM__` override file values,
/// e.g. `RMM__FEE_BPS=30`
pub const ENV_PREFIX: &str = "RMM";

/// Largest decimal precision the engine rounds amounts to
const MAX_AMOUNT_SCALE: u32 = 18;

/// Parameters shared by every pool an engine manages
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Swap fee in basis points (15 = 0.15%)
    pub fee_bps: u32,
    /// Liquidity permanently locked at pool creation
    pub min_liquidity: Decimal,
    /// Decimal places committed amounts are rounded to
    pub amount_scale: u32,
    /// Largest per-liquidity invariant decrease attributed to rounding
    pub invariant_tolerance: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_bps: 15,
            min_liquidity: Decimal::new(1, 6),
            amount_scale: 12,
            invariant_tolerance: Decimal::new(1, 9),
        }
    }
}

impl EngineConfig {
    /// Load configuration with `RMM__` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, ENV_PREFIX)
    }

    /// Load configuration using a custom environment prefix
    pub fn load_from(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading engine config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build engine configuration")?
            .try_deserialize()
            .context("Failed to deserialize engine configuration")?;

        config.validate()?;
        debug!(?config, "Engine configuration loaded");
        Ok(config)
    }

    /// Reject parameter combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.fee_bps < 10_000,
            "fee_bps must be below 10000, got {}",
            self.fee_bps
        );
        ensure!(
            self.amount_scale <= MAX_AMOUNT_SCALE,
            "amount_scale must be at most {}, got {}",
            MAX_AMOUNT_SCALE,
            self.amount_scale
        );
        ensure!(
            self.min_liquidity > Decimal::ZERO,
            "min_liquidity must be positive, got {}",
            self.min_liquidity
        );
        ensure!(
            !self.invariant_tolerance.is_sign_negative(),
            "invariant_tolerance must not be negative, got {}",
            self.invariant_tolerance
        );
        Ok(())
    }

    /// Fee as a fraction of the input amount
    pub fn fee_fraction(&self) -> Decimal {
        Decimal::from(self.fee_bps) / Decimal::from(10_000)
    }
}
