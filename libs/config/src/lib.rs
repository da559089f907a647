//! # RMM Engine Configuration
//!
//! Centralizes the tunable parameters of the replicating market maker so the
//! engine never hardcodes fee tiers, precision or tolerances.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rmm_config::EngineConfig;
//!
//! let config = EngineConfig::load(Some("config/engine.toml".as_ref())).unwrap();
//! assert!(config.fee_bps < 10_000);
//! ```

pub mod engine_config;

pub use engine_config::{EngineConfig, ENV_PREFIX};
