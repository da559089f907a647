//! # RMM Engine - Covered-Call Market Maker with Lending
//!
//! ## Purpose
//!
//! Stateful layer of the replicating market maker: pools whose reserves track
//! a covered-call payoff, and a position ledger that lets liquidity providers
//! lend liquidity to borrowers who open leveraged long-option positions.
//!
//! ## Integration Points
//!
//! - **Curve Math**: `rmm-math` trading function, inverse and invariant
//! - **Configuration**: `rmm-config` fee tier, precision and tolerances
//! - **Custody**: [`TokenCustody`] moves tokens after math has passed all checks
//! - **Time**: [`Clock`] read once per operation to recompute tau
//!
//! ## Architecture Role
//!
//! ```text
//! Caller → [Engine] → PoolId lookup → [Pool] → rmm-math
//!              ↓                          ↓
//!        [PositionLedger]          reserves / invariant
//!              ↓
//!        [TokenCustody] transfers
//! ```
//!
//! Every operation runs to completion or is rejected with no partial effect.

pub mod clock;
pub mod custody;
pub mod engine;
pub mod error;
pub mod pool;
pub mod pool_id;
pub mod position;

pub use clock::{Clock, ManualClock, SystemClock};
pub use custody::{CustodyError, InMemoryCustody, Owner, Token, TokenCustody, Transfer};
pub use engine::{BorrowOutcome, CreatePoolParams, CreatedPool, Engine, LiquidityDelta, RepayOutcome};
pub use error::{EngineError, Result};
pub use pool::{AccruedFees, Calibration, Pool, PoolSettings, Reserves, SwapDirection, SwapOutcome};
pub use pool_id::PoolId;
pub use position::{Exposure, LedgerTotals, Position, PositionLedger, PositionRole};

/// Common types for engine callers
pub use rmm_config::EngineConfig;
pub use rust_decimal::Decimal;
