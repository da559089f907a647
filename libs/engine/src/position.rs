//! Position ledger
//!
//! Tracks, per (owner, pool), liquidity supplied to the curve, liquidity lent
//! out as float, and liquidity borrowed as debt. An owner acts in one role per
//! pool: a liquidity provider (allocated or lent liquidity) or a borrower
//! (debt), never both, so no position is ever collateralized by itself.

use crate::custody::Owner;
use crate::error::{EngineError, Result};
use crate::pool::require_positive;
use crate::pool_id::PoolId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionRole {
    LiquidityProvider,
    Borrower,
}

impl PositionRole {
    fn label(&self) -> &'static str {
        match self {
            PositionRole::LiquidityProvider => "liquidity provider",
            PositionRole::Borrower => "borrower",
        }
    }
}

/// Net exposure of a position
///
/// Positions record no token-denominated collateral: a borrower's premium and
/// locked risky are held by custody, so a long-option position is pure
/// liquidity exposure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exposure {
    pub risky: Decimal,
    pub stable: Decimal,
    pub liquidity: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Liquidity backing the curve on this owner's behalf
    pub liquidity: Decimal,
    /// Liquidity lent out and available to borrowers
    pub float: Decimal,
    /// Liquidity borrowed; one locked risky per unit
    pub debt: Decimal,
}

impl Position {
    pub fn role(&self) -> Option<PositionRole> {
        if self.debt > Decimal::ZERO {
            Some(PositionRole::Borrower)
        } else if self.liquidity > Decimal::ZERO || self.float > Decimal::ZERO {
            Some(PositionRole::LiquidityProvider)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity.is_zero() && self.float.is_zero() && self.debt.is_zero()
    }

    /// Risky held by the engine to cover this position's debt
    pub fn collateral_locked(&self) -> Decimal {
        self.debt
    }

    pub fn exposure(&self) -> Exposure {
        Exposure {
            risky: Decimal::ZERO,
            stable: Decimal::ZERO,
            liquidity: self.debt,
        }
    }

    fn ensure_not(&self, role: PositionRole) -> Result<()> {
        if self.role() == Some(role) {
            return Err(EngineError::CollateralConflict { held: role.label() });
        }
        Ok(())
    }

    pub fn allocate(&mut self, delta_liquidity: Decimal) -> Result<()> {
        require_positive("delta_liquidity", delta_liquidity)?;
        self.ensure_not(PositionRole::Borrower)?;
        self.liquidity += delta_liquidity;
        Ok(())
    }

    pub fn remove(&mut self, delta_liquidity: Decimal) -> Result<()> {
        require_positive("delta_liquidity", delta_liquidity)?;
        if delta_liquidity > self.liquidity {
            return Err(EngineError::InsufficientReserves {
                requested: delta_liquidity,
                available: self.liquidity,
            });
        }
        self.liquidity -= delta_liquidity;
        Ok(())
    }

    pub fn lend(&mut self, delta_liquidity: Decimal) -> Result<()> {
        require_positive("delta_liquidity", delta_liquidity)?;
        if delta_liquidity > self.liquidity {
            return Err(EngineError::InsufficientReserves {
                requested: delta_liquidity,
                available: self.liquidity,
            });
        }
        self.liquidity -= delta_liquidity;
        self.float += delta_liquidity;
        Ok(())
    }

    pub fn claim(&mut self, delta_liquidity: Decimal) -> Result<()> {
        require_positive("delta_liquidity", delta_liquidity)?;
        if delta_liquidity > self.float {
            return Err(EngineError::InsufficientFloat {
                requested: delta_liquidity,
                available: self.float,
            });
        }
        self.float -= delta_liquidity;
        self.liquidity += delta_liquidity;
        Ok(())
    }

    pub fn borrow(&mut self, delta_liquidity: Decimal) -> Result<()> {
        require_positive("delta_liquidity", delta_liquidity)?;
        self.ensure_not(PositionRole::LiquidityProvider)?;
        self.debt += delta_liquidity;
        Ok(())
    }

    pub fn repay(&mut self, delta_liquidity: Decimal) -> Result<()> {
        require_positive("delta_liquidity", delta_liquidity)?;
        if delta_liquidity > self.debt {
            return Err(EngineError::InvalidParameters(format!(
                "repay of {delta_liquidity} exceeds outstanding debt {}",
                self.debt
            )));
        }
        self.debt -= delta_liquidity;
        Ok(())
    }
}

/// Summed position amounts for one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub liquidity: Decimal,
    pub float: Decimal,
    pub debt: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: HashMap<(Owner, PoolId), Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &Owner, pool_id: PoolId) -> Option<&Position> {
        self.positions.get(&(owner.clone(), pool_id))
    }

    /// Copy of the owner's position, empty if none exists yet
    pub fn snapshot(&self, owner: &Owner, pool_id: PoolId) -> Position {
        self.get(owner, pool_id).cloned().unwrap_or_default()
    }

    pub(crate) fn commit(&mut self, owner: &Owner, pool_id: PoolId, position: Position) {
        self.positions.insert((owner.clone(), pool_id), position);
    }

    pub fn positions_for_pool(&self, pool_id: PoolId) -> impl Iterator<Item = (&Owner, &Position)> {
        self.positions
            .iter()
            .filter(move |((_, id), _)| *id == pool_id)
            .map(|((owner, _), position)| (owner, position))
    }

    pub fn totals(&self, pool_id: PoolId) -> LedgerTotals {
        self.positions_for_pool(pool_id)
            .fold(LedgerTotals::default(), |mut acc, (_, position)| {
                acc.liquidity += position.liquidity;
                acc.float += position.float;
                acc.debt += position.debt;
                acc
            })
    }
}
