//! Engine orchestrator
//!
//! Owns every pool and the position ledger. Each operation reads the clock
//! once, stages time-synchronized copies of the affected pool and position,
//! runs all curve math and ledger checks on the copies, settles the resulting
//! transfers with the custody collaborator, and only then writes the copies
//! back. A rejected operation therefore leaves no trace.

use crate::clock::{Clock, SystemClock};
use crate::custody::{InMemoryCustody, Owner, Token, TokenCustody, Transfer};
use crate::error::{EngineError, Result};
use crate::pool::{require_positive, Calibration, Pool, PoolSettings, Reserves, SwapDirection, SwapOutcome};
use crate::pool_id::PoolId;
use crate::position::{Position, PositionLedger};
use rmm_config::EngineConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Parameters of a new pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoolParams {
    pub strike: Decimal,
    pub sigma: Decimal,
    pub maturity: u64,
    /// Initial risky reserve per unit of liquidity, in (0, 1)
    pub risky_per_liquidity: Decimal,
    pub delta_liquidity: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPool {
    pub pool_id: PoolId,
    pub delta_risky: Decimal,
    pub delta_stable: Decimal,
    /// Liquidity credited to the creator after the locked minimum
    pub delta_liquidity: Decimal,
}

/// Reserve amounts moved for a liquidity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityDelta {
    pub delta_liquidity: Decimal,
    pub delta_risky: Decimal,
    pub delta_stable: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowOutcome {
    pub delta_liquidity: Decimal,
    /// Risky withdrawn from the curve and locked as collateral
    pub delta_risky: Decimal,
    /// Stable withdrawn from the curve and paid to the borrower
    pub delta_stable: Decimal,
    /// Risky paid by the borrower to fully cover the debt
    pub premium: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayOutcome {
    pub delta_liquidity: Decimal,
    /// Risky returned to the curve from locked collateral
    pub delta_risky: Decimal,
    /// Stable paid by the borrower back into the curve
    pub delta_stable: Decimal,
    /// Remaining collateral returned to the borrower
    pub proceeds: Decimal,
}

pub struct Engine<C: Clock = SystemClock, T: TokenCustody = InMemoryCustody> {
    config: EngineConfig,
    clock: C,
    custody: T,
    pools: HashMap<PoolId, Pool>,
    ledger: PositionLedger,
}

impl<C: Clock, T: TokenCustody> Engine<C, T> {
    pub fn new(config: EngineConfig, clock: C, custody: T) -> Result<Self> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidParameters(e.to_string()))?;
        Ok(Self {
            config,
            clock,
            custody,
            pools: HashMap::new(),
            ledger: PositionLedger::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn custody(&self) -> &T {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut T {
        &mut self.custody
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn create_pool(&mut self, owner: &Owner, params: CreatePoolParams) -> Result<CreatedPool> {
        let now = self.clock.now();

        require_positive("strike", params.strike)?;
        require_positive("sigma", params.sigma)?;
        if params.maturity <= now {
            return Err(EngineError::InvalidParameters(format!(
                "maturity {} is not after current time {now}",
                params.maturity
            )));
        }
        if params.risky_per_liquidity <= Decimal::ZERO || params.risky_per_liquidity >= Decimal::ONE {
            return Err(EngineError::InvalidParameters(format!(
                "risky_per_liquidity must be in (0, 1), got {}",
                params.risky_per_liquidity
            )));
        }
        if params.delta_liquidity <= self.config.min_liquidity {
            return Err(EngineError::InvalidParameters(format!(
                "delta_liquidity {} must exceed locked minimum {}",
                params.delta_liquidity, self.config.min_liquidity
            )));
        }

        let pool_id = PoolId::derive(params.strike, params.sigma, params.maturity);
        if self.pools.contains_key(&pool_id) {
            return Err(EngineError::PoolAlreadyExists(pool_id));
        }

        let calibration = Calibration {
            strike: params.strike,
            sigma: params.sigma,
            maturity: params.maturity,
        };
        let mut pool = Pool::new(pool_id, calibration, PoolSettings::from(&self.config), now);
        let (delta_risky, delta_stable) =
            pool.initialize(params.risky_per_liquidity, params.delta_liquidity)?;

        let credited = params.delta_liquidity - self.config.min_liquidity;
        let mut position = self.ledger.snapshot(owner, pool_id);
        position.allocate(credited)?;

        let batch = [
            Transfer::inbound(Token::Risky, owner, delta_risky),
            Transfer::inbound(Token::Stable, owner, delta_stable),
        ];
        self.commit(pool, Some((owner, position)), &batch)?;

        info!(
            %pool_id,
            strike = %params.strike,
            sigma = %params.sigma,
            maturity = params.maturity,
            %delta_risky,
            %delta_stable,
            "Pool created"
        );

        Ok(CreatedPool {
            pool_id,
            delta_risky,
            delta_stable,
            delta_liquidity: credited,
        })
    }

    /// Add liquidity at current reserve proportions
    pub fn allocate(
        &mut self,
        owner: &Owner,
        pool_id: PoolId,
        delta_liquidity: Decimal,
    ) -> Result<LiquidityDelta> {
        let mut pool = self.synced_pool(pool_id)?;
        let mut position = self.ledger.snapshot(owner, pool_id);
        position.allocate(delta_liquidity)?;
        let (delta_risky, delta_stable) = pool.allocate_liquidity(delta_liquidity)?;

        let batch = [
            Transfer::inbound(Token::Risky, owner, delta_risky),
            Transfer::inbound(Token::Stable, owner, delta_stable),
        ];
        self.commit(pool, Some((owner, position)), &batch)?;

        info!(%pool_id, %owner, %delta_liquidity, %delta_risky, %delta_stable, "Liquidity allocated");
        Ok(LiquidityDelta {
            delta_liquidity,
            delta_risky,
            delta_stable,
        })
    }

    /// Burn liquidity and withdraw its reserve share
    pub fn remove(
        &mut self,
        owner: &Owner,
        pool_id: PoolId,
        delta_liquidity: Decimal,
    ) -> Result<LiquidityDelta> {
        let mut pool = self.synced_pool(pool_id)?;
        let mut position = self.ledger.snapshot(owner, pool_id);
        position.remove(delta_liquidity)?;
        let (delta_risky, delta_stable) = pool.remove_liquidity(delta_liquidity)?;

        let batch = [
            Transfer::outbound(Token::Risky, owner, delta_risky),
            Transfer::outbound(Token::Stable, owner, delta_stable),
        ];
        self.commit(pool, Some((owner, position)), &batch)?;

        info!(%pool_id, %owner, %delta_liquidity, %delta_risky, %delta_stable, "Liquidity removed");
        Ok(LiquidityDelta {
            delta_liquidity,
            delta_risky,
            delta_stable,
        })
    }

    /// Make allocated liquidity available to borrowers
    pub fn lend(&mut self, owner: &Owner, pool_id: PoolId, delta_liquidity: Decimal) -> Result<()> {
        let mut pool = self.synced_pool(pool_id)?;
        let mut position = self.ledger.snapshot(owner, pool_id);
        position.lend(delta_liquidity)?;
        pool.lend_float(delta_liquidity)?;
        self.commit(pool, Some((owner, position)), &[])?;

        info!(%pool_id, %owner, %delta_liquidity, "Liquidity lent");
        Ok(())
    }

    /// Withdraw unborrowed float back to allocated liquidity
    pub fn claim(&mut self, owner: &Owner, pool_id: PoolId, delta_liquidity: Decimal) -> Result<()> {
        let mut pool = self.synced_pool(pool_id)?;
        let mut position = self.ledger.snapshot(owner, pool_id);
        position.claim(delta_liquidity)?;
        pool.claim_float(delta_liquidity)?;
        self.commit(pool, Some((owner, position)), &[])?;

        info!(%pool_id, %owner, %delta_liquidity, "Float claimed");
        Ok(())
    }

    /// Swap against the curve, rejecting outputs below `min_delta_out`
    pub fn swap(
        &mut self,
        owner: &Owner,
        pool_id: PoolId,
        direction: SwapDirection,
        delta_in: Decimal,
        min_delta_out: Decimal,
    ) -> Result<SwapOutcome> {
        let now = self.clock.now();
        let (pool, outcome) = self.pool(pool_id)?.preview_swap(direction, delta_in, now)?;

        if outcome.delta_out < min_delta_out {
            return Err(EngineError::SlippageExceeded {
                amount: outcome.delta_out,
                bound: min_delta_out,
            });
        }

        let (token_in, token_out) = match direction {
            SwapDirection::RiskyIn => (Token::Risky, Token::Stable),
            SwapDirection::StableIn => (Token::Stable, Token::Risky),
        };
        let batch = [
            Transfer::inbound(token_in, owner, outcome.delta_in),
            Transfer::outbound(token_out, owner, outcome.delta_out),
        ];
        self.commit(pool, None, &batch)?;

        debug!(%pool_id, %owner, ?direction, delta_in = %outcome.delta_in, delta_out = %outcome.delta_out, "Swap executed");
        Ok(outcome)
    }

    /// Open a long-option position of `delta_liquidity` against lent float
    pub fn borrow(
        &mut self,
        owner: &Owner,
        pool_id: PoolId,
        delta_liquidity: Decimal,
        max_premium: Decimal,
    ) -> Result<BorrowOutcome> {
        let mut pool = self.synced_pool(pool_id)?;
        if pool.is_expired() {
            return Err(EngineError::PoolExpired(pool_id));
        }

        let mut position = self.ledger.snapshot(owner, pool_id);
        position.borrow(delta_liquidity)?;
        let (delta_risky, delta_stable) = pool.borrow_liquidity(delta_liquidity)?;

        // Each unit of debt is covered by one unit of risky
        let premium = delta_liquidity - delta_risky;
        if premium > max_premium {
            return Err(EngineError::SlippageExceeded {
                amount: premium,
                bound: max_premium,
            });
        }

        let batch = [
            Transfer::inbound(Token::Risky, owner, premium),
            Transfer::outbound(Token::Stable, owner, delta_stable),
        ];
        self.commit(pool, Some((owner, position)), &batch)?;

        info!(%pool_id, %owner, %delta_liquidity, %premium, %delta_stable, "Liquidity borrowed");
        Ok(BorrowOutcome {
            delta_liquidity,
            delta_risky,
            delta_stable,
            premium,
        })
    }

    /// Close `delta_liquidity` of debt and release the remaining collateral
    pub fn repay(
        &mut self,
        owner: &Owner,
        pool_id: PoolId,
        delta_liquidity: Decimal,
    ) -> Result<RepayOutcome> {
        let mut pool = self.synced_pool(pool_id)?;
        let mut position = self.ledger.snapshot(owner, pool_id);
        position.repay(delta_liquidity)?;
        let (delta_risky, delta_stable) = pool.repay_liquidity(delta_liquidity)?;

        let proceeds = (delta_liquidity - delta_risky).max(Decimal::ZERO);
        let batch = [
            Transfer::inbound(Token::Stable, owner, delta_stable),
            Transfer::outbound(Token::Risky, owner, proceeds),
        ];
        self.commit(pool, Some((owner, position)), &batch)?;

        info!(%pool_id, %owner, %delta_liquidity, %proceeds, %delta_stable, "Debt repaid");
        Ok(RepayOutcome {
            delta_liquidity,
            delta_risky,
            delta_stable,
            proceeds,
        })
    }

    pub fn pool(&self, pool_id: PoolId) -> Result<&Pool> {
        self.pools
            .get(&pool_id)
            .ok_or(EngineError::PoolNotFound(pool_id))
    }

    pub fn pool_ids(&self) -> impl Iterator<Item = &PoolId> {
        self.pools.keys()
    }

    pub fn get_reserves(&self, pool_id: PoolId) -> Result<Reserves> {
        Ok(self.pool(pool_id)?.reserves())
    }

    pub fn get_position(&self, owner: &Owner, pool_id: PoolId) -> Position {
        self.ledger.snapshot(owner, pool_id)
    }

    /// Quote a swap at the current time without committing it
    pub fn preview_swap(
        &self,
        pool_id: PoolId,
        direction: SwapDirection,
        delta_in: Decimal,
    ) -> Result<(Pool, SwapOutcome)> {
        self.pool(pool_id)?
            .preview_swap(direction, delta_in, self.clock.now())
    }

    pub fn spot_price(&self, pool_id: PoolId) -> Result<Decimal> {
        self.synced_pool(pool_id)?.spot_price()
    }

    pub fn marginal_price_after_trade(
        &self,
        pool_id: PoolId,
        amount_in: Decimal,
        direction: SwapDirection,
    ) -> Result<Decimal> {
        self.synced_pool(pool_id)?
            .marginal_price_after_trade(amount_in, direction)
    }

    /// Invariant at the current time
    pub fn invariant_of(&self, pool_id: PoolId) -> Result<Decimal> {
        Ok(self.synced_pool(pool_id)?.invariant())
    }

    /// Copy of a pool with tau and invariant synchronized to the current time
    ///
    /// Mutating operations start from this copy so a pool is never written
    /// back with an invariant computed at a stale tau.
    fn synced_pool(&self, pool_id: PoolId) -> Result<Pool> {
        let mut pool = self.pool(pool_id)?.clone();
        pool.recalculate_tau(self.clock.now());
        pool.recalculate_invariant()?;
        Ok(pool)
    }

    fn commit(
        &mut self,
        pool: Pool,
        position: Option<(&Owner, Position)>,
        batch: &[Transfer],
    ) -> Result<()> {
        self.custody.settle(batch)?;
        if let Some((owner, position)) = position {
            self.ledger.commit(owner, pool.id(), position);
        }
        self.pools.insert(pool.id(), pool);
        Ok(())
    }
}
