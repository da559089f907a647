//! Pool curve state
//!
//! A pool holds the reserves of one covered-call curve. Every mutating
//! operation follows the same sequence: recalculate tau, evaluate the curve,
//! apply reserve deltas, recalculate the invariant. Swaps are computed on a
//! copy ([`Pool::preview_swap`]) and the live pool is replaced only when the
//! copy passes the invariant check, so no caller ever observes a half-applied
//! swap.

use crate::error::{EngineError, Result};
use crate::pool_id::PoolId;
use rmm_config::EngineConfig;
use rmm_math::{self as math, CurveParams};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Decimal places kept for the per-liquidity invariant
const INVARIANT_SCALE: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Risky in, stable out
    RiskyIn,
    /// Stable in, risky out
    StableIn,
}

/// Option parameters fixed at pool creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    pub strike: Decimal,
    pub sigma: Decimal,
    /// Unix timestamp of expiry
    pub maturity: u64,
}

/// Engine-wide parameters copied into each pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Swap fee as a fraction of the input amount
    pub fee: Decimal,
    pub amount_scale: u32,
    pub invariant_tolerance: Decimal,
}

impl From<&EngineConfig> for PoolSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            fee: config.fee_fraction(),
            amount_scale: config.amount_scale,
            invariant_tolerance: config.invariant_tolerance,
        }
    }
}

/// Curve reserves and lending totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub risky: Decimal,
    pub stable: Decimal,
    /// Liquidity currently backing the curve
    pub liquidity: Decimal,
    /// Lent liquidity not yet borrowed
    pub float: Decimal,
    /// Borrowed liquidity, removed from the curve
    pub debt: Decimal,
}

/// Fees retained in reserves by swaps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccruedFees {
    pub risky: Decimal,
    pub stable: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub direction: SwapDirection,
    pub delta_in: Decimal,
    pub delta_out: Decimal,
    /// Portion of `delta_in` retained as fee
    pub fee: Decimal,
    pub invariant_before: Decimal,
    pub invariant_after: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    id: PoolId,
    calibration: Calibration,
    settings: PoolSettings,
    reserves: Reserves,
    last_timestamp: u64,
    /// Seconds until maturity as of `last_timestamp`
    tau: u64,
    invariant: Decimal,
    accrued_fees: AccruedFees,
}

impl Pool {
    pub fn new(id: PoolId, calibration: Calibration, settings: PoolSettings, now: u64) -> Self {
        let mut pool = Self {
            id,
            calibration,
            settings,
            reserves: Reserves::default(),
            last_timestamp: now,
            tau: 0,
            invariant: Decimal::ZERO,
            accrued_fees: AccruedFees::default(),
        };
        pool.recalculate_tau(now);
        pool
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn reserves(&self) -> Reserves {
        self.reserves
    }

    pub fn invariant(&self) -> Decimal {
        self.invariant
    }

    pub fn accrued_fees(&self) -> AccruedFees {
        self.accrued_fees
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Seconds remaining until maturity
    pub fn tau(&self) -> u64 {
        self.tau
    }

    pub fn is_expired(&self) -> bool {
        self.tau == 0
    }

    pub fn fee_fraction(&self) -> Decimal {
        self.settings.fee
    }

    /// Curve parameters at the pool's current tau
    pub fn curve(&self) -> Result<CurveParams> {
        Ok(CurveParams::from_seconds(
            to_f64("strike", self.calibration.strike)?,
            to_f64("sigma", self.calibration.sigma)?,
            self.tau,
        )?)
    }

    pub fn recalculate_tau(&mut self, now: u64) {
        self.last_timestamp = now;
        self.tau = self.calibration.maturity.saturating_sub(now);
    }

    pub fn recalculate_invariant(&mut self) -> Result<Decimal> {
        self.invariant = if self.reserves.liquidity > Decimal::ZERO {
            let value = math::calc_invariant(
                to_f64("reserve_risky", self.reserves.risky)?,
                to_f64("reserve_stable", self.reserves.stable)?,
                to_f64("liquidity", self.reserves.liquidity)?,
                &self.curve()?,
            )?;
            from_f64("invariant", value, INVARIANT_SCALE, RoundingStrategy::MidpointNearestEven)?
        } else {
            Decimal::ZERO
        };
        Ok(self.invariant)
    }

    /// Stable reserve the curve requires for `reserve_risky`, rounded up
    pub fn get_stable_given_risky(&self, reserve_risky: Decimal) -> Result<Decimal> {
        let stable = math::trading_function(
            to_f64("invariant", self.invariant)?,
            to_f64("reserve_risky", reserve_risky)?,
            to_f64("liquidity", self.reserves.liquidity)?,
            &self.curve()?,
            0.0,
        )?;
        from_f64(
            "reserve_stable",
            stable.max(0.0),
            self.settings.amount_scale,
            RoundingStrategy::ToPositiveInfinity,
        )
    }

    /// Risky reserve the curve requires for `reserve_stable`, rounded up
    pub fn get_risky_given_stable(&self, reserve_stable: Decimal) -> Result<Decimal> {
        let risky = math::inverse_trading_function(
            to_f64("invariant", self.invariant)?,
            to_f64("reserve_stable", reserve_stable)?,
            to_f64("liquidity", self.reserves.liquidity)?,
            &self.curve()?,
            0.0,
        )?;
        from_f64(
            "reserve_risky",
            risky.max(0.0),
            self.settings.amount_scale,
            RoundingStrategy::ToPositiveInfinity,
        )
    }

    /// Hypothetical pool after a swap, leaving `self` untouched
    pub fn preview_swap(
        &self,
        direction: SwapDirection,
        delta_in: Decimal,
        now: u64,
    ) -> Result<(Pool, SwapOutcome)> {
        require_positive("delta_in", delta_in)?;

        let mut next = self.clone();
        next.recalculate_tau(now);
        if next.is_expired() {
            return Err(EngineError::PoolExpired(self.id));
        }
        if next.reserves.liquidity <= Decimal::ZERO {
            return Err(EngineError::InsufficientReserves {
                requested: delta_in,
                available: Decimal::ZERO,
            });
        }

        let invariant_before = next.recalculate_invariant()?;
        let scale = self.settings.amount_scale;
        let delta_in_with_fee = (delta_in * (Decimal::ONE - self.fee_fraction()))
            .round_dp_with_strategy(scale, RoundingStrategy::ToZero);
        let fee = delta_in - delta_in_with_fee;

        let delta_out = match direction {
            SwapDirection::RiskyIn => {
                let curve_risky = next.reserves.risky + delta_in_with_fee;
                // Per-liquidity risky must stay below one
                if curve_risky >= next.reserves.liquidity {
                    return Err(EngineError::InsufficientReserves {
                        requested: delta_in,
                        available: next.reserves.liquidity - next.reserves.risky,
                    });
                }
                let next_stable = next.get_stable_given_risky(curve_risky)?;
                let delta_out = (next.reserves.stable - next_stable).max(Decimal::ZERO);

                next.reserves.risky += delta_in;
                next.reserves.stable -= delta_out;
                next.accrued_fees.risky += fee;
                delta_out
            }
            SwapDirection::StableIn => {
                let curve_stable = next.reserves.stable + delta_in_with_fee;
                // Per-liquidity stable is bounded by strike plus invariant
                let ceiling = (next.calibration.strike + invariant_before) * next.reserves.liquidity;
                if curve_stable >= ceiling {
                    return Err(EngineError::InsufficientReserves {
                        requested: delta_in,
                        available: (ceiling - next.reserves.stable).max(Decimal::ZERO),
                    });
                }
                let next_risky = next.get_risky_given_stable(curve_stable)?;
                let delta_out = (next.reserves.risky - next_risky).max(Decimal::ZERO);

                next.reserves.stable += delta_in;
                next.reserves.risky -= delta_out;
                next.accrued_fees.stable += fee;
                delta_out
            }
        };

        let invariant_after = next.recalculate_invariant()?;
        self.ensure_invariant_kept(direction, invariant_before, invariant_after)?;

        debug!(
            pool_id = %self.id,
            ?direction,
            %delta_in,
            %delta_out,
            %fee,
            "Swap computed"
        );

        Ok((
            next,
            SwapOutcome {
                direction,
                delta_in,
                delta_out,
                fee,
                invariant_before,
                invariant_after,
            },
        ))
    }

    /// Reject a swap whose invariant falls by more than the rounding tolerance
    fn ensure_invariant_kept(
        &self,
        direction: SwapDirection,
        before: Decimal,
        after: Decimal,
    ) -> Result<()> {
        if after < before - self.settings.invariant_tolerance {
            warn!(
                pool_id = %self.id,
                ?direction,
                invariant_before = %before,
                invariant_after = %after,
                "Swap would decrease invariant"
            );
            return Err(EngineError::InvariantViolation { before, after });
        }
        Ok(())
    }

    pub fn swap_risky_in(&mut self, delta_in: Decimal, now: u64) -> Result<SwapOutcome> {
        self.swap(SwapDirection::RiskyIn, delta_in, now)
    }

    pub fn swap_stable_in(&mut self, delta_in: Decimal, now: u64) -> Result<SwapOutcome> {
        self.swap(SwapDirection::StableIn, delta_in, now)
    }

    pub fn swap(
        &mut self,
        direction: SwapDirection,
        delta_in: Decimal,
        now: u64,
    ) -> Result<SwapOutcome> {
        let (next, outcome) = self.preview_swap(direction, delta_in, now)?;
        *self = next;
        Ok(outcome)
    }

    /// Marginal price at current reserves, in stable per risky
    pub fn spot_price(&self) -> Result<Decimal> {
        if self.reserves.liquidity <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let price = math::spot_price(
            to_f64("reserve_risky", self.reserves.risky)?,
            to_f64("reserve_stable", self.reserves.stable)?,
            to_f64("liquidity", self.reserves.liquidity)?,
            &self.curve()?,
        )?;
        from_f64(
            "spot_price",
            price,
            self.settings.amount_scale,
            RoundingStrategy::MidpointNearestEven,
        )
    }

    /// Marginal price once `amount_in` has been swapped in, in stable per risky
    pub fn marginal_price_after_trade(
        &self,
        amount_in: Decimal,
        direction: SwapDirection,
    ) -> Result<Decimal> {
        if amount_in.is_sign_negative() {
            return Err(EngineError::InvalidParameters(format!(
                "amount_in must not be negative, got {amount_in}"
            )));
        }
        if self.reserves.liquidity <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let liquidity = to_f64("liquidity", self.reserves.liquidity)?;
        let amount_per_liquidity = to_f64("amount_in", amount_in)? / liquidity;
        let fee = to_f64("fee", self.fee_fraction())?;
        let curve = self.curve()?;

        let price = match direction {
            SwapDirection::RiskyIn => math::marginal_price_risky_in(
                to_f64("reserve_risky", self.reserves.risky)? / liquidity,
                &curve,
                fee,
                amount_per_liquidity,
            )?,
            SwapDirection::StableIn => math::marginal_price_stable_in(
                to_f64("reserve_stable", self.reserves.stable)? / liquidity,
                to_f64("invariant", self.invariant)?,
                &curve,
                fee,
                amount_per_liquidity,
            )?,
        };
        from_f64(
            "marginal_price",
            price,
            self.settings.amount_scale,
            RoundingStrategy::MidpointNearestEven,
        )
    }

    /// Seed an empty pool on the curve with invariant zero
    pub(crate) fn initialize(
        &mut self,
        risky_per_liquidity: Decimal,
        delta_liquidity: Decimal,
    ) -> Result<(Decimal, Decimal)> {
        self.reserves.liquidity = delta_liquidity;
        self.invariant = Decimal::ZERO;

        let delta_risky = mul_round(
            risky_per_liquidity,
            delta_liquidity,
            self.settings.amount_scale,
            RoundingStrategy::ToPositiveInfinity,
        )?;
        let delta_stable = self.get_stable_given_risky(delta_risky)?;

        self.reserves.risky = delta_risky;
        self.reserves.stable = delta_stable;
        self.recalculate_invariant()?;
        Ok((delta_risky, delta_stable))
    }

    /// Reserve share backing `delta_liquidity` at current proportions
    pub fn proportional_share(
        &self,
        delta_liquidity: Decimal,
        strategy: RoundingStrategy,
    ) -> Result<(Decimal, Decimal)> {
        let liquidity = self.reserves.liquidity;
        if liquidity <= Decimal::ZERO {
            return Err(EngineError::InsufficientReserves {
                requested: delta_liquidity,
                available: Decimal::ZERO,
            });
        }
        let scale = self.settings.amount_scale;
        Ok((
            mul_div_round(delta_liquidity, self.reserves.risky, liquidity, scale, strategy)?,
            mul_div_round(delta_liquidity, self.reserves.stable, liquidity, scale, strategy)?,
        ))
    }

    /// Deposit proportional reserves for new liquidity; amounts round up
    pub(crate) fn allocate_liquidity(&mut self, delta_liquidity: Decimal) -> Result<(Decimal, Decimal)> {
        let (delta_risky, delta_stable) =
            self.proportional_share(delta_liquidity, RoundingStrategy::ToPositiveInfinity)?;
        self.reserves.risky += delta_risky;
        self.reserves.stable += delta_stable;
        self.reserves.liquidity += delta_liquidity;
        self.recalculate_invariant()?;
        Ok((delta_risky, delta_stable))
    }

    /// Withdraw proportional reserves for burned liquidity; amounts round down
    pub(crate) fn remove_liquidity(&mut self, delta_liquidity: Decimal) -> Result<(Decimal, Decimal)> {
        let available = self.reserves.liquidity - self.reserves.float;
        if delta_liquidity > available {
            return Err(EngineError::InsufficientReserves {
                requested: delta_liquidity,
                available,
            });
        }
        let (delta_risky, delta_stable) =
            self.proportional_share(delta_liquidity, RoundingStrategy::ToNegativeInfinity)?;
        self.reserves.risky -= delta_risky;
        self.reserves.stable -= delta_stable;
        self.reserves.liquidity -= delta_liquidity;
        self.recalculate_invariant()?;
        Ok((delta_risky, delta_stable))
    }

    pub(crate) fn lend_float(&mut self, delta_liquidity: Decimal) -> Result<()> {
        let available = self.reserves.liquidity - self.reserves.float;
        if delta_liquidity > available {
            return Err(EngineError::InsufficientReserves {
                requested: delta_liquidity,
                available,
            });
        }
        self.reserves.float += delta_liquidity;
        Ok(())
    }

    pub(crate) fn claim_float(&mut self, delta_liquidity: Decimal) -> Result<()> {
        if delta_liquidity > self.reserves.float {
            return Err(EngineError::InsufficientFloat {
                requested: delta_liquidity,
                available: self.reserves.float,
            });
        }
        self.reserves.float -= delta_liquidity;
        Ok(())
    }

    /// Take float out of the curve as debt; withdrawn reserves round down
    pub(crate) fn borrow_liquidity(&mut self, delta_liquidity: Decimal) -> Result<(Decimal, Decimal)> {
        if delta_liquidity > self.reserves.float {
            return Err(EngineError::InsufficientFloat {
                requested: delta_liquidity,
                available: self.reserves.float,
            });
        }
        let (delta_risky, delta_stable) =
            self.proportional_share(delta_liquidity, RoundingStrategy::ToNegativeInfinity)?;
        self.reserves.risky -= delta_risky;
        self.reserves.stable -= delta_stable;
        self.reserves.liquidity -= delta_liquidity;
        self.reserves.float -= delta_liquidity;
        self.reserves.debt += delta_liquidity;
        self.recalculate_invariant()?;
        Ok((delta_risky, delta_stable))
    }

    /// Return debt to the curve as float; deposited reserves round up
    pub(crate) fn repay_liquidity(&mut self, delta_liquidity: Decimal) -> Result<(Decimal, Decimal)> {
        if delta_liquidity > self.reserves.debt {
            return Err(EngineError::InvalidParameters(format!(
                "repay of {delta_liquidity} exceeds pool debt {}",
                self.reserves.debt
            )));
        }
        let (delta_risky, delta_stable) =
            self.proportional_share(delta_liquidity, RoundingStrategy::ToPositiveInfinity)?;
        self.reserves.risky += delta_risky;
        self.reserves.stable += delta_stable;
        self.reserves.liquidity += delta_liquidity;
        self.reserves.float += delta_liquidity;
        self.reserves.debt -= delta_liquidity;
        self.recalculate_invariant()?;
        Ok((delta_risky, delta_stable))
    }
}

pub(crate) fn require_positive(name: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidParameters(format!(
            "{name} must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn to_f64(name: &str, value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| EngineError::InvalidParameters(format!("{name} {value} is not representable")))
}

fn from_f64(name: &str, value: f64, scale: u32, strategy: RoundingStrategy) -> Result<Decimal> {
    // Below Decimal's smallest representable magnitude
    if value.is_finite() && value.abs() < 1e-28 {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(scale, strategy))
        .ok_or_else(|| EngineError::InvalidParameters(format!("{name} {value} is not representable")))
}

fn overflow(name: &str) -> EngineError {
    EngineError::InvalidParameters(format!("{name} overflows"))
}

fn mul_round(a: Decimal, b: Decimal, scale: u32, strategy: RoundingStrategy) -> Result<Decimal> {
    a.checked_mul(b)
        .map(|v| v.round_dp_with_strategy(scale, strategy))
        .ok_or_else(|| overflow("product"))
}

fn mul_div_round(
    a: Decimal,
    b: Decimal,
    denominator: Decimal,
    scale: u32,
    strategy: RoundingStrategy,
) -> Result<Decimal> {
    a.checked_mul(b)
        .and_then(|v| v.checked_div(denominator))
        .map(|v| v.round_dp_with_strategy(scale, strategy))
        .ok_or_else(|| overflow("proportional share"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const NOW: u64 = 1_700_000_000;
    const QUARTER: u64 = 31_536_000 / 4;

    fn settings(fee_bps: u32) -> PoolSettings {
        PoolSettings::from(&EngineConfig {
            fee_bps,
            ..EngineConfig::default()
        })
    }

    fn seeded_pool(fee_bps: u32) -> Pool {
        let calibration = Calibration {
            strike: dec!(10),
            sigma: dec!(1),
            maturity: NOW + QUARTER,
        };
        let id = PoolId::derive(calibration.strike, calibration.sigma, calibration.maturity);
        let mut pool = Pool::new(id, calibration, settings(fee_bps), NOW);
        pool.initialize(dec!(0.5), dec!(1000)).unwrap();
        pool
    }

    #[test]
    fn test_initialize_places_pool_on_curve() {
        let pool = seeded_pool(0);
        let reserves = pool.reserves();
        assert_eq!(reserves.risky, dec!(500));
        assert!(reserves.stable > Decimal::ZERO && reserves.stable < dec!(10000));
        assert!(pool.invariant().abs() < dec!(0.000000001));
        assert_eq!(pool.tau(), QUARTER);
    }

    #[test]
    fn test_recalculate_tau_clamps_at_maturity() {
        let mut pool = seeded_pool(0);
        pool.recalculate_tau(NOW + QUARTER + 10);
        assert_eq!(pool.tau(), 0);
        assert!(pool.is_expired());
        assert_eq!(pool.last_timestamp(), NOW + QUARTER + 10);
    }

    #[test]
    fn test_swap_risky_in_pays_stable() {
        let mut pool = seeded_pool(30);
        let before = pool.reserves();
        let outcome = pool.swap_risky_in(dec!(10), NOW).unwrap();

        assert!(outcome.delta_out > Decimal::ZERO);
        assert_eq!(outcome.fee, dec!(0.03));
        assert_eq!(pool.reserves().risky, before.risky + dec!(10));
        assert_eq!(pool.reserves().stable, before.stable - outcome.delta_out);
        assert_eq!(pool.accrued_fees().risky, dec!(0.03));
        assert!(outcome.invariant_after > outcome.invariant_before);
    }

    #[test]
    fn test_swap_stable_in_pays_risky() {
        let mut pool = seeded_pool(30);
        let before = pool.reserves();
        let outcome = pool.swap_stable_in(dec!(50), NOW).unwrap();

        assert!(outcome.delta_out > Decimal::ZERO);
        assert_eq!(pool.reserves().stable, before.stable + dec!(50));
        assert_eq!(pool.reserves().risky, before.risky - outcome.delta_out);
        assert_eq!(pool.accrued_fees().stable, dec!(0.15));
        assert!(outcome.invariant_after >= outcome.invariant_before);
    }

    #[test]
    fn test_feeless_swap_keeps_invariant_within_tolerance() {
        let mut pool = seeded_pool(0);
        let outcome = pool.swap_risky_in(dec!(25), NOW).unwrap();
        assert!(outcome.invariant_after >= outcome.invariant_before - dec!(0.000000001));
        let outcome = pool.swap_stable_in(dec!(100), NOW).unwrap();
        assert!(outcome.invariant_after >= outcome.invariant_before - dec!(0.000000001));
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let pool = seeded_pool(15);
        let snapshot = pool.clone();
        let (next, outcome) = pool.preview_swap(SwapDirection::RiskyIn, dec!(5), NOW).unwrap();

        assert_eq!(pool, snapshot);
        assert_ne!(next.reserves(), pool.reserves());

        let mut live = pool.clone();
        let committed = live.swap_risky_in(dec!(5), NOW).unwrap();
        assert_eq!(committed, outcome);
        assert_eq!(live, next);
    }

    #[test]
    fn test_swap_rejections() {
        let mut pool = seeded_pool(0);
        assert!(matches!(
            pool.swap_risky_in(Decimal::ZERO, NOW),
            Err(EngineError::InvalidParameters(_))
        ));
        assert!(matches!(
            pool.swap_risky_in(dec!(600), NOW),
            Err(EngineError::InsufficientReserves { .. })
        ));
        assert!(matches!(
            pool.swap_stable_in(dec!(100000), NOW),
            Err(EngineError::InsufficientReserves { .. })
        ));
        assert!(matches!(
            pool.swap_risky_in(dec!(1), NOW + QUARTER),
            Err(EngineError::PoolExpired(_))
        ));
        assert_eq!(pool, seeded_pool(0));
    }

    #[test]
    fn test_invariant_decrease_beyond_tolerance_is_fatal() {
        let pool = seeded_pool(0);
        let before = dec!(0.5);

        pool.ensure_invariant_kept(SwapDirection::StableIn, before, before - dec!(0.000000001))
            .unwrap();
        assert_eq!(
            pool.ensure_invariant_kept(SwapDirection::StableIn, before, dec!(0.49)),
            Err(EngineError::InvariantViolation {
                before,
                after: dec!(0.49),
            })
        );

        // A pool demanding strict growth rejects a fee-less swap
        let mut strict = seeded_pool(0);
        strict.settings.invariant_tolerance = dec!(-0.001);
        let snapshot = strict.clone();
        assert!(matches!(
            strict.swap_risky_in(dec!(10), NOW),
            Err(EngineError::InvariantViolation { .. })
        ));
        assert_eq!(strict, snapshot);
    }

    #[test]
    fn test_settings_take_fee_from_config() {
        assert_eq!(seeded_pool(30).fee_fraction(), dec!(0.003));
        assert_eq!(seeded_pool(0).fee_fraction(), Decimal::ZERO);
    }

    #[test]
    fn test_single_sided_queries_agree_with_reserves() {
        let pool = seeded_pool(0);
        let reserves = pool.reserves();
        let stable = pool.get_stable_given_risky(reserves.risky).unwrap();
        let risky = pool.get_risky_given_stable(reserves.stable).unwrap();
        assert!((stable - reserves.stable).abs() < dec!(0.000001));
        assert!((risky - reserves.risky).abs() < dec!(0.000001));
    }

    #[test]
    fn test_spot_and_marginal_prices_agree_for_tiny_trades() {
        let pool = seeded_pool(0);
        let spot = pool.spot_price().unwrap();
        let risky_in = pool
            .marginal_price_after_trade(Decimal::ZERO, SwapDirection::RiskyIn)
            .unwrap();
        let stable_in = pool
            .marginal_price_after_trade(Decimal::ZERO, SwapDirection::StableIn)
            .unwrap();

        assert!(spot > Decimal::ZERO);
        assert!((spot - risky_in).abs() / spot < dec!(0.0001));
        assert!((spot - stable_in).abs() / spot < dec!(0.0001));
        assert!(
            pool.marginal_price_after_trade(dec!(50), SwapDirection::RiskyIn).unwrap() < risky_in
        );
    }

    #[test]
    fn test_proportional_liquidity_preserves_invariant() {
        let mut pool = seeded_pool(0);
        pool.swap_risky_in(dec!(20), NOW).unwrap();
        let invariant = pool.invariant();

        pool.allocate_liquidity(dec!(250)).unwrap();
        assert!((pool.invariant() - invariant).abs() < dec!(0.000000001));

        pool.remove_liquidity(dec!(400)).unwrap();
        assert!((pool.invariant() - invariant).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_borrow_requires_float() {
        let mut pool = seeded_pool(0);
        assert!(matches!(
            pool.borrow_liquidity(dec!(1)),
            Err(EngineError::InsufficientFloat { .. })
        ));
        pool.lend_float(dec!(100)).unwrap();
        let (risky, stable) = pool.borrow_liquidity(dec!(10)).unwrap();
        assert_eq!(risky, dec!(5));
        assert!(stable > Decimal::ZERO);
        assert_eq!(pool.reserves().float, dec!(90));
        assert_eq!(pool.reserves().debt, dec!(10));
        assert_eq!(pool.reserves().liquidity, dec!(990));
    }
}
