//! Property-based checks of swap and lending behavior through the engine

mod common;

use common::{assert_accounting, engine, fund, setup, TestEngine, NOW};
use proptest::prelude::*;
use rmm_engine::{CreatePoolParams, Decimal, EngineError, Owner, PoolId, SwapDirection};
use rust_decimal_macros::dec;

const DAY: u64 = 86_400;

fn direction_strategy() -> impl Strategy<Value = SwapDirection> {
    prop_oneof![Just(SwapDirection::RiskyIn), Just(SwapDirection::StableIn)]
}

fn random_pool(
    fee_bps: u32,
    strike: u32,
    sigma_pct: i64,
    days: u64,
    risky_pct: i64,
) -> (TestEngine, PoolId, Owner) {
    let (mut engine, _clock) = engine(fee_bps);
    let lp = Owner::from("lp");
    fund(&mut engine, &lp, dec!(1_000_000), dec!(10_000_000));
    let created = engine
        .create_pool(
            &lp,
            CreatePoolParams {
                strike: Decimal::from(strike),
                sigma: Decimal::new(sigma_pct, 2),
                maturity: NOW + days * DAY,
                risky_per_liquidity: Decimal::new(risky_pct, 2),
                delta_liquidity: dec!(1000),
            },
        )
        .unwrap();
    (engine, created.pool_id, lp)
}

/// Largest input the curve can absorb in the given direction
fn headroom(engine: &TestEngine, pool_id: PoolId, direction: SwapDirection) -> Decimal {
    let pool = engine.pool(pool_id).unwrap();
    let reserves = pool.reserves();
    match direction {
        SwapDirection::RiskyIn => reserves.liquidity - reserves.risky,
        SwapDirection::StableIn => {
            (pool.calibration().strike + pool.invariant()) * reserves.liquidity - reserves.stable
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_swaps_never_decrease_invariant(
        fee_bps in 0u32..100,
        strike in 1u32..50,
        sigma_pct in 20i64..150,
        days in 7u64..730,
        risky_pct in 10i64..90,
        fraction_pct in 1i64..80,
        direction in direction_strategy(),
    ) {
        let (engine, pool_id, _lp) = random_pool(fee_bps, strike, sigma_pct, days, risky_pct);
        let tolerance = engine.config().invariant_tolerance;

        let delta_in = (headroom(&engine, pool_id, direction) * Decimal::new(fraction_pct, 2)).round_dp(6);
        prop_assume!(delta_in > Decimal::ZERO);

        match engine.preview_swap(pool_id, direction, delta_in) {
            Ok((next, outcome)) => {
                prop_assert!(outcome.invariant_after >= outcome.invariant_before - tolerance);
                prop_assert!(outcome.delta_out >= Decimal::ZERO);
                prop_assert!(next.reserves().risky >= Decimal::ZERO);
                prop_assert!(next.reserves().stable >= Decimal::ZERO);
            }
            Err(EngineError::InsufficientReserves { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected swap error: {other}"),
        }
    }

    #[test]
    fn prop_high_vol_feeless_swaps_keep_invariant(
        strike in 1u32..20,
        sigma_pct in 150i64..300,
        days in 365u64..3650,
        risky_pct in 1i64..10,
        fraction_pct in 1i64..50,
        direction in direction_strategy(),
    ) {
        let (engine, pool_id, _lp) = random_pool(0, strike, sigma_pct, days, risky_pct);

        let delta_in = (headroom(&engine, pool_id, direction) * Decimal::new(fraction_pct, 2)).round_dp(6);
        prop_assume!(delta_in > Decimal::ZERO);

        match engine.preview_swap(pool_id, direction, delta_in) {
            Ok((_, outcome)) => {
                prop_assert!(
                    outcome.invariant_after >= outcome.invariant_before - engine.config().invariant_tolerance
                );
            }
            Err(EngineError::InsufficientReserves { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected swap error: {other}"),
        }
    }

    #[test]
    fn prop_swap_matches_preview(
        fee_bps in 0u32..100,
        fraction_pct in 1i64..50,
        direction in direction_strategy(),
    ) {
        let mut h = setup(fee_bps);
        let (lp, pool_id) = (h.lp.clone(), h.pool_id);
        let delta_in = (headroom(&h.engine, pool_id, direction) * Decimal::new(fraction_pct, 2)).round_dp(6);

        let (next, quoted) = h.engine.preview_swap(pool_id, direction, delta_in).unwrap();
        let executed = h.engine.swap(&lp, pool_id, direction, delta_in, quoted.delta_out).unwrap();

        prop_assert_eq!(executed, quoted);
        prop_assert_eq!(h.engine.get_reserves(pool_id).unwrap(), next.reserves());
    }

    #[test]
    fn prop_borrow_then_repay_restores_reserves(
        fee_bps in 0u32..100,
        lent in 10i64..900,
        borrow_pct in 1i64..100,
    ) {
        let mut h = setup(fee_bps);
        let (lp, pool_id) = (h.lp.clone(), h.pool_id);
        let borrower = Owner::from("leveraged");
        fund(&mut h.engine, &borrower, dec!(1_000_000), dec!(10_000_000));

        let lent = Decimal::from(lent);
        h.engine.lend(&lp, pool_id, lent).unwrap();
        let before = h.engine.get_reserves(pool_id).unwrap();

        let delta_liquidity = (lent * Decimal::new(borrow_pct, 2)).round_dp(6);
        prop_assume!(delta_liquidity > Decimal::ZERO);

        let borrowed = h.engine.borrow(&borrower, pool_id, delta_liquidity, delta_liquidity).unwrap();
        prop_assert_eq!(borrowed.premium, delta_liquidity - borrowed.delta_risky);
        assert_accounting(&h.engine, pool_id);

        h.engine.repay(&borrower, pool_id, delta_liquidity).unwrap();
        let after = h.engine.get_reserves(pool_id).unwrap();

        prop_assert_eq!(after.debt, Decimal::ZERO);
        prop_assert_eq!(after.liquidity, before.liquidity);
        prop_assert_eq!(after.float, before.float);
        prop_assert!((after.risky - before.risky).abs() <= dec!(0.000000001));
        prop_assert!((after.stable - before.stable).abs() <= dec!(0.000000001));
        prop_assert!(h.engine.get_position(&borrower, pool_id).is_empty());
        assert_accounting(&h.engine, pool_id);
    }
}

#[test]
fn test_swap_slippage_bound_leaves_state_untouched() {
    let mut h = setup(30);
    let (lp, pool_id) = (h.lp.clone(), h.pool_id);
    let reserves = h.engine.get_reserves(pool_id).unwrap();
    let (_, quoted) = h
        .engine
        .preview_swap(pool_id, SwapDirection::RiskyIn, dec!(10))
        .unwrap();

    let bound = quoted.delta_out + dec!(0.000000000001);
    assert_eq!(
        h.engine.swap(&lp, pool_id, SwapDirection::RiskyIn, dec!(10), bound),
        Err(EngineError::SlippageExceeded {
            amount: quoted.delta_out,
            bound,
        })
    );
    assert_eq!(h.engine.get_reserves(pool_id).unwrap(), reserves);
}

#[test]
fn test_fees_accrue_and_raise_invariant() {
    let mut h = setup(30);
    let (lp, pool_id) = (h.lp.clone(), h.pool_id);
    let start = h.engine.invariant_of(pool_id).unwrap();

    let risky_in = h
        .engine
        .swap(&lp, pool_id, SwapDirection::RiskyIn, dec!(10), Decimal::ZERO)
        .unwrap();
    let stable_in = h
        .engine
        .swap(&lp, pool_id, SwapDirection::StableIn, dec!(20), Decimal::ZERO)
        .unwrap();

    let fees = h.engine.pool(pool_id).unwrap().accrued_fees();
    assert_eq!(fees.risky, risky_in.fee);
    assert_eq!(fees.stable, stable_in.fee);
    assert!(h.engine.invariant_of(pool_id).unwrap() > start);
}

#[test]
fn test_prices_move_with_trades() {
    let mut h = setup(0);
    let (lp, pool_id) = (h.lp.clone(), h.pool_id);
    let spot = h.engine.spot_price(pool_id).unwrap();
    let quoted = h
        .engine
        .marginal_price_after_trade(pool_id, dec!(50), SwapDirection::RiskyIn)
        .unwrap();
    assert!(quoted < spot);

    h.engine
        .swap(&lp, pool_id, SwapDirection::RiskyIn, dec!(50), Decimal::ZERO)
        .unwrap();
    let after = h.engine.spot_price(pool_id).unwrap();
    assert!(after < spot);
    assert!((after - quoted).abs() / quoted < dec!(0.001));
}
