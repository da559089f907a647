//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use rmm_engine::{
    CreatePoolParams, Decimal, Engine, EngineConfig, InMemoryCustody, ManualClock, Owner, PoolId,
    Token,
};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

pub const NOW: u64 = 1_700_000_000;
pub const YEAR: u64 = 31_536_000;

pub type TestEngine = Engine<ManualClock, InMemoryCustody>;

pub struct Harness {
    pub engine: TestEngine,
    pub clock: ManualClock,
    pub pool_id: PoolId,
    pub lp: Owner,
    pub borrower: Owner,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine(fee_bps: u32) -> (TestEngine, ManualClock) {
    init_tracing();
    let clock = ManualClock::new(NOW);
    let config = EngineConfig {
        fee_bps,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, clock.clone(), InMemoryCustody::new()).unwrap();
    (engine, clock)
}

pub fn fund(engine: &mut TestEngine, owner: &Owner, risky: Decimal, stable: Decimal) {
    engine.custody_mut().mint(owner, Token::Risky, risky);
    engine.custody_mut().mint(owner, Token::Stable, stable);
}

/// Strike 10, 100% vol, one year to maturity, 1000 liquidity at half risky
pub fn setup(fee_bps: u32) -> Harness {
    let (mut engine, clock) = engine(fee_bps);
    let lp = Owner::from("lp");
    let borrower = Owner::from("borrower");
    fund(&mut engine, &lp, dec!(1_000_000), dec!(10_000_000));
    fund(&mut engine, &borrower, dec!(100), dec!(1_000));

    let created = engine
        .create_pool(
            &lp,
            CreatePoolParams {
                strike: dec!(10),
                sigma: dec!(1),
                maturity: NOW + YEAR,
                risky_per_liquidity: dec!(0.5),
                delta_liquidity: dec!(1000),
            },
        )
        .unwrap();

    Harness {
        engine,
        clock,
        pool_id: created.pool_id,
        lp,
        borrower,
    }
}

/// Pool liquidity and float must match the ledger after every operation
pub fn assert_accounting(engine: &TestEngine, pool_id: PoolId) {
    let reserves = engine.get_reserves(pool_id).unwrap();
    let totals = engine.ledger().totals(pool_id);
    let locked = engine.config().min_liquidity;

    assert_eq!(reserves.debt, totals.debt);
    assert_eq!(reserves.float, totals.float - totals.debt);
    assert_eq!(
        reserves.liquidity,
        locked + totals.liquidity + totals.float - totals.debt
    );
    assert!(reserves.float >= Decimal::ZERO);
}

/// Stored invariant must match the curve at the pool's stored tau, and the
/// stable reserve must sit on that curve
pub fn assert_invariant_synced(engine: &TestEngine, pool_id: PoolId, now: u64) {
    let pool = engine.pool(pool_id).unwrap();
    assert_eq!(pool.last_timestamp(), now);
    assert_eq!(pool.tau(), pool.calibration().maturity.saturating_sub(now));

    let mut recomputed = pool.clone();
    recomputed.recalculate_invariant().unwrap();
    assert_eq!(pool.invariant(), recomputed.invariant());

    let reserves = pool.reserves();
    let stable = pool.get_stable_given_risky(reserves.risky).unwrap();
    assert!(
        (stable - reserves.stable).abs() < dec!(0.000001),
        "curve stable {stable} vs reserve {}",
        reserves.stable
    );
}
