//! Covered-call replication math
//!
//! Reserves are passed as pool totals together with the pool's liquidity; the
//! curve itself works on per-liquidity amounts, where risky lives in `[0, 1]`
//! and stable in `[0, K]`. The invariant is per unit of liquidity, so
//! proportional deposits and withdrawals leave it unchanged.

use crate::error::{fee_fraction, finite, non_negative, positive, MathError};
use crate::normal::{inv_std_normal_cdf, std_normal_cdf};

pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Option parameters of a curve at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveParams {
    /// Strike in stable per risky
    pub strike: f64,
    /// Annualized implied volatility (0.8 = 80%)
    pub sigma: f64,
    /// Time to maturity in years
    pub tau: f64,
}

impl CurveParams {
    pub fn new(strike: f64, sigma: f64, tau: f64) -> Result<Self, MathError> {
        Ok(Self {
            strike: positive("strike", strike)?,
            sigma: non_negative("sigma", sigma)?,
            tau: finite("tau", tau)?,
        })
    }

    /// Builds parameters from a time-to-maturity in seconds
    pub fn from_seconds(strike: f64, sigma: f64, tau_seconds: u64) -> Result<Self, MathError> {
        Self::new(strike, sigma, tau_seconds as f64 / SECONDS_PER_YEAR as f64)
    }

    pub fn proportional_vol(&self) -> f64 {
        proportional_vol(self.sigma, self.tau)
    }

    fn validate(&self) -> Result<(), MathError> {
        positive("strike", self.strike)?;
        non_negative("sigma", self.sigma)?;
        finite("tau", self.tau)?;
        Ok(())
    }
}

/// σ√τ, zero once the option has expired
pub fn proportional_vol(sigma: f64, tau: f64) -> f64 {
    if tau <= 0.0 || sigma <= 0.0 {
        0.0
    } else {
        sigma * tau.sqrt()
    }
}

/// Stable reserve implied by a risky reserve
///
/// `L * (K * Φ(Φ⁻¹(1 − risky(1 − fee)/L) − σ√τ) + invariant_last)`. Returns 0
/// when the curve has degenerated (σ√τ ≤ 0).
pub fn trading_function(
    invariant_last: f64,
    reserve_risky: f64,
    liquidity: f64,
    curve: &CurveParams,
    fee: f64,
) -> Result<f64, MathError> {
    let invariant_last = finite("invariant", invariant_last)?;
    let reserve_risky = non_negative("reserve_risky", reserve_risky)?;
    let liquidity = positive("liquidity", liquidity)?;
    let gamma = 1.0 - fee_fraction(fee)?;
    curve.validate()?;

    let vol = curve.proportional_vol();
    if vol <= 0.0 {
        return Ok(0.0);
    }

    let risky_per_liquidity = reserve_risky * gamma / liquidity;
    // Φ⁻¹(1 − x) = −Φ⁻¹(x); forming 1 − x first cancels away small x
    let phi = -inv_std_normal_cdf(risky_per_liquidity);
    let stable_per_liquidity = curve.strike * std_normal_cdf(phi - vol) + invariant_last;

    Ok(stable_per_liquidity * liquidity)
}

/// Risky reserve implied by a stable reserve; algebraic inverse of
/// [`trading_function`]
pub fn inverse_trading_function(
    invariant_last: f64,
    reserve_stable: f64,
    liquidity: f64,
    curve: &CurveParams,
    fee: f64,
) -> Result<f64, MathError> {
    let invariant_last = finite("invariant", invariant_last)?;
    let reserve_stable = non_negative("reserve_stable", reserve_stable)?;
    let liquidity = positive("liquidity", liquidity)?;
    let gamma = 1.0 - fee_fraction(fee)?;
    curve.validate()?;

    let vol = curve.proportional_vol();
    if vol <= 0.0 {
        return Ok(0.0);
    }

    let stable_per_liquidity = reserve_stable * gamma / liquidity;
    let phi = inv_std_normal_cdf((stable_per_liquidity - invariant_last) / curve.strike);
    let risky_per_liquidity = std_normal_cdf(-(phi + vol));

    Ok(risky_per_liquidity * liquidity)
}

/// Per-liquidity residual between the stable reserve and the curve
pub fn calc_invariant(
    reserve_risky: f64,
    reserve_stable: f64,
    liquidity: f64,
    curve: &CurveParams,
) -> Result<f64, MathError> {
    let reserve_stable = non_negative("reserve_stable", reserve_stable)?;
    let on_curve = trading_function(0.0, reserve_risky, liquidity, curve, 0.0)?;
    Ok((reserve_stable - on_curve) / liquidity)
}
