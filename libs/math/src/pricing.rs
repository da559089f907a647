//! Spot and marginal prices on the replication curve
//!
//! All prices are quoted in stable per risky.

use crate::error::{fee_fraction, non_negative, positive, MathError};
use crate::normal::{inv_std_normal_cdf, std_normal_pdf};
use crate::replication::{calc_invariant, CurveParams};

/// Per-liquidity step used by the central-difference gradient
const GRADIENT_STEP: f64 = 1e-6;

/// Spot price as the ratio of the invariant's partial derivatives
///
/// Evaluates `∂I/∂risky / ∂I/∂stable` by central differences around the
/// current reserve point. A degenerate curve has no risky sensitivity and
/// reports a price of zero.
pub fn spot_price(
    reserve_risky: f64,
    reserve_stable: f64,
    liquidity: f64,
    curve: &CurveParams,
) -> Result<f64, MathError> {
    let reserve_risky = non_negative("reserve_risky", reserve_risky)?;
    let reserve_stable = non_negative("reserve_stable", reserve_stable)?;
    let liquidity = positive("liquidity", liquidity)?;

    if curve.proportional_vol() <= 0.0 {
        return Ok(0.0);
    }

    // Keep both probes inside the per-liquidity risky range [0, 1]
    let x = reserve_risky / liquidity;
    let step = GRADIENT_STEP.min(x / 2.0).min((1.0 - x) / 2.0);
    if step <= 0.0 {
        return Ok(0.0);
    }
    let h = step * liquidity;

    let d_risky = (calc_invariant(reserve_risky + h, reserve_stable, liquidity, curve)?
        - calc_invariant(reserve_risky - h, reserve_stable, liquidity, curve)?)
        / (2.0 * h);

    let h_stable = GRADIENT_STEP * liquidity;
    let stable_low = (reserve_stable - h_stable).max(0.0);
    let d_stable = (calc_invariant(reserve_risky, reserve_stable + h_stable, liquidity, curve)?
        - calc_invariant(reserve_risky, stable_low, liquidity, curve)?)
        / (reserve_stable + h_stable - stable_low);

    Ok(d_risky / d_stable)
}

/// Closed-form spot price `K * exp(Φ⁻¹(1 − x) * v − v² / 2)`
pub fn spot_price_closed_form(risky_per_liquidity: f64, curve: &CurveParams) -> f64 {
    let vol = curve.proportional_vol();
    if vol <= 0.0 {
        return 0.0;
    }
    let a = -inv_std_normal_cdf(risky_per_liquidity);
    curve.strike * (a * vol - 0.5 * vol * vol).exp()
}

/// Marginal price after swapping `amount_in` risky per liquidity into the pool
pub fn marginal_price_risky_in(
    risky_per_liquidity: f64,
    curve: &CurveParams,
    fee: f64,
    amount_in: f64,
) -> Result<f64, MathError> {
    let x = non_negative("risky_per_liquidity", risky_per_liquidity)?;
    let amount_in = non_negative("amount_in", amount_in)?;
    let gamma = 1.0 - fee_fraction(fee)?;

    let vol = curve.proportional_vol();
    if vol <= 0.0 {
        return Ok(0.0);
    }

    let quantile = -inv_std_normal_cdf(x + gamma * amount_in);
    Ok(gamma * curve.strike * std_normal_pdf(quantile - vol) / std_normal_pdf(quantile))
}

/// Marginal price after swapping `amount_in` stable per liquidity into the pool
pub fn marginal_price_stable_in(
    stable_per_liquidity: f64,
    invariant: f64,
    curve: &CurveParams,
    fee: f64,
    amount_in: f64,
) -> Result<f64, MathError> {
    let y = non_negative("stable_per_liquidity", stable_per_liquidity)?;
    let amount_in = non_negative("amount_in", amount_in)?;
    let gamma = 1.0 - fee_fraction(fee)?;

    let vol = curve.proportional_vol();
    if vol <= 0.0 {
        return Ok(0.0);
    }

    let quantile = inv_std_normal_cdf((y + gamma * amount_in - invariant) / curve.strike);
    Ok(curve.strike * std_normal_pdf(quantile) / (gamma * std_normal_pdf(quantile + vol)))
}
