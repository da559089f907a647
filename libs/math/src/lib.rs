//! # RMM Math - Covered-Call Replication Curve
//!
//! ## Purpose
//!
//! Pure numerical core of the replicating market maker. Provides closed-form
//! approximations of the standard normal distribution and the trading function
//! whose reserves replicate the payoff of a covered call:
//!
//! ```text
//! stable = K * Φ(Φ⁻¹(1 − risky / L) − σ√τ) + invariant
//! ```
//!
//! ## Integration Points
//!
//! - **Input Sources**: Pool reserves and curve parameters from the engine
//! - **Output Destinations**: Swap execution, allocation quotes, price previews
//! - **Precision**: `f64` throughout; committed amounts are rounded by the caller
//!
//! ## Architecture Role
//!
//! ```text
//! normal (Φ, Φ⁻¹, φ) → replication (trading function, inverse, invariant) → pricing
//! ```
//!
//! Every function here is stateless and deterministic, so the same code backs
//! committed swaps and side-effect-free quotes.

pub mod error;
pub mod normal;
pub mod pricing;
pub mod replication;

pub use error::MathError;
pub use normal::{inv_std_normal_cdf, std_normal_cdf, std_normal_pdf, ROUND_TRIP_TOLERANCE};
pub use pricing::{
    marginal_price_risky_in, marginal_price_stable_in, spot_price, spot_price_closed_form,
};
pub use replication::{
    calc_invariant, inverse_trading_function, proportional_vol, trading_function, CurveParams,
    SECONDS_PER_YEAR,
};
