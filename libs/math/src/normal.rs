//! Standard normal distribution approximations
//!
//! Both directions are closed-form: the CDF goes through `libm::erfc` (fdlibm
//! rational approximations) and the inverse uses Acklam's rational
//! approximation followed by a single Halley correction. No iteration.

use std::f64::consts::{PI, SQRT_2};

/// Inputs beyond this magnitude already map to exactly 0 or 1 in `f64`
pub const CDF_INPUT_BOUND: f64 = 38.0;

/// Probabilities are clamped to `[INV_CDF_EPSILON, 1 - INV_CDF_EPSILON]`
pub const INV_CDF_EPSILON: f64 = 1e-12;

/// Guaranteed bound on `|Φ(Φ⁻¹(p)) − p|` inside the clamped domain
pub const ROUND_TRIP_TOLERANCE: f64 = 1e-12;

// Acklam's coefficients
const A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_690e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];
const C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];

const P_LOW: f64 = 0.02425;
const P_HIGH: f64 = 1.0 - P_LOW;

/// Standard normal density φ(x)
pub fn std_normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF Φ(x), always within `[0, 1]`
pub fn std_normal_cdf(x: f64) -> f64 {
    let x = x.clamp(-CDF_INPUT_BOUND, CDF_INPUT_BOUND);
    0.5 * libm::erfc(-x / SQRT_2)
}

/// Inverse standard normal CDF Φ⁻¹(p)
///
/// `p` at or beyond the open interval (0, 1) is clamped rather than rejected,
/// so the result is always finite for finite input.
pub fn inv_std_normal_cdf(p: f64) -> f64 {
    let p = p.clamp(INV_CDF_EPSILON, 1.0 - INV_CDF_EPSILON);

    if p < P_LOW {
        refine(lower_tail(p), p)
    } else if p <= P_HIGH {
        refine(central(p), p)
    } else {
        // Symmetry keeps precision in the upper tail
        let q = 1.0 - p;
        -refine(lower_tail(q), q)
    }
}

fn central(p: f64) -> f64 {
    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}

fn lower_tail(p: f64) -> f64 {
    let q = (-2.0 * p.ln()).sqrt();
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

/// One Halley step against the exact CDF
fn refine(x: f64, p: f64) -> f64 {
    let e = std_normal_cdf(x) - p;
    let u = e * (2.0 * PI).sqrt() * (0.5 * x * x).exp();
    x - u / (1.0 + 0.5 * x * u)
}
