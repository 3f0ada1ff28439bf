// =============================================================================
// Black-Scholes Greeks
// =============================================================================
//
//   d1 = (ln(S/K) + (r + σ²/2)·t) / (σ·√t)
//   d2 = d1 - σ·√t
//
//   call delta = Φ(d1)              put delta = Φ(d1) - 1
//   gamma      = φ(d1) / (S·σ·√t)   (same for both sides)
//   call theta = -(S·φ(d1)·σ)/(2√t) - r·K·e^(-rt)·Φ(d2)     (÷ 365, per day)
//   put theta  = -(S·φ(d1)·σ)/(2√t) + r·K·e^(-rt)·Φ(-d2)    (÷ 365, per day)
//   vega       = S·φ(d1)·√t                                (÷ 100, per vol pt)
//   vomma      = vega·d1·d2 / σ                            (÷ 100, per vol pt)
//
// t <= 0 returns all zeros (expiry day, no log/sqrt of zero).  Non-positive
// spot/strike/σ are a caller contract violation and are not special-cased.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::OptionType;

/// Days per year used to express theta as daily decay.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Sensitivities of a single option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GreeksResult {
    /// dV/dS, in [-1, 1].
    pub delta: f64,
    /// d²V/dS², never negative.
    pub gamma: f64,
    /// Premium decay per calendar day.
    pub theta: f64,
    /// Premium change per 1 point of implied volatility.
    pub vega: f64,
    /// Vega change per 1 point of implied volatility.
    pub vomma: f64,
}

impl GreeksResult {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Standard normal cumulative distribution Φ(x).
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal density φ(x).
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Black-Scholes Greeks for one option.
pub fn calculate(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    rate: f64,
    implied_vol: f64,
) -> GreeksResult {
    if time_to_expiry <= 0.0 {
        trace!(strike, "expired option, returning zero greeks");
        return GreeksResult::zero();
    }

    let sqrt_t = time_to_expiry.sqrt();
    let sig_sqrt_t = implied_vol * sqrt_t;
    let d1 = ((spot / strike).ln() + (rate + 0.5 * implied_vol * implied_vol) * time_to_expiry)
        / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;

    let pdf_d1 = norm_pdf(d1);
    let discounted_strike = rate * strike * (-rate * time_to_expiry).exp();
    let decay = -(spot * pdf_d1 * implied_vol) / (2.0 * sqrt_t);

    let (delta, theta) = match option_type {
        OptionType::Call => (norm_cdf(d1), decay - discounted_strike * norm_cdf(d2)),
        OptionType::Put => (norm_cdf(d1) - 1.0, decay + discounted_strike * norm_cdf(-d2)),
    };

    let gamma = pdf_d1 / (spot * sig_sqrt_t);
    let vega = spot * pdf_d1 * sqrt_t;
    let vomma = vega * d1 * d2 / implied_vol;

    GreeksResult {
        delta,
        gamma,
        theta: theta / DAYS_PER_YEAR,
        vega: vega / 100.0,
        vomma: vomma / 100.0,
    }
}
