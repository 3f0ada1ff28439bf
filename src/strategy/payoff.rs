// =============================================================================
// Strategy Payoff: expiry P&L of a multi-leg option position
// =============================================================================
//
// Per leg, per spot sample:
//
//   intrinsic = max(0, S - K)  call      max(0, K - S)  put
//   pnl       = sign · (intrinsic - premium) · quantity     sign: buy +1, sell -1
//
// Legs are summed elementwise over the spot range.
//
//   net_premium = Σ sign · premium · quantity   (> 0 debit, < 0 credit)
//
// Max profit / max loss are the extremes of the sampled curve, so a naked
// short call only shows as "large" as the range is wide.  Breakevens are
// every sign change between adjacent samples, linearly interpolated:
//
//   be = x1 - y1 · (x2 - x1) / (y2 - y1)
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::types::{OptionType, Side};

/// Upper bound on spot samples per payoff curve.
pub const MAX_PAYOFF_SAMPLES: usize = 10_000;

/// One option leg of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyLeg {
    pub option_type: OptionType,
    pub side: Side,
    pub strike: f64,
    pub premium: f64,
    /// Lots, at least one.
    pub quantity: u32,
}

impl StrategyLeg {
    pub fn new(option_type: OptionType, side: Side, strike: f64, premium: f64, quantity: u32) -> Self {
        Self {
            option_type,
            side,
            strike,
            premium,
            quantity,
        }
    }

    pub fn intrinsic(&self, spot: f64) -> f64 {
        match self.option_type {
            OptionType::Call => (spot - self.strike).max(0.0),
            OptionType::Put => (self.strike - spot).max(0.0),
        }
    }

    /// Expiry P&L of this leg at `spot`.
    pub fn payoff_at(&self, spot: f64) -> f64 {
        self.side.sign() * (self.intrinsic(spot) - self.premium) * f64::from(self.quantity)
    }

    /// Premium paid (positive) or received (negative) to open the leg.
    pub fn premium_flow(&self) -> f64 {
        self.side.sign() * self.premium * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffPoint {
    pub spot: f64,
    pub payoff: f64,
}

/// Sampled expiry P&L, in the order of the spot range it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayoffCurve {
    pub points: Vec<PayoffPoint>,
}

impl PayoffCurve {
    pub fn spots(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.spot).collect()
    }

    pub fn payoffs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.payoff).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn metrics(&self) -> Result<StrategyMetrics> {
        strategy_metrics(&self.spots(), &self.payoffs())
    }
}

/// Expiry payoff curve and net premium for `legs` over `spot_range`.
pub fn calculate_payoff(spot_range: &[f64], legs: &[StrategyLeg]) -> Result<(PayoffCurve, f64)> {
    if spot_range.is_empty() {
        return Err(AnalysisError::EmptySpotRange);
    }
    if spot_range.len() > MAX_PAYOFF_SAMPLES {
        return Err(AnalysisError::TooManySamples {
            requested: spot_range.len(),
            limit: MAX_PAYOFF_SAMPLES,
        });
    }
    if legs.iter().any(|leg| leg.quantity == 0) {
        return Err(AnalysisError::InvalidQuantity);
    }

    let points = spot_range
        .iter()
        .map(|&spot| PayoffPoint {
            spot,
            payoff: legs.iter().map(|leg| leg.payoff_at(spot)).sum(),
        })
        .collect();

    let net_premium = legs.iter().map(StrategyLeg::premium_flow).sum();

    debug!(
        legs = legs.len(),
        samples = spot_range.len(),
        net_premium = format!("{:.2}", net_premium),
        "payoff curve computed"
    );

    Ok((PayoffCurve { points }, net_premium))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub max_profit: f64,
    pub max_loss: f64,
    /// Ascending.
    pub breakevens: Vec<f64>,
}

pub fn strategy_metrics(spot_range: &[f64], payoffs: &[f64]) -> Result<StrategyMetrics> {
    if spot_range.len() != payoffs.len() {
        return Err(AnalysisError::LengthMismatch {
            spots: spot_range.len(),
            payoffs: payoffs.len(),
        });
    }
    if payoffs.is_empty() {
        return Err(AnalysisError::EmptySpotRange);
    }

    let max_profit = payoffs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max_loss = payoffs.iter().copied().fold(f64::INFINITY, f64::min);

    let mut breakevens = Vec::new();
    for i in 0..payoffs.len() - 1 {
        let (x1, x2) = (spot_range[i], spot_range[i + 1]);
        let (y1, y2) = (payoffs[i], payoffs[i + 1]);
        let crosses = (y1 <= 0.0 && y2 > 0.0) || (y1 >= 0.0 && y2 < 0.0);
        if crosses {
            breakevens.push(x1 - y1 * (x2 - x1) / (y2 - y1));
        }
    }
    breakevens.sort_by(|a, b| a.total_cmp(b));

    Ok(StrategyMetrics {
        max_profit,
        max_loss,
        breakevens,
    })
}

/// Evenly spaced spot samples from `low` to `high` inclusive, at most
/// [`MAX_PAYOFF_SAMPLES`] of them.
pub fn spot_range(low: f64, high: f64, step: f64) -> Result<Vec<f64>> {
    if !(low.is_finite() && high.is_finite() && step.is_finite()) || step <= 0.0 || high < low {
        return Err(AnalysisError::EmptySpotRange);
    }
    let span = ((high - low) / step + 1e-9).floor();
    if !(span < MAX_PAYOFF_SAMPLES as f64) {
        return Err(AnalysisError::TooManySamples {
            requested: (span as usize).saturating_add(1),
            limit: MAX_PAYOFF_SAMPLES,
        });
    }
    let steps = span as usize;
    Ok((0..=steps).map(|i| low + i as f64 * step).collect())
}
