// =============================================================================
// Batch Greeks over an option chain
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::greeks::black_scholes::{calculate, GreeksResult};
use crate::snapshot::StrikeRecord;
use crate::types::OptionType;

/// Implied volatility assumed for a strike whose quote carries none.
pub const DEFAULT_IV: f64 = 0.15;

/// Call and put Greeks for one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeGreeks {
    pub strike: f64,
    pub call: GreeksResult,
    pub put: GreeksResult,
}

/// Per-strike Greeks for the whole chain, ascending by strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainGreeks {
    pub strikes: Vec<StrikeGreeks>,
}

impl ChainGreeks {
    /// Look up the Greeks computed for `strike`.
    pub fn get(&self, strike: f64) -> Option<&StrikeGreeks> {
        self.strikes
            .binary_search_by(|g| g.strike.total_cmp(&strike))
            .ok()
            .map(|idx| &self.strikes[idx])
    }

    pub fn len(&self) -> usize {
        self.strikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }
}

/// Computes Greeks for every strike of a chain.
#[derive(Debug, Clone, Copy)]
pub struct GreeksEngine {
    /// Fallback IV when a strike has no quote for one side.
    pub default_iv: f64,
}

impl GreeksEngine {
    pub fn new(default_iv: f64) -> Self {
        Self { default_iv }
    }

    /// Per-strike call and put Greeks.  Missing IVs use `default_iv` instead
    /// of producing NaN.
    pub fn analyze(
        &self,
        chain: &[StrikeRecord],
        spot: f64,
        time_to_expiry: f64,
        rate: f64,
    ) -> ChainGreeks {
        let mut strikes: Vec<StrikeGreeks> = chain
            .iter()
            .map(|row| {
                let call_iv = row.call_iv.unwrap_or(self.default_iv);
                let put_iv = row.put_iv.unwrap_or(self.default_iv);
                StrikeGreeks {
                    strike: row.strike,
                    call: calculate(OptionType::Call, spot, row.strike, time_to_expiry, rate, call_iv),
                    put: calculate(OptionType::Put, spot, row.strike, time_to_expiry, rate, put_iv),
                }
            })
            .collect();
        strikes.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        debug!(
            strikes = strikes.len(),
            spot,
            time_to_expiry = format!("{:.5}", time_to_expiry),
            "chain greeks computed"
        );

        ChainGreeks { strikes }
    }
}

impl Default for GreeksEngine {
    fn default() -> Self {
        Self::new(DEFAULT_IV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<StrikeRecord> {
        vec![
            StrikeRecord::new(24600.0, 100, 50).with_iv(0.15, 0.15),
            StrikeRecord::new(24400.0, 60, 140),
            StrikeRecord::new(24500.0, 120, 120).with_iv(0.14, 0.16),
        ]
    }

    #[test]
    fn sorted_by_strike() {
        let out = GreeksEngine::default().analyze(&chain(), 24500.0, 0.02, 0.10);
        let strikes: Vec<f64> = out.strikes.iter().map(|g| g.strike).collect();
        assert_eq!(strikes, vec![24400.0, 24500.0, 24600.0]);
    }

    #[test]
    fn missing_iv_uses_default() {
        let out = GreeksEngine::default().analyze(&chain(), 24500.0, 0.02, 0.10);
        let expected = calculate(OptionType::Call, 24500.0, 24400.0, 0.02, 0.10, DEFAULT_IV);
        let got = out.get(24400.0).unwrap();
        assert_eq!(got.call, expected);
        assert!(got.put.delta.is_finite());
    }

    #[test]
    fn lookup_missing_strike() {
        let out = GreeksEngine::default().analyze(&chain(), 24500.0, 0.02, 0.10);
        assert!(out.get(25000.0).is_none());
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn expiry_day_chain_is_all_zero() {
        let out = GreeksEngine::default().analyze(&chain(), 24500.0, 0.0, 0.10);
        assert!(out
            .strikes
            .iter()
            .all(|g| g.call == GreeksResult::zero() && g.put == GreeksResult::zero()));
    }

    #[test]
    fn empty_chain() {
        let out = GreeksEngine::default().analyze(&[], 24500.0, 0.02, 0.10);
        assert!(out.is_empty());
    }
}
