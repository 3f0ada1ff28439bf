// =============================================================================
// Gamma Exposure (GEX) Engine
// =============================================================================
//
// Dealer gamma inferred from open interest, assuming dealers are long calls
// and short puts against the public:
//
//   strike_gex = (call_oi · call_gamma - put_oi · put_gamma) · spot · lot
//   net_gex    = Σ strike_gex
//
//   net_gex > 0  => POSITIVE: dealers hedge against the move (dampening)
//   net_gex <= 0 => NEGATIVE: dealers hedge with the move (amplifying)
//
// Flip level: strikes are walked in ascending order accumulating strike_gex.
// Every sign change of the running total between two adjacent strikes is a
// crossing, located by linear interpolation:
//
//   flip = K0 + (0 - C0) · (K1 - K0) / (C1 - C0)
//
// The crossing closest to spot is reported (lower one on ties).  When the
// running total never changes sign the spot price is returned and the result
// is flagged `SpotFallback`.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::greeks::ChainGreeks;
use crate::snapshot::StrikeRecord;

/// Contract multiplier for the reference index.
pub const DEFAULT_LOT_MULTIPLIER: f64 = 50.0;

/// Sign of aggregate dealer gamma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GexRegime {
    /// Dealers dampen moves.
    Positive,
    /// Dealers amplify moves.
    Negative,
}

impl std::fmt::Display for GexRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "Positive (Stabilizing)"),
            Self::Negative => write!(f, "Negative (Accelerating)"),
        }
    }
}

/// How `flip_level` was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipSource {
    /// Interpolated between the two strikes bracketing a zero crossing.
    Interpolated,
    /// No crossing in the chain; spot price reported instead.
    SpotFallback,
}

/// Exposure contributed by one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeGex {
    pub strike: f64,
    pub call_gex: f64,
    pub put_gex: f64,
    pub net_gex: f64,
    /// Running total from the lowest strike up to and including this one.
    pub cumulative_gex: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexResult {
    pub net_gex: f64,
    pub regime: GexRegime,
    pub flip_level: f64,
    pub flip_source: FlipSource,
    /// Per-strike breakdown, ascending by strike.
    pub profile: Vec<StrikeGex>,
}

#[derive(Debug, Clone, Copy)]
pub struct GexEngine {
    pub lot_multiplier: f64,
}

impl GexEngine {
    pub fn new(lot_multiplier: f64) -> Self {
        Self { lot_multiplier }
    }

    /// Aggregate dealer gamma across the chain.
    ///
    /// A strike missing from `greeks` contributes zero gamma.
    pub fn analyze(&self, chain: &[StrikeRecord], greeks: &ChainGreeks, spot: f64) -> GexResult {
        let scale = spot * self.lot_multiplier;

        let mut rows: Vec<&StrikeRecord> = chain.iter().collect();
        rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let mut profile = Vec::with_capacity(rows.len());
        let mut running = 0.0;
        for row in rows {
            let (call_gamma, put_gamma) = greeks
                .get(row.strike)
                .map(|g| (g.call.gamma, g.put.gamma))
                .unwrap_or((0.0, 0.0));

            let call_gex = row.call_oi as f64 * call_gamma * scale;
            let put_gex = -(row.put_oi as f64 * put_gamma * scale);
            let net_gex = call_gex + put_gex;
            running += net_gex;

            profile.push(StrikeGex {
                strike: row.strike,
                call_gex,
                put_gex,
                net_gex,
                cumulative_gex: running,
            });
        }

        let net_gex: f64 = profile.iter().map(|p| p.net_gex).sum();
        let regime = if net_gex > 0.0 {
            GexRegime::Positive
        } else {
            GexRegime::Negative
        };

        let (flip_level, flip_source) = match find_flip(&profile, spot) {
            Some(level) => (level, FlipSource::Interpolated),
            None => {
                trace!(spot, "no gamma flip inside chain, reporting spot");
                (spot, FlipSource::SpotFallback)
            }
        };

        debug!(
            net_gex = format!("{:.2}", net_gex),
            regime = %regime,
            flip_level = format!("{:.2}", flip_level),
            "gex computed"
        );

        GexResult {
            net_gex,
            regime,
            flip_level,
            flip_source,
            profile,
        }
    }
}

impl Default for GexEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LOT_MULTIPLIER)
    }
}

/// Zero crossing of the cumulative profile nearest to `spot`.
fn find_flip(profile: &[StrikeGex], spot: f64) -> Option<f64> {
    let mut best: Option<f64> = None;

    for pair in profile.windows(2) {
        let (k0, c0) = (pair[0].strike, pair[0].cumulative_gex);
        let (k1, c1) = (pair[1].strike, pair[1].cumulative_gex);

        let crosses = (c0 < 0.0 && c1 >= 0.0) || (c0 > 0.0 && c1 <= 0.0);
        if !crosses {
            continue;
        }

        let level = k0 + (0.0 - c0) * (k1 - k0) / (c1 - c0);
        best = match best {
            Some(b) if (b - spot).abs() <= (level - spot).abs() => Some(b),
            _ => Some(level),
        };
    }

    best
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeks::{GreeksEngine, GreeksResult, StrikeGreeks};

    fn gamma_only(strike: f64, call_gamma: f64, put_gamma: f64) -> StrikeGreeks {
        StrikeGreeks {
            strike,
            call: GreeksResult {
                gamma: call_gamma,
                ..GreeksResult::zero()
            },
            put: GreeksResult {
                gamma: put_gamma,
                ..GreeksResult::zero()
            },
        }
    }

    fn profile_point(strike: f64, cumulative_gex: f64) -> StrikeGex {
        StrikeGex {
            strike,
            call_gex: 0.0,
            put_gex: 0.0,
            net_gex: 0.0,
            cumulative_gex,
        }
    }

    #[test]
    fn test_strike_gex_formula() {
        let chain = vec![StrikeRecord::new(100.0, 10, 4)];
        let greeks = ChainGreeks {
            strikes: vec![gamma_only(100.0, 0.02, 0.03)],
        };
        let out = GexEngine::default().analyze(&chain, &greeks, 100.0);
        // (10·0.02 - 4·0.03) · 100 · 50 = 0.08 · 5000 = 400
        assert!((out.net_gex - 400.0).abs() < 1e-9);
        assert_eq!(out.regime, GexRegime::Positive);
        assert!((out.profile[0].call_gex - 1000.0).abs() < 1e-9);
        assert!((out.profile[0].put_gex + 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_lot_multiplier_is_configurable() {
        let chain = vec![StrikeRecord::new(100.0, 10, 0)];
        let greeks = ChainGreeks {
            strikes: vec![gamma_only(100.0, 0.01, 0.0)],
        };
        let a = GexEngine::new(25.0).analyze(&chain, &greeks, 100.0);
        let b = GexEngine::new(50.0).analyze(&chain, &greeks, 100.0);
        assert!((b.net_gex - 2.0 * a.net_gex).abs() < 1e-9);
    }

    #[test]
    fn test_negative_regime_when_puts_dominate() {
        let chain = vec![StrikeRecord::new(100.0, 1, 50)];
        let greeks = ChainGreeks {
            strikes: vec![gamma_only(100.0, 0.02, 0.02)],
        };
        let out = GexEngine::default().analyze(&chain, &greeks, 100.0);
        assert!(out.net_gex < 0.0);
        assert_eq!(out.regime, GexRegime::Negative);
    }

    #[test]
    fn test_zero_gex_is_negative_regime() {
        let out = GexEngine::default().analyze(&[], &ChainGreeks::default(), 24500.0);
        assert_eq!(out.net_gex, 0.0);
        assert_eq!(out.regime, GexRegime::Negative);
        assert_eq!(out.flip_level, 24500.0);
        assert_eq!(out.flip_source, FlipSource::SpotFallback);
    }

    #[test]
    fn test_flip_interpolation() {
        let profile = vec![
            profile_point(100.0, -10.0),
            profile_point(110.0, -10.0),
            profile_point(120.0, 20.0),
        ];
        let flip = find_flip(&profile, 105.0).unwrap();
        // 110 + 10 · 10 / 30
        assert!((flip - 113.333_333_333).abs() < 1e-6);
    }

    #[test]
    fn test_flip_picks_crossing_nearest_spot() {
        let profile = vec![
            profile_point(100.0, -10.0),
            profile_point(110.0, 10.0),
            profile_point(120.0, -10.0),
            profile_point(130.0, 10.0),
        ];
        assert!((find_flip(&profile, 103.0).unwrap() - 105.0).abs() < 1e-9);
        assert!((find_flip(&profile, 128.0).unwrap() - 125.0).abs() < 1e-9);
        // Equidistant: lower crossing wins.
        assert!((find_flip(&profile, 110.0).unwrap() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_flip_on_exact_zero() {
        let profile = vec![profile_point(100.0, -5.0), profile_point(110.0, 0.0)];
        assert_eq!(find_flip(&profile, 100.0), Some(110.0));
    }

    #[test]
    fn test_no_crossing() {
        let profile = vec![profile_point(100.0, 5.0), profile_point(110.0, 9.0)];
        assert_eq!(find_flip(&profile, 105.0), None);
    }

    #[test]
    fn test_flip_between_put_wall_and_call_wall() {
        let chain = vec![
            StrikeRecord::new(24300.0, 1_000, 90_000),
            StrikeRecord::new(24400.0, 5_000, 60_000),
            StrikeRecord::new(24500.0, 40_000, 40_000),
            StrikeRecord::new(24600.0, 80_000, 5_000),
            StrikeRecord::new(24700.0, 120_000, 1_000),
        ];
        let greeks = GreeksEngine::default().analyze(&chain, 24500.0, 0.02, 0.10);
        let out = GexEngine::default().analyze(&chain, &greeks, 24500.0);
        assert_eq!(out.flip_source, FlipSource::Interpolated);
        assert!(out.flip_level > 24300.0 && out.flip_level < 24700.0);
        assert_eq!(out.profile.len(), 5);
        let last = out.profile.last().unwrap();
        assert!((last.cumulative_gex - out.net_gex).abs() < 1e-6 * out.net_gex.abs().max(1.0));
    }

    #[test]
    fn test_regime_display() {
        assert_eq!(GexRegime::Positive.to_string(), "Positive (Stabilizing)");
        assert_eq!(GexRegime::Negative.to_string(), "Negative (Accelerating)");
    }
}
