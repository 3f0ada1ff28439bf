// =============================================================================
// OI Analyzer: PCR, max pain and sentiment regime
// =============================================================================
//
//   pcr = total_put_oi / total_call_oi      (0 when there is no call OI)
//
//   pcr > 1.1  => BULLISH  (put writers defending support)
//   pcr < 0.7  => BEARISH  (call writers capping resistance)
//   otherwise  => NEUTRAL

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::open_interest::max_pain::max_pain;
use crate::snapshot::StrikeRecord;

/// PCR above this reads as bullish.
pub const PCR_BULLISH_ABOVE: f64 = 1.1;
/// PCR below this reads as bearish.
pub const PCR_BEARISH_BELOW: f64 = 0.7;

/// Sentiment read from the put-call ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OIRegime {
    Bullish,
    Bearish,
    Neutral,
}

impl OIRegime {
    pub fn from_pcr(pcr: f64) -> Self {
        if pcr > PCR_BULLISH_ABOVE {
            Self::Bullish
        } else if pcr < PCR_BEARISH_BELOW {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    /// Directional score fed to the mood index: +1, 0 or -1.
    pub fn sentiment(self) -> i8 {
        match self {
            Self::Bullish => 1,
            Self::Neutral => 0,
            Self::Bearish => -1,
        }
    }
}

impl std::fmt::Display for OIRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OIResult {
    pub pcr: f64,
    pub total_call_oi: u64,
    pub total_put_oi: u64,
    /// `None` only for an empty chain.
    pub max_pain: Option<f64>,
    pub regime: OIRegime,
}

pub struct OIAnalyzer;

impl OIAnalyzer {
    pub fn analyze(chain: &[StrikeRecord]) -> OIResult {
        let total_call_oi = chain.iter().fold(0u64, |acc, r| acc.saturating_add(r.call_oi));
        let total_put_oi = chain.iter().fold(0u64, |acc, r| acc.saturating_add(r.put_oi));

        let pcr = if total_call_oi == 0 {
            0.0
        } else {
            total_put_oi as f64 / total_call_oi as f64
        };

        let regime = OIRegime::from_pcr(pcr);
        let max_pain = max_pain(chain);

        debug!(
            pcr = format!("{:.3}", pcr),
            total_call_oi,
            total_put_oi,
            max_pain = ?max_pain,
            regime = %regime,
            "open interest analysed"
        );

        OIResult {
            pcr,
            total_call_oi,
            total_put_oi,
            max_pain,
            regime,
        }
    }
}

/// Change in PCR across a caller-owned history (latest minus oldest).
///
/// Fewer than two samples carry no trend and return 0.
pub fn pcr_trend(history: &[f64]) -> f64 {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= 2 => last - first,
        _ => 0.0,
    }
}
