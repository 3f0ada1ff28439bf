// =============================================================================
// Participant positioning: where today sits in the distribution
// =============================================================================
//
//   FII index futures net   percentile > 80  => AGGRESSIVE LONG
//                           percentile < 20  => AGGRESSIVE SHORT
//   Retail net OI           percentile < 10 at market lows => CAPITULATION
//                           percentile > 90                => EXCESSIVE OPTIMISM
//
// Retail is read contrarian.  Percentile = share of the caller's history
// strictly below today's value.  No history means no read (Neutral).
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::percentile_rank;
use crate::smart_money::flow::FlowBias;
use crate::snapshot::ParticipantPositioning;

const FII_LONG_ABOVE: f64 = 80.0;
const FII_SHORT_BELOW: f64 = 20.0;
const RETAIL_CAPITULATION_BELOW: f64 = 10.0;
const RETAIL_EUPHORIA_ABOVE: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuturesBias {
    AggressiveLong,
    AggressiveShort,
    Neutral,
}

impl std::fmt::Display for FuturesBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AggressiveLong => write!(f, "Aggressive Long (Bullish)"),
            Self::AggressiveShort => write!(f, "Aggressive Short (Bearish)"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetailSentiment {
    Capitulation,
    ExcessiveOptimism,
    Neutral,
}

impl std::fmt::Display for RetailSentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capitulation => write!(f, "Capitulation (Contrarian Bullish)"),
            Self::ExcessiveOptimism => write!(f, "Excessive Optimism (Contrarian Bearish)"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinedBias {
    ConvergenceBullish,
    ConvergenceBearish,
    ContrarianBullish,
    Mixed,
}

impl std::fmt::Display for CombinedBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConvergenceBullish => write!(f, "Institutional Convergence (Strong Bullish)"),
            Self::ConvergenceBearish => write!(f, "Institutional Convergence (Strong Bearish)"),
            Self::ContrarianBullish => write!(f, "Contrarian Opportunity (Bullish)"),
            Self::Mixed => write!(f, "Mixed / Neutral"),
        }
    }
}

pub fn fii_futures_bias(net_futures: f64, history: &[f64]) -> FuturesBias {
    match percentile_rank(history, net_futures) {
        Some(p) if p > FII_LONG_ABOVE => FuturesBias::AggressiveLong,
        Some(p) if p < FII_SHORT_BELOW => FuturesBias::AggressiveShort,
        _ => FuturesBias::Neutral,
    }
}

pub fn retail_sentiment(net_oi: f64, history: &[f64], market_at_lows: bool) -> RetailSentiment {
    match percentile_rank(history, net_oi) {
        Some(p) if p < RETAIL_CAPITULATION_BELOW && market_at_lows => RetailSentiment::Capitulation,
        Some(p) if p > RETAIL_EUPHORIA_ABOVE => RetailSentiment::ExcessiveOptimism,
        _ => RetailSentiment::Neutral,
    }
}

/// FII futures and DII cash agreeing trump everything; failing that a
/// capitulating retail crowd is the contrarian long.
pub fn combined_bias(fii: FuturesBias, dii: FlowBias, retail: RetailSentiment) -> CombinedBias {
    match (fii, dii, retail) {
        (FuturesBias::AggressiveLong, FlowBias::Bullish, _) => CombinedBias::ConvergenceBullish,
        (FuturesBias::AggressiveShort, FlowBias::Bearish, _) => CombinedBias::ConvergenceBearish,
        (_, _, RetailSentiment::Capitulation) => CombinedBias::ContrarianBullish,
        _ => CombinedBias::Mixed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositioningRead {
    pub fii_percentile: Option<f64>,
    pub fii_bias: FuturesBias,
    pub retail_percentile: Option<f64>,
    pub retail: RetailSentiment,
    pub combined: CombinedBias,
}

pub fn analyze_positioning(
    positioning: &ParticipantPositioning,
    fii_history: &[f64],
    retail_history: &[f64],
    dii_bias: FlowBias,
    market_at_lows: bool,
) -> PositioningRead {
    let fii_bias = fii_futures_bias(positioning.fii_index_futures_net, fii_history);
    let retail = retail_sentiment(positioning.retail_net_oi, retail_history, market_at_lows);
    let combined = combined_bias(fii_bias, dii_bias, retail);

    debug!(fii = %fii_bias, retail = %retail, combined = %combined, "positioning read");

    PositioningRead {
        fii_percentile: percentile_rank(fii_history, positioning.fii_index_futures_net),
        fii_bias,
        retail_percentile: percentile_rank(retail_history, positioning.retail_net_oi),
        retail,
        combined,
    }
}
