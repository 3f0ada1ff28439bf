// =============================================================================
// Market Mood Index (MMI)
// =============================================================================
//
// Composite 0–100 sentiment score:
//
//   pcr_score = clamp((pcr - 0.7) / (1.3 - 0.7) · 100, 0, 100)
//   ad_score  = clamp((ad  - 0.5) / (2.0 - 0.5) · 100, 0, 100)
//   oi_score  = (oi_sentiment + 1) · 50
//
//   mmi = 0.3·pcr_score + 0.2·iv_percentile + 0.3·ad_score + 0.2·oi_score
//
// Bands (upper bound exclusive): <30 EXTREME FEAR, <50 FEAR, <70 GREED,
// otherwise EXTREME GREED.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

const PCR_FLOOR: f64 = 0.7;
const PCR_CEIL: f64 = 1.3;
const AD_FLOOR: f64 = 0.5;
const AD_CEIL: f64 = 2.0;

const PCR_WEIGHT: f64 = 0.3;
const IV_WEIGHT: f64 = 0.2;
const AD_WEIGHT: f64 = 0.3;
const OI_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoodRegime {
    ExtremeFear,
    Fear,
    Greed,
    ExtremeGreed,
}

impl MoodRegime {
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::ExtremeFear
        } else if score < 50.0 {
            Self::Fear
        } else if score < 70.0 {
            Self::Greed
        } else {
            Self::ExtremeGreed
        }
    }
}

impl std::fmt::Display for MoodRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExtremeFear => write!(f, "Extreme Fear (Bearish)"),
            Self::Fear => write!(f, "Fear (Cautious)"),
            Self::Greed => write!(f, "Greed (Bullish)"),
            Self::ExtremeGreed => write!(f, "Extreme Greed (Overbought)"),
        }
    }
}

/// Normalised inputs that went into the score, for display and audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodComponents {
    pub pcr_score: f64,
    pub iv_percentile: f64,
    pub ad_score: f64,
    pub oi_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodIndex {
    pub score: f64,
    pub regime: MoodRegime,
    pub components: MoodComponents,
}

fn components(pcr: f64, iv_percentile: f64, ad_ratio: f64, oi_sentiment: i8) -> MoodComponents {
    let pcr_score = ((pcr - PCR_FLOOR) / (PCR_CEIL - PCR_FLOOR) * 100.0).clamp(0.0, 100.0);
    let ad_score = ((ad_ratio - AD_FLOOR) / (AD_CEIL - AD_FLOOR) * 100.0).clamp(0.0, 100.0);
    let oi_score = (f64::from(oi_sentiment.signum()) + 1.0) * 50.0;
    MoodComponents {
        pcr_score,
        iv_percentile: iv_percentile.clamp(0.0, 100.0),
        ad_score,
        oi_score,
    }
}

/// Mood score in [0, 100].
///
/// `iv_percentile` is expected in [0, 100]; `oi_sentiment` in {-1, 0, +1}.
pub fn calculate(pcr: f64, iv_percentile: f64, ad_ratio: f64, oi_sentiment: i8) -> f64 {
    let c = components(pcr, iv_percentile, ad_ratio, oi_sentiment);
    PCR_WEIGHT * c.pcr_score
        + IV_WEIGHT * c.iv_percentile
        + AD_WEIGHT * c.ad_score
        + OI_WEIGHT * c.oi_score
}

/// Score plus regime label and the normalised components.
pub fn analyze(pcr: f64, iv_percentile: f64, ad_ratio: f64, oi_sentiment: i8) -> MoodIndex {
    let components = components(pcr, iv_percentile, ad_ratio, oi_sentiment);
    let score = calculate(pcr, iv_percentile, ad_ratio, oi_sentiment);
    let regime = MoodRegime::from_score(score);

    debug!(
        score = format!("{:.2}", score),
        regime = %regime,
        pcr_score = format!("{:.1}", components.pcr_score),
        ad_score = format!("{:.1}", components.ad_score),
        "mood index computed"
    );

    MoodIndex {
        score,
        regime,
        components,
    }
}

/// Advances over declines.  With no declines the advance count itself is
/// returned, so an all-green tape still scores as strongly positive.
pub fn ad_ratio(advances: u32, declines: u32) -> f64 {
    if declines == 0 {
        f64::from(advances)
    } else {
        f64::from(advances) / f64::from(declines)
    }
}
