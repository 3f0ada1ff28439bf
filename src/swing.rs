// =============================================================================
// Swing Score: additive checklist for a directional swing entry
// =============================================================================
//
//   structure UP             +2
//   sectors supportive       +2
//   net GEX < 0              +1   (dealers amplify the move)
//   ATM IV rising            +2
//   ATM vomma HIGH           +1
//   ATM OI unwinding         +2
//
//   >= 8 STRONG SWING BUY, >= 6 CONDITIONAL BUY, otherwise AVOID.
//
// Missing inputs (no GEX, rolled ATM strike, no sector data) score zero.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alignment::SectorTrend;
use crate::greeks::{ChainGreeks, StrikeGreeks};
use crate::open_interest::AtmOiTrend;
use crate::types::PriceTrend;

const STRONG_BUY_SCORE: u8 = 8;
const CONDITIONAL_BUY_SCORE: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VommaLevel {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingVerdict {
    StrongSwingBuy,
    ConditionalBuy,
    Avoid,
}

impl SwingVerdict {
    pub fn from_score(score: u8) -> Self {
        if score >= STRONG_BUY_SCORE {
            Self::StrongSwingBuy
        } else if score >= CONDITIONAL_BUY_SCORE {
            Self::ConditionalBuy
        } else {
            Self::Avoid
        }
    }
}

impl std::fmt::Display for SwingVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongSwingBuy => write!(f, "STRONG SWING BUY"),
            Self::ConditionalBuy => write!(f, "CONDITIONAL BUY"),
            Self::Avoid => write!(f, "AVOID"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingInputs {
    pub structure: PriceTrend,
    pub sector_trend: Option<SectorTrend>,
    pub net_gex: Option<f64>,
    pub iv_rising: bool,
    pub vomma: VommaLevel,
    pub atm_oi: Option<AtmOiTrend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingScore {
    pub score: u8,
    pub verdict: SwingVerdict,
    pub inputs: SwingInputs,
}

fn mean_vomma(g: &StrikeGreeks) -> f64 {
    (g.call.vomma + g.put.vomma) / 2.0
}

/// HIGH when the ATM strike's vomma is above the chain average.
pub fn vomma_level(greeks: &ChainGreeks, atm_strike: f64) -> VommaLevel {
    let Some(atm) = greeks.get(atm_strike) else {
        return VommaLevel::Low;
    };
    let chain_mean =
        greeks.strikes.iter().map(mean_vomma).sum::<f64>() / greeks.len().max(1) as f64;
    if mean_vomma(atm) > chain_mean {
        VommaLevel::High
    } else {
        VommaLevel::Low
    }
}

pub fn swing_score(inputs: SwingInputs) -> SwingScore {
    let mut score = 0u8;
    if inputs.structure == PriceTrend::Up {
        score += 2;
    }
    if inputs.sector_trend == Some(SectorTrend::Supportive) {
        score += 2;
    }
    if inputs.net_gex.is_some_and(|g| g < 0.0) {
        score += 1;
    }
    if inputs.iv_rising {
        score += 2;
    }
    if inputs.vomma == VommaLevel::High {
        score += 1;
    }
    if inputs.atm_oi == Some(AtmOiTrend::Unwinding) {
        score += 2;
    }

    let verdict = SwingVerdict::from_score(score);
    debug!(score, verdict = %verdict, "swing score computed");

    SwingScore {
        score,
        verdict,
        inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeks::GreeksResult;

    fn all_in() -> SwingInputs {
        SwingInputs {
            structure: PriceTrend::Up,
            sector_trend: Some(SectorTrend::Supportive),
            net_gex: Some(-1e9),
            iv_rising: true,
            vomma: VommaLevel::High,
            atm_oi: Some(AtmOiTrend::Unwinding),
        }
    }

    #[test]
    fn full_checklist_is_strong_buy() {
        let s = swing_score(all_in());
        assert_eq!(s.score, 10);
        assert_eq!(s.verdict, SwingVerdict::StrongSwingBuy);
    }

    #[test]
    fn verdict_bands() {
        let s = swing_score(SwingInputs {
            vomma: VommaLevel::Low,
            net_gex: Some(5e9),
            ..all_in()
        });
        assert_eq!(s.score, 8);
        assert_eq!(s.verdict, SwingVerdict::StrongSwingBuy);

        let s = swing_score(SwingInputs {
            iv_rising: false,
            atm_oi: Some(AtmOiTrend::Buildup),
            ..all_in()
        });
        assert_eq!(s.score, 6);
        assert_eq!(s.verdict, SwingVerdict::ConditionalBuy);

        let s = swing_score(SwingInputs {
            structure: PriceTrend::Down,
            sector_trend: None,
            net_gex: None,
            atm_oi: None,
            ..all_in()
        });
        assert_eq!(s.score, 3);
        assert_eq!(s.verdict, SwingVerdict::Avoid);
    }

    fn strike(k: f64, vomma: f64) -> StrikeGreeks {
        let g = GreeksResult {
            vomma,
            ..GreeksResult::zero()
        };
        StrikeGreeks {
            strike: k,
            call: g,
            put: g,
        }
    }

    #[test]
    fn vomma_against_chain_mean() {
        let greeks = ChainGreeks {
            strikes: vec![strike(100.0, 0.1), strike(110.0, 0.5), strike(120.0, 0.3)],
        };
        assert_eq!(vomma_level(&greeks, 110.0), VommaLevel::High);
        assert_eq!(vomma_level(&greeks, 100.0), VommaLevel::Low);
        assert_eq!(vomma_level(&greeks, 130.0), VommaLevel::Low);

        let flat = ChainGreeks {
            strikes: vec![strike(100.0, 0.0), strike(110.0, 0.0)],
        };
        assert_eq!(vomma_level(&flat, 100.0), VommaLevel::Low);
    }
}
