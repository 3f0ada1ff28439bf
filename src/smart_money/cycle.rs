// =============================================================================
// Smart-Money Cycle: Wyckoff-style phase from institutional flow
// =============================================================================
//
// Two independent signals, re-evaluated every cycle (no transitions, no
// memory):
//
//   cash_flow_ma  > 1000 & UP        => MARKUP
//   cash_flow_ma  > 500  & SIDEWAYS  => ACCUMULATION
//   cash_flow_ma  < -1000 & DOWN     => MARKDOWN
//   cash_flow_ma  < -500 & SIDEWAYS  => DISTRIBUTION
//   otherwise                        => NEUTRAL
//
// Checked in that order, first match wins.  Thresholds are in crore.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::mean;
use crate::smart_money::flow::InstitutionalFlow;
use crate::smart_money::positioning::PositioningRead;
use crate::types::PriceTrend;

const MARKUP_FLOW: f64 = 1000.0;
const ACCUMULATION_FLOW: f64 = 500.0;
const MARKDOWN_FLOW: f64 = -1000.0;
const DISTRIBUTION_FLOW: f64 = -500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Accumulation,
    Markup,
    Distribution,
    Markdown,
    Neutral,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulation => write!(f, "ACCUMULATION"),
            Self::Markup => write!(f, "MARKUP"),
            Self::Distribution => write!(f, "DISTRIBUTION"),
            Self::Markdown => write!(f, "MARKDOWN"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Classify the cycle phase and return the one-line reading that goes with it.
pub fn identify_cycle_phase(cash_flow_ma: f64, trend: PriceTrend) -> (CyclePhase, &'static str) {
    if cash_flow_ma > MARKUP_FLOW && trend == PriceTrend::Up {
        (
            CyclePhase::Markup,
            "Institutional support is strong. Trend is sustainable.",
        )
    } else if cash_flow_ma > ACCUMULATION_FLOW && trend == PriceTrend::Sideways {
        (
            CyclePhase::Accumulation,
            "Smart money is buying while public is fearful.",
        )
    } else if cash_flow_ma < MARKDOWN_FLOW && trend == PriceTrend::Down {
        (
            CyclePhase::Markdown,
            "Institutional exit confirmed. Avoid buying dip.",
        )
    } else if cash_flow_ma < DISTRIBUTION_FLOW && trend == PriceTrend::Sideways {
        (
            CyclePhase::Distribution,
            "Smart money is exiting while public is buying.",
        )
    } else {
        (CyclePhase::Neutral, "Market is in a decision phase.")
    }
}

/// Mean of the caller's cash-flow history, 0 when there is none.
pub fn cash_flow_moving_average(history: &[f64]) -> f64 {
    mean(history).unwrap_or(0.0)
}

/// Direction of spot across the history: percent change from oldest to
/// latest against a ±`band_pct` sideways band.
pub fn price_trend_from_history(spots: &[f64], band_pct: f64) -> PriceTrend {
    let (Some(&first), Some(&last)) = (spots.first(), spots.last()) else {
        return PriceTrend::Sideways;
    };
    if spots.len() < 2 || first <= 0.0 {
        return PriceTrend::Sideways;
    }

    let change_pct = (last - first) / first * 100.0;
    if change_pct > band_pct {
        PriceTrend::Up
    } else if change_pct < -band_pct {
        PriceTrend::Down
    } else {
        PriceTrend::Sideways
    }
}

/// Full smart-money read for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartMoneyResult {
    pub phase: CyclePhase,
    pub explanation: String,
    pub cash_flow_ma: f64,
    pub price_trend: PriceTrend,
    pub flow: InstitutionalFlow,
    /// Present when the snapshot carries participant-wise positioning.
    pub positioning: Option<PositioningRead>,
}

impl SmartMoneyResult {
    pub fn new(
        cash_flow_ma: f64,
        price_trend: PriceTrend,
        flow: InstitutionalFlow,
        positioning: Option<PositioningRead>,
    ) -> Self {
        let (phase, explanation) = identify_cycle_phase(cash_flow_ma, price_trend);

        debug!(
            cash_flow_ma = format!("{:.1}", cash_flow_ma),
            trend = %price_trend,
            phase = %phase,
            net_bias = %flow.net_bias,
            "smart money classified"
        );

        Self {
            phase,
            explanation: explanation.to_string(),
            cash_flow_ma,
            price_trend,
            flow,
            positioning,
        }
    }
}
