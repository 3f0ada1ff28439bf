// =============================================================================
// OI Build-up: who is driving the move
// =============================================================================
//
//   price ↑  OI ↑  => LONG BUILDUP    (fresh longs, bullish)
//   price ↑  OI ↓  => SHORT COVERING  (trapped shorts exiting, explosive up)
//   price ↓  OI ↑  => SHORT BUILDUP   (fresh shorts, bearish)
//   price ↓  OI ↓  => LONG UNWINDING  (longs giving up, bearish)
//   either flat    => NEUTRAL

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OIBuildup {
    LongBuildup,
    ShortCovering,
    ShortBuildup,
    LongUnwinding,
    Neutral,
}

impl OIBuildup {
    pub fn is_bullish(self) -> bool {
        matches!(self, Self::LongBuildup | Self::ShortCovering)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Self::ShortBuildup | Self::LongUnwinding)
    }
}

impl std::fmt::Display for OIBuildup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongBuildup => write!(f, "Long Buildup (Bullish)"),
            Self::ShortCovering => write!(f, "Short Covering (Explosive Bullish)"),
            Self::ShortBuildup => write!(f, "Short Buildup (Bearish)"),
            Self::LongUnwinding => write!(f, "Long Unwinding (Bearish)"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Classify participation from the signed change in price and in OI.
pub fn classify_buildup(price_change: f64, oi_change: f64) -> OIBuildup {
    if price_change > 0.0 && oi_change > 0.0 {
        OIBuildup::LongBuildup
    } else if price_change > 0.0 && oi_change < 0.0 {
        OIBuildup::ShortCovering
    } else if price_change < 0.0 && oi_change > 0.0 {
        OIBuildup::ShortBuildup
    } else if price_change < 0.0 && oi_change < 0.0 {
        OIBuildup::LongUnwinding
    } else {
        OIBuildup::Neutral
    }
}

/// Combined premium of the call and put at one strike.
pub fn straddle_price(call_ltp: f64, put_ltp: f64) -> f64 {
    call_ltp + put_ltp
}

// ---------------------------------------------------------------------------
// IV regime: price move against the ATM IV move
// ---------------------------------------------------------------------------

/// Moves smaller than this (percent) count as range-bound.
pub const RANGE_BOUND_PCT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IvRegime {
    Accumulation,
    ShortCovering,
    Panic,
    OptionSelling,
    Neutral,
}

impl std::fmt::Display for IvRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulation => write!(f, "Accumulation (Rising IV + Price Up)"),
            Self::ShortCovering => write!(f, "Short Covering (Falling IV + Price Up)"),
            Self::Panic => write!(f, "Panic / Fresh Shorts (Rising IV + Price Down)"),
            Self::OptionSelling => write!(f, "Option Selling (Falling IV + Range)"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Classify from the spot change (percent) and the ATM IV change.
///
/// First match wins, so a small up-move with falling IV reads as short
/// covering, not option selling.
pub fn classify_iv_regime(price_change_pct: f64, iv_change: f64) -> IvRegime {
    if price_change_pct > 0.0 && iv_change > 0.0 {
        IvRegime::Accumulation
    } else if price_change_pct > 0.0 && iv_change < 0.0 {
        IvRegime::ShortCovering
    } else if price_change_pct < 0.0 && iv_change > 0.0 {
        IvRegime::Panic
    } else if price_change_pct.abs() < RANGE_BOUND_PCT && iv_change < 0.0 {
        IvRegime::OptionSelling
    } else {
        IvRegime::Neutral
    }
}

// ---------------------------------------------------------------------------
// ATM open interest trend
// ---------------------------------------------------------------------------

/// Combined call + put OI at the ATM strike, carried between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmOpenInterest {
    pub strike: f64,
    pub oi: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtmOiTrend {
    Buildup,
    Unwinding,
}

/// Compare ATM OI with the previous cycle.  Only meaningful when the ATM
/// strike has not rolled; otherwise `None`.
pub fn atm_oi_trend(previous: Option<AtmOpenInterest>, current: AtmOpenInterest) -> Option<AtmOiTrend> {
    let prev = previous.filter(|p| p.strike == current.strike)?;
    Some(if current.oi < prev.oi {
        AtmOiTrend::Unwinding
    } else {
        AtmOiTrend::Buildup
    })
}
