// =============================================================================
// Market Snapshot: immutable per-cycle input record
// =============================================================================
//
// Produced by an external collaborator (broker feed, scraper, file drop) and
// handed to the pipeline once per cycle.  Nothing in the core mutates it.
//
// `validate` is the caller-side sanitisation step: the engines themselves do
// not defend against negative spot/strike/volatility, so the pipeline checks
// the snapshot once up front and refuses to run on garbage.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// One row of the option chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    pub strike: f64,
    #[serde(default)]
    pub call_oi: u64,
    #[serde(default)]
    pub put_oi: u64,
    /// Implied volatility as a fraction (0.15 = 15%). Missing values fall
    /// back to the configured default IV in batch Greeks.
    #[serde(default)]
    pub call_iv: Option<f64>,
    #[serde(default)]
    pub put_iv: Option<f64>,
    #[serde(default)]
    pub call_ltp: f64,
    #[serde(default)]
    pub put_ltp: f64,
}

impl StrikeRecord {
    pub fn new(strike: f64, call_oi: u64, put_oi: u64) -> Self {
        Self {
            strike,
            call_oi,
            put_oi,
            call_iv: None,
            put_iv: None,
            call_ltp: 0.0,
            put_ltp: 0.0,
        }
    }

    pub fn with_iv(mut self, call_iv: f64, put_iv: f64) -> Self {
        self.call_iv = Some(call_iv);
        self.put_iv = Some(put_iv);
        self
    }

    pub fn with_ltp(mut self, call_ltp: f64, put_ltp: f64) -> Self {
        self.call_ltp = call_ltp;
        self.put_ltp = put_ltp;
        self
    }
}

/// Market breadth counts, when the feed provides them directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breadth {
    pub advances: u32,
    pub declines: u32,
}

/// Participant-wise index futures / OI positioning (daily exchange data).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticipantPositioning {
    /// FII net index futures contracts (long - short).
    pub fii_index_futures_net: f64,
    /// Retail (client) net open interest.
    pub retail_net_oi: f64,
}

/// Everything the core needs for one analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub spot_price: f64,
    /// Years until expiry.
    pub time_to_expiry: f64,
    /// Overrides the configured risk-free rate for this cycle.
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub option_chain: Vec<StrikeRecord>,
    /// FII net cash-market flow in crore.
    #[serde(default)]
    pub fii_net_cash: f64,
    /// DII net cash-market flow in crore.
    #[serde(default)]
    pub dii_net_cash: f64,
    /// Constituent symbol -> percent price change on the session.
    #[serde(default)]
    pub heavyweights: BTreeMap<String, f64>,
    #[serde(default)]
    pub breadth: Option<Breadth>,
    #[serde(default)]
    pub participants: Option<ParticipantPositioning>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, spot_price: f64, time_to_expiry: f64) -> Self {
        Self {
            symbol: symbol.into(),
            spot_price,
            time_to_expiry,
            risk_free_rate: None,
            option_chain: Vec::new(),
            fii_net_cash: 0.0,
            dii_net_cash: 0.0,
            heavyweights: BTreeMap::new(),
            breadth: None,
            participants: None,
        }
    }

    /// Reject snapshots the engines cannot safely compute on.
    ///
    /// Zero time to expiry and empty OI are legal (they have fallbacks);
    /// non-positive spot/strike/IV, duplicate strikes and non-finite values
    /// are not.
    pub fn validate(&self) -> Result<()> {
        if !self.spot_price.is_finite() || self.spot_price <= 0.0 {
            return Err(AnalysisError::InvalidSpot(self.spot_price));
        }
        if !self.time_to_expiry.is_finite() || self.time_to_expiry < 0.0 {
            return Err(AnalysisError::InvalidTimeToExpiry(self.time_to_expiry));
        }
        if let Some(rate) = self.risk_free_rate {
            if !rate.is_finite() {
                return Err(AnalysisError::InvalidRate(rate));
            }
        }

        let mut strikes: Vec<f64> = Vec::with_capacity(self.option_chain.len());
        for row in &self.option_chain {
            if !row.strike.is_finite() || row.strike <= 0.0 {
                return Err(AnalysisError::InvalidStrike(row.strike));
            }
            for iv in [row.call_iv, row.put_iv].into_iter().flatten() {
                if !iv.is_finite() || iv <= 0.0 {
                    return Err(AnalysisError::InvalidVolatility {
                        strike: row.strike,
                        iv,
                    });
                }
            }
            strikes.push(row.strike);
        }

        strikes.sort_by(|a, b| a.total_cmp(b));
        if let Some(dup) = strikes.windows(2).find(|w| w[0] == w[1]) {
            return Err(AnalysisError::DuplicateStrike(dup[0]));
        }

        self.checked_total_open_interest()
            .ok_or(AnalysisError::OpenInterestOverflow)?;

        Ok(())
    }

    /// Chain rows ordered by ascending strike.
    pub fn sorted_chain(&self) -> Vec<&StrikeRecord> {
        let mut rows: Vec<&StrikeRecord> = self.option_chain.iter().collect();
        rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        rows
    }

    /// The chain row whose strike is closest to spot (lower strike on ties).
    pub fn atm_row(&self) -> Option<&StrikeRecord> {
        self.sorted_chain().into_iter().fold(None, |best, row| match best {
            None => Some(row),
            Some(b) => {
                if (row.strike - self.spot_price).abs() < (b.strike - self.spot_price).abs() {
                    Some(row)
                } else {
                    Some(b)
                }
            }
        })
    }

    /// Combined FII + DII cash flow for this session.
    pub fn institutional_net_cash(&self) -> f64 {
        self.fii_net_cash + self.dii_net_cash
    }

    /// Sum of call and put OI across the chain, `None` on overflow.
    pub fn checked_total_open_interest(&self) -> Option<u64> {
        self.option_chain
            .iter()
            .try_fold(0u64, |acc, r| acc.checked_add(r.call_oi)?.checked_add(r.put_oi))
    }

    /// Sum of call and put OI across the chain (saturating; `validate`
    /// rejects chains where this would clip).
    pub fn total_open_interest(&self) -> u64 {
        self.checked_total_open_interest().unwrap_or(u64::MAX)
    }
}
