// =============================================================================
// Rolling history: bounded rings owned by the orchestrator
// =============================================================================
//
// The engines are pure; anything that needs a look-back (PCR trend, cash-flow
// moving average, IV percentile, price trend, positioning percentiles) takes
// a plain slice.  These rings are where the orchestrator keeps those slices
// between cycles.  Oldest sample first; the ring drops from the front once it
// reaches capacity.
// =============================================================================

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::open_interest::AtmOpenInterest;
use crate::pipeline::{AnalysisContext, AnalysisResult};
use crate::snapshot::MarketSnapshot;

/// Fixed-capacity FIFO of `f64` samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingHistory {
    /// A ring holding at most `capacity` samples (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Samples oldest-first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Share of `history` strictly below `current`, in percent.
/// `None` when there is no history to rank against.
pub fn percentile_rank(history: &[f64], current: f64) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let below = history.iter().filter(|&&x| x < current).count();
    Some(below as f64 / history.len() as f64 * 100.0)
}

// ---------------------------------------------------------------------------
// MarketHistory -- every ring the pipeline reads, in one place
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketHistory {
    pub pcr: RollingHistory,
    /// Combined FII + DII cash flow per cycle.
    pub cash_flow: RollingHistory,
    pub spot: RollingHistory,
    pub atm_iv: RollingHistory,
    pub fii_futures: RollingHistory,
    pub retail_oi: RollingHistory,
    previous_total_oi: Option<u64>,
    previous_atm: Option<AtmOpenInterest>,
}

impl MarketHistory {
    pub fn new(capacity: usize, cash_flow_window: usize) -> Self {
        Self {
            pcr: RollingHistory::new(capacity),
            cash_flow: RollingHistory::new(cash_flow_window),
            spot: RollingHistory::new(capacity),
            atm_iv: RollingHistory::new(capacity),
            fii_futures: RollingHistory::new(capacity),
            retail_oi: RollingHistory::new(capacity),
            previous_total_oi: None,
            previous_atm: None,
        }
    }

    /// Look-back handed to the next cycle.  Holds only samples from prior
    /// cycles; the pipeline appends the current snapshot itself.
    pub fn context(&self) -> AnalysisContext {
        AnalysisContext {
            pcr_history: self.pcr.to_vec(),
            cash_flow_history: self.cash_flow.to_vec(),
            spot_history: self.spot.to_vec(),
            atm_iv_history: self.atm_iv.to_vec(),
            fii_futures_history: self.fii_futures.to_vec(),
            retail_oi_history: self.retail_oi.to_vec(),
            previous_spot: self.spot.last(),
            previous_total_oi: self.previous_total_oi,
            previous_atm: self.previous_atm,
        }
    }

    /// Fold a completed cycle into the rings.
    pub fn record(&mut self, snapshot: &MarketSnapshot, result: &AnalysisResult) {
        self.pcr.push(result.oi.pcr);
        self.cash_flow.push(snapshot.institutional_net_cash());
        self.spot.push(snapshot.spot_price);
        if let Some(iv) = result.atm_iv {
            self.atm_iv.push(iv);
        }
        if let Some(p) = snapshot.participants {
            self.fii_futures.push(p.fii_index_futures_net);
            self.retail_oi.push(p.retail_net_oi);
        }
        self.previous_total_oi = Some(snapshot.total_open_interest());
        self.previous_atm = snapshot.atm_row().map(|row| AtmOpenInterest {
            strike: row.strike,
            oi: row.call_oi.saturating_add(row.put_oi),
        });
    }

    pub fn clear(&mut self) {
        self.pcr.clear();
        self.cash_flow.clear();
        self.spot.clear();
        self.atm_iv.clear();
        self.fii_futures.clear();
        self.retail_oi.clear();
        self.previous_total_oi = None;
        self.previous_atm = None;
    }
}
