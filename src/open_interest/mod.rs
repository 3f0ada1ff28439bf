// =============================================================================
// Open Interest / Sentiment Module
// =============================================================================
//
// Option-chain positioning signals:
//
//   1. Put-Call Ratio: aggregate put OI over call OI, with a fixed regime band
//   2. Max Pain: strike minimising aggregate option-writer payout
//   3. OI Build-up: price change vs OI change participation read
//   4. IV regime and ATM OI trend: price change vs ATM IV / ATM OI change
//
// All functions are stateless.  PCR trend takes a caller-owned history slice.

pub mod analyzer;
pub mod buildup;
pub mod max_pain;

pub use analyzer::{pcr_trend, OIAnalyzer, OIRegime, OIResult};
pub use buildup::{
    atm_oi_trend, classify_buildup, classify_iv_regime, straddle_price, AtmOiTrend,
    AtmOpenInterest, IvRegime, OIBuildup,
};
pub use max_pain::{max_pain, writer_payout};
