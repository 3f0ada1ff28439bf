// =============================================================================
// Greeks Module
// =============================================================================
//
// Closed-form Black-Scholes sensitivities for single options and for a whole
// option chain.  Every function here is pure: output depends only on the
// inputs, so repeated cycles on the same snapshot give identical numbers.

pub mod black_scholes;
pub mod chain;

pub use black_scholes::{calculate, norm_cdf, norm_pdf, GreeksResult};
pub use chain::{ChainGreeks, GreeksEngine, StrikeGreeks};
