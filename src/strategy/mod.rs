pub mod builders;
pub mod payoff;

pub use builders::{
    atm_straddle, bear_put_spread, bull_call_spread, iron_condor, long_straddle, long_strangle,
    quote_from_chain, short_straddle, Quote,
};
pub use payoff::{
    calculate_payoff, spot_range, strategy_metrics, PayoffCurve, PayoffPoint, StrategyLeg,
    StrategyMetrics, MAX_PAYOFF_SAMPLES,
};
