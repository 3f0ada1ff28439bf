pub mod cycle;
pub mod flow;
pub mod positioning;

pub use cycle::{
    cash_flow_moving_average, identify_cycle_phase, price_trend_from_history, CyclePhase,
    SmartMoneyResult,
};
pub use flow::{analyze_flow, FlowBias, InstitutionalFlow, NetBias};
pub use positioning::{
    analyze_positioning, combined_bias, fii_futures_bias, retail_sentiment, CombinedBias,
    FuturesBias, PositioningRead, RetailSentiment,
};
