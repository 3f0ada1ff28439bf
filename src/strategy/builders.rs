// =============================================================================
// Canned strategies
// =============================================================================
//
// Leg sets for the common index structures.  Premiums come from the caller
// (or from the chain via `quote_from_chain`); nothing here prices options.

use serde::{Deserialize, Serialize};

use crate::snapshot::{MarketSnapshot, StrikeRecord};
use crate::strategy::payoff::StrategyLeg;
use crate::types::{OptionType, Side};

/// Strike and premium of a single option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub strike: f64,
    pub premium: f64,
}

impl Quote {
    pub fn new(strike: f64, premium: f64) -> Self {
        Self { strike, premium }
    }
}

fn leg(option_type: OptionType, side: Side, quote: Quote, quantity: u32) -> StrategyLeg {
    StrategyLeg::new(option_type, side, quote.strike, quote.premium, quantity)
}

/// Last traded price of one side at `strike`, if the chain has that row.
pub fn quote_from_chain(chain: &[StrikeRecord], strike: f64, option_type: OptionType) -> Option<Quote> {
    let row = chain.iter().find(|r| r.strike == strike)?;
    let premium = match option_type {
        OptionType::Call => row.call_ltp,
        OptionType::Put => row.put_ltp,
    };
    Some(Quote::new(strike, premium))
}

pub fn long_straddle(call: Quote, put: Quote, quantity: u32) -> Vec<StrategyLeg> {
    vec![
        leg(OptionType::Call, Side::Buy, call, quantity),
        leg(OptionType::Put, Side::Buy, put, quantity),
    ]
}

pub fn short_straddle(call: Quote, put: Quote, quantity: u32) -> Vec<StrategyLeg> {
    vec![
        leg(OptionType::Call, Side::Sell, call, quantity),
        leg(OptionType::Put, Side::Sell, put, quantity),
    ]
}

/// Long OTM put plus long OTM call.
pub fn long_strangle(put: Quote, call: Quote, quantity: u32) -> Vec<StrategyLeg> {
    vec![
        leg(OptionType::Put, Side::Buy, put, quantity),
        leg(OptionType::Call, Side::Buy, call, quantity),
    ]
}

pub fn bull_call_spread(long_call: Quote, short_call: Quote, quantity: u32) -> Vec<StrategyLeg> {
    vec![
        leg(OptionType::Call, Side::Buy, long_call, quantity),
        leg(OptionType::Call, Side::Sell, short_call, quantity),
    ]
}

pub fn bear_put_spread(long_put: Quote, short_put: Quote, quantity: u32) -> Vec<StrategyLeg> {
    vec![
        leg(OptionType::Put, Side::Buy, long_put, quantity),
        leg(OptionType::Put, Side::Sell, short_put, quantity),
    ]
}

/// Short put spread below spot plus short call spread above it.
/// Strikes ascend: long put < short put < short call < long call.
pub fn iron_condor(
    long_put: Quote,
    short_put: Quote,
    short_call: Quote,
    long_call: Quote,
    quantity: u32,
) -> Vec<StrategyLeg> {
    vec![
        leg(OptionType::Put, Side::Buy, long_put, quantity),
        leg(OptionType::Put, Side::Sell, short_put, quantity),
        leg(OptionType::Call, Side::Sell, short_call, quantity),
        leg(OptionType::Call, Side::Buy, long_call, quantity),
    ]
}

/// Long straddle at the at-the-money strike using chain LTPs.
pub fn atm_straddle(snapshot: &MarketSnapshot, quantity: u32) -> Option<Vec<StrategyLeg>> {
    let row = snapshot.atm_row()?;
    Some(long_straddle(
        Quote::new(row.strike, row.call_ltp),
        Quote::new(row.strike, row.put_ltp),
        quantity,
    ))
}
