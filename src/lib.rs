//! Analytics core for Indian-index derivatives: option Greeks, gamma
//! exposure, open-interest structure, market mood, heavyweight alignment,
//! smart-money cycle phase, swing score and strategy payoff, plus the
//! service shell that runs them on a schedule and serves the results over
//! REST.

pub mod alignment;
pub mod api;
pub mod app_state;
pub mod error;
pub mod gex;
pub mod greeks;
pub mod history;
pub mod mood;
pub mod open_interest;
pub mod patterns;
pub mod pipeline;
pub mod runtime_config;
pub mod smart_money;
pub mod snapshot;
pub mod strategy;
pub mod swing;
pub mod types;
