// =============================================================================
// Runtime Configuration: analytics settings with atomic save
// =============================================================================
//
// Everything a cycle needs that is not in the snapshot: pricing constants,
// the heavyweight weight table, history sizes, the kill switch and per-engine
// enable flags.  Passed explicitly into each cycle; nothing reads it from a
// global.
//
// Persistence uses an atomic tmp + rename so a crash mid-write never leaves a
// truncated file.  Every field carries a serde default so older files keep
// loading when fields are added.
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::gex::DEFAULT_LOT_MULTIPLIER;
use crate::greeks::chain::DEFAULT_IV;

pub const DEFAULT_CONFIG_PATH: &str = "analytics_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_symbol() -> String {
    "NIFTY".to_string()
}

fn default_risk_free_rate() -> f64 {
    0.10
}

fn default_lot_multiplier() -> f64 {
    DEFAULT_LOT_MULTIPLIER
}

fn default_iv() -> f64 {
    DEFAULT_IV
}

fn default_trend_band_pct() -> f64 {
    0.3
}

fn default_heavyweight_weights() -> BTreeMap<String, f64> {
    [
        ("HDFCBANK", 13.0),
        ("RELIANCE", 9.0),
        ("ICICIBANK", 7.8),
        ("INFY", 5.9),
        ("ITC", 4.0),
        ("LT", 3.8),
        ("TCS", 3.8),
        ("BHARTIARTL", 3.7),
        ("AXISBANK", 3.0),
        ("SBIN", 2.8),
    ]
    .into_iter()
    .map(|(symbol, weight)| (symbol.to_string(), weight))
    .collect()
}

fn default_sectors() -> BTreeMap<String, Vec<String>> {
    [
        ("BANK", &["HDFCBANK", "ICICIBANK", "AXISBANK", "SBIN", "KOTAKBANK"][..]),
        ("IT", &["INFY", "TCS", "HCLTECH", "WIPRO", "TECHM"][..]),
        ("ENERGY", &["RELIANCE", "ONGC", "NTPC", "POWERGRID"][..]),
        ("FMCG", &["ITC", "HINDUNILVR", "NESTLEIND"][..]),
        ("AUTO", &["MARUTI", "M&M", "TATAMOTORS"][..]),
        ("INFRA", &["LT", "BHARTIARTL", "ULTRACEMCO"][..]),
    ]
    .into_iter()
    .map(|(sector, members)| {
        let members = members.iter().map(|s| s.to_string()).collect();
        (sector.to_string(), members)
    })
    .collect()
}

fn default_history_capacity() -> usize {
    120
}

fn default_cash_flow_window() -> usize {
    5
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_snapshot_path() -> String {
    "market_snapshot.json".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// EngineParams
// =============================================================================

/// Numeric knobs and enable flags consumed by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Used when the snapshot carries no rate of its own.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Contract multiplier applied to GEX (50 for NIFTY).
    #[serde(default = "default_lot_multiplier")]
    pub lot_multiplier: f64,

    /// IV substituted for strikes that carry none.
    #[serde(default = "default_iv")]
    pub default_iv: f64,

    /// Constituent moves within ±this percent count as flat.
    #[serde(default)]
    pub flat_band_pct: f64,

    /// Spot moves within ±this percent over the history are sideways.
    #[serde(default = "default_trend_band_pct")]
    pub trend_band_pct: f64,

    /// Index weight (percent) per tracked constituent.
    #[serde(default = "default_heavyweight_weights")]
    pub heavyweight_weights: BTreeMap<String, f64>,

    /// Sector name to member symbols, for sector performance.
    #[serde(default = "default_sectors")]
    pub sectors: BTreeMap<String, Vec<String>>,

    // --- Engine enable flags -------------------------------------------------

    /// Report per-strike Greeks in the result.
    #[serde(default = "default_true")]
    pub enable_greeks: bool,

    /// Gamma exposure.  Computes Greeks internally even when
    /// `enable_greeks` is off.
    #[serde(default = "default_true")]
    pub enable_gex: bool,

    #[serde(default = "default_true")]
    pub enable_alignment: bool,

    #[serde(default = "default_true")]
    pub enable_mood: bool,

    #[serde(default = "default_true")]
    pub enable_smart_money: bool,

    #[serde(default = "default_true")]
    pub enable_swing: bool,

    #[serde(default = "default_true")]
    pub enable_patterns: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            lot_multiplier: default_lot_multiplier(),
            default_iv: default_iv(),
            flat_band_pct: 0.0,
            trend_band_pct: default_trend_band_pct(),
            heavyweight_weights: default_heavyweight_weights(),
            sectors: default_sectors(),
            enable_greeks: true,
            enable_gex: true,
            enable_alignment: true,
            enable_mood: true,
            enable_smart_money: true,
            enable_swing: true,
            enable_patterns: true,
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the analytics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// When set, scheduled cycles are skipped until it is cleared.
    #[serde(default)]
    pub kill_switch: bool,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// JSON file the collector drops a fresh snapshot into.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Samples kept per rolling history (PCR, spot, ATM IV, positioning).
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Cycles in the institutional cash-flow moving average.
    #[serde(default = "default_cash_flow_window")]
    pub cash_flow_window: usize,

    #[serde(default)]
    pub engine: EngineParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            kill_switch: false,
            symbol: default_symbol(),
            cycle_interval_secs: default_cycle_interval_secs(),
            snapshot_path: default_snapshot_path(),
            bind_addr: default_bind_addr(),
            history_capacity: default_history_capacity(),
            cash_flow_window: default_cash_flow_window(),
            engine: EngineParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            kill_switch = config.kill_switch,
            tracked = config.engine.heavyweight_weights.len(),
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` atomically (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `NIFTY_SYMBOL`, `NIFTY_SNAPSHOT_PATH` and `NIFTY_BIND_ADDR`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(symbol) = lookup("NIFTY_SYMBOL").filter(|s| !s.is_empty()) {
            self.symbol = symbol;
        }
        if let Some(path) = lookup("NIFTY_SNAPSHOT_PATH").filter(|s| !s.is_empty()) {
            self.snapshot_path = path;
        }
        if let Some(addr) = lookup("NIFTY_BIND_ADDR").filter(|s| !s.is_empty()) {
            self.bind_addr = addr;
        }
    }
}
