// =============================================================================
// Central Application State: analytics orchestrator
// =============================================================================
//
// Owns everything that lives across cycles: runtime config, rolling history,
// the latest cycle record and a bounded error log.  The numeric core never
// sees any of it except through the AnalysisContext handed to each cycle.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared data.
//   - Locks are never held across the pipeline call.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::history::MarketHistory;
use crate::pipeline::{self, AnalysisContext, AnalysisResult};
use crate::runtime_config::RuntimeConfig;
use crate::snapshot::MarketSnapshot;

// =============================================================================
// Records
// =============================================================================

/// A recorded error event for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Optional machine-readable code (e.g. `invalid_snapshot`).
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// One completed analysis cycle, stamped for audit.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    /// UUID v4.
    pub id: String,
    pub symbol: String,
    /// ISO 8601 timestamp of completion.
    pub created_at: String,
    pub elapsed_us: u64,
    pub result: AnalysisResult,
}

impl CycleRecord {
    pub fn new(result: AnalysisResult, elapsed_us: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: result.symbol.clone(),
            created_at: Utc::now().to_rfc3339(),
            elapsed_us,
            result,
        }
    }
}

/// Service status for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub state_version: u64,
    pub uptime_secs: u64,
    pub cycles_completed: u64,
    pub kill_switch: bool,
    pub symbol: String,
    pub last_cycle_at: Option<String>,
    pub recent_errors: Vec<ErrorRecord>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Shared across the cycle loop and the API via `Arc<AppState>`.
pub struct AppState {
    /// Bumped on every meaningful mutation.
    pub state_version: AtomicU64,
    pub cycles_completed: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    /// Where config changes made through the API are persisted, if anywhere.
    pub config_path: Option<PathBuf>,

    pub history: RwLock<MarketHistory>,
    pub latest: RwLock<Option<CycleRecord>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        let history = MarketHistory::new(config.history_capacity, config.cash_flow_window);
        Self {
            state_version: AtomicU64::new(1),
            cycles_completed: AtomicU64::new(0),
            runtime_config: Arc::new(RwLock::new(config)),
            config_path: None,
            history: RwLock::new(history),
            latest: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    pub fn push_error(&self, msg: String) {
        self.push_error_with_code(msg, None);
    }

    /// Record an error; the log keeps the newest [`MAX_RECENT_ERRORS`].
    pub fn push_error_with_code(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Cycles ──────────────────────────────────────────────────────────

    /// Run one scheduled cycle and fold it into history.
    ///
    /// Returns `Ok(None)` when the kill switch is set.  A failed cycle is
    /// logged to the error ring and leaves history untouched.
    pub fn run_cycle(&self, snapshot: &MarketSnapshot) -> Result<Option<CycleRecord>> {
        let (kill_switch, params) = {
            let config = self.runtime_config.read();
            (config.kill_switch, config.engine.clone())
        };
        if kill_switch {
            warn!(symbol = %snapshot.symbol, "kill switch active, cycle skipped");
            return Ok(None);
        }

        let context = self.history.read().context();
        let started = std::time::Instant::now();

        let result = match pipeline::analyze(snapshot, &params, &context) {
            Ok(result) => result,
            Err(e) => {
                warn!(symbol = %snapshot.symbol, error = %e, "analysis cycle failed");
                self.push_error_with_code(e.to_string(), Some("invalid_snapshot".to_string()));
                return Err(e);
            }
        };

        self.history.write().record(snapshot, &result);
        let record = CycleRecord::new(result, started.elapsed().as_micros() as u64);
        *self.latest.write() = Some(record.clone());
        let cycles = self.cycles_completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.increment_version();

        info!(
            id = %record.id,
            symbol = %record.symbol,
            cycles,
            elapsed_us = record.elapsed_us,
            "analysis cycle recorded"
        );

        Ok(Some(record))
    }

    /// Analyse without touching history or the latest record.  Uses the
    /// live history as look-back unless `context` is given.
    pub fn analyze_adhoc(
        &self,
        snapshot: &MarketSnapshot,
        context: Option<AnalysisContext>,
    ) -> Result<AnalysisResult> {
        let params = self.runtime_config.read().engine.clone();
        let context = context.unwrap_or_else(|| self.history.read().context());
        pipeline::analyze(snapshot, &params, &context)
    }

    pub fn latest_record(&self) -> Option<CycleRecord> {
        self.latest.read().clone()
    }

    /// Persist the config to `config_path`, if one is set.  Best effort.
    pub fn persist_config(&self) {
        let Some(path) = self.config_path.as_ref() else {
            return;
        };
        let config = self.runtime_config.read().clone();
        if let Err(e) = config.save(path) {
            warn!(error = %e, "failed to persist runtime config");
        }
    }

    pub fn build_status(&self) -> ServiceStatus {
        let (kill_switch, symbol) = {
            let config = self.runtime_config.read();
            (config.kill_switch, config.symbol.clone())
        };
        ServiceStatus {
            state_version: self.current_state_version(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            cycles_completed: self.cycles_completed.load(Ordering::SeqCst),
            kill_switch,
            symbol,
            last_cycle_at: self.latest.read().as_ref().map(|r| r.created_at.clone()),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::pipeline::tests::sample_snapshot;

    #[test]
    fn cycle_records_history_and_latest() {
        let state = AppState::new(RuntimeConfig::default());
        let v0 = state.current_state_version();

        let record = state.run_cycle(&sample_snapshot()).unwrap().unwrap();
        assert_eq!(record.symbol, "NIFTY");
        assert_eq!(record.id.len(), 36);
        assert_eq!(state.cycles_completed.load(Ordering::SeqCst), 1);
        assert!(state.current_state_version() > v0);
        assert_eq!(state.latest_record().map(|r| r.id), Some(record.id));

        let ctx = state.history.read().context();
        assert_eq!(ctx.spot_history, vec![24_500.0]);
        assert_eq!(ctx.cash_flow_history, vec![1_600.0]);
        assert_eq!(ctx.previous_total_oi, Some(1_070_000));
    }

    #[test]
    fn second_cycle_sees_first() {
        let state = AppState::new(RuntimeConfig::default());
        state.run_cycle(&sample_snapshot()).unwrap();

        let mut next = sample_snapshot();
        next.spot_price = 24_600.0;
        let record = state.run_cycle(&next).unwrap().unwrap();
        assert_eq!(
            record.result.buildup,
            crate::open_interest::OIBuildup::Neutral,
            "same OI, price up"
        );
        assert_eq!(state.history.read().spot.len(), 2);
    }

    #[test]
    fn kill_switch_skips_cycle() {
        let mut config = RuntimeConfig::default();
        config.kill_switch = true;
        let state = AppState::new(config);
        assert!(state.run_cycle(&sample_snapshot()).unwrap().is_none());
        assert!(state.latest_record().is_none());
        assert!(state.history.read().spot.is_empty());
    }

    #[test]
    fn failed_cycle_is_logged_and_skipped() {
        let state = AppState::new(RuntimeConfig::default());
        let mut bad = sample_snapshot();
        bad.time_to_expiry = f64::NAN;

        assert!(matches!(
            state.run_cycle(&bad),
            Err(AnalysisError::InvalidTimeToExpiry(_))
        ));
        assert!(state.latest_record().is_none());
        let status = state.build_status();
        assert_eq!(status.recent_errors.len(), 1);
        assert_eq!(status.recent_errors[0].code.as_deref(), Some("invalid_snapshot"));
        assert_eq!(status.cycles_completed, 0);
    }

    #[test]
    fn error_log_is_bounded() {
        let state = AppState::new(RuntimeConfig::default());
        for i in 0..(MAX_RECENT_ERRORS + 10) {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "error 10");
    }

    #[test]
    fn adhoc_analysis_leaves_state_alone() {
        let state = AppState::new(RuntimeConfig::default());
        let result = state.analyze_adhoc(&sample_snapshot(), None).unwrap();
        assert_eq!(result.symbol, "NIFTY");
        assert!(state.latest_record().is_none());
        assert!(state.history.read().pcr.is_empty());
    }
}
