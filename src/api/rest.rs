// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Analytics routes are open; control
// routes (kill switch, engine flags) require the operator Bearer token.
//
// CORS is permissive; the service is meant to sit behind a dashboard.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::OperatorAuth;
use crate::app_state::AppState;
use crate::patterns::{check_failure_scenarios, FailureScenario, FailureWarning, PatternKind};
use crate::pipeline::{AnalysisContext, AnalysisResult};
use crate::snapshot::MarketSnapshot;
use crate::strategy::{calculate_payoff, spot_range, PayoffCurve, StrategyLeg, StrategyMetrics};

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Analytics ───────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/analysis/latest", get(latest_analysis))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/payoff", post(payoff))
        .route("/api/v1/patterns", get(patterns))
        // ── Control (writes need the operator token) ────────────────
        .route("/api/v1/engine-flags", get(get_engine_flags).post(set_engine_flags))
        .route("/api/v1/control/kill", post(control_kill))
        .route("/api/v1/control/resume", post(control_resume))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.build_status();
    Json(serde_json::json!({
        "status": "ok",
        "server_time": chrono::Utc::now().timestamp_millis(),
        "service": status,
    }))
}

// =============================================================================
// Analysis
// =============================================================================

async fn latest_analysis(State(state): State<Arc<AppState>>) -> Response {
    match state.latest_record() {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No analysis cycle has completed yet"),
    }
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    snapshot: MarketSnapshot,
    /// Explicit look-back; the live history is used when absent.
    #[serde(default)]
    context: Option<AnalysisContext>,
    /// Free-text trade idea to check against known failure scenarios.
    #[serde(default)]
    signal: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    result: AnalysisResult,
    warnings: Vec<FailureWarning>,
}

async fn analyze(State(state): State<Arc<AppState>>, Json(req): Json<AnalyzeRequest>) -> Response {
    match state.analyze_adhoc(&req.snapshot, req.context) {
        Ok(result) => {
            let warnings = req
                .signal
                .as_deref()
                .map(|signal| check_failure_scenarios(signal, &result))
                .unwrap_or_default();
            Json(AnalyzeResponse { result, warnings }).into_response()
        }
        Err(e) => {
            warn!(error = %e, "ad-hoc analysis rejected");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}

// =============================================================================
// Strategy payoff
// =============================================================================

#[derive(Deserialize)]
struct RangeSpec {
    low: f64,
    high: f64,
    step: f64,
}

#[derive(Deserialize)]
struct PayoffRequest {
    legs: Vec<StrategyLeg>,
    #[serde(default)]
    spots: Option<Vec<f64>>,
    #[serde(default)]
    range: Option<RangeSpec>,
}

#[derive(Serialize)]
struct PayoffResponse {
    curve: PayoffCurve,
    net_premium: f64,
    metrics: StrategyMetrics,
}

async fn payoff(Json(req): Json<PayoffRequest>) -> Response {
    let spots = match (req.spots, req.range) {
        (Some(spots), _) => spots,
        (None, Some(r)) => match spot_range(r.low, r.high, r.step) {
            Ok(spots) => spots,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        (None, None) => {
            return error_response(StatusCode::BAD_REQUEST, "either spots or range is required")
        }
    };

    let computed = calculate_payoff(&spots, &req.legs)
        .and_then(|(curve, net_premium)| curve.metrics().map(|m| (curve, net_premium, m)));

    match computed {
        Ok((curve, net_premium, metrics)) => Json(PayoffResponse {
            curve,
            net_premium,
            metrics,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

// =============================================================================
// Knowledge base
// =============================================================================

async fn patterns() -> impl IntoResponse {
    let patterns: Vec<serde_json::Value> = PatternKind::ALL
        .into_iter()
        .map(|kind| {
            serde_json::json!({
                "kind": kind,
                "name": kind.name(),
                "meaning": kind.meaning(),
                "action": kind.action(),
                "confidence": kind.confidence(),
            })
        })
        .collect();
    let failures: Vec<FailureWarning> = FailureScenario::ALL
        .into_iter()
        .map(FailureWarning::from)
        .collect();
    Json(serde_json::json!({ "patterns": patterns, "failure_scenarios": failures }))
}

// =============================================================================
// Engine flags (operator)
// =============================================================================

fn flags_json(state: &AppState) -> serde_json::Value {
    let config = state.runtime_config.read();
    serde_json::json!({
        "greeks": config.engine.enable_greeks,
        "gex": config.engine.enable_gex,
        "alignment": config.engine.enable_alignment,
        "mood": config.engine.enable_mood,
        "smart_money": config.engine.enable_smart_money,
        "swing": config.engine.enable_swing,
        "patterns": config.engine.enable_patterns,
        "kill_switch": config.kill_switch,
    })
}

async fn get_engine_flags(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(flags_json(&state))
}

#[derive(Deserialize)]
struct EngineFlagUpdate {
    #[serde(default)]
    greeks: Option<bool>,
    #[serde(default)]
    gex: Option<bool>,
    #[serde(default)]
    alignment: Option<bool>,
    #[serde(default)]
    mood: Option<bool>,
    #[serde(default)]
    smart_money: Option<bool>,
    #[serde(default)]
    swing: Option<bool>,
    #[serde(default)]
    patterns: Option<bool>,
}

async fn set_engine_flags(
    _auth: OperatorAuth,
    State(state): State<Arc<AppState>>,
    Json(update): Json<EngineFlagUpdate>,
) -> impl IntoResponse {
    let mut changes = Vec::new();
    {
        let mut config = state.runtime_config.write();
        let engine = &mut config.engine;

        macro_rules! apply_flag {
            ($update_field:ident, $config_field:ident) => {
                if let Some(val) = update.$update_field {
                    if engine.$config_field != val {
                        changes.push(format!(
                            "{}: {} -> {}",
                            stringify!($update_field),
                            engine.$config_field,
                            val
                        ));
                        engine.$config_field = val;
                    }
                }
            };
        }

        apply_flag!(greeks, enable_greeks);
        apply_flag!(gex, enable_gex);
        apply_flag!(alignment, enable_alignment);
        apply_flag!(mood, enable_mood);
        apply_flag!(smart_money, enable_smart_money);
        apply_flag!(swing, enable_swing);
        apply_flag!(patterns, enable_patterns);
    }

    if !changes.is_empty() {
        info!(changes = ?changes, "engine flags updated");
        state.persist_config();
        state.increment_version();
    }

    let mut body = flags_json(&state);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("changes".to_string(), serde_json::json!(changes));
    }
    Json(body)
}

// =============================================================================
// Kill switch (operator)
// =============================================================================

fn set_kill_switch(state: &AppState, on: bool) -> serde_json::Value {
    state.runtime_config.write().kill_switch = on;
    state.persist_config();
    state.increment_version();
    serde_json::json!({
        "kill_switch": on,
        "message": if on { "Analysis cycles stopped" } else { "Analysis cycles resumed" },
    })
}

async fn control_kill(_auth: OperatorAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    warn!("kill switch ENGAGED via API");
    Json(set_kill_switch(&state, true))
}

async fn control_resume(_auth: OperatorAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("kill switch released via API");
    Json(set_kill_switch(&state, false))
}
