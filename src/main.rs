// =============================================================================
// Nifty Analytics: Main Entry Point
// =============================================================================
//
// Loads config, starts the REST API, then runs one analysis cycle per
// `cycle_interval_secs` against the snapshot file the feed writer maintains.
// A bad or missing snapshot skips that cycle; the loop keeps going.
// =============================================================================

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nifty_analytics::api;
use nifty_analytics::app_state::AppState;
use nifty_analytics::runtime_config::{RuntimeConfig, DEFAULT_CONFIG_PATH};
use nifty_analytics::snapshot::MarketSnapshot;

fn load_snapshot(path: &Path) -> anyhow::Result<MarketSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Nifty Analytics starting up");

    let mut config = RuntimeConfig::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    let bind_addr = config.bind_addr.clone();
    let interval_secs = config.cycle_interval_secs.max(1);

    info!(
        symbol = %config.symbol,
        snapshot = %config.snapshot_path,
        interval_secs,
        "Configuration ready"
    );

    // ── 2. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config).with_config_path(DEFAULT_CONFIG_PATH));

    // ── 3. Start the API server ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 4. Analysis loop ─────────────────────────────────────────────────
    let cycle_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;

            let (symbol, snapshot_path) = {
                let config = cycle_state.runtime_config.read();
                (config.symbol.clone(), config.snapshot_path.clone())
            };

            let snapshot = match load_snapshot(Path::new(&snapshot_path)) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = format!("{e:#}"), "Snapshot unavailable, cycle skipped");
                    cycle_state.push_error_with_code(format!("{e:#}"), Some("snapshot_io".into()));
                    continue;
                }
            };

            if snapshot.symbol != symbol {
                warn!(
                    expected = %symbol,
                    got = %snapshot.symbol,
                    "Snapshot symbol mismatch, cycle skipped"
                );
                continue;
            }

            // run_cycle logs and records its own failures.
            let _ = cycle_state.run_cycle(&snapshot);
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    if let Err(e) = state.runtime_config.read().save(DEFAULT_CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Nifty Analytics shut down complete.");
    Ok(())
}
