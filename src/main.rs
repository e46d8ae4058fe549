//! wire-digest binary entrypoint.
//! Loads config, starts the refresh loop and serves the Axum router.

use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wire_digest::config::AppConfig;
use wire_digest::metrics::Metrics;
use wire_digest::scheduler::spawn_refresh_loop;
use wire_digest::{build_http_state, create_router};

/// Compact logs filtered by `RUST_LOG`. The runtime may already own a
/// global subscriber; in that case this is a no-op.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wire_digest=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    info!(
        feed_url = %cfg.feed_url,
        max_items = cfg.max_items,
        refresh_hours = cfg.refresh_hours,
        "config loaded"
    );

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let state = build_http_state(&cfg)?;
    let _refresh = spawn_refresh_loop(
        state.aggregator.clone(),
        state.health.clone(),
        cfg.refresh_interval(),
    );

    let router = create_router(state, metrics.as_ref());
    Ok(router.into())
}
