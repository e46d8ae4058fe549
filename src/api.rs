use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::aggregate::Aggregator;
use crate::metrics::Metrics;
use crate::scheduler::HealthState;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub health: Arc<HealthState>,
}

/// `/health`, one `/{category}` route per output category, and `/metrics`
/// when a recorder is installed.
pub fn create_router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/{category}", get(category_feed))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => router.merge(m.router()),
        None => router,
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthOut {
    status: u16,
    cached_feed: bool,
    last_refresh_utc: Option<DateTime<Utc>>,
    uptime_utc: DateTime<Utc>,
    started_utc: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: StatusCode::OK.as_u16(),
        cached_feed: state.aggregator.has_cached_feed(),
        last_refresh_utc: state.health.last_refresh(),
        uptime_utc: Utc::now(),
        started_utc: state.health.started_at(),
    })
}

async fn category_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let Some(category) = state.aggregator.mapping().find_by_slug(&slug) else {
        return (StatusCode::NOT_FOUND, "unknown category").into_response();
    };

    match state.aggregator.cached_feed(&category).await {
        Ok(xml) => ([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response(),
        Err(e) => {
            warn!(category = %category, error = ?e, "feed build failed");
            (StatusCode::BAD_GATEWAY, "feed temporarily unavailable").into_response()
        }
    }
}
