// src/scheduler.rs
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::aggregate::Aggregator;

/// Process-wide refresh bookkeeping read by `/health`.
#[derive(Debug)]
pub struct HealthState {
    started_at: DateTime<Utc>,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            last_refresh: RwLock::new(None),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        match self.last_refresh.read() {
            Ok(g) => *g,
            Err(poison) => *poison.into_inner(),
        }
    }

    pub fn mark_refreshed(&self, at: DateTime<Utc>) {
        match self.last_refresh.write() {
            Ok(mut g) => *g = Some(at),
            Err(poison) => *poison.into_inner() = Some(at),
        }
    }
}

/// One refresh pass over every category, in table order. Expired cache
/// entries are dropped first.
///
/// The first failing category aborts the pass; categories after it keep
/// their previous cache entry. The refresh timestamp moves only when every
/// category was rebuilt.
pub async fn run_tick(aggregator: &Aggregator, health: &HealthState) -> Result<usize> {
    let purged = aggregator.purge_expired();
    if purged > 0 {
        debug!(target: "scheduler", purged, "expired cache entries dropped");
    }

    let categories = aggregator.categories();
    for category in &categories {
        if let Err(e) = aggregator.refresh_category(category).await {
            return Err(e.context(format!("refreshing category '{category}'")));
        }
    }

    let now = Utc::now();
    health.mark_refreshed(now);
    gauge!("refresh_last_run_ts").set(now.timestamp().max(0) as f64);
    Ok(categories.len())
}

/// Spawn the refresh loop: tick immediately, then every `interval`.
/// Tick failures are logged and never stop the loop.
pub fn spawn_refresh_loop(
    aggregator: Arc<Aggregator>,
    health: Arc<HealthState>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            counter!("refresh_ticks_total").increment(1);
            match run_tick(&aggregator, &health).await {
                Ok(n) => info!(target: "scheduler", categories = n, "refresh tick complete"),
                Err(e) => {
                    counter!("refresh_errors_total").increment(1);
                    error!(target: "scheduler", error = ?e, "refresh tick failed");
                }
            }
            tokio::time::sleep(interval).await;
        }
    })
}
