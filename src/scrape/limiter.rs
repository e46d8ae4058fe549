// src/scrape/limiter.rs
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub max_concurrent: usize,
    pub min_spacing_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            min_spacing_ms: 500,
        }
    }
}

/// Admission gate for outbound article fetches.
/// - At most `max_concurrent` holders at a time.
/// - Successive fetch starts are at least `min_spacing` apart. The spacing
///   check runs while holding a slot, so starts are effectively serialized.
#[derive(Debug)]
pub struct RateLimiter {
    gate: Semaphore,
    last_start: Mutex<Option<Instant>>,
    min_spacing: Duration,
}

impl RateLimiter {
    pub fn new(cfg: LimiterConfig) -> Self {
        Self {
            gate: Semaphore::new(cfg.max_concurrent.max(1)),
            last_start: Mutex::new(None),
            min_spacing: Duration::from_millis(cfg.min_spacing_ms),
        }
    }

    /// Wait for a slot and for the spacing window, then mark a fetch start.
    /// The returned permit must be held for the duration of the fetch.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        let permit = self.gate.acquire().await.context("rate limiter closed")?;

        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_spacing {
                sleep(self.min_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());

        Ok(permit)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}
