// src/config/mod.rs
//! Service configuration.
//!
//! Resolution order:
//! 1) `$WIRE_DIGEST_CONFIG` (must exist when set)
//! 2) `config/wire_digest.toml`
//! 3) built-in defaults
//!
//! Then single-value env overrides are applied and out-of-range values are
//! clamped back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::aggregate::{ChannelInfo, PipelineSettings};
use crate::categories::{CategoryMapping, CategoryRule};
use crate::sanitize::SanitizerConfig;
use crate::scrape::limiter::LimiterConfig;

pub const ENV_CONFIG_PATH: &str = "WIRE_DIGEST_CONFIG";
pub const ENV_FEED_URL: &str = "WIRE_DIGEST_FEED_URL";
pub const ENV_REFRESH_HOURS: &str = "WIRE_DIGEST_REFRESH_HOURS";
pub const ENV_MAX_ITEMS: &str = "WIRE_DIGEST_MAX_ITEMS";
pub const DEFAULT_CONFIG_PATH: &str = "config/wire_digest.toml";

const DEFAULT_MAX_ITEMS: usize = 40;
const DEFAULT_REFRESH_HOURS: u64 = 4;
const DEFAULT_ARTICLE_TTL_DAYS: u64 = 7;
const MAX_REFRESH_HOURS: u64 = 24 * 365;
const MAX_ARTICLE_TTL_DAYS: u64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed_url: String,
    pub max_items: usize,
    pub refresh_hours: u64,
    pub article_ttl_days: u64,
    pub feed_timeout_secs: u64,
    pub article_timeout_secs: u64,
    pub user_agent: String,
    pub excluded_topics: Vec<String>,
    pub site_link: String,
    pub site_language: String,
    pub public_base_url: String,
    pub sanitizer: SanitizerConfig,
    pub limiter: LimiterConfig,
    /// Replaces the built-in mapping table when present.
    pub categories: Option<Vec<CategoryRule>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let channel = ChannelInfo::default();
        Self {
            feed_url: "https://sc.bns.lt/rss".to_string(),
            max_items: DEFAULT_MAX_ITEMS,
            refresh_hours: DEFAULT_REFRESH_HOURS,
            article_ttl_days: DEFAULT_ARTICLE_TTL_DAYS,
            feed_timeout_secs: 15,
            article_timeout_secs: 30,
            user_agent: "wire-digest/0.1".to_string(),
            excluded_topics: default_excluded_topics(),
            site_link: channel.site_link,
            site_language: channel.language,
            public_base_url: channel.public_base_url,
            sanitizer: SanitizerConfig::default(),
            limiter: LimiterConfig::default(),
            categories: None,
        }
    }
}

fn default_excluded_topics() -> Vec<String> {
    [
        "Visi pranešimai",
        "Apklaus",
        "Teisės akt",
        "Saugumas",
        "Spaudos konferencij",
        "Komunikacij",
        "Jaunim",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl AppConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Env path, then the default file, then defaults; env overrides and
    /// clamping applied last.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };

        cfg.apply_env_overrides();
        cfg.clamp();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(ENV_FEED_URL) {
            if !v.trim().is_empty() {
                self.feed_url = v.trim().to_string();
            }
        }
        if let Some(v) = env_number::<u64>(ENV_REFRESH_HOURS) {
            self.refresh_hours = v;
        }
        if let Some(v) = env_number::<usize>(ENV_MAX_ITEMS) {
            self.max_items = v;
        }
    }

    fn clamp(&mut self) {
        if self.max_items == 0 {
            warn!(max_items = self.max_items, "invalid max_items, using default");
            self.max_items = DEFAULT_MAX_ITEMS;
        }
        if self.refresh_hours == 0 {
            warn!("refresh_hours must be positive, using default");
            self.refresh_hours = DEFAULT_REFRESH_HOURS;
        }
        if self.article_ttl_days == 0 {
            warn!("article_ttl_days must be positive, using default");
            self.article_ttl_days = DEFAULT_ARTICLE_TTL_DAYS;
        }
        if self.refresh_hours > MAX_REFRESH_HOURS {
            warn!(
                refresh_hours = self.refresh_hours,
                max = MAX_REFRESH_HOURS,
                "refresh_hours too large, capping"
            );
            self.refresh_hours = MAX_REFRESH_HOURS;
        }
        if self.article_ttl_days > MAX_ARTICLE_TTL_DAYS {
            warn!(
                article_ttl_days = self.article_ttl_days,
                max = MAX_ARTICLE_TTL_DAYS,
                "article_ttl_days too large, capping"
            );
            self.article_ttl_days = MAX_ARTICLE_TTL_DAYS;
        }
        if self.limiter.max_concurrent == 0 {
            warn!("limiter.max_concurrent must be positive, using default");
            self.limiter.max_concurrent = LimiterConfig::default().max_concurrent;
        }
        if self.feed_timeout_secs == 0 {
            self.feed_timeout_secs = 15;
        }
        if self.article_timeout_secs == 0 {
            self.article_timeout_secs = 30;
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_hours.saturating_mul(3600))
    }

    pub fn article_ttl(&self) -> Duration {
        Duration::from_secs(self.article_ttl_days.saturating_mul(24 * 3600))
    }

    pub fn mapping(&self) -> CategoryMapping {
        match &self.categories {
            Some(rules) if !rules.is_empty() => CategoryMapping::from_rules(rules.clone()),
            _ => CategoryMapping::default_seed(),
        }
    }

    pub fn channel(&self) -> ChannelInfo {
        ChannelInfo {
            site_link: self.site_link.clone(),
            language: self.site_language.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }

    /// Rendered documents live exactly one refresh interval.
    pub fn pipeline(&self) -> PipelineSettings {
        PipelineSettings {
            feed_url: self.feed_url.clone(),
            max_items: self.max_items,
            excluded_topics: self.excluded_topics.clone(),
            feed_ttl: self.refresh_interval(),
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric env override");
            None
        }
    }
}
