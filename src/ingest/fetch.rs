// src/ingest/fetch.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// "Fetch URL → text" seam. Production uses [`HttpFetcher`]; tests plug in
/// fixture-backed fetchers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Client with a hard per-request timeout and an optional user agent.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout);
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua.to_string());
        }
        let client = builder.build().context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?;
        resp.text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }
}

/// Fixture-backed fetcher for unit tests: serves bodies by URL and counts
/// calls. Unregistered URLs fail.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StubFetcher {
    bodies: std::collections::HashMap<String, std::result::Result<String, String>>,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl StubFetcher {
    pub(crate) fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub(crate) fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.bodies.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.iter().filter(|u| u.as_str() == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.bodies.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(anyhow::anyhow!("GET {url}: {msg}")),
            None => Err(anyhow::anyhow!("GET {url}: no such fixture")),
        }
    }
}
