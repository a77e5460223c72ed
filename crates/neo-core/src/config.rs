use crate::ingest::IngestOptions;
use crate::retry::RetryPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://api.nasa.gov/neo/rest/v1/feed";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Tunables for a run. Every key is optional in the JSON file; a retry
/// policy, when present, must be given in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub feed_url: String,
    pub request_timeout_secs: u64,
    pub fetch: RetryPolicy,
    pub upload: RetryPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fetch: RetryPolicy::fetch_default(),
            upload: RetryPolicy::upload_default(),
        }
    }
}

impl IngestConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = serde_json::from_str(&data).context("parse config")?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ingest_options(&self, container: &str) -> IngestOptions {
        IngestOptions {
            feed_url: self.feed_url.clone(),
            container: container.to_string(),
            fetch_policy: self.fetch,
            upload_policy: self.upload,
        }
    }
}
