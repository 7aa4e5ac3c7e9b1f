//! Test double for [`Fetcher`]

use crate::cache::fetch::Fetcher;
use crate::cache::key::CacheKey;
use crate::error::{StashError, StashResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Writes the URL as file content and counts calls per key
#[derive(Debug, Default)]
pub struct CountingFetcher {
    calls: Mutex<HashMap<String, usize>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make fetches of `url` fail
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls_for(&self, key: &CacheKey) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(key.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, key: &CacheKey, dest: &Path) -> StashResult<u64> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(key.as_str().to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(key.as_str()) {
            return Err(StashError::fetch(key.as_str(), "connection refused"));
        }

        tokio::fs::write(dest, key.as_str())
            .await
            .map_err(|e| StashError::io(format!("writing {}", dest.display()), e))?;
        Ok(key.as_str().len() as u64)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
