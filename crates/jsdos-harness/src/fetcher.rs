//! Mock Bundle Fetcher

use jsdos_core::BundleFetcher;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::{sleep, Duration};

#[derive(Debug, Default)]
struct FetcherState {
    bundles: HashMap<String, Vec<u8>>,
    requests: Vec<String>,
    latency: Duration,
}

/// Serves registered bundles; unknown URLs fail with `404`
#[derive(Debug, Default)]
pub struct MockBundleFetcher {
    state: Mutex<FetcherState>,
}

impl MockBundleFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bytes served for `url`
    pub fn with_bundle(self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.lock().bundles.insert(url.into(), data.into());
        self
    }

    /// Delay every fetch by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Every requested URL, in order
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FetcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl BundleFetcher for MockBundleFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let latency = {
            let mut state = self.lock();
            state.requests.push(url.to_string());
            state.latency
        };

        tokio::task::yield_now().await;
        if !latency.is_zero() {
            sleep(latency).await;
        }

        self.lock()
            .bundles
            .get(url)
            .cloned()
            .ok_or_else(|| "404".to_string())
    }
}
