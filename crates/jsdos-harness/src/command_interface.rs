//! Mock Command Interface
//!
//! Records every peering call and resolves connects after yielding to the
//! scheduler, so concurrent callers genuinely interleave.

use jsdos_core::{CommandInterface, NetworkType};
use std::sync::{Mutex, PoisonError};
use tokio::time::{sleep, Duration};
use tracing::debug;

/// One recorded `network_connect` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    pub network_type: NetworkType,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Default)]
struct MockState {
    connects: Vec<ConnectCall>,
    disconnects: Vec<NetworkType>,
    failure: Option<String>,
    latency: Duration,
}

/// Scriptable command interface
#[derive(Debug, Default)]
pub struct MockCommandInterface {
    state: Mutex<MockState>,
}

impl MockCommandInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command interface whose connects are rejected with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.set_failure(Some(reason.into()));
        mock
    }

    /// Delay every connect by `latency` after the initial yield
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    pub fn set_failure(&self, failure: Option<String>) {
        self.lock().failure = failure;
    }

    pub fn connects(&self) -> Vec<ConnectCall> {
        self.lock().connects.clone()
    }

    pub fn disconnects(&self) -> Vec<NetworkType> {
        self.lock().disconnects.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl CommandInterface for MockCommandInterface {
    async fn network_connect(
        &self,
        network_type: NetworkType,
        address: &str,
        port: u16,
    ) -> Result<(), String> {
        let latency = {
            let mut state = self.lock();
            state.connects.push(ConnectCall {
                network_type,
                address: address.to_string(),
                port,
            });
            state.latency
        };
        debug!("Mock connect to {}", address);

        tokio::task::yield_now().await;
        if !latency.is_zero() {
            sleep(latency).await;
        }

        match self.lock().failure.clone() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    fn network_disconnect(&self, network_type: NetworkType) {
        self.lock().disconnects.push(network_type);
    }
}
