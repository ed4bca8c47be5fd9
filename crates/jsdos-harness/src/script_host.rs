//! Mock Script Host
//!
//! Simulates injecting the runtime script. The runtime entry point appears
//! only once an injection has completed successfully.

use jsdos_core::{RuntimeInfo, ScriptHost};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct HostState {
    injected: Vec<String>,
    path_prefix: Option<String>,
    loaded: bool,
    failure: Option<String>,
}

/// Scriptable script host
#[derive(Debug)]
pub struct MockScriptHost {
    version: String,
    state: Mutex<HostState>,
}

impl Default for MockScriptHost {
    fn default() -> Self {
        Self::new("8.3.3")
    }
}

impl MockScriptHost {
    /// Host that loads a runtime reporting `version`
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            state: Mutex::new(HostState::default()),
        }
    }

    /// Host whose runtime is already present before any injection
    pub fn preloaded(version: impl Into<String>) -> Self {
        let host = Self::new(version);
        host.lock().loaded = true;
        host
    }

    /// Host whose script injections fail with `reason`
    pub fn unreachable(reason: impl Into<String>) -> Self {
        let host = Self::default();
        host.set_failure(Some(reason.into()));
        host
    }

    pub fn set_failure(&self, failure: Option<String>) {
        self.lock().failure = failure;
    }

    /// Sources of every attempted injection, in order
    pub fn injected(&self) -> Vec<String> {
        self.lock().injected.clone()
    }

    pub fn injection_count(&self) -> usize {
        self.lock().injected.len()
    }

    /// Prefix handed to the loaded runtime
    pub fn path_prefix(&self) -> Option<String> {
        self.lock().path_prefix.clone()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl ScriptHost for MockScriptHost {
    fn runtime_entry(&self) -> Option<RuntimeInfo> {
        let state = self.lock();
        state.loaded.then(|| RuntimeInfo {
            version: self.version.clone(),
            path_prefix: state.path_prefix.clone(),
        })
    }

    async fn inject_script(&self, src: &str) -> Result<(), String> {
        self.lock().injected.push(src.to_string());
        debug!("Mock injecting {}", src);

        tokio::task::yield_now().await;

        let mut state = self.lock();
        if let Some(reason) = state.failure.clone() {
            return Err(reason);
        }
        state.loaded = true;
        Ok(())
    }

    fn set_path_prefix(&self, path_prefix: &str) {
        self.lock().path_prefix = Some(path_prefix.to_string());
    }
}
