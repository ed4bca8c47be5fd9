//! Runtime Loader
//!
//! Loads the emulation runtime script at most once. Concurrent callers share
//! the single in-flight load; once the runtime entry point exists every call
//! resolves immediately. A failed load is forgotten so an explicit retry can
//! inject the script again.

use futures::future::{BoxFuture, FutureExt, Shared};
use jsdos_core::{runtime_script_src, LoaderError, RuntimeInfo, ScriptHost};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

type LoadResult = Result<RuntimeInfo, LoaderError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Idempotent loader of the runtime script
pub struct RuntimeLoader {
    host: Arc<dyn ScriptHost>,
    in_flight: Mutex<Option<SharedLoad>>,
}

impl RuntimeLoader {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            in_flight: Mutex::new(None),
        }
    }

    /// Make sure the runtime is loaded from `path_prefix`
    ///
    /// While a load is in flight, later callers join it regardless of the
    /// prefix they pass.
    pub async fn ensure_loaded(&self, path_prefix: &str) -> LoadResult {
        if let Some(runtime) = self.host.runtime_entry() {
            debug!("Runtime {} already present", runtime.version);
            return Ok(runtime);
        }

        let load = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.as_ref() {
                Some(load) => {
                    debug!("Joining in-flight runtime load");
                    load.clone()
                }
                None => {
                    let load = load_runtime(Arc::clone(&self.host), path_prefix.to_string())
                        .boxed()
                        .shared();
                    *in_flight = Some(load.clone());
                    load
                }
            }
        };

        let result = load.await;
        if result.is_err() {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight
                .as_ref()
                .is_some_and(|load| matches!(load.peek(), Some(Err(_))))
            {
                *in_flight = None;
            }
        }
        result
    }

    /// Whether the runtime entry point is present in the host
    pub fn is_loaded(&self) -> bool {
        self.host.runtime_entry().is_some()
    }
}

impl fmt::Debug for RuntimeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RuntimeLoader")
            .field("loaded", &self.is_loaded())
            .field("in_flight", &in_flight.is_some())
            .finish()
    }
}

async fn load_runtime(host: Arc<dyn ScriptHost>, path_prefix: String) -> LoadResult {
    let src = runtime_script_src(&path_prefix);
    info!("Loading runtime from {}", src);

    if let Err(reason) = host.inject_script(&src).await {
        warn!("Script {} failed to load: {}", src, reason);
        return Err(LoaderError::ScriptUnavailable { src, reason });
    }

    host.set_path_prefix(&path_prefix);
    let runtime = host
        .runtime_entry()
        .ok_or_else(|| LoaderError::EntryMissing { src: src.clone() })?;

    info!("Runtime {} loaded from {}", runtime.version, src);
    Ok(runtime)
}
