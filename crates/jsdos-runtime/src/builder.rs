//! Session Builder API
//!
//! Assembles a `SessionController` from configuration, durable storage, the
//! host's script loader and optional host resources.

use crate::bridge::{EventCallback, HostOptions, ResourceBridge};
use crate::controller::SessionController;
use crate::gateway::EventGateway;
use crate::loader::RuntimeLoader;
use crate::store::Store;
use jsdos_core::{
    Cache, CacheNoop, DosConfig, DosResult, KeyValueStorage, MemoryStorage, MountNode, ScriptHost,
};
use std::sync::Arc;
use tracing::info;

// ----------------------------------------------------------------------------
// Session Builder
// ----------------------------------------------------------------------------

/// Builder for a player session
pub struct SessionBuilder {
    config: DosConfig,
    script_host: Arc<dyn ScriptHost>,
    storage: Arc<dyn KeyValueStorage>,
    cache: Arc<dyn Cache>,
    options: HostOptions,
    root: Option<MountNode>,
}

impl SessionBuilder {
    /// Create a builder around the host's script loader
    pub fn new(script_host: Arc<dyn ScriptHost>) -> Self {
        Self {
            config: DosConfig::default(),
            script_host,
            storage: Arc::new(MemoryStorage::new()),
            cache: Arc::new(CacheNoop),
            options: HostOptions::default(),
            root: None,
        }
    }

    /// Set the session configuration
    pub fn with_config(mut self, config: DosConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the durable storage run options are read from and written to
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Set the bundle content cache
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the host options
    pub fn with_options(mut self, options: HostOptions) -> Self {
        self.options = options;
        self
    }

    /// Forward runtime events to `callback`
    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.options.on_event = Some(callback);
        self
    }

    /// Bind the mount node at build time
    pub fn mount(mut self, node: MountNode) -> Self {
        self.root = Some(node);
        self
    }

    /// Build the session; must be called inside a tokio runtime
    pub fn build(self) -> DosResult<SessionController> {
        self.config.validate()?;
        info!("Building js-dos session from {}", self.config.path_prefix);

        let bridge = Arc::new(ResourceBridge::with_cache(self.cache));
        bridge.set_options(self.options)?;
        if let Some(node) = self.root {
            bridge.bind_root(node)?;
        }

        let store = Store::new(
            self.storage,
            Arc::clone(&bridge),
            self.config.audit_capacity,
        );
        let gateway = EventGateway::spawn(bridge, self.config.event_delay())?;
        let loader = RuntimeLoader::new(self.script_host);

        Ok(SessionController::from_parts(
            self.config,
            store,
            loader,
            gateway,
        ))
    }
}
