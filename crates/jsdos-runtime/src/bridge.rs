//! Resource Bridge
//!
//! Holds the runtime objects that must never enter the serializable session:
//! the mount node, the live command interface, the decoded bundle, the content
//! cache and host options carrying callbacks. One bridge exists per running
//! session; it is created by the session builder and injected into every
//! collaborator that needs a handle.
//!
//! The command interface handle is only changed by the store, under the same
//! lock that flips the session's `ci` flag, so the two always agree.

use jsdos_core::{
    BridgeError, Cache, CacheNoop, CommandInterface, DosEvent, LoadedBundle, MountNode,
};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error};

/// Host callback receiving forwarded runtime events
pub type EventCallback = Arc<dyn Fn(DosEvent, Option<Arc<dyn CommandInterface>>) + Send + Sync>;

// ----------------------------------------------------------------------------
// Host Options
// ----------------------------------------------------------------------------

/// Host configuration that carries function references
#[derive(Clone, Default)]
pub struct HostOptions {
    pub on_event: Option<EventCallback>,
}

impl HostOptions {
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }
}

impl fmt::Debug for HostOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostOptions")
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Resource Bridge
// ----------------------------------------------------------------------------

struct BridgeState {
    root: Option<MountNode>,
    loaded_bundle: Option<Arc<LoadedBundle>>,
    ci: Option<Arc<dyn CommandInterface>>,
    ci_generation: u64,
    cache: Arc<dyn Cache>,
    options: HostOptions,
    torn_down: bool,
}

/// Owner of the non-serializable runtime handles
pub struct ResourceBridge {
    state: RwLock<BridgeState>,
}

impl Default for ResourceBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBridge {
    /// Create a bridge with a no-op cache and no options
    pub fn new() -> Self {
        Self::with_cache(Arc::new(CacheNoop))
    }

    /// Create a bridge with a specific content cache
    pub fn with_cache(cache: Arc<dyn Cache>) -> Self {
        Self {
            state: RwLock::new(BridgeState {
                root: None,
                loaded_bundle: None,
                ci: None,
                ci_generation: 0,
                cache,
                options: HostOptions::default(),
                torn_down: false,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BridgeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BridgeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_live(&self) -> Result<RwLockWriteGuard<'_, BridgeState>, BridgeError> {
        let state = self.write();
        if state.torn_down {
            return Err(BridgeError::TornDown);
        }
        Ok(state)
    }

    /// Bind the mount node; it can be bound exactly once
    pub fn bind_root(&self, node: MountNode) -> Result<(), BridgeError> {
        let mut state = self.write_live()?;
        if let Some(existing) = &state.root {
            // The runtime may hold direct references to the bound node
            error!("Refusing to rebind mount node {} to {}", existing, node);
            return Err(BridgeError::RootAlreadyBound {
                existing: existing.to_string(),
            });
        }
        debug!("Mount node bound to {}", node);
        state.root = Some(node);
        Ok(())
    }

    pub fn root(&self) -> Option<MountNode> {
        self.read().root.clone()
    }

    /// Replace the loaded bundle, returning the superseded one
    pub fn set_loaded_bundle(
        &self,
        bundle: LoadedBundle,
    ) -> Result<Option<Arc<LoadedBundle>>, BridgeError> {
        let mut state = self.write_live()?;
        Ok(state.loaded_bundle.replace(Arc::new(bundle)))
    }

    pub fn loaded_bundle(&self) -> Option<Arc<LoadedBundle>> {
        self.read().loaded_bundle.clone()
    }

    /// Live command interface, if a bundle is ready
    pub fn ci(&self) -> Option<Arc<dyn CommandInterface>> {
        self.read().ci.clone()
    }

    pub fn has_ci(&self) -> bool {
        self.read().ci.is_some()
    }

    /// Bumped every time the command interface handle changes
    pub fn ci_generation(&self) -> u64 {
        self.read().ci_generation
    }

    pub(crate) fn bind_ci(&self, ci: Arc<dyn CommandInterface>) -> Result<u64, BridgeError> {
        let mut state = self.write_live()?;
        state.ci = Some(ci);
        state.ci_generation += 1;
        Ok(state.ci_generation)
    }

    pub(crate) fn release_ci(&self) -> Option<Arc<dyn CommandInterface>> {
        let mut state = self.write();
        let released = state.ci.take();
        if released.is_some() {
            state.ci_generation += 1;
        }
        released
    }

    pub fn cache(&self) -> Arc<dyn Cache> {
        Arc::clone(&self.read().cache)
    }

    pub fn set_cache(&self, cache: Arc<dyn Cache>) -> Result<(), BridgeError> {
        self.write_live()?.cache = cache;
        Ok(())
    }

    pub fn options(&self) -> HostOptions {
        self.read().options.clone()
    }

    pub fn set_options(&self, options: HostOptions) -> Result<(), BridgeError> {
        self.write_live()?.options = options;
        Ok(())
    }

    /// Currently configured host event callback
    pub fn event_callback(&self) -> Option<EventCallback> {
        self.read().options.on_event.clone()
    }

    /// Release the command interface and the loaded bundle
    ///
    /// The bridge refuses further writes until `reinitialize` is called.
    pub(crate) fn teardown(&self) -> Option<Arc<dyn CommandInterface>> {
        let mut state = self.write();
        let released = state.ci.take();
        if released.is_some() {
            state.ci_generation += 1;
        }
        state.loaded_bundle = None;
        state.torn_down = true;
        debug!("Resource bridge torn down");
        released
    }

    /// Accept writes again after a teardown; the mount node stays bound
    pub fn reinitialize(&self) {
        self.write().torn_down = false;
    }

    pub fn is_torn_down(&self) -> bool {
        self.read().torn_down
    }
}

impl fmt::Debug for ResourceBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("ResourceBridge")
            .field("root", &state.root)
            .field("loaded_bundle", &state.loaded_bundle.as_ref().map(|b| b.size()))
            .field("ci", &state.ci.is_some())
            .field("ci_generation", &state.ci_generation)
            .field("options", &state.options)
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
