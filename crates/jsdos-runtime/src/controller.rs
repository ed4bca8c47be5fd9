//! Session Controller
//!
//! Top-level owner of one player session: the resource bridge, the store and
//! every collaborator wired to them. Exposes the async lifecycle operations
//! (runtime init, bundle load, readiness, play, peering) and the synchronous
//! run-option mutators.

use crate::bridge::{HostOptions, ResourceBridge};
use crate::connector::NetworkConnector;
use crate::gateway::EventGateway;
use crate::loader::RuntimeLoader;
use crate::store::Store;
use jsdos_core::{
    Action, AuditEntry, Backend, BundleConfig, BundleError, BundleFetcher, CommandInterface,
    DosConfig, DosError, DosEvent, DosResult, EmulatorStats, LoadedBundle, MountNode,
    RenderAspect, RenderBackend, RuntimeInfo, Session, StateTransitionError, Step,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Handle to a running player session
#[derive(Debug)]
pub struct SessionController {
    config: DosConfig,
    store: Store,
    bridge: Arc<ResourceBridge>,
    loader: RuntimeLoader,
    connector: NetworkConnector,
    gateway: EventGateway,
}

impl SessionController {
    pub(crate) fn from_parts(
        config: DosConfig,
        store: Store,
        loader: RuntimeLoader,
        gateway: EventGateway,
    ) -> Self {
        let bridge = Arc::clone(store.bridge());
        let connector = NetworkConnector::new(store.clone());
        Self {
            config,
            store,
            bridge,
            loader,
            connector,
            gateway,
        }
    }

    // ------------------------------------------------------------------------
    // Runtime
    // ------------------------------------------------------------------------

    /// Load the emulation runtime and leave `emu-init`
    ///
    /// A load failure enters `emu-error` with the loader's message. That
    /// step is terminal, so later calls are rejected without loading again.
    pub async fn init_emulators(&self) -> DosResult<RuntimeInfo> {
        if self.store.with_state(|session| session.step == Step::EmuError) {
            warn!("Emulators failed to load, not retrying");
            return Err(StateTransitionError::InvalidTransition {
                from: Step::EmuError,
                action: "emuReady",
            }
            .into());
        }

        match self.loader.ensure_loaded(&self.config.path_prefix).await {
            Ok(runtime) => {
                if self.store.with_state(|session| session.step == Step::EmuInit) {
                    self.store.dispatch(Action::EmuReady(runtime.version.clone()))?;
                    self.gateway.post_event(DosEvent::EmuReady, None);
                }
                Ok(runtime)
            }
            Err(e) => {
                error!("Unable to init emulators.js: {}", e);
                if self.store.with_state(|session| session.step == Step::EmuInit) {
                    self.store.dispatch(Action::EmuError(e.to_string()))?;
                }
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Bundle
    // ------------------------------------------------------------------------

    /// Load a bundle (and optional changes) and move to `bnd-config`
    ///
    /// A newer load started while this one was fetching wins; this call
    /// then returns `BundleError::Superseded` without touching the session.
    pub async fn load_bundle(
        &self,
        url: &str,
        changes_url: Option<&str>,
        fetcher: &dyn BundleFetcher,
    ) -> DosResult<Arc<LoadedBundle>> {
        self.store.dispatch(Action::BndLoad(url.to_string()))?;
        info!("Loading bundle {}", url);

        let bundle = match self.fetch_cached(url, fetcher).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail_load(url, e)),
        };

        let bundle_changes = match changes_url {
            Some(changes_url) => match self.fetch_cached(changes_url, fetcher).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Ignoring bundle changes: {}", e);
                    None
                }
            },
            None => None,
        };

        let loaded = LoadedBundle {
            bundle_url: Some(url.to_string()),
            bundle_changes_url: changes_url.map(str::to_string),
            bundle: Some(bundle),
            bundle_changes,
        };
        let size = loaded.size();

        let stored = self
            .store
            .dispatch_checked(Action::BndConfig, |session, bridge| {
                ensure_current_load(session, url)?;
                bridge.set_loaded_bundle(loaded)?;
                Ok(bridge.loaded_bundle())
            });

        match stored {
            Ok(Some(loaded)) => {
                debug!("Bundle {} loaded ({} bytes)", url, size);
                Ok(loaded)
            }
            Ok(None) => Err(DosError::fetch_failed(url, "bundle released during load")),
            Err(e @ DosError::Bundle(BundleError::Superseded { .. })) => Err(e),
            Err(e) => Err(self.fail_load(url, e)),
        }
    }

    /// Enter `bnd-error` for `url` unless a newer load took over
    fn fail_load(&self, url: &str, e: DosError) -> DosError {
        warn!("Bundle {} failed: {}", url, e);
        let failed = self
            .store
            .dispatch_checked(Action::BndError(e.user_message()), |session, _| {
                ensure_current_load(session, url)
            });
        match failed {
            Ok(()) => e,
            Err(superseded) => superseded,
        }
    }

    async fn fetch_cached(&self, url: &str, fetcher: &dyn BundleFetcher) -> DosResult<Vec<u8>> {
        let cache = self.bridge.cache();
        if let Some(bytes) = cache.get(url).await {
            debug!("{} served from cache", url);
            return Ok(bytes);
        }

        let bytes = fetcher
            .fetch(url)
            .await
            .map_err(|reason| DosError::fetch_failed(url, reason))?;
        if let Err(e) = cache.put(url, bytes.clone()).await {
            warn!("Unable to cache {}: {}", url, e);
        }
        Ok(bytes)
    }

    /// Report a bundle failure detected by the host (parse, config)
    pub fn bundle_failed(&self, message: impl Into<String>) -> DosResult<()> {
        self.store.dispatch(Action::BndError(message.into()))?;
        Ok(())
    }

    /// Bundle is configured and its instance started
    ///
    /// Binds the live command interface together with `bnd-ready`, then
    /// notifies the host.
    pub fn bundle_ready(
        &self,
        config: BundleConfig,
        ci: Arc<dyn CommandInterface>,
    ) -> DosResult<()> {
        self.store
            .bind_command_interface(Arc::clone(&ci), Action::BndReady(config))?;
        self.gateway.post_event(DosEvent::CiReady, Some(ci));
        Ok(())
    }

    /// Start playing the ready bundle
    pub fn play(&self) -> DosResult<()> {
        self.store.dispatch(Action::BndPlay)?;
        self.gateway.post_event(DosEvent::BndPlay, self.bridge.ci());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Run Options
    // ------------------------------------------------------------------------

    pub fn set_worker(&self, worker: bool) -> DosResult<()> {
        self.store.dispatch(Action::DosWorker(worker)).map(drop)
    }

    pub fn set_backend(&self, backend: Backend) -> DosResult<()> {
        self.store.dispatch(Action::DosBackend(backend)).map(drop)
    }

    pub fn set_render_backend(&self, render_backend: RenderBackend) -> DosResult<()> {
        self.store
            .dispatch(Action::RenderBackend(render_backend))
            .map(drop)
    }

    pub fn set_render_aspect(&self, render_aspect: RenderAspect) -> DosResult<()> {
        self.store
            .dispatch(Action::RenderAspect(render_aspect))
            .map(drop)
    }

    pub fn set_volume(&self, volume: f64) -> DosResult<()> {
        self.store.dispatch(Action::Volume(volume)).map(drop)
    }

    pub fn set_mouse_sensitivity(&self, sensitivity: f64) -> DosResult<()> {
        self.store
            .dispatch(Action::MouseSensitivity(sensitivity))
            .map(drop)
    }

    pub fn set_mouse_capture(&self, capture: bool) -> DosResult<()> {
        self.store.dispatch(Action::MouseCapture(capture)).map(drop)
    }

    pub fn set_paused(&self, paused: bool) -> DosResult<()> {
        self.store.dispatch(Action::Paused(paused)).map(drop)
    }

    /// Replace the emulator statistics with a new snapshot
    pub fn report_stats(&self, stats: EmulatorStats) -> DosResult<()> {
        self.store.dispatch(Action::Stats(stats)).map(drop)
    }

    // ------------------------------------------------------------------------
    // Peering
    // ------------------------------------------------------------------------

    pub async fn connect_peering(&self, room: &str, address: &str) -> DosResult<()> {
        self.connector.connect_peering(room, address).await
    }

    pub fn disconnect_peering(&self) -> DosResult<()> {
        self.connector.disconnect_peering()
    }

    // ------------------------------------------------------------------------
    // Host
    // ------------------------------------------------------------------------

    /// Forward a UI event (key dialog, fullscreen) to the host callback
    pub fn post_event(&self, event: DosEvent) -> bool {
        self.gateway.post_event(event, self.bridge.ci())
    }

    pub fn bind_root(&self, node: MountNode) -> DosResult<()> {
        self.bridge.bind_root(node)?;
        Ok(())
    }

    pub fn set_options(&self, options: HostOptions) -> DosResult<()> {
        self.bridge.set_options(options)?;
        Ok(())
    }

    /// Release the runtime handles and wait for queued events
    pub async fn teardown(&self) -> DosResult<Session> {
        let session = self.store.teardown()?;
        self.gateway.flush().await;
        info!("Session torn down in step {}", session.step);
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    pub fn history(&self) -> Vec<AuditEntry> {
        self.store.history()
    }

    pub fn config(&self) -> &DosConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn bridge(&self) -> &Arc<ResourceBridge> {
        &self.bridge
    }

    pub fn loader(&self) -> &RuntimeLoader {
        &self.loader
    }

    pub fn connector(&self) -> &NetworkConnector {
        &self.connector
    }

    pub fn gateway(&self) -> &EventGateway {
        &self.gateway
    }
}

fn ensure_current_load(session: &Session, url: &str) -> DosResult<()> {
    if session.step == Step::BndLoad && session.bundle.as_deref() == Some(url) {
        Ok(())
    } else {
        debug!("Load of {} superseded in step {}", url, session.step);
        Err(BundleError::Superseded {
            url: url.to_string(),
        }
        .into())
    }
}
