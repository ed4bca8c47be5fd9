//! Session State Machine
//!
//! Serializable session state and its pure transition logic. A transition
//! never touches storage or the runtime itself: it returns the next session
//! together with the effects the store must execute, in order, to keep the
//! outside world consistent with the new state.
//!
//! ```text
//! emu-init   --EmuReady-->   emu-ready
//! emu-init   --EmuError-->   emu-error
//! emu-ready  --BndLoad-->    bnd-load
//! bnd-load   --BndError-->   bnd-error   (also from bnd-config)
//! bnd-load   --BndConfig-->  bnd-config
//! bnd-config --BndReady-->   bnd-ready
//! bnd-ready  --BndPlay-->    bnd-play
//! bnd-error | bnd-ready | bnd-play --BndLoad--> bnd-load
//! ```
//!
//! Run options, stats, the `ci` flag and the IPX sub-state are orthogonal to
//! the step and accepted in every step.

use crate::errors::{non_empty_message, StateTransitionError};
use crate::storage::{encode_bool, encode_number, KeyValueStorage, StorageKey};
use crate::types::{
    Backend, BundleConfig, EmulatorStats, IpxStatus, NetworkState, RenderAspect, RenderBackend,
    Step,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Version string shown before the runtime reports one
pub const UNKNOWN_VERSION: &str = "-";

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

/// The serializable session, owned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub step: Step,
    pub emu_version: String,
    pub error: Option<String>,
    pub bundle: Option<String>,
    pub config: BundleConfig,
    pub worker: bool,
    pub backend: Backend,
    pub render_backend: RenderBackend,
    pub render_aspect: RenderAspect,
    pub volume: f64,
    pub mouse_sensitivity: f64,
    pub mouse_capture: bool,
    pub paused: bool,
    pub stats: EmulatorStats,
    pub ci: bool,
    pub network: NetworkState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            step: Step::EmuInit,
            emu_version: UNKNOWN_VERSION.to_string(),
            error: None,
            bundle: None,
            config: BundleConfig::default(),
            worker: true,
            backend: Backend::default(),
            render_backend: RenderBackend::default(),
            render_aspect: RenderAspect::default(),
            volume: 1.0,
            mouse_sensitivity: 1.0,
            mouse_capture: false,
            paused: false,
            stats: EmulatorStats::default(),
            ci: false,
            network: NetworkState::default(),
        }
    }
}

// ----------------------------------------------------------------------------
// Actions
// ----------------------------------------------------------------------------

/// Phase of an asynchronous peering request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeeringPhase {
    Pending,
    Fulfilled,
    Rejected,
}

/// Serializable transition requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Action {
    /// Runtime loaded, carries its version
    EmuReady(String),
    /// Runtime failed to load
    EmuError(String),
    /// Start loading a bundle URL
    BndLoad(String),
    /// Bundle fetch, parse or config failed
    BndError(String),
    /// Bundle parsed, configuration pending
    BndConfig,
    /// Configuration resolved
    BndReady(BundleConfig),
    /// Start playing
    BndPlay,
    DosWorker(bool),
    DosBackend(Backend),
    RenderBackend(RenderBackend),
    RenderAspect(RenderAspect),
    Volume(f64),
    MouseSensitivity(f64),
    MouseCapture(bool),
    Paused(bool),
    /// Full stats snapshot
    Stats(EmulatorStats),
    /// Whether a live command interface exists
    Ci(bool),
    Peering(PeeringPhase),
    DisconnectIpx,
}

impl Action {
    /// Name used in logs and audit entries
    pub fn name(&self) -> &'static str {
        match self {
            Action::EmuReady(_) => "emuReady",
            Action::EmuError(_) => "emuError",
            Action::BndLoad(_) => "bndLoad",
            Action::BndError(_) => "bndError",
            Action::BndConfig => "bndConfig",
            Action::BndReady(_) => "bndReady",
            Action::BndPlay => "bndPlay",
            Action::DosWorker(_) => "dosWorker",
            Action::DosBackend(_) => "dosBackend",
            Action::RenderBackend(_) => "renderBackend",
            Action::RenderAspect(_) => "renderAspect",
            Action::Volume(_) => "volume",
            Action::MouseSensitivity(_) => "mouseSensitivity",
            Action::MouseCapture(_) => "mouseCapture",
            Action::Paused(_) => "paused",
            Action::Stats(_) => "stats",
            Action::Ci(_) => "ci",
            Action::Peering(_) => "peering",
            Action::DisconnectIpx => "disconnectIpx",
        }
    }
}

// ----------------------------------------------------------------------------
// Transition Results
// ----------------------------------------------------------------------------

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a run option to durable storage
    Persist { key: StorageKey, value: String },
    /// Ask the live command interface to drop the IPX link
    NetworkDisconnect,
    /// Drop the live command interface handle
    ReleaseCommandInterface,
}

/// Audit trail entry for a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Position in the store's history, 0 until recorded
    pub sequence: u64,
    pub action: Action,
    pub from: Step,
    pub to: Step,
    pub effects_count: usize,
}

/// Result of a transition
#[derive(Debug, Clone)]
pub struct Transition {
    /// Next session
    pub session: Session,
    /// Effects to execute, in order
    pub effects: Vec<Effect>,
    /// Audit trail entry
    pub audit_entry: AuditEntry,
}

// ----------------------------------------------------------------------------
// State Machine Implementation
// ----------------------------------------------------------------------------

impl Session {
    /// Initial session with run options read from durable storage
    pub fn from_storage(storage: &dyn KeyValueStorage) -> Self {
        let defaults = Session::default();
        Self {
            // Anything but an explicit "false" keeps the worker enabled
            worker: storage
                .get_item(StorageKey::Worker.as_str())
                .map_or(defaults.worker, |v| v != "false"),
            backend: read_option(storage, StorageKey::Backend, defaults.backend),
            render_backend: read_option(storage, StorageKey::RenderBackend, defaults.render_backend),
            render_aspect: read_option(storage, StorageKey::RenderAspect, defaults.render_aspect),
            volume: read_option(storage, StorageKey::Volume, defaults.volume),
            mouse_sensitivity: read_option(
                storage,
                StorageKey::MouseSensitivity,
                defaults.mouse_sensitivity,
            ),
            ..defaults
        }
    }

    /// Fold recorded actions over a session, skipping rejected ones
    pub fn replay(initial: Session, actions: impl IntoIterator<Item = Action>) -> Session {
        actions
            .into_iter()
            .fold(initial, |session, action| match session.apply(action) {
                Ok(transition) => transition.session,
                Err(_) => session,
            })
    }

    pub fn is_playing(&self) -> bool {
        self.step == Step::BndPlay
    }

    /// Compute the transition for `action` without modifying `self`
    pub fn apply(&self, action: Action) -> Result<Transition, StateTransitionError> {
        let from = self.step;
        let recorded = action.clone();
        let mut next = self.clone();
        let mut effects = Vec::new();

        match action {
            Action::EmuReady(version) => {
                self.require(&[Step::EmuInit], &recorded)?;
                next.advance(Step::EmuReady);
                next.emu_version = version;
            }
            Action::EmuError(message) => {
                self.require(&[Step::EmuInit], &recorded)?;
                next.fail(Step::EmuError, message);
            }
            Action::BndLoad(url) => {
                if !from.accepts_bundle_load() {
                    return Err(self.invalid(&recorded));
                }
                // A fresh load resets the whole chain, including the
                // runtime instance and any peering link it carried
                if self.ci {
                    if self.network.ipx.is_active() {
                        effects.push(Effect::NetworkDisconnect);
                    }
                    effects.push(Effect::ReleaseCommandInterface);
                    next.ci = false;
                }
                next.network.ipx = IpxStatus::Disconnected;
                next.config = BundleConfig::default();
                next.bundle = Some(url);
                next.advance(Step::BndLoad);
            }
            Action::BndError(message) => {
                self.require(&[Step::BndLoad, Step::BndConfig], &recorded)?;
                next.fail(Step::BndError, message);
            }
            Action::BndConfig => {
                self.require(&[Step::BndLoad], &recorded)?;
                next.advance(Step::BndConfig);
            }
            Action::BndReady(config) => {
                self.require(&[Step::BndConfig], &recorded)?;
                next.config = config;
                next.advance(Step::BndReady);
            }
            Action::BndPlay => {
                self.require(&[Step::BndReady], &recorded)?;
                next.advance(Step::BndPlay);
            }
            Action::DosWorker(worker) => {
                next.worker = worker;
                effects.push(persist(StorageKey::Worker, encode_bool(worker)));
            }
            Action::DosBackend(backend) => {
                next.backend = backend;
                effects.push(persist(StorageKey::Backend, backend.as_str()));
            }
            Action::RenderBackend(render_backend) => {
                next.render_backend = render_backend;
                effects.push(persist(StorageKey::RenderBackend, render_backend.as_str()));
            }
            Action::RenderAspect(render_aspect) => {
                next.render_aspect = render_aspect;
                effects.push(persist(StorageKey::RenderAspect, render_aspect.as_str()));
            }
            Action::Volume(volume) => {
                next.volume = volume;
                effects.push(persist(StorageKey::Volume, encode_number(volume)));
            }
            Action::MouseSensitivity(sensitivity) => {
                next.mouse_sensitivity = sensitivity;
                effects.push(persist(StorageKey::MouseSensitivity, encode_number(sensitivity)));
            }
            Action::MouseCapture(capture) => next.mouse_capture = capture,
            Action::Paused(paused) => next.paused = paused,
            Action::Stats(stats) => next.stats = stats,
            Action::Ci(ci) => next.ci = ci,
            Action::Peering(phase) => {
                next.network.ipx = match phase {
                    PeeringPhase::Pending => IpxStatus::Connecting,
                    PeeringPhase::Fulfilled => IpxStatus::Connected,
                    PeeringPhase::Rejected => IpxStatus::Error,
                };
            }
            Action::DisconnectIpx => {
                next.network.ipx = IpxStatus::Disconnected;
                effects.push(Effect::NetworkDisconnect);
            }
        }

        let audit_entry = AuditEntry {
            sequence: 0,
            action: recorded,
            from,
            to: next.step,
            effects_count: effects.len(),
        };

        Ok(Transition {
            session: next,
            effects,
            audit_entry,
        })
    }

    fn require(&self, allowed: &[Step], action: &Action) -> Result<(), StateTransitionError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &Action) -> StateTransitionError {
        StateTransitionError::InvalidTransition {
            from: self.step,
            action: action.name(),
        }
    }

    /// Forward move, clears any previous error
    fn advance(&mut self, step: Step) {
        self.step = step;
        self.error = None;
    }

    fn fail(&mut self, step: Step, message: String) {
        self.step = step;
        self.error = Some(non_empty_message(message));
    }
}

fn persist(key: StorageKey, value: impl Into<String>) -> Effect {
    Effect::Persist {
        key,
        value: value.into(),
    }
}

fn read_option<T: FromStr>(storage: &dyn KeyValueStorage, key: StorageKey, default: T) -> T {
    match storage.get_item(key.as_str()) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable stored value {:?} for {}", raw, key.as_str());
            default
        }),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
