//! Store
//!
//! The single mutable container of session state. Every transition runs
//! under one lock: compute the transition, execute its effects, record the
//! audit entry, swap the session and publish it to subscribers. No
//! transition can observe a partially applied one.
//!
//! Changes of the live command interface also go through the store so the
//! serializable `ci` flag and the bridge handle move together.

use crate::bridge::ResourceBridge;
use jsdos_core::{
    Action, AuditEntry, BridgeError, CommandInterface, DosResult, Effect, KeyValueStorage,
    NetworkType, Session, Transition,
};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

struct StoreState {
    session: Session,
    audit_trail: VecDeque<AuditEntry>,
    sequence: u64,
    revision: u64,
}

struct StoreInner {
    state: Mutex<StoreState>,
    storage: Arc<dyn KeyValueStorage>,
    bridge: Arc<ResourceBridge>,
    publisher: watch::Sender<Session>,
    audit_capacity: usize,
}

/// Cloneable handle to the session store
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store whose initial run options come from `storage`
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        bridge: Arc<ResourceBridge>,
        audit_capacity: usize,
    ) -> Self {
        let session = Session::from_storage(storage.as_ref());
        let (publisher, _) = watch::channel(session.clone());

        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    session,
                    audit_trail: VecDeque::new(),
                    sequence: 0,
                    revision: 0,
                }),
                storage,
                bridge,
                publisher,
                audit_capacity: audit_capacity.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current session
    pub fn state(&self) -> Session {
        self.lock().session.clone()
    }

    /// Read the current session without cloning it
    pub fn with_state<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.lock().session)
    }

    /// Number of snapshots published to subscribers so far
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Receiver notified with every committed session
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.publisher.subscribe()
    }

    pub fn bridge(&self) -> &Arc<ResourceBridge> {
        &self.inner.bridge
    }

    /// Apply an action
    ///
    /// Rejected transitions leave the session untouched. A `Ci` action must
    /// match the bridge and `BndReady` is only accepted together with a
    /// handle; use `bind_command_interface` and `release_command_interface`
    /// to change the handle itself.
    pub fn dispatch(&self, action: Action) -> DosResult<Session> {
        let mut state = self.lock();

        match action {
            Action::Ci(requested) if requested != self.inner.bridge.has_ci() => {
                warn!("Rejected ci({}) without a matching command interface", requested);
                return Err(BridgeError::CommandInterfaceMismatch { requested }.into());
            }
            Action::BndReady(_) => {
                warn!("Rejected bndReady without a command interface");
                return Err(BridgeError::CommandInterfaceRequired.into());
            }
            _ => {}
        }

        let transition = self.transition(&state, action)?;
        self.commit(&mut state, transition);
        Ok(state.session.clone())
    }

    /// Apply an action only if `check` accepts the current state
    ///
    /// The check and the transition run under the same lock, so async
    /// operations can re-validate their preconditions on resumption.
    pub fn dispatch_checked<T>(
        &self,
        action: Action,
        check: impl FnOnce(&Session, &ResourceBridge) -> DosResult<T>,
    ) -> DosResult<T> {
        let mut state = self.lock();
        let accepted = check(&state.session, &self.inner.bridge)?;
        let transition = self.transition(&state, action)?;
        self.commit(&mut state, transition);
        Ok(accepted)
    }

    /// Apply a readiness action and bind the live command interface with it
    pub fn bind_command_interface(
        &self,
        ci: Arc<dyn CommandInterface>,
        ready: Action,
    ) -> DosResult<Session> {
        let mut state = self.lock();

        let transition = self.transition(&state, ready)?;
        let flag = self.transition_from(&transition.session, Action::Ci(true))?;
        // Bind before committing so a torn down bridge rejects the whole step
        self.inner.bridge.bind_ci(ci)?;
        self.record(&mut state, transition);
        self.record(&mut state, flag);
        self.publish(&mut state);
        Ok(state.session.clone())
    }

    /// Drop the live command interface, if any
    pub fn release_command_interface(&self) -> DosResult<Session> {
        let mut state = self.lock();
        self.inner.bridge.release_ci();
        if state.session.ci {
            let transition = self.transition(&state, Action::Ci(false))?;
            self.commit(&mut state, transition);
        }
        Ok(state.session.clone())
    }

    /// Disconnect peering, release every runtime handle and lock the bridge
    pub fn teardown(&self) -> DosResult<Session> {
        let mut state = self.lock();
        let mut changed = false;

        if state.session.network.ipx.is_active() {
            let transition = self.transition(&state, Action::DisconnectIpx)?;
            self.record(&mut state, transition);
            changed = true;
        }

        self.inner.bridge.teardown();
        if state.session.ci {
            let transition = self.transition(&state, Action::Ci(false))?;
            self.record(&mut state, transition);
            changed = true;
        }
        if changed {
            self.publish(&mut state);
        }
        Ok(state.session.clone())
    }

    /// Recorded transitions, oldest first
    pub fn history(&self) -> Vec<AuditEntry> {
        self.lock().audit_trail.iter().cloned().collect()
    }

    /// Actions of the recorded transitions, suitable for `Session::replay`
    pub fn action_log(&self) -> Vec<Action> {
        self.lock()
            .audit_trail
            .iter()
            .map(|entry| entry.action.clone())
            .collect()
    }

    fn transition(&self, state: &StoreState, action: Action) -> DosResult<Transition> {
        self.transition_from(&state.session, action)
    }

    fn transition_from(&self, session: &Session, action: Action) -> DosResult<Transition> {
        let name = action.name();
        session.apply(action).map_err(|e| {
            warn!("Rejected {}: {}", name, e);
            e.into()
        })
    }

    fn commit(&self, state: &mut StoreState, transition: Transition) {
        self.record(state, transition);
        self.publish(state);
    }

    /// Subscribers see the session only once every recorded step is in
    fn publish(&self, state: &mut StoreState) {
        state.revision += 1;
        self.inner.publisher.send_replace(state.session.clone());
    }

    fn record(&self, state: &mut StoreState, transition: Transition) {
        let Transition {
            session,
            effects,
            mut audit_entry,
        } = transition;

        for effect in &effects {
            self.execute(effect);
        }

        state.sequence += 1;
        audit_entry.sequence = state.sequence;
        debug!(
            "#{} {}: {} -> {} ({} effects)",
            audit_entry.sequence,
            audit_entry.action.name(),
            audit_entry.from,
            audit_entry.to,
            audit_entry.effects_count
        );

        state.audit_trail.push_back(audit_entry);
        while state.audit_trail.len() > self.inner.audit_capacity {
            state.audit_trail.pop_front();
        }

        state.session = session;
    }

    fn execute(&self, effect: &Effect) {
        match effect {
            Effect::Persist { key, value } => {
                if let Err(e) = self.inner.storage.set_item(key.as_str(), value) {
                    warn!("Unable to persist {}: {}", key.as_str(), e);
                }
            }
            Effect::NetworkDisconnect => {
                if let Some(ci) = self.inner.bridge.ci() {
                    ci.network_disconnect(NetworkType::DosboxIpx);
                }
            }
            Effect::ReleaseCommandInterface => {
                if self.inner.bridge.release_ci().is_some() {
                    debug!("Command interface released");
                }
            }
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Store")
            .field("step", &state.session.step)
            .field("sequence", &state.sequence)
            .field("bridge", &self.inner.bridge)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
