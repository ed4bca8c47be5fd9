//! Event Recorder
//!
//! Host event callback that remembers what it received.

use jsdos_core::{CommandInterface, DosEvent};
use std::sync::{Arc, Mutex, PoisonError};

/// One forwarded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event: DosEvent,
    pub with_ci: bool,
}

/// Collects forwarded events in arrival order
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback to install as the host event callback
    pub fn callback(
        &self,
    ) -> impl Fn(DosEvent, Option<Arc<dyn CommandInterface>>) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event, ci| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(RecordedEvent {
                    event,
                    with_ci: ci.is_some(),
                });
        }
    }

    pub fn records(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Received event kinds, in order
    pub fn events(&self) -> Vec<DosEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}
