//! Event Gateway
//!
//! Forwards runtime events to the host callback off the posting call stack.
//! Posted events go through an unbounded queue drained by a forwarding task;
//! each one is delivered once its deferral has elapsed, in posting order.
//! Nothing is coalesced or cancelled; dropping the gateway lets the task
//! drain what was already queued.

use crate::bridge::ResourceBridge;
use jsdos_core::{CommandInterface, DosError, DosEvent, DosResult};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, trace};

struct QueuedEvent {
    event: DosEvent,
    ci: Option<Arc<dyn CommandInterface>>,
    posted_at: Instant,
}

enum GatewayMessage {
    Forward(QueuedEvent),
    Flush(oneshot::Sender<()>),
}

/// Deferred forwarder of runtime events
#[derive(Debug)]
pub struct EventGateway {
    sender: mpsc::UnboundedSender<GatewayMessage>,
    bridge: Arc<ResourceBridge>,
}

impl EventGateway {
    /// Start the forwarding task on the current tokio runtime
    pub fn spawn(bridge: Arc<ResourceBridge>, delay: Duration) -> DosResult<Self> {
        let handle = Handle::try_current().map_err(|e| {
            DosError::config_error(format!("event gateway needs a tokio runtime: {}", e))
        })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        handle.spawn(forward_events(receiver, Arc::clone(&bridge), delay));

        Ok(Self { sender, bridge })
    }

    /// Queue `event` for the host callback
    ///
    /// Returns whether the event was queued; without a configured callback
    /// nothing is forwarded.
    pub fn post_event(&self, event: DosEvent, ci: Option<Arc<dyn CommandInterface>>) -> bool {
        if self.bridge.event_callback().is_none() {
            trace!("No event callback, dropping {}", event);
            return false;
        }

        let queued = QueuedEvent {
            event,
            ci,
            posted_at: Instant::now(),
        };
        if self.sender.send(GatewayMessage::Forward(queued)).is_err() {
            debug!("Event gateway stopped, dropping {}", event);
            return false;
        }
        true
    }

    /// Wait until every event posted so far has been forwarded
    pub async fn flush(&self) {
        let (done, forwarded) = oneshot::channel();
        if self.sender.send(GatewayMessage::Flush(done)).is_ok() {
            let _ = forwarded.await;
        }
    }
}

async fn forward_events(
    mut receiver: mpsc::UnboundedReceiver<GatewayMessage>,
    bridge: Arc<ResourceBridge>,
    delay: Duration,
) {
    while let Some(message) = receiver.recv().await {
        match message {
            GatewayMessage::Forward(queued) => {
                time::sleep_until(queued.posted_at + delay).await;
                // Options may have changed since the event was posted
                match bridge.event_callback() {
                    Some(callback) => {
                        trace!("Forwarding {}", queued.event);
                        callback(queued.event, queued.ci);
                    }
                    None => debug!("Event callback removed, dropping {}", queued.event),
                }
            }
            GatewayMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{EventCallback, HostOptions};
    use std::sync::Mutex;

    fn recording_bridge() -> (Arc<ResourceBridge>, Arc<Mutex<Vec<DosEvent>>>) {
        let bridge = Arc::new(ResourceBridge::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: EventCallback = Arc::new(move |event, _| sink.lock().unwrap().push(event));
        bridge
            .set_options(HostOptions::default().with_event_callback(callback))
            .unwrap();
        (bridge, events)
    }

    #[tokio::test]
    async fn test_events_forwarded_in_order_after_delay() {
        let (bridge, events) = recording_bridge();
        let gateway = EventGateway::spawn(bridge, Duration::from_millis(4)).unwrap();

        assert!(gateway.post_event(DosEvent::EmuReady, None));
        assert!(gateway.post_event(DosEvent::CiReady, None));
        assert!(gateway.post_event(DosEvent::BndPlay, None));
        // Never delivered on the posting call stack
        assert!(events.lock().unwrap().is_empty());

        gateway.flush().await;
        assert_eq!(
            *events.lock().unwrap(),
            vec![DosEvent::EmuReady, DosEvent::CiReady, DosEvent::BndPlay]
        );
    }

    #[tokio::test]
    async fn test_no_callback_no_forwarding() {
        let gateway = EventGateway::spawn(Arc::new(ResourceBridge::new()), Duration::ZERO).unwrap();
        assert!(!gateway.post_event(DosEvent::OpenKey, None));
        gateway.flush().await;
    }

    #[tokio::test]
    async fn test_delay_is_respected() {
        let (bridge, events) = recording_bridge();
        let gateway = EventGateway::spawn(bridge, Duration::from_millis(50)).unwrap();

        gateway.post_event(DosEvent::FullscreenChange, None);
        time::sleep(Duration::from_millis(10)).await;
        assert!(events.lock().unwrap().is_empty());

        gateway.flush().await;
        assert_eq!(*events.lock().unwrap(), vec![DosEvent::FullscreenChange]);
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let err = EventGateway::spawn(Arc::new(ResourceBridge::new()), Duration::ZERO).unwrap_err();
        assert!(matches!(err, DosError::Configuration { .. }));
    }
}
