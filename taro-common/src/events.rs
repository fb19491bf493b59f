//! Reading event vocabulary and per-session subscription registry
//!
//! Events are pushed to SSE subscribers per session. Unlike a global
//! broadcast bus, delivery here is scoped: a subscriber registered for one
//! session never sees another session's events, and a failed send drops only
//! the failing handle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Events published by the reading pipeline for one session.
///
/// Serialized for SSE transmission; `event_type()` supplies the SSE event
/// name, the serialized body is the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReadingEvent {
    /// Initial handshake, sent to each subscriber at subscribe time
    #[serde(rename_all = "camelCase")]
    Connected { session_id: String },

    /// Processing stage advanced
    StatusChanged {
        status: String,
        message: String,
        progress: u8,
    },

    /// One card interpretation finished (position 1-3)
    CardInterpreted { position: u8, text: String },

    /// Summary text is ready
    SummaryGenerated { text: String },

    /// Result image is ready
    ImageGenerated { url: String },

    /// Whole pipeline finished
    Completed { message: String },

    /// Pipeline aborted; human-readable reason
    Error { message: String },
}

impl ReadingEvent {
    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            ReadingEvent::Connected { .. } => "connected",
            ReadingEvent::StatusChanged { .. } => "status_changed",
            ReadingEvent::CardInterpreted { .. } => "card_interpreted",
            ReadingEvent::SummaryGenerated { .. } => "summary_generated",
            ReadingEvent::ImageGenerated { .. } => "image_generated",
            ReadingEvent::Completed { .. } => "completed",
            ReadingEvent::Error { .. } => "error",
        }
    }
}

/// Why a subscription handle left the registry.
///
/// All three variants funnel into the same removal path; removal is
/// idempotent so a timeout racing a client disconnect is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// Subscriber dropped its handle
    Closed,
    /// Idle timeout elapsed on the transport
    TimedOut,
    /// A push to the subscriber failed
    Errored,
}

struct Handle {
    id: Uuid,
    tx: mpsc::Sender<ReadingEvent>,
}

type Registry = HashMap<String, Vec<Handle>>;

/// Per-session event publisher / subscription registry
///
/// State is a map from session id to the live handles for that session. The
/// map entry is removed as soon as its handle set empties, so idle sessions
/// cost nothing. Publishing never blocks: sends are non-blocking and a
/// subscriber that cannot accept an event (closed or full buffer) is
/// dropped, leaving the remaining handles and the publisher untouched.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub whose per-subscriber buffer holds `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber for `session_id`
    ///
    /// The `connected` event is pushed synchronously before the handle is
    /// registered; if that push fails the handle is discarded immediately
    /// and the returned subscription yields nothing.
    pub fn subscribe(&self, session_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();

        let hello = ReadingEvent::Connected {
            session_id: session_id.to_string(),
        };
        if tx.try_send(hello).is_err() {
            warn!(session_id, "initial connected event rejected, discarding handle");
            return Subscription {
                session_id: session_id.to_string(),
                id,
                rx,
                hub: self.clone(),
                detached: true,
            };
        }

        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .push(Handle { id, tx });

        debug!(session_id, handle_id = %id, "subscriber registered");
        Subscription {
            session_id: session_id.to_string(),
            id,
            rx,
            hub: self.clone(),
            detached: false,
        }
    }

    /// Fan an event out to every live handle for `session_id`
    ///
    /// Returns the number of handles the event was delivered to. Handles
    /// whose send fails are removed; the publishing call itself never fails.
    pub fn publish(&self, session_id: &str, event: ReadingEvent) -> usize {
        let mut registry = self.lock();
        let Some(handles) = registry.get_mut(session_id) else {
            debug!(session_id, event = event.event_type(), "no subscribers");
            return 0;
        };

        let mut delivered = 0;
        handles.retain(|handle| match handle.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                warn!(
                    session_id,
                    handle_id = %handle.id,
                    reason = ?Disconnect::Errored,
                    "dropping subscriber after failed send"
                );
                false
            }
        });

        if handles.is_empty() {
            registry.remove(session_id);
        }

        debug!(
            session_id,
            event = event.event_type(),
            delivered,
            "event published"
        );
        delivered
    }

    /// Number of live handles for a session (diagnostics, tests)
    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.lock().get(session_id).map_or(0, Vec::len)
    }

    /// Number of sessions currently holding handles (diagnostics, tests)
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Remove one handle; idempotent regardless of which lifecycle variant
    /// triggered it.
    fn remove(&self, session_id: &str, handle_id: Uuid, reason: Disconnect) {
        let mut registry = self.lock();
        if let Some(handles) = registry.get_mut(session_id) {
            let before = handles.len();
            handles.retain(|h| h.id != handle_id);
            if handles.len() != before {
                debug!(session_id, handle_id = %handle_id, ?reason, "subscriber removed");
            }
            if handles.is_empty() {
                registry.remove(session_id);
            }
        }
    }
}

/// One subscriber's live handle: a receiver plus a registry guard
///
/// Dropping the subscription removes it from the registry (`Closed`);
/// transports that detect their own idle timeout call
/// [`Subscription::disconnect`] with `TimedOut` instead. Either way the
/// removal runs exactly once.
pub struct Subscription {
    session_id: String,
    id: Uuid,
    rx: mpsc::Receiver<ReadingEvent>,
    hub: EventHub,
    detached: bool,
}

impl Subscription {
    /// Session this subscription is bound to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Receive the next event; `None` once the handle has been dropped from
    /// the registry and the buffer is drained.
    pub async fn recv(&mut self) -> Option<ReadingEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive (tests, draining)
    pub fn try_recv(&mut self) -> Option<ReadingEvent> {
        self.rx.try_recv().ok()
    }

    /// Leave the registry with an explicit reason
    pub fn disconnect(&mut self, reason: Disconnect) {
        if !self.detached {
            self.detached = true;
            self.hub.remove(&self.session_id, self.id, reason);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect(Disconnect::Closed);
    }
}
