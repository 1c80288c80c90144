//! # Event Bus
//!
//! Synchronous publish/subscribe with registration-order dispatch.

use crate::history::EventHistory;
use crate::{DEFAULT_HISTORY_LIMIT, PERSIST_ALL};
use parking_lot::Mutex;
use shared_types::{Event, EventPayload, EventPriority};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Identifier returned by `subscribe`, used to unsubscribe later.
pub type SubscriptionId = Uuid;

/// Handler invoked for each matching published event.
///
/// Handlers run inline on the publishing call; anything that needs to do
/// asynchronous work must hand it off (spawn) and return without blocking.
pub type EventHandler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    handler: EventHandler,
    once: bool,
}

/// The process-wide event bus.
///
/// One instance per running system, injected into every component at
/// composition time. Tests construct their own isolated instances.
pub struct EventBus {
    subscriptions: Mutex<HashMap<String, Vec<Subscription>>>,
    history: Mutex<EventHistory>,
    persistent_types: Mutex<HashSet<String>>,
}

impl EventBus {
    /// Create a bus with the default history cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a bus with a custom per-type history cap.
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            history: Mutex::new(EventHistory::new(limit)),
            persistent_types: Mutex::new(HashSet::new()),
        }
    }

    /// Subscribe a handler to an event type.
    ///
    /// Returns the id to pass to [`EventBus::unsubscribe`]. Dispatch order
    /// is registration order within the event type.
    pub fn subscribe<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_subscription(event_type, Arc::new(handler), false)
    }

    /// Subscribe a handler that is removed after its first invocation.
    pub fn subscribe_once<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_subscription(event_type, Arc::new(handler), true)
    }

    fn add_subscription(
        &self,
        event_type: &str,
        handler: EventHandler,
        once: bool,
    ) -> SubscriptionId {
        let id = Uuid::new_v4();
        let mut subs = self.subscriptions.lock();
        subs.entry(event_type.to_string())
            .or_default()
            .push(Subscription { id, handler, once });
        debug!(event_type = %event_type, subscription_id = %id, once, "Subscription created");
        id
    }

    /// Remove a subscription by id.
    ///
    /// The id alone is the key, so all event types are scanned. Idempotent:
    /// returns `false` when the id is unknown (or already removed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.lock();
        let mut removed = false;
        let mut emptied = None;
        for (event_type, entries) in subs.iter_mut() {
            if let Some(index) = entries.iter().position(|s| s.id == id) {
                entries.remove(index);
                removed = true;
                if entries.is_empty() {
                    emptied = Some(event_type.clone());
                }
                debug!(event_type = %event_type, subscription_id = %id, "Subscription removed");
                break;
            }
        }
        if let Some(event_type) = emptied {
            subs.remove(&event_type);
        }
        removed
    }

    /// Publish an event to all current subscribers of its type.
    ///
    /// Returns the event id. Handlers run synchronously in registration
    /// order; a failing handler is logged and the remaining handlers still
    /// run.
    pub fn publish(
        &self,
        event_type: &str,
        payload: EventPayload,
        priority: EventPriority,
    ) -> Uuid {
        self.dispatch(Event::new(event_type, payload, priority))
    }

    /// Publish an event stamped with an originating component name.
    pub fn publish_from(
        &self,
        event_type: &str,
        payload: EventPayload,
        priority: EventPriority,
        source: &str,
    ) -> Uuid {
        self.dispatch(Event::new(event_type, payload, priority).with_source(source))
    }

    fn dispatch(&self, event: Event) -> Uuid {
        let event_id = event.id;

        // History is recorded before dispatch so failing handlers cannot
        // lose persisted events.
        if self.is_persistent(&event.event_type) {
            self.history.lock().record(event.clone());
        }

        // Snapshot under the lock, then release it: handlers are free to
        // subscribe, unsubscribe, or publish reentrantly. Once-handlers
        // leave the live list here, which bounds them to a single
        // invocation even if their own handler publishes the same type.
        let snapshot: Vec<(SubscriptionId, EventHandler)> = {
            let mut subs = self.subscriptions.lock();
            match subs.get_mut(&event.event_type) {
                Some(entries) => {
                    let snapshot = entries
                        .iter()
                        .map(|s| (s.id, Arc::clone(&s.handler)))
                        .collect();
                    entries.retain(|s| !s.once);
                    if entries.is_empty() {
                        subs.remove(&event.event_type);
                    }
                    snapshot
                }
                None => Vec::new(),
            }
        };

        for (subscription_id, handler) in snapshot {
            if let Err(e) = handler(&event) {
                error!(
                    event_type = %event.event_type,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Event handler failed"
                );
            }
        }

        event_id
    }

    /// Mark an event type as persistent so publishes append to history.
    ///
    /// Passing [`PERSIST_ALL`] persists every event type.
    pub fn mark_persistent(&self, event_type: &str) {
        self.persistent_types.lock().insert(event_type.to_string());
    }

    fn is_persistent(&self, event_type: &str) -> bool {
        let types = self.persistent_types.lock();
        types.contains(event_type) || types.contains(PERSIST_ALL)
    }

    /// Defensive copy of the retained history for an event type.
    #[must_use]
    pub fn history(&self, event_type: &str) -> Vec<Event> {
        self.history.lock().events(event_type)
    }

    /// Drop the retained history for an event type.
    pub fn clear_history(&self, event_type: &str) {
        self.history.lock().clear(event_type);
    }

    /// Number of live subscriptions for an event type.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscriptions
            .lock()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
