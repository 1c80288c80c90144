//! # Event History
//!
//! Bounded per-type rings for event types marked persistent. Populated
//! before dispatch so a failing handler cannot lose history.

use shared_types::Event;
use std::collections::{HashMap, VecDeque};

/// Capped, per-event-type history storage.
///
/// Oldest entries are evicted first once a ring reaches the limit.
#[derive(Debug)]
pub struct EventHistory {
    rings: HashMap<String, VecDeque<Event>>,
    limit: usize,
}

impl EventHistory {
    /// Create a history store with the given per-type cap.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            rings: HashMap::new(),
            limit,
        }
    }

    /// Append an event to its type's ring, evicting the oldest entry at cap.
    pub fn record(&mut self, event: Event) {
        let ring = self.rings.entry(event.event_type.clone()).or_default();
        ring.push_back(event);
        if ring.len() > self.limit {
            ring.pop_front();
        }
    }

    /// Defensive copy of the ring for an event type.
    #[must_use]
    pub fn events(&self, event_type: &str) -> Vec<Event> {
        self.rings
            .get(event_type)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop all retained events for an event type.
    pub fn clear(&mut self, event_type: &str) {
        self.rings.remove(event_type);
    }

    /// The per-type cap.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}
