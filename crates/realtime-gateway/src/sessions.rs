//! Client session registry.
//!
//! Tracks every connected client, its authentication state, its topic
//! subscriptions, and the auth tokens issued to it. Outbound frames go
//! through each session's unbounded channel so broadcasting never blocks
//! on a slow socket.

use dashmap::DashMap;
use rand::RngCore;
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sender half of a connection's outbound frame channel.
pub type FrameSender = mpsc::UnboundedSender<String>;

struct Session {
    tx: FrameSender,
    authenticated: bool,
    topics: HashSet<String>,
}

/// All connected clients plus the issued-token table.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    /// Token to client id.
    tokens: DashMap<String, String>,
    auth_required: bool,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(auth_required: bool) -> Self {
        Self {
            sessions: DashMap::new(),
            tokens: DashMap::new(),
            auth_required,
        }
    }

    /// Record a new session. Sessions start authenticated when auth is
    /// not required.
    pub fn register(&self, client_id: impl Into<String>, tx: FrameSender) {
        self.sessions.insert(
            client_id.into(),
            Session {
                tx,
                authenticated: !self.auth_required,
                topics: HashSet::new(),
            },
        );
    }

    /// Drop a session and prune every token issued to it.
    pub fn remove(&self, client_id: &str) {
        self.sessions.remove(client_id);
        self.tokens.retain(|_, id| id != client_id);
    }

    /// Mark a session authenticated and issue it a fresh opaque token.
    pub fn authenticate(&self, client_id: &str) -> Option<String> {
        let mut session = self.sessions.get_mut(client_id)?;
        session.authenticated = true;
        drop(session);

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.tokens.insert(token.clone(), client_id.to_string());
        Some(token)
    }

    #[must_use]
    pub fn is_authenticated(&self, client_id: &str) -> bool {
        self.sessions
            .get(client_id)
            .is_some_and(|s| s.authenticated)
    }

    /// Add a topic to a session's subscription set.
    pub fn subscribe_topic(&self, client_id: &str, topic: &str) -> bool {
        match self.sessions.get_mut(client_id) {
            Some(mut session) => {
                session.topics.insert(topic.to_string());
                true
            }
            None => false,
        }
    }

    /// Remove a topic from a session's subscription set.
    pub fn unsubscribe_topic(&self, client_id: &str, topic: &str) -> bool {
        match self.sessions.get_mut(client_id) {
            Some(mut session) => {
                session.topics.remove(topic);
                true
            }
            None => false,
        }
    }

    /// Send a frame to a single client.
    pub fn send_to(&self, client_id: &str, frame: &Value) {
        let Some(session) = self.sessions.get(client_id) else {
            warn!(client = %client_id, "Attempted to send to unknown client");
            return;
        };
        if session.tx.send(frame.to_string()).is_err() {
            debug!(client = %client_id, "Outbound channel closed");
        }
    }

    /// Send a frame to every authenticated client.
    pub fn broadcast_to_all(&self, frame: &Value) {
        let text = frame.to_string();
        for session in self.sessions.iter() {
            if session.authenticated {
                let _ = session.tx.send(text.clone());
            }
        }
    }

    /// Send a frame to every authenticated client subscribed to `topic`.
    pub fn broadcast_to_subscribers(&self, topic: &str, frame: &Value) {
        let text = frame.to_string();
        for session in self.sessions.iter() {
            if session.authenticated && session.topics.contains(topic) {
                let _ = session.tx.send(text.clone());
            }
        }
    }

    /// Drop every session, closing all outbound channels.
    pub fn clear(&self) {
        self.sessions.clear();
        self.tokens.clear();
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}
