//! Gateway wire protocol.
//!
//! All frames are JSON text. Inbound frames carry a `type` discriminator;
//! outbound frames are built here so every reply shape lives in one place.

use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::now_millis;

/// Inbound client frames, dispatched on the `type` field.
///
/// Anything that fails to parse into one of these (invalid JSON, unknown
/// type, missing fields) is logged and dropped by the caller.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Request an auth token for this connection.
    Auth,
    /// Add a topic to the session's subscription set.
    Subscribe { topic: String },
    /// Remove a topic from the session's subscription set.
    Unsubscribe { topic: String },
    /// Republish a command onto the event bus.
    Command {
        command: String,
        #[serde(default = "empty_params")]
        params: Value,
    },
}

fn empty_params() -> Value {
    json!({})
}

/// Welcome frame sent immediately after a connection is accepted.
pub fn connection_frame(client_id: &str, auth_required: bool) -> Value {
    json!({
        "type": "connection",
        "clientId": client_id,
        "authRequired": auth_required,
        "timestamp": now_millis(),
    })
}

/// Successful auth reply carrying the issued token.
pub fn auth_success_frame(token: &str) -> Value {
    json!({
        "type": "auth",
        "success": true,
        "token": token,
        "timestamp": now_millis(),
    })
}

/// Acknowledgement for a subscribe or unsubscribe request.
pub fn topic_ack_frame(frame_type: &str, topic: &str) -> Value {
    json!({
        "type": frame_type,
        "topic": topic,
        "success": true,
        "timestamp": now_millis(),
    })
}

/// Receipt confirming a command was republished on the bus.
pub fn command_receipt_frame(command: &str) -> Value {
    json!({
        "type": "command",
        "command": command,
        "received": true,
        "timestamp": now_millis(),
    })
}

/// Topic broadcast frame for clients subscribed to `topic`.
pub fn event_frame(topic: &str, data: Value) -> Value {
    json!({
        "type": "event",
        "topic": topic,
        "data": data,
        "timestamp": now_millis(),
    })
}

/// Global broadcast frame; the event type doubles as the frame type.
pub fn global_frame(event_type: &str, data: Value) -> Value {
    json!({
        "type": event_type,
        "data": data,
        "timestamp": now_millis(),
    })
}
