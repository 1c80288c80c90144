//! # Realtime Gateway
//!
//! WebSocket endpoint through which external clients observe and drive the
//! runtime. Inbound traffic is a small set of JSON frames (`auth`,
//! `subscribe`, `unsubscribe`, `command`); outbound traffic is event
//! fan-out from the shared bus, either to every authenticated client or to
//! clients subscribed to a topic.
//!
//! Transport failures are connection-scoped: a malformed frame is logged
//! and dropped without closing the connection, and nothing internal ever
//! leaks back to a client.

pub mod gateway;
pub mod protocol;
pub mod sessions;

pub use gateway::{GatewayConfig, RealtimeGateway, DEFAULT_PORT};
pub use protocol::ClientFrame;
pub use sessions::{FrameSender, SessionRegistry};
