//! The gateway service: axum WebSocket server, per-connection frame
//! dispatch, and bus fan-out.
//!
//! The frame layer is socket-free: [`RealtimeGateway::open_session`],
//! [`RealtimeGateway::handle_frame`], and
//! [`RealtimeGateway::close_session`] carry the whole protocol, and the
//! WebSocket plumbing only moves text in and out of them. Tests drive the
//! same layer without a listener.

use crate::protocol::{self, ClientFrame};
use crate::sessions::SessionRegistry;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::RngCore;
use serde_json::Value;
use shared_bus::{EventBus, SubscriptionId};
use shared_types::event::event_types;
use shared_types::{now_millis, EventPayload, EventPriority, Service, ServiceError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Component name stamped on published events.
const SOURCE: &str = "realtime-gateway";

/// Gateway configuration supplied by the shell layer.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port to listen on; 0 picks an ephemeral port.
    pub port: u16,
    /// TLS flag; termination is not handled in-process.
    pub tls_enabled: bool,
    /// Whether clients must authenticate before subscribing or sending
    /// commands.
    pub auth_required: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tls_enabled: false,
            auth_required: false,
        }
    }
}

struct GatewayInner {
    bus: Arc<EventBus>,
    config: GatewayConfig,
    sessions: SessionRegistry,
    bus_subscriptions: Mutex<Vec<SubscriptionId>>,
}

struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The realtime gateway service.
pub struct RealtimeGateway {
    inner: Arc<GatewayInner>,
    server: Mutex<Option<ServerHandle>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl RealtimeGateway {
    /// Create a gateway over the shared bus.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, config: GatewayConfig) -> Self {
        let sessions = SessionRegistry::new(config.auth_required);
        Self {
            inner: Arc::new(GatewayInner {
                bus,
                config,
                sessions,
                bus_subscriptions: Mutex::new(Vec::new()),
            }),
            server: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Address the listener is bound to while the gateway is running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.sessions.client_count()
    }

    /// Register a new session and deliver the welcome frame.
    ///
    /// Returns the generated client id and the receiver carrying every
    /// outbound frame for this connection.
    pub fn open_session(&self) -> (String, mpsc::UnboundedReceiver<String>) {
        self.inner.open_session()
    }

    /// Dispatch one inbound text frame for a connected client.
    pub fn handle_frame(&self, client_id: &str, text: &str) {
        self.inner.handle_frame(client_id, text);
    }

    /// Remove a session and every auth token issued to it.
    pub fn close_session(&self, client_id: &str) {
        self.inner.close_session(client_id);
    }
}

impl GatewayInner {
    fn open_session(&self) -> (String, mpsc::UnboundedReceiver<String>) {
        let client_id = generate_client_id();
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.register(&client_id, tx);
        self.sessions.send_to(
            &client_id,
            &protocol::connection_frame(&client_id, self.config.auth_required),
        );
        info!(client = %client_id, "New gateway connection");
        (client_id, rx)
    }

    fn close_session(&self, client_id: &str) {
        self.sessions.remove(client_id);
        info!(client = %client_id, "Gateway connection closed");
    }

    fn handle_frame(&self, client_id: &str, text: &str) {
        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(client = %client_id, error = %e, "Dropping malformed frame");
                return;
            }
        };

        match frame {
            ClientFrame::Auth => self.handle_auth(client_id),
            ClientFrame::Subscribe { topic } => self.handle_topic(client_id, &topic, true),
            ClientFrame::Unsubscribe { topic } => self.handle_topic(client_id, &topic, false),
            ClientFrame::Command { command, params } => {
                self.handle_command(client_id, &command, params);
            }
        }
    }

    fn handle_auth(&self, client_id: &str) {
        // Credential validation is delegated to the shell layer; any auth
        // attempt on an open session is accepted and issued a token.
        let Some(token) = self.sessions.authenticate(client_id) else {
            warn!(client = %client_id, "Auth frame from unknown client");
            return;
        };
        self.sessions
            .send_to(client_id, &protocol::auth_success_frame(&token));
        info!(client = %client_id, "Client authenticated");
    }

    fn handle_topic(&self, client_id: &str, topic: &str, subscribe: bool) {
        if !self.auth_gate(client_id) {
            return;
        }

        let (changed, frame_type) = if subscribe {
            (self.sessions.subscribe_topic(client_id, topic), "subscribe")
        } else {
            (
                self.sessions.unsubscribe_topic(client_id, topic),
                "unsubscribe",
            )
        };
        if !changed {
            return;
        }

        self.sessions
            .send_to(client_id, &protocol::topic_ack_frame(frame_type, topic));
        debug!(client = %client_id, topic = %topic, frame = %frame_type, "Topic set updated");
    }

    fn handle_command(&self, client_id: &str, command: &str, params: Value) {
        if !self.auth_gate(client_id) {
            return;
        }

        info!(client = %client_id, command = %command, "Republishing client command");
        self.bus.publish_from(
            event_types::COMMAND,
            EventPayload::Command {
                command: command.to_string(),
                params,
                client_id: client_id.to_string(),
                timestamp_ms: now_millis(),
            },
            EventPriority::Normal,
            SOURCE,
        );
        self.sessions
            .send_to(client_id, &protocol::command_receipt_frame(command));
    }

    /// Silently drop frames from unauthenticated clients when auth is
    /// required. No reply is sent, per the wire contract.
    fn auth_gate(&self, client_id: &str) -> bool {
        if self.config.auth_required && !self.sessions.is_authenticated(client_id) {
            debug!(client = %client_id, "Dropping frame from unauthenticated client");
            return false;
        }
        true
    }
}

fn generate_client_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Pump one WebSocket connection through the frame layer.
async fn handle_socket(inner: Arc<GatewayInner>, socket: WebSocket) {
    let (client_id, mut outbound) = inner.open_session();
    let (mut sink, mut stream) = socket.split();

    // Writer task: forwards outbound frames, then closes the socket when
    // the session's channel is dropped.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => inner.handle_frame(&client_id, &text),
            Ok(Message::Close(_)) => {
                debug!(client = %client_id, "Close frame received");
                break;
            }
            // Pings are answered by the protocol layer.
            Ok(_) => {}
            Err(e) => {
                warn!(client = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer.abort();
    inner.close_session(&client_id);
}

#[async_trait]
impl Service for RealtimeGateway {
    async fn initialize(&self) -> Result<(), ServiceError> {
        info!("Initializing realtime gateway");

        let inner = Arc::clone(&self.inner);
        let metrics_sub = self.inner.bus.subscribe(event_types::RESOURCE_METRICS, move |event| {
            let data = serde_json::to_value(&event.payload)?;
            inner.sessions.broadcast_to_subscribers(
                event_types::RESOURCE_METRICS,
                &protocol::event_frame(event_types::RESOURCE_METRICS, data),
            );
            Ok(())
        });

        let inner = Arc::clone(&self.inner);
        let status_sub = self.inner.bus.subscribe(event_types::SYSTEM_STATUS, move |event| {
            let data = serde_json::to_value(&event.payload)?;
            inner
                .sessions
                .broadcast_to_all(&protocol::global_frame(event_types::SYSTEM_STATUS, data));
            Ok(())
        });

        self.inner
            .bus_subscriptions
            .lock()
            .extend([metrics_sub, status_sub]);
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        info!(port = self.inner.config.port, "Starting realtime gateway");
        if self.inner.config.tls_enabled {
            warn!("tls_enabled is set but in-process TLS termination is not implemented");
        }

        let addr = SocketAddr::from(([127, 0, 0, 1], self.inner.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::start(format!("cannot bind gateway port: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| ServiceError::start(format!("cannot read local address: {e}")))?;
        *self.local_addr.lock() = Some(local);

        let inner = Arc::clone(&self.inner);
        let router = Router::new().route(
            "/ws",
            get(move |ws: WebSocketUpgrade| {
                let inner = Arc::clone(&inner);
                async move { ws.on_upgrade(move |socket| handle_socket(inner, socket)) }
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "Gateway server error");
            }
        });

        *self.server.lock() = Some(ServerHandle { shutdown_tx, task });
        info!(addr = %local, "Realtime gateway listening");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        info!("Stopping realtime gateway");

        let subscriptions: Vec<SubscriptionId> =
            std::mem::take(&mut *self.inner.bus_subscriptions.lock());
        for id in subscriptions {
            self.inner.bus.unsubscribe(id);
        }

        // Dropping the outbound channels makes every writer task send a
        // close frame, force-closing the clients.
        self.inner.sessions.clear();

        if let Some(server) = self.server.lock().take() {
            let _ = server.shutdown_tx.send(());
            server.task.abort();
        }
        *self.local_addr.lock() = None;
        Ok(())
    }
}
