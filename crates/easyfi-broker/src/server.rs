//! Loopback WebSocket IPC server.
//!
//! One route, `/ipc`, upgrades to a WebSocket carrying JSON-RPC 2.0. Every
//! connection must present a window's session token and is bound to that
//! window for its lifetime.

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::operation::Operation;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};
use crate::session::SessionRegistry;
use crate::window::WindowId;
use crate::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use easyfi_core::config::IpcConfig;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// WebSocket route.
pub const IPC_PATH: &str = "/ipc";

/// Maximum connection attempts per second before rate limiting kicks in.
const MAX_CONNECTIONS_PER_SECOND: u64 = 10;

/// Server state shared by every connection.
pub struct ServerState {
    broker: Arc<Broker>,
    sessions: Arc<SessionRegistry>,
    config: IpcConfig,
    shutdown: CancellationToken,

    /// Connection counter for rate limiting.
    connection_count: AtomicU64,

    /// Last rate limit reset timestamp (unix seconds).
    rate_limit_reset: AtomicU64,
}

impl ServerState {
    pub fn new(
        config: IpcConfig,
        broker: Arc<Broker>,
        sessions: Arc<SessionRegistry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            broker,
            sessions,
            config,
            shutdown,
            connection_count: AtomicU64::new(0),
            rate_limit_reset: AtomicU64::new(0),
        }
    }

    /// Check and increment connection rate limit.
    fn check_rate_limit(&self) -> bool {
        let now = unix_seconds();
        let last_reset = self.rate_limit_reset.load(Ordering::Relaxed);
        if now > last_reset {
            self.rate_limit_reset.store(now, Ordering::Relaxed);
            self.connection_count.store(1, Ordering::Relaxed);
            true
        } else {
            let count = self.connection_count.fetch_add(1, Ordering::Relaxed);
            count < MAX_CONNECTIONS_PER_SECOND
        }
    }

    /// Resolve the presented session token to a window.
    ///
    /// The token comes from `?token=` or an `Authorization: Bearer` header.
    fn authenticate(
        &self,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
    ) -> std::result::Result<WindowId, BrokerError> {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        let presented = query
            .get("token")
            .map(String::as_str)
            .or(bearer)
            .ok_or_else(|| BrokerError::Unauthorized("missing session token".to_string()))?;

        self.sessions
            .authenticate(presented)
            .ok_or_else(|| BrokerError::Unauthorized("invalid session token".to_string()))
    }

    /// Validate the WebSocket Origin header against `allowed_origins`.
    fn validate_origin(&self, headers: &HeaderMap) -> bool {
        if self.config.allowed_origins.is_empty() {
            return true;
        }

        let origin = match headers.get("origin").and_then(|v| v.to_str().ok()) {
            Some(o) => o,
            None => return true, // Native UI process, no browser origin
        };

        if self
            .config
            .allowed_origins
            .iter()
            .any(|allowed| origin.starts_with(allowed.as_str()))
        {
            return true;
        }

        warn!("Rejected IPC connection from untrusted origin: {}", origin);
        false
    }
}

/// The bound IPC server, ready to serve.
pub struct IpcServer {
    state: Arc<ServerState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl IpcServer {
    /// Bind `127.0.0.1:<config.port>`. Port `0` picks an ephemeral port.
    pub async fn bind(
        config: IpcConfig,
        broker: Arc<Broker>,
        sessions: Arc<SessionRegistry>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.port));
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("IPC listener bound on {}", local_addr);

        Ok(Self {
            state: Arc::new(ServerState::new(config, broker, sessions, shutdown)),
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL UI processes connect to.
    pub fn url(&self) -> String {
        format!("ws://{}{}", self.local_addr, IPC_PATH)
    }

    fn router(state: Arc<ServerState>) -> Router {
        Router::new()
            .route(IPC_PATH, get(ws_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn serve(self) -> Result<()> {
        let shutdown = self.state.shutdown.clone();
        let app = Self::router(self.state);

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| BrokerError::Internal(e.to_string()))?;

        info!("IPC listener stopped");
        Ok(())
    }
}

/// WebSocket upgrade handler with authentication and origin validation.
async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Arc<ServerState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> std::result::Result<impl IntoResponse, StatusCode> {
    if state.shutdown.is_cancelled() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    if !state.check_rate_limit() {
        warn!("Rate limit exceeded for connection from {}", addr);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let connections = state.sessions.connection_count();
    if connections >= state.config.max_connections {
        warn!(
            "Max connections ({}) reached, rejecting {}",
            state.config.max_connections, addr
        );
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    if !state.validate_origin(&headers) {
        return Err(StatusCode::FORBIDDEN);
    }

    let window = match state.authenticate(&headers, &query) {
        Ok(window) => window,
        Err(e) => {
            warn!("Authentication failed from {}: {}", addr, e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, window, addr)))
}

/// Handle a WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    state: Arc<ServerState>,
    window: WindowId,
    remote_addr: SocketAddr,
) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let cancel = state.shutdown.child_token();
    let conn = state.sessions.attach(
        window,
        Some(remote_addr),
        outbound_tx.clone(),
        cancel.clone(),
    );

    info!("UI connected: {} for {} from {}", conn, window, remote_addr);

    // Single writer: responses and notifications share one ordered queue.
    // It runs until every sender is gone, so a response queued after
    // cancellation (the answer to `app:quit`) is still delivered.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
        let _ = sender.close().await;
    });

    let queues = ConnectionQueues {
        os_work: spawn_os_worker(state.broker.clone(), outbound_tx.clone()),
        outbound: outbound_tx,
    };

    let message_count = AtomicU64::new(0);
    let message_rate_reset = AtomicU64::new(0);

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = receiver.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                if !check_message_rate(
                    &message_count,
                    &message_rate_reset,
                    state.config.max_messages_per_second,
                ) {
                    warn!("{} exceeded its message budget", conn);
                    reject_rate_limited(&text, &queues.outbound);
                    continue;
                }
                handle_message(&text, &state, &queues).await;
            }
            Some(Ok(Message::Close(_))) | None => {
                debug!("{} closed by UI", conn);
                break;
            }
            Some(Err(e)) => {
                warn!("WebSocket error on {}: {}", conn, e);
                break;
            }
            Some(Ok(_)) => {}
        }
    }

    state.sessions.detach(conn);
    cancel.cancel();
    // The writer stops once the OS worker has answered its backlog.
    drop(queues);
    let _ = writer.await;

    info!("UI disconnected: {}", conn);
}

/// Check per-connection message rate limit.
fn check_message_rate(count: &AtomicU64, reset: &AtomicU64, max_per_second: u64) -> bool {
    let now = unix_seconds();
    let last_reset = reset.load(Ordering::Relaxed);
    if now > last_reset {
        reset.store(now, Ordering::Relaxed);
        count.store(1, Ordering::Relaxed);
        true
    } else {
        let c = count.fetch_add(1, Ordering::Relaxed);
        c < max_per_second
    }
}

fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Per-connection queues: the outbound frame queue and the OS worker's inbox.
struct ConnectionQueues {
    outbound: mpsc::UnboundedSender<String>,
    os_work: mpsc::UnboundedSender<OsJob>,
}

/// A clipboard or shell operation waiting for the connection's OS worker.
struct OsJob {
    id: Option<Value>,
    op: Operation,
}

/// Start the worker that runs a connection's clipboard and shell operations
/// one at a time, in arrival order.
fn spawn_os_worker(
    broker: Arc<Broker>,
    outbound: mpsc::UnboundedSender<String>,
) -> mpsc::UnboundedSender<OsJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<OsJob>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let result = broker.dispatch(job.op).await;
            respond(&outbound, job.id, result);
        }
    });
    tx
}

/// Answer a frame that arrived over budget. Notifications get nothing.
fn reject_rate_limited(text: &str, outbound: &mpsc::UnboundedSender<String>) {
    if let Ok(request) = JsonRpcRequest::decode(text) {
        if request.is_notification() {
            return;
        }
    }
    send_response(
        outbound,
        JsonRpcResponse::from_result(JsonRpcRequest::peek_id(text), Err(BrokerError::RateLimited)),
    );
}

/// Handle one JSON-RPC frame.
///
/// Vault, window and app operations run here, in arrival order. Clipboard and
/// shell operations go to the connection's OS worker, which keeps their order
/// without holding up the read loop.
async fn handle_message(text: &str, state: &Arc<ServerState>, queues: &ConnectionQueues) {
    let request = match JsonRpcRequest::decode(text) {
        Ok(request) => request,
        Err(e) => {
            debug!("Undecodable frame: {}", e.error.message);
            send_response(&queues.outbound, e.into_response());
            return;
        }
    };

    let id = request.id;
    let op = match Operation::parse(&request.method, request.params) {
        Ok(op) => op,
        Err(e) => {
            warn!(method = %request.method, kind = e.kind(), "Rejected request: {}", e);
            respond(&queues.outbound, id, Err(e));
            return;
        }
    };

    if op.kind().is_os_bound() {
        if let Err(mpsc::error::SendError(job)) = queues.os_work.send(OsJob { id, op }) {
            respond(&queues.outbound, job.id, Err(BrokerError::ChannelClosed));
        }
    } else {
        let result = state.broker.dispatch(op).await;
        respond(&queues.outbound, id, result);
    }
}

/// Queue a response unless the request was a notification.
fn respond(outbound: &mpsc::UnboundedSender<String>, id: Option<Value>, result: Result<Value>) {
    if id.is_none() {
        return;
    }
    send_response(outbound, JsonRpcResponse::from_result(id, result));
}

fn send_response(outbound: &mpsc::UnboundedSender<String>, response: JsonRpcResponse) {
    match serde_json::to_string(&response) {
        Ok(text) => {
            let _ = outbound.send(text);
        }
        Err(e) => error!("Failed to encode response: {}", e),
    }
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    serde_json::json!({
        "status": if state.shutdown.is_cancelled() { "stopping" } else { "ok" },
        "connections": state.sessions.connection_count(),
    })
    .to_string()
}
