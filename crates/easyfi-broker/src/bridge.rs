//! UI-side bridge client.
//!
//! The typed surface an untrusted UI gets: one method per whitelisted
//! operation, grouped like the host capabilities, plus `on`/`once` listeners
//! for host notifications. Nothing else about the host is reachable.

use crate::operation::OperationKind;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse, ServerFrame};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors seen by the UI side.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unauthorized: the host rejected the session token")]
    Unauthorized,

    /// The host answered with a JSON-RPC error.
    #[error("{kind} ({code}): {message}")]
    Rejected {
        code: i32,
        kind: String,
        message: String,
    },

    #[error("channel closed")]
    Closed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Host error kind for rejections, `ChannelClosed` for a dead channel.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Rejected { kind, .. } => Some(kind.as_str()),
            Self::Closed => Some("ChannelClosed"),
            _ => None,
        }
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// How long [`BridgeClient::call`] waits for an answer by default.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Event listener callback. Receives the notification's positional arguments.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Identity of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

struct ListenerEntry {
    listener: Listener,
    once: bool,
}

/// Listeners keyed by `(channel, subscriber)`.
///
/// Listeners on a channel fire in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<BTreeMap<(String, SubscriberId), ListenerEntry>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, channel: &str, listener: Listener, once: bool) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .insert((channel.to_string(), id), ListenerEntry { listener, once });
        id
    }

    pub fn remove(&self, channel: &str, id: SubscriberId) -> bool {
        self.entries
            .lock()
            .remove(&(channel.to_string(), id))
            .is_some()
    }

    /// Invoke every listener on `channel`. One-shot listeners are removed
    /// before they run. Returns the number invoked.
    pub fn dispatch(&self, channel: &str, args: &[Value]) -> usize {
        let fire: Vec<Listener> = {
            let mut entries = self.entries.lock();
            let start = (channel.to_string(), SubscriberId(0));
            let end = (channel.to_string(), SubscriberId(u64::MAX));
            let matched: Vec<(SubscriberId, Listener, bool)> = entries
                .range(start..=end)
                .map(|((_, id), entry)| (*id, entry.listener.clone(), entry.once))
                .collect();
            for (id, _, once) in &matched {
                if *once {
                    entries.remove(&(channel.to_string(), *id));
                }
            }
            matched.into_iter().map(|(_, listener, _)| listener).collect()
        };

        for listener in &fire {
            listener(args);
        }
        fire.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Listeners registered on `channel`.
    pub fn count(&self, channel: &str) -> usize {
        self.entries
            .lock()
            .keys()
            .filter(|(c, _)| c == channel)
            .count()
    }
}

/// Handle to a registered listener. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription removes its listener; call detach() to keep it"]
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    channel: String,
    id: SubscriberId,
    active: bool,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the listener registered for the life of the connection.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn remove(&mut self) {
        if std::mem::take(&mut self.active) {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(&self.channel, self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Connection from a UI instance to the host.
pub struct BridgeClient {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Pending,
    listeners: Arc<ListenerRegistry>,
    next_id: AtomicU64,
    call_timeout: Duration,
    closed: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl BridgeClient {
    /// Connect to `url` (for example `ws://127.0.0.1:4100/ipc`) with a
    /// window's session token.
    pub async fn connect(url: &str, token: &str) -> BridgeResult<Self> {
        let mut target =
            url::Url::parse(url).map_err(|e| BridgeError::Connect(format!("{url}: {e}")))?;
        target.query_pairs_mut().append_pair("token", token);

        let (stream, _) = tokio_tungstenite::connect_async(target.as_str())
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(response) if response.status().as_u16() == 401 => {
                    BridgeError::Unauthorized
                }
                other => BridgeError::Connect(other.to_string()),
            })?;
        let (mut sink, mut source) = stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let listeners = Arc::new(ListenerRegistry::new());
        let closed = CancellationToken::new();

        let reader = {
            let pending = pending.clone();
            let listeners = listeners.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                while let Some(frame) = source.next().await {
                    match frame {
                        Ok(Message::Text(text)) => route_frame(&text, &pending, &listeners),
                        Ok(Message::Close(_)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                // Order matters: callers check `closed` after registering.
                closed.cancel();
                pending.lock().clear();
                listeners.clear();
                debug!("Bridge connection closed");
            })
        };

        Ok(Self {
            outbound,
            pending,
            listeners,
            next_id: AtomicU64::new(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            closed,
            reader,
            writer,
        })
    }

    /// Invoke an operation by name with positional arguments.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> BridgeResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        if self.closed.is_cancelled() {
            self.pending.lock().remove(&id);
            return Err(BridgeError::Closed);
        }

        let frame = serde_json::to_string(&JsonRpcRequest::call(id, method, args))?;
        if self.outbound.send(Message::Text(frame)).is_err() {
            self.pending.lock().remove(&id);
            return Err(BridgeError::Closed);
        }

        let response = match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(BridgeError::Closed),
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(BridgeError::Timeout(self.call_timeout));
            }
        };
        if let Some(error) = response.error {
            return Err(BridgeError::Rejected {
                code: error.code,
                kind: error.kind().unwrap_or("Unknown").to_string(),
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Give up on calls that get no answer within `timeout`.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn invoke(&self, kind: OperationKind, args: Vec<Value>) -> BridgeResult<Value> {
        self.call(kind.name(), args).await
    }

    /// Listen on `channel` until the returned [`Subscription`] is dropped.
    pub fn on<F>(&self, channel: &str, listener: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.subscribe(channel, Arc::new(listener), false)
    }

    /// Listen for the next event on `channel` only.
    pub fn once<F>(&self, channel: &str, listener: F) -> Subscription
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.subscribe(channel, Arc::new(listener), true)
    }

    fn subscribe(&self, channel: &str, listener: Listener, once: bool) -> Subscription {
        let id = self.listeners.add(channel, listener, once);
        Subscription {
            registry: Arc::downgrade(&self.listeners),
            channel: channel.to_string(),
            id,
            active: true,
        }
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Wait until the host closes the connection.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Close the connection and wait for both halves to finish.
    pub async fn close(self) {
        let _ = self.outbound.send(Message::Close(None));
        drop(self.outbound);
        let _ = self.writer.await;
        let _ = self.reader.await;
    }

    pub fn secure_storage(&self) -> SecureStorageApi<'_> {
        SecureStorageApi { client: self }
    }

    pub fn clipboard(&self) -> ClipboardApi<'_> {
        ClipboardApi { client: self }
    }

    pub fn app(&self) -> AppApi<'_> {
        AppApi { client: self }
    }

    pub fn window(&self) -> WindowApi<'_> {
        WindowApi { client: self }
    }

    pub fn shell(&self) -> ShellApi<'_> {
        ShellApi { client: self }
    }
}

fn route_frame(text: &str, pending: &Pending, listeners: &ListenerRegistry) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Notification(notification)) => {
            let channel = notification.method.clone();
            listeners.dispatch(&channel, &notification.into_args());
        }
        Ok(ServerFrame::Response(response)) => {
            let Some(id) = response.id.as_ref().and_then(Value::as_u64) else {
                match response.error {
                    Some(error) => warn!("Host rejected an unreadable frame: {}", error.message),
                    None => debug!("Dropping uncorrelated response"),
                }
                return;
            };
            if let Some(tx) = pending.lock().remove(&id) {
                let _ = tx.send(response);
            }
        }
        Err(e) => debug!("Ignoring malformed frame from host: {}", e),
    }
}

fn expect_string(kind: OperationKind, value: Value) -> BridgeResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(BridgeError::UnexpectedResult(format!(
            "{kind} returned {other}, expected a string"
        ))),
    }
}

fn expect_bool(kind: OperationKind, value: Value) -> BridgeResult<bool> {
    value.as_bool().ok_or_else(|| {
        BridgeError::UnexpectedResult(format!("{kind} returned {value}, expected a boolean"))
    })
}

/// `secure-storage:*`
pub struct SecureStorageApi<'a> {
    client: &'a BridgeClient,
}

impl SecureStorageApi<'_> {
    pub async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        let kind = OperationKind::StorageGet;
        match self.client.invoke(kind, vec![key.into()]).await? {
            Value::Null => Ok(None),
            other => expect_string(kind, other).map(Some),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::StorageSet, vec![key.into(), value.into()])
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::StorageDelete, vec![key.into()])
            .await?;
        Ok(())
    }

    pub async fn has(&self, key: &str) -> BridgeResult<bool> {
        let kind = OperationKind::StorageHas;
        let value = self.client.invoke(kind, vec![key.into()]).await?;
        expect_bool(kind, value)
    }
}

/// `clipboard:*`
pub struct ClipboardApi<'a> {
    client: &'a BridgeClient,
}

impl ClipboardApi<'_> {
    pub async fn write_text(&self, text: &str) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::ClipboardWrite, vec![text.into()])
            .await?;
        Ok(())
    }

    pub async fn read_text(&self) -> BridgeResult<String> {
        let kind = OperationKind::ClipboardRead;
        let value = self.client.invoke(kind, Vec::new()).await?;
        expect_string(kind, value)
    }
}

/// `app:*`
pub struct AppApi<'a> {
    client: &'a BridgeClient,
}

impl AppApi<'_> {
    pub async fn version(&self) -> BridgeResult<String> {
        let kind = OperationKind::AppVersion;
        let value = self.client.invoke(kind, Vec::new()).await?;
        expect_string(kind, value)
    }

    pub async fn platform(&self) -> BridgeResult<String> {
        let kind = OperationKind::AppPlatform;
        let value = self.client.invoke(kind, Vec::new()).await?;
        expect_string(kind, value)
    }

    pub async fn quit(&self) -> BridgeResult<()> {
        self.client.invoke(OperationKind::AppQuit, Vec::new()).await?;
        Ok(())
    }
}

/// `window:*`
pub struct WindowApi<'a> {
    client: &'a BridgeClient,
}

impl WindowApi<'_> {
    pub async fn minimize(&self) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::WindowMinimize, Vec::new())
            .await?;
        Ok(())
    }

    /// Toggles maximized/restored.
    pub async fn maximize(&self) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::WindowMaximize, Vec::new())
            .await?;
        Ok(())
    }

    pub async fn close(&self) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::WindowClose, Vec::new())
            .await?;
        Ok(())
    }

    pub async fn is_maximized(&self) -> BridgeResult<bool> {
        let kind = OperationKind::WindowIsMaximized;
        let value = self.client.invoke(kind, Vec::new()).await?;
        expect_bool(kind, value)
    }
}

/// `shell:*`
pub struct ShellApi<'a> {
    client: &'a BridgeClient,
}

impl ShellApi<'_> {
    pub async fn open_external(&self, url: &str) -> BridgeResult<()> {
        self.client
            .invoke(OperationKind::ShellOpenExternal, vec![url.into()])
            .await?;
        Ok(())
    }

    /// `""` on success, otherwise a diagnostic.
    pub async fn open_path(&self, path: &str) -> BridgeResult<String> {
        let kind = OperationKind::ShellOpenPath;
        let value = self.client.invoke(kind, vec![path.into()]).await?;
        expect_string(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&[Value]) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        (hits, move |_: &[Value]| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_only_matching_channel() {
        let registry = ListenerRegistry::new();
        let (hits, listener) = counter();
        registry.add("window:state-changed", Arc::new(listener), false);

        assert_eq!(registry.dispatch("window:state-changed", &[json!({})]), 1);
        assert_eq!(registry.dispatch("window:state", &[]), 0);
        assert_eq!(registry.dispatch("window:state-changed-x", &[]), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_once_fires_a_single_time() {
        let registry = ListenerRegistry::new();
        let (hits, listener) = counter();
        registry.add("tx:confirmed", Arc::new(listener), true);

        registry.dispatch("tx:confirmed", &[]);
        registry.dispatch("tx:confirmed", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let registry = ListenerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            registry.add("c", Arc::new(move |_: &[Value]| order.lock().push(n)), false);
        }
        registry.dispatch("c", &[]);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let registry = Arc::new(ListenerRegistry::new());
        let (_, listener) = counter();
        let id = registry.add("c", Arc::new(listener), false);
        let subscription = Subscription {
            registry: Arc::downgrade(&registry),
            channel: "c".to_string(),
            id,
            active: true,
        };
        assert_eq!(registry.count("c"), 1);
        drop(subscription);
        assert_eq!(registry.count("c"), 0);
    }

    #[test]
    fn test_subscription_detach_keeps_listener() {
        let registry = Arc::new(ListenerRegistry::new());
        let (_, listener) = counter();
        let id = registry.add("c", Arc::new(listener), false);
        Subscription {
            registry: Arc::downgrade(&registry),
            channel: "c".to_string(),
            id,
            active: true,
        }
        .detach();
        assert_eq!(registry.count("c"), 1);
    }

    #[test]
    fn test_route_frame_resolves_pending_call() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let listeners = ListenerRegistry::new();
        let (tx, mut rx) = oneshot::channel();
        pending.lock().insert(4, tx);

        route_frame(r#"{"jsonrpc":"2.0","id":4,"result":"1.0.0"}"#, &pending, &listeners);

        let response = rx.try_recv().unwrap();
        assert_eq!(response.result, Some(json!("1.0.0")));
        assert!(pending.lock().is_empty());
    }

    #[test]
    fn test_route_frame_dispatches_notification() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let listeners = ListenerRegistry::new();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        listeners.add(
            "window:state-changed",
            Arc::new(move |args: &[Value]| sink.lock().extend_from_slice(args)),
            false,
        );

        route_frame(
            r#"{"jsonrpc":"2.0","method":"window:state-changed","params":[{"maximized":true,"minimized":false}]}"#,
            &pending,
            &listeners,
        );

        assert_eq!(
            *captured.lock(),
            vec![json!({"maximized": true, "minimized": false})]
        );
    }

    #[test]
    fn test_rejected_error_kind() {
        let err = BridgeError::Rejected {
            code: -32601,
            kind: "UnknownOperation".into(),
            message: "Unknown operation: window:destroy".into(),
        };
        assert_eq!(err.kind(), Some("UnknownOperation"));
        assert_eq!(BridgeError::Closed.kind(), Some("ChannelClosed"));
    }

    #[tokio::test]
    async fn test_unanswered_call_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts the socket and reads frames without ever answering.
        let silent = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let client = BridgeClient::connect(&format!("ws://{addr}/ipc"), "token")
            .await
            .unwrap()
            .with_call_timeout(Duration::from_millis(100));

        let err = client.app().version().await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
        assert!(client.pending.lock().is_empty());

        client.close().await;
        silent.abort();
    }
}
