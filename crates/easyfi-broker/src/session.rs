//! Window sessions and live UI connections.
//!
//! Every window gets its own session token. A connection that presents the
//! token is bound to that window; revoking the window cancels its
//! connections and drops their listeners with them.

use crate::rpc::JsonRpcNotification;
use crate::window::WindowId;
use easyfi_core::SecretString;
use parking_lot::RwLock;
use rand::RngCore;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Length of a session token in random bytes (hex-encoded on the wire).
pub const TOKEN_BYTES: usize = 32;

/// Identifier of one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    window: WindowId,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

/// Registry of window tokens and the connections bound to them.
pub struct SessionRegistry {
    tokens: RwLock<HashMap<WindowId, SecretString>>,
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    next_connection: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        }
    }

    /// Issue a fresh token for `window`, replacing any previous one.
    pub fn issue(&self, window: WindowId) -> SecretString {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = SecretString::new(hex::encode(bytes));
        self.tokens.write().insert(window, token.clone());
        debug!("Issued session token for {}", window);
        token
    }

    /// The current token for `window`.
    pub fn token_for(&self, window: WindowId) -> Option<SecretString> {
        self.tokens.read().get(&window).cloned()
    }

    /// Resolve a presented token to its window.
    ///
    /// Every stored token is compared in constant time.
    pub fn authenticate(&self, presented: &str) -> Option<WindowId> {
        let tokens = self.tokens.read();
        let mut found = None;
        for (window, token) in tokens.iter() {
            if token.matches(presented) {
                found = Some(*window);
            }
        }
        found
    }

    /// Bind a new connection to `window`.
    pub fn attach(
        &self,
        window: WindowId,
        remote_addr: Option<SocketAddr>,
        outbound: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> ConnectionId {
        let id = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        match remote_addr {
            Some(addr) => debug!("Attached {} from {} to {}", id, addr, window),
            None => debug!("Attached {} to {}", id, window),
        }
        self.connections.write().insert(
            id,
            Connection {
                window,
                outbound,
                cancel,
            },
        );
        id
    }

    /// Forget a connection.
    pub fn detach(&self, id: ConnectionId) {
        self.connections.write().remove(&id);
    }

    /// Invalidate `window`'s token and close every connection bound to it.
    ///
    /// Returns the number of connections closed.
    pub fn revoke(&self, window: WindowId) -> usize {
        self.tokens.write().remove(&window);

        let mut connections = self.connections.write();
        let doomed: Vec<ConnectionId> = connections
            .iter()
            .filter(|(_, c)| c.window == window)
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            if let Some(conn) = connections.remove(id) {
                conn.cancel.cancel();
            }
        }

        if !doomed.is_empty() {
            info!("Closed {} connection(s) for {}", doomed.len(), window);
        }
        doomed.len()
    }

    /// Revoke every window.
    pub fn revoke_all(&self) {
        let windows: Vec<WindowId> = self.tokens.read().keys().copied().collect();
        for window in windows {
            self.revoke(window);
        }
        for (_, conn) in self.connections.write().drain() {
            conn.cancel.cancel();
        }
    }

    /// Push a notification to every connection of `window`.
    ///
    /// Returns the number of connections it was queued for.
    pub fn emit(&self, window: WindowId, channel: &str, args: Vec<Value>) -> usize {
        let frame = match serde_json::to_string(&JsonRpcNotification::new(channel, args)) {
            Ok(frame) => frame,
            Err(_) => return 0,
        };

        let connections = self.connections.read();
        connections
            .values()
            .filter(|c| c.window == window)
            .filter(|c| c.outbound.send(frame.clone()).is_ok())
            .count()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}
