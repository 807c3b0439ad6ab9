//! # easyfi-broker
//!
//! The privileged side of the EasyFi wallet host. The UI runs untrusted and
//! reaches host capabilities only through a fixed set of named operations
//! carried over an authenticated loopback WebSocket:
//!
//! - **Operations**: the closed whitelist in [`operation`], parsed into typed
//!   requests before any handler runs
//! - **Broker**: exhaustive dispatch onto the vault, clipboard, shell, app and
//!   window capabilities
//! - **Server**: JSON-RPC 2.0 framing, session tokens, per-window connections
//!   and host-to-UI notifications
//! - **Host**: application lifecycle and window bookkeeping
//! - **Bridge**: the UI-side client with typed operation groups and
//!   `on`/`once` listeners

pub mod bridge;
pub mod broker;
pub mod error;
pub mod handlers;
pub mod host;
pub mod operation;
pub mod platform;
pub mod rpc;
pub mod server;
pub mod session;
pub mod window;

pub use bridge::{BridgeClient, BridgeError, ListenerRegistry, Subscription};
pub use broker::{Broker, BrokerBuilder};
pub use error::BrokerError;
pub use host::{Host, HostBuilder, HostHandle, LifecycleEvent, WindowSession};
pub use operation::{Operation, OperationKind};
pub use server::IpcServer;
pub use session::SessionRegistry;
pub use window::{WindowId, WindowManager, WindowState, WindowSurface};

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
