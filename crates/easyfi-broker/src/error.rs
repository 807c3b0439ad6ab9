//! Broker error types.
//!
//! Every failure that reaches the UI is one of these variants. The numeric
//! code goes out as the JSON-RPC `error.code` and [`BrokerError::kind`] as
//! `error.data.kind`.

use easyfi_vault::VaultError;
use thiserror::Error;

/// Errors that can occur while serving a UI request.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The requested name is not in the operation whitelist.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Wrong arity, wrong argument type, or a value the operation refuses.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying OS capability failed.
    #[error("OS operation failed: {0}")]
    OsOperationFailed(String),

    /// The host is shutting down or the UI connection is gone.
    #[error("Channel closed")]
    ChannelClosed,

    /// Missing or wrong session token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Per-connection message budget exhausted.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON frame.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownOperation(_) => -32601,
            Self::InvalidArgument(_) => -32602,
            Self::Json(_) => -32700,
            Self::Unauthorized(_) => -32001,
            Self::OsOperationFailed(_) => -32010,
            Self::ChannelClosed => -32012,
            Self::RateLimited => -32000,
            Self::Io(_) | Self::Internal(_) => -32603,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation(_) => "UnknownOperation",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::OsOperationFailed(_) => "OSOperationFailed",
            Self::ChannelClosed => "ChannelClosed",
            Self::Unauthorized(_) => "Unauthorized",
            Self::RateLimited => "RateLimited",
            Self::Json(_) => "ParseError",
            Self::Io(_) | Self::Internal(_) => "Internal",
        }
    }
}

impl From<VaultError> for BrokerError {
    fn from(err: VaultError) -> Self {
        Self::OsOperationFailed(format!("vault: {err}"))
    }
}
