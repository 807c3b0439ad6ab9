//! OS capabilities the broker fronts.
//!
//! Each capability is a trait so the broker can run against the real
//! desktop or against in-process stand-ins (headless mode and tests).

pub mod app;
pub mod clipboard;
pub mod shell;

pub use app::AppControl;
pub use clipboard::{Clipboard, CommandClipboard, MemoryClipboard};
pub use shell::{RecordingShell, Shell, ShellCall, SystemShell};

use crate::error::BrokerError;
use thiserror::Error;

/// Failures reported by platform backends.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// No backend for this capability exists on the current system.
    #[error("no {0} backend available")]
    Unavailable(&'static str),

    /// A helper program ran but reported failure.
    #[error("{program} failed: {message}")]
    CommandFailed { program: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PlatformError> for BrokerError {
    fn from(err: PlatformError) -> Self {
        Self::OsOperationFailed(err.to_string())
    }
}
