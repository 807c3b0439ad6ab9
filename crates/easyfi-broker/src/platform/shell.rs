//! Handing URLs and paths to the desktop's default handlers.

use super::PlatformError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use url::Url;

/// Launcher for external URLs and local paths.
#[async_trait]
pub trait Shell: Send + Sync {
    /// Open `url` with the system's default handler for its scheme.
    async fn open_external(&self, url: &Url) -> Result<(), PlatformError>;

    /// Open `path` with the system's default application.
    async fn open_path(&self, path: &Path) -> Result<(), PlatformError>;
}

/// The real desktop launcher (`open`, `xdg-open`, `explorer`, via the `open` crate).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl SystemShell {
    async fn launch(target: OsString) -> Result<(), PlatformError> {
        tokio::task::spawn_blocking(move || open::that(&target))
            .await
            .map_err(|e| PlatformError::CommandFailed {
                program: "open".to_string(),
                message: e.to_string(),
            })??;
        Ok(())
    }
}

#[async_trait]
impl Shell for SystemShell {
    async fn open_external(&self, url: &Url) -> Result<(), PlatformError> {
        Self::launch(OsString::from(url.as_str())).await
    }

    async fn open_path(&self, path: &Path) -> Result<(), PlatformError> {
        Self::launch(path.as_os_str().to_os_string()).await
    }
}

/// A launch request captured by [`RecordingShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    External(String),
    Path(PathBuf),
}

/// Shell that records requests instead of launching anything.
///
/// Used by headless hosts and tests. Can be switched to fail every call.
#[derive(Debug, Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<ShellCall>>,
    failing: Mutex<Option<String>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent launch fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failing.lock() = Some(message.into());
    }

    /// Requests seen so far, oldest first.
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: ShellCall) -> Result<(), PlatformError> {
        if let Some(message) = self.failing.lock().clone() {
            return Err(PlatformError::CommandFailed {
                program: "recording-shell".to_string(),
                message,
            });
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl Shell for RecordingShell {
    async fn open_external(&self, url: &Url) -> Result<(), PlatformError> {
        self.record(ShellCall::External(url.to_string()))
    }

    async fn open_path(&self, path: &Path) -> Result<(), PlatformError> {
        self.record(ShellCall::Path(path.to_path_buf()))
    }
}
