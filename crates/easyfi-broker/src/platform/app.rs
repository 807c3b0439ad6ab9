//! Application identity and shutdown control.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Host-level application state shared by the broker, server and lifecycle.
pub struct AppControl {
    version: String,
    shutdown: CancellationToken,
    quitting: AtomicBool,
}

impl AppControl {
    /// Create a controller reporting `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            shutdown: CancellationToken::new(),
            quitting: AtomicBool::new(false),
        }
    }

    /// Host application version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Host platform identifier.
    pub fn platform(&self) -> &'static str {
        platform_name(std::env::consts::OS)
    }

    /// Begin shutdown. Idempotent.
    pub fn quit(&self) {
        if !self.quitting.swap(true, Ordering::SeqCst) {
            info!("Quit requested, shutting down");
            self.shutdown.cancel();
        }
    }

    /// Whether shutdown has begun.
    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl Default for AppControl {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

/// Map a Rust OS name onto the identifiers wallet UIs already expect
/// (`darwin`, `win32`, `linux`, ...).
pub fn platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_mapping() {
        assert_eq!(platform_name("macos"), "darwin");
        assert_eq!(platform_name("windows"), "win32");
        assert_eq!(platform_name("linux"), "linux");
        assert_eq!(platform_name("freebsd"), "freebsd");
    }

    #[test]
    fn test_platform_is_stable() {
        let app = AppControl::default();
        assert!(!app.platform().is_empty());
        assert_eq!(app.platform(), app.platform());
    }

    #[test]
    fn test_version_is_reported() {
        let app = AppControl::new("1.2.3");
        assert_eq!(app.version(), "1.2.3");
    }

    #[test]
    fn test_quit_is_idempotent_and_cancels() {
        let app = AppControl::default();
        let token = app.shutdown_token();
        assert!(!app.is_quitting());

        app.quit();
        app.quit();

        assert!(app.is_quitting());
        assert!(token.is_cancelled());
    }
}
