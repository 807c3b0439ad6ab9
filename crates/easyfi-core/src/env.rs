//! Environment variable handling.

use std::env;

/// Variables the host reads.
pub mod vars {
    /// Config file override.
    pub const CONFIG: &str = "EASYFI_CONFIG";
    /// IPC port override.
    pub const PORT: &str = "EASYFI_PORT";
    /// UI process command override.
    pub const UI_COMMAND: &str = "EASYFI_UI_COMMAND";
    /// Log level override.
    pub const LOG: &str = "EASYFI_LOG";
    /// Hex-encoded vault master key.
    pub const MASTER_KEY: &str = "EASYFI_MASTER_KEY";
    /// IPC endpoint handed to a spawned UI process.
    pub const IPC_URL: &str = "EASYFI_IPC_URL";
    /// Session token handed to a spawned UI process.
    pub const IPC_TOKEN: &str = "EASYFI_IPC_TOKEN";
    /// Window width handed to a spawned UI process.
    pub const WINDOW_WIDTH: &str = "EASYFI_WINDOW_WIDTH";
    /// Window height handed to a spawned UI process.
    pub const WINDOW_HEIGHT: &str = "EASYFI_WINDOW_HEIGHT";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a u16 (e.g., for ports).
pub fn get_u16(name: &str) -> Option<u16> {
    get_var(name).and_then(|v| v.parse().ok())
}
