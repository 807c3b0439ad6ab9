//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main EasyFi host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// IPC channel settings.
    #[serde(default)]
    pub ipc: IpcConfig,

    /// UI surface settings.
    #[serde(default)]
    pub window: WindowConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Shell capability settings.
    #[serde(default)]
    pub shell: ShellConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// IPC channel configuration.
///
/// The listener always binds to 127.0.0.1; there is deliberately no bind
/// address option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Port number. `0` picks an ephemeral port.
    #[serde(default)]
    pub port: u16,

    /// Maximum concurrent UI connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Per-connection message budget per second.
    #[serde(default = "default_max_messages_per_second")]
    pub max_messages_per_second: u64,

    /// Allowed `Origin` header prefixes. Empty means the session token alone
    /// gates access.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            port: 0,
            max_connections: default_max_connections(),
            max_messages_per_second: default_max_messages_per_second(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_max_connections() -> usize {
    8
}

fn default_max_messages_per_second() -> u64 {
    120
}

/// UI surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Command that launches the UI process for a window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_command: Option<String>,

    /// Extra arguments for the UI command.
    #[serde(default)]
    pub ui_args: Vec<String>,

    /// Initial width in logical pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Initial height in logical pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Run without launching a UI process.
    #[serde(default)]
    pub headless: bool,

    /// Quit the host when the last window closes (ignored on macOS, where
    /// the app stays alive until explicitly quit).
    #[serde(default = "default_true")]
    pub quit_on_last_closed: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            ui_command: None,
            ui_args: Vec::new(),
            width: default_width(),
            height: default_height(),
            headless: false,
            quit_on_last_closed: true,
        }
    }
}

fn default_width() -> u32 {
    900
}

fn default_height() -> u32 {
    670
}

fn default_true() -> bool {
    true
}

/// Credential vault configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: VaultBackend,

    /// Directory for the file backend (defaults to ~/.easyfi/vault).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Vault storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultBackend {
    /// Volatile, process-lifetime storage.
    #[default]
    Memory,

    /// Encrypted files, master key in the OS keyring.
    File,
}

/// Shell capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// URL schemes `shell:openExternal` may hand to the OS.
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
        }
    }
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string(), "mailto".to_string()]
}

/// Schemes that may never be handed to the OS, whatever the config says.
pub const FORBIDDEN_SCHEMES: &[&str] = &["file", "javascript", "data"];

/// Canonical form of a configured scheme: trimmed, lowercase, without the
/// trailing `:`. `" HTTPS: "` becomes `"https"`.
pub fn normalize_scheme(raw: &str) -> String {
    raw.trim().trim_end_matches(':').to_ascii_lowercase()
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}
