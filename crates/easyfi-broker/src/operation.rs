//! The operation whitelist.
//!
//! The UI can name exactly the operations listed in [`OperationKind::ALL`].
//! A request is parsed into a typed [`Operation`] before any handler runs, so
//! unknown names and malformed arguments never reach a capability.

use crate::error::BrokerError;
use crate::Result;
use easyfi_core::SecretString;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Capability group an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Vault,
    Clipboard,
    App,
    Window,
    Shell,
}

/// Name-level identity of a whitelisted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    StorageGet,
    StorageSet,
    StorageDelete,
    StorageHas,
    ClipboardWrite,
    ClipboardRead,
    AppVersion,
    AppPlatform,
    AppQuit,
    WindowMinimize,
    WindowMaximize,
    WindowClose,
    WindowIsMaximized,
    ShellOpenExternal,
    ShellOpenPath,
}

impl OperationKind {
    /// Every operation the UI may invoke.
    pub const ALL: [OperationKind; 15] = [
        Self::StorageGet,
        Self::StorageSet,
        Self::StorageDelete,
        Self::StorageHas,
        Self::ClipboardWrite,
        Self::ClipboardRead,
        Self::AppVersion,
        Self::AppPlatform,
        Self::AppQuit,
        Self::WindowMinimize,
        Self::WindowMaximize,
        Self::WindowClose,
        Self::WindowIsMaximized,
        Self::ShellOpenExternal,
        Self::ShellOpenPath,
    ];

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::StorageGet => "secure-storage:get",
            Self::StorageSet => "secure-storage:set",
            Self::StorageDelete => "secure-storage:delete",
            Self::StorageHas => "secure-storage:has",
            Self::ClipboardWrite => "clipboard:write",
            Self::ClipboardRead => "clipboard:read",
            Self::AppVersion => "app:version",
            Self::AppPlatform => "app:platform",
            Self::AppQuit => "app:quit",
            Self::WindowMinimize => "window:minimize",
            Self::WindowMaximize => "window:maximize",
            Self::WindowClose => "window:close",
            Self::WindowIsMaximized => "window:isMaximized",
            Self::ShellOpenExternal => "shell:openExternal",
            Self::ShellOpenPath => "shell:openPath",
        }
    }

    /// Look up a wire name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Positional parameter names. The operation's arity is the length.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Self::StorageGet | Self::StorageDelete | Self::StorageHas => &["key"],
            Self::StorageSet => &["key", "value"],
            Self::ClipboardWrite => &["text"],
            Self::ShellOpenExternal => &["url"],
            Self::ShellOpenPath => &["path"],
            _ => &[],
        }
    }

    /// One-line description for listings.
    pub fn description(self) -> &'static str {
        match self {
            Self::StorageGet => "Read a vault entry; null when absent",
            Self::StorageSet => "Create or overwrite a vault entry",
            Self::StorageDelete => "Remove a vault entry; no-op when absent",
            Self::StorageHas => "Report whether a vault entry exists",
            Self::ClipboardWrite => "Replace the system clipboard text",
            Self::ClipboardRead => "Read the system clipboard text",
            Self::AppVersion => "Host application version",
            Self::AppPlatform => "Host platform identifier",
            Self::AppQuit => "Terminate the host application",
            Self::WindowMinimize => "Minimize the main window",
            Self::WindowMaximize => "Toggle the main window's maximized state",
            Self::WindowClose => "Close the main window",
            Self::WindowIsMaximized => "Report whether the main window is maximized",
            Self::ShellOpenExternal => "Open a URL in the default external handler",
            Self::ShellOpenPath => "Open a filesystem path; returns an error string or \"\"",
        }
    }

    /// Capability group.
    pub fn category(self) -> Category {
        match self {
            Self::StorageGet | Self::StorageSet | Self::StorageDelete | Self::StorageHas => {
                Category::Vault
            }
            Self::ClipboardWrite | Self::ClipboardRead => Category::Clipboard,
            Self::AppVersion | Self::AppPlatform | Self::AppQuit => Category::App,
            Self::WindowMinimize
            | Self::WindowMaximize
            | Self::WindowClose
            | Self::WindowIsMaximized => Category::Window,
            Self::ShellOpenExternal | Self::ShellOpenPath => Category::Shell,
        }
    }

    /// Whether the operation waits on an external OS facility.
    ///
    /// These run off the connection's request loop so a slow launcher cannot
    /// hold up vault or window requests queued behind it.
    pub fn is_os_bound(self) -> bool {
        matches!(self.category(), Category::Clipboard | Category::Shell)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed, well-typed request.
///
/// Secret-bearing arguments are held as [`SecretString`] so `{:?}` never
/// prints them.
#[derive(Debug, Clone)]
pub enum Operation {
    StorageGet { key: String },
    StorageSet { key: String, value: SecretString },
    StorageDelete { key: String },
    StorageHas { key: String },
    ClipboardWrite { text: SecretString },
    ClipboardRead,
    AppVersion,
    AppPlatform,
    AppQuit,
    WindowMinimize,
    WindowMaximize,
    WindowClose,
    WindowIsMaximized,
    ShellOpenExternal { url: String },
    ShellOpenPath { path: PathBuf },
}

impl Operation {
    /// Parse a method name and JSON-RPC params into an operation.
    ///
    /// `params` may be absent, `null`, or a positional array whose length
    /// matches the operation's arity exactly.
    pub fn parse(method: &str, params: Option<Value>) -> Result<Self> {
        let kind = OperationKind::from_name(method)
            .ok_or_else(|| BrokerError::UnknownOperation(method.to_string()))?;
        let mut args = Arguments::new(kind, params)?;

        let op = match kind {
            OperationKind::StorageGet => Self::StorageGet {
                key: args.string(0)?,
            },
            OperationKind::StorageSet => Self::StorageSet {
                key: args.string(0)?,
                value: SecretString::new(args.string(1)?),
            },
            OperationKind::StorageDelete => Self::StorageDelete {
                key: args.string(0)?,
            },
            OperationKind::StorageHas => Self::StorageHas {
                key: args.string(0)?,
            },
            OperationKind::ClipboardWrite => Self::ClipboardWrite {
                text: SecretString::new(args.string(0)?),
            },
            OperationKind::ClipboardRead => Self::ClipboardRead,
            OperationKind::AppVersion => Self::AppVersion,
            OperationKind::AppPlatform => Self::AppPlatform,
            OperationKind::AppQuit => Self::AppQuit,
            OperationKind::WindowMinimize => Self::WindowMinimize,
            OperationKind::WindowMaximize => Self::WindowMaximize,
            OperationKind::WindowClose => Self::WindowClose,
            OperationKind::WindowIsMaximized => Self::WindowIsMaximized,
            OperationKind::ShellOpenExternal => Self::ShellOpenExternal {
                url: args.string(0)?,
            },
            OperationKind::ShellOpenPath => Self::ShellOpenPath {
                path: PathBuf::from(args.string(0)?),
            },
        };
        Ok(op)
    }

    /// The operation's kind.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::StorageGet { .. } => OperationKind::StorageGet,
            Self::StorageSet { .. } => OperationKind::StorageSet,
            Self::StorageDelete { .. } => OperationKind::StorageDelete,
            Self::StorageHas { .. } => OperationKind::StorageHas,
            Self::ClipboardWrite { .. } => OperationKind::ClipboardWrite,
            Self::ClipboardRead => OperationKind::ClipboardRead,
            Self::AppVersion => OperationKind::AppVersion,
            Self::AppPlatform => OperationKind::AppPlatform,
            Self::AppQuit => OperationKind::AppQuit,
            Self::WindowMinimize => OperationKind::WindowMinimize,
            Self::WindowMaximize => OperationKind::WindowMaximize,
            Self::WindowClose => OperationKind::WindowClose,
            Self::WindowIsMaximized => OperationKind::WindowIsMaximized,
            Self::ShellOpenExternal { .. } => OperationKind::ShellOpenExternal,
            Self::ShellOpenPath { .. } => OperationKind::ShellOpenPath,
        }
    }
}

/// Positional arguments checked against an operation's arity.
struct Arguments {
    kind: OperationKind,
    values: Vec<Value>,
}

impl Arguments {
    fn new(kind: OperationKind, params: Option<Value>) -> Result<Self> {
        let values = match params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(_) => {
                return Err(BrokerError::InvalidArgument(format!(
                    "{kind} expects positional arguments"
                )))
            }
        };

        let expected = kind.params();
        if values.len() != expected.len() {
            return Err(BrokerError::InvalidArgument(format!(
                "{kind} expects {} argument(s) ({}), got {}",
                expected.len(),
                expected.join(", "),
                values.len()
            )));
        }

        Ok(Self { kind, values })
    }

    fn string(&mut self, index: usize) -> Result<String> {
        match std::mem::take(&mut self.values[index]) {
            Value::String(s) => Ok(s),
            other => Err(BrokerError::InvalidArgument(format!(
                "{}: argument '{}' must be a string, got {}",
                self.kind,
                self.kind.params()[index],
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
