//! System clipboard access.
//!
//! [`CommandClipboard`] drives the platform's clipboard helper programs
//! (`pbcopy`/`pbpaste`, `wl-copy`/`wl-paste`, `xclip`, `xsel`, PowerShell).
//! Candidates are tried in order and a missing program falls through to the
//! next one.

use super::PlatformError;
use async_trait::async_trait;
use easyfi_core::SecretString;
use parking_lot::Mutex;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Plain-text clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents.
    async fn write_text(&self, text: &SecretString) -> Result<(), PlatformError>;

    /// Read the clipboard contents. An empty clipboard reads as `""`.
    async fn read_text(&self) -> Result<SecretString, PlatformError>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// One copy/paste program pair.
#[derive(Debug, Clone, Copy)]
pub struct ClipboardBackend {
    pub name: &'static str,
    pub copy: (&'static str, &'static [&'static str]),
    pub paste: (&'static str, &'static [&'static str]),
}

const PBCOPY: ClipboardBackend = ClipboardBackend {
    name: "pbcopy",
    copy: ("pbcopy", &[]),
    paste: ("pbpaste", &[]),
};

const WL_CLIPBOARD: ClipboardBackend = ClipboardBackend {
    name: "wl-clipboard",
    copy: ("wl-copy", &[]),
    paste: ("wl-paste", &["--no-newline"]),
};

const XCLIP: ClipboardBackend = ClipboardBackend {
    name: "xclip",
    copy: ("xclip", &["-selection", "clipboard", "-in"]),
    paste: ("xclip", &["-selection", "clipboard", "-out"]),
};

const XSEL: ClipboardBackend = ClipboardBackend {
    name: "xsel",
    copy: ("xsel", &["--clipboard", "--input"]),
    paste: ("xsel", &["--clipboard", "--output"]),
};

const POWERSHELL: ClipboardBackend = ClipboardBackend {
    name: "powershell",
    copy: (
        "powershell",
        &[
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "[Console]::InputEncoding=[Text.Encoding]::UTF8; Set-Clipboard -Value ([Console]::In.ReadToEnd())",
        ],
    ),
    paste: (
        "powershell",
        &[
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "[Console]::OutputEncoding=[Text.Encoding]::UTF8; Get-Clipboard -Raw",
        ],
    ),
};

/// Candidate backends for the current platform, most preferred first.
pub fn default_backends() -> Vec<ClipboardBackend> {
    if cfg!(target_os = "macos") {
        vec![PBCOPY]
    } else if cfg!(target_os = "windows") {
        vec![POWERSHELL]
    } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        vec![WL_CLIPBOARD, XCLIP, XSEL]
    } else {
        vec![XCLIP, XSEL, WL_CLIPBOARD]
    }
}

/// Clipboard backed by helper programs.
pub struct CommandClipboard {
    backends: Vec<ClipboardBackend>,
}

impl CommandClipboard {
    /// Use the platform's default candidates.
    pub fn detect() -> Self {
        Self::with_backends(default_backends())
    }

    pub fn with_backends(backends: Vec<ClipboardBackend>) -> Self {
        Self { backends }
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn write_text(&self, text: &SecretString) -> Result<(), PlatformError> {
        for backend in &self.backends {
            let (program, args) = backend.copy;
            let mut child = match Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
            {
                Ok(child) => child,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Clipboard backend {} not installed", backend.name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.expose_secret().as_bytes()).await?;
                stdin.shutdown().await?;
            }

            let output = child.wait_with_output().await?;
            if !output.status.success() {
                return Err(PlatformError::CommandFailed {
                    program: program.to_string(),
                    message: stderr_message(&output.stderr, output.status),
                });
            }
            return Ok(());
        }
        Err(PlatformError::Unavailable("clipboard"))
    }

    async fn read_text(&self) -> Result<SecretString, PlatformError> {
        for backend in &self.backends {
            let (program, args) = backend.paste;
            let output = match Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .output()
                .await
            {
                Ok(output) => output,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Clipboard backend {} not installed", backend.name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !output.status.success() {
                // wl-paste and xclip exit non-zero when the clipboard holds no text.
                if output.stdout.is_empty() && backend.name != "powershell" {
                    return Ok(SecretString::default());
                }
                return Err(PlatformError::CommandFailed {
                    program: program.to_string(),
                    message: stderr_message(&output.stderr, output.status),
                });
            }

            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            if backend.name == "powershell" && text.ends_with("\r\n") {
                text.truncate(text.len() - 2);
            }
            return Ok(SecretString::new(text));
        }
        Err(PlatformError::Unavailable("clipboard"))
    }

    fn name(&self) -> &str {
        self.backends.first().map(|b| b.name).unwrap_or("none")
    }
}

fn stderr_message(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let message = String::from_utf8_lossy(stderr).trim().to_string();
    if message.is_empty() {
        format!("exited with {status}")
    } else {
        message
    }
}

/// Process-local clipboard, for headless hosts and tests.
#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<SecretString>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &SecretString) -> Result<(), PlatformError> {
        *self.contents.lock() = text.clone();
        Ok(())
    }

    async fn read_text(&self) -> Result<SecretString, PlatformError> {
        Ok(self.contents.lock().clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
