//! `shell:*` handlers and the URL scheme policy.

use crate::error::BrokerError;
use crate::platform::Shell;
use crate::Result;
use easyfi_core::config::normalize_scheme;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Which URL schemes `shell:openExternal` may hand to the OS.
#[derive(Debug, Clone)]
pub struct ShellPolicy {
    allowed_schemes: Vec<String>,
}

impl ShellPolicy {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_schemes: schemes
                .into_iter()
                .map(|s| normalize_scheme(s.as_ref()))
                .collect(),
        }
    }

    /// Parse `raw` and check its scheme.
    pub fn check(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw)
            .map_err(|e| BrokerError::InvalidArgument(format!("invalid URL: {e}")))?;
        if !self.allowed_schemes.iter().any(|s| s == url.scheme()) {
            return Err(BrokerError::InvalidArgument(format!(
                "URL scheme '{}' is not allowed",
                url.scheme()
            )));
        }
        Ok(url)
    }

    pub fn allowed_schemes(&self) -> &[String] {
        &self.allowed_schemes
    }
}

impl Default for ShellPolicy {
    fn default() -> Self {
        Self::new(["http", "https", "mailto"])
    }
}

pub async fn open_external(shell: &dyn Shell, policy: &ShellPolicy, raw: &str) -> Result<Value> {
    let url = policy.check(raw)?;
    shell.open_external(&url).await?;
    info!(scheme = url.scheme(), host = url.host_str().unwrap_or(""), "Opened external URL");
    Ok(Value::Null)
}

/// Resolves to `""` on success and to a diagnostic string otherwise.
pub async fn open_path(shell: &dyn Shell, path: &Path) -> Result<Value> {
    if path.as_os_str().is_empty() {
        return Ok(Value::String("Failed to open path: empty path".to_string()));
    }

    let status = match tokio::fs::try_exists(path).await {
        Ok(true) => match shell.open_path(path).await {
            Ok(()) => String::new(),
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                format!("Failed to open path: {e}")
            }
        },
        Ok(false) => format!("Failed to open path: {} does not exist", path.display()),
        Err(e) => format!("Failed to open path: {e}"),
    };
    Ok(Value::String(status))
}
