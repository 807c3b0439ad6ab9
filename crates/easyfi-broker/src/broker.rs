//! Exhaustive dispatch from typed operations onto host capabilities.

use crate::error::BrokerError;
use crate::handlers::{self, ShellPolicy};
use crate::operation::Operation;
use crate::platform::{AppControl, Clipboard, CommandClipboard, Shell, SystemShell};
use crate::window::WindowManager;
use crate::Result;
use easyfi_vault::{MemoryVault, Vault};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// The privileged operation broker.
///
/// Holds every capability the UI can reach. The set of operations is the
/// compile-time [`Operation`] enum; nothing is registered at runtime.
pub struct Broker {
    vault: Arc<dyn Vault>,
    clipboard: Arc<dyn Clipboard>,
    shell: Arc<dyn Shell>,
    shell_policy: ShellPolicy,
    app: Arc<AppControl>,
    windows: Arc<WindowManager>,
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Parse and execute a request.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let op = Operation::parse(method, params).map_err(|e| {
            warn!(method, kind = e.kind(), "Rejected request: {}", e);
            e
        })?;
        self.dispatch(op).await
    }

    /// Execute a parsed operation.
    pub async fn dispatch(&self, op: Operation) -> Result<Value> {
        if self.app.is_quitting() {
            return Err(BrokerError::ChannelClosed);
        }

        let kind = op.kind();
        debug!(operation = kind.name(), "Dispatching");

        let result = match op {
            Operation::StorageGet { key } => handlers::storage::get(self.vault.as_ref(), &key).await,
            Operation::StorageSet { key, value } => {
                handlers::storage::set(self.vault.as_ref(), &key, value).await
            }
            Operation::StorageDelete { key } => {
                handlers::storage::delete(self.vault.as_ref(), &key).await
            }
            Operation::StorageHas { key } => handlers::storage::has(self.vault.as_ref(), &key).await,
            Operation::ClipboardWrite { text } => {
                handlers::clipboard::write(self.clipboard.as_ref(), &text).await
            }
            Operation::ClipboardRead => handlers::clipboard::read(self.clipboard.as_ref()).await,
            Operation::AppVersion => handlers::app::version(&self.app),
            Operation::AppPlatform => handlers::app::platform(&self.app),
            Operation::AppQuit => handlers::app::quit(&self.app),
            Operation::WindowMinimize => handlers::window::minimize(&self.windows),
            Operation::WindowMaximize => handlers::window::maximize(&self.windows),
            Operation::WindowClose => handlers::window::close(&self.windows),
            Operation::WindowIsMaximized => handlers::window::is_maximized(&self.windows),
            Operation::ShellOpenExternal { url } => {
                handlers::shell::open_external(self.shell.as_ref(), &self.shell_policy, &url).await
            }
            Operation::ShellOpenPath { path } => {
                handlers::shell::open_path(self.shell.as_ref(), &path).await
            }
        };

        if let Err(ref e) = result {
            warn!(operation = kind.name(), kind = e.kind(), "Operation failed: {}", e);
        }
        result
    }

    /// Route a window-open request from the UI to the external handler.
    ///
    /// The host never opens a second in-app window for a link; the request
    /// is always denied and the URL, if allowed, goes to the OS instead.
    pub async fn redirect_new_window(&self, url: &str) -> Result<()> {
        handlers::shell::open_external(self.shell.as_ref(), &self.shell_policy, url).await?;
        Ok(())
    }

    pub fn vault(&self) -> &Arc<dyn Vault> {
        &self.vault
    }

    pub fn app(&self) -> &Arc<AppControl> {
        &self.app
    }

    pub fn windows(&self) -> &Arc<WindowManager> {
        &self.windows
    }
}

/// Builder for [`Broker`]. Unset capabilities fall back to the real desktop
/// (or, for the vault, the volatile in-memory store).
#[derive(Default)]
pub struct BrokerBuilder {
    vault: Option<Arc<dyn Vault>>,
    clipboard: Option<Arc<dyn Clipboard>>,
    shell: Option<Arc<dyn Shell>>,
    shell_policy: Option<ShellPolicy>,
    app: Option<Arc<AppControl>>,
    windows: Option<Arc<WindowManager>>,
}

impl BrokerBuilder {
    pub fn vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = Some(shell);
        self
    }

    pub fn shell_policy(mut self, policy: ShellPolicy) -> Self {
        self.shell_policy = Some(policy);
        self
    }

    pub fn app(mut self, app: Arc<AppControl>) -> Self {
        self.app = Some(app);
        self
    }

    pub fn windows(mut self, windows: Arc<WindowManager>) -> Self {
        self.windows = Some(windows);
        self
    }

    pub fn build(self) -> Broker {
        let vault = self
            .vault
            .unwrap_or_else(|| Arc::new(MemoryVault::new()) as Arc<dyn Vault>);
        debug!(backend = vault.backend(), "Broker ready");
        Broker {
            vault,
            clipboard: self
                .clipboard
                .unwrap_or_else(|| Arc::new(CommandClipboard::detect()) as Arc<dyn Clipboard>),
            shell: self
                .shell
                .unwrap_or_else(|| Arc::new(SystemShell) as Arc<dyn Shell>),
            shell_policy: self.shell_policy.unwrap_or_default(),
            app: self.app.unwrap_or_default(),
            windows: self.windows.unwrap_or_default(),
        }
    }
}
