//! Shared harness for the integration tests: a headless host on an
//! ephemeral loopback port with in-memory OS capabilities.

use easyfi_broker::platform::{Clipboard, MemoryClipboard, RecordingShell};
use easyfi_broker::{BridgeClient, Host, HostHandle, WindowSession};
use easyfi_core::Config;
use easyfi_vault::Vault;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Version the harness host reports for `app:version`.
pub const TEST_VERSION: &str = "9.9.9-test";

/// How long a test waits on the host before declaring it stuck.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A running headless host.
pub struct TestHost {
    pub handle: HostHandle,
    pub shell: Arc<RecordingShell>,
    pub clipboard: Arc<dyn Clipboard>,
    task: JoinHandle<easyfi_broker::Result<()>>,
}

impl TestHost {
    /// Session of the current main window.
    pub fn session(&self) -> WindowSession {
        self.handle
            .current_session()
            .expect("host has an open window")
    }

    /// Connect a bridge client as the current main window.
    pub async fn connect(&self) -> BridgeClient {
        let session = self.session();
        BridgeClient::connect(&session.url, session.token.expose_secret())
            .await
            .expect("bridge connects")
    }

    /// Wait for the host to finish on its own.
    pub async fn join(self) -> easyfi_broker::Result<()> {
        tokio::time::timeout(TIMEOUT, self.task)
            .await
            .expect("host stops in time")
            .expect("host task does not panic")
    }

    /// Quit the host and wait for teardown.
    pub async fn shutdown(self) {
        self.handle.quit();
        self.join().await.expect("clean shutdown");
    }
}

/// Default configuration for a headless host.
pub fn headless_config() -> Config {
    let mut config = Config::default();
    config.window.headless = true;
    config
}

/// Start a host with `config` and an optional vault override.
pub async fn start_host(config: Config, vault: Option<Arc<dyn Vault>>) -> TestHost {
    start_host_with_clipboard(config, vault, Arc::new(MemoryClipboard::new())).await
}

/// Start a host backed by the given clipboard.
pub async fn start_host_with_clipboard(
    config: Config,
    vault: Option<Arc<dyn Vault>>,
    clipboard: Arc<dyn Clipboard>,
) -> TestHost {
    let shell = Arc::new(RecordingShell::new());

    let mut builder = Host::builder(config)
        .version(TEST_VERSION)
        .clipboard(clipboard.clone())
        .shell(shell.clone());
    if let Some(vault) = vault {
        builder = builder.vault(vault);
    }

    let host = builder.start().await.expect("host starts");
    let handle = host.handle();
    let task = tokio::spawn(host.run());

    TestHost {
        handle,
        shell,
        clipboard,
        task,
    }
}

/// Start a headless host with default settings.
pub async fn start_default() -> TestHost {
    start_host(headless_config(), None).await
}
