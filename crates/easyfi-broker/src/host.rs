//! Host lifecycle.
//!
//! Startup order is fixed: the broker (and with it the whole operation
//! whitelist) exists before the IPC listener is bound, and the listener is
//! bound before the first window is created. After that the host reacts to
//! [`LifecycleEvent`]s until it quits.

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::handlers::ShellPolicy;
use crate::platform::{AppControl, Clipboard, Shell};
use crate::server::IpcServer;
use crate::session::SessionRegistry;
use crate::window::{
    HeadlessFactory, ProcessFactory, WindowFactory, WindowId, WindowManager, WindowSpec,
};
use crate::Result;
use easyfi_core::{Config, SecretString};
use easyfi_vault::Vault;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events that drive the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Registration finished and the listener is bound.
    Ready,
    /// The user re-activated the app (dock click); open a window if none.
    Activate,
    /// A window is gone.
    WindowClosed(WindowId),
    /// The UI tried to open a new window for `url`.
    ///
    /// Raised by the embedder's navigation hook through
    /// [`HostHandle::request_new_window`]. A UI running as a child process
    /// has no way to open windows, so nothing inside the host raises it.
    NewWindowRequested { url: String },
    /// Terminate the host once the events queued before it are handled.
    Quit,
}

/// Credentials a UI instance needs to reach the host.
#[derive(Debug, Clone)]
pub struct WindowSession {
    pub window: WindowId,
    pub url: String,
    pub token: SecretString,
}

/// Cloneable handle for driving a running host from outside.
#[derive(Clone)]
pub struct HostHandle {
    events: mpsc::UnboundedSender<LifecycleEvent>,
    app: Arc<AppControl>,
    windows: Arc<WindowManager>,
    sessions: Arc<SessionRegistry>,
    url: String,
}

impl HostHandle {
    pub fn activate(&self) {
        let _ = self.events.send(LifecycleEvent::Activate);
    }

    /// Hand a window-open attempt from the webview to the host, which
    /// denies it and passes `url` to the system browser when it is http(s).
    ///
    /// Embedders call this from their new-window or navigation handler.
    pub fn request_new_window(&self, url: impl Into<String>) {
        let _ = self.events.send(LifecycleEvent::NewWindowRequested { url: url.into() });
    }

    /// Ask the host to quit. Falls back to quitting directly when the event
    /// loop is already gone.
    pub fn quit(&self) {
        if self.events.send(LifecycleEvent::Quit).is_err() {
            self.app.quit();
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.app.is_quitting()
    }

    /// IPC endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn windows(&self) -> &Arc<WindowManager> {
        &self.windows
    }

    /// URL and token for the current main window.
    pub fn current_session(&self) -> Option<WindowSession> {
        let window = self.windows.current_id()?;
        let token = self.sessions.token_for(window)?;
        Some(WindowSession {
            window,
            url: self.url.clone(),
            token,
        })
    }
}

/// Builder for [`Host`].
pub struct HostBuilder {
    config: Config,
    version: String,
    vault: Option<Arc<dyn Vault>>,
    clipboard: Option<Arc<dyn Clipboard>>,
    shell: Option<Arc<dyn Shell>>,
}

impl HostBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
            vault: None,
            clipboard: None,
            shell: None,
        }
    }

    /// Version reported by `app:version`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

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

    /// Build the broker, bind the listener and open the first window.
    pub async fn start(self) -> Result<Host> {
        let config = self.config;
        let app = Arc::new(AppControl::new(self.version));
        let windows = Arc::new(WindowManager::new());
        let sessions = Arc::new(SessionRegistry::new());

        let mut builder = Broker::builder()
            .app(app.clone())
            .windows(windows.clone())
            .shell_policy(ShellPolicy::new(&config.shell.allowed_schemes));
        if let Some(vault) = self.vault {
            builder = builder.vault(vault);
        }
        if let Some(clipboard) = self.clipboard {
            builder = builder.clipboard(clipboard);
        }
        if let Some(shell) = self.shell {
            builder = builder.shell(shell);
        }
        let broker = Arc::new(builder.build());

        let server = IpcServer::bind(
            config.ipc.clone(),
            broker.clone(),
            sessions.clone(),
            app.shutdown_token(),
        )
        .await?;
        let url = server.url();
        let server_task = tokio::spawn(server.serve());

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let factory: Arc<dyn WindowFactory> = match config.window.ui_command.as_deref() {
            Some(command) if !config.window.headless => Arc::new(ProcessFactory::new(
                command,
                config.window.ui_args.clone(),
                events_tx.clone(),
                sessions.clone(),
            )),
            _ => Arc::new(HeadlessFactory::new(events_tx.clone(), sessions.clone())),
        };

        let host = Host {
            config,
            broker,
            sessions,
            windows,
            app,
            factory,
            url,
            events_tx,
            events_rx,
            server_task: Some(server_task),
        };

        if let Err(e) = host.handle_event(LifecycleEvent::Ready).await {
            host.app.quit();
            return Err(e);
        }
        Ok(host)
    }
}

/// A running wallet host.
pub struct Host {
    config: Config,
    broker: Arc<Broker>,
    sessions: Arc<SessionRegistry>,
    windows: Arc<WindowManager>,
    app: Arc<AppControl>,
    factory: Arc<dyn WindowFactory>,
    url: String,
    events_tx: mpsc::UnboundedSender<LifecycleEvent>,
    events_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    server_task: Option<JoinHandle<Result<()>>>,
}

impl Host {
    pub fn builder(config: Config) -> HostBuilder {
        HostBuilder::new(config)
    }

    pub fn handle(&self) -> HostHandle {
        HostHandle {
            events: self.events_tx.clone(),
            app: self.app.clone(),
            windows: self.windows.clone(),
            sessions: self.sessions.clone(),
            url: self.url.clone(),
        }
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Process lifecycle events until the host quits, then tear down.
    pub async fn run(mut self) -> Result<()> {
        let shutdown = self.app.shutdown_token();
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.events_rx.recv() => event,
            };
            let Some(event) = event else { break };
            if let Err(e) = self.handle_event(event).await {
                error!("Lifecycle event failed: {}", e);
            }
        }
        self.teardown().await
    }

    async fn handle_event(&self, event: LifecycleEvent) -> Result<()> {
        debug!("Lifecycle event: {:?}", event);
        match event {
            LifecycleEvent::Ready | LifecycleEvent::Activate => {
                if !self.windows.is_open() {
                    self.create_window().await?;
                }
            }
            LifecycleEvent::WindowClosed(id) => {
                self.windows.detach(id);
                self.sessions.revoke(id);
                info!("{} closed", id);
                if !self.windows.is_open() && self.should_quit_on_last_closed() {
                    self.app.quit();
                }
            }
            LifecycleEvent::NewWindowRequested { url } => {
                info!("Denied in-app window; redirecting to external handler");
                if let Err(e) = self.broker.redirect_new_window(&url).await {
                    warn!("Could not open external URL: {}", e);
                }
            }
            LifecycleEvent::Quit => self.app.quit(),
        }
        Ok(())
    }

    fn should_quit_on_last_closed(&self) -> bool {
        self.config.window.quit_on_last_closed && !cfg!(target_os = "macos")
    }

    async fn create_window(&self) -> Result<WindowId> {
        if self.app.is_quitting() {
            return Err(BrokerError::ChannelClosed);
        }

        let id = WindowId::next();
        let token = self.sessions.issue(id);
        let spec = WindowSpec {
            id,
            ipc_url: self.url.clone(),
            token,
            width: self.config.window.width,
            height: self.config.window.height,
        };

        match self.factory.create(spec).await {
            Ok(surface) => {
                self.windows.attach(surface);
                info!("Opened {}", id);
                Ok(id)
            }
            Err(e) => {
                self.sessions.revoke(id);
                Err(e.into())
            }
        }
    }

    async fn teardown(mut self) -> Result<()> {
        self.app.quit();
        self.windows.close();
        self.sessions.revoke_all();

        if let Some(task) = self.server_task.take() {
            match task.await {
                Ok(result) => result?,
                Err(e) => return Err(BrokerError::Internal(e.to_string())),
            }
        }
        info!("Host stopped");
        Ok(())
    }
}
