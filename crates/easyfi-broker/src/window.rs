//! Window surfaces and the main-window handle.
//!
//! A [`WindowSurface`] is whatever hosts one UI instance: a child UI process
//! or an in-process headless stand-in. [`WindowManager`] holds the single
//! main-window handle, which is absent before the first window is created
//! and after it closes. Every operation on it tolerates that absence.

use crate::host::LifecycleEvent;
use crate::platform::PlatformError;
use crate::session::SessionRegistry;
use async_trait::async_trait;
use easyfi_core::env::vars;
use easyfi_core::SecretString;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Notification channel carrying [`WindowState`] after every change.
pub const STATE_CHANNEL: &str = "window:state-changed";

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Host-assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Observable window state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowState {
    pub maximized: bool,
    pub minimized: bool,
}

/// One hosted UI instance.
pub trait WindowSurface: Send + Sync {
    fn id(&self) -> WindowId;
    fn minimize(&self);
    /// Maximize when not maximized, restore otherwise, as one step.
    /// Returns the new maximized state.
    fn toggle_maximize(&self) -> bool;
    fn state(&self) -> WindowState;
    /// Begin closing. The surface reports [`LifecycleEvent::WindowClosed`]
    /// once it is gone.
    fn close(&self);

    fn is_maximized(&self) -> bool {
        self.state().maximized
    }

    fn is_minimized(&self) -> bool {
        self.state().minimized
    }
}

/// What a factory needs to stand up a window.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub id: WindowId,
    pub ipc_url: String,
    pub token: SecretString,
    pub width: u32,
    pub height: u32,
}

/// Creates window surfaces.
#[async_trait]
pub trait WindowFactory: Send + Sync {
    async fn create(&self, spec: WindowSpec) -> Result<Arc<dyn WindowSurface>, PlatformError>;
}

/// State shared by both surface kinds: the flags plus change notification.
struct SurfaceState {
    id: WindowId,
    state: Mutex<WindowState>,
    sessions: Arc<SessionRegistry>,
}

impl SurfaceState {
    fn new(id: WindowId, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            id,
            state: Mutex::new(WindowState::default()),
            sessions,
        }
    }

    fn get(&self) -> WindowState {
        *self.state.lock()
    }

    /// Apply a change and, if anything changed, queue the notification
    /// before releasing the lock so notifications follow state order.
    fn update(&self, apply: impl FnOnce(&mut WindowState)) -> WindowState {
        let mut state = self.state.lock();
        let before = *state;
        apply(&mut state);
        let after = *state;
        if before != after {
            debug!("{} state {:?}", self.id, after);
            let payload = serde_json::to_value(after).unwrap_or_default();
            self.sessions.emit(self.id, STATE_CHANNEL, vec![payload]);
        }
        after
    }

    fn toggle_maximize(&self) -> bool {
        self.update(|s| {
            s.maximized = !s.maximized;
            if s.maximized {
                s.minimized = false;
            }
        })
        .maximized
    }
}

/// In-process window with no UI. Used by `--headless` hosts and tests.
pub struct HeadlessSurface {
    shared: SurfaceState,
    closed: AtomicBool,
    events: mpsc::UnboundedSender<LifecycleEvent>,
}

impl HeadlessSurface {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl WindowSurface for HeadlessSurface {
    fn id(&self) -> WindowId {
        self.shared.id
    }

    fn minimize(&self) {
        if !self.is_closed() {
            self.shared.update(|s| s.minimized = true);
        }
    }

    fn toggle_maximize(&self) -> bool {
        if self.is_closed() {
            return self.shared.get().maximized;
        }
        self.shared.toggle_maximize()
    }

    fn state(&self) -> WindowState {
        self.shared.get()
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(LifecycleEvent::WindowClosed(self.shared.id));
        }
    }
}

/// Factory for [`HeadlessSurface`]s.
pub struct HeadlessFactory {
    events: mpsc::UnboundedSender<LifecycleEvent>,
    sessions: Arc<SessionRegistry>,
}

impl HeadlessFactory {
    pub fn new(events: mpsc::UnboundedSender<LifecycleEvent>, sessions: Arc<SessionRegistry>) -> Self {
        Self { events, sessions }
    }
}

#[async_trait]
impl WindowFactory for HeadlessFactory {
    async fn create(&self, spec: WindowSpec) -> Result<Arc<dyn WindowSurface>, PlatformError> {
        info!("Created headless {} ({}x{})", spec.id, spec.width, spec.height);
        Ok(Arc::new(HeadlessSurface {
            shared: SurfaceState::new(spec.id, self.sessions.clone()),
            closed: AtomicBool::new(false),
            events: self.events.clone(),
        }))
    }
}

/// Window hosted by a child UI process.
///
/// The child learns where to connect from `EASYFI_IPC_URL` and
/// `EASYFI_IPC_TOKEN`. Window chrome is drawn by the child, so minimize and
/// maximize are tracked here and pushed to it over [`STATE_CHANNEL`].
pub struct ProcessSurface {
    shared: SurfaceState,
    kill: CancellationToken,
}

impl WindowSurface for ProcessSurface {
    fn id(&self) -> WindowId {
        self.shared.id
    }

    fn minimize(&self) {
        self.shared.update(|s| s.minimized = true);
    }

    fn toggle_maximize(&self) -> bool {
        self.shared.toggle_maximize()
    }

    fn state(&self) -> WindowState {
        self.shared.get()
    }

    fn close(&self) {
        self.kill.cancel();
    }
}

/// Factory that launches the configured UI command per window.
pub struct ProcessFactory {
    command: String,
    args: Vec<String>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
    sessions: Arc<SessionRegistry>,
}

impl ProcessFactory {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        events: mpsc::UnboundedSender<LifecycleEvent>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            events,
            sessions,
        }
    }
}

#[async_trait]
impl WindowFactory for ProcessFactory {
    async fn create(&self, spec: WindowSpec) -> Result<Arc<dyn WindowSurface>, PlatformError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env(vars::IPC_URL, &spec.ipc_url)
            .env(vars::IPC_TOKEN, spec.token.expose_secret())
            .env(vars::WINDOW_WIDTH, spec.width.to_string())
            .env(vars::WINDOW_HEIGHT, spec.height.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlatformError::CommandFailed {
                program: self.command.clone(),
                message: e.to_string(),
            })?;

        info!(
            "Launched UI process {} for {}",
            child.id().map(|p| p.to_string()).unwrap_or_default(),
            spec.id
        );

        let kill = CancellationToken::new();
        let watch = kill.clone();
        let events = self.events.clone();
        let id = spec.id;
        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = watch.cancelled() => None,
            };
            match exited {
                Some(Ok(status)) => info!("UI process for {} exited with {}", id, status),
                Some(Err(e)) => warn!("Lost track of UI process for {}: {}", id, e),
                None => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to stop UI process for {}: {}", id, e);
                    }
                }
            }
            let _ = events.send(LifecycleEvent::WindowClosed(id));
        });

        Ok(Arc::new(ProcessSurface {
            shared: SurfaceState::new(spec.id, self.sessions.clone()),
            kill,
        }))
    }
}

/// Holder of the main-window handle.
#[derive(Default)]
pub struct WindowManager {
    current: RwLock<Option<Arc<dyn WindowSurface>>>,
}

impl WindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `surface` as the main window, returning the one it replaces.
    pub fn attach(&self, surface: Arc<dyn WindowSurface>) -> Option<Arc<dyn WindowSurface>> {
        self.current.write().replace(surface)
    }

    /// Clear the handle if it still refers to `id`.
    pub fn detach(&self, id: WindowId) -> bool {
        let mut current = self.current.write();
        if current.as_ref().map(|w| w.id()) == Some(id) {
            *current = None;
            true
        } else {
            false
        }
    }

    /// The main window, if one exists.
    pub fn current(&self) -> Option<Arc<dyn WindowSurface>> {
        self.current.read().clone()
    }

    pub fn current_id(&self) -> Option<WindowId> {
        self.current.read().as_ref().map(|w| w.id())
    }

    pub fn is_open(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn minimize(&self) {
        if let Some(window) = self.current() {
            window.minimize();
        }
    }

    /// Maximize when not maximized, restore otherwise. Returns the new state,
    /// or `false` when there is no window.
    pub fn toggle_maximize(&self) -> bool {
        self.current()
            .map(|window| window.toggle_maximize())
            .unwrap_or(false)
    }

    pub fn close(&self) {
        if let Some(window) = self.current() {
            window.close();
        }
    }

    /// `false` when there is no window.
    pub fn is_maximized(&self) -> bool {
        self.current().map(|w| w.is_maximized()).unwrap_or(false)
    }
}
