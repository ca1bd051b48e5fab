//! Sandbox lifecycle: attach to a running target, create a managed sandbox,
//! or fall back to the local filesystem.
//!
//! The manager resolves at most once per process. Concurrent callers of
//! [`ContainerLifecycleManager::ensure_context`] queue behind a single
//! initialization and all observe the same result. Every probe or creation
//! failure degrades to local mode; nothing here returns an error.

use codezilla_rs_config::SandboxConfig;
use codezilla_rs_protocol::SandboxContext;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use crate::cleanup;
use crate::error::SandboxError;
use crate::runtime::{ContainerRuntime, HelperMount, StartSpec};

/// File name of the helper binary shipped into sandboxes.
pub const HELPER_BINARY_NAME: &str = "codezilla-fs-helper";

/// Default upper bound for each teardown step.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminal (or not yet reached) lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No call has resolved the context yet.
    Uninitialized,
    /// Using an externally managed sandbox; never removed by this process.
    Attached,
    /// Using a sandbox this process created and must remove.
    Managed,
    /// No sandbox; operations use the host filesystem.
    Local,
}

/// Inputs of the attach/create decision.
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Sandbox to attach to when running; empty disables attaching.
    pub target_name: String,
    pub target_project_root: String,
    /// Create a managed sandbox when no target is running.
    pub auto_create: bool,
    pub image: String,
    pub managed_project_root: String,
    pub name_prefix: String,
    /// Host directory mounted into managed sandboxes.
    pub host_project_dir: PathBuf,
    /// Host helper binary, if one was found.
    pub helper_host_path: Option<PathBuf>,
    /// Helper location inside sandboxes.
    pub helper_sandbox_path: String,
    /// Install interrupt/terminate teardown once a managed sandbox exists.
    pub cleanup_on_signal: bool,
    /// How long teardown waits for an in-flight initialization, and for removal.
    pub teardown_timeout: Duration,
}

impl LifecycleOptions {
    /// Build options from the sandbox config section.
    pub fn from_config(config: &SandboxConfig, host_project_dir: PathBuf) -> Self {
        Self {
            target_name: config.target.name.clone(),
            target_project_root: config.target.project_root.clone(),
            auto_create: config.managed.auto_create,
            image: config.managed.image.clone(),
            managed_project_root: config.managed.project_root.clone(),
            name_prefix: config.managed.name_prefix.clone(),
            host_project_dir,
            helper_host_path: locate_helper(config.helper.host_path.as_deref()),
            helper_sandbox_path: config.helper.sandbox_path.clone(),
            cleanup_on_signal: config.cleanup_on_signal,
            teardown_timeout: TEARDOWN_TIMEOUT,
        }
    }

    /// Options that never attach and never create.
    pub fn local_only(mut self) -> Self {
        self.target_name.clear();
        self.auto_create = false;
        self
    }

    fn helper_mount(&self) -> Result<HelperMount, SandboxError> {
        let host_path = self.helper_host_path.clone().ok_or_else(|| {
            SandboxError::DependencyMissing(format!("{HELPER_BINARY_NAME} not found on host"))
        })?;
        Ok(HelperMount {
            host_path,
            sandbox_path: self.helper_sandbox_path.clone(),
        })
    }
}

/// Find the host helper: configured path, then next to the current executable, then PATH.
pub fn locate_helper(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        warn!("configured helper not found (path={})", path.display());
        return None;
    }
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(HELPER_BINARY_NAME)))
        .filter(|path| path.is_file());
    if sibling.is_some() {
        return sibling;
    }
    which::which(HELPER_BINARY_NAME).ok()
}

#[derive(Debug)]
struct ManagerState {
    state: LifecycleState,
    /// Sandbox created by this process.
    owned: Option<String>,
    cleanup_installed: bool,
}

/// Owns the process-wide sandbox context.
pub struct ContainerLifecycleManager {
    this: Weak<ContainerLifecycleManager>,
    runtime: Arc<dyn ContainerRuntime>,
    options: LifecycleOptions,
    /// Memoized outcome; set exactly once.
    resolved: OnceLock<Option<SandboxContext>>,
    /// Serializes initialization and orders teardown after it.
    init_lock: tokio::sync::Mutex<()>,
    state: Mutex<ManagerState>,
    cleaned_up: AtomicBool,
    teardown_done: tokio::sync::OnceCell<()>,
}

impl ContainerLifecycleManager {
    /// Create a manager; nothing is probed until the first `ensure_context`.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, options: LifecycleOptions) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            runtime,
            options,
            resolved: OnceLock::new(),
            init_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(ManagerState {
                state: LifecycleState::Uninitialized,
                owned: None,
                cleanup_installed: false,
            }),
            cleaned_up: AtomicBool::new(false),
            teardown_done: tokio::sync::OnceCell::new(),
        })
    }

    /// Runtime used for probing, creation and exec.
    pub fn runtime(&self) -> Arc<dyn ContainerRuntime> {
        self.runtime.clone()
    }

    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.lock().state
    }

    /// Name of the sandbox this process created and has not yet removed.
    pub fn owned_sandbox(&self) -> Option<String> {
        self.state.lock().owned.clone()
    }

    /// Whether teardown has started.
    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    /// Resolve the sandbox context, initializing on first use.
    ///
    /// Returns `None` when operations should use the local filesystem.
    pub async fn ensure_context(&self) -> Option<SandboxContext> {
        if let Some(resolved) = self.resolved.get() {
            return resolved.clone();
        }
        let _guard = self.init_lock.lock().await;
        if let Some(resolved) = self.resolved.get() {
            return resolved.clone();
        }
        if self.is_cleaned_up() {
            debug!("sandbox teardown started; using local filesystem");
            return None;
        }
        let outcome = self.initialize().await;
        self.resolved.get_or_init(|| outcome).clone()
    }

    async fn initialize(&self) -> Option<SandboxContext> {
        match self.attach().await {
            Ok(Some(context)) => {
                self.finish(LifecycleState::Attached);
                return Some(context);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    "attaching to target sandbox failed; using local filesystem (target={}, reason={})",
                    self.options.target_name, err
                );
                self.finish(LifecycleState::Local);
                return None;
            }
        }

        if !self.options.auto_create {
            info!("managed sandbox creation disabled; using local filesystem");
            self.finish(LifecycleState::Local);
            return None;
        }

        match self.create_managed().await {
            Ok(context) => {
                self.finish(LifecycleState::Managed);
                self.install_cleanup();
                Some(context)
            }
            Err(err) => {
                info!("sandbox unavailable; using local filesystem (reason={err})");
                self.finish(LifecycleState::Local);
                None
            }
        }
    }

    /// Attach to the target sandbox if it is running.
    async fn attach(&self) -> Result<Option<SandboxContext>, SandboxError> {
        let target = &self.options.target_name;
        if target.is_empty() {
            return Ok(None);
        }
        let running = match self.runtime.running_sandboxes().await {
            Ok(running) => running,
            Err(err) => {
                debug!("probing running sandboxes failed (reason={err})");
                return Ok(None);
            }
        };
        if !running.iter().any(|name| name == target) {
            info!("target sandbox not running (target={target})");
            return Ok(None);
        }

        let helper = self.options.helper_mount()?;
        self.runtime.install_helper(target, &helper).await?;
        info!(
            "attached to target sandbox (target={}, project_root={})",
            target, self.options.target_project_root
        );
        Ok(Some(SandboxContext {
            sandbox_id: target.clone(),
            project_root: self.options.target_project_root.clone(),
        }))
    }

    /// Start a sandbox owned by this process.
    async fn create_managed(&self) -> Result<SandboxContext, SandboxError> {
        self.runtime.ping().await?;
        let helper = self.options.helper_mount()?;

        if let Err(err) = self.runtime.pull_image(&self.options.image).await {
            debug!(
                "image pull failed; trying local image (image={}, reason={})",
                self.options.image, err
            );
        }

        let name = generate_sandbox_name(&self.options.name_prefix);
        if let Err(err) = self.runtime.remove(&name).await {
            debug!("no stale sandbox removed (name={name}, reason={err})");
        }

        let spec = StartSpec {
            name: name.clone(),
            image: self.options.image.clone(),
            host_project_dir: self.options.host_project_dir.clone(),
            project_root: self.options.managed_project_root.clone(),
            helper,
        };
        if self.is_cleaned_up() {
            return Err(SandboxError::Unavailable(
                "teardown started before the sandbox was created".to_string(),
            ));
        }
        self.runtime.start(&spec).await?;
        self.state.lock().owned = Some(name.clone());
        // Teardown may have given up waiting on us; whoever takes `owned` removes it.
        if self.is_cleaned_up() {
            let owned = self.state.lock().owned.take();
            if let Some(name) = owned {
                warn!("teardown started while creating sandbox; removing it (name={name})");
                self.remove_owned(&name).await;
            }
            return Err(SandboxError::Unavailable(
                "teardown started while the sandbox was being created".to_string(),
            ));
        }
        info!(
            "managed sandbox ready (name={}, image={}, project_root={})",
            name, self.options.image, self.options.managed_project_root
        );
        Ok(SandboxContext {
            sandbox_id: name,
            project_root: self.options.managed_project_root.clone(),
        })
    }

    fn finish(&self, state: LifecycleState) {
        self.state.lock().state = state;
    }

    fn install_cleanup(&self) {
        if !self.options.cleanup_on_signal {
            return;
        }
        {
            let mut state = self.state.lock();
            if state.cleanup_installed {
                return;
            }
            state.cleanup_installed = true;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        match cleanup::spawn_os_signal_cleanup(this) {
            Ok(_) => debug!("signal cleanup installed"),
            Err(err) => warn!("failed to install signal cleanup (reason={err})"),
        }
    }

    /// Remove the owned sandbox. Runs its body at most once per process.
    ///
    /// Every caller returns only after the teardown has finished. Returns
    /// true for the call that ran it. Once started, `ensure_context` stops
    /// creating sandboxes.
    pub async fn teardown(&self) -> bool {
        if self
            .cleaned_up
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("sandbox teardown requested");
        }
        let ran = AtomicBool::new(false);
        let ran_flag = &ran;
        self.teardown_done
            .get_or_init(|| async move {
                ran_flag.store(true, Ordering::SeqCst);
                self.teardown_owned().await;
            })
            .await;
        ran.load(Ordering::SeqCst)
    }

    async fn teardown_owned(&self) {
        // Wait out an in-flight initialization so a sandbox being created is recorded first.
        let wait = self.options.teardown_timeout;
        let _guard = match tokio::time::timeout(wait, self.init_lock.lock()).await {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("initialization still running at teardown; it will remove what it creates");
                None
            }
        };
        let owned = self.state.lock().owned.take();
        let Some(name) = owned else {
            debug!(
                "no owned sandbox to remove (state={:?})",
                self.state.lock().state
            );
            return;
        };
        self.remove_owned(&name).await;
    }

    async fn remove_owned(&self, name: &str) {
        info!("removing managed sandbox (name={name})");
        let wait = self.options.teardown_timeout;
        match tokio::time::timeout(wait, self.runtime.remove(name)).await {
            Ok(Ok(())) => info!("managed sandbox removed (name={name})"),
            Ok(Err(err)) => warn!("failed to remove managed sandbox (name={name}, reason={err})"),
            Err(_) => warn!("timed out removing managed sandbox (name={name})"),
        }
    }
}

/// `<prefix>-<pid>-<6 hex chars>`.
fn generate_sandbox_name(prefix: &str) -> String {
    let suffix = rand::random::<u32>() & 0x00ff_ffff;
    format!("{prefix}-{}-{suffix:06x}", std::process::id())
}
