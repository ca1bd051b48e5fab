use async_trait::async_trait;
use codezilla_rs_protocol::{ExecResult, RemoteOp, path};
use codezilla_rs_sandbox::helper;
use codezilla_rs_sandbox::{ContainerRuntime, HelperMount, SandboxError, StartSpec};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A sandbox known to the fake: a project root backed by a host directory.
#[derive(Debug, Clone)]
struct FakeSandbox {
    project_root: String,
    host_dir: PathBuf,
    /// Helper path inside the sandbox once mounted or installed.
    helper: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    probes: AtomicUsize,
    pings: AtomicUsize,
    pulls: AtomicUsize,
    starts: AtomicUsize,
    installs: AtomicUsize,
    removes: AtomicUsize,
    execs: AtomicUsize,
}

/// In-process container runtime for tests.
///
/// Sandboxes are host directories; `exec` runs the real helper operations
/// against them. Every trait call is counted.
#[derive(Debug)]
pub struct FakeRuntime {
    reachable: bool,
    fail_start: bool,
    fail_install: bool,
    probe_delay: Duration,
    start_delay: Duration,
    sandboxes: Mutex<HashMap<String, FakeSandbox>>,
    started: Mutex<Vec<StartSpec>>,
    removed: Mutex<Vec<String>>,
    counters: Counters,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    /// A reachable runtime with no running sandboxes.
    pub fn new() -> Self {
        Self {
            reachable: true,
            fail_start: false,
            fail_install: false,
            probe_delay: Duration::ZERO,
            start_delay: Duration::ZERO,
            sandboxes: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            counters: Counters::default(),
        }
    }

    /// Simulate a runtime whose daemon cannot be reached.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Make `start` fail.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make `install_helper` fail.
    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    /// Delay probes so concurrent callers pile up behind initialization.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Delay `start` before the sandbox comes up, like a slow `docker run`.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Pretend an externally managed sandbox is running.
    pub fn with_running_target(
        self,
        name: &str,
        project_root: &str,
        host_dir: impl Into<PathBuf>,
    ) -> Self {
        self.sandboxes.lock().insert(
            name.to_string(),
            FakeSandbox {
                project_root: project_root.to_string(),
                host_dir: host_dir.into(),
                helper: None,
            },
        );
        self
    }

    pub fn probes(&self) -> usize {
        self.counters.probes.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.counters.pings.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.counters.pulls.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.counters.starts.load(Ordering::SeqCst)
    }

    pub fn installs(&self) -> usize {
        self.counters.installs.load(Ordering::SeqCst)
    }

    /// Remove attempts, including ones for unknown sandboxes.
    pub fn removes(&self) -> usize {
        self.counters.removes.load(Ordering::SeqCst)
    }

    pub fn execs(&self) -> usize {
        self.counters.execs.load(Ordering::SeqCst)
    }

    /// Every call made through the runtime trait.
    pub fn total_calls(&self) -> usize {
        self.probes()
            + self.pings()
            + self.pulls()
            + self.starts()
            + self.installs()
            + self.removes()
            + self.execs()
    }

    /// Specs of successfully started sandboxes.
    pub fn started(&self) -> Vec<StartSpec> {
        self.started.lock().clone()
    }

    /// Names of sandboxes that were running when removed.
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }

    /// Names of currently running sandboxes.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sandboxes.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn unreachable_error(&self) -> SandboxError {
        SandboxError::Unavailable("Cannot connect to the fake daemon".to_string())
    }
}

fn failed(exit_code: i32, message: impl Into<String>) -> ExecResult {
    ExecResult {
        stdout: Vec::new(),
        stderr: message.into().into_bytes(),
        exit_code: Some(exit_code),
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn running_sandboxes(&self) -> Result<Vec<String>, SandboxError> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        if !self.reachable {
            return Err(self.unreachable_error());
        }
        Ok(self.running())
    }

    async fn ping(&self) -> Result<(), SandboxError> {
        self.counters.pings.fetch_add(1, Ordering::SeqCst);
        if self.reachable {
            Ok(())
        } else {
            Err(self.unreachable_error())
        }
    }

    async fn pull_image(&self, _image: &str) -> Result<(), SandboxError> {
        self.counters.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self, spec: &StartSpec) -> Result<(), SandboxError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        if self.fail_start {
            return Err(SandboxError::RemoteExecution(format!(
                "Unable to find image '{}' locally",
                spec.image
            )));
        }
        self.sandboxes.lock().insert(
            spec.name.clone(),
            FakeSandbox {
                project_root: spec.project_root.clone(),
                host_dir: spec.host_project_dir.clone(),
                helper: Some(spec.helper.sandbox_path.clone()),
            },
        );
        self.started.lock().push(spec.clone());
        Ok(())
    }

    async fn install_helper(
        &self,
        sandbox_id: &str,
        helper: &HelperMount,
    ) -> Result<(), SandboxError> {
        self.counters.installs.fetch_add(1, Ordering::SeqCst);
        if self.fail_install {
            return Err(SandboxError::RemoteExecution(format!(
                "Error: No such container:path: {sandbox_id}:/usr/local/bin"
            )));
        }
        match self.sandboxes.lock().get_mut(sandbox_id) {
            Some(sandbox) => {
                sandbox.helper = Some(helper.sandbox_path.clone());
                Ok(())
            }
            None => Err(SandboxError::RemoteExecution(format!(
                "Error: No such container: {sandbox_id}"
            ))),
        }
    }

    async fn remove(&self, sandbox_id: &str) -> Result<(), SandboxError> {
        self.counters.removes.fetch_add(1, Ordering::SeqCst);
        if self.sandboxes.lock().remove(sandbox_id).is_none() {
            return Err(SandboxError::RemoteExecution(format!(
                "Error: No such container: {sandbox_id}"
            )));
        }
        self.removed.lock().push(sandbox_id.to_string());
        Ok(())
    }

    async fn exec(
        &self,
        sandbox_id: &str,
        argv: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ExecResult, SandboxError> {
        self.counters.execs.fetch_add(1, Ordering::SeqCst);
        let sandbox = self.sandboxes.lock().get(sandbox_id).cloned();
        let Some(sandbox) = sandbox else {
            return Ok(failed(1, format!("Error: No such container: {sandbox_id}")));
        };

        let [program, op, target] = argv else {
            return Ok(failed(helper::EXIT_USAGE, "usage: <helper> <op> <path>"));
        };
        if sandbox.helper.as_deref() != Some(program.as_str()) {
            return Ok(failed(
                127,
                format!("exec: \"{program}\": executable file not found in $PATH"),
            ));
        }
        let op = match op.parse::<RemoteOp>() {
            Ok(op) => op,
            Err(message) => return Ok(failed(helper::EXIT_USAGE, message)),
        };

        let relative = path::relative_to(&sandbox.project_root, target);
        let host_path = if relative.is_empty() {
            sandbox.host_dir.clone()
        } else if relative == *target {
            return Ok(failed(
                helper::EXIT_FAILURE,
                format!("{op} {target}: outside of the mounted project"),
            ));
        } else {
            sandbox.host_dir.join(relative)
        };

        let mut input = Cursor::new(stdin.unwrap_or_default().to_vec());
        let mut output = Vec::new();
        match helper::execute(op, &host_path, &mut input, &mut output) {
            Ok(()) => Ok(ExecResult {
                stdout: output,
                stderr: Vec::new(),
                exit_code: Some(0),
            }),
            Err(err) => Ok(failed(
                helper::EXIT_FAILURE,
                format!("{op} {target}: {err}"),
            )),
        }
    }
}
