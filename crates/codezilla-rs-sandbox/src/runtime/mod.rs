//! Container runtime interface used by the lifecycle manager and exec bridge.

use async_trait::async_trait;
use codezilla_rs_protocol::ExecResult;
use std::path::PathBuf;

use crate::error::SandboxError;

pub mod docker;

/// Everything needed to start a long-lived managed sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSpec {
    /// Unique sandbox name.
    pub name: String,
    /// Image to run.
    pub image: String,
    /// Host project directory mounted into the sandbox.
    pub host_project_dir: PathBuf,
    /// Mount point of the project inside the sandbox; also the working directory.
    pub project_root: String,
    /// Helper binary bind-mounted read-only into the sandbox.
    pub helper: HelperMount,
}

/// Host and sandbox locations of the filesystem helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperMount {
    pub host_path: PathBuf,
    pub sandbox_path: String,
}

/// Container runtime operations.
///
/// Every method maps to one runtime process invocation; implementations keep
/// no per-call state, so calls may run concurrently.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Human-readable runtime name (e.g. "docker").
    fn name(&self) -> &str;

    /// Names of all running sandboxes.
    async fn running_sandboxes(&self) -> Result<Vec<String>, SandboxError>;

    /// Check that the runtime daemon is reachable.
    async fn ping(&self) -> Result<(), SandboxError>;

    /// Make sure an image is present locally.
    async fn pull_image(&self, image: &str) -> Result<(), SandboxError>;

    /// Start a detached, idle sandbox.
    async fn start(&self, spec: &StartSpec) -> Result<(), SandboxError>;

    /// Copy the helper binary into an already running sandbox.
    async fn install_helper(&self, sandbox_id: &str, helper: &HelperMount)
    -> Result<(), SandboxError>;

    /// Forcibly remove a sandbox.
    async fn remove(&self, sandbox_id: &str) -> Result<(), SandboxError>;

    /// Execute `argv` inside a sandbox, optionally feeding `stdin`, capturing all output.
    async fn exec(
        &self,
        sandbox_id: &str,
        argv: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ExecResult, SandboxError>;
}
