//! Docker CLI-backed container runtime.

use async_trait::async_trait;
use codezilla_rs_protocol::ExecResult;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::SandboxError;
use crate::runtime::{ContainerRuntime, HelperMount, StartSpec};

/// Command kept running so a managed sandbox stays alive while idle.
const IDLE_COMMAND: &str = "tail -f /dev/null";

/// Runtime that shells out to the docker (or docker-compatible) CLI.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    /// Path or name of the CLI executable.
    program: PathBuf,
}

impl DockerRuntime {
    /// Create a runtime for `program`, resolving it on PATH when possible.
    ///
    /// An unresolved program is kept as-is; later calls then fail to spawn,
    /// which the lifecycle manager treats as an unreachable runtime.
    pub fn new(program: &str) -> Self {
        let program = match which::which(program) {
            Ok(path) => {
                info!("container runtime resolved (path={})", path.display());
                path
            }
            Err(_) => {
                warn!("container runtime not found on PATH (program={program})");
                PathBuf::from(program)
            }
        };
        Self { program }
    }

    /// Create a runtime for an exact executable path without PATH lookup.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    fn spawn_error(&self, source: std::io::Error) -> SandboxError {
        SandboxError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    /// Run a runtime subcommand without stdin and capture its output.
    async fn run_cli(&self, args: &[&str]) -> Result<ExecResult, SandboxError> {
        debug!(
            "running runtime command (subcommand={}, args_len={})",
            args.first().copied().unwrap_or_default(),
            args.len()
        );
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;
        Ok(ExecResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }

    /// Run a runtime subcommand and fail on non-zero exit.
    async fn run_cli_checked(&self, args: &[&str]) -> Result<ExecResult, SandboxError> {
        let result = self.run_cli(args).await?;
        if result.success() {
            Ok(result)
        } else {
            Err(SandboxError::RemoteExecution(result.failure_message()))
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("docker")
    }

    async fn running_sandboxes(&self) -> Result<Vec<String>, SandboxError> {
        let result = self.run_cli_checked(&["ps", "--format", "{{.Names}}"]).await?;
        Ok(parse_names(&result.stdout))
    }

    async fn ping(&self) -> Result<(), SandboxError> {
        let result = self
            .run_cli(&["version", "--format", "{{.Server.Version}}"])
            .await?;
        if !result.success() {
            return Err(SandboxError::Unavailable(result.failure_message()));
        }
        debug!(
            "container runtime reachable (server_version={})",
            String::from_utf8_lossy(&result.stdout).trim()
        );
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<(), SandboxError> {
        self.run_cli_checked(&["pull", image]).await?;
        Ok(())
    }

    async fn start(&self, spec: &StartSpec) -> Result<(), SandboxError> {
        let args = start_args(spec);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_cli_checked(&args).await?;
        info!(
            "sandbox started (name={}, image={})",
            spec.name, spec.image
        );
        Ok(())
    }

    async fn install_helper(
        &self,
        sandbox_id: &str,
        helper: &HelperMount,
    ) -> Result<(), SandboxError> {
        let source = helper.host_path.display().to_string();
        let destination = format!("{sandbox_id}:{}", helper.sandbox_path);
        self.run_cli_checked(&["cp", &source, &destination]).await?;
        debug!(
            "helper installed (sandbox={}, path={})",
            sandbox_id, helper.sandbox_path
        );
        Ok(())
    }

    async fn remove(&self, sandbox_id: &str) -> Result<(), SandboxError> {
        self.run_cli_checked(&["rm", "-f", sandbox_id]).await?;
        Ok(())
    }

    async fn exec(
        &self,
        sandbox_id: &str,
        argv: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ExecResult, SandboxError> {
        let mut command = self.command();
        command.arg("exec");
        if stdin.is_some() {
            command.arg("-i");
        }
        command.arg(sandbox_id).args(argv);
        command.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| self.spawn_error(err))?;
        let output = match (stdin, child.stdin.take()) {
            (Some(payload), Some(mut pipe)) => {
                // Feed stdin while output is drained; closing the pipe signals EOF.
                let feed = async move {
                    let written = pipe.write_all(payload).await;
                    drop(pipe);
                    written
                };
                let (fed, output) = tokio::join!(feed, child.wait_with_output());
                let output = output?;
                if let Err(err) = fed {
                    if output.status.success() {
                        return Err(SandboxError::Io(err));
                    }
                    debug!("stdin closed early by failing process: {err}");
                }
                output
            }
            _ => child.wait_with_output().await?,
        };

        Ok(ExecResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }
}

/// Build `run` arguments for a managed sandbox.
fn start_args(spec: &StartSpec) -> Vec<String> {
    vec![
        "run".to_string(),
        "-d".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "-v".to_string(),
        format!("{}:{}", spec.host_project_dir.display(), spec.project_root),
        "-v".to_string(),
        format!(
            "{}:{}:ro",
            spec.helper.host_path.display(),
            spec.helper.sandbox_path
        ),
        "-w".to_string(),
        spec.project_root.clone(),
        spec.image.clone(),
        "sh".to_string(),
        "-c".to_string(),
        IDLE_COMMAND.to_string(),
    ]
}

/// Split `ps` output into sandbox names.
fn parse_names(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
