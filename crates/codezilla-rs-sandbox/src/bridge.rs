//! Remote execution bridge: runs helper operations inside a sandbox.

use codezilla_rs_protocol::{ExecResult, RemoteOp};
use log::debug;
use std::sync::Arc;

use crate::error::SandboxError;
use crate::runtime::ContainerRuntime;

/// Runs one helper operation per call inside a given sandbox.
///
/// The bridge keeps no per-call state; concurrent calls are independent
/// runtime invocations.
#[derive(Clone)]
pub struct RemoteExecBridge {
    runtime: Arc<dyn ContainerRuntime>,
    helper_path: String,
}

impl RemoteExecBridge {
    /// Create a bridge that invokes the helper at `helper_path` inside sandboxes.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, helper_path: impl Into<String>) -> Self {
        Self {
            runtime,
            helper_path: helper_path.into(),
        }
    }

    /// Run `op` with `args`, returning the captured result regardless of exit status.
    ///
    /// Errors only when the runtime process cannot be spawned or its pipes fail.
    pub async fn run(
        &self,
        sandbox_id: &str,
        op: RemoteOp,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ExecResult, SandboxError> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        argv.push(self.helper_path.clone());
        argv.push(op.as_str().to_string());
        argv.extend(args.iter().cloned());

        debug!(
            "remote exec (sandbox={}, op={}, args_len={}, stdin_len={})",
            sandbox_id,
            op,
            args.len(),
            stdin.map(<[u8]>::len).unwrap_or(0)
        );
        let result = self.runtime.exec(sandbox_id, &argv, stdin).await?;
        debug!(
            "remote exec finished (sandbox={}, op={}, exit_code={:?}, stdout_len={})",
            sandbox_id,
            op,
            result.exit_code,
            result.stdout.len()
        );
        Ok(result)
    }

    /// Like [`RemoteExecBridge::run`], but a non-zero exit becomes
    /// [`SandboxError::RemoteExecution`] carrying stderr or `exit <code>`.
    pub async fn run_or_throw(
        &self,
        sandbox_id: &str,
        op: RemoteOp,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ExecResult, SandboxError> {
        let result = self.run(sandbox_id, op, args, stdin).await?;
        if result.success() {
            Ok(result)
        } else {
            Err(SandboxError::RemoteExecution(result.failure_message()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RemoteExecBridge;
    use crate::error::SandboxError;
    use crate::runtime::{ContainerRuntime, HelperMount, StartSpec};
    use async_trait::async_trait;
    use codezilla_rs_protocol::{ExecResult, RemoteOp};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Runtime that records exec calls and replies with a canned result.
    struct CannedRuntime {
        reply: ExecResult,
        calls: Mutex<Vec<(String, Vec<String>, Option<Vec<u8>>)>>,
    }

    impl CannedRuntime {
        fn new(reply: ExecResult) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ContainerRuntime for CannedRuntime {
        fn name(&self) -> &str {
            "canned"
        }

        async fn running_sandboxes(&self) -> Result<Vec<String>, SandboxError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn pull_image(&self, _image: &str) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn start(&self, _spec: &StartSpec) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn install_helper(
            &self,
            _sandbox_id: &str,
            _helper: &HelperMount,
        ) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn remove(&self, _sandbox_id: &str) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn exec(
            &self,
            sandbox_id: &str,
            argv: &[String],
            stdin: Option<&[u8]>,
        ) -> Result<ExecResult, SandboxError> {
            self.calls.lock().push((
                sandbox_id.to_string(),
                argv.to_vec(),
                stdin.map(<[u8]>::to_vec),
            ));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn run_prefixes_helper_and_operation() {
        let runtime = CannedRuntime::new(ExecResult {
            stdout: b"ok".to_vec(),
            stderr: Vec::new(),
            exit_code: Some(0),
        });
        let bridge = RemoteExecBridge::new(runtime.clone(), "/usr/local/bin/codezilla-fs-helper");

        let result = bridge
            .run(
                "sbx",
                RemoteOp::Write,
                &["/app/a.txt".to_string()],
                Some(b"payload"),
            )
            .await
            .expect("run");

        assert_eq!(result.stdout, b"ok".to_vec());
        let calls = runtime.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sbx");
        assert_eq!(
            calls[0].1,
            vec!["/usr/local/bin/codezilla-fs-helper", "write", "/app/a.txt"]
        );
        assert_eq!(calls[0].2.as_deref(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn run_returns_failures_as_results() {
        let runtime = CannedRuntime::new(ExecResult {
            stdout: Vec::new(),
            stderr: b"nope".to_vec(),
            exit_code: Some(1),
        });
        let bridge = RemoteExecBridge::new(runtime, "helper");
        let result = bridge
            .run("sbx", RemoteOp::List, &[], None)
            .await
            .expect("run");
        assert_eq!(result.exit_code, Some(1));
    }

    #[tokio::test]
    async fn run_or_throw_uses_stderr_as_message() {
        let runtime = CannedRuntime::new(ExecResult {
            stdout: Vec::new(),
            stderr: b"read /app/missing: No such file or directory (os error 2)\n".to_vec(),
            exit_code: Some(1),
        });
        let bridge = RemoteExecBridge::new(runtime, "helper");
        let err = bridge
            .run_or_throw("sbx", RemoteOp::Read, &["/app/missing".to_string()], None)
            .await
            .expect_err("non-zero exit");
        match err {
            SandboxError::RemoteExecution(message) => assert_eq!(
                message,
                "read /app/missing: No such file or directory (os error 2)"
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_or_throw_falls_back_to_exit_code() {
        let runtime = CannedRuntime::new(ExecResult {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: Some(7),
        });
        let bridge = RemoteExecBridge::new(runtime, "helper");
        let err = bridge
            .run_or_throw("sbx", RemoteOp::Mkdir, &["/app/x".to_string()], None)
            .await
            .expect_err("non-zero exit");
        assert_eq!(err.to_string(), "exit 7");
    }

    #[tokio::test]
    async fn success_ignores_stderr_noise() {
        let runtime = CannedRuntime::new(ExecResult {
            stdout: b"data".to_vec(),
            stderr: b"warning: something".to_vec(),
            exit_code: Some(0),
        });
        let bridge = RemoteExecBridge::new(runtime, "helper");
        let result = bridge
            .run_or_throw("sbx", RemoteOp::Read, &["/app/a".to_string()], None)
            .await
            .expect("exit zero is success");
        assert_eq!(result.stdout, b"data".to_vec());
    }
}
