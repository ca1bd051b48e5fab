//! Sandbox error types.

/// Errors returned by the container runtime, exec bridge and helper.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The runtime process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// IO error while talking to a spawned process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A sandbox-side operation exited non-zero.
    #[error("{0}")]
    RemoteExecution(String),
    /// The helper produced output that could not be decoded.
    #[error("malformed helper output: {0}")]
    Protocol(String),
    /// The runtime is unreachable or a sandbox could not be created.
    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
    /// Missing dependency required by the runtime.
    #[error("dependency missing: {0}")]
    DependencyMissing(String),
}
