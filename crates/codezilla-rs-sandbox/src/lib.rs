//! Sandbox runtime access, remote execution and lifecycle management.

pub mod bridge;
pub mod cleanup;
pub mod error;
pub mod helper;
pub mod lifecycle;
pub mod runtime;

/// Remote execution of helper operations.
pub use bridge::RemoteExecBridge;
/// Signal-driven teardown.
pub use cleanup::{ExitAction, TerminationSignal, run_signal_loop, spawn_os_signal_cleanup};
/// Sandbox error type.
pub use error::SandboxError;
/// Lifecycle manager and its options.
pub use lifecycle::{
    ContainerLifecycleManager, HELPER_BINARY_NAME, LifecycleOptions, LifecycleState,
    locate_helper,
};
/// Runtime trait and the docker implementation.
pub use runtime::{ContainerRuntime, HelperMount, StartSpec, docker::DockerRuntime};

/// Build the runtime named in config.
///
/// Any docker-compatible CLI (e.g. `podman`) is driven through [`DockerRuntime`].
pub fn runtime_from_config(
    config: &codezilla_rs_config::SandboxConfig,
) -> std::sync::Arc<dyn ContainerRuntime> {
    std::sync::Arc::new(DockerRuntime::new(&config.runtime))
}
