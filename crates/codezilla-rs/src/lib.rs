//! Public SDK surface for Codezilla.
//!
//! This crate re-exports the building blocks of the file bridge and wires
//! them together from a loaded configuration.

/// Re-export for convenience.
pub use codezilla_rs_config as config;
/// Re-export for convenience.
pub use codezilla_rs_fs as fs;
/// Re-export for convenience.
pub use codezilla_rs_protocol as protocol;
/// Re-export for convenience.
pub use codezilla_rs_sandbox as sandbox;
pub use codezilla_rs_server as server;

use codezilla_rs_config::CodezillaConfig;
use codezilla_rs_fs::FileService;
use codezilla_rs_sandbox::{ContainerLifecycleManager, LifecycleOptions, runtime_from_config};
use log::info;
use std::path::PathBuf;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}

/// Build the file service for `config`, rooted at `project_dir` on the host.
///
/// With `local_only` the runtime is never probed and all operations use the
/// host filesystem.
pub fn file_service(config: &CodezillaConfig, project_dir: PathBuf, local_only: bool) -> FileService {
    let runtime = runtime_from_config(&config.sandbox);
    let mut options = LifecycleOptions::from_config(&config.sandbox, project_dir);
    if local_only {
        options = options.local_only();
    }
    info!(
        "file service configured (runtime={}, project_dir={}, target={}, auto_create={})",
        runtime.name(),
        options.host_project_dir.display(),
        options.target_name,
        options.auto_create
    );
    FileService::from_manager(ContainerLifecycleManager::new(runtime, options))
}
