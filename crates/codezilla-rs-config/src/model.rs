//! Configuration schema for Codezilla.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for the Codezilla filesystem bridge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodezillaConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl CodezillaConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> CodezillaConfigBuilder {
        CodezillaConfigBuilder::new()
    }
}

/// Builder for assembling a `CodezillaConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct CodezillaConfigBuilder {
    config: CodezillaConfig,
}

impl CodezillaConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: CodezillaConfig::default(),
        }
    }

    /// Replace the host project configuration.
    pub fn project(mut self, project: ProjectConfig) -> Self {
        self.config.project = project;
        self
    }

    /// Replace the sandbox configuration.
    pub fn sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Replace the HTTP server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Finalize and return the built `CodezillaConfig`.
    pub fn build(self) -> CodezillaConfig {
        self.config
    }
}

/// Host-side project settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Host project directory; the current directory when unset.
    #[serde(default)]
    pub root: Option<String>,
}

impl ProjectConfig {
    /// Resolve the host project directory against `cwd`.
    pub fn resolve_root(&self, cwd: &std::path::Path) -> PathBuf {
        match &self.root {
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        }
    }
}

/// Sandbox selection, creation and helper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Container runtime CLI used to manage sandboxes.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Tear an owned sandbox down on interrupt/terminate.
    #[serde(default = "default_true")]
    pub cleanup_on_signal: bool,
    #[serde(default)]
    pub target: TargetSandboxConfig,
    #[serde(default)]
    pub managed: ManagedSandboxConfig,
    #[serde(default)]
    pub helper: HelperConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            cleanup_on_signal: true,
            target: TargetSandboxConfig::default(),
            managed: ManagedSandboxConfig::default(),
            helper: HelperConfig::default(),
        }
    }
}

/// Pre-existing sandbox to attach to when it is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSandboxConfig {
    /// Name of the externally managed sandbox; empty disables attaching.
    #[serde(default = "default_target_name")]
    pub name: String,
    #[serde(default = "default_project_root")]
    pub project_root: String,
}

impl Default for TargetSandboxConfig {
    fn default() -> Self {
        Self {
            name: default_target_name(),
            project_root: default_project_root(),
        }
    }
}

/// Sandbox created and owned by this process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedSandboxConfig {
    /// Create a sandbox when no target is running.
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_project_root")]
    pub project_root: String,
    /// Prefix of generated sandbox names.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for ManagedSandboxConfig {
    fn default() -> Self {
        Self {
            auto_create: true,
            image: default_image(),
            project_root: default_project_root(),
            name_prefix: default_name_prefix(),
        }
    }
}

/// Location of the filesystem helper on the host and inside the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Host helper binary; discovered next to the executable or on PATH when unset.
    #[serde(default)]
    pub host_path: Option<String>,
    #[serde(default = "default_helper_sandbox_path")]
    pub sandbox_path: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            host_path: None,
            sandbox_path: default_helper_sandbox_path(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Default container runtime CLI.
fn default_runtime() -> String {
    "docker".to_string()
}

fn default_true() -> bool {
    true
}

/// Default name of the sandbox to attach to.
fn default_target_name() -> String {
    "codezilla-app".to_string()
}

/// Default project root inside a sandbox.
fn default_project_root() -> String {
    "/app".to_string()
}

/// Default image for managed sandboxes.
fn default_image() -> String {
    "debian:bookworm-slim".to_string()
}

fn default_name_prefix() -> String {
    "codezilla-fs".to_string()
}

/// Default helper location inside the sandbox.
fn default_helper_sandbox_path() -> String {
    "/usr/local/bin/codezilla-fs-helper".to_string()
}

/// Default HTTP bind address.
fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}
