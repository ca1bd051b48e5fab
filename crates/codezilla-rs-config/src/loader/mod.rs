//! Layered configuration loader with environment overrides.
//!
//! Discovers configuration layers (user/project/runtime), validates each
//! against the schema, merges them, applies environment overrides last and
//! produces a final `CodezillaConfig`.

mod env;
mod layer_io;
mod merge;
mod schema;


pub use env::{
    ENV_DISABLE_AUTO_SANDBOX, ENV_SANDBOX_IMAGE, ENV_SANDBOX_PROJECT_ROOT,
    ENV_TARGET_PROJECT_ROOT, ENV_TARGET_SANDBOX,
};

use crate::{CodezillaConfig, ConfigError};
use codezilla_rs_protocol::path;
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "codezilla.json5";
const DEFAULT_CONFIG_DIR: &str = ".codezilla";

/// A resolved config and the layers it was built from, lowest precedence first.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: CodezillaConfig,
    pub layers: Vec<ConfigLayer>,
}

/// Where a layer came from. Later variants override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// `~/.codezilla/codezilla.json5`
    User,
    /// `codezilla.json5` in the working directory
    Project,
    /// `--config` files
    Runtime,
    /// `CODEZILLA_*` variables
    Environment,
}

#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    /// `None` for the environment layer.
    pub path: Option<PathBuf>,
}

/// Inputs to [`CodezillaConfig::load_layered_with_options`].
///
/// Tests build these with an explicit `env` and no user path so that the
/// developer's own setup cannot leak in.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    pub user_config_path: Option<PathBuf>,
    pub runtime_paths: Vec<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl LayeredConfigOptions {
    /// Home-directory user layer, project layer under `cwd`, process environment.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::user_layer_path(),
            runtime_paths: Vec::new(),
            env: env::capture_process_env(),
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_user_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env.clear();
        self
    }
}

impl CodezillaConfig {
    /// Parse one config file. Environment variables are not consulted.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("reading config file (path={})", path.display());
        config_from_value(layer_io::read_json5(path)?, "config")
    }

    /// Parse JSON5 text. Environment variables are not consulted.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        config_from_value(layer_io::parse_json5(contents, "config")?, "config")
    }

    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Merge user, project, runtime and environment layers in that order.
    ///
    /// Missing user or project files are skipped; a missing runtime file is
    /// an error.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut merged = Value::Object(serde_json::Map::new());
        let mut layers = Vec::new();
        let mut apply = |layer: LoadedLayer| {
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(layer.meta);
        };

        let project_path = options.cwd.join(DEFAULT_CONFIG_FILE);
        let discovered = [
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
            (ConfigLayerSource::Project, Some(project_path.as_path())),
        ];
        for (source, path) in discovered {
            if let Some(layer) = layer_io::discover(source, path)? {
                apply(layer);
            }
        }
        for path in &options.runtime_paths {
            apply(layer_io::load(ConfigLayerSource::Runtime, path)?);
        }
        if let Some(overlay) = env::overlay_from_env(&options.env)? {
            debug!("environment overrides present");
            apply(LoadedLayer {
                meta: ConfigLayer {
                    source: ConfigLayerSource::Environment,
                    path: None,
                },
                value: overlay,
            });
        }

        let config = config_from_value(merged, "merged")?;
        info!(
            "config resolved (sources={:?})",
            layers.iter().map(|layer| layer.source).collect::<Vec<_>>()
        );
        Ok(LayeredConfig { config, layers })
    }

    /// Normalize separator variants in sandbox paths.
    pub fn normalize_paths(&mut self) {
        let sandbox = &mut self.sandbox;
        sandbox.target.project_root = path::normalize(&sandbox.target.project_root);
        sandbox.managed.project_root = path::normalize(&sandbox.managed.project_root);
        sandbox.helper.sandbox_path = path::normalize(&sandbox.helper.sandbox_path);
    }

    /// Checks serde cannot express: non-empty names and absolute sandbox paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sandbox = &self.sandbox;
        if sandbox.runtime.trim().is_empty() {
            return Err(ConfigError::field("sandbox.runtime", "cannot be empty"));
        }
        for (field, value) in [
            ("sandbox.target.project_root", &sandbox.target.project_root),
            (
                "sandbox.managed.project_root",
                &sandbox.managed.project_root,
            ),
            ("sandbox.helper.sandbox_path", &sandbox.helper.sandbox_path),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::field(
                    field,
                    format!("expected an absolute sandbox path, got {value:?}"),
                ));
            }
        }
        if sandbox.managed.name_prefix.trim().is_empty() {
            return Err(ConfigError::field(
                "sandbox.managed.name_prefix",
                "cannot be empty",
            ));
        }
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::field("server.bind", "cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<CodezillaConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let mut config: CodezillaConfig = serde_json::from_value(value)?;
    config.normalize_paths();
    config.validate()?;
    Ok(config)
}
