//! Reading config layers from disk.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Read `path` as a JSON5 document.
pub(super) fn read_json5(path: &Path) -> Result<Value, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json5(&contents, &path.display().to_string())
}

pub(super) fn parse_json5(contents: &str, layer: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::Parse {
        layer: layer.to_string(),
        source,
    })
}

/// User and project layers are skipped when their file is absent.
pub(super) fn discover(
    source: ConfigLayerSource,
    path: Option<&Path>,
) -> Result<Option<LoadedLayer>, ConfigError> {
    match path {
        Some(path) if path.is_file() => load(source, path).map(Some),
        Some(path) => {
            debug!("no {source:?} layer at {}", path.display());
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Runtime layers must exist.
pub(super) fn load(source: ConfigLayerSource, path: &Path) -> Result<LoadedLayer, ConfigError> {
    let value = read_json5(path)?;
    let tag = match source {
        ConfigLayerSource::User => "user",
        ConfigLayerSource::Project => "project",
        ConfigLayerSource::Runtime => "runtime",
        ConfigLayerSource::Environment => "env",
    };
    schema::validate_layer_schema(&value, tag)?;
    debug!("read {tag} layer (path={})", path.display());
    Ok(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    })
}

/// `~/.codezilla/codezilla.json5`, when a home directory is known.
pub(super) fn user_layer_path() -> Option<PathBuf> {
    let dirs = UserDirs::new()?;
    Some(dirs.home_dir().join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE))
}
