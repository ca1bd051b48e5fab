//! Environment variable overrides, applied as the highest-precedence layer.

use crate::ConfigError;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Name of a running sandbox to attach to.
pub const ENV_TARGET_SANDBOX: &str = "CODEZILLA_TARGET_SANDBOX";
/// Project root inside the attached sandbox.
pub const ENV_TARGET_PROJECT_ROOT: &str = "CODEZILLA_TARGET_PROJECT_ROOT";
/// Image for managed sandboxes.
pub const ENV_SANDBOX_IMAGE: &str = "CODEZILLA_SANDBOX_IMAGE";
/// Project root inside managed sandboxes.
pub const ENV_SANDBOX_PROJECT_ROOT: &str = "CODEZILLA_SANDBOX_PROJECT_ROOT";
/// `1` disables automatic sandbox creation.
pub const ENV_DISABLE_AUTO_SANDBOX: &str = "CODEZILLA_DISABLE_AUTO_SANDBOX";

const KNOWN_KEYS: &[&str] = &[
    ENV_TARGET_SANDBOX,
    ENV_TARGET_PROJECT_ROOT,
    ENV_SANDBOX_IMAGE,
    ENV_SANDBOX_PROJECT_ROOT,
    ENV_DISABLE_AUTO_SANDBOX,
];

/// Snapshot the recognised variables from the process environment.
pub(super) fn capture_process_env() -> BTreeMap<String, String> {
    KNOWN_KEYS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect()
}

/// Build a config overlay from environment values; `None` when nothing applies.
pub(super) fn overlay_from_env(env: &BTreeMap<String, String>) -> Result<Option<Value>, ConfigError> {
    let mut target = Map::new();
    let mut managed = Map::new();

    if let Some(name) = non_empty(env, ENV_TARGET_SANDBOX) {
        target.insert("name".to_string(), json!(name));
    }
    if let Some(root) = non_empty(env, ENV_TARGET_PROJECT_ROOT) {
        target.insert("project_root".to_string(), json!(root));
    }
    if let Some(image) = non_empty(env, ENV_SANDBOX_IMAGE) {
        managed.insert("image".to_string(), json!(image));
    }
    if let Some(root) = non_empty(env, ENV_SANDBOX_PROJECT_ROOT) {
        managed.insert("project_root".to_string(), json!(root));
    }
    if let Some(flag) = non_empty(env, ENV_DISABLE_AUTO_SANDBOX) {
        managed.insert("auto_create".to_string(), json!(parse_disable_flag(flag)?));
    }

    if target.is_empty() && managed.is_empty() {
        return Ok(None);
    }
    let mut sandbox = Map::new();
    if !target.is_empty() {
        sandbox.insert("target".to_string(), Value::Object(target));
    }
    if !managed.is_empty() {
        sandbox.insert("managed".to_string(), Value::Object(managed));
    }
    Ok(Some(json!({ "sandbox": sandbox })))
}

fn non_empty<'a>(env: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Translate the disable flag into the `auto_create` value.
fn parse_disable_flag(flag: &str) -> Result<bool, ConfigError> {
    match flag {
        "1" | "true" => Ok(false),
        "0" | "false" => Ok(true),
        other => Err(ConfigError::field(
            ENV_DISABLE_AUTO_SANDBOX,
            format!("expected 1 or 0, got {other:?}"),
        )),
    }
}
