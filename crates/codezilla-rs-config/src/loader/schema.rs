//! Schema validation helpers for Codezilla JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Reject unknown keys and wrongly typed values. Every section is optional.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "project", "sandbox", "server"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("project") {
        validate_project(value, layer, "project")?;
    }
    if let Some(value) = map.get("sandbox") {
        validate_sandbox(value, layer, "sandbox")?;
    }
    if let Some(value) = map.get("server") {
        validate_server(value, layer, "server")?;
    }
    Ok(())
}

/// Validate the "project" block.
fn validate_project(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["root"], layer, path)?;
    if let Some(value) = map.get("root") {
        expect_string(value, layer, &join_path(path, "root"))?;
    }
    Ok(())
}

/// Validate the "sandbox" block.
fn validate_sandbox(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["runtime", "cleanup_on_signal", "target", "managed", "helper"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("runtime") {
        expect_string(value, layer, &join_path(path, "runtime"))?;
    }
    if let Some(value) = map.get("cleanup_on_signal") {
        expect_bool(value, layer, &join_path(path, "cleanup_on_signal"))?;
    }
    if let Some(value) = map.get("target") {
        let target_path = join_path(path, "target");
        let target = expect_object(value, layer, &target_path)?;
        ensure_allowed_keys(target, &["name", "project_root"], layer, &target_path)?;
        expect_strings(target, &["name", "project_root"], layer, &target_path)?;
    }
    if let Some(value) = map.get("managed") {
        let managed_path = join_path(path, "managed");
        let managed = expect_object(value, layer, &managed_path)?;
        ensure_allowed_keys(
            managed,
            &["auto_create", "image", "project_root", "name_prefix"],
            layer,
            &managed_path,
        )?;
        if let Some(value) = managed.get("auto_create") {
            expect_bool(value, layer, &join_path(&managed_path, "auto_create"))?;
        }
        expect_strings(
            managed,
            &["image", "project_root", "name_prefix"],
            layer,
            &managed_path,
        )?;
    }
    if let Some(value) = map.get("helper") {
        let helper_path = join_path(path, "helper");
        let helper = expect_object(value, layer, &helper_path)?;
        ensure_allowed_keys(helper, &["host_path", "sandbox_path"], layer, &helper_path)?;
        expect_strings(helper, &["host_path", "sandbox_path"], layer, &helper_path)?;
    }
    Ok(())
}

/// Validate the "server" block.
fn validate_server(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["bind"], layer, path)?;
    expect_strings(map, &["bind"], layer, path)
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect every present key in `keys` to be a string.
fn expect_strings(
    map: &Map<String, Value>,
    keys: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in keys {
        if let Some(value) = map.get(*key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Reject keys that are not part of the schema.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::field(format!("{layer}:{normalized_path}"), message)
}
