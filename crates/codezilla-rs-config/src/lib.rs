//! Configuration models and layered config loading.
//!
//! This crate owns the Codezilla config schema, validation, environment
//! overrides and the layer-merging logic used by the binary and the tests.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{
    ConfigLayer, ConfigLayerSource, ENV_DISABLE_AUTO_SANDBOX, ENV_SANDBOX_IMAGE,
    ENV_SANDBOX_PROJECT_ROOT, ENV_TARGET_PROJECT_ROOT, ENV_TARGET_SANDBOX, LayeredConfig,
    LayeredConfigOptions,
};
/// Configuration schema models.
pub use model::*;
