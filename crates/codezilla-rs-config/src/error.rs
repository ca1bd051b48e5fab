use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating a Codezilla config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON5 syntax error in the layer named by `layer`.
    #[error("cannot parse {layer}: {source}")]
    Parse {
        layer: String,
        #[source]
        source: json5::Error,
    },
    /// The merged document does not fit the config model.
    #[error("config does not match model: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field has the wrong shape or value; `field` is `layer:dotted.path`
    /// or an environment variable name.
    #[error("bad value for {field}: {message}")]
    Field { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            message: message.into(),
        }
    }
}
