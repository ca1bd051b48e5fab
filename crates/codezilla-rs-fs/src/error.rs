//! File service error types.

use codezilla_rs_protocol::PathError;
use codezilla_rs_sandbox::SandboxError;

/// Errors surfaced to callers of the file service.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Rejected before any I/O.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    /// A sandbox-side operation failed.
    #[error(transparent)]
    Remote(#[from] SandboxError),
    /// Host filesystem failure.
    #[error(transparent)]
    LocalIo(#[from] std::io::Error),
    /// The target exists but is not a regular file.
    #[error("not a file: {0}")]
    NotAFile(String),
}
