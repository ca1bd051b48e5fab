//! Project file access that is transparently sandboxed.

pub mod error;
pub mod service;

pub use error::FsError;
pub use service::FileService;
