//! The file service: list/read/write/mkdir against the sandbox or the host.

use codezilla_rs_protocol::{EntryKind, FileEntry, HelperEntry, RemoteOp, SandboxContext, path};
use codezilla_rs_sandbox::{ContainerLifecycleManager, RemoteExecBridge, SandboxError};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::FsError;

/// Public façade over the sandboxed and local filesystems.
///
/// Each call asks the lifecycle manager for a context and runs remotely when
/// one exists, locally otherwise. Both paths validate input the same way.
#[derive(Clone)]
pub struct FileService {
    manager: Arc<ContainerLifecycleManager>,
    bridge: RemoteExecBridge,
    local_root: PathBuf,
}

impl FileService {
    /// Create a service from its parts.
    pub fn new(
        manager: Arc<ContainerLifecycleManager>,
        bridge: RemoteExecBridge,
        local_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manager,
            bridge,
            local_root: local_root.into(),
        }
    }

    /// Create a service using the manager's runtime, helper path and host project directory.
    pub fn from_manager(manager: Arc<ContainerLifecycleManager>) -> Self {
        let options = manager.options();
        let bridge = RemoteExecBridge::new(manager.runtime(), options.helper_sandbox_path.clone());
        let local_root = options.host_project_dir.clone();
        Self::new(manager, bridge, local_root)
    }

    pub fn manager(&self) -> &Arc<ContainerLifecycleManager> {
        &self.manager
    }

    /// Host directory used when no sandbox is available.
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// List a directory, skipping dotfiles. An empty path lists the project root.
    ///
    /// Entries are sorted by name.
    pub async fn list_directory(&self, rel_path: &str) -> Result<Vec<FileEntry>, FsError> {
        let rel = normalize_dir(rel_path)?;
        let mut entries = match self.manager.ensure_context().await {
            Some(context) => self.list_remote(&context, &rel).await?,
            None => self.list_local(&rel).await?,
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("listed directory (path={}, entries={})", rel, entries.len());
        Ok(entries)
    }

    /// Read a whole file.
    pub async fn read_file(&self, rel_path: &str) -> Result<Vec<u8>, FsError> {
        let rel = normalize_file(rel_path)?;
        match self.manager.ensure_context().await {
            Some(context) => {
                let target = path::join(&context.project_root, &rel);
                let result = self
                    .bridge
                    .run_or_throw(&context.sandbox_id, RemoteOp::Read, &[target], None)
                    .await?;
                Ok(result.stdout)
            }
            None => {
                let target = self.local_path(&rel);
                let metadata = tokio::fs::metadata(&target).await?;
                if !metadata.is_file() {
                    return Err(FsError::NotAFile(rel));
                }
                Ok(tokio::fs::read(&target).await?)
            }
        }
    }

    /// Replace a whole file, creating missing parent directories.
    pub async fn write_file(&self, rel_path: &str, content: &[u8]) -> Result<(), FsError> {
        let rel = normalize_file(rel_path)?;
        match self.manager.ensure_context().await {
            Some(context) => {
                let target = path::join(&context.project_root, &rel);
                self.bridge
                    .run_or_throw(&context.sandbox_id, RemoteOp::Write, &[target], Some(content))
                    .await?;
            }
            None => {
                let target = self.local_path(&rel);
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, content).await?;
            }
        }
        debug!("wrote file (path={}, bytes={})", rel, content.len());
        Ok(())
    }

    /// Create a directory and its parents; succeeds when it already exists.
    pub async fn make_directory(&self, rel_path: &str) -> Result<(), FsError> {
        let rel = normalize_file(rel_path)?;
        match self.manager.ensure_context().await {
            Some(context) => {
                let target = path::join(&context.project_root, &rel);
                self.bridge
                    .run_or_throw(&context.sandbox_id, RemoteOp::Mkdir, &[target], None)
                    .await?;
            }
            None => tokio::fs::create_dir_all(self.local_path(&rel)).await?,
        }
        Ok(())
    }

    async fn list_remote(
        &self,
        context: &SandboxContext,
        rel: &str,
    ) -> Result<Vec<FileEntry>, FsError> {
        let target = path::join(&context.project_root, rel);
        let result = self
            .bridge
            .run_or_throw(
                &context.sandbox_id,
                RemoteOp::List,
                std::slice::from_ref(&target),
                None,
            )
            .await?;
        let listed: Vec<HelperEntry> = serde_json::from_slice(&result.stdout)
            .map_err(|err| SandboxError::Protocol(err.to_string()))?;
        Ok(listed
            .into_iter()
            .filter(|entry| !entry.name.starts_with('.'))
            .map(|entry| {
                let absolute = path::join(&target, &entry.name);
                FileEntry {
                    path: path::relative_to(&context.project_root, &absolute),
                    name: entry.name,
                    kind: entry.kind,
                }
            })
            .collect())
    }

    async fn list_local(&self, rel: &str) -> Result<Vec<FileEntry>, FsError> {
        let mut reader = tokio::fs::read_dir(self.local_path(rel)).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("skipping non-UTF-8 entry (dir={rel}, name={raw:?})");
                    continue;
                }
            };
            if name.starts_with('.') {
                continue;
            }
            let kind = if entry.file_type().await?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(FileEntry {
                path: path::join(rel, &name),
                name,
                kind,
            });
        }
        Ok(entries)
    }

    fn local_path(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.local_root.clone()
        } else {
            self.local_root.join(rel)
        }
    }
}

/// Normalize and validate a file path.
fn normalize_file(rel_path: &str) -> Result<String, FsError> {
    let normalized = path::normalize(rel_path);
    path::validate_relative(&normalized)?;
    Ok(normalized)
}

/// Like [`normalize_file`], but the empty path names the project root.
fn normalize_dir(rel_path: &str) -> Result<String, FsError> {
    if rel_path.is_empty() {
        return Ok(String::new());
    }
    normalize_file(rel_path)
}
