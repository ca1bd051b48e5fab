//! Shared value types for the Codezilla filesystem bridge.
//!
//! Everything here is plain data or pure functions: the sandbox crate, the
//! file service and the HTTP layer all speak these types.

pub mod path;

pub use path::{MAX_RELATIVE_PATH_LEN, PathError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A running sandbox and the directory inside it that mirrors the host project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxContext {
    /// Runtime identifier (container name) of the sandbox.
    pub sandbox_id: String,
    /// Absolute project root inside the sandbox.
    pub project_root: String,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// A single entry produced by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Entry name without any directory component.
    pub name: String,
    /// Project-relative path of the entry.
    pub path: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Entry shape written by the in-sandbox helper for `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Captured result of one process executed inside a sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Raw stdout bytes; this is the payload of the operation.
    pub stdout: Vec<u8>,
    /// Raw stderr bytes.
    pub stderr: Vec<u8>,
    /// Exit status code if the process exited normally.
    pub exit_code: Option<i32>,
}

impl ExecResult {
    /// True when the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Failure message for a non-zero exit: stderr text, or `exit <code>`.
    pub fn failure_message(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exit {code}"),
            None => "exit unknown".to_string(),
        }
    }
}

/// The fixed set of filesystem primitives the sandbox helper understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// Enumerate a directory as JSON.
    List,
    /// Stream a whole file to stdout.
    Read,
    /// Replace a whole file with stdin, creating parent directories.
    Write,
    /// Create a directory and all missing parents.
    Mkdir,
}

impl RemoteOp {
    /// Subcommand name used on the helper command line.
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteOp::List => "list",
            RemoteOp::Read => "read",
            RemoteOp::Write => "write",
            RemoteOp::Mkdir => "mkdir",
        }
    }
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteOp {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "list" => Ok(RemoteOp::List),
            "read" => Ok(RemoteOp::Read),
            "write" => Ok(RemoteOp::Write),
            "mkdir" => Ok(RemoteOp::Mkdir),
            other => Err(format!("unknown remote operation: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryKind, ExecResult, FileEntry, HelperEntry, RemoteOp};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn remote_op_names_parse_back() {
        for op in [
            RemoteOp::List,
            RemoteOp::Read,
            RemoteOp::Write,
            RemoteOp::Mkdir,
        ] {
            assert_eq!(op.as_str().parse::<RemoteOp>(), Ok(op));
        }
        assert!("exec".parse::<RemoteOp>().is_err());
    }

    #[test]
    fn failure_message_prefers_stderr() {
        let result = ExecResult {
            stdout: Vec::new(),
            stderr: b"read /app/x: No such file\n".to_vec(),
            exit_code: Some(1),
        };
        assert_eq!(result.failure_message(), "read /app/x: No such file");
    }

    #[test]
    fn failure_message_falls_back_to_exit_code() {
        let result = ExecResult {
            exit_code: Some(126),
            ..ExecResult::default()
        };
        assert_eq!(result.failure_message(), "exit 126");
        assert_eq!(ExecResult::default().failure_message(), "exit unknown");
    }

    #[test]
    fn zero_exit_is_success_even_with_stdout() {
        let result = ExecResult {
            stdout: b"payload".to_vec(),
            stderr: Vec::new(),
            exit_code: Some(0),
        };
        assert!(result.success());
    }

    #[test]
    fn file_entry_serializes_kind_as_type() {
        let entry = FileEntry {
            name: "app".to_string(),
            path: "src/app".to_string(),
            kind: EntryKind::Directory,
        };
        assert_eq!(
            serde_json::to_value(&entry).expect("serialize"),
            json!({ "name": "app", "path": "src/app", "type": "directory" })
        );
    }

    #[test]
    fn helper_entry_reads_wire_format() {
        let entries: Vec<HelperEntry> =
            serde_json::from_str(r#"[{"name":"a.txt","kind":"file"}]"#).expect("parse");
        assert_eq!(
            entries,
            vec![HelperEntry {
                name: "a.txt".to_string(),
                kind: EntryKind::File,
            }]
        );
    }
}
