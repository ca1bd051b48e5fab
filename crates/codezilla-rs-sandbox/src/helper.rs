//! Filesystem primitives executed inside the sandbox by `codezilla-fs-helper`.
//!
//! The helper is the only code that runs on the sandbox side. It implements a
//! fixed set of operations over absolute paths and speaks raw bytes on
//! stdin/stdout, so callers never build code strings at call time.

use codezilla_rs_protocol::{EntryKind, HelperEntry, RemoteOp};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Exit code for a failed operation.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for a malformed invocation.
pub const EXIT_USAGE: i32 = 2;

/// Execute `op` on `path`, reading payload from `stdin` and writing results to `stdout`.
pub fn execute(
    op: RemoteOp,
    path: &Path,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> io::Result<()> {
    match op {
        RemoteOp::List => list(path, stdout),
        RemoteOp::Read => read(path, stdout),
        RemoteOp::Write => write(path, stdin),
        RemoteOp::Mkdir => fs::create_dir_all(path),
    }
}

/// Message printed on stderr when an operation fails.
pub fn failure_message(op: RemoteOp, path: &Path, err: &io::Error) -> String {
    format!("{op} {}: {err}", path.display())
}

fn list(path: &Path, stdout: &mut dyn Write) -> io::Result<()> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        // Names that are not UTF-8 cannot be addressed through the API.
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let kind = if entry.file_type()?.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(HelperEntry {
            name,
            kind,
        });
    }
    serde_json::to_writer(&mut *stdout, &entries).map_err(io::Error::other)?;
    stdout.flush()
}

fn read(path: &Path, stdout: &mut dyn Write) -> io::Result<()> {
    let mut file = fs::File::open(path)?;
    if file.metadata()?.is_dir() {
        return Err(io::Error::other("is a directory"));
    }
    io::copy(&mut file, stdout)?;
    stdout.flush()
}

fn write(path: &Path, stdin: &mut dyn Read) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut contents = Vec::new();
    stdin.read_to_end(&mut contents)?;
    fs::write(path, contents)
}
