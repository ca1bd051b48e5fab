//! Filesystem helper executed inside sandboxes.
//!
//! `codezilla-fs-helper <list|read|write|mkdir> <absolute-path>`

use clap::{Parser, Subcommand};
use codezilla_rs_protocol::RemoteOp;
use codezilla_rs_sandbox::helper::{self, EXIT_FAILURE, EXIT_USAGE};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line interface of the helper.
#[derive(Parser)]
#[command(name = "codezilla-fs-helper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print directory entries as JSON
    List { path: PathBuf },
    /// Print file contents
    Read { path: PathBuf },
    /// Replace file contents with stdin, creating parent directories
    Write { path: PathBuf },
    /// Create a directory and its parents
    Mkdir { path: PathBuf },
}

impl Command {
    fn into_parts(self) -> (RemoteOp, PathBuf) {
        match self {
            Command::List { path } => (RemoteOp::List, path),
            Command::Read { path } => (RemoteOp::Read, path),
            Command::Write { path } => (RemoteOp::Write, path),
            Command::Mkdir { path } => (RemoteOp::Mkdir, path),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            return ExitCode::from(EXIT_USAGE as u8);
        }
        Err(err) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    let (op, path) = cli.command.into_parts();
    if !path.is_absolute() {
        eprintln!("{op} {}: path must be absolute", path.display());
        return ExitCode::from(EXIT_USAGE as u8);
    }

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    match helper::execute(op, &path, &mut stdin, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", helper::failure_message(op, &path, &err));
            ExitCode::from(EXIT_FAILURE as u8)
        }
    }
}
