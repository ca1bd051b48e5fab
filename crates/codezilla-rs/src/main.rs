//! `codezilla`: serve the sandboxed filesystem bridge over HTTP.

use anyhow::Context;
use clap::Parser;
use codezilla_rs::config::{CodezillaConfig, LayeredConfigOptions};
use log::{info, warn};
use std::path::PathBuf;

/// Command-line options for the file bridge server.
#[derive(Parser)]
#[command(name = "codezilla", version)]
struct Cli {
    /// Optional path to a codezilla.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    bind: Option<String>,
    /// Host project directory (overrides project.root)
    #[arg(long)]
    project_dir: Option<PathBuf>,
    /// Never use a sandbox; serve the host filesystem
    #[arg(long)]
    local: bool,
}

/// Entry point for the Codezilla file bridge.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codezilla_rs::init_logging();

    let cli = Cli::parse();
    info!(
        "starting file bridge (config_set={}, bind_set={}, project_dir_set={}, local={})",
        cli.config.is_some(),
        cli.bind.is_some(),
        cli.project_dir.is_some(),
        cli.local
    );

    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = &cli.config {
        options = options.with_runtime_path(path);
    }
    let config = CodezillaConfig::load_layered_with_options(options)
        .context("failed to load configuration")?
        .config;

    let project_dir = match &cli.project_dir {
        Some(dir) => cwd.join(dir),
        None => config.project.resolve_root(&cwd),
    };
    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());

    let files = codezilla_rs::file_service(&config, project_dir, cli.local);
    let manager = files.manager().clone();

    let served = codezilla_rs::server::serve(files, &bind, shutdown_signal()).await;
    if let Err(err) = &served {
        warn!("file API exited with error (error={err:#})");
    }
    if manager.teardown().await {
        info!("file bridge shut down");
    }
    served
}

/// Resolve on interrupt or terminate.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(err) => {
                warn!("failed to listen for SIGTERM (error={err})");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
