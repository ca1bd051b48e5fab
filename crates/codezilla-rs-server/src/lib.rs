//! HTTP surface of the file bridge.
//!
//! Handlers own request parsing, response envelopes and caching headers;
//! everything else is delegated to [`codezilla_rs_fs::FileService`].

pub mod routes;

use codezilla_rs_fs::FileService;
use log::info;
use std::future::Future;
use tokio::net::TcpListener;

pub use routes::{AppState, Encoding, router};

/// Serve the file API on `bind` until `shutdown` resolves.
pub async fn serve(
    files: FileService,
    bind: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("file API listening (addr={})", listener.local_addr()?);
    axum::serve(listener, router(files))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("file API stopped");
    Ok(())
}
