//! livepadd — demo host process embedding a LivePad server.
//!
//! Stands in for a real application: it owns a sample scriptable model,
//! registers one extension command, and stays up until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use livepad_core::config::LivepadConfig;
use livepad_server::transport::Command;
use livepad_server::PadServer;

mod model;

use model::AppModel;

/// Example extension command: pure pass-through file retrieval, rooted in
/// one directory.
struct GetFileContents {
    root: PathBuf,
}

#[async_trait]
impl Command for GetFileContents {
    fn name(&self) -> &str {
        "GetFileContents"
    }

    async fn run(&self, body: Bytes) -> String {
        let Ok(relative) = std::str::from_utf8(&body) else {
            return "ERROR: file path must be UTF-8".to_string();
        };
        let relative = relative.trim();
        if relative.is_empty() || relative.contains("..") || relative.starts_with('/') {
            return format!("ERROR: refusing path '{relative}'");
        }
        match tokio::fs::read_to_string(self.root.join(relative)).await {
            Ok(contents) => contents,
            Err(e) => format!("ERROR: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = LivepadConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = LivepadConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        LivepadConfig::default()
    });

    let shared_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("livepadd-shared"));
    tracing::info!(dir = %shared_dir.display(), "file sharing root");

    let server = PadServer::spawn(
        &config,
        // Built on the execution thread: real apps put their (non-Send)
        // UI state here.
        || Box::new(AppModel::sample()),
        vec![Arc::new(GetFileContents { root: shared_dir }) as Arc<dyn Command>],
    )
    .await?;

    tracing::info!(
        callback = server.callback_address(),
        service = server.service_name(),
        "livepadd ready — send snippets with livepad-ctl"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    server.shutdown();

    Ok(())
}
