//! livepad-client — the desktop side of LivePad.
//!
//! Finds running target processes on the LAN, turns a human-authored
//! fragment into a compiled snippet library, ships it, and decodes the
//! returned dump tree.

pub mod compiler;
pub mod compose;
pub mod discovery;
pub mod render;
pub mod transport;

pub use compose::CodeKind;
pub use discovery::{discover, DiscoveredPad};

use livepad_core::config::SnippetConfig;
use livepad_core::dump::ExecuteResponse;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Compose(#[from] compose::ComposeError),
    #[error(transparent)]
    Compile(#[from] compiler::CompileError),
    #[error(transparent)]
    Transport(#[from] transport::ClientTransportError),
}

/// The full client pipeline: instrument → wrap → compile → send → decode.
pub async fn run_snippet(
    address: &str,
    src: &str,
    kind: CodeKind,
    config: &SnippetConfig,
) -> Result<ExecuteResponse, RunError> {
    let source = compose::compose(src, kind)?;
    let payload = compiler::compile(&source, config).await?;
    tracing::info!(bytes = payload.len(), target = address, "sending snippet");
    Ok(transport::execute(address, &payload).await?)
}
