//! Drives `rustc` to turn a composed snippet source into a cdylib payload.
//!
//! The compiler binary, edition, and the path to the livepad-runtime rlib
//! come from configuration — resolving toolchains is the caller's problem.

use tokio::process::Command;

use livepad_core::config::SnippetConfig;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to stage snippet source: {0}")]
    Stage(#[from] std::io::Error),
    #[error("failed to run '{rustc}': {source}")]
    Spawn {
        rustc: String,
        source: std::io::Error,
    },
    #[error("snippet failed to compile:\n{stderr}")]
    Rustc { stderr: String },
}

/// Compile a composed snippet source, returning the library bytes.
pub async fn compile(source: &str, config: &SnippetConfig) -> Result<Vec<u8>, CompileError> {
    let staging = tempfile::tempdir()?;
    let source_path = staging.path().join("snippet.rs");
    let output_path = staging.path().join("snippet.so");
    tokio::fs::write(&source_path, source).await?;

    let mut command = Command::new(&config.rustc);
    command
        .arg("--edition")
        .arg(&config.edition)
        .arg("--crate-type")
        .arg("cdylib")
        .arg("--crate-name")
        .arg("livepad_snippet")
        .arg("-o")
        .arg(&output_path);
    if !config.runtime_lib.as_os_str().is_empty() {
        command
            .arg("--extern")
            .arg(format!("livepad_runtime={}", config.runtime_lib.display()));
    }
    if !config.deps_dir.as_os_str().is_empty() {
        command
            .arg("-L")
            .arg(format!("dependency={}", config.deps_dir.display()));
    }
    command.arg(&source_path);

    tracing::debug!(rustc = %config.rustc, source = %source_path.display(), "compiling snippet");
    let output = command.output().await.map_err(|source| CompileError::Spawn {
        rustc: config.rustc.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(CompileError::Rustc {
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(tokio::fs::read(&output_path).await?)
}
