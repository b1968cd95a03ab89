//! Configuration system for LivePad.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $LIVEPAD_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/livepad/config.toml
//!   3. ~/.config/livepad/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::protocol;

/// Top-level configuration, shared by the embedded server and the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LivepadConfig {
    pub service: ServiceConfig,
    pub discovery: DiscoveryConfig,
    pub transport: TransportConfig,
    pub execution: ExecutionConfig,
    pub snippet: SnippetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Announced service name. Empty = "LivePad service on {hostname}".
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// UDP port servers listen on for pings.
    pub server_port: u16,
    /// UDP port clients declare and listen on for announcements.
    pub client_port: u16,
    /// Broadcast address pings are sent to.
    pub broadcast_addr: String,
    /// How long the client collects announcements before tearing down, ms.
    pub response_window_ms: u64,
    /// Pings sent per discovery cycle.
    pub ping_count: u32,
    /// Delay between pings within a cycle, ms.
    pub ping_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP port the transport server binds. 0 = OS-assigned.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Directory snippet libraries are written to before loading.
    /// Empty = the OS temp dir.
    pub work_dir: PathBuf,
    /// Default per-sequence item cap. Snippets may override per run.
    pub max_sequence_items: usize,
    /// Default dump depth for `ctx.dump()` without an explicit depth.
    pub default_dump_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetConfig {
    /// Compiler the client invokes to build snippet libraries.
    pub rustc: String,
    /// Rust edition snippets are compiled as.
    pub edition: String,
    /// Path to the compiled livepad-runtime rlib the snippet links.
    /// Resolving this from a toolchain/build is the caller's concern.
    pub runtime_lib: PathBuf,
    /// Directory holding the runtime's transitive dependency rlibs.
    pub deps_dir: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            server_port: protocol::DISCOVERY_SERVER_PORT,
            client_port: protocol::DISCOVERY_CLIENT_PORT,
            broadcast_addr: "255.255.255.255".to_string(),
            response_window_ms: protocol::DISCOVERY_WINDOW_MS,
            ping_count: protocol::DISCOVERY_PING_COUNT,
            ping_interval_ms: protocol::DISCOVERY_PING_INTERVAL_MS,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: protocol::DEFAULT_TRANSPORT_PORT,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::new(),
            max_sequence_items: 1000,
            default_dump_depth: 3,
        }
    }
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            rustc: "rustc".to_string(),
            edition: "2021".to_string(),
            runtime_lib: PathBuf::new(),
            deps_dir: PathBuf::new(),
        }
    }
}

// ── Path helpers ─────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_or_tmp().join(".config"))
        .join("livepad")
}

fn home_or_tmp() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl LivepadConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            LivepadConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("LIVEPAD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&LivepadConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Directory snippet libraries are staged in before loading.
    pub fn resolved_work_dir(&self) -> PathBuf {
        if self.execution.work_dir.as_os_str().is_empty() {
            std::env::temp_dir().join("livepad")
        } else {
            self.execution.work_dir.clone()
        }
    }

    /// Apply LIVEPAD_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LIVEPAD_SERVICE__NAME") {
            self.service.name = v;
        }
        if let Ok(v) = std::env::var("LIVEPAD_DISCOVERY__SERVER_PORT") {
            if let Ok(p) = v.parse() {
                self.discovery.server_port = p;
            }
        }
        if let Ok(v) = std::env::var("LIVEPAD_DISCOVERY__CLIENT_PORT") {
            if let Ok(p) = v.parse() {
                self.discovery.client_port = p;
            }
        }
        if let Ok(v) = std::env::var("LIVEPAD_DISCOVERY__BROADCAST_ADDR") {
            self.discovery.broadcast_addr = v;
        }
        if let Ok(v) = std::env::var("LIVEPAD_TRANSPORT__PORT") {
            if let Ok(p) = v.parse() {
                self.transport.port = p;
            }
        }
        if let Ok(v) = std::env::var("LIVEPAD_EXECUTION__MAX_SEQUENCE_ITEMS") {
            if let Ok(n) = v.parse() {
                self.execution.max_sequence_items = n;
            }
        }
        if let Ok(v) = std::env::var("LIVEPAD_SNIPPET__RUSTC") {
            self.snippet.rustc = v;
        }
    }
}
