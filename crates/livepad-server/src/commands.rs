//! Built-in transport commands.
//!
//! `WhoAreYou` and `GetRuntimeInfo` identify the service and the runtime it
//! links; `ExecuteAssembly` is the core path. Host applications may register
//! any number of extension commands alongside these — the server treats them
//! as opaque pass-through handlers.

use async_trait::async_trait;
use bytes::Bytes;

use livepad_core::protocol::{CMD_EXECUTE_ASSEMBLY, CMD_GET_RUNTIME_INFO, CMD_WHO_ARE_YOU};

use crate::executor::ExecutorHandle;
use crate::transport::Command;

/// Identity probe. Clients use the returned name to tell platforms apart.
pub struct WhoAreYou {
    service_name: String,
}

impl WhoAreYou {
    pub fn new(service_name: String) -> Self {
        Self { service_name }
    }
}

#[async_trait]
impl Command for WhoAreYou {
    fn name(&self) -> &str {
        CMD_WHO_ARE_YOU
    }
    async fn run(&self, _body: Bytes) -> String {
        self.service_name.clone()
    }
}

/// Reports the runtime crate and version this server was built against, so
/// clients can compile snippets against a matching runtime.
pub struct RuntimeInfo;

#[async_trait]
impl Command for RuntimeInfo {
    fn name(&self) -> &str {
        CMD_GET_RUNTIME_INFO
    }
    async fn run(&self, _body: Bytes) -> String {
        format!("livepad-runtime {}", livepad_runtime::VERSION)
    }
}

/// The core path: hand the payload to the execution thread, wait for the
/// completion signal, return the serialized response.
pub struct ExecuteAssembly {
    executor: ExecutorHandle,
}

impl ExecuteAssembly {
    pub fn new(executor: ExecutorHandle) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Command for ExecuteAssembly {
    fn name(&self) -> &str {
        CMD_EXECUTE_ASSEMBLY
    }
    async fn run(&self, body: Bytes) -> String {
        self.executor.execute(body).await
    }
}

/// Best-effort hostname for the default service name.
pub(crate) fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}
