//! livepad-server — the target-process side of LivePad.
//!
//! Embed a [`PadServer`] in a running application to make it scriptable
//! from the LivePad client: it answers discovery pings on the LAN, accepts
//! compiled snippet payloads over a minimal HTTP exchange, executes them on
//! a dedicated execution thread with access to the host's state, and ships
//! back a dump tree of whatever the snippet produced.

pub mod commands;
pub mod discovery;
pub mod dumper;
pub mod engine;
pub mod executor;
pub mod transport;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use livepad_core::config::LivepadConfig;
use livepad_core::net::local_ipv4_or_loopback;

use commands::{ExecuteAssembly, RuntimeInfo, WhoAreYou};
use engine::Engine;
use executor::spawn_executor;
use transport::{Command, CommandTable, TransportServer};

/// A running embedded server. Lives as long as the handle: dropping it (or
/// calling [`PadServer::shutdown`]) tears the listening sockets down and
/// abandons in-flight work.
pub struct PadServer {
    local_addr: SocketAddr,
    service_name: String,
    callback_address: String,
    shutdown: broadcast::Sender<()>,
}

impl PadServer {
    /// Start listening.
    ///
    /// `host_factory` builds the application state snippets script against;
    /// it runs on the execution thread, so the state itself need not be
    /// `Send`. `extensions` are appended to the command table after the
    /// built-in commands.
    ///
    /// Transport bind failure is fatal. Discovery bind failure is not: the
    /// server stays reachable by direct address and logs a warning.
    pub async fn spawn(
        config: &LivepadConfig,
        host_factory: impl FnOnce() -> Box<dyn Any> + Send + 'static,
        extensions: Vec<Arc<dyn Command>>,
    ) -> Result<PadServer> {
        let service_name = if config.service.name.is_empty() {
            format!(
                "LivePad service on {} ({})",
                commands::hostname(),
                std::env::consts::OS
            )
        } else {
            config.service.name.clone()
        };

        let engine = Engine::new(
            config.resolved_work_dir(),
            config.execution.default_dump_depth,
            config.execution.max_sequence_items,
        );
        let (executor, _exec_thread) = spawn_executor(engine, host_factory);

        let mut table = CommandTable::new();
        table.register(Arc::new(WhoAreYou::new(service_name.clone())));
        table.register(Arc::new(RuntimeInfo));
        table.register(Arc::new(ExecuteAssembly::new(executor)));
        for extension in extensions {
            table.register(extension);
        }

        let server = TransportServer::bind(config.transport.port, table)
            .await
            .context("transport server startup failed")?;
        let local_addr = server.local_addr().context("transport local_addr")?;

        let callback_address = format!(
            "http://{}:{}/",
            local_ipv4_or_loopback(),
            local_addr.port()
        );
        tracing::info!(
            addr = %local_addr,
            callback = %callback_address,
            service = %service_name,
            "pad server listening"
        );

        let (shutdown, _) = broadcast::channel::<()>(1);

        tokio::spawn(server.run(shutdown.subscribe()));

        {
            let callback = callback_address.clone();
            let name = service_name.clone();
            let port = config.discovery.server_port;
            let shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move {
                if let Err(e) = discovery::responder_loop(port, callback, name, shutdown_rx).await {
                    tracing::warn!(error = %e, "discovery disabled");
                }
            });
        }

        Ok(PadServer {
            local_addr,
            service_name,
            callback_address,
            shutdown,
        })
    }

    /// Address the transport server actually bound (port may be OS-assigned).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The name announced to discovery clients.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The address announced to discovery clients.
    pub fn callback_address(&self) -> &str {
        &self.callback_address
    }

    /// Tear down the listening sockets. In-flight work is abandoned.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}
