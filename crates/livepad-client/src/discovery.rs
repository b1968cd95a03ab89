//! Discovery client.
//!
//! Broadcasts pings carrying our own listening endpoint, then collects
//! announcements for a bounded window. Servers are identified solely by
//! the callback address in the announcement — overlapping ping cycles and
//! duplicate responses are expected and deduplicated away. When the window
//! closes the socket is torn down; stragglers are silently dropped.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::Instant;

use livepad_core::config::DiscoveryConfig;
use livepad_core::net::local_ipv4_or_loopback;
use livepad_core::protocol::{format_ping, parse_announcement};

/// One server that answered a ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPad {
    pub service_name: String,
    pub callback_address: String,
}

/// Ping the local subnet and collect every distinct server that answers
/// within the window.
///
/// All failures degrade to an empty result — discovery never brings the
/// caller down.
pub async fn discover(config: &DiscoveryConfig) -> Vec<DiscoveredPad> {
    match try_discover(config).await {
        Ok(pads) => pads,
        Err(e) => {
            tracing::warn!(error = %e, "discovery failed, no servers found");
            Vec::new()
        }
    }
}

async fn try_discover(config: &DiscoveryConfig) -> Result<Vec<DiscoveredPad>> {
    let socket = make_client_socket(config.client_port)
        .with_context(|| format!("failed to bind discovery client on UDP {}", config.client_port))?;
    let socket = Arc::new(UdpSocket::from_std(socket).context("tokio UdpSocket conversion")?);

    let broadcast_ip: IpAddr = config
        .broadcast_addr
        .parse()
        .with_context(|| format!("bad broadcast address '{}'", config.broadcast_addr))?;
    let dest = SocketAddr::new(broadcast_ip, config.server_port);
    let ping = format_ping(&local_ipv4_or_loopback().to_string(), config.client_port);

    // Ping on a schedule while we listen. Responses are correlated purely
    // by content, so overlapping cycles are harmless.
    let pinger = {
        let socket = socket.clone();
        let ping = ping.clone();
        let count = config.ping_count;
        let interval = Duration::from_millis(config.ping_interval_ms);
        tokio::spawn(async move {
            for _ in 0..count {
                match socket.send_to(ping.as_bytes(), dest).await {
                    Ok(_) => tracing::trace!(%dest, "ping sent"),
                    Err(e) => tracing::warn!(%dest, error = %e, "ping send failed"),
                }
                tokio::time::sleep(interval).await;
            }
        })
    };

    let deadline = Instant::now() + Duration::from_millis(config.response_window_ms);
    let mut found: Vec<DiscoveredPad> = Vec::new();
    let mut buf = vec![0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let received = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
            Err(_) => break, // window closed
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "discovery recv failed");
                break;
            }
            Ok(Ok(r)) => r,
        };

        let (len, from) = received;
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            tracing::trace!(%from, "ignoring non-UTF-8 announcement");
            continue;
        };
        let Some((callback_address, service_name)) = parse_announcement(text) else {
            tracing::trace!(%from, raw = text, "ignoring malformed announcement");
            continue;
        };

        // Dedup by callback address: the same server may answer every ping.
        if found.iter().any(|p| p.callback_address == callback_address) {
            tracing::trace!(callback = callback_address, "duplicate announcement");
            continue;
        }
        tracing::debug!(callback = callback_address, name = service_name, "server discovered");
        found.push(DiscoveredPad {
            service_name: service_name.to_string(),
            callback_address: callback_address.to_string(),
        });
    }

    pinger.abort();
    // Socket drops here; late responses go nowhere.
    Ok(found)
}

/// UDP socket bound to the client port, able to broadcast, shareable with
/// other local clients.
fn make_client_socket(port: u16) -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_broadcast(true).context("SO_BROADCAST")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;
    let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    socket.bind(&bind_addr.into()).context("bind()")?;
    Ok(socket.into())
}
