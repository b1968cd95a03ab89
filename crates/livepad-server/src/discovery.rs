//! Discovery responder.
//!
//! Listens for client pings on the well-known UDP port and answers each one
//! with this process's callback address and service name, unicast to the
//! endpoint the client declared in its ping. Anyone on the LAN can discover
//! us — this protocol is for trusted development networks only.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use livepad_core::protocol::{format_announcement, parse_ping};

/// Answer pings until shutdown.
///
/// Errors out only if the socket cannot be created at startup; the caller
/// treats that as "discovery disabled", never as a process failure.
pub async fn responder_loop(
    server_port: u16,
    callback_address: String,
    service_name: String,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let socket = make_responder_socket(server_port)
        .with_context(|| format!("failed to bind discovery responder on UDP {server_port}"))?;
    let socket = UdpSocket::from_std(socket).context("failed to convert to tokio UdpSocket")?;

    tracing::info!(port = server_port, service = %service_name, "discovery responder listening");

    let mut buf = vec![0u8; 256];
    loop {
        let (len, from) = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("discovery responder shutting down");
                return Ok(());
            }
            received = socket.recv_from(&mut buf) => match received {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "discovery recv_from failed");
                    continue;
                }
            },
        };

        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            tracing::trace!(%from, "ignoring non-UTF-8 ping");
            continue;
        };
        // The reply goes to the endpoint declared inside the ping, not to
        // the datagram's source — emulator port forwarding relies on this.
        let Some((ip, port)) = parse_ping(text) else {
            tracing::trace!(%from, ping = text, "ignoring malformed ping");
            continue;
        };
        let Ok(ip) = ip.parse::<IpAddr>() else {
            tracing::trace!(%from, ping = text, "ignoring ping with bad address");
            continue;
        };

        let reply = format_announcement(&callback_address, &service_name);
        let dest = SocketAddr::new(ip, port);
        match socket.send_to(reply.as_bytes(), dest).await {
            Ok(n) => tracing::debug!(%dest, bytes = n, "announcement sent"),
            Err(e) => tracing::warn!(%dest, error = %e, "announcement send failed"),
        }
    }
}

/// UDP socket on the well-known port, shareable with other local servers.
fn make_responder_socket(port: u16) -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;
    let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    socket.bind(&bind_addr.into()).context("bind()")?;
    Ok(socket.into())
}
