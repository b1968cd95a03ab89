//! Small networking helpers shared by both ends of the protocol.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// Best-effort local IPv4 address.
///
/// Connects a throwaway UDP socket to a public address — no packet is sent,
/// but the OS picks the outbound interface, whose address we read back.
/// Returns `None` when the host has no usable route; callers fall back to
/// loopback.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:53").ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(v4) if !v4.ip().is_unspecified() => Some(*v4.ip()),
        _ => None,
    }
}

/// Local IPv4 address, falling back to loopback.
pub fn local_ipv4_or_loopback() -> Ipv4Addr {
    local_ipv4().unwrap_or(Ipv4Addr::LOCALHOST)
}
