//! LivePad integration test harness.
//!
//! Everything here runs in-process over loopback: real transport sockets,
//! real UDP discovery datagrams, real executor threads. Ports are
//! OS-assigned (or grabbed ephemerally) per test so tests can run in
//! parallel.
//!
//! End-to-end snippet execution with a real compiled dylib additionally
//! needs a staged livepad-runtime rlib for `rustc`; everything up to the
//! library-load boundary is covered here with invalid payloads instead.

use std::net::UdpSocket;

mod discovery;
mod pipeline;
mod transport;

/// Grab a free UDP port by binding to 0 and letting the socket go.
/// Slightly racy, fine for tests.
pub fn free_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind ephemeral");
    socket.local_addr().expect("local_addr").port()
}
