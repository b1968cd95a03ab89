//! LivePad protocol constants — ports, command names, and message shapes.
//!
//! These values ARE the protocol. Both the client and the target-process
//! server compile against this module; changing a default port or a command
//! name is a breaking change for every deployed pair.

/// UDP port the discovery responder listens on inside the target process.
pub const DISCOVERY_SERVER_PORT: u16 = 5353;

/// UDP port the discovery client declares in its ping and listens on for
/// announcements.
pub const DISCOVERY_CLIENT_PORT: u16 = 5354;

/// How long the discovery client keeps its listening socket open after the
/// first ping, in milliseconds. Responses arriving after the window closes
/// are silently dropped.
pub const DISCOVERY_WINDOW_MS: u64 = 2000;

/// How many pings a single discovery cycle sends.
pub const DISCOVERY_PING_COUNT: u32 = 3;

/// Delay between pings within one discovery cycle, in milliseconds.
pub const DISCOVERY_PING_INTERVAL_MS: u64 = 200;

/// Default TCP port for the transport server.
pub const DEFAULT_TRANSPORT_PORT: u16 = 8080;

/// Transport request bodies are read in chunks of this many bytes until EOF.
/// There is no upfront content length on the wire.
pub const READ_CHUNK_SIZE: usize = 1024;

// ── Command names ────────────────────────────────────────────────────────────
//
// A request is routed to the first command whose name appears as a substring
// of the request path+query.

/// Identity probe: responds with the service name, which encodes the platform.
pub const CMD_WHO_ARE_YOU: &str = "WhoAreYou";

/// Reference-library probe: responds with the runtime crate name and version
/// the server was built against.
pub const CMD_GET_RUNTIME_INFO: &str = "GetRuntimeInfo";

/// The core path: the request body is a compiled snippet library, executed
/// on the host's designated execution thread.
pub const CMD_EXECUTE_ASSEMBLY: &str = "ExecuteAssembly";

// ── Execution fault format ───────────────────────────────────────────────────

const EXCEPTION_PREFIX: &str = "EXCEPTION at offset: ";

/// Format an execution fault for the wire.
///
/// `offset` is the zero-based character offset of the last statement that
/// began executing — not necessarily the statement that faulted, but within
/// one statement of it.
pub fn exception_message(offset: usize, message: &str) -> String {
    format!("{EXCEPTION_PREFIX}{offset}: {message}")
}

/// Split a wire error message back into (offset, fault message).
/// Returns `None` for load failures, which carry no offset.
pub fn parse_exception_message(raw: &str) -> Option<(usize, &str)> {
    let rest = raw.strip_prefix(EXCEPTION_PREFIX)?;
    let (offset, message) = rest.split_once(": ")?;
    Some((offset.parse().ok()?, message))
}

/// Format a discovery ping datagram.
pub fn format_ping(client_ip: &str, client_port: u16) -> String {
    format!("{client_ip}:{client_port}")
}

/// Parse a discovery ping datagram into (ip, port).
pub fn parse_ping(datagram: &str) -> Option<(&str, u16)> {
    let (ip, port) = datagram.trim().split_once(':')?;
    Some((ip, port.parse().ok()?))
}

/// Format a discovery announcement datagram.
pub fn format_announcement(callback_address: &str, service_name: &str) -> String {
    format!("{callback_address}|{service_name}")
}

/// Parse a discovery announcement into (callback address, service name).
pub fn parse_announcement(datagram: &str) -> Option<(&str, &str)> {
    datagram.trim().split_once('|')
}
