//! Client side of the transport exchange.
//!
//! The server frames request bodies by EOF, so this is a hand-rolled POST
//! over a raw TCP stream: write the head and body, shut down the write
//! half, then read the response to completion. Off-the-shelf HTTP clients
//! keep the write half open while waiting and would deadlock the exchange.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use livepad_core::dump::ExecuteResponse;
use livepad_core::protocol::CMD_EXECUTE_ASSEMBLY;

#[derive(Debug, thiserror::Error)]
pub enum ClientTransportError {
    #[error("invalid target address '{0}' (expected http://host:port/ or host:port)")]
    BadAddress(String),
    #[error("request to {addr} failed: {source}")]
    Io {
        addr: String,
        source: std::io::Error,
    },
    #[error("malformed response from {addr}")]
    MalformedResponse { addr: String },
}

/// POST `body` to `{address}/{command}` and return the response text.
pub async fn post(
    address: &str,
    command: &str,
    body: &[u8],
) -> Result<String, ClientTransportError> {
    request(address, "POST", command, body).await
}

/// Issue a body-less probe (custom command) and return the response text.
pub async fn send_custom_command(
    address: &str,
    command: &str,
) -> Result<String, ClientTransportError> {
    request(address, "GET", command, &[]).await
}

/// Send a compiled snippet and decode the structured response.
pub async fn execute(
    address: &str,
    payload: &[u8],
) -> Result<ExecuteResponse, ClientTransportError> {
    let text = post(address, CMD_EXECUTE_ASSEMBLY, payload).await?;
    serde_json::from_str(text.trim()).map_err(|e| {
        tracing::warn!(error = %e, raw = %text, "undecodable execute response");
        ClientTransportError::MalformedResponse {
            addr: address.to_string(),
        }
    })
}

async fn request(
    address: &str,
    method: &str,
    command: &str,
    body: &[u8],
) -> Result<String, ClientTransportError> {
    let (host, port) = host_port(address)?;
    let io_err = |source| ClientTransportError::Io {
        addr: address.to_string(),
        source,
    };

    let mut stream = TcpStream::connect((host.as_str(), port))
        .await
        .map_err(io_err)?;

    let head = format!(
        "{method} /{command} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: application/octet-stream\r\n\
         Connection: close\r\n\r\n"
    );
    stream.write_all(head.as_bytes()).await.map_err(io_err)?;
    if !body.is_empty() {
        stream.write_all(body).await.map_err(io_err)?;
    }
    // Half-close so the server's chunked body read sees EOF.
    stream.shutdown().await.map_err(io_err)?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.map_err(io_err)?;

    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| ClientTransportError::MalformedResponse {
            addr: address.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&raw[header_end + 4..]).into_owned())
}

/// Accepts `http://host:port/`, `http://host:port`, or bare `host:port`.
fn host_port(address: &str) -> Result<(String, u16), ClientTransportError> {
    let bad = || ClientTransportError::BadAddress(address.to_string());
    let trimmed = address
        .trim()
        .strip_prefix("http://")
        .unwrap_or(address.trim())
        .trim_end_matches('/');
    let (host, port) = trimmed.split_once(':').ok_or_else(bad)?;
    if host.is_empty() {
        return Err(bad());
    }
    let port: u16 = port.parse().map_err(|_| bad())?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_accepts_the_announced_formats() {
        assert_eq!(
            host_port("http://192.168.1.20:8080/").unwrap(),
            ("192.168.1.20".to_string(), 8080)
        );
        assert_eq!(
            host_port("http://devbox:9000").unwrap(),
            ("devbox".to_string(), 9000)
        );
        assert_eq!(
            host_port("127.0.0.1:8080").unwrap(),
            ("127.0.0.1".to_string(), 8080)
        );
    }

    #[test]
    fn host_port_rejects_garbage() {
        assert!(host_port("no-port-here").is_err());
        assert!(host_port("http://:8080/").is_err());
        assert!(host_port("host:not-a-port").is_err());
    }
}
