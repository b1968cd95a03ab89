//! Minimal HTTP transport server.
//!
//! One listening endpoint per target process. A request is a POST (or GET,
//! for body-less probe commands) whose body is read in fixed-size chunks
//! until EOF — there is no framing byte count on the wire, so clients must
//! half-close after sending. Responses are always status 200, text/plain,
//! UTF-8; errors ride in the body.
//!
//! Routing is substring matching: the first registered command whose name
//! appears in the request path+query wins.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use livepad_core::protocol::READ_CHUNK_SIZE;

/// A named request handler.
///
/// Handlers run on the connection's own task; anything that must execute on
/// the host's designated execution thread hands off internally and awaits
/// the completion signal (see `executor`).
#[async_trait]
pub trait Command: Send + Sync {
    /// The name matched against the request path+query.
    fn name(&self) -> &str;

    /// Handle one request body, producing the response text.
    async fn run(&self, body: Bytes) -> String;
}

/// Ordered command registry. Read-only once the server is running.
#[derive(Default)]
pub struct CommandTable {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// First command whose name is a substring of the path+query.
    pub fn match_path(&self, path_and_query: &str) -> Option<Arc<dyn Command>> {
        self.commands
            .iter()
            .find(|c| path_and_query.contains(c.name()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind transport listener on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
}

/// The transport server. Bind first (bind failure is a fatal startup
/// error), then drive with [`TransportServer::run`].
pub struct TransportServer {
    listener: TcpListener,
    table: Arc<CommandTable>,
}

impl TransportServer {
    pub async fn bind(port: u16, table: CommandTable) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| TransportError::Bind { port, source })?;
        Ok(Self {
            listener,
            table: Arc::new(table),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Every connection gets its own task so slow or hung
    /// handlers only ever block their own request.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("transport server shutting down");
                    return;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    tracing::debug!(%peer, "connection accepted");
                    let table = self.table.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, table).await {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    table: Arc<CommandTable>,
) -> std::io::Result<()> {
    let (path_and_query, body) = read_request(&mut stream).await?;

    let response_body = match table.match_path(&path_and_query) {
        Some(command) => {
            tracing::debug!(command = command.name(), bytes = body.len(), "dispatching");
            // A panicking handler answers with a generic error instead of
            // tearing the connection down silently.
            match std::panic::AssertUnwindSafe(command.run(body))
                .catch_unwind()
                .await
            {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!(command = command.name(), "command handler panicked");
                    format!("ERROR: command '{}' failed", command.name())
                }
            }
        }
        None => {
            tracing::warn!(path = %path_and_query, "no command matches request");
            format!("ERROR: no registered command matches '{path_and_query}'")
        }
    };

    write_response(&mut stream, &response_body).await
}

/// Read one request: the request-line path, then the body in
/// `READ_CHUNK_SIZE` chunks until EOF.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<(String, Bytes)> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    // Headers first.
    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            // Connection closed before the headers completed.
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before headers were complete",
            ));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let path_and_query = parse_request_path(&buffer[..header_end]).unwrap_or_default();

    // Body: everything after the header terminator, accumulated until EOF.
    let mut body = buffer.split_off(header_end + 4);
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok((path_and_query, Bytes::from(body)))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Pull the path+query out of `METHOD SP path SP version`.
fn parse_request_path(headers: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(headers).ok()?;
    let request_line = text.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    Some(parts.next()?.to_string())
}

async fn write_response(stream: &mut TcpStream, body: &str) -> std::io::Result<()> {
    let bytes = body.as_bytes();
    let head = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        bytes.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(bytes).await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Command for Echo {
        fn name(&self) -> &str {
            "Echo"
        }
        async fn run(&self, body: Bytes) -> String {
            String::from_utf8_lossy(&body).into_owned()
        }
    }

    struct Identify;

    #[async_trait]
    impl Command for Identify {
        fn name(&self) -> &str {
            "WhoAreYou"
        }
        async fn run(&self, _body: Bytes) -> String {
            "test service".into()
        }
    }

    #[test]
    fn routing_matches_by_substring() {
        let mut table = CommandTable::new();
        table.register(Arc::new(Echo));
        table.register(Arc::new(Identify));

        assert_eq!(table.match_path("/Echo").unwrap().name(), "Echo");
        assert_eq!(table.match_path("/WhoAreYou?x=1").unwrap().name(), "WhoAreYou");
        // Substring match anywhere in the path+query.
        assert_eq!(table.match_path("/api?cmd=Echo").unwrap().name(), "Echo");
        assert!(table.match_path("/Nothing").is_none());
    }

    #[test]
    fn first_registered_match_wins() {
        let mut table = CommandTable::new();
        table.register(Arc::new(Echo));
        table.register(Arc::new(Identify));
        // Both names appear; registration order decides.
        assert_eq!(table.match_path("/Echo/WhoAreYou").unwrap().name(), "Echo");
    }

    #[test]
    fn request_path_parses_from_request_line() {
        let headers = b"POST /ExecuteAssembly?x=1 HTTP/1.1\r\nHost: x\r\n";
        assert_eq!(
            parse_request_path(headers).as_deref(),
            Some("/ExecuteAssembly?x=1")
        );
        assert!(parse_request_path(b"garbage").is_none());
    }

    #[test]
    fn header_terminator_is_found_across_content() {
        let raw = b"POST / HTTP/1.1\r\nHost: x\r\n\r\nBODY";
        let pos = find_header_end(raw).unwrap();
        assert_eq!(&raw[pos + 4..], b"BODY");
        assert!(find_header_end(b"POST / HTTP/1.1\r\nHost").is_none());
    }
}
