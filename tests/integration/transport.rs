use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use livepad_client::transport as client;
use livepad_server::transport::{Command, CommandTable, TransportServer};

struct Echo;

#[async_trait]
impl Command for Echo {
    fn name(&self) -> &str {
        "Echo"
    }
    async fn run(&self, body: Bytes) -> String {
        format!("echo:{}", String::from_utf8_lossy(&body))
    }
}

struct Identify;

#[async_trait]
impl Command for Identify {
    fn name(&self) -> &str {
        "WhoAreYou"
    }
    async fn run(&self, _body: Bytes) -> String {
        "LivePad service on testbox (linux)".to_string()
    }
}

struct Exploder;

#[async_trait]
impl Command for Exploder {
    fn name(&self) -> &str {
        "Explode"
    }
    async fn run(&self, _body: Bytes) -> String {
        panic!("handler blew up");
    }
}

async fn start_server() -> (String, broadcast::Sender<()>) {
    let mut table = CommandTable::new();
    table.register(Arc::new(Echo));
    table.register(Arc::new(Identify));
    table.register(Arc::new(Exploder));

    let server = TransportServer::bind(0, table).await.expect("bind");
    let addr = server.local_addr().expect("local_addr");
    let (shutdown, _) = broadcast::channel(1);
    tokio::spawn(server.run(shutdown.subscribe()));

    (format!("http://127.0.0.1:{}/", addr.port()), shutdown)
}

#[tokio::test]
async fn post_round_trips_an_eof_terminated_body() {
    let (addr, _shutdown) = start_server().await;

    let body = vec![7u8; 5000]; // several read chunks worth
    let response = client::post(&addr, "Echo", &body).await.expect("post");
    assert!(response.starts_with("echo:"));
    assert_eq!(response.len(), "echo:".len() + 5000);
}

#[tokio::test]
async fn probe_commands_work_without_a_body() {
    let (addr, _shutdown) = start_server().await;

    let response = client::send_custom_command(&addr, "WhoAreYou")
        .await
        .expect("probe");
    assert_eq!(response, "LivePad service on testbox (linux)");
}

#[tokio::test]
async fn unknown_command_gets_a_generic_error_not_a_hangup() {
    let (addr, _shutdown) = start_server().await;

    let response = client::send_custom_command(&addr, "NoSuchThing")
        .await
        .expect("request should still complete");
    assert!(response.starts_with("ERROR:"), "{response}");
}

#[tokio::test]
async fn panicking_handler_does_not_kill_the_server() {
    let (addr, _shutdown) = start_server().await;

    let response = client::send_custom_command(&addr, "Explode")
        .await
        .expect("panic must be converted to a response");
    assert!(response.starts_with("ERROR:"), "{response}");

    // The accept loop must still be alive for the next request.
    let next = client::send_custom_command(&addr, "WhoAreYou")
        .await
        .expect("server must survive a handler panic");
    assert!(next.contains("LivePad"));
}

#[tokio::test]
async fn concurrent_connections_are_served_independently() {
    let (addr, _shutdown) = start_server().await;

    let mut joins = Vec::new();
    for i in 0..8 {
        let addr = addr.clone();
        joins.push(tokio::spawn(async move {
            let body = format!("payload-{i}");
            client::post(&addr, "Echo", body.as_bytes()).await.unwrap()
        }));
    }
    for (i, join) in joins.into_iter().enumerate() {
        assert_eq!(join.await.unwrap(), format!("echo:payload-{i}"));
    }
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let (addr, shutdown) = start_server().await;
    shutdown.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = client::send_custom_command(&addr, "WhoAreYou").await;
    assert!(result.is_err(), "server should be gone after shutdown");
}
