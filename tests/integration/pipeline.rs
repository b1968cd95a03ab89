//! Full-stack exchanges against an embedded `PadServer`: discovery ping,
//! identity probes, extension commands, and the execute path down to the
//! library-load boundary.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use livepad_client::transport as client;
use livepad_core::config::LivepadConfig;
use livepad_core::dump::ExecuteResponse;
use livepad_server::transport::Command;
use livepad_server::PadServer;

use crate::free_udp_port;

struct Uppercase;

#[async_trait]
impl Command for Uppercase {
    fn name(&self) -> &str {
        "Uppercase"
    }
    async fn run(&self, body: Bytes) -> String {
        String::from_utf8_lossy(&body).to_uppercase()
    }
}

async fn spawn_pad() -> (PadServer, String) {
    let mut config = LivepadConfig::default();
    config.transport.port = 0;
    config.discovery.server_port = free_udp_port();
    config.service.name = "LivePad service on pipeline-test".to_string();

    let server = PadServer::spawn(
        &config,
        || Box::new(41i64),
        vec![Arc::new(Uppercase) as Arc<dyn Command>],
    )
    .await
    .expect("pad server spawn");
    let target = format!("http://127.0.0.1:{}/", server.local_addr().port());
    (server, target)
}

#[tokio::test]
async fn identity_probes_answer_over_the_full_stack() {
    let (server, target) = spawn_pad().await;

    let who = client::send_custom_command(&target, "WhoAreYou")
        .await
        .expect("WhoAreYou");
    assert_eq!(who, "LivePad service on pipeline-test");

    let info = client::send_custom_command(&target, "GetRuntimeInfo")
        .await
        .expect("GetRuntimeInfo");
    assert!(info.starts_with("livepad-runtime "), "{info}");

    server.shutdown();
}

#[tokio::test]
async fn extension_commands_ride_the_same_table() {
    let (server, target) = spawn_pad().await;

    let response = client::post(&target, "Uppercase", b"shout this")
        .await
        .expect("extension command");
    assert_eq!(response, "SHOUT THIS");

    server.shutdown();
}

#[tokio::test]
async fn invalid_payload_surfaces_as_a_structured_load_error() {
    let (server, target) = spawn_pad().await;

    let response: ExecuteResponse = client::execute(&target, b"this is not a dylib")
        .await
        .expect("execute must answer with JSON, not fail transport");

    let message = response.error_message.expect("load failure expected");
    assert!(message.contains("not a loadable snippet library"), "{message}");
    assert!(response.results.is_none());

    // The server survives a bad payload and answers the next request.
    let who = client::send_custom_command(&target, "WhoAreYou")
        .await
        .expect("server must remain available");
    assert!(who.contains("pipeline-test"));

    server.shutdown();
}

#[tokio::test]
async fn execute_responses_keep_the_compatible_wire_shape() {
    let (server, target) = spawn_pad().await;

    let raw = client::post(&target, "ExecuteAssembly", b"garbage")
        .await
        .expect("raw execute");
    let value: serde_json::Value = serde_json::from_str(raw.trim()).expect("JSON body");

    // Flat shape: both top-level fields present, by name.
    let object = value.as_object().expect("response is an object");
    assert!(object.contains_key("ErrorMessage"));
    assert!(object.contains_key("Results"));
    assert!(object["Results"].is_null());

    server.shutdown();
}
