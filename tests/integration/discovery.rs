use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use livepad_client::discovery::discover;
use livepad_core::config::DiscoveryConfig;
use livepad_core::protocol::parse_ping;
use livepad_server::discovery::responder_loop;

use crate::free_udp_port;

fn test_config(server_port: u16, client_port: u16) -> DiscoveryConfig {
    DiscoveryConfig {
        server_port,
        client_port,
        // Loopback instead of a subnet broadcast so tests stay on-host.
        broadcast_addr: "127.0.0.1".to_string(),
        response_window_ms: 600,
        ping_count: 2,
        ping_interval_ms: 100,
    }
}

#[tokio::test]
async fn responder_answers_a_real_ping_cycle() {
    let server_port = free_udp_port();
    let client_port = free_udp_port();
    let (shutdown, _) = broadcast::channel(1);

    tokio::spawn(responder_loop(
        server_port,
        "http://192.168.1.50:8080/".to_string(),
        "LivePad service on Alpha".to_string(),
        shutdown.subscribe(),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let pads = discover(&test_config(server_port, client_port)).await;

    assert_eq!(pads.len(), 1, "exactly one server should be discovered");
    assert_eq!(pads[0].service_name, "LivePad service on Alpha");
    assert_eq!(pads[0].callback_address, "http://192.168.1.50:8080/");
    shutdown.send(()).ok();
}

/// Two servers answer, one of them repeatedly. The discovered set after
/// the window is {Alpha, Beta}, deduplicated by callback address.
#[tokio::test]
async fn duplicate_announcements_are_deduplicated() {
    let server_port = free_udp_port();
    let client_port = free_udp_port();

    // A scripted "network" standing in for two servers: every ping gets
    // Alpha twice and Beta once.
    let fake_network = UdpSocket::bind(("127.0.0.1", server_port))
        .await
        .expect("bind fake responder");
    tokio::spawn(async move {
        let mut buf = vec![0u8; 256];
        loop {
            let Ok((len, _from)) = fake_network.recv_from(&mut buf).await else {
                return;
            };
            let text = String::from_utf8_lossy(&buf[..len]).into_owned();
            let Some((ip, port)) = parse_ping(&text) else {
                continue;
            };
            let dest = (ip.to_string(), port);
            for reply in [
                "http://10.0.0.1:8080/|Alpha",
                "http://10.0.0.1:8080/|Alpha",
                "http://10.0.0.2:8080/|Beta",
            ] {
                let _ = fake_network.send_to(reply.as_bytes(), &dest).await;
            }
        }
    });

    let pads = discover(&test_config(server_port, client_port)).await;

    let mut names: Vec<&str> = pads.iter().map(|p| p.service_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Alpha", "Beta"], "dedup by callback address failed");
}

#[tokio::test]
async fn no_servers_means_empty_not_error() {
    let server_port = free_udp_port(); // nobody listening there
    let client_port = free_udp_port();

    let mut config = test_config(server_port, client_port);
    config.response_window_ms = 250;
    config.ping_count = 1;

    let pads = discover(&config).await;
    assert!(pads.is_empty());
}

#[tokio::test]
async fn malformed_datagrams_are_ignored() {
    let server_port = free_udp_port();
    let client_port = free_udp_port();

    let fake_network = UdpSocket::bind(("127.0.0.1", server_port))
        .await
        .expect("bind fake responder");
    tokio::spawn(async move {
        let mut buf = vec![0u8; 256];
        loop {
            let Ok((len, _)) = fake_network.recv_from(&mut buf).await else {
                return;
            };
            let text = String::from_utf8_lossy(&buf[..len]).into_owned();
            let Some((ip, port)) = parse_ping(&text) else {
                continue;
            };
            let dest = (ip.to_string(), port);
            let _ = fake_network.send_to(b"no separator in here", &dest).await;
            let _ = fake_network.send_to(&[0xFF, 0xFE, 0x00], &dest).await;
            let _ = fake_network
                .send_to(b"http://10.0.0.3:8080/|Gamma", &dest)
                .await;
        }
    });

    let pads = discover(&test_config(server_port, client_port)).await;
    assert_eq!(pads.len(), 1);
    assert_eq!(pads[0].service_name, "Gamma");
}
