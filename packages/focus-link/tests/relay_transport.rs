use focus_link::telemetry::{TelemetryClient, TelemetryEvent, TransportConfig, CONFIG_REQUEST};
use focus_relay::{serve, RelayConfig};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_through_relay() {
    // Telemetry server
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap().to_string();
    let (request_tx, request_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = upstream.accept().await.unwrap();
        let mut request = vec![0u8; CONFIG_REQUEST.len()];
        socket.read_exact(&mut request).await.unwrap();
        let _ = request_tx.send(request);

        socket
            .write_all(b"{\"poorSignalLevel\":26}\r{\"eSense\":{\"atten")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        socket
            .write_all(b"tion\":64,\"meditation\":0}}\r")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    // Relay in front of it
    let relay = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay_addr = relay.local_addr().unwrap();
    let (_stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(serve(
        relay,
        RelayConfig {
            bind_addr: relay_addr,
            upstream_addr,
            connect_timeout: Duration::from_secs(2),
        },
        async {
            let _ = stop_rx.await;
        },
    ));

    let mut client = TelemetryClient::connect(TransportConfig::Relay {
        url: format!("ws://{}", relay_addr),
    })
    .await
    .unwrap();

    assert_eq!(request_rx.await.unwrap(), CONFIG_REQUEST);

    for _ in 0..200 {
        if client.latest().attention.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let events = client.dispatch_tick();
    assert!(events.contains(&TelemetryEvent::SignalQualityChanged(26)));
    assert!(events.contains(&TelemetryEvent::AttentionChanged(64)));
    // A reported zero is still reported
    assert!(events.contains(&TelemetryEvent::MeditationChanged(0)));

    client.shutdown().await.unwrap();
}
