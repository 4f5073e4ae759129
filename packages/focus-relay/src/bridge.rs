// One relay pairing
//
// An accepted WebSocket gets its own TCP connection to the telemetry server.
// Bytes are copied both ways unmodified. When either side closes or fails,
// the pairing ends and both connections are dropped.

use crate::error::{RelayError, RelayResult};
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// Which side ended the pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedBy {
    Client,
    Upstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingSummary {
    pub closed_by: ClosedBy,
    pub bytes_to_upstream: u64,
    pub bytes_to_client: u64,
}

pub async fn connect_upstream(addr: &str, timeout: Duration) -> RelayResult<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| RelayError::UpstreamTimeout {
            addr: addr.to_string(),
            timeout,
        })?
        .map_err(|source| RelayError::UpstreamConnect {
            addr: addr.to_string(),
            source,
        })?;
    stream
        .set_nodelay(true)
        .map_err(|source| RelayError::UpstreamConnect {
            addr: addr.to_string(),
            source,
        })?;
    Ok(stream)
}

/// Run one pairing to completion.
///
/// If the upstream connection cannot be opened the WebSocket is closed and
/// the error returned.
pub async fn run_pairing(
    mut socket: WebSocket,
    upstream_addr: &str,
    connect_timeout: Duration,
) -> RelayResult<PairingSummary> {
    let upstream = match connect_upstream(upstream_addr, connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = socket.send(Message::Close(None)).await;
            return Err(e);
        }
    };
    debug!("Connected upstream to {}", upstream_addr);

    let (tcp_read, tcp_write) = upstream.into_split();
    let (ws_sink, ws_stream) = socket.split();

    let mut to_upstream = 0u64;
    let mut to_client = 0u64;

    let closed_by = tokio::select! {
        _ = client_to_upstream(ws_stream, tcp_write, &mut to_upstream) => ClosedBy::Client,
        _ = upstream_to_client(tcp_read, ws_sink, &mut to_client) => ClosedBy::Upstream,
    };

    Ok(PairingSummary {
        closed_by,
        bytes_to_upstream: to_upstream,
        bytes_to_client: to_client,
    })
}

async fn client_to_upstream(
    mut ws_stream: SplitStream<WebSocket>,
    mut tcp_write: OwnedWriteHalf,
    forwarded: &mut u64,
) {
    while let Some(msg) = ws_stream.next().await {
        let bytes: Bytes = match msg {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Text(text)) => Bytes::copy_from_slice(text.as_str().as_bytes()),
            Ok(Message::Close(_)) => {
                info!("Client closed the connection");
                break;
            }
            // Pings are answered by axum
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        if let Err(e) = tcp_write.write_all(&bytes).await {
            warn!("Upstream write failed: {}", e);
            break;
        }
        *forwarded += bytes.len() as u64;
    }

    let _ = tcp_write.shutdown().await;
}

async fn upstream_to_client(
    mut tcp_read: OwnedReadHalf,
    mut ws_sink: SplitSink<WebSocket, Message>,
    forwarded: &mut u64,
) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match tcp_read.read(&mut buffer).await {
            Ok(0) => {
                info!("Upstream closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Upstream read failed: {}", e);
                break;
            }
        };

        let chunk = Bytes::copy_from_slice(&buffer[..n]);
        if let Err(e) = ws_sink.send(Message::Binary(chunk)).await {
            warn!("Failed to forward to client: {}", e);
            return;
        }
        *forwarded += n as u64;
    }

    let _ = ws_sink.send(Message::Close(None)).await;
}
