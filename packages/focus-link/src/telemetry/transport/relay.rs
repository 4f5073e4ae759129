// WebSocket connection through focus-relay
//
// The relay forwards the telemetry server's bytes verbatim, one WebSocket
// message per TCP read on its side. Message boundaries therefore mean nothing
// here; every payload is handed on as a plain byte chunk.

use super::TelemetryTransport;
use crate::telemetry::types::{TelemetryError, TelemetryResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct RelayTransport {
    url: String,
    ws: Option<WsStream>,
}

impl RelayTransport {
    pub fn new(url: String) -> Self {
        Self { url, ws: None }
    }

    fn ws(&mut self) -> TelemetryResult<&mut WsStream> {
        self.ws
            .as_mut()
            .ok_or_else(|| TelemetryError::Connection("Relay transport not connected".to_string()))
    }
}

#[async_trait]
impl TelemetryTransport for RelayTransport {
    async fn connect(&mut self) -> TelemetryResult<()> {
        if self.ws.is_some() {
            return Ok(());
        }

        log::info!("Connecting to telemetry relay: {}", self.url);

        let (ws, _) = connect_async(&self.url)
            .await
            .map_err(|e| TelemetryError::WebSocket(format!("Connection failed: {}", e)))?;

        self.ws = Some(ws);
        log::info!("Relay connected successfully");

        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> TelemetryResult<()> {
        self.ws()?
            .send(Message::Binary(bytes.to_vec().into()))
            .await
            .map_err(|e| TelemetryError::WebSocket(format!("Send failed: {}", e)))
    }

    async fn recv(&mut self) -> TelemetryResult<Option<Vec<u8>>> {
        let ws = self.ws()?;

        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Binary(data)) => return Ok(Some(data.to_vec())),
                Ok(Message::Text(text)) => return Ok(Some(text.as_bytes().to_vec())),
                Ok(Message::Close(_)) => {
                    log::info!("Relay closed the connection");
                    return Ok(None);
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {
                    // Control frames are answered by tungstenite
                }
                Err(e) => return Err(TelemetryError::WebSocket(e.to_string())),
            }
        }

        Ok(None)
    }

    async fn close(&mut self) -> TelemetryResult<()> {
        if let Some(mut ws) = self.ws.take() {
            log::info!("Closing relay connection {}", self.url);
            ws.close(None)
                .await
                .map_err(|e| TelemetryError::WebSocket(format!("Close failed: {}", e)))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
