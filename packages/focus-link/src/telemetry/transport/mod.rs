// Byte transports to the telemetry server
//
// The client only ever sees raw byte chunks. Which wire carries them is picked
// once, from `TransportConfig`:
// - TCP: direct socket to the telemetry server
// - Relay: WebSocket to a focus-relay process, for hosts that cannot open
//   raw sockets. Each message is one chunk of the server's byte stream.

mod relay;
mod tcp;

use super::types::TelemetryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use relay::RelayTransport;
pub use tcp::TcpTransport;

/// Default port of the telemetry server
pub const DEFAULT_TELEMETRY_PORT: u16 = 13854;

/// Default relay endpoint
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:13855";

/// How to reach the telemetry server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportConfig {
    #[serde(rename = "tcp")]
    Tcp { host: String, port: u16 },

    #[serde(rename = "relay")]
    Relay { url: String },
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Tcp {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TELEMETRY_PORT,
        }
    }
}

/// A connection carrying the telemetry server's byte stream
#[async_trait]
pub trait TelemetryTransport: Send {
    /// Open the connection
    async fn connect(&mut self) -> TelemetryResult<()>;

    /// Write bytes towards the telemetry server
    async fn send(&mut self, bytes: &[u8]) -> TelemetryResult<()>;

    /// Next chunk of bytes from the server, `None` once the remote side has
    /// closed. Must be cancel-safe: the reader races it against shutdown.
    async fn recv(&mut self) -> TelemetryResult<Option<Vec<u8>>>;

    /// Close the connection
    async fn close(&mut self) -> TelemetryResult<()>;

    /// Human-readable endpoint for logs
    fn describe(&self) -> String;
}

pub fn create_transport(config: TransportConfig) -> Box<dyn TelemetryTransport> {
    match config {
        TransportConfig::Tcp { host, port } => Box::new(TcpTransport::new(host, port)),
        TransportConfig::Relay { url } => Box::new(RelayTransport::new(url)),
    }
}
