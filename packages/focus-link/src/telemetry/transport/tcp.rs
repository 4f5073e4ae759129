// Direct TCP connection to the telemetry server

use super::TelemetryTransport;
use crate::telemetry::types::{TelemetryError, TelemetryResult};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_BUFFER_SIZE: usize = 4096;

pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    buf: Box<[u8]>,
}

impl TcpTransport {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            stream: None,
            buf: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    fn stream(&mut self) -> TelemetryResult<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| TelemetryError::Connection("TCP transport not connected".to_string()))
    }
}

#[async_trait]
impl TelemetryTransport for TcpTransport {
    async fn connect(&mut self) -> TelemetryResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        log::info!("Connecting to telemetry server at {}:{}", self.host, self.port);

        let addr = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| TelemetryError::Connection(format!("TCP connection failed: {}", e)))?;
        stream.set_nodelay(true)?;

        self.stream = Some(stream);
        log::info!("TCP connected successfully");

        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> TelemetryResult<()> {
        let stream = self.stream()?;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> TelemetryResult<Option<Vec<u8>>> {
        let Self { stream, buf, .. } = self;
        let stream = stream
            .as_mut()
            .ok_or_else(|| TelemetryError::Connection("TCP transport not connected".to_string()))?;

        let n = stream.read(buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buf[..n].to_vec()))
    }

    async fn close(&mut self) -> TelemetryResult<()> {
        if let Some(mut stream) = self.stream.take() {
            log::info!("Closing TCP connection to {}:{}", self.host, self.port);
            stream.shutdown().await?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}
