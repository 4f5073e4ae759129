// Telemetry ingestion client
//
// Owns exactly one transport. A reader task pulls byte chunks off it, runs
// them through the frame decoder and folds every decoded frame into the
// latest-value slots. Consumers never see the reader directly: they call
// `dispatch_tick` once per update cycle and receive at most one event per
// field, carrying the newest value.
//
// On a multi-threaded runtime the reader runs on a worker thread next to the
// consumer; on a current-thread runtime it is interleaved cooperatively with
// it. Both regimes go through the same locks, so what the consumer observes is
// identical.

use super::decoder::FrameDecoder;
use super::latest::{LatestTelemetry, LatestValues};
use super::transport::{create_transport, TelemetryTransport, TransportConfig};
use super::types::{ConnectionState, TelemetryError, TelemetryEvent, TelemetryResult};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sent once after connecting: raw samples on, JSON framing
pub const CONFIG_REQUEST: &[u8] = b"{\"enableRawOutput\":true,\"format\":\"Json\"}\n";

type Listener = Box<dyn FnMut(&TelemetryEvent) + Send>;

/// State shared between the reader task and the consumer
struct IngestShared {
    decoder: Mutex<FrameDecoder>,
    latest: Mutex<LatestValues>,
    state: RwLock<ConnectionState>,
    last_frame_at: Mutex<Option<Instant>>,
    chunks_received: AtomicU64,
}

impl IngestShared {
    fn new() -> Self {
        Self {
            decoder: Mutex::new(FrameDecoder::new()),
            latest: Mutex::new(LatestValues::new()),
            state: RwLock::new(ConnectionState::Streaming),
            last_frame_at: Mutex::new(None),
            chunks_received: AtomicU64::new(0),
        }
    }

    fn ingest(&self, bytes: &[u8]) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);

        // Append and drain under one lock
        let samples = self.decoder.lock().push(bytes);
        if samples.is_empty() {
            return;
        }

        // Apply the whole chunk at once so a tick never sees half of it
        {
            let mut latest = self.latest.lock();
            for sample in &samples {
                latest.apply(sample);
            }
        }
        *self.last_frame_at.lock() = Some(Instant::now());
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write();
        // A close by the owner is final
        if *current != ConnectionState::Closed {
            *current = state;
        }
    }
}

/// Read-only view of the latest decoded values
#[derive(Clone)]
pub struct TelemetryHandle {
    shared: Arc<IngestShared>,
}

impl TelemetryHandle {
    pub fn latest(&self) -> LatestTelemetry {
        self.shared.latest.lock().snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.read().clone()
    }
}

/// Ingestion client over any `TelemetryTransport`
pub struct TelemetryClient {
    endpoint: String,
    shared: Arc<IngestShared>,
    listeners: Vec<Listener>,
    cancel_token: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl TelemetryClient {
    /// Build the transport from configuration and connect
    pub async fn connect(config: TransportConfig) -> TelemetryResult<Self> {
        Self::with_transport(create_transport(config)).await
    }

    /// Connect over an already constructed transport, send the configuration
    /// request and start reading.
    pub async fn with_transport(mut transport: Box<dyn TelemetryTransport>) -> TelemetryResult<Self> {
        let endpoint = transport.describe();

        transport.connect().await?;
        if let Err(e) = transport.send(CONFIG_REQUEST).await {
            let _ = transport.close().await;
            return Err(e);
        }
        log::info!("Requested JSON output from {}", endpoint);

        let shared = Arc::new(IngestShared::new());
        let cancel_token = CancellationToken::new();
        let reader = tokio::spawn(read_loop(
            transport,
            Arc::clone(&shared),
            cancel_token.clone(),
        ));

        Ok(Self {
            endpoint,
            shared,
            listeners: Vec::new(),
            cancel_token,
            reader: Some(reader),
        })
    }

    /// Register a listener, called from `dispatch_tick`
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&TelemetryEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver everything that changed since the previous tick.
    ///
    /// Call this once per consumer update. Returns the events that were
    /// handed to the listeners.
    pub fn dispatch_tick(&mut self) -> Vec<TelemetryEvent> {
        if self.reader.is_none() {
            return Vec::new();
        }

        let events = self.shared.latest.lock().take_events();
        for event in &events {
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
        }
        events
    }

    pub fn latest(&self) -> LatestTelemetry {
        self.shared.latest.lock().snapshot()
    }

    pub fn handle(&self) -> TelemetryHandle {
        TelemetryHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.read().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == ConnectionState::Streaming
    }

    /// Time since the last decoded frame; `None` before the first one.
    ///
    /// There is no automatic reconnect. Callers that want one watch this and
    /// build a fresh client.
    pub fn idle_for(&self) -> Option<Duration> {
        self.shared.last_frame_at.lock().map(|t| t.elapsed())
    }

    pub fn frames_decoded(&self) -> u64 {
        self.shared.decoder.lock().frames_decoded()
    }

    pub fn frames_dropped(&self) -> u64 {
        self.shared.decoder.lock().frames_dropped()
    }

    pub fn chunks_received(&self) -> u64 {
        self.shared.chunks_received.load(Ordering::Relaxed)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stop reading and close the transport. Safe to call more than once.
    pub async fn shutdown(&mut self) -> TelemetryResult<()> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };

        log::info!("Shutting down telemetry client for {}", self.endpoint);
        self.cancel_token.cancel();
        self.shared.set_state(ConnectionState::Closed);

        reader
            .await
            .map_err(|e| TelemetryError::Connection(format!("Reader task failed: {}", e)))
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        // The reader closes the transport itself once cancelled
        self.cancel_token.cancel();
    }
}

/// Reader task: the only owner of the transport, and the only place that
/// closes it.
async fn read_loop(
    mut transport: Box<dyn TelemetryTransport>,
    shared: Arc<IngestShared>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log::debug!("Telemetry reader cancelled");
                break;
            }

            chunk = transport.recv() => match chunk {
                Ok(Some(bytes)) => shared.ingest(&bytes),
                Ok(None) => {
                    log::info!("Telemetry connection closed by remote");
                    shared.set_state(ConnectionState::Disconnected {
                        reason: "closed by remote".to_string(),
                    });
                    break;
                }
                Err(e) => {
                    log::warn!("Telemetry read failed: {}", e);
                    shared.set_state(ConnectionState::Disconnected {
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
    }

    if let Err(e) = transport.close().await {
        log::debug!("Error closing telemetry transport: {}", e);
    }
}
