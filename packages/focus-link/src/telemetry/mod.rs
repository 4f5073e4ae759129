// Headset telemetry ingestion
//
// Architecture:
// - `decoder`: pure `\r`-delimited JSON frame decoding, no I/O
// - `transport`: trait-based byte transports (direct TCP, WebSocket relay)
// - `latest`: single-slot-per-field storage between reader and consumer
// - `client`: owns the transport, runs the reader, dispatches once per tick

pub mod client;
pub mod decoder;
pub mod latest;
pub mod transport;
pub mod types;

pub use client::{TelemetryClient, TelemetryHandle, CONFIG_REQUEST};
pub use decoder::{decode_frame, split_frames, FrameDecoder};
pub use latest::{LatestTelemetry, LatestValues};
pub use transport::{create_transport, TelemetryTransport, TransportConfig};
pub use types::{
    BandPowers, ConnectionState, TelemetryError, TelemetryEvent, TelemetryResult, TelemetrySample,
};
