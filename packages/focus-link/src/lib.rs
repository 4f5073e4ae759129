//! Headset telemetry ingestion, remote session upload and focus scoring.
//!
//! - [`telemetry`]: decode the telemetry server's `\r`-delimited JSON stream
//!   over TCP or a WebSocket relay and dispatch the latest values per tick
//! - [`upload`]: start a remote session, post one reading per interval, end it
//! - [`scoring`]: signal-gated focus window and score
//! - [`recording`]: CSV log of raw samples
//! - [`play`]: the tick loop tying the above together

pub mod config;
pub mod play;
pub mod recording;
pub mod scoring;
pub mod telemetry;
pub mod upload;

pub use config::{ConfigError, SessionConfig};
pub use play::{PlayOutcome, PlaySession, StopReason};
pub use telemetry::{TelemetryClient, TelemetryEvent, TransportConfig};
pub use upload::{HttpSessionApi, SessionUploader};
