// Common types for the telemetry module

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur while talking to the telemetry server
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

/// Device-computed power for each of the eight EEG bands.
///
/// The telemetry server only ever reports the full set, so a partial
/// `eegPower` object is treated as if it was never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandPowers {
    pub delta: u32,
    pub theta: u32,
    pub low_alpha: u32,
    pub high_alpha: u32,
    pub low_beta: u32,
    pub high_beta: u32,
    pub low_gamma: u32,
    pub mid_gamma: u32,
}

impl BandPowers {
    /// Band values in canonical order, delta through mid gamma
    pub fn as_array(&self) -> [u32; 8] {
        [
            self.delta,
            self.theta,
            self.low_alpha,
            self.high_alpha,
            self.low_beta,
            self.high_beta,
            self.low_gamma,
            self.mid_gamma,
        ]
    }
}

/// One decoded frame.
///
/// Every field is independently optional: the server emits partial records
/// (a raw sample frame carries nothing but `rawEeg`), and a field that was
/// not reported must stay distinguishable from a reported zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub attention: Option<u8>,
    pub meditation: Option<u8>,
    pub raw_eeg: Option<i16>,
    pub band_powers: Option<BandPowers>,
    /// 0 is perfect contact, 200 means no signal
    pub signal_quality: Option<u8>,
    pub blink_strength: Option<u8>,
}

/// Events handed to consumers once per tick, carrying the latest value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    AttentionChanged(u8),
    MeditationChanged(u8),
    RawSampleReceived(i16),
    BandPowerReceived(BandPowers),
    SignalQualityChanged(u8),
}

/// Connection state of the ingestion client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConnectionState {
    /// Transport is open and being read
    Streaming,

    /// Remote side closed or a read failed; no further events will arrive
    Disconnected { reason: String },

    /// Torn down by the owner
    Closed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Streaming
    }
}
