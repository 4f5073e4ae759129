// Frame decoder for the telemetry server's JSON stream
//
// The server writes one JSON object per frame, each terminated by a carriage
// return. Reads from the socket land on arbitrary byte boundaries, so the
// decoder keeps the unterminated tail between calls and only parses frames
// once their terminator has arrived.

use super::types::{BandPowers, TelemetryError, TelemetryResult, TelemetrySample};
use serde::Deserialize;

/// Frame terminator used by the telemetry server
pub const FRAME_DELIMITER: u8 = b'\r';

/// Largest frame accepted, terminator excluded. Longer frames are dropped
/// whole, however the bytes were split across reads, and at most this many
/// bytes of one are ever buffered.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    e_sense: Option<RawESense>,
    raw_eeg: Option<i64>,
    eeg_power: Option<RawEegPower>,
    poor_signal_level: Option<i64>,
    blink_strength: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawESense {
    attention: Option<i64>,
    meditation: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEegPower {
    delta: Option<i64>,
    theta: Option<i64>,
    low_alpha: Option<i64>,
    high_alpha: Option<i64>,
    low_beta: Option<i64>,
    high_beta: Option<i64>,
    low_gamma: Option<i64>,
    mid_gamma: Option<i64>,
}

impl RawEegPower {
    fn into_band_powers(self) -> Option<BandPowers> {
        let band = |v: Option<i64>| v.and_then(|v| u32::try_from(v).ok());
        Some(BandPowers {
            delta: band(self.delta)?,
            theta: band(self.theta)?,
            low_alpha: band(self.low_alpha)?,
            high_alpha: band(self.high_alpha)?,
            low_beta: band(self.low_beta)?,
            high_beta: band(self.high_beta)?,
            low_gamma: band(self.low_gamma)?,
            mid_gamma: band(self.mid_gamma)?,
        })
    }
}

/// Keep a reported value only if it lies in `0..=max`
fn bounded(value: Option<i64>, max: u8, field: &str) -> Option<u8> {
    let value = value?;
    match u8::try_from(value) {
        Ok(v) if v <= max => Some(v),
        _ => {
            log::debug!("Ignoring out-of-range {}: {}", field, value);
            None
        }
    }
}

/// Split everything received so far into complete frames and the leftover
/// unterminated bytes. Frames are returned without their terminator.
pub fn split_frames(buffer: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut frames = Vec::new();
    let mut rest = buffer;

    while let Some(idx) = rest.iter().position(|&b| b == FRAME_DELIMITER) {
        frames.push(&rest[..idx]);
        rest = &rest[idx + 1..];
    }

    (frames, rest)
}

/// Decode a single frame (terminator already stripped).
///
/// Returns `Ok(None)` for frames that are blank after trimming whitespace;
/// the `\n` the server sometimes emits after `\r` ends up as such a frame.
pub fn decode_frame(frame: &[u8]) -> TelemetryResult<Option<TelemetrySample>> {
    let trimmed = frame.trim_ascii();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let raw: RawFrame = serde_json::from_slice(trimmed).map_err(|e| {
        TelemetryError::MalformedFrame(format!("{} in {}", e, preview(trimmed)))
    })?;

    let (attention, meditation) = match raw.e_sense {
        Some(e) => (
            bounded(e.attention, 100, "attention"),
            bounded(e.meditation, 100, "meditation"),
        ),
        None => (None, None),
    };

    let raw_eeg = raw.raw_eeg.and_then(|v| match i16::try_from(v) {
        Ok(v) => Some(v),
        Err(_) => {
            log::debug!("Ignoring out-of-range rawEeg: {}", v);
            None
        }
    });

    Ok(Some(TelemetrySample {
        attention,
        meditation,
        raw_eeg,
        band_powers: raw.eeg_power.and_then(RawEegPower::into_band_powers),
        signal_quality: bounded(raw.poor_signal_level, 200, "poorSignalLevel"),
        blink_strength: bounded(raw.blink_strength, u8::MAX, "blinkStrength"),
    }))
}

fn preview(frame: &[u8]) -> String {
    const LIMIT: usize = 80;
    let text = String::from_utf8_lossy(&frame[..frame.len().min(LIMIT)]).into_owned();
    if frame.len() > LIMIT {
        format!("{}...", text)
    } else {
        text
    }
}

/// Incremental decoder owning the append buffer
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    /// Skipping the rest of an oversized frame up to its terminator
    discarding: bool,
    frames_decoded: u64,
    frames_dropped: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly received bytes and decode every frame they complete.
    ///
    /// Malformed and oversized frames are logged and skipped; decoding
    /// carries on with the next frame.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<TelemetrySample> {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|&b| b == FRAME_DELIMITER) {
                Some(idx) => {
                    self.discarding = false;
                    bytes = &bytes[idx + 1..];
                }
                None => return Vec::new(),
            }
        }

        self.pending.extend_from_slice(bytes);

        let (frames, rest) = split_frames(&self.pending);
        let consumed = self.pending.len() - rest.len();

        let mut samples = Vec::with_capacity(frames.len());
        for frame in frames {
            if frame.len() > MAX_FRAME_BYTES {
                self.frames_dropped += 1;
                log::warn!("Dropping oversized telemetry frame ({} bytes)", frame.len());
                continue;
            }
            match decode_frame(frame) {
                Ok(Some(sample)) => {
                    self.frames_decoded += 1;
                    samples.push(sample);
                }
                Ok(None) => {}
                Err(e) => {
                    self.frames_dropped += 1;
                    log::warn!("Dropping telemetry frame: {}", e);
                }
            }
        }

        self.pending.drain(..consumed);

        if self.pending.len() > MAX_FRAME_BYTES {
            log::warn!(
                "Dropping oversized telemetry frame ({}+ bytes without a terminator)",
                self.pending.len()
            );
            self.frames_dropped += 1;
            self.pending.clear();
            self.discarding = true;
        }

        samples
    }

    /// Bytes waiting for their terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}
