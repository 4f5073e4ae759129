// Latest-value slots shared between the reader and the consumer tick
//
// The reader applies whole frames; the consumer takes whatever changed since
// its previous tick. Storage is one slot per field, so a stalled consumer
// costs nothing beyond the newest value.

use super::types::{BandPowers, TelemetryEvent, TelemetrySample};
use serde::{Deserialize, Serialize};

/// Snapshot of the most recent value reported for each field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LatestTelemetry {
    pub attention: Option<u8>,
    pub meditation: Option<u8>,
    pub raw_eeg: Option<i16>,
    pub band_powers: Option<BandPowers>,
    pub signal_quality: Option<u8>,
    pub blink_strength: Option<u8>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Dirty {
    attention: bool,
    meditation: bool,
    raw_eeg: bool,
    band_powers: bool,
    signal_quality: bool,
}

/// Latest values plus the set of fields updated since the last tick
#[derive(Debug, Default)]
pub struct LatestValues {
    current: LatestTelemetry,
    dirty: Dirty,
}

impl LatestValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded frame in. Fields the frame did not carry keep their
    /// previous value.
    pub fn apply(&mut self, sample: &TelemetrySample) {
        if let Some(v) = sample.attention {
            self.current.attention = Some(v);
            self.dirty.attention = true;
        }
        if let Some(v) = sample.meditation {
            self.current.meditation = Some(v);
            self.dirty.meditation = true;
        }
        if let Some(v) = sample.raw_eeg {
            self.current.raw_eeg = Some(v);
            self.dirty.raw_eeg = true;
        }
        if let Some(v) = sample.band_powers {
            self.current.band_powers = Some(v);
            self.dirty.band_powers = true;
        }
        if let Some(v) = sample.signal_quality {
            self.current.signal_quality = Some(v);
            self.dirty.signal_quality = true;
        }
        if let Some(v) = sample.blink_strength {
            self.current.blink_strength = Some(v);
        }
    }

    pub fn snapshot(&self) -> LatestTelemetry {
        self.current
    }

    /// Drain the pending events, at most one per field
    pub fn take_events(&mut self) -> Vec<TelemetryEvent> {
        let dirty = std::mem::take(&mut self.dirty);
        let c = &self.current;
        let mut events = Vec::new();

        if let (true, Some(v)) = (dirty.signal_quality, c.signal_quality) {
            events.push(TelemetryEvent::SignalQualityChanged(v));
        }
        if let (true, Some(v)) = (dirty.attention, c.attention) {
            events.push(TelemetryEvent::AttentionChanged(v));
        }
        if let (true, Some(v)) = (dirty.meditation, c.meditation) {
            events.push(TelemetryEvent::MeditationChanged(v));
        }
        if let (true, Some(v)) = (dirty.raw_eeg, c.raw_eeg) {
            events.push(TelemetryEvent::RawSampleReceived(v));
        }
        if let (true, Some(v)) = (dirty.band_powers, c.band_powers) {
            events.push(TelemetryEvent::BandPowerReceived(v));
        }

        events
    }
}
