// Reading construction from the latest telemetry snapshot

use super::types::{EegReading, SessionId};
use crate::telemetry::{BandPowers, LatestTelemetry};
use chrono::{DateTime, Utc};

/// Rescale a 0..100 device value into 0..1. Absent counts as zero.
pub fn unit_fraction(value: Option<u8>) -> f32 {
    value.map_or(0.0, |v| (f32::from(v) / 100.0).clamp(0.0, 1.0))
}

/// Each band as a proportion of the eight-band total, delta first.
///
/// The total is floored at 1, so all-zero bands give zeros rather than NaN.
/// Without any band frame yet every proportion is zero.
pub fn band_proportions(bands: Option<&BandPowers>) -> [f32; 8] {
    let Some(bands) = bands else {
        return [0.0; 8];
    };

    let values = bands.as_array();
    let sum = values.iter().map(|&v| u64::from(v)).sum::<u64>().max(1) as f64;
    values.map(|v| (f64::from(v) / sum) as f32)
}

pub fn build_reading(session: SessionId, latest: &LatestTelemetry, at: DateTime<Utc>) -> EegReading {
    let [delta, theta, low_alpha, high_alpha, low_beta, high_beta, low_gamma, mid_gamma] =
        band_proportions(latest.band_powers.as_ref());

    EegReading {
        session,
        timestamp: at,
        attention: unit_fraction(latest.attention),
        meditation: unit_fraction(latest.meditation),
        delta,
        theta,
        low_alpha,
        high_alpha,
        low_beta,
        high_beta,
        low_gamma,
        mid_gamma,
    }
}
