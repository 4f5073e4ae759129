// CSV log of raw samples
//
// One row per raw sample, stamped with whatever attention, meditation and
// band powers were latest at that moment. Rows are buffered and written out
// at most once per flush interval, and on close.

use crate::telemetry::LatestTelemetry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Column names, in `SampleRow` field order
pub const HEADER: [&str; 12] = [
    "Timestamp",
    "Attention",
    "Meditation",
    "RawEEG",
    "Delta",
    "Theta",
    "LowAlpha",
    "HighAlpha",
    "LowBeta",
    "HighBeta",
    "LowGamma",
    "MidGamma",
];

pub type RecordingResult<T> = Result<T, RecordingError>;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Recorder already closed")]
    Closed,
}

/// One CSV row. Absent values serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SampleRow {
    pub timestamp: DateTime<Utc>,
    pub attention: Option<u8>,
    pub meditation: Option<u8>,
    #[serde(rename = "RawEEG")]
    pub raw_eeg: i16,
    pub delta: Option<u32>,
    pub theta: Option<u32>,
    pub low_alpha: Option<u32>,
    pub high_alpha: Option<u32>,
    pub low_beta: Option<u32>,
    pub high_beta: Option<u32>,
    pub low_gamma: Option<u32>,
    pub mid_gamma: Option<u32>,
}

impl SampleRow {
    pub fn new(raw_eeg: i16, latest: &LatestTelemetry, at: DateTime<Utc>) -> Self {
        let bands = latest.band_powers;
        Self {
            timestamp: at,
            attention: latest.attention,
            meditation: latest.meditation,
            raw_eeg,
            delta: bands.map(|b| b.delta),
            theta: bands.map(|b| b.theta),
            low_alpha: bands.map(|b| b.low_alpha),
            high_alpha: bands.map(|b| b.high_alpha),
            low_beta: bands.map(|b| b.low_beta),
            high_beta: bands.map(|b| b.high_beta),
            low_gamma: bands.map(|b| b.low_gamma),
            mid_gamma: bands.map(|b| b.mid_gamma),
        }
    }
}

pub struct SampleRecorder {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    pending: Vec<SampleRow>,
    rows_written: u64,
    flush_interval: Duration,
    last_flush: Instant,
}

impl SampleRecorder {
    /// Create (or truncate) the file at `path` and write the header line, so
    /// a recording with no samples is still a valid CSV file.
    pub fn create(path: impl AsRef<Path>) -> RecordingResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(HEADER)?;
        writer.flush()?;
        log::info!("Recording samples to {}", path.display());

        Ok(Self {
            path,
            writer: Some(writer),
            pending: Vec::new(),
            rows_written: 0,
            flush_interval: FLUSH_INTERVAL,
            last_flush: Instant::now(),
        })
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn record(&mut self, raw_eeg: i16, latest: &LatestTelemetry, at: DateTime<Utc>) {
        if self.writer.is_none() {
            return;
        }
        self.pending.push(SampleRow::new(raw_eeg, latest, at));
    }

    /// Flush if the interval has elapsed since the last flush
    pub fn flush_if_due(&mut self, now: Instant) -> RecordingResult<()> {
        if now.duration_since(self.last_flush) < self.flush_interval {
            return Ok(());
        }
        self.last_flush = now;
        self.flush()
    }

    pub fn flush(&mut self) -> RecordingResult<()> {
        let writer = self.writer.as_mut().ok_or(RecordingError::Closed)?;
        for row in self.pending.drain(..) {
            writer.serialize(&row)?;
            self.rows_written += 1;
        }
        writer.flush()?;
        Ok(())
    }

    /// Flush what is pending and close the file. Safe to call twice.
    pub fn close(&mut self) -> RecordingResult<()> {
        if self.writer.is_none() {
            return Ok(());
        }
        let result = self.flush();
        self.writer = None;
        log::info!(
            "Closed sample recording {} ({} rows)",
            self.path.display(),
            self.rows_written
        );
        result
    }

    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SampleRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close sample recording: {}", e);
        }
    }
}
