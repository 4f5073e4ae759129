use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);
pub const DEFAULT_ATTENTION_THRESHOLD: u8 = 50;
pub const DEFAULT_GOOD_SIGNAL_THRESHOLD: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    pub duration: Duration,
    /// Attention at or above this counts as focused
    pub attention_threshold: u8,
    /// Signal quality at or below this opens the gate
    pub good_signal_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_WINDOW,
            attention_threshold: DEFAULT_ATTENTION_THRESHOLD,
            good_signal_threshold: DEFAULT_GOOD_SIGNAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScorerPhase {
    WaitingForSignal,
    Running,
    Finished,
}

/// Progress of the active window, reported to tick listeners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWindow {
    pub duration_seconds: f64,
    pub attention_threshold: u8,
    pub focused_seconds: f64,
    pub remaining_seconds: f64,
}

impl ScoringWindow {
    pub fn new(config: &ScoringConfig) -> Self {
        let duration_seconds = config.duration.as_secs_f64();
        Self {
            duration_seconds,
            attention_threshold: config.attention_threshold,
            focused_seconds: 0.0,
            remaining_seconds: duration_seconds,
        }
    }

    /// Focused share of the window as a percentage
    pub fn score(&self) -> f64 {
        if self.duration_seconds <= 0.0 {
            return 0.0;
        }
        (self.focused_seconds / self.duration_seconds).clamp(0.0, 1.0) * 100.0
    }

    /// Remaining time as `mm:ss`, rounded up to the whole second
    pub fn remaining_display(&self) -> String {
        let total = self.remaining_seconds.max(0.0).ceil() as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

/// Final result of a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScore {
    pub focused_seconds: f64,
    pub score: f64,
    /// False when the window was cancelled before running out
    pub completed: bool,
}
