// Signal-gated focus scorer
//
// WaitingForSignal -> Running on the first good-enough signal quality
// reading; Running -> Finished when the window runs out or is cancelled.
// Whichever of the two happens first produces the one and only score.

use super::types::{ScorerPhase, ScoringConfig, ScoringWindow, SessionScore};
use crate::telemetry::TelemetryEvent;
use std::time::Duration;

type TickListener = Box<dyn FnMut(&ScoringWindow) + Send>;

pub struct SessionScorer {
    config: ScoringConfig,
    phase: ScorerPhase,
    window: Option<ScoringWindow>,
    last_attention: Option<u8>,
    result: Option<SessionScore>,
    listeners: Vec<TickListener>,
}

impl SessionScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            phase: ScorerPhase::WaitingForSignal,
            window: None,
            last_attention: None,
            result: None,
            listeners: Vec::new(),
        }
    }

    /// Register a callback invoked after every running tick
    pub fn on_tick<F>(&mut self, listener: F)
    where
        F: FnMut(&ScoringWindow) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Returns true when this reading opened the gate
    pub fn observe_signal_quality(&mut self, quality: u8) -> bool {
        if self.phase != ScorerPhase::WaitingForSignal
            || quality > self.config.good_signal_threshold
        {
            return false;
        }

        log::info!(
            "Signal quality {} is good enough, starting {:.0}s window",
            quality,
            self.config.duration.as_secs_f64()
        );
        self.phase = ScorerPhase::Running;
        self.window = Some(ScoringWindow::new(&self.config));
        true
    }

    pub fn observe_attention(&mut self, attention: u8) {
        self.last_attention = Some(attention);
    }

    /// Feed a dispatched telemetry event. Returns true when the gate opened.
    pub fn observe(&mut self, event: &TelemetryEvent) -> bool {
        match *event {
            TelemetryEvent::SignalQualityChanged(quality) => self.observe_signal_quality(quality),
            TelemetryEvent::AttentionChanged(attention) => {
                self.observe_attention(attention);
                false
            }
            _ => false,
        }
    }

    /// Advance the window by `elapsed`. Returns the score on the tick that
    /// finishes the window.
    pub fn tick(&mut self, elapsed: Duration) -> Option<SessionScore> {
        if self.phase != ScorerPhase::Running {
            return None;
        }
        let window = self.window.as_mut()?;

        let credited = elapsed.as_secs_f64().min(window.remaining_seconds);
        let focused = self
            .last_attention
            .is_some_and(|a| a >= window.attention_threshold);
        if focused {
            window.focused_seconds += credited;
        }
        window.remaining_seconds = (window.remaining_seconds - credited).max(0.0);

        let snapshot = *window;
        for listener in &mut self.listeners {
            listener(&snapshot);
        }

        if snapshot.remaining_seconds <= 0.0 {
            return Some(self.finish(true));
        }
        None
    }

    /// Stop the window early. Returns the partial score, or None if a score
    /// was already produced or the window never started.
    pub fn cancel(&mut self) -> Option<SessionScore> {
        match self.phase {
            ScorerPhase::Running => Some(self.finish(false)),
            ScorerPhase::WaitingForSignal => {
                self.phase = ScorerPhase::Finished;
                None
            }
            ScorerPhase::Finished => None,
        }
    }

    fn finish(&mut self, completed: bool) -> SessionScore {
        self.phase = ScorerPhase::Finished;
        let (focused_seconds, score) = self
            .window
            .map_or((0.0, 0.0), |w| (w.focused_seconds, w.score()));

        let result = SessionScore {
            focused_seconds,
            score,
            completed,
        };
        log::info!(
            "Focus window {}: {:.1}s focused, score {:.1}",
            if completed { "finished" } else { "cancelled" },
            focused_seconds,
            score
        );
        self.result = Some(result);
        result
    }

    pub fn phase(&self) -> ScorerPhase {
        self.phase
    }

    pub fn window(&self) -> Option<&ScoringWindow> {
        self.window.as_ref()
    }

    pub fn result(&self) -> Option<SessionScore> {
        self.result
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const SECOND: Duration = Duration::from_secs(1);

    fn scorer(seconds: u64) -> SessionScorer {
        SessionScorer::new(ScoringConfig {
            duration: Duration::from_secs(seconds),
            attention_threshold: 50,
            good_signal_threshold: 25,
        })
    }

    #[test]
    fn test_attention_sequence_scores_75() {
        let mut scorer = scorer(4);
        assert!(scorer.observe_signal_quality(0));

        let mut finished = None;
        for attention in [80, 80, 30, 80] {
            scorer.observe_attention(attention);
            finished = scorer.tick(SECOND);
        }

        let score = finished.unwrap();
        assert_eq!(score.focused_seconds, 3.0);
        assert_eq!(score.score, 75.0);
        assert!(score.completed);
        assert_eq!(scorer.phase(), ScorerPhase::Finished);
    }

    #[test]
    fn test_no_accumulation_before_gate() {
        let mut scorer = scorer(4);
        scorer.observe_attention(100);

        assert!(scorer.tick(SECOND * 10).is_none());
        assert!(!scorer.observe_signal_quality(200));
        assert!(scorer.tick(SECOND).is_none());
        assert_eq!(scorer.phase(), ScorerPhase::WaitingForSignal);
        assert!(scorer.window().is_none());

        assert!(scorer.observe_signal_quality(25));
        assert_eq!(scorer.window().unwrap().focused_seconds, 0.0);
        assert_eq!(scorer.window().unwrap().remaining_seconds, 4.0);
    }

    #[test]
    fn test_gate_opens_once() {
        let mut scorer = scorer(4);
        assert!(scorer.observe(&TelemetryEvent::SignalQualityChanged(10)));
        assert!(!scorer.observe(&TelemetryEvent::SignalQualityChanged(0)));
    }

    #[test]
    fn test_missing_attention_is_not_focused() {
        let mut scorer = scorer(2);
        scorer.observe_signal_quality(0);
        scorer.tick(SECOND);
        let score = scorer.tick(SECOND).unwrap();
        assert_eq!(score.focused_seconds, 0.0);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_oversized_tick_is_capped() {
        let mut scorer = scorer(4);
        scorer.observe_signal_quality(0);
        scorer.observe_attention(90);

        let score = scorer.tick(SECOND * 9).unwrap();
        assert_eq!(score.focused_seconds, 4.0);
        assert_eq!(score.score, 100.0);
    }

    #[test]
    fn test_finish_and_cancel_are_exclusive() {
        let mut scorer = scorer(1);
        scorer.observe_signal_quality(0);
        assert!(scorer.tick(SECOND).is_some());
        assert!(scorer.cancel().is_none());
        assert!(scorer.tick(SECOND).is_none());

        let mut scorer = SessionScorer::new(ScoringConfig::default());
        scorer.observe_signal_quality(0);
        scorer.observe_attention(60);
        scorer.tick(SECOND * 3);

        let partial = scorer.cancel().unwrap();
        assert!(!partial.completed);
        assert_eq!(partial.score, 10.0);
        assert!(scorer.cancel().is_none());
        assert!(scorer.tick(SECOND).is_none());
        assert_eq!(scorer.result(), Some(partial));
    }

    #[test]
    fn test_tick_listeners_see_remaining_time() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut scorer = scorer(3);
        let sink = Arc::clone(&seen);
        scorer.on_tick(move |window| sink.lock().unwrap().push(window.remaining_seconds));

        scorer.observe_signal_quality(0);
        for _ in 0..5 {
            scorer.tick(SECOND);
        }

        assert_eq!(*seen.lock().unwrap(), vec![2.0, 1.0, 0.0]);
    }
}
