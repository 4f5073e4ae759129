// One play session: the consumer tick loop
//
// Every tick dispatches the client's events, feeds the scorer and the
// recorder, and advances the focus window. The upload pipeline is begun in
// the background as soon as the signal gate opens so a slow start request
// never stalls the tick. When the window finishes, the caller cancels, or the
// telemetry connection drops, the pipeline is ended once and the client is
// torn down.

use crate::recording::SampleRecorder;
use crate::scoring::{ScoringConfig, SessionScore, SessionScorer};
use crate::telemetry::{TelemetryClient, TelemetryEvent};
use crate::upload::{SampleSource, SessionId, SessionUploader, UploadResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    Finished,
    Cancelled,
    Disconnected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOutcome {
    pub reason: StopReason,
    /// None if the signal gate never opened
    pub score: Option<SessionScore>,
    pub session_id: Option<SessionId>,
    pub end_response: Option<String>,
}

pub struct PlaySession {
    client: TelemetryClient,
    scorer: SessionScorer,
    uploader: Option<SessionUploader>,
    recorder: Option<SampleRecorder>,
    tick_interval: Duration,
}

impl PlaySession {
    pub fn new(client: TelemetryClient, scoring: ScoringConfig) -> Self {
        let mut scorer = SessionScorer::new(scoring);

        let mut last_shown = None;
        scorer.on_tick(move |window| {
            let whole = window.remaining_seconds.ceil() as u64;
            if last_shown != Some(whole) {
                last_shown = Some(whole);
                log::info!("Remaining {}", window.remaining_display());
            }
        });

        Self {
            client,
            scorer,
            uploader: None,
            recorder: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_uploader(mut self, uploader: SessionUploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_recorder(mut self, recorder: SampleRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Run until the window finishes, `cancel` fires, or the telemetry
    /// connection goes away.
    pub async fn run(mut self, cancel: CancellationToken) -> PlayOutcome {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_tick = Instant::now();
        let mut begin_task: Option<JoinHandle<UploadResult<SessionId>>> = None;

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            let elapsed = now.duration_since(last_tick);
            last_tick = now;

            let gate_opened = self.dispatch_events(&mut begin_task);

            // The tick that opens the gate credits nothing
            if !gate_opened && self.scorer.tick(elapsed).is_some() {
                break StopReason::Finished;
            }

            if !self.client.is_streaming() {
                log::warn!(
                    "Telemetry connection lost ({:?}), stopping session",
                    self.client.state()
                );
                break StopReason::Disconnected;
            }
        };

        self.finish(reason, begin_task).await
    }

    /// Hand this tick's events to the scorer and recorder. Returns true if
    /// the signal gate opened.
    fn dispatch_events(
        &mut self,
        begin_task: &mut Option<JoinHandle<UploadResult<SessionId>>>,
    ) -> bool {
        let mut gate_opened = false;

        for event in self.client.dispatch_tick() {
            if self.scorer.observe(&event) {
                gate_opened = true;
                *begin_task = self.spawn_begin();
            }

            if let (TelemetryEvent::RawSampleReceived(raw), Some(recorder)) =
                (event, self.recorder.as_mut())
            {
                recorder.record(raw, &self.client.latest(), Utc::now());
            }
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.flush_if_due(std::time::Instant::now()) {
                log::warn!("Sample recording stopped: {}", e);
                self.recorder = None;
            }
        }

        gate_opened
    }

    fn spawn_begin(&self) -> Option<JoinHandle<UploadResult<SessionId>>> {
        let uploader = self.uploader.clone()?;
        let source: Arc<dyn SampleSource> = Arc::new(self.client.handle());
        Some(tokio::spawn(async move { uploader.begin(source).await }))
    }

    async fn finish(
        mut self,
        reason: StopReason,
        begin_task: Option<JoinHandle<UploadResult<SessionId>>>,
    ) -> PlayOutcome {
        let score = match reason {
            StopReason::Finished => self.scorer.result(),
            _ => self.scorer.cancel(),
        };

        let mut end_response = None;
        let mut session_id = None;
        if let Some(uploader) = &self.uploader {
            // Waits for an in-flight start request, then closes its session
            match uploader.end().await {
                Ok(body) => end_response = body,
                Err(e) => log::warn!("Ending upload session failed: {}", e),
            }

            if let Some(task) = begin_task {
                match task.await {
                    Ok(Ok(id)) => log::debug!("Upload session {} was started", id),
                    Ok(Err(e)) => log::warn!("Upload session did not start: {}", e),
                    Err(e) => log::warn!("Upload start task failed: {}", e),
                }
            }
            session_id = uploader.session_id();
        }

        if let Err(e) = self.client.shutdown().await {
            log::warn!("Telemetry shutdown failed: {}", e);
        }

        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.close() {
                log::warn!("Closing sample recording failed: {}", e);
            }
        }

        log::info!("Play session stopped: {:?}", reason);
        PlayOutcome {
            reason,
            score,
            session_id,
            end_response,
        }
    }
}
