// Session upload pipeline
//
// Idle -> Starting -> Uploading -> Ending -> Ended, with a failed start
// falling back to Idle. Lifecycle transitions are serialized by one async
// mutex, so an `end` that arrives while the start request is in flight waits
// for it and then closes whatever session it produced.
//
// Ordering guarantees:
// - no reading is posted before the start request returned a usable id
// - the end request goes out only after the upload loop has stopped,
//   including any reading that was in flight
// - at most one end request per pipeline, whether it came from `end` or from
//   dropping the last handle

use super::api::SessionApi;
use super::reading::build_reading;
use super::types::{
    PipelineState, SessionId, StartSessionRequest, StartSessionResponse, UploadConfig,
    UploadError, UploadResult, UploadSettings,
};
use crate::telemetry::{LatestTelemetry, TelemetryHandle};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Where the upload loop gets its latest sample from
pub trait SampleSource: Send + Sync {
    fn latest(&self) -> LatestTelemetry;
}

impl SampleSource for TelemetryHandle {
    fn latest(&self) -> LatestTelemetry {
        TelemetryHandle::latest(self)
    }
}

/// Counters for the periodic upload loop
#[derive(Debug, Default)]
pub struct UploadStats {
    readings_sent: AtomicU64,
    readings_failed: AtomicU64,
}

impl UploadStats {
    pub fn readings_sent(&self) -> u64 {
        self.readings_sent.load(Ordering::Relaxed)
    }

    pub fn readings_failed(&self) -> u64 {
        self.readings_failed.load(Ordering::Relaxed)
    }
}

struct Lifecycle {
    cancel_token: CancellationToken,
    upload_task: Option<JoinHandle<()>>,
}

impl Lifecycle {
    /// Stop the periodic loop; a no-op if it never started
    async fn stop_uploads(&mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.upload_task.take() {
            if let Err(e) = task.await {
                log::warn!("Upload loop ended abnormally: {}", e);
            }
        }
    }
}

struct UploaderInner {
    api: Arc<dyn SessionApi>,
    settings: UploadSettings,
    config: RwLock<Option<UploadConfig>>,
    state: RwLock<PipelineState>,
    session_id: RwLock<Option<SessionId>>,
    end_requested: AtomicBool,
    end_response: RwLock<Option<String>>,
    stats: Arc<UploadStats>,
    lifecycle: TokioMutex<Lifecycle>,
}

impl UploaderInner {
    fn set_state(&self, state: PipelineState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            log::debug!("Upload pipeline {:?} -> {:?}", previous, state);
        }
    }
}

impl Drop for UploaderInner {
    fn drop(&mut self) {
        if self.end_requested.swap(true, Ordering::SeqCst) {
            return;
        }

        let lifecycle = self.lifecycle.get_mut();
        lifecycle.cancel_token.cancel();
        let upload_task = lifecycle.upload_task.take();

        let Some(session) = *self.session_id.read() else {
            return;
        };

        let bearer = self
            .config
            .read()
            .as_ref()
            .and_then(|c| c.bearer().map(str::to_string));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::info!("Ending session {} on teardown", session);
                let api = Arc::clone(&self.api);
                handle.spawn(async move {
                    // The loop finishes its in-flight reading before it sees
                    // the cancellation; the end request must come after it
                    if let Some(task) = upload_task {
                        if let Err(e) = task.await {
                            log::warn!("Upload loop ended abnormally: {}", e);
                        }
                    }
                    if let Err(e) = api.end_session(session, bearer.as_deref()).await {
                        log::warn!("Teardown end request for session {} failed: {}", session, e);
                    }
                });
            }
            Err(_) => {
                if let Some(task) = upload_task {
                    task.abort();
                }
                log::warn!(
                    "No runtime available at teardown, session {} left open",
                    session
                );
            }
        }
    }
}

/// Client-side driver of one remote session. Cloning shares the pipeline.
#[derive(Clone)]
pub struct SessionUploader {
    inner: Arc<UploaderInner>,
}

impl SessionUploader {
    pub fn new(api: Arc<dyn SessionApi>, settings: UploadSettings) -> Self {
        Self {
            inner: Arc::new(UploaderInner {
                api,
                settings,
                config: RwLock::new(None),
                state: RwLock::new(PipelineState::Idle),
                session_id: RwLock::new(None),
                end_requested: AtomicBool::new(false),
                end_response: RwLock::new(None),
                stats: Arc::new(UploadStats::default()),
                lifecycle: TokioMutex::new(Lifecycle {
                    cancel_token: CancellationToken::new(),
                    upload_task: None,
                }),
            }),
        }
    }

    /// Supply auth token and ids. Required before `begin`.
    pub fn configure(&self, config: UploadConfig) {
        log::info!(
            "Upload pipeline configured: game_id={}, prescription_id={}, token={}",
            config.game_id,
            config.prescription_id,
            if config.bearer().is_some() { "set" } else { "none" }
        );
        *self.inner.config.write() = Some(config);
    }

    /// Apply the embedding app's JSON config
    /// (`{"bearerToken": .., "gameId": .., "prescriptionId": ..}`)
    pub fn apply_config_json(&self, json: &str) -> UploadResult<()> {
        let config: UploadConfig = serde_json::from_str(json)
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?;
        self.configure(config);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.inner.config.read().is_some()
    }

    /// Create the remote session and start the periodic upload loop.
    ///
    /// On any failure the pipeline is back in `Idle` and no reading has been
    /// posted.
    pub async fn begin(&self, source: Arc<dyn SampleSource>) -> UploadResult<SessionId> {
        let inner = &self.inner;
        let config = inner.config.read().clone().ok_or(UploadError::NotConfigured)?;

        let mut lifecycle = inner.lifecycle.lock().await;
        if inner.end_requested.load(Ordering::SeqCst) {
            return Err(UploadError::SessionClosed);
        }
        let state = self.state();
        if state != PipelineState::Idle {
            return Err(UploadError::InvalidState(state));
        }

        inner.set_state(PipelineState::Starting);

        let request = StartSessionRequest {
            game_id: config.game_id,
            prescription_id: config.prescription_id,
        };
        if inner.settings.log_requests {
            log::debug!("Start session => {:?}", request);
        }

        let body = match inner.api.start_session(&request, config.bearer()).await {
            Ok(body) => body,
            Err(e) => {
                log::error!("Start session failed: {}", e);
                inner.set_state(PipelineState::Idle);
                return Err(UploadError::Start(e));
            }
        };

        let Some(session) = resolve_session_id(&body, inner.settings.session_id_override) else {
            log::error!("Could not determine session id from start response");
            inner.set_state(PipelineState::Idle);
            return Err(UploadError::MissingSessionId { body });
        };

        *inner.session_id.write() = Some(session);
        inner.set_state(PipelineState::Uploading);
        log::info!("Session {} started", session);

        let cancel_token = CancellationToken::new();
        lifecycle.cancel_token = cancel_token.clone();
        lifecycle.upload_task = Some(tokio::spawn(upload_loop(
            UploadContext {
                api: Arc::clone(&inner.api),
                source,
                session,
                bearer: config.bearer().map(str::to_string),
                settings: inner.settings.clone(),
                stats: Arc::clone(&inner.stats),
            },
            cancel_token,
        )));

        Ok(session)
    }

    /// Stop uploading and close the remote session.
    ///
    /// Only the first call does anything; later calls return `Ok(None)`.
    /// Returns the end response body. A failed end request still leaves the
    /// pipeline `Ended`.
    pub async fn end(&self) -> UploadResult<Option<String>> {
        let inner = &self.inner;
        if inner.end_requested.swap(true, Ordering::SeqCst) {
            log::debug!("End already requested, ignoring");
            return Ok(None);
        }

        let mut lifecycle = inner.lifecycle.lock().await;
        inner.set_state(PipelineState::Ending);
        lifecycle.stop_uploads().await;

        let session = *inner.session_id.read();
        let Some(session) = session else {
            log::info!("No session was started, nothing to end");
            inner.set_state(PipelineState::Ended);
            return Ok(None);
        };

        let bearer = inner
            .config
            .read()
            .as_ref()
            .and_then(|c| c.bearer().map(str::to_string));

        if inner.settings.log_requests {
            log::debug!("Ending session {}", session);
        }

        let result = inner.api.end_session(session, bearer.as_deref()).await;
        inner.set_state(PipelineState::Ended);

        match result {
            Ok(body) => {
                log::info!("Session {} ended", session);
                log::debug!("End session response body: {}", body);
                *inner.end_response.write() = Some(body.clone());
                Ok(Some(body))
            }
            Err(e) => {
                log::warn!("End session {} failed: {}", session, e);
                Err(UploadError::End(e))
            }
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.inner.state.read()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        *self.inner.session_id.read()
    }

    /// Body returned by the end request, once it succeeded
    pub fn end_response(&self) -> Option<String> {
        self.inner.end_response.read().clone()
    }

    pub fn stats(&self) -> &UploadStats {
        &self.inner.stats
    }
}

/// Session id from the start response, or the override when the response
/// is unusable. Zero is never a valid id.
fn resolve_session_id(body: &str, fallback: Option<SessionId>) -> Option<SessionId> {
    match serde_json::from_str::<StartSessionResponse>(body) {
        Ok(response) if response.id != 0 => return Some(response.id),
        Ok(_) => log::warn!("Start response carried session id 0"),
        Err(e) => log::warn!("Failed to parse start response: {}", e),
    }

    let fallback = fallback.filter(|&id| id != 0)?;
    log::warn!("Falling back to override session id {}", fallback);
    Some(fallback)
}

struct UploadContext {
    api: Arc<dyn SessionApi>,
    source: Arc<dyn SampleSource>,
    session: SessionId,
    bearer: Option<String>,
    settings: UploadSettings,
    stats: Arc<UploadStats>,
}

/// Post one reading per interval until cancelled. Failures are logged and
/// counted; nothing is retried or queued.
async fn upload_loop(ctx: UploadContext, cancel_token: CancellationToken) {
    let period = ctx.settings.post_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reading = build_reading(ctx.session, &ctx.source.latest(), Utc::now());
        if ctx.settings.log_requests {
            log::debug!("POST reading => {:?}", reading);
        }

        match ctx.api.post_reading(&reading, ctx.bearer.as_deref()).await {
            Ok(_) => {
                ctx.stats.readings_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                ctx.stats.readings_failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Reading upload failed: {}", e);
            }
        }
    }

    log::debug!("Upload loop for session {} stopped", ctx.session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::{ApiError, ApiResult, EegReading};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(i64, i64, Option<String>),
        Reading(SessionId, f32),
        End(SessionId),
    }

    /// Records each call once it has completed
    struct FakeApi {
        start_body: Mutex<ApiResult<String>>,
        start_delay: Duration,
        reading_delay: Duration,
        fail_readings: bool,
        fail_end: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl Default for FakeApi {
        fn default() -> Self {
            Self {
                start_body: Mutex::new(Ok("{\"id\":1}".to_string())),
                start_delay: Duration::ZERO,
                reading_delay: Duration::ZERO,
                fail_readings: false,
                fail_end: false,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeApi {
        fn new(start_body: ApiResult<String>) -> Arc<Self> {
            Arc::new(Self {
                start_body: Mutex::new(start_body),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.lock().iter().filter(|c| pred(c)).count()
        }
    }

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            body: "nope".to_string(),
        }
    }

    #[async_trait]
    impl SessionApi for FakeApi {
        async fn start_session(
            &self,
            request: &StartSessionRequest,
            bearer: Option<&str>,
        ) -> ApiResult<String> {
            if !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            self.calls.lock().push(Call::Start(
                request.game_id,
                request.prescription_id,
                bearer.map(str::to_string),
            ));
            match &*self.start_body.lock() {
                Ok(body) => Ok(body.clone()),
                Err(_) => Err(status(500)),
            }
        }

        async fn post_reading(
            &self,
            reading: &EegReading,
            _bearer: Option<&str>,
        ) -> ApiResult<String> {
            if !self.reading_delay.is_zero() {
                tokio::time::sleep(self.reading_delay).await;
            }
            self.calls
                .lock()
                .push(Call::Reading(reading.session, reading.attention));
            if self.fail_readings {
                return Err(status(502));
            }
            Ok("{}".to_string())
        }

        async fn end_session(&self, session: SessionId, _bearer: Option<&str>) -> ApiResult<String> {
            self.calls.lock().push(Call::End(session));
            if self.fail_end {
                return Err(status(500));
            }
            Ok(format!("{{\"id\":{},\"ended\":true}}", session))
        }
    }

    struct FixedSource(LatestTelemetry);

    impl SampleSource for FixedSource {
        fn latest(&self) -> LatestTelemetry {
            self.0
        }
    }

    fn source(attention: u8) -> Arc<dyn SampleSource> {
        Arc::new(FixedSource(LatestTelemetry {
            attention: Some(attention),
            ..Default::default()
        }))
    }

    fn config() -> UploadConfig {
        UploadConfig {
            auth_token: Some("token".to_string()),
            game_id: 4,
            prescription_id: 11,
        }
    }

    fn uploader(api: Arc<FakeApi>, session_id_override: Option<SessionId>) -> SessionUploader {
        let uploader = SessionUploader::new(
            api,
            UploadSettings {
                post_interval: Duration::from_secs(1),
                session_id_override,
                log_requests: false,
            },
        );
        uploader.configure(config());
        uploader
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_uploads_then_ends() {
        let api = FakeApi::new(Ok("{\"id\":21}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);

        assert_eq!(uploader.begin(source(50)).await.unwrap(), 21);
        assert_eq!(uploader.state(), PipelineState::Uploading);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let body = uploader.end().await.unwrap();

        assert_eq!(body.as_deref(), Some("{\"id\":21,\"ended\":true}"));
        assert_eq!(uploader.end_response(), body);
        assert_eq!(uploader.state(), PipelineState::Ended);
        assert_eq!(
            api.calls(),
            vec![
                Call::Start(4, 11, Some("token".to_string())),
                Call::Reading(21, 0.5),
                Call::Reading(21, 0.5),
                Call::Reading(21, 0.5),
                Call::End(21),
            ]
        );
        assert_eq!(uploader.stats().readings_sent(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_readings_after_end() {
        let api = FakeApi::new(Ok("{\"id\":5}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);

        uploader.begin(source(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        uploader.end().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let calls = api.calls();
        assert_eq!(calls.last(), Some(&Call::End(5)));
        assert_eq!(api.count(|c| matches!(c, Call::Reading(..))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unusable_id_without_override_aborts() {
        let api = FakeApi::new(Ok("{\"status\":\"created\"}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);

        let err = uploader.begin(source(90)).await.unwrap_err();
        assert!(matches!(err, UploadError::MissingSessionId { .. }));
        assert_eq!(uploader.state(), PipelineState::Idle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(api.count(|c| matches!(c, Call::Reading(..))), 0);
        assert_eq!(uploader.session_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_id_uses_override() {
        let api = FakeApi::new(Ok("{\"id\":0}".to_string()));
        let uploader = uploader(Arc::clone(&api), Some(77));

        assert_eq!(uploader.begin(source(90)).await.unwrap(), 77);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        uploader.end().await.unwrap();

        assert_eq!(api.count(|c| *c == Call::Reading(77, 0.9)), 1);
        assert_eq!(api.count(|c| *c == Call::End(77)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_returns_to_idle() {
        let api = FakeApi::new(Err(status(500)));
        let uploader = uploader(Arc::clone(&api), Some(77));

        let err = uploader.begin(source(90)).await.unwrap_err();
        assert!(matches!(err, UploadError::Start(ApiError::Status { status: 500, .. })));
        assert_eq!(uploader.state(), PipelineState::Idle);

        // A later attempt may succeed
        *api.start_body.lock() = Ok("{\"id\":3}".to_string());
        assert_eq!(uploader.begin(source(90)).await.unwrap(), 3);
        uploader.end().await.unwrap();
    }

    #[tokio::test]
    async fn test_begin_requires_config() {
        let api = FakeApi::new(Ok("{\"id\":1}".to_string()));
        let uploader = SessionUploader::new(api.clone(), UploadSettings::default());

        let err = uploader.begin(source(1)).await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
        assert!(api.calls().is_empty());

        uploader
            .apply_config_json(r#"{"bearerToken":"","gameId":1,"prescriptionId":2}"#)
            .unwrap();
        assert!(uploader.is_configured());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_begin_is_rejected() {
        let api = FakeApi::new(Ok("{\"id\":8}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);

        uploader.begin(source(1)).await.unwrap();
        let err = uploader.begin(source(1)).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidState(PipelineState::Uploading)));
        assert_eq!(api.count(|c| matches!(c, Call::Start(..))), 1);
        uploader.end().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_twice_sends_one_request() {
        let api = FakeApi::new(Ok("{\"id\":9}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);

        uploader.begin(source(1)).await.unwrap();
        assert!(uploader.end().await.unwrap().is_some());
        assert!(uploader.end().await.unwrap().is_none());

        assert_eq!(api.count(|c| matches!(c, Call::End(_))), 1);
        let err = uploader.begin(source(1)).await.unwrap_err();
        assert!(matches!(err, UploadError::SessionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_end_sends_one_request() {
        let api = FakeApi::new(Ok("{\"id\":9}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);
        uploader.begin(source(1)).await.unwrap();

        let (a, b) = tokio::join!(uploader.end(), uploader.end());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(api.count(|c| matches!(c, Call::End(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_end_still_ends() {
        let api = Arc::new(FakeApi {
            start_body: Mutex::new(Ok("{\"id\":2}".to_string())),
            fail_readings: true,
            fail_end: true,
            ..Default::default()
        });
        let uploader = uploader(Arc::clone(&api), None);

        uploader.begin(source(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Failed readings do not stop the loop
        assert_eq!(uploader.stats().readings_failed(), 2);
        assert_eq!(uploader.state(), PipelineState::Uploading);

        assert!(matches!(uploader.end().await, Err(UploadError::End(_))));
        assert_eq!(uploader.state(), PipelineState::Ended);
        assert_eq!(uploader.end_response(), None);
    }

    #[tokio::test]
    async fn test_end_before_begin_sends_nothing() {
        let api = FakeApi::new(Ok("{\"id\":1}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);

        assert_eq!(uploader.end().await.unwrap(), None);
        assert_eq!(uploader.state(), PipelineState::Ended);
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_ends_session_once() {
        let api = FakeApi::new(Ok("{\"id\":13}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);
        uploader.begin(source(1)).await.unwrap();

        drop(uploader);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(api.count(|c| *c == Call::End(13)), 1);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(api.count(|c| matches!(c, Call::Reading(..))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_waits_for_inflight_reading() {
        let api = Arc::new(FakeApi {
            start_body: Mutex::new(Ok("{\"id\":5}".to_string())),
            reading_delay: Duration::from_millis(500),
            ..Default::default()
        });
        let uploader = uploader(Arc::clone(&api), None);
        uploader.begin(source(30)).await.unwrap();

        // First reading goes out at 1s and is still pending at 1.2s
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(api.calls().iter().all(|c| !matches!(c, Call::Reading(..))));

        drop(uploader);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            api.calls(),
            vec![
                Call::Start(4, 11, Some("token".to_string())),
                Call::Reading(5, 0.3),
                Call::End(5),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_during_start_closes_started_session() {
        let api = Arc::new(FakeApi {
            start_body: Mutex::new(Ok("{\"id\":8}".to_string())),
            start_delay: Duration::from_millis(800),
            ..Default::default()
        });
        let uploader = uploader(Arc::clone(&api), None);

        let starting = uploader.clone();
        let begin = tokio::spawn(async move { starting.begin(source(1)).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(uploader.state(), PipelineState::Starting);

        let body = uploader.end().await.unwrap();
        assert_eq!(body.as_deref(), Some("{\"id\":8,\"ended\":true}"));
        assert_eq!(begin.await.unwrap().unwrap(), 8);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            api.calls(),
            vec![Call::Start(4, 11, Some("token".to_string())), Call::End(8)]
        );
        assert_eq!(uploader.stats().readings_sent(), 0);
        assert_eq!(uploader.state(), PipelineState::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_after_end_does_not_end_again() {
        let api = FakeApi::new(Ok("{\"id\":13}".to_string()));
        let uploader = uploader(Arc::clone(&api), None);
        uploader.begin(source(1)).await.unwrap();
        uploader.end().await.unwrap();

        drop(uploader);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.count(|c| matches!(c, Call::End(_))), 1);
    }

    #[test]
    fn test_resolve_session_id() {
        assert_eq!(resolve_session_id("{\"id\":4,\"game\":1}", None), Some(4));
        assert_eq!(resolve_session_id("{\"id\":0}", None), None);
        assert_eq!(resolve_session_id("not json", Some(6)), Some(6));
        assert_eq!(resolve_session_id("", Some(0)), None);
    }
}
