// Remote session upload
//
// - `api`: the session endpoints behind a trait, reqwest implementation
// - `reading`: normalization of the latest telemetry into one reading
// - `pipeline`: the start / periodic upload / end state machine

pub mod api;
pub mod pipeline;
pub mod reading;
pub mod types;

pub use api::{ApiEndpoints, HttpSessionApi, SessionApi};
pub use pipeline::{SampleSource, SessionUploader, UploadStats};
pub use reading::{band_proportions, build_reading, unit_fraction};
pub use types::{
    ApiError, ApiResult, EegReading, PipelineState, SessionId, StartSessionRequest,
    StartSessionResponse, UploadConfig, UploadError, UploadResult, UploadSettings,
};
