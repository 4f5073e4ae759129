// Remote session API
//
// The pipeline only talks to `SessionApi`; `HttpSessionApi` is the reqwest
// implementation against the game-session endpoints.

use super::types::{ApiError, ApiResult, EegReading, SessionId, StartSessionRequest};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Session lifecycle endpoints. Successful calls return the response body.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
        bearer: Option<&str>,
    ) -> ApiResult<String>;

    async fn post_reading(&self, reading: &EegReading, bearer: Option<&str>) -> ApiResult<String>;

    async fn end_session(&self, session: SessionId, bearer: Option<&str>) -> ApiResult<String>;
}

/// Endpoint layout of the remote API
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub base_url: String,
    pub start_path: String,
    pub reading_path: String,
    /// `{id}` is replaced with the session id
    pub end_path: String,
    pub health_path: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            start_path: "/api/gamesession/sessions/start/".to_string(),
            reading_path: "/api/gamesession/eeg-readings/".to_string(),
            end_path: "/api/gamesession/sessions/{id}/end/".to_string(),
            health_path: "/api/accounts/hello/".to_string(),
        }
    }
}

impl ApiEndpoints {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn start_url(&self) -> String {
        self.url(&self.start_path)
    }

    pub fn reading_url(&self) -> String {
        self.url(&self.reading_path)
    }

    pub fn end_url(&self, session: SessionId) -> String {
        self.url(&self.end_path.replace("{id}", &session.to_string()))
    }

    pub fn health_url(&self) -> String {
        self.url(&self.health_path)
    }
}

pub struct HttpSessionApi {
    client: reqwest::Client,
    endpoints: ApiEndpoints,
}

impl HttpSessionApi {
    pub fn new(endpoints: ApiEndpoints) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// GET the health endpoint and return its body
    pub async fn health_check(&self) -> ApiResult<String> {
        let url = self.endpoints.health_url();
        log::debug!("Health check GET {}", url);

        let response = self.client.get(&url).send().await?;
        Self::into_body(response).await
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        url: &str,
        body: &T,
        bearer: Option<&str>,
    ) -> ApiResult<String> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        Self::into_body(response).await
    }

    async fn into_body(response: reqwest::Response) -> ApiResult<String> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
        bearer: Option<&str>,
    ) -> ApiResult<String> {
        self.post_json(&self.endpoints.start_url(), request, bearer).await
    }

    async fn post_reading(&self, reading: &EegReading, bearer: Option<&str>) -> ApiResult<String> {
        self.post_json(&self.endpoints.reading_url(), reading, bearer).await
    }

    async fn end_session(&self, session: SessionId, bearer: Option<&str>) -> ApiResult<String> {
        self.post_json(&self.endpoints.end_url(session), &serde_json::json!({}), bearer)
            .await
    }
}
