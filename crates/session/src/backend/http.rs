//! HTTP auth backend for the portal API.

use super::{AuthBackend, Credentials, Registration, SessionPayload};
use crate::{Error, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Shown when the backend rejects credentials without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Unable to sign in. Check your details and try again.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Builder for creating an HTTP auth backend.
#[derive(Debug, Clone)]
pub struct HttpAuthBackendBuilder {
    base_url: String,
    timeout: Duration,
    token: Option<String>,
}

impl HttpAuthBackendBuilder {
    /// Create a new builder for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start with a bearer token from an earlier login.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the backend.
    pub fn build(self) -> Result<HttpAuthBackend> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(HttpAuthBackend {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(self.token),
        })
    }
}

/// Auth backend speaking JSON over HTTP.
///
/// Endpoints live under `{base_url}/auth/`. A token returned by login or
/// registration is presented as a bearer token on every later call.
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl HttpAuthBackend {
    /// Create a builder for the HTTP backend.
    pub fn builder(base_url: impl Into<String>) -> HttpAuthBackendBuilder {
        HttpAuthBackendBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The bearer token currently held, if any.
    pub async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/{path}", self.base_url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let token = self.token.lock().await.clone();
        let req = match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        req.header("accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }

    async fn read_payload(&self, response: Response) -> Result<SessionPayload> {
        let payload: SessionPayload = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("invalid session payload: {e}")))?;

        if let Some(token) = &payload.token {
            *self.token.lock().await = Some(token.clone());
        }
        Ok(payload)
    }

    /// Shared handling for login and registration responses.
    async fn establish(&self, response: Response) -> Result<SessionPayload> {
        let status = response.status();
        if status.is_success() {
            return self.read_payload(response).await;
        }

        let body = response.text().await.unwrap_or_default();
        if is_rejection(status) {
            return Err(Error::Authentication(
                failure_message(&body).unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            ));
        }
        Err(Error::Api(format!("{status}: {body}")))
    }
}

impl std::fmt::Display for HttpAuthBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http({})", self.base_url)
    }
}

impl AuthBackend for HttpAuthBackend {
    async fn current_session(&self) -> Result<Option<SessionPayload>> {
        let response = self.send(self.client.get(self.url("session"))).await?;
        let status = response.status();

        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NO_CONTENT
        ) {
            debug!(%status, "no active session");
            *self.token.lock().await = None;
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        self.read_payload(response).await.map(Some)
    }

    async fn login(&self, credentials: &Credentials) -> Result<SessionPayload> {
        let response = self
            .send(self.client.post(self.url("login")).json(credentials))
            .await?;
        self.establish(response).await
    }

    async fn register(&self, registration: &Registration) -> Result<SessionPayload> {
        let response = self
            .send(self.client.post(self.url("register")).json(registration))
            .await?;
        self.establish(response).await
    }

    async fn logout(&self) -> Result<()> {
        let result = self.send(self.client.post(self.url("logout"))).await;
        *self.token.lock().await = None;

        let response = result?;
        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%status, "logout rejected by backend");
        Err(Error::Api(format!("{status}: {body}")))
    }
}

/// Statuses that mean "your input was refused" rather than "we broke".
fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::CONFLICT
            | StatusCode::UNPROCESSABLE_ENTITY
    )
}

fn failure_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .message
        .filter(|m| !m.trim().is_empty())
}
