use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::models::{Course, CourseDetail, CourseListResponse, TokenResponse};
use crate::store::TokenStore;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("anonymous token request failed: {0}")]
    TokenFetch(String),
    #[error("request to {path} still unauthorized after token refresh")]
    Unauthorized { path: String },
    #[error("request to {path} failed: HTTP status {status}{}", format_body(.body))]
    Status {
        status: u16,
        path: String,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
    #[error("token storage failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

fn truncated_body(response: ureq::Response) -> String {
    let response_body = response.into_string().ok().unwrap_or_default();
    response_body.trim().chars().take(240).collect()
}

enum Attempt {
    Done(String),
    Unauthorized,
}

/// Authenticated access to the course catalog.
///
/// Token acquisition is single-flight per client: `refresh_lock` serialises
/// fetches, and a caller that waited on it re-reads the store before
/// fetching again.
pub struct ApiClient {
    config: ApiConfig,
    agent: ureq::Agent,
    tokens: TokenStore,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, tokens: TokenStore) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .timeout_write(config.read_timeout)
            .build();
        Self {
            config,
            agent,
            tokens,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Requests a fresh anonymous token and stores it. Nothing is stored
    /// when the request or its payload is bad.
    pub fn fetch_token(&self) -> Result<String, ApiError> {
        debug!(url = %self.config.auth_url, "requesting anonymous token");
        let result = self
            .agent
            .get(&self.config.auth_url)
            .query("platform", &self.config.platform)
            .call();

        let body = match result {
            Ok(response) => response
                .into_string()
                .map_err(|err| ApiError::TokenFetch(format!("response decode failed: {err}")))?,
            Err(ureq::Error::Status(status, response)) => {
                let body = truncated_body(response);
                return Err(ApiError::TokenFetch(format!(
                    "HTTP status {status}{}",
                    format_body(&body)
                )));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(ApiError::TokenFetch(format!("transport error: {err}")));
            }
        };

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| ApiError::TokenFetch(format!("malformed token payload: {err}")))?;
        let token = parsed.token.trim().to_string();
        if token.is_empty() {
            return Err(ApiError::TokenFetch("empty token in payload".to_string()));
        }

        self.tokens.set(&token)?;
        info!("stored new anonymous token");
        Ok(token)
    }

    pub fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String, ApiError> {
        let token = self.current_token()?;
        match self.send(method, path, body, &token)? {
            Attempt::Done(text) => Ok(text),
            Attempt::Unauthorized => {
                warn!(path, "request unauthorized, refreshing token");
                let fresh = self.refresh_token(&token)?;
                match self.send(method, path, body, &fresh)? {
                    Attempt::Done(text) => Ok(text),
                    Attempt::Unauthorized => Err(ApiError::Unauthorized {
                        path: path.to_string(),
                    }),
                }
            }
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.request("GET", path, None)?;
        serde_json::from_str(&text).map_err(|err| ApiError::Decode(format!("{path}: {err}")))
    }

    pub fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        let response: CourseListResponse = self.get_json("/preview-courses")?;
        debug!(count = response.courses.len(), "fetched course catalog");
        Ok(response.courses)
    }

    pub fn course_detail(&self, course_id: &str) -> Result<CourseDetail, ApiError> {
        let detail: CourseDetail = self.get_json(&format!("/preview-courses/{course_id}"))?;
        debug!(
            course = %detail.course.id,
            lessons = detail.lessons.len(),
            "fetched course detail"
        );
        Ok(detail)
    }

    fn current_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.tokens.get()? {
            return Ok(token);
        }
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = self.tokens.get()? {
            return Ok(token);
        }
        self.fetch_token()
    }

    fn refresh_token(&self, stale: &str) -> Result<String, ApiError> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = self.tokens.get()?
            && current != stale
        {
            debug!("token already replaced by a concurrent refresh");
            return Ok(current);
        }
        self.tokens.clear()?;
        self.fetch_token()
    }

    fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Attempt, ApiError> {
        let url = format!("{}{path}", self.config.base_url);
        debug!(method, url = %url, "sending request");
        let request = self
            .agent
            .request(method, &url)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Accept", "application/json");
        let result = match body {
            Some(payload) => request
                .set("Content-Type", "application/json")
                .send_string(&payload.to_string()),
            None => request.call(),
        };

        match result {
            Ok(response) => response
                .into_string()
                .map(Attempt::Done)
                .map_err(|err| ApiError::Decode(format!("{path}: {err}"))),
            Err(ureq::Error::Status(401, _)) => Ok(Attempt::Unauthorized),
            Err(ureq::Error::Status(status, response)) => Err(ApiError::Status {
                status,
                path: path.to_string(),
                body: truncated_body(response),
            }),
            Err(ureq::Error::Transport(err)) => Err(ApiError::Transport(err.to_string())),
        }
    }
}
