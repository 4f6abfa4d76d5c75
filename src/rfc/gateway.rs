//! HTTP/JSON RFC gateway client
//!
//! Talks to a gateway service that owns the native RFC sessions:
//!
//! - `POST {base}/sessions` with logon data and coordinates returns `{"session_id": ...}`
//! - `POST {base}/sessions/{id}/call/{FUNCTION}` with the parameter object returns the
//!   nested result as a JSON object; the function name is one percent-encoded path
//!   segment, so `/SDF/SMON_GET_DATA` travels as `%2FSDF%2FSMON_GET_DATA`
//! - `DELETE {base}/sessions/{id}` releases the session

use super::{Connector, Logon, NestedResult, RfcSession, ServerCoordinates};
use crate::config::GatewayConfig;
use crate::error::{AppError, AppResult, CallError, ConnectionError};
use crate::models::CallParams;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest response body excerpt carried into error messages
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct OpenSessionRequest<'a> {
    system: &'a str,
    user: &'a str,
    passwd: &'a str,
    client: &'a str,
    lang: &'a str,
    #[serde(flatten)]
    coordinates: &'a ServerCoordinates,
}

#[derive(Deserialize)]
struct OpenSessionResponse {
    session_id: String,
}

/// [`Connector`] backed by an RFC gateway service
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a gateway client; `request_timeout` bounds every single HTTP request
    pub fn new(base_url: &str, request_timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> AppResult<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Connector for HttpGateway {
    async fn open(
        &self,
        logon: Logon<'_>,
        coordinates: &ServerCoordinates,
    ) -> Result<Box<dyn RfcSession>, ConnectionError> {
        let fail = |reason: String| ConnectionError {
            system: logon.system.to_string(),
            server: coordinates.ashost.clone(),
            reason,
        };

        let request = OpenSessionRequest {
            system: logon.system,
            user: logon.user,
            passwd: logon.credential.expose(),
            client: logon.client,
            lang: logon.lang,
            coordinates,
        };

        let response = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(status_reason(status, response).await));
        }

        let opened: OpenSessionResponse = response
            .json()
            .await
            .map_err(|e| fail(format!("invalid session response: {}", e)))?;

        tracing::debug!(
            system = %logon.system,
            server = %coordinates.ashost,
            session_id = %opened.session_id,
            "Session opened"
        );

        let session_url = session_url(&self.base_url, &opened.session_id).map_err(fail)?;

        Ok(Box::new(GatewaySession {
            client: self.client.clone(),
            session_url,
            closed: false,
        }))
    }
}

/// One gateway-side session
struct GatewaySession {
    client: reqwest::Client,
    session_url: Url,
    closed: bool,
}

#[async_trait]
impl RfcSession for GatewaySession {
    async fn invoke(
        &mut self,
        function: &str,
        params: &CallParams,
    ) -> Result<NestedResult, CallError> {
        let fail = |reason: String| CallError {
            function: function.to_string(),
            reason,
        };
        if self.closed {
            return Err(fail("session already closed".to_string()));
        }

        let url = call_url(&self.session_url, function).map_err(fail)?;
        let response = self
            .client
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(status_reason(status, response).await));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| fail(format!("invalid result body: {}", e)))?;

        match body {
            serde_json::Value::Object(result) => Ok(result),
            other => Err(fail(format!(
                "result must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.client.delete(self.session_url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(session = %self.session_url, "Session closed");
            }
            Ok(response) => {
                tracing::warn!(
                    session = %self.session_url,
                    status = %response.status(),
                    "Gateway refused to close session"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.session_url,
                    error = %e,
                    "Failed to close session"
                );
            }
        }
    }
}

/// `{base}/sessions/{id}`, with the session id as a single path segment
fn session_url(base_url: &str, session_id: &str) -> Result<Url, String> {
    let mut url = Url::parse(base_url).map_err(|e| format!("invalid gateway URL: {}", e))?;
    url.path_segments_mut()
        .map_err(|_| format!("gateway URL cannot carry a path: {}", base_url))?
        .pop_if_empty()
        .push("sessions")
        .push(session_id);
    Ok(url)
}

/// `{session}/call/{function}`; slashes in namespaced function names are encoded
fn call_url(session_url: &Url, function: &str) -> Result<Url, String> {
    let mut url = session_url.clone();
    url.path_segments_mut()
        .map_err(|_| format!("session URL cannot carry a path: {}", session_url))?
        .push("call")
        .push(function);
    Ok(url)
}

async fn status_reason(status: reqwest::StatusCode, response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        format!("gateway returned HTTP {}", status)
    } else {
        let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("gateway returned HTTP {}: {}", status, excerpt)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
