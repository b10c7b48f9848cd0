//! HTTP utilities for the vSphere property gateway

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Header carrying the session identifier on authenticated calls
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Non-success HTTP status returned by the server
#[derive(Debug, thiserror::Error)]
#[error("API request failed: {status}")]
pub struct ApiError {
    pub status: StatusCode,
}

impl ApiError {
    /// Status code carried by an error chain, if it came from the API
    pub fn status_of(error: &anyhow::Error) -> Option<StatusCode> {
        error.downcast_ref::<ApiError>().map(|e| e.status)
    }
}

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_LOG_BODY_LENGTH)
            .last()
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for gateway calls
#[derive(Clone)]
pub struct VsphereHttpClient {
    client: Client,
}

impl VsphereHttpClient {
    /// Create a new HTTP client
    pub fn new(insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vminfo/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(insecure)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Create a session with basic credentials, returning its identifier
    pub async fn login(&self, url: &str, username: &str, password: &str) -> Result<String> {
        tracing::debug!("POST {} (login as {})", url, username);

        let response = self
            .client
            .post(url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .context("Failed to send login request")?;

        let body = Self::read_body(response).await?;
        match serde_json::from_str::<Value>(&body).context("Failed to parse session response")? {
            Value::String(session) => Ok(session),
            Value::Object(map) => map
                .get("value")
                .and_then(|v| v.as_str())
                .map(String::from)
                .context("Session response has no session identifier"),
            _ => Err(anyhow::anyhow!("Unexpected session response")),
        }
    }

    /// POST a JSON body on an authenticated session
    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, session: &str, body: &B) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(SESSION_HEADER, session)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let body = Self::read_body(response).await?;

        // Handle empty response
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError { status }.into());
        }

        Ok(body)
    }
}

/// Format an API error for display
pub fn format_api_error(error: &anyhow::Error) -> String {
    if let Some(status) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()).map(|e| e.status) {
        return match status.as_u16() {
            401 => "Authentication failed. Check VMINFO_USERNAME and VMINFO_PASSWORD.".to_string(),
            403 => "Permission denied. Check the user's privileges on the inventory.".to_string(),
            404 => "Object not found.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => "Invalid request. Check your parameters.".to_string(),
            500 | 503 => "vSphere service temporarily unavailable. Please try again.".to_string(),
            _ => "Request failed. Check your network connection and try again.".to_string(),
        };
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
