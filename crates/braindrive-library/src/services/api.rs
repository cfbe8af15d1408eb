// Backend API client
//
// Shared HTTP plumbing for every Library module: response envelopes,
// backend error message extraction, candidate-path fallback, and the
// handful of host endpoints (auth, pages, document processing) the
// capture panel relies on.

use reqwest::Client;
use serde_json::Value;

use crate::error::{LibraryError, LibraryResult};

/// HTTP client for the BrainDrive backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> LibraryResult<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(LibraryError::InvalidConfig(
                "API base URL is empty".to_string(),
            ));
        }
        Ok(Self {
            base_url: trimmed,
            client: Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw client, for the streaming prompt path.
    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// GET a JSON payload, unwrapping the response envelope.
    pub async fn get_json(&self, path: &str) -> LibraryResult<Value> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| connection_error(path, e))?;
        read_json_response(response).await
    }

    /// GET the first candidate path that succeeds.
    ///
    /// All candidates failing yields the last extracted error message.
    pub async fn get_json_first(&self, paths: &[String]) -> LibraryResult<Value> {
        let mut last_error = LibraryError::InvalidConfig("no candidate paths".to_string());
        for path in paths {
            match self.get_json(path).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    log::warn!("Candidate endpoint {} failed: {}", path, err);
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// POST a JSON body, unwrapping the response envelope.
    pub async fn post_json(&self, path: &str, body: &Value) -> LibraryResult<Value> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(path, e))?;
        read_json_response(response).await
    }

    /// PUT a JSON body, unwrapping the response envelope.
    pub async fn put_json(&self, path: &str, body: &Value) -> LibraryResult<Value> {
        let response = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(path, e))?;
        read_json_response(response).await
    }

    /// Current user id, best-effort. Failure is non-fatal.
    pub async fn current_user_id(&self) -> Option<String> {
        match self.get_json("/auth/me").await {
            Ok(payload) => payload
                .get("id")
                .and_then(Value::as_str)
                .map(String::from),
            Err(err) => {
                log::debug!("auth/me lookup failed (ignored): {}", err);
                None
            }
        }
    }

    /// Read a page document.
    pub async fn get_page(&self, page_id: &str) -> LibraryResult<Value> {
        self.get_json(&format!("/pages/{}", page_id)).await
    }

    /// Patch a page document.
    pub async fn update_page(&self, page_id: &str, body: &Value) -> LibraryResult<Value> {
        self.put_json(&format!("/pages/{}", page_id), body).await
    }

    /// Extract text from an uploaded document via the processing endpoint.
    pub async fn process_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> LibraryResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/documents/process"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| connection_error("/documents/process", e))?;
        let payload = read_json_response(response).await?;

        let text = payload
            .get("text")
            .or_else(|| payload.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(text.to_string())
    }
}

fn connection_error(path: &str, err: reqwest::Error) -> LibraryError {
    if err.is_timeout() {
        LibraryError::Timeout
    } else {
        LibraryError::ConnectionFailed(format!("{}: {}", path, err))
    }
}

/// Unwrap the response envelope: the effective payload is the `data` field
/// when present, else the body itself.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Extract a human-readable error message from a backend body.
///
/// Order: `message`; `detail` (string or nested `.message`); `error`
/// (string or nested `.message`).
pub fn extract_error_message(value: &Value) -> Option<String> {
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    for field in ["detail", "error"] {
        if let Some(inner) = value.get(field) {
            if let Some(text) = inner.as_str() {
                return Some(text.to_string());
            }
            if let Some(nested) = inner.get("message").and_then(Value::as_str) {
                return Some(nested.to_string());
            }
        }
    }
    None
}

async fn read_json_response(response: reqwest::Response) -> LibraryResult<Value> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(LibraryError::ApiError(message));
    }

    let value: Value = serde_json::from_str(&body)?;
    Ok(unwrap_envelope(value))
}
