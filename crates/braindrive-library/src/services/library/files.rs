// Library editor file client
//
// CRUD boundary for the file browser/editor module. The library service
// has moved between path prefixes across backend versions, so every call
// walks an ordered candidate list and stops at the first success.

use serde_json::{json, Value};

use crate::error::{LibraryError, LibraryResult};
use crate::models::files::{FileContent, SaveFileResult, TreeEntry};
use crate::services::api::{extract_error_message, ApiClient};

/// Candidate prefixes for the library editor endpoints, newest first.
const EDITOR_PREFIXES: [&str; 3] = [
    "/plugins/braindrive-library",
    "/library/editor",
    "/library",
];

/// File browser/editor client.
#[derive(Clone)]
pub struct LibraryFilesClient {
    api: ApiClient,
}

impl LibraryFilesClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn candidates(&self, suffix: &str) -> Vec<String> {
        EDITOR_PREFIXES
            .iter()
            .map(|prefix| format!("{}{}", prefix, suffix))
            .collect()
    }

    /// List the file/folder tree under a path.
    pub async fn list_tree(&self, path: &str) -> LibraryResult<Vec<TreeEntry>> {
        let suffix = format!("/tree?path={}", urlencode(path));
        let payload = self.api.get_json_first(&self.candidates(&suffix)).await?;

        let entries = match payload {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("entries") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(LibraryError::from))
            .collect()
    }

    /// Fetch a file body.
    pub async fn read_file(&self, path: &str) -> LibraryResult<FileContent> {
        let suffix = format!("/file?path={}", urlencode(path));
        let payload = self.api.get_json_first(&self.candidates(&suffix)).await?;

        let content = payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(FileContent {
            path: path.to_string(),
            content,
        })
    }

    /// Save a file body, walking the same candidate prefixes.
    pub async fn save_file(&self, path: &str, content: &str) -> LibraryResult<SaveFileResult> {
        let body = json!({"path": path, "content": content});
        let mut last_error = LibraryError::InvalidConfig("no candidate paths".to_string());

        for prefix in EDITOR_PREFIXES {
            match self.api.put_json(&format!("{}/file", prefix), &body).await {
                Ok(payload) => {
                    let message = extract_error_message(&payload);
                    return Ok(SaveFileResult {
                        success: payload
                            .get("success")
                            .and_then(Value::as_bool)
                            .unwrap_or(true),
                        message,
                    });
                }
                Err(err) => {
                    log::warn!("Save via {} failed: {}", prefix, err);
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
