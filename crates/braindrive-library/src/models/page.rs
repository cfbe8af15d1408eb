// Page and defaults-persistence models

use serde::{Deserialize, Serialize};

/// Host page context attached to prompt requests when available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_id: String,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub page_route: Option<String>,
    #[serde(default)]
    pub is_studio_page: bool,
}

/// Result of persisting a default model into a page document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SaveDefaultModelResult {
    pub default_model_key: String,
    pub default_model_provider: String,
    pub default_model_server_id: String,
    pub default_model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_server_name: Option<String>,
    /// Number of module/layout entries updated; always >= 1 on success
    pub updated_targets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_context_round_trip() {
        let ctx = PageContext {
            page_id: "p1".to_string(),
            page_name: Some("Library Capture".to_string()),
            page_route: Some("library-capture".to_string()),
            is_studio_page: false,
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"pageId\":\"p1\""));
        let back: PageContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
