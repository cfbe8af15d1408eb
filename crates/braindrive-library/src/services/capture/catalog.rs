// Model catalog adapter
//
// Loads the chat-selectable model list from the providers endpoint and
// resolves a configured default against it. Embedding models are never
// chat-selectable and are filtered out at load time.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::LibraryResult;
use crate::models::catalog::{DefaultModelSpec, ModelInfo};
use crate::services::api::ApiClient;

const ALL_MODELS_PATH: &str = "/ai/providers/all-models";

const UNKNOWN_SERVER_ID: &str = "unknown";
const UNKNOWN_SERVER_NAME: &str = "Unknown Server";

/// Provider name -> settings definition id.
static PROVIDER_SETTINGS_IDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ollama", "ollama_servers_settings"),
        ("openai", "openai_api_keys_settings"),
        ("openrouter", "openrouter_api_keys_settings"),
        ("claude", "claude_api_keys_settings"),
        ("anthropic", "claude_api_keys_settings"),
        ("groq", "groq_api_keys_settings"),
    ])
});

/// Load the model catalog.
///
/// Drops entries with no usable name and anything that looks like an
/// embedding model. The returned list replaces any previous catalog
/// wholesale.
pub async fn load_models(api: &ApiClient) -> LibraryResult<Vec<ModelInfo>> {
    let payload = api.get_json(ALL_MODELS_PATH).await?;
    let models = parse_model_catalog(&payload);
    log::info!("Loaded {} chat-selectable models", models.len());
    Ok(models)
}

/// Parse a raw catalog payload (bare array or `{"models": [...]}`).
pub fn parse_model_catalog(payload: &Value) -> Vec<ModelInfo> {
    let entries = payload
        .as_array()
        .or_else(|| payload.get("models").and_then(Value::as_array));

    let Some(entries) = entries else {
        return Vec::new();
    };

    entries.iter().filter_map(parse_model_entry).collect()
}

fn parse_model_entry(entry: &Value) -> Option<ModelInfo> {
    let name = entry
        .get("name")
        .or_else(|| entry.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }
    let lowered = name.to_lowercase();
    if lowered.contains("embed") || lowered.contains("embedding") {
        return None;
    }

    let provider = entry
        .get("provider")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let provider_id = resolve_provider_id(&provider, entry);

    let server_id = entry
        .get("server_id")
        .or_else(|| entry.get("serverId"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_SERVER_ID)
        .to_string();
    let server_name = entry
        .get("server_name")
        .or_else(|| entry.get("serverName"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_SERVER_NAME)
        .to_string();

    Some(ModelInfo {
        name,
        provider,
        provider_id,
        server_id,
        server_name,
    })
}

/// Provider settings id: static table first, then an explicit id field,
/// then the provider name itself.
fn resolve_provider_id(provider: &str, entry: &Value) -> String {
    if let Some(mapped) = PROVIDER_SETTINGS_IDS.get(provider.to_lowercase().as_str()) {
        return mapped.to_string();
    }
    entry
        .get("provider_id")
        .or_else(|| entry.get("providerId"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
        .unwrap_or_else(|| provider.to_string())
}

/// Resolve the configured default against a loaded catalog.
///
/// An unmatched (or absent) default falls back to the first entry; an
/// empty catalog resolves to `None`, which is a valid "no model selected"
/// state.
pub fn resolve_default_model<'a>(
    spec: Option<&DefaultModelSpec>,
    catalog: &'a [ModelInfo],
) -> Option<&'a ModelInfo> {
    if let Some(spec) = spec.filter(|s| !s.is_empty()) {
        if let Some(found) = catalog.iter().find(|model| spec.matches(model)) {
            return Some(found);
        }
        log::debug!("Configured default model matched no catalog entry; using first");
    }
    catalog.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filters_embeddings_and_empty_names() {
        let payload = json!({"models": [
            {"name": "llama3", "provider": "ollama", "server_id": "s1"},
            {"name": "nomic-embed-text", "provider": "ollama"},
            {"name": "text-Embedding-3-small", "provider": "openai"},
            {"name": "  ", "provider": "ollama"},
            {"id": "gpt-4o-mini", "provider": "openai"}
        ]});
        let models = parse_model_catalog(&payload);
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["llama3", "gpt-4o-mini"]);
    }

    #[test]
    fn test_provider_settings_table() {
        let entry = json!({"name": "m", "provider": "Ollama"});
        let model = parse_model_entry(&entry).unwrap();
        assert_eq!(model.provider_id, "ollama_servers_settings");

        let entry = json!({"name": "m", "provider": "anthropic"});
        let model = parse_model_entry(&entry).unwrap();
        assert_eq!(model.provider_id, "claude_api_keys_settings");
    }

    #[test]
    fn test_unmapped_provider_falls_back_to_explicit_id_then_name() {
        let entry = json!({"name": "m", "provider": "custom", "provider_id": "custom_settings"});
        assert_eq!(parse_model_entry(&entry).unwrap().provider_id, "custom_settings");

        let entry = json!({"name": "m", "provider": "custom"});
        assert_eq!(parse_model_entry(&entry).unwrap().provider_id, "custom");
    }

    #[test]
    fn test_missing_server_fields_use_sentinels() {
        let entry = json!({"name": "m", "provider": "ollama"});
        let model = parse_model_entry(&entry).unwrap();
        assert_eq!(model.server_id, "unknown");
        assert_eq!(model.server_name, "Unknown Server");
    }

    #[test]
    fn test_default_resolution_by_composite_key() {
        let catalog = parse_model_catalog(&json!([
            {"name": "llama3", "provider": "ollama", "server_id": "s1"}
        ]));
        let spec = DefaultModelSpec::from_key("ollama::s1::llama3");
        let resolved = resolve_default_model(Some(&spec), &catalog).unwrap();
        assert_eq!(resolved.key(), "ollama::s1::llama3");
    }

    #[test]
    fn test_unmatched_default_falls_back_to_first() {
        let catalog = parse_model_catalog(&json!([
            {"name": "first", "provider": "ollama", "server_id": "s1"},
            {"name": "second", "provider": "ollama", "server_id": "s1"}
        ]));
        let spec = DefaultModelSpec::from_key("openai::gpt-4o");
        let resolved = resolve_default_model(Some(&spec), &catalog).unwrap();
        assert_eq!(resolved.name, "first");
    }

    #[test]
    fn test_empty_catalog_resolves_to_none() {
        let spec = DefaultModelSpec::from_key("ollama::s1::llama3");
        assert!(resolve_default_model(Some(&spec), &[]).is_none());
        assert!(resolve_default_model(None, &[]).is_none());
    }
}
