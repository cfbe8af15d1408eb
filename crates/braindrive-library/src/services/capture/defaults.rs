// Capture defaults writer
//
// Persists a chosen model as a page-level default by patching the page's
// content document. Page content carries two independent locations that
// may reference the capture module: a `modules` map keyed by module id,
// and `layouts.{desktop,tablet,mobile}` arrays of positioned items with
// `args`. Both are scanned; zero matches across both is an error.

use serde_json::{Map, Value};

use crate::error::{LibraryError, LibraryResult};
use crate::models::catalog::ModelInfo;
use crate::models::page::SaveDefaultModelResult;
use crate::services::api::ApiClient;
use crate::utils::text::{fuzzy_token_match, looks_like_capture_module};
use crate::PLUGIN_SLUG;

/// Persist `model` as the capture default on a page.
///
/// `module_id` narrows the target to a specific module instance; without
/// it, anything belonging to this plugin or looking like a capture module
/// is updated.
pub async fn save_capture_default_model_for_page(
    api: &ApiClient,
    page_id: &str,
    module_id: Option<&str>,
    model: &ModelInfo,
) -> LibraryResult<SaveDefaultModelResult> {
    if page_id.trim().is_empty() {
        return Err(LibraryError::InvalidConfig("Page id is empty".to_string()));
    }

    let page = api.get_page(page_id).await?;
    let raw_content = page
        .get("content")
        .cloned()
        .ok_or_else(|| LibraryError::ParseError("Page has no content field".to_string()))?;

    // Content is itself JSON, stored either as a string or inline.
    let content_was_string = raw_content.is_string();
    let mut content: Value = match &raw_content {
        Value::String(text) => serde_json::from_str(text)?,
        other => other.clone(),
    };

    let updated_targets = apply_default_model(&mut content, module_id, model)?;

    let persisted = if content_was_string {
        Value::String(serde_json::to_string(&content)?)
    } else {
        content
    };
    let body = serde_json::json!({ "content": persisted });
    api.update_page(page_id, &body).await?;

    log::info!(
        "Saved default model {} to page {} ({} target(s))",
        model.key(),
        page_id,
        updated_targets
    );

    Ok(SaveDefaultModelResult {
        default_model_key: model.key(),
        default_model_provider: model.provider.clone(),
        default_model_server_id: model.server_id.clone(),
        default_model_name: model.name.clone(),
        default_model_provider_id: Some(model.provider_id.clone()),
        default_model_server_name: Some(model.server_name.clone()),
        updated_targets,
    })
}

/// Merge the model's derived fields into every matching module definition
/// and layout entry. Returns the number of updated targets; zero is an
/// error, never a silent success.
pub fn apply_default_model(
    content: &mut Value,
    module_id: Option<&str>,
    model: &ModelInfo,
) -> LibraryResult<usize> {
    let fields = model_fields(model);
    let mut updated = 0;

    if let Some(modules) = content.get_mut("modules").and_then(Value::as_object_mut) {
        for (key, module_def) in modules.iter_mut() {
            if module_def_matches(key, module_def, module_id) {
                let config = module_def
                    .as_object_mut()
                    .map(|def| {
                        def.entry("config")
                            .or_insert_with(|| Value::Object(Map::new()))
                    })
                    .and_then(Value::as_object_mut);
                if let Some(config) = config {
                    merge_fields(config, &fields);
                    updated += 1;
                }
            }
        }
    }

    if let Some(layouts) = content.get_mut("layouts").and_then(Value::as_object_mut) {
        for entries in layouts.values_mut() {
            let Some(entries) = entries.as_array_mut() else {
                continue;
            };
            for entry in entries {
                if layout_entry_matches(entry, module_id) {
                    let args = entry
                        .as_object_mut()
                        .map(|e| e.entry("args").or_insert_with(|| Value::Object(Map::new())))
                        .and_then(Value::as_object_mut);
                    if let Some(args) = args {
                        merge_fields(args, &fields);
                        updated += 1;
                    }
                }
            }
        }
    }

    if updated == 0 {
        return Err(LibraryError::TargetNotFound(
            "could not locate a Library Capture module or layout entry on this page".to_string(),
        ));
    }
    Ok(updated)
}

fn model_fields(model: &ModelInfo) -> Vec<(&'static str, Value)> {
    vec![
        ("default_model_key", Value::String(model.key())),
        ("default_model_provider", Value::String(model.provider.clone())),
        ("default_model_server_id", Value::String(model.server_id.clone())),
        ("default_model_name", Value::String(model.name.clone())),
        ("default_model_provider_id", Value::String(model.provider_id.clone())),
        ("default_model_server_name", Value::String(model.server_name.clone())),
    ]
}

fn merge_fields(target: &mut Map<String, Value>, fields: &[(&'static str, Value)]) {
    for (key, value) in fields {
        target.insert((*key).to_string(), value.clone());
    }
}

/// A module definition matches when an explicitly requested id fuzzy-hits
/// one of its identity fields, or (absent a specific request, or when the
/// request itself names the capture module) when it belongs to this plugin
/// or looks like a capture module.
fn module_def_matches(key: &str, module_def: &Value, requested: Option<&str>) -> bool {
    let identity_fields = [
        Some(key),
        module_def.get("moduleId").and_then(Value::as_str),
        module_def.get("moduleName").and_then(Value::as_str),
        module_def.get("name").and_then(Value::as_str),
    ];

    if let Some(requested) = non_capture_request(requested) {
        return identity_fields
            .iter()
            .flatten()
            .any(|field| fuzzy_token_match(field, requested));
    }

    let plugin = module_def
        .get("pluginId")
        .or_else(|| module_def.get("plugin_slug"))
        .and_then(Value::as_str);
    if plugin == Some(PLUGIN_SLUG) {
        return true;
    }
    identity_fields
        .iter()
        .flatten()
        .any(|field| looks_like_capture_module(field))
}

fn layout_entry_matches(entry: &Value, requested: Option<&str>) -> bool {
    let args = entry.get("args");
    let identity_fields = [
        entry.get("i").and_then(Value::as_str),
        entry.get("moduleId").and_then(Value::as_str),
        args.and_then(|a| a.get("moduleId")).and_then(Value::as_str),
        args.and_then(|a| a.get("displayName")).and_then(Value::as_str),
    ];

    if let Some(requested) = non_capture_request(requested) {
        return identity_fields
            .iter()
            .flatten()
            .any(|field| fuzzy_token_match(field, requested));
    }

    let plugin = entry.get("pluginId").and_then(Value::as_str);
    if plugin == Some(PLUGIN_SLUG) {
        return true;
    }
    identity_fields
        .iter()
        .flatten()
        .any(|field| looks_like_capture_module(field))
}

/// A requested module id that names the capture module itself behaves the
/// same as no request at all.
fn non_capture_request(requested: Option<&str>) -> Option<&str> {
    requested
        .map(str::trim)
        .filter(|r| !r.is_empty() && !looks_like_capture_module(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ModelInfo {
        ModelInfo {
            name: "llama3".to_string(),
            provider: "ollama".to_string(),
            provider_id: "ollama_servers_settings".to_string(),
            server_id: "s1".to_string(),
            server_name: "Local Ollama".to_string(),
        }
    }

    fn page_content() -> Value {
        json!({
            "layouts": {
                "desktop": [{
                    "i": "LibraryCapture_abc123_170000",
                    "x": 0, "y": 0, "w": 12, "h": 12,
                    "pluginId": "BrainDriveLibraryPlugin",
                    "args": {"moduleId": "abc123", "displayName": "Library Capture"}
                }],
                "mobile": [{
                    "i": "LibraryCapture_abc123_170000",
                    "x": 0, "y": 0, "w": 4, "h": 12,
                    "pluginId": "BrainDriveLibraryPlugin",
                    "args": {"moduleId": "abc123", "displayName": "Library Capture"}
                }]
            },
            "modules": {
                "abc123": {"name": "LibraryCapture", "config": {"conversation_type": "capture"}}
            }
        })
    }

    #[test]
    fn test_apply_updates_modules_and_layouts() {
        let mut content = page_content();
        let updated = apply_default_model(&mut content, None, &model()).unwrap();
        assert_eq!(updated, 3);

        let config = &content["modules"]["abc123"]["config"];
        assert_eq!(config["default_model_key"], "ollama::s1::llama3");
        assert_eq!(config["default_model_server_name"], "Local Ollama");
        // Existing config keys survive the shallow merge
        assert_eq!(config["conversation_type"], "capture");

        let args = &content["layouts"]["desktop"][0]["args"];
        assert_eq!(args["default_model_name"], "llama3");
        assert_eq!(args["displayName"], "Library Capture");
    }

    #[test]
    fn test_apply_with_explicit_module_id_fuzzy_match() {
        let mut content = json!({
            "layouts": {"desktop": [{
                "i": "other",
                "pluginId": "SomeOtherPlugin",
                "args": {"moduleId": "My-Widget_01"}
            }]},
            "modules": {}
        });
        let updated = apply_default_model(&mut content, Some("mywidget01"), &model()).unwrap();
        assert_eq!(updated, 1);
    }

    #[test]
    fn test_requesting_capture_module_by_name_behaves_like_default() {
        let mut content = page_content();
        let updated =
            apply_default_model(&mut content, Some("LibraryCapture"), &model()).unwrap();
        assert_eq!(updated, 3);
    }

    #[test]
    fn test_no_match_is_an_error() {
        let mut content = json!({
            "layouts": {"desktop": [{"i": "x", "pluginId": "OtherPlugin", "args": {}}]},
            "modules": {"m1": {"name": "SomethingElse"}}
        });
        let err = apply_default_model(&mut content, None, &model()).unwrap_err();
        assert!(matches!(err, LibraryError::TargetNotFound(_)));
    }

    #[test]
    fn test_explicit_id_does_not_fall_back_to_plugin_match() {
        // Requested id misses everything; plugin ownership alone must not
        // satisfy an explicit request for a different module.
        let mut content = page_content();
        let err = apply_default_model(&mut content, Some("unrelated"), &model()).unwrap_err();
        assert!(matches!(err, LibraryError::TargetNotFound(_)));
    }

    #[test]
    fn test_layout_entry_without_args_gets_args_created() {
        let mut content = json!({
            "layouts": {"desktop": [{"i": "LibraryCapture_1", "pluginId": "BrainDriveLibraryPlugin"}]},
            "modules": {}
        });
        let updated = apply_default_model(&mut content, None, &model()).unwrap();
        assert_eq!(updated, 1);
        assert_eq!(
            content["layouts"]["desktop"][0]["args"]["default_model_key"],
            "ollama::s1::llama3"
        );
    }
}
