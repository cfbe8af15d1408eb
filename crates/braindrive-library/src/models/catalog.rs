// Model catalog data models

use serde::{Deserialize, Serialize};

/// A chat-selectable model loaded from the provider catalog.
///
/// Immutable once loaded; the catalog is replaced wholesale on reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model name (catalog `name` else `id`)
    pub name: String,
    /// Provider name as reported by the backend
    pub provider: String,
    /// Provider settings id (static table, explicit field, or provider name)
    pub provider_id: String,
    /// Hosting server id; `"unknown"` when the catalog omits it
    pub server_id: String,
    /// Hosting server display name; `"Unknown Server"` when omitted
    pub server_name: String,
}

impl ModelInfo {
    /// Composite identity key: `provider::serverId::name`.
    pub fn key(&self) -> String {
        format!("{}::{}::{}", self.provider, self.server_id, self.name)
    }
}

/// A configured default-model specification, before resolution against the
/// loaded catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultModelSpec {
    pub provider: Option<String>,
    pub server_id: Option<String>,
    pub model_name: Option<String>,
}

impl DefaultModelSpec {
    /// Parse a composite `provider::serverId::modelName` key.
    ///
    /// Two segments are read as `provider::modelName`; a single segment is
    /// a bare model name.
    pub fn from_key(key: &str) -> Self {
        let parts: Vec<&str> = key.split("::").map(str::trim).collect();
        let non_empty = |s: &&str| !s.is_empty();
        match parts.as_slice() {
            [provider, server_id, name] => Self {
                provider: Some(*provider).filter(non_empty).map(String::from),
                server_id: Some(*server_id).filter(non_empty).map(String::from),
                model_name: Some(*name).filter(non_empty).map(String::from),
            },
            [provider, name] => Self {
                provider: Some(*provider).filter(non_empty).map(String::from),
                server_id: None,
                model_name: Some(*name).filter(non_empty).map(String::from),
            },
            [name] => Self {
                provider: None,
                server_id: None,
                model_name: Some(*name).filter(non_empty).map(String::from),
            },
            _ => Self::default(),
        }
    }

    /// Build from separately configured fields.
    pub fn from_fields(
        provider: Option<&str>,
        server_id: Option<&str>,
        model_name: Option<&str>,
    ) -> Self {
        let clean = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Self {
            provider: clean(provider),
            server_id: clean(server_id),
            model_name: clean(model_name),
        }
    }

    /// True when nothing usable was configured.
    pub fn is_empty(&self) -> bool {
        self.model_name.is_none()
    }

    /// Whether a catalog entry satisfies this specification.
    ///
    /// Provider and model name compare case-insensitively; the server id
    /// only constrains the match when one was configured.
    pub fn matches(&self, model: &ModelInfo) -> bool {
        let Some(name) = &self.model_name else {
            return false;
        };
        if !model.name.eq_ignore_ascii_case(name) {
            return false;
        }
        if let Some(provider) = &self.provider {
            if !model.provider.eq_ignore_ascii_case(provider) {
                return false;
            }
        }
        if let Some(server_id) = &self.server_id {
            if !model.server_id.eq_ignore_ascii_case(server_id) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(provider: &str, server_id: &str, name: &str) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            provider: provider.to_string(),
            provider_id: provider.to_string(),
            server_id: server_id.to_string(),
            server_name: "Unknown Server".to_string(),
        }
    }

    #[test]
    fn test_composite_key() {
        let m = model("ollama", "s1", "llama3");
        assert_eq!(m.key(), "ollama::s1::llama3");
    }

    #[test]
    fn test_parse_three_part_key() {
        let spec = DefaultModelSpec::from_key("ollama::s1::llama3");
        assert_eq!(spec.provider.as_deref(), Some("ollama"));
        assert_eq!(spec.server_id.as_deref(), Some("s1"));
        assert_eq!(spec.model_name.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_parse_two_part_key() {
        let spec = DefaultModelSpec::from_key("openai::gpt-4o-mini");
        assert_eq!(spec.provider.as_deref(), Some("openai"));
        assert!(spec.server_id.is_none());
        assert_eq!(spec.model_name.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_parse_bare_name() {
        let spec = DefaultModelSpec::from_key("llama3");
        assert!(spec.provider.is_none());
        assert_eq!(spec.model_name.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_matches_case_insensitive() {
        let spec = DefaultModelSpec::from_key("Ollama::S1::LLAMA3");
        assert!(spec.matches(&model("ollama", "s1", "llama3")));
    }

    #[test]
    fn test_server_id_constrains_when_present() {
        let spec = DefaultModelSpec::from_key("ollama::s2::llama3");
        assert!(!spec.matches(&model("ollama", "s1", "llama3")));

        let loose = DefaultModelSpec::from_key("ollama::llama3");
        assert!(loose.matches(&model("ollama", "s1", "llama3")));
    }

    #[test]
    fn test_empty_spec_matches_nothing() {
        let spec = DefaultModelSpec::default();
        assert!(spec.is_empty());
        assert!(!spec.matches(&model("ollama", "s1", "llama3")));
    }
}
