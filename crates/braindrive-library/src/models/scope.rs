// Library scope data models

use serde::{Deserialize, Serialize};

use crate::utils::text::{normalize_scope_path, slugify};

/// Which subtree of the library a scope lives under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRoot {
    #[default]
    Projects,
    Life,
}

impl ScopeRoot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeRoot::Projects => "projects",
            ScopeRoot::Life => "life",
        }
    }

    /// Parse a configured root string; unknown values fall back to projects.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "projects" | "project" => Some(ScopeRoot::Projects),
            "life" => Some(ScopeRoot::Life),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScopeRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selectable capture scope (a project or a life area).
///
/// `path` is the canonical identity: forward-slash separated with no
/// leading/trailing slash. Original case is preserved; comparisons
/// lowercase both sides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScopeOption {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_lifecycle")]
    pub lifecycle: String,
    pub path: String,
    #[serde(default)]
    pub scope_root: ScopeRoot,
    #[serde(default)]
    pub has_notes: bool,
    #[serde(default)]
    pub has_tasks: bool,
    #[serde(default)]
    pub has_decisions: bool,
}

fn default_lifecycle() -> String {
    "active".to_string()
}

impl ScopeOption {
    /// Synthesize a scope option from a bare string entry.
    ///
    /// Older backends return plain names for life areas; the slug and a
    /// default path are derived from the name.
    pub fn from_bare_name(name: &str, root: ScopeRoot) -> Self {
        let slug = slugify(name);
        let path = match root {
            ScopeRoot::Life => format!("life/{}", slug),
            ScopeRoot::Projects => format!("projects/active/{}", slug),
        };
        Self {
            name: name.trim().to_string(),
            slug,
            lifecycle: default_lifecycle(),
            path,
            scope_root: root,
            has_notes: false,
            has_tasks: false,
            has_decisions: false,
        }
    }

    /// Canonical normalized path.
    pub fn normalized_path(&self) -> String {
        normalize_scope_path(&self.path)
    }
}

/// Configured scope defaulting inputs, taken from the module's page args.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeDefaults {
    pub enabled: bool,
    pub path: Option<String>,
    pub slug: Option<String>,
    pub root: Option<ScopeRoot>,
    pub lifecycle: Option<String>,
}

/// How the current scope selection came to be.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScopeSource {
    /// Applied from page-configured defaults
    Default,
    /// Chosen by the user
    User,
    /// Adopted from a backend `project_scope_selected` event
    Tool,
}

impl ScopeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeSource::Default => "default",
            ScopeSource::User => "user",
            ScopeSource::Tool => "tool",
        }
    }
}
