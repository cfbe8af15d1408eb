// Scope catalog loader and resolver
//
// Loads the project and life scope lists from the backend, merges them
// (life areas first, then alphabetical), and resolves a configured default
// against the merged list. An unmatched default disables scope selection;
// it is never an error.

use serde_json::Value;

use crate::error::{LibraryError, LibraryResult};
use crate::models::scope::{ScopeDefaults, ScopeOption, ScopeRoot};
use crate::services::api::ApiClient;
use crate::utils::text::{normalize_scope_path, scope_paths_equal};

/// Candidate endpoints for project scopes, newest first.
const PROJECT_SCOPE_PATHS: [&str; 2] = [
    "/plugins/braindrive-library/library/projects?lifecycle=active",
    "/library/projects?lifecycle=active",
];

/// Candidate endpoints for life scopes, newest first.
const LIFE_SCOPE_PATHS: [&str; 3] = [
    "/plugins/braindrive-library/library/life-areas",
    "/library/life-areas",
    "/library/life",
];

/// The merged, display-ordered scope list.
#[derive(Debug, Clone, Default)]
pub struct ScopeCatalog {
    options: Vec<ScopeOption>,
}

impl ScopeCatalog {
    /// Fetch project and life scopes and merge them.
    ///
    /// Each list walks its candidate endpoints in order, first success
    /// wins. A list that fails everywhere contributes nothing; the load
    /// only errors when both lists fail.
    pub async fn load(api: &ApiClient) -> LibraryResult<Self> {
        let projects = fetch_scope_list(api, &PROJECT_SCOPE_PATHS, ScopeRoot::Projects).await;
        let life = fetch_scope_list(api, &LIFE_SCOPE_PATHS, ScopeRoot::Life).await;

        let (projects, life) = match (projects, life) {
            (Err(p_err), Err(l_err)) => {
                log::error!("Scope load failed for both lists: {} / {}", p_err, l_err);
                return Err(l_err);
            }
            (projects, life) => (
                projects.unwrap_or_else(|err| {
                    log::warn!("Project scope load failed: {}", err);
                    Vec::new()
                }),
                life.unwrap_or_else(|err| {
                    log::warn!("Life scope load failed: {}", err);
                    Vec::new()
                }),
            ),
        };

        Ok(Self::from_lists(projects, life))
    }

    /// Merge two raw lists: life entries first, then alphabetical by name.
    pub fn from_lists(projects: Vec<ScopeOption>, life: Vec<ScopeOption>) -> Self {
        let mut options: Vec<ScopeOption> = life.into_iter().chain(projects).collect();
        options.sort_by(|a, b| {
            let a_life = a.scope_root == ScopeRoot::Life;
            let b_life = b.scope_root == ScopeRoot::Life;
            b_life
                .cmp(&a_life)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Self { options }
    }

    pub fn options(&self) -> &[ScopeOption] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Find an option by normalized path, case-insensitive.
    pub fn find_by_path(&self, path: &str) -> Option<&ScopeOption> {
        self.options
            .iter()
            .find(|opt| scope_paths_equal(&opt.path, path))
    }

    /// Find an option by slug, optionally constrained to a root.
    pub fn find_by_slug(&self, slug: &str, root: Option<ScopeRoot>) -> Option<&ScopeOption> {
        self.options.iter().find(|opt| {
            opt.slug.eq_ignore_ascii_case(slug.trim())
                && root.map(|r| opt.scope_root == r).unwrap_or(true)
        })
    }

    /// Resolve a configured default against the catalog.
    ///
    /// Priority: exact normalized-path match, then slug (with optional
    /// root filter). No match, or defaults disabled, resolves to `None`.
    pub fn resolve_default(&self, defaults: &ScopeDefaults) -> Option<&ScopeOption> {
        if !defaults.enabled {
            return None;
        }
        if let Some(path) = defaults.path.as_deref() {
            let normalized = normalize_scope_path(path);
            if !normalized.is_empty() {
                if let Some(found) = self.find_by_path(&normalized) {
                    return Some(found);
                }
            }
        }
        if let Some(slug) = defaults.slug.as_deref() {
            if !slug.trim().is_empty() {
                if let Some(found) = self.find_by_slug(slug, defaults.root) {
                    return Some(found);
                }
            }
        }
        log::debug!("Configured scope default matched nothing; scope disabled");
        None
    }
}

async fn fetch_scope_list(
    api: &ApiClient,
    candidates: &[&str],
    root: ScopeRoot,
) -> LibraryResult<Vec<ScopeOption>> {
    let paths: Vec<String> = candidates.iter().map(|p| p.to_string()).collect();
    let payload = api.get_json_first(&paths).await?;
    parse_scope_list(payload, root)
}

/// Parse a raw scope payload into options.
///
/// Entries may be full objects or bare name strings (older backends);
/// bare strings are synthesized with a slugified name and a default path.
pub fn parse_scope_list(payload: Value, root: ScopeRoot) -> LibraryResult<Vec<ScopeOption>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map
            .remove("projects")
            .or_else(|| map.remove("areas"))
            .or_else(|| map.remove("items"))
        {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut options = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(name) => {
                if !name.trim().is_empty() {
                    options.push(ScopeOption::from_bare_name(&name, root));
                }
            }
            Value::Object(mut obj) => {
                // Entries from list endpoints may omit their root; it is
                // implied by which list they came from.
                obj.entry("scope_root")
                    .or_insert_with(|| Value::String(root.as_str().to_string()));
                let mut option: ScopeOption =
                    serde_json::from_value(Value::Object(obj)).map_err(LibraryError::from)?;
                option.path = normalize_scope_path(&option.path);
                options.push(option);
            }
            _ => {}
        }
    }
    Ok(options)
}
