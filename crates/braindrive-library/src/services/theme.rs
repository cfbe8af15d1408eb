// Theme binding
//
// Scoped listener against the host's theme service: acquire on mount,
// release unconditionally on unmount. Detach is idempotent so lifecycle
// churn (remount, prop change) can call it freely.

use std::sync::Arc;

/// Current host theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

pub type ThemeListener = Arc<dyn Fn(Theme) + Send + Sync>;

/// Host-provided theme service surface.
pub trait ThemeSource: Send + Sync {
    fn current_theme(&self) -> Theme;
    /// Register a change listener; returns a token for removal.
    fn add_listener(&self, listener: ThemeListener) -> usize;
    fn remove_listener(&self, token: usize);
}

/// A component's handle on the theme service.
pub struct ThemeBinding {
    source: Arc<dyn ThemeSource>,
    token: Option<usize>,
}

impl ThemeBinding {
    pub fn new(source: Arc<dyn ThemeSource>) -> Self {
        Self {
            source,
            token: None,
        }
    }

    /// Subscribe, replacing any existing subscription, and return the
    /// current theme for the initial render.
    pub fn attach(&mut self, listener: ThemeListener) -> Theme {
        self.detach();
        self.token = Some(self.source.add_listener(listener));
        self.source.current_theme()
    }

    /// Unsubscribe. Safe to call when not attached.
    pub fn detach(&mut self) {
        if let Some(token) = self.token.take() {
            self.source.remove_listener(token);
        }
    }
}

impl Drop for ThemeBinding {
    fn drop(&mut self) {
        self.detach();
    }
}
