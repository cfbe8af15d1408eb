// Service layer

pub mod api;
pub mod capture;
pub mod library;
pub mod theme;

pub use api::ApiClient;
pub use capture::{CaptureConfig, CaptureOrchestrator, PromptClient};
pub use library::{LibraryFilesClient, ScopeCatalog};
pub use theme::{Theme, ThemeBinding, ThemeSource};
