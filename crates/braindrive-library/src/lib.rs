// BrainDrive Library plugin client
//
// Client-side logic for the Library plugin: the capture panel's
// conversational state machine (model selection, scope resolution,
// streaming chat with an approval-gated tool workflow, transcript
// ingestion) and the library file editor boundary.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

/// Plugin slug used for page-module ownership and the MCP envelope.
pub const PLUGIN_SLUG: &str = "BrainDriveLibraryPlugin";

pub use error::{LibraryError, LibraryErrorCode, LibraryResult};
pub use models::catalog::{DefaultModelSpec, ModelInfo};
pub use models::mcp::{McpApprovalRequest, McpRequestParams, MetadataEvent};
pub use models::message::{Message, MessageSender, SaveStatus};
pub use models::page::PageContext;
pub use models::scope::{ScopeOption, ScopeRoot};
pub use services::api::ApiClient;
pub use services::capture::{CaptureConfig, CaptureOrchestrator, PromptClient, StreamItem};
pub use services::library::{LibraryFilesClient, ScopeCatalog};
pub use services::theme::{Theme, ThemeBinding, ThemeSource};
