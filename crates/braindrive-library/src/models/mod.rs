// Data models for the Library plugin modules

pub mod catalog;
pub mod files;
pub mod mcp;
pub mod message;
pub mod page;
pub mod scope;

pub use catalog::{DefaultModelSpec, ModelInfo};
pub use files::{FileContent, SaveFileResult, TreeEntry, TreeEntryKind};
pub use mcp::{
    ApprovalStatus, McpApprovalDecision, McpApprovalRequest, McpRequestParams, McpScopeMode,
    MetadataEvent,
};
pub use message::{Message, MessageSender, SaveStatus};
pub use page::{PageContext, SaveDefaultModelResult};
pub use scope::{ScopeDefaults, ScopeOption, ScopeRoot, ScopeSource};
