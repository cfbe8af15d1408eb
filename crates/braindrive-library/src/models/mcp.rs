// MCP envelope and metadata event models
//
// MCP here is the tool-call/approval layer spoken over the chat endpoint:
// every prompt carries an `McpRequestParams` envelope, and the streamed
// response may interleave structured metadata events with text chunks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scope mode attached to a prompt request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum McpScopeMode {
    #[default]
    None,
    Project,
}

/// The scope/approval envelope sent with every prompt.
///
/// Derived fresh per request from current orchestrator state; never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpRequestParams {
    pub mcp_tools_enabled: bool,
    pub mcp_scope_mode: McpScopeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_project_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_project_lifecycle: Option<String>,
    pub mcp_project_source: String,
    pub mcp_plugin_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_approval: Option<McpApprovalDecision>,
}

/// Lifecycle of a backend-proposed tool call awaiting user confirmation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A backend-proposed mutating tool call awaiting the approval gate.
///
/// At most one of these is pending at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpApprovalRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub tool: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    pub status: ApprovalStatus,
}

/// The user's approval decision, attached to the next prompt request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpApprovalDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub approved: bool,
}

/// Structured metadata event demultiplexed from the chat stream.
///
/// Discriminated by the record's `type` field; records with an
/// unrecognized type deserialize to `Unknown` and are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataEvent {
    ProjectScopeSuggested {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        slug: Option<String>,
        #[serde(default)]
        path: Option<String>,
    },
    ProjectScopeSelected {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        slug: Option<String>,
        #[serde(default)]
        path: Option<String>,
    },
    ToolingState {
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    ToolCall {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        tool: Option<String>,
    },
    ToolResult {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        tool: Option<String>,
    },
    AutoContinue {},
    ApprovalRequest {
        #[serde(default)]
        request_id: Option<String>,
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        arguments: Option<Value>,
    },
    ApprovalRequired {
        #[serde(default)]
        request_id: Option<String>,
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        arguments: Option<Value>,
    },
    ApprovalResolution {
        #[serde(default)]
        request_id: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    OrchestrationContextError {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl MetadataEvent {
    /// Whether a raw record carries a recognized event type.
    pub fn is_recognized_type(type_name: &str) -> bool {
        matches!(
            type_name,
            "project_scope_suggested"
                | "project_scope_selected"
                | "tooling_state"
                | "tool_call"
                | "tool_result"
                | "auto_continue"
                | "approval_request"
                | "approval_required"
                | "orchestration_context_error"
                | "approval_resolution"
        )
    }
}
