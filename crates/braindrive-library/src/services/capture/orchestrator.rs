// Capture orchestrator
//
// The conversational state machine behind the capture panel. Owns the
// append-only message log, the conversation id, the single pending
// approval, model and scope selection, and the in-flight prompt. All
// state mutation happens on one logical control flow; network calls are
// the only suspension points.

use futures::StreamExt;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LibraryError;
use crate::models::catalog::{DefaultModelSpec, ModelInfo};
use crate::models::mcp::{
    ApprovalStatus, McpApprovalDecision, McpApprovalRequest, McpRequestParams, McpScopeMode,
    MetadataEvent,
};
use crate::models::message::{Message, SaveStatus};
use crate::models::page::{PageContext, SaveDefaultModelResult};
use crate::models::scope::{ScopeDefaults, ScopeOption, ScopeRoot, ScopeSource};
use crate::services::api::ApiClient;
use crate::services::capture::catalog::{load_models, resolve_default_model};
use crate::services::capture::defaults::save_capture_default_model_for_page;
use crate::services::capture::prompt::{ChatBackend, PromptRequest, StreamItem};
use crate::services::capture::transcript::{build_ingestion_prompt, TRANSCRIPT_SOURCE};
use crate::services::library::ScopeCatalog;
use crate::PLUGIN_SLUG;

/// Shown when a completed response trimmed down to nothing.
const NO_CONTENT_PLACEHOLDER: &str = "No response received.";

const SAVE_STATUS_TTL_SECS: u64 = 5;

/// Capture panel configuration, taken from the module's page args.
///
/// Every field has a usable default so a bare module instance works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub conversation_type: String,
    pub enable_streaming: bool,
    pub initial_greeting: Option<String>,
    pub default_model_key: Option<String>,
    pub default_model_provider: Option<String>,
    pub default_model_server_id: Option<String>,
    pub default_model_name: Option<String>,
    pub default_library_scope_enabled: bool,
    pub default_scope_root: Option<String>,
    pub default_scope_path: Option<String>,
    pub default_project_slug: Option<String>,
    pub default_project_lifecycle: String,
    pub default_transcript_source: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            conversation_type: "capture".to_string(),
            enable_streaming: true,
            initial_greeting: None,
            default_model_key: None,
            default_model_provider: None,
            default_model_server_id: None,
            default_model_name: None,
            default_library_scope_enabled: false,
            default_scope_root: None,
            default_scope_path: None,
            default_project_slug: None,
            default_project_lifecycle: "active".to_string(),
            default_transcript_source: TRANSCRIPT_SOURCE.to_string(),
        }
    }
}

impl CaptureConfig {
    fn default_model_spec(&self) -> Option<DefaultModelSpec> {
        if let Some(key) = self.default_model_key.as_deref() {
            let spec = DefaultModelSpec::from_key(key);
            if !spec.is_empty() {
                return Some(spec);
            }
        }
        let spec = DefaultModelSpec::from_fields(
            self.default_model_provider.as_deref(),
            self.default_model_server_id.as_deref(),
            self.default_model_name.as_deref(),
        );
        (!spec.is_empty()).then_some(spec)
    }

    fn scope_defaults(&self) -> ScopeDefaults {
        ScopeDefaults {
            enabled: self.default_library_scope_enabled,
            path: self.default_scope_path.clone(),
            slug: self.default_project_slug.clone(),
            root: self.default_scope_root.as_deref().and_then(ScopeRoot::parse),
            lifecycle: Some(self.default_project_lifecycle.clone()),
        }
    }
}

/// The capture panel's state machine.
pub struct CaptureOrchestrator {
    api: ApiClient,
    backend: Arc<dyn ChatBackend>,
    config: CaptureConfig,
    page_context: Option<PageContext>,

    messages: Vec<Message>,
    conversation_id: Option<String>,
    pending_approval: Option<McpApprovalRequest>,
    activity_status: Option<String>,
    error: Option<String>,
    is_submitting: bool,
    is_processing_transcript: bool,

    models: Vec<ModelInfo>,
    selected_model: Option<ModelInfo>,
    scopes: ScopeCatalog,
    selected_scope: Option<(ScopeOption, ScopeSource)>,
    user_id: Option<String>,

    cancel_tx: Option<mpsc::Sender<()>>,
    save_status: Arc<Mutex<Option<SaveStatus>>>,
    save_status_timer: Option<JoinHandle<()>>,
}

impl CaptureOrchestrator {
    pub fn new(
        api: ApiClient,
        backend: Arc<dyn ChatBackend>,
        config: CaptureConfig,
        page_context: Option<PageContext>,
    ) -> Self {
        let mut messages = Vec::new();
        if let Some(greeting) = config.initial_greeting.as_deref() {
            if !greeting.trim().is_empty() {
                messages.push(Message::system(greeting));
            }
        }
        Self {
            api,
            backend,
            config,
            page_context,
            messages,
            conversation_id: None,
            pending_approval: None,
            activity_status: None,
            error: None,
            is_submitting: false,
            is_processing_transcript: false,
            models: Vec::new(),
            selected_model: None,
            scopes: ScopeCatalog::default(),
            selected_scope: None,
            user_id: None,
            cancel_tx: None,
            save_status: Arc::new(Mutex::new(None)),
            save_status_timer: None,
        }
    }

    /// Load the model catalog and scope lists concurrently, then apply the
    /// configured defaults. The user id lookup is best-effort.
    pub async fn initialize(&mut self) {
        let (models, scopes) = tokio::join!(load_models(&self.api), ScopeCatalog::load(&self.api));

        match models {
            Ok(models) => {
                self.models = models;
                self.selected_model = resolve_default_model(
                    self.config.default_model_spec().as_ref(),
                    &self.models,
                )
                .cloned();
            }
            Err(err) => {
                log::error!("Model catalog load failed: {}", err);
                self.error = Some(err.to_string());
            }
        }

        match scopes {
            Ok(scopes) => {
                self.scopes = scopes;
                self.selected_scope = self
                    .scopes
                    .resolve_default(&self.config.scope_defaults())
                    .cloned()
                    .map(|scope| (scope, ScopeSource::Default));
            }
            Err(err) => {
                // Scope selection stays disabled; capture still works
                log::warn!("Scope load failed: {}", err);
            }
        }

        self.user_id = self.api.current_user_id().await;
    }

    /// Send a user prompt through the chat backend.
    ///
    /// No-op while a prompt or transcript is in flight, or while an
    /// approval is pending. With no model selected this surfaces an inline
    /// error without touching the network.
    pub async fn send(&mut self, prompt: &str) {
        self.send_internal(prompt, None).await;
    }

    /// Resolve the pending approval and re-send with the decision attached.
    /// The resolution travels with the next prompt request, not through a
    /// separate endpoint.
    pub async fn resolve_approval(&mut self, approve: bool) {
        if self.is_submitting {
            return;
        }
        let Some(pending) = self.pending_approval.as_mut() else {
            return;
        };
        pending.status = if approve {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        let decision = McpApprovalDecision {
            request_id: pending.request_id.clone(),
            tool: Some(pending.tool.clone()),
            approved: approve,
        };
        let label = if approve { "Approve" } else { "Deny" };
        self.send_internal(label, Some(decision)).await;
    }

    /// Upload a transcript document, extract its text, and feed it through
    /// the normal send path as an ingestion prompt.
    pub async fn upload_transcript(&mut self, file_name: &str, bytes: Vec<u8>) {
        if self.is_submitting || self.is_processing_transcript || self.pending_approval.is_some() {
            return;
        }
        self.is_processing_transcript = true;
        self.error = None;

        let text = match self.api.process_document(file_name, bytes).await {
            Ok(text) => text,
            Err(err) => {
                log::error!("Transcript extraction failed: {}", err);
                self.error = Some(err.to_string());
                self.is_processing_transcript = false;
                return;
            }
        };
        if text.trim().is_empty() {
            self.error = Some(LibraryError::EmptyTranscript.to_string());
            self.is_processing_transcript = false;
            return;
        }

        let prompt =
            build_ingestion_prompt(&self.config.default_transcript_source, file_name, &text);
        self.is_processing_transcript = false;
        self.send_internal(&prompt, None).await;
    }

    /// Persist the selected model as the page default; surfaces a toast
    /// that clears itself after a few seconds.
    pub async fn save_default_model(&mut self, page_id: &str, module_id: Option<&str>) {
        let Some(model) = self.selected_model.clone() else {
            self.set_save_status(SaveStatus {
                success: false,
                message: LibraryError::NoModelSelected.to_string(),
            });
            return;
        };
        match save_capture_default_model_for_page(&self.api, page_id, module_id, &model).await {
            Ok(SaveDefaultModelResult { updated_targets, .. }) => {
                self.set_save_status(SaveStatus {
                    success: true,
                    message: format!("Default model saved ({} target(s))", updated_targets),
                });
            }
            Err(err) => {
                log::error!("Default model save failed: {}", err);
                self.set_save_status(SaveStatus {
                    success: false,
                    message: err.to_string(),
                });
            }
        }
    }

    /// Stop delivering chunks for the in-flight prompt, if any.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.try_send(());
        }
    }

    /// Select a model from the loaded catalog by its composite key.
    pub fn select_model(&mut self, key: &str) {
        match self.models.iter().find(|m| m.key() == key) {
            Some(model) => self.selected_model = Some(model.clone()),
            None => log::warn!("Model {} is not in the catalog", key),
        }
    }

    /// Select a scope by normalized path; `None` clears the selection.
    pub fn select_scope(&mut self, path: Option<&str>) {
        self.selected_scope = path
            .and_then(|p| self.scopes.find_by_path(p))
            .cloned()
            .map(|scope| (scope, ScopeSource::User));
    }

    async fn send_internal(&mut self, prompt: &str, decision: Option<McpApprovalDecision>) {
        if self.is_submitting || self.is_processing_transcript {
            log::debug!("Send ignored: already in flight");
            return;
        }
        // While an approval is pending, only the decision-carrying call
        // may go out
        if self.pending_approval.is_some() && decision.is_none() {
            log::debug!("Send ignored: approval pending");
            return;
        }
        let Some(model) = self.selected_model.clone() else {
            self.error = Some(LibraryError::NoModelSelected.to_string());
            return;
        };

        self.cancel();
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::streaming_placeholder());
        let placeholder = self.messages.len() - 1;
        self.is_submitting = true;
        self.error = None;
        self.activity_status = None;

        let (cancel_tx, cancel_rx) = mpsc::channel(1);
        self.cancel_tx = Some(cancel_tx);

        let request = PromptRequest {
            prompt: prompt.to_string(),
            model,
            conversation_id: self.conversation_id.clone(),
            conversation_type: self.config.conversation_type.clone(),
            user_id: self.user_id.clone(),
            streaming: self.config.enable_streaming,
            mcp: self.mcp_params(decision),
            page_context: self.page_context.clone(),
        };

        let mut stream = match self.backend.send_prompt(request, cancel_rx).await {
            Ok(stream) => stream,
            Err(err) => {
                self.fail(placeholder, &err);
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamItem::Text(chunk)) => {
                    self.messages[placeholder].content.push_str(&chunk);
                }
                Ok(StreamItem::Event(event)) => self.handle_event(event),
                Ok(StreamItem::ConversationId(id)) => {
                    if self.conversation_id.is_none() {
                        log::info!("Conversation started: {}", id);
                        self.conversation_id = Some(id);
                    }
                }
                Err(err) => {
                    self.fail(placeholder, &err);
                    return;
                }
            }
        }

        let message = &mut self.messages[placeholder];
        let trimmed = message.content.trim().to_string();
        message.content = if trimmed.is_empty() {
            NO_CONTENT_PLACEHOLDER.to_string()
        } else {
            trimmed
        };
        message.is_streaming = false;
        self.finish_call();
    }

    /// Apply one metadata event to orchestrator state.
    pub(crate) fn handle_event(&mut self, event: MetadataEvent) {
        match event {
            MetadataEvent::ToolingState { state, message } => {
                self.activity_status = message.or(state);
            }
            MetadataEvent::ToolCall { name, tool } => {
                let name = name.or(tool).unwrap_or_else(|| "tool".to_string());
                self.activity_status = Some(format!("Running tool: {}...", name));
            }
            MetadataEvent::ToolResult { .. } => {
                self.activity_status = Some("Processing tool result...".to_string());
            }
            MetadataEvent::AutoContinue {} => {
                self.activity_status = Some("Continuing...".to_string());
            }
            MetadataEvent::ProjectScopeSuggested { name, slug, path } => {
                log::debug!(
                    "Scope suggested: name={:?} slug={:?} path={:?}",
                    name,
                    slug,
                    path
                );
            }
            MetadataEvent::ProjectScopeSelected { path, .. } => {
                // The one case where the server silently moves client scope
                if let Some(scope) = path.as_deref().and_then(|p| self.scopes.find_by_path(p)) {
                    log::info!("Scope adopted from tool execution: {}", scope.path);
                    self.selected_scope = Some((scope.clone(), ScopeSource::Tool));
                }
            }
            MetadataEvent::ApprovalRequest {
                request_id,
                tool,
                summary,
                arguments,
            }
            | MetadataEvent::ApprovalRequired {
                request_id,
                tool,
                summary,
                arguments,
            } => {
                self.begin_approval(request_id, tool, summary, arguments);
            }
            MetadataEvent::ApprovalResolution { request_id, status } => {
                self.resolve_pending(request_id.as_deref(), status.as_deref());
            }
            MetadataEvent::OrchestrationContextError { message } => {
                let message =
                    message.unwrap_or_else(|| "Orchestration context error".to_string());
                log::error!("{}", message);
                self.error = Some(message);
            }
            MetadataEvent::Unknown => {}
        }
    }

    fn begin_approval(
        &mut self,
        request_id: Option<String>,
        tool: Option<String>,
        summary: Option<String>,
        arguments: Option<serde_json::Value>,
    ) {
        let tool = tool.unwrap_or_else(|| "tool".to_string());
        let summary = summary.unwrap_or_else(|| format!("Run {}", tool));
        self.messages
            .push(Message::system(format!("Approval needed: {}", summary)));
        // Replacing any existing record keeps at most one pending approval
        self.pending_approval = Some(McpApprovalRequest {
            request_id,
            tool,
            summary,
            arguments,
            status: ApprovalStatus::Pending,
        });
        self.activity_status = Some("Waiting for approval".to_string());
    }

    fn resolve_pending(&mut self, request_id: Option<&str>, status: Option<&str>) {
        let matches = match (request_id, &self.pending_approval) {
            // An id-less resolution clears whatever is pending
            (None, _) => true,
            (Some(id), Some(pending)) => pending.request_id.as_deref() == Some(id),
            (Some(_), None) => false,
        };
        if matches {
            log::debug!("Approval resolved: {:?}", status);
            self.pending_approval = None;
            self.activity_status = None;
        }
    }

    fn mcp_params(&self, decision: Option<McpApprovalDecision>) -> McpRequestParams {
        let scope = self.selected_scope.as_ref();
        McpRequestParams {
            mcp_tools_enabled: true,
            mcp_scope_mode: if scope.is_some() {
                McpScopeMode::Project
            } else {
                McpScopeMode::None
            },
            mcp_project_slug: scope.map(|(s, _)| s.slug.clone()),
            mcp_project_name: scope.map(|(s, _)| s.name.clone()),
            mcp_project_lifecycle: scope.map(|(s, _)| s.lifecycle.clone()),
            mcp_project_source: scope
                .map(|(_, source)| source.as_str().to_string())
                .unwrap_or_else(|| "default".to_string()),
            mcp_plugin_slug: PLUGIN_SLUG.to_string(),
            mcp_approval: decision,
        }
    }

    fn fail(&mut self, placeholder: usize, err: &LibraryError) {
        log::error!("Prompt call failed: {}", err);
        let message = &mut self.messages[placeholder];
        message.content = format!("Error: {}", err);
        message.is_streaming = false;
        message.is_error = true;
        self.error = Some(err.to_string());
        self.finish_call();
    }

    fn finish_call(&mut self) {
        self.is_submitting = false;
        self.activity_status = None;
        self.cancel_tx = None;
    }

    fn set_save_status(&mut self, status: SaveStatus) {
        if let Some(timer) = self.save_status_timer.take() {
            timer.abort();
        }
        if let Ok(mut slot) = self.save_status.lock() {
            *slot = Some(status);
        }
        let shared = Arc::clone(&self.save_status);
        self.save_status_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(SAVE_STATUS_TTL_SECS)).await;
            if let Ok(mut slot) = shared.lock() {
                *slot = None;
            }
        }));
    }

    // Read accessors for the rendering layer

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn pending_approval(&self) -> Option<&McpApprovalRequest> {
        self.pending_approval.as_ref()
    }

    pub fn activity_status(&self) -> Option<&str> {
        self.activity_status.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn selected_model(&self) -> Option<&ModelInfo> {
        self.selected_model.as_ref()
    }

    pub fn scope_options(&self) -> &[ScopeOption] {
        self.scopes.options()
    }

    pub fn selected_scope(&self) -> Option<&ScopeOption> {
        self.selected_scope.as_ref().map(|(scope, _)| scope)
    }

    pub fn save_status(&self) -> Option<SaveStatus> {
        self.save_status.lock().ok().and_then(|slot| slot.clone())
    }
}
