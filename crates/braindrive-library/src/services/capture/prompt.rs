// Prompt/streaming client
//
// Sends a chat request (streaming or single-shot) and demultiplexes the
// response into plain-text chunks, structured metadata events, and the
// conversation id. Streamed frames are newline-delimited records with an
// optional `data: ` prefix; a literal `[DONE]` record is skipped, and
// malformed records are dropped rather than aborting the stream.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::{Map, Value};
use std::pin::Pin;
use tokio::sync::mpsc;

use crate::error::{LibraryError, LibraryResult};
use crate::models::catalog::ModelInfo;
use crate::models::mcp::{MetadataEvent, McpRequestParams};
use crate::models::page::PageContext;
use crate::services::api::{extract_error_message, ApiClient};

const CHAT_PATH: &str = "/ai/providers/chat";

/// Fixed generation parameters, overridable by the MCP envelope.
const DEFAULT_TEMPERATURE: f64 = 0.3;
const DEFAULT_MAX_TOKENS: u64 = 2048;

/// One demultiplexed unit of a chat response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// Plain text appended to the in-flight assistant message
    Text(String),
    /// Structured metadata event
    Event(MetadataEvent),
    /// Conversation id, emitted at most once per call
    ConversationId(String),
}

/// A demultiplexed chat response stream.
pub type PromptStream = Pin<Box<dyn Stream<Item = LibraryResult<StreamItem>> + Send>>;

/// Everything needed to issue one prompt call.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub prompt: String,
    pub model: ModelInfo,
    pub conversation_id: Option<String>,
    pub conversation_type: String,
    pub user_id: Option<String>,
    pub streaming: bool,
    pub mcp: McpRequestParams,
    pub page_context: Option<PageContext>,
}

/// Transport seam for the orchestrator; lets tests script responses.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_prompt(
        &self,
        request: PromptRequest,
        cancel: mpsc::Receiver<()>,
    ) -> LibraryResult<PromptStream>;
}

/// HTTP chat client against the providers endpoint.
#[derive(Clone)]
pub struct PromptClient {
    api: ApiClient,
}

impl PromptClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn send_streaming(
        &self,
        body: Value,
        mut cancel: mpsc::Receiver<()>,
    ) -> LibraryResult<PromptStream> {
        let response = self
            .api
            .http()
            .post(self.api.url(CHAT_PATH))
            .json(&body)
            .send()
            .await
            .map_err(LibraryError::from)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(extract_error_message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(LibraryError::ApiError(message));
        }

        let mut frames = response.bytes_stream();
        let stream = try_stream! {
            let mut demux = StreamDemuxer::new();
            loop {
                let frame = tokio::select! {
                    biased;
                    _ = cancel.recv() => {
                        log::debug!("Prompt stream cancelled");
                        break;
                    }
                    frame = frames.next() => frame,
                };
                let Some(frame) = frame else { break };
                let bytes = frame.map_err(LibraryError::from)?;
                for item in demux.feed(&bytes) {
                    yield item;
                }
            }
            for item in demux.finish() {
                yield item;
            }
        };
        Ok(Box::pin(stream))
    }

    async fn send_single_shot(&self, body: Value) -> LibraryResult<PromptStream> {
        let payload = self.api.post_json(CHAT_PATH, &body).await?;
        let items = demux_single_response(&payload)?;
        let stream = futures::stream::iter(items.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl ChatBackend for PromptClient {
    async fn send_prompt(
        &self,
        request: PromptRequest,
        cancel: mpsc::Receiver<()>,
    ) -> LibraryResult<PromptStream> {
        let streaming = request.streaming;
        let body = build_request_body(&request)?;
        if streaming {
            self.send_streaming(body, cancel).await
        } else {
            self.send_single_shot(body).await
        }
    }
}

/// Assemble the chat request body: fixed generation parameters, model
/// identity, then the MCP envelope (which may override overlapping keys),
/// and the serialized page context when available.
pub fn build_request_body(request: &PromptRequest) -> LibraryResult<Value> {
    let mut body = Map::new();
    body.insert("prompt".to_string(), Value::String(request.prompt.clone()));
    body.insert("model".to_string(), Value::String(request.model.name.clone()));
    body.insert(
        "provider".to_string(),
        Value::String(request.model.provider.clone()),
    );
    body.insert(
        "provider_id".to_string(),
        Value::String(request.model.provider_id.clone()),
    );
    body.insert(
        "server_id".to_string(),
        Value::String(request.model.server_id.clone()),
    );
    body.insert("temperature".to_string(), DEFAULT_TEMPERATURE.into());
    body.insert("max_tokens".to_string(), DEFAULT_MAX_TOKENS.into());
    body.insert("stream".to_string(), Value::Bool(request.streaming));
    body.insert(
        "conversation_type".to_string(),
        Value::String(request.conversation_type.clone()),
    );
    if let Some(conversation_id) = &request.conversation_id {
        body.insert(
            "conversation_id".to_string(),
            Value::String(conversation_id.clone()),
        );
    }
    if let Some(user_id) = &request.user_id {
        body.insert("user_id".to_string(), Value::String(user_id.clone()));
    }

    let mcp = serde_json::to_value(&request.mcp)?;
    if let Value::Object(mcp) = mcp {
        for (key, value) in mcp {
            body.insert(key, value);
        }
    }

    if let Some(context) = &request.page_context {
        body.insert(
            "page_context".to_string(),
            Value::String(serde_json::to_string(context)?),
        );
    }

    Ok(Value::Object(body))
}

/// Incremental record demultiplexer for the streaming transport.
///
/// Frames are buffered as raw bytes until a newline completes a record,
/// so a multi-byte UTF-8 character split across transport frames is never
/// decoded early. The trailing partial record is flushed at stream end.
pub(crate) struct StreamDemuxer {
    buffer: Vec<u8>,
    conversation_seen: bool,
}

impl StreamDemuxer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            conversation_seen: false,
        }
    }

    /// Feed one transport frame; returns the items completed by it.
    pub fn feed(&mut self, frame: &[u8]) -> Vec<StreamItem> {
        self.buffer.extend_from_slice(frame);
        let mut items = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let record: Vec<u8> = self.buffer.drain(..=newline).collect();
            let record = String::from_utf8_lossy(&record);
            self.parse_record(record.trim_end_matches(['\n', '\r']), &mut items);
        }
        items
    }

    /// Flush any trailing record at end of stream.
    pub fn finish(&mut self) -> Vec<StreamItem> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let mut items = Vec::new();
        self.parse_record(&rest, &mut items);
        items
    }

    fn parse_record(&mut self, record: &str, items: &mut Vec<StreamItem>) {
        let record = record.trim();
        if record.is_empty() {
            return;
        }
        let record = record
            .strip_prefix("data:")
            .map(str::trim_start)
            .unwrap_or(record);
        if record == "[DONE]" {
            return;
        }

        let value: Value = match serde_json::from_str(record) {
            Ok(value) => value,
            Err(err) => {
                // Best-effort streaming parse: one bad frame never aborts
                log::debug!("Dropping malformed stream record: {}", err);
                return;
            }
        };

        if !self.conversation_seen {
            if let Some(id) = record_conversation_id(&value) {
                self.conversation_seen = true;
                items.push(StreamItem::ConversationId(id));
            }
        }

        if let Some(type_name) = value.get("type").and_then(Value::as_str) {
            if MetadataEvent::is_recognized_type(type_name) {
                match serde_json::from_value::<MetadataEvent>(value) {
                    Ok(event) => items.push(StreamItem::Event(event)),
                    Err(err) => log::debug!("Dropping unparseable metadata event: {}", err),
                }
                return;
            }
        }

        if let Some(text) = extract_text_fragment(&value) {
            if !text.is_empty() {
                items.push(StreamItem::Text(text));
            }
        }
    }
}

fn record_conversation_id(value: &Value) -> Option<String> {
    value
        .get("conversation_id")
        .or_else(|| value.get("conversationId"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Fixed text extraction order shared by the streaming and single-shot
/// paths: string body; `choices[0]` delta/message/text; the named fields
/// `content`, `message`, `text`, `response`, `output`, `result`, `answer`;
/// and finally `delta.content`.
pub(crate) fn extract_text_fragment(value: &Value) -> Option<String> {
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }

    if let Some(choice) = value.get("choices").and_then(|c| c.get(0)) {
        for path in [
            choice.get("delta").and_then(|d| d.get("content")),
            choice.get("message").and_then(|m| m.get("content")),
            choice.get("text"),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(text) = path.as_str() {
                return Some(text.to_string());
            }
        }
    }

    for field in ["content", "message", "text", "response", "output", "result", "answer"] {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }

    value
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Demultiplex a single-shot response body.
///
/// Tooling/approval fields are surfaced as synthesized events before text
/// extraction; a response with neither text nor an approval event is an
/// error (an approval-only response is valid).
pub(crate) fn demux_single_response(payload: &Value) -> LibraryResult<Vec<StreamItem>> {
    let mut items = Vec::new();

    if let Some(id) = record_conversation_id(payload) {
        items.push(StreamItem::ConversationId(id));
    }

    if let Some(state) = payload.get("tooling_state") {
        items.push(StreamItem::Event(MetadataEvent::ToolingState {
            state: state.as_str().map(String::from),
            message: None,
        }));
    }

    let mut approval_seen = false;
    if let Some(required) = payload.get("approval_required") {
        approval_seen = true;
        items.push(StreamItem::Event(MetadataEvent::ApprovalRequired {
            request_id: field_str(required, "request_id"),
            tool: field_str(required, "tool"),
            summary: field_str(required, "summary"),
            arguments: required.get("arguments").cloned(),
        }));
    }
    if let Some(resolution) = payload.get("approval_resolution") {
        approval_seen = true;
        items.push(StreamItem::Event(MetadataEvent::ApprovalResolution {
            request_id: field_str(resolution, "request_id"),
            status: field_str(resolution, "status"),
        }));
    }

    let text = extract_text_fragment(payload).filter(|t| !t.is_empty());
    match text {
        Some(text) => items.push(StreamItem::Text(text)),
        None if !approval_seen => return Err(LibraryError::EmptyResponse),
        None => {}
    }

    Ok(items)
}

fn field_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(String::from)
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
            server_name: "Local".to_string(),
        }
    }

    fn request() -> PromptRequest {
        PromptRequest {
            prompt: "hello".to_string(),
            model: model(),
            conversation_id: None,
            conversation_type: "capture".to_string(),
            user_id: Some("u1".to_string()),
            streaming: true,
            mcp: McpRequestParams {
                mcp_tools_enabled: true,
                mcp_scope_mode: crate::models::mcp::McpScopeMode::None,
                mcp_project_slug: None,
                mcp_project_name: None,
                mcp_project_lifecycle: None,
                mcp_project_source: "default".to_string(),
                mcp_plugin_slug: "BrainDriveLibraryPlugin".to_string(),
                mcp_approval: None,
            },
            page_context: Some(PageContext {
                page_id: "p1".to_string(),
                page_name: Some("Capture".to_string()),
                page_route: None,
                is_studio_page: false,
            }),
        }
    }

    #[test]
    fn test_request_body_fixed_parameters() {
        let body = build_request_body(&request()).unwrap();
        assert_eq!(body["temperature"], json!(0.3));
        assert_eq!(body["max_tokens"], json!(2048));
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["mcp_plugin_slug"], "BrainDriveLibraryPlugin");
        // Page context travels as a serialized side-channel string
        let context = body["page_context"].as_str().unwrap();
        assert!(context.contains("\"pageId\":\"p1\""));
    }

    #[test]
    fn test_demux_scenario_tool_call_then_text_then_done() {
        let mut demux = StreamDemuxer::new();
        let mut items = Vec::new();
        items.extend(demux.feed(b"data: {\"type\":\"tool_call\",\"name\":\"x\"}\n"));
        items.extend(demux.feed(b"data: {\"text\":\"hi\"}\n"));
        items.extend(demux.feed(b"data: [DONE]\n"));
        items.extend(demux.finish());

        assert_eq!(
            items,
            vec![
                StreamItem::Event(MetadataEvent::ToolCall {
                    name: Some("x".to_string()),
                    tool: None
                }),
                StreamItem::Text("hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_demux_reassembles_split_records() {
        let mut demux = StreamDemuxer::new();
        let mut items = Vec::new();
        items.extend(demux.feed(b"data: {\"content\":"));
        items.extend(demux.feed(b"\"hel"));
        items.extend(demux.feed(b"lo\"}\ndata: {\"content\":\"world\"}\n"));
        items.extend(demux.finish());
        assert_eq!(
            items,
            vec![
                StreamItem::Text("hello".to_string()),
                StreamItem::Text("world".to_string()),
            ]
        );
    }

    #[test]
    fn test_demux_drops_malformed_records() {
        let mut demux = StreamDemuxer::new();
        let mut items = Vec::new();
        items.extend(demux.feed(b"data: {not json}\n"));
        items.extend(demux.feed(b"{\"response\":\"ok\"}\n"));
        assert_eq!(items, vec![StreamItem::Text("ok".to_string())]);
    }

    #[test]
    fn test_demux_conversation_id_first_wins() {
        let mut demux = StreamDemuxer::new();
        let mut items = Vec::new();
        items.extend(demux.feed(b"{\"conversation_id\":\"c1\",\"content\":\"a\"}\n"));
        items.extend(demux.feed(b"{\"conversation_id\":\"c2\",\"content\":\"b\"}\n"));
        assert_eq!(
            items,
            vec![
                StreamItem::ConversationId("c1".to_string()),
                StreamItem::Text("a".to_string()),
                StreamItem::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unrecognized_type_still_yields_text() {
        let mut demux = StreamDemuxer::new();
        let items = demux.feed(b"{\"type\":\"heartbeat\",\"content\":\"hi\"}\n");
        assert_eq!(items, vec![StreamItem::Text("hi".to_string())]);
    }

    #[test]
    fn test_multibyte_character_split_across_frames() {
        let mut demux = StreamDemuxer::new();
        let record = "{\"content\":\"\u{65e5}\u{672c}\"}\n".as_bytes();
        // Split inside the first 3-byte character
        let mut items = Vec::new();
        items.extend(demux.feed(&record[..13]));
        items.extend(demux.feed(&record[13..]));
        assert_eq!(
            items,
            vec![StreamItem::Text("\u{65e5}\u{672c}".to_string())]
        );
    }

    #[test]
    fn test_extraction_order() {
        // String body wins outright
        assert_eq!(extract_text_fragment(&json!("raw")).as_deref(), Some("raw"));
        // choices[0].delta.content before named fields
        let value = json!({
            "choices": [{"delta": {"content": "from-delta"}}],
            "content": "from-content"
        });
        assert_eq!(extract_text_fragment(&value).as_deref(), Some("from-delta"));
        // choices[0].message.content
        let value = json!({"choices": [{"message": {"content": "m"}}]});
        assert_eq!(extract_text_fragment(&value).as_deref(), Some("m"));
        // Named field order: content before answer
        let value = json!({"answer": "a", "content": "c"});
        assert_eq!(extract_text_fragment(&value).as_deref(), Some("c"));
        // Top-level text field, as streamed by some providers
        assert_eq!(
            extract_text_fragment(&json!({"text": "t"})).as_deref(),
            Some("t")
        );
        // Bare delta.content as last resort
        let value = json!({"delta": {"content": "d"}});
        assert_eq!(extract_text_fragment(&value).as_deref(), Some("d"));
        assert_eq!(extract_text_fragment(&json!({"other": 1})), None);
    }

    #[test]
    fn test_single_shot_text_response() {
        let items = demux_single_response(&json!({"response": "done"})).unwrap();
        assert_eq!(items, vec![StreamItem::Text("done".to_string())]);
    }

    #[test]
    fn test_single_shot_approval_only_is_valid() {
        let items = demux_single_response(&json!({
            "approval_required": {"request_id": "r1", "tool": "write_note", "summary": "s"}
        }))
        .unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            StreamItem::Event(MetadataEvent::ApprovalRequired { .. })
        ));
    }

    #[test]
    fn test_single_shot_empty_is_error() {
        let err = demux_single_response(&json!({"other": 1})).unwrap_err();
        assert!(matches!(err, LibraryError::EmptyResponse));
    }
}
