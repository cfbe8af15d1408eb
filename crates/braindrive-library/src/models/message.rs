// Capture conversation message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Ai,
    System,
}

impl std::fmt::Display for MessageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageSender::User => write!(f, "user"),
            MessageSender::Ai => write!(f, "ai"),
            MessageSender::System => write!(f, "system"),
        }
    }
}

/// A single entry in the capture conversation log.
///
/// The log is append-only; insertion order is display order. An AI message
/// is mutable only while `is_streaming` is set, and only by appending
/// chunks to its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Message author
    pub sender: MessageSender,
    /// Message text content
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Still receiving streamed chunks
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
    /// Converted into an error display
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: false,
            is_error: false,
        }
    }

    /// Create an empty streaming assistant placeholder
    pub fn streaming_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender::Ai,
            content: String::new(),
            timestamp: Utc::now(),
            is_streaming: true,
            is_error: false,
        }
    }

    /// Create a completed assistant message
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender::Ai,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: false,
            is_error: false,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender::System,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming: false,
            is_error: false,
        }
    }
}

/// Transient save-status toast shown after a defaults save attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = Message::user("hello");
        assert_eq!(msg.sender, MessageSender::User);
        assert_eq!(msg.content, "hello");
        assert!(!msg.is_streaming);
    }

    #[test]
    fn test_streaming_placeholder() {
        let msg = Message::streaming_placeholder();
        assert_eq!(msg.sender, MessageSender::Ai);
        assert!(msg.content.is_empty());
        assert!(msg.is_streaming);
    }

    #[test]
    fn test_sender_wire_format() {
        let json = serde_json::to_string(&MessageSender::Ai).unwrap();
        assert_eq!(json, "\"ai\"");
    }
}
