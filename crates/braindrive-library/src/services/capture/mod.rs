// Capture panel services

pub mod catalog;
pub mod defaults;
pub mod orchestrator;
pub mod prompt;
pub mod transcript;

pub use orchestrator::{CaptureConfig, CaptureOrchestrator};
pub use prompt::{ChatBackend, PromptClient, PromptRequest, PromptStream, StreamItem};
