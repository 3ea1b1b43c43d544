// blinkzero-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod chat;
pub mod client;
pub mod config;
pub mod context;
pub mod editor;
pub mod errors;
pub mod inline;
pub mod panel;
pub mod tasks;
pub mod tools;

pub mod models {
    pub mod chat;
    pub mod tools;
}


pub use chat::{ChatOrchestrator, TurnReport, TurnState};
pub use client::LlmClient;
pub use config::{Settings, SettingsSource};
pub use context::{collect_context, PromptContext};
pub use editor::{EditorState, Position, Selection, TextDocument};
pub use errors::LlmError;
pub use inline::{InlineCompletionAdapter, InlineSuggestion};
pub use models::chat::{ApiResponse, ChatMessage, ChatRequest, Choice, Role};
pub use models::tools::{ToolCall, ToolDefinition, ToolDescriptor, ToolFunction};
pub use panel::{ChatPanel, PanelEvent, PanelManager, PanelMessage};
pub use tasks::{Command, ScratchDocument, TaskHost};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
