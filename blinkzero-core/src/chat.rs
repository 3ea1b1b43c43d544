// blinkzero-core/src/chat.rs

//! One chat turn: assemble context, attach tools, complete, run any requested
//! tools in order, complete once more.

use anyhow::{Context, Result};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, trace, warn};

use crate::client::LlmClient;
use crate::config::Settings;
use crate::context::collect_context;
use crate::editor::EditorState;
use crate::errors::LlmError;
use crate::models::chat::{ChatMessage, ChatRequest};
use crate::models::tools::ToolCall;
use crate::tools::{attach_tools, ToolServerClient};

pub const CHAT_TEMPERATURE: f64 = 0.3;
pub const CHAT_MAX_TOKENS: u32 = 2000;

pub const NO_RESPONSE: &str = "No response received from the model.";
pub const NO_RESPONSE_AFTER_TOOLS: &str = "No response after tool execution.";
pub const CONNECTION_FAILED: &str = "Error: Cannot connect to the local LLM server. Please ensure it is running and accessible at the configured URL.";

/// Progress of a single chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingFirstCompletion,
    AwaitingToolResults,
    AwaitingFinalCompletion,
    Done,
}

impl TurnState {
    /// Legal forward transitions. A turn never revisits an earlier state.
    pub fn can_advance_to(self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (Idle, AwaitingFirstCompletion)
                | (AwaitingFirstCompletion, Done)
                | (AwaitingFirstCompletion, AwaitingToolResults)
                | (AwaitingToolResults, AwaitingFinalCompletion)
                | (AwaitingFinalCompletion, Done)
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether a tool call produced a result or an error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolExecutionStatus {
    Success,
    Failure,
}

/// The outcome of one tool call within a turn.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub tool_name: String,
    /// The JSON placed in the `tool` message (result or `{ "error": ... }`).
    pub output: JsonValue,
    pub status: ToolExecutionStatus,
}

/// Everything a turn produced. `reply` is what the user sees.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub reply: String,
    pub state: TurnState,
    pub tool_results: Vec<ToolExecutionResult>,
    pub messages: Vec<ChatMessage>,
}

struct Turn {
    state: TurnState,
    messages: Vec<ChatMessage>,
    tool_results: Vec<ToolExecutionResult>,
}

impl Turn {
    fn advance(&mut self, next: TurnState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal turn transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Chat turn state change.");
        self.state = next;
    }

    fn finish(mut self, reply: String) -> TurnReport {
        self.advance(TurnState::Done);
        TurnReport {
            reply,
            state: self.state,
            tool_results: self.tool_results,
            messages: self.messages,
        }
    }
}

/// Runs chat turns against the configured server.
#[derive(Debug, Clone)]
pub struct ChatOrchestrator {
    settings: Settings,
}

impl ChatOrchestrator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns the final assistant text, or a user-facing error string. Never fails.
    pub async fn run_turn(
        &self,
        raw_prompt: &str,
        editor: Option<&EditorState>,
        workspace_root: Option<&Path>,
    ) -> String {
        match self.run_turn_report(raw_prompt, editor, workspace_root).await {
            Ok(report) => report.reply,
            Err(e) => user_facing_error(&e),
        }
    }

    /// Like [`run_turn`](Self::run_turn) but keeps the exchange and tool results.
    pub async fn run_turn_report(
        &self,
        raw_prompt: &str,
        editor: Option<&EditorState>,
        workspace_root: Option<&Path>,
    ) -> Result<TurnReport> {
        let client = LlmClient::new(&self.settings).context("Failed to build HTTP client")?;
        let context = collect_context(raw_prompt, editor, workspace_root);
        let tools = attach_tools(&self.settings, client.http()).await;

        let mut turn = Turn {
            state: TurnState::Idle,
            messages: vec![ChatMessage::system(context.system), ChatMessage::user(context.user)],
            tool_results: Vec::new(),
        };

        turn.advance(TurnState::AwaitingFirstCompletion);
        let request = ChatRequest::new(client.model(), turn.messages.clone())
            .temperature(CHAT_TEMPERATURE)
            .max_tokens(CHAT_MAX_TOKENS)
            .tools(&tools.definitions);
        let response = client.chat_completion(&request).await?;

        let Some(message) = response.first_message().cloned() else {
            warn!("API response contained no choices.");
            return Ok(turn.finish(NO_RESPONSE.to_string()));
        };

        if !message.has_tool_calls() {
            info!("Received final response (no tool calls requested).");
            let reply = message.content.unwrap_or_else(|| NO_RESPONSE.to_string());
            return Ok(turn.finish(reply));
        }

        turn.advance(TurnState::AwaitingToolResults);
        let tool_calls = message.tool_calls.clone().unwrap_or_default();
        info!(count = tool_calls.len(), "Model requested {} tool call(s).", tool_calls.len());
        turn.messages.push(message);

        if tools.server.is_none() {
            warn!("Tool calls requested but no tool server is attached.");
        }
        for tool_call in &tool_calls {
            let result = execute_tool_call(tools.server.as_ref(), tool_call).await;
            let content = serde_json::to_string(&result.output)
                .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
            turn.messages.push(ChatMessage::tool_result(tool_call.id.clone(), content));
            turn.tool_results.push(result);
        }
        debug!(count = turn.tool_results.len(), "Added tool output(s) to messages.");

        turn.advance(TurnState::AwaitingFinalCompletion);
        let final_request = ChatRequest::new(client.model(), turn.messages.clone())
            .temperature(CHAT_TEMPERATURE)
            .max_tokens(CHAT_MAX_TOKENS);
        let final_response = client.chat_completion(&final_request).await?;
        let reply = final_response
            .first_content()
            .map(String::from)
            .unwrap_or_else(|| NO_RESPONSE_AFTER_TOOLS.to_string());
        Ok(turn.finish(reply))
    }
}

/// Runs one tool call. Failures become an `{ "error": ... }` payload.
async fn execute_tool_call(
    server: Option<&ToolServerClient>,
    tool_call: &ToolCall,
) -> ToolExecutionResult {
    let tool_name = tool_call.function.name.clone();
    debug!(tool_call_id = %tool_call.id, tool_name = %tool_name, "Processing request for tool '{}'.", tool_name);
    trace!(arguments = %tool_call.function.arguments, "Raw tool arguments for '{}'", tool_name);

    let outcome = match (server, tool_call.function.parsed_arguments()) {
        (None, _) => Err("no tool server is configured".to_string()),
        (Some(_), Err(e)) => Err(format!("invalid arguments: {}", e)),
        (Some(server), Ok(arguments)) => server
            .execute(&tool_name, arguments)
            .await
            .map_err(|e| format!("{:#}", e)),
    };

    let (output, status) = match outcome {
        Ok(value) => {
            info!(tool_call_id = %tool_call.id, tool_name = %tool_name, "Tool '{}' executed successfully.", tool_name);
            (value, ToolExecutionStatus::Success)
        }
        Err(reason) => {
            error!(tool_call_id = %tool_call.id, tool_name = %tool_name, error = %reason, "Execution failed for tool '{}'.", tool_name);
            (
                json!({ "error": format!("Failed to execute tool: {}", reason) }),
                ToolExecutionStatus::Failure,
            )
        }
    };

    ToolExecutionResult {
        tool_call_id: tool_call.id.clone(),
        tool_name,
        output,
        status,
    }
}

/// Maps any turn failure onto the two user-facing error forms.
pub fn user_facing_error(err: &anyhow::Error) -> String {
    error!(error = ?err, "Chat turn failed.");
    match err.chain().find_map(|cause| cause.downcast_ref::<LlmError>()) {
        Some(llm) if llm.is_connection() => CONNECTION_FAILED.to_string(),
        Some(llm) => format!("Error: {}", llm),
        None => format!("Error: {:#}", err),
    }
}
