// blinkzero-core/src/inline.rs

//! Ghost-text completion at the cursor.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::LlmClient;
use crate::config::Settings;
use crate::editor::{Position, TextDocument};
use crate::models::chat::{ChatMessage, ChatRequest};

pub const LINES_BEFORE: usize = 60;
pub const LINES_AFTER: usize = 10;
pub const INLINE_TEMPERATURE: f64 = 0.2;
pub const INLINE_MAX_TOKENS: u32 = 200;
pub const INLINE_STOP: [&str; 2] = ["\n\n", "```"];

/// Text to insert at `position`, replacing nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSuggestion {
    pub text: String,
    pub position: Position,
}

/// Text before the cursor (from up to [`LINES_BEFORE`] lines back) and after
/// it (to the end of the line [`LINES_AFTER`] lines down, clamped).
pub fn completion_window(document: &TextDocument, position: Position) -> (String, String) {
    let position = document.clamp(position);
    let start = Position::new(position.line.saturating_sub(LINES_BEFORE), 0);
    let end_line = (position.line + LINES_AFTER).min(document.line_count().saturating_sub(1));
    let end = Position::new(end_line, document.line_text(end_line).chars().count());
    (
        document.text_range(start, position).to_string(),
        document.text_range(position, end).to_string(),
    )
}

fn system_prompt(language_id: &str) -> String {
    format!(
        "You are a code completion assistant. Complete the code at the cursor position.
Rules:
- Return ONLY the code that should be inserted at the cursor
- Do not repeat existing code
- Keep completions concise and contextually appropriate
- Match the existing code style and indentation
- For {} files, follow language conventions",
        language_id
    )
}

fn user_prompt(document: &TextDocument, prefix: &str, suffix: &str) -> String {
    let lang = &document.language_id;
    format!(
        "File: {path}
Language: {lang}

Code before cursor:
```{lang}
{prefix}
```

Code after cursor:
```{lang}
{suffix}
```

Complete the code at the cursor position (between before and after).",
        path = document.path.display(),
        lang = lang,
        prefix = prefix,
        suffix = suffix,
    )
}

/// Answers inline completion requests from the editor.
#[derive(Debug, Clone)]
pub struct InlineCompletionAdapter {
    settings: Settings,
}

impl InlineCompletionAdapter {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns `None` when cancelled, on any failure, or when the model
    /// has nothing to add.
    pub async fn suggest(
        &self,
        document: &TextDocument,
        position: Position,
        cancel: &CancellationToken,
    ) -> Option<InlineSuggestion> {
        if cancel.is_cancelled() {
            debug!("Inline completion cancelled before start.");
            return None;
        }

        let position = document.clamp(position);
        let (prefix, suffix) = completion_window(document, position);
        let client = match LlmClient::new(&self.settings) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = ?e, "Inline completion client unavailable.");
                return None;
            }
        };
        let request = ChatRequest::new(
            client.model(),
            vec![
                ChatMessage::system(system_prompt(&document.language_id)),
                ChatMessage::user(user_prompt(document, &prefix, &suffix)),
            ],
        )
        .temperature(INLINE_TEMPERATURE)
        .max_tokens(INLINE_MAX_TOKENS)
        .stop(INLINE_STOP);

        let response = match client.chat_completion(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Inline completion error.");
                return None;
            }
        };

        let text = response.first_content().unwrap_or("").trim();
        if text.is_empty() {
            return None;
        }
        Some(InlineSuggestion {
            text: text.to_string(),
            position,
        })
    }
}
