// blinkzero-core/src/models/chat.rs
use super::tools::{ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};

/// The author of a [`ChatMessage`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

/// Represents a message in the chat exchange sent to/from the model.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    // Assistant messages that carry tool calls come back with `"content": null`.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// A `tool` message answering the call with the given id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Default::default()
        }
    }

    /// True when this message asks for at least one tool invocation.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Body of a `POST <base_url>/chat/completions` request.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop<S: Into<String>>(mut self, stop: impl IntoIterator<Item = S>) -> Self {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    /// Attaches tools with `tool_choice = "auto"`. An empty slice attaches nothing.
    pub fn tools(mut self, definitions: &[ToolDefinition]) -> Self {
        if definitions.is_empty() {
            self.tools = None;
            self.tool_choice = None;
        } else {
            self.tools = Some(definitions.iter().cloned().map(ToolSpec::function).collect());
            self.tool_choice = Some("auto".to_string());
        }
        self
    }
}

/// Wire wrapper: `{ "type": "function", "function": <definition> }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub spec_type: String,
    pub function: ToolDefinition,
}

impl ToolSpec {
    pub fn function(definition: ToolDefinition) -> Self {
        Self {
            spec_type: "function".to_string(),
            function: definition,
        }
    }
}

/// Represents one of the choices returned by the completion API.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Represents the overall structure of the completion API response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiResponse {
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ApiResponse {
    /// The first choice's message, if the server returned any.
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|choice| &choice.message)
    }

    /// The first choice's text content, if present.
    pub fn first_content(&self) -> Option<&str> {
        self.first_message().and_then(|m| m.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tools::ToolParametersDefinition;
    use serde_json::json;

    #[test]
    fn test_roles_serialize_lowercase() {
        let msg = ChatMessage::tool_result("call_1", "{}");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]).temperature(0.3);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "m");
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert!(value.get("stop").is_none());
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn test_request_with_tools_sets_auto_choice() {
        let def = ToolDefinition {
            name: "fs_list".into(),
            description: "List".into(),
            parameters: ToolParametersDefinition::permissive(Default::default(), vec![]),
        };
        let request = ChatRequest::new("m", vec![]).tools(&[def]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "fs_list");
    }

    #[test]
    fn test_assistant_message_with_null_content_parses() {
        let raw = json!({
            "id": "x",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": { "name": "grep", "arguments": "{}" }
                    }]
                }
            }]
        });
        let response: ApiResponse = serde_json::from_value(raw).unwrap();
        let message = response.first_message().unwrap();
        assert!(message.has_tool_calls());
        assert_eq!(message.content, None);
        assert_eq!(response.choices[0].finish_reason, None);
    }
}
