// blinkzero-core/src/models/tools.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

// --- Structs for model tool calls ---

/// Represents a tool call requested by the model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Some local servers omit the id; the client fills one in.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: ToolFunction,
}

fn default_call_type() -> String {
    "function".to_string()
}

/// Represents the function call details within a ToolCall.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolFunction {
    pub name: String,
    /// Arguments are sent by the model as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

impl ToolFunction {
    /// Parses the argument string into a JSON object. An empty string means `{}`.
    pub fn parsed_arguments(&self) -> Result<JsonValue, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(JsonValue::Object(Map::new()));
        }
        serde_json::from_str(&self.arguments)
    }
}

// --- Definitions presented to the model ---

/// Defines the schema for a tool that can be presented to the model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParametersDefinition,
}

/// Parameter declaration for a tool. Always an object schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolParametersDefinition {
    #[serde(rename = "type")]
    pub param_type: String,
    /// Property name to JSON schema, passed through from the tool server.
    pub properties: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

impl ToolParametersDefinition {
    /// An object schema that also accepts properties it does not declare.
    pub fn permissive(properties: Map<String, JsonValue>, required: Vec<String>) -> Self {
        Self {
            param_type: "object".to_string(),
            properties,
            required,
            additional_properties: true,
        }
    }
}

// --- Tool server catalog ---

/// One entry of the tool server's `GET /tools/list` catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<ToolInputSchema>,
}

/// The subset of a descriptor's JSON schema that is forwarded to the model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ToolInputSchema {
    #[serde(default)]
    pub properties: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub required: Option<Vec<String>>,
}

/// Response body of `GET /tools/list`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ToolCatalog {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// Request body of `POST /tools/execute`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolExecuteRequest {
    pub name: String,
    pub arguments: JsonValue,
}
