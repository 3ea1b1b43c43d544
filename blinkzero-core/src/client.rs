// blinkzero-core/src/client.rs

//! HTTP client for the OpenAI-compatible local LLM server.

use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::Settings;
use crate::errors::LlmError;
use crate::models::chat::{ApiResponse, ChatRequest};

/// Local servers ignore the key, but some reject requests without one.
const LOCAL_API_KEY: &str = "sk-local";

/// A chat-completion client bound to one snapshot of [`Settings`].
#[derive(Clone, Debug)]
pub struct LlmClient {
    http: Client,
    completions_url: String,
    models_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(settings: &Settings) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(LlmError::Request)?;
        Ok(Self::with_http_client(http, settings))
    }

    /// Reuses an existing reqwest client (shared connection pool).
    pub fn with_http_client(http: Client, settings: &Settings) -> Self {
        Self {
            http,
            completions_url: settings.chat_completions_url(),
            models_url: settings.models_url(),
            model: settings.model.clone(),
        }
    }

    /// The configured chat model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Sends one completion request. No retries: a failure is returned as-is.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ApiResponse, LlmError> {
        debug!(
            url = %self.completions_url,
            model = %request.model,
            num_messages = request.messages.len(),
            num_tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion request."
        );
        trace!(payload = %serde_json::to_string_pretty(request).unwrap_or_else(|e| format!("Serialization error: {}", e)), "Request JSON");

        let response = self
            .http
            .post(&self.completions_url)
            .header("Content-Type", "application/json")
            .bearer_auth(LOCAL_API_KEY)
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %body, "Completion request failed.");
            return Err(LlmError::Http { status, body });
        }

        let response_value: Value = response
            .json()
            .await
            .map_err(|e| LlmError::decode(format!("Failed to read API response body as JSON: {}", e)))?;
        trace!(response = %serde_json::to_string_pretty(&response_value).unwrap_or_default(), "Response JSON");

        parse_api_response(response_value)
    }

    /// Lists model ids. Used as a connectivity probe.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        debug!(url = %self.models_url, "Listing models.");
        let response = self
            .http
            .get(&self.models_url)
            .bearer_auth(LOCAL_API_KEY)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http { status, body });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| LlmError::decode(format!("Failed to read model list as JSON: {}", e)))?;
        let ids = value
            .get("data")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("id").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }
}

/// Deserializes a completion response, filling in ids that local servers leave out.
fn parse_api_response(response_value: Value) -> Result<ApiResponse, LlmError> {
    let mut response_json_obj = match response_value {
        Value::Object(map) => map,
        other => {
            return Err(LlmError::decode(format!(
                "API response was not a JSON object: {}",
                other
            )))
        }
    };

    if !response_json_obj.contains_key("id") {
        let new_id = format!("chatcmpl-{}", Uuid::new_v4());
        debug!(id = %new_id, "Added missing 'id' field to API response.");
        response_json_obj.insert("id".to_string(), json!(new_id));
    }

    let mut api_response: ApiResponse = serde_json::from_value(Value::Object(response_json_obj))
        .map_err(|e| LlmError::decode(format!("Failed to deserialize API response: {}", e)))?;

    for choice in &mut api_response.choices {
        if let Some(tool_calls) = choice.message.tool_calls.as_mut() {
            for call in tool_calls.iter_mut().filter(|c| c.id.is_empty()) {
                call.id = format!("call_{}", Uuid::new_v4().simple());
            }
        }
    }

    Ok(api_response)
}
