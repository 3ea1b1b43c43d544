// blinkzero-core/src/tools.rs

//! Bridge to the external tool server: catalog lookup, allow-list filtering,
//! schema conversion and tool execution.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::config::Settings;
use crate::models::tools::{
    ToolCatalog, ToolDefinition, ToolDescriptor, ToolExecuteRequest, ToolParametersDefinition,
};

/// Friendlier descriptions for well-known tool names.
const TOOL_DESCRIPTIONS: &[(&str, &str)] = &[
    ("mcp1_fs_read_text", "Read the contents of a text file from the filesystem"),
    ("mcp1_fs_search", "Search for files by name pattern in the filesystem"),
    ("mcp1_proc_run", "Execute a command in the system shell"),
    ("mcp1_advanced_grep", "Search for text patterns in files with advanced options"),
    ("mcp1_file_ops", "Perform file operations like copy, move, delete, rename"),
    ("mcp1_fs_list", "List files and directories in a given path"),
    ("mcp1_fs_write_text", "Write text content to a file"),
    ("mcp1_grep", "Search for text patterns in files"),
    ("mcp1_web_search", "Search the web using various search engines"),
    ("mcp1_web_scraper", "Extract content from web pages"),
];

pub fn friendly_description(name: &str) -> Option<&'static str> {
    TOOL_DESCRIPTIONS
        .iter()
        .find(|(tool, _)| *tool == name)
        .map(|(_, description)| *description)
}

/// Converts a catalog entry into the function-calling schema.
pub fn to_tool_definition(descriptor: &ToolDescriptor) -> ToolDefinition {
    let description = friendly_description(&descriptor.name)
        .map(String::from)
        .or_else(|| descriptor.description.clone().filter(|d| !d.trim().is_empty()))
        .unwrap_or_else(|| format!("MCP tool: {}", descriptor.name));

    let schema = descriptor.input_schema.clone().unwrap_or_default();
    ToolDefinition {
        name: descriptor.name.clone(),
        description,
        parameters: ToolParametersDefinition::permissive(
            schema.properties.unwrap_or_default(),
            schema.required.unwrap_or_default(),
        ),
    }
}

/// Keeps the descriptors named in `allowed`, preserving catalog order.
pub fn filter_allowed<'a>(
    catalog: &'a [ToolDescriptor],
    allowed: &[String],
) -> impl Iterator<Item = &'a ToolDescriptor> + 'a {
    let allowed = allowed.to_vec();
    catalog.iter().filter(move |tool| allowed.contains(&tool.name))
}

/// HTTP client for one tool server.
#[derive(Clone, Debug)]
pub struct ToolServerClient {
    http: Client,
    base_url: String,
}

impl ToolServerClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET <server>/tools/list`
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let url = format!("{}/tools/list", self.base_url);
        debug!(%url, "Fetching tool catalog.");
        let response = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach tool server at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Failed to fetch tools: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }

        let catalog: ToolCatalog = response
            .json()
            .await
            .context("Failed to parse tool catalog JSON")?;
        trace!(count = catalog.tools.len(), "Tool catalog received.");
        Ok(catalog.tools)
    }

    /// `POST <server>/tools/execute` with `{name, arguments}`.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value> {
        let url = format!("{}/tools/execute", self.base_url);
        let body = ToolExecuteRequest {
            name: name.to_string(),
            arguments,
        };
        debug!(tool_name = %name, %url, "Executing tool.");
        trace!(arguments = %body.arguments, "Tool arguments for '{}'", name);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach tool server at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Tool execution failed: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Tool '{}' returned a non-JSON result", name))
    }
}

/// Tools to attach to one chat turn, and the server that will execute them.
#[derive(Debug, Default)]
pub struct ToolAttachment {
    pub definitions: Vec<ToolDefinition>,
    pub server: Option<ToolServerClient>,
}

impl ToolAttachment {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Decides which tools to offer. Any catalog failure falls back to no tools.
pub async fn attach_tools(settings: &Settings, http: &Client) -> ToolAttachment {
    let Some(server_url) = settings.tool_server() else {
        debug!("No tool server or empty allow-list; chatting without tools.");
        return ToolAttachment::none();
    };

    let server = ToolServerClient::new(http.clone(), server_url);
    match server.list_tools().await {
        Ok(catalog) => {
            let definitions: Vec<ToolDefinition> = filter_allowed(&catalog, &settings.mcp.allowed_tools)
                .map(to_tool_definition)
                .collect();
            info!(
                available = catalog.len(),
                attached = definitions.len(),
                "Attached {} tool definition(s).",
                definitions.len()
            );
            ToolAttachment {
                definitions,
                server: Some(server),
            }
        }
        Err(e) => {
            warn!(error = ?e, url = %server_url, "Tool catalog unavailable; continuing without tools.");
            ToolAttachment::none()
        }
    }
}

/// Reachability of the configured tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolServerStatus {
    pub connected: bool,
    pub url: Option<String>,
    pub available_tools: Vec<String>,
    pub error: Option<String>,
}

pub async fn server_status(settings: &Settings, http: &Client) -> ToolServerStatus {
    let Some(url) = settings.mcp.server_url.clone().filter(|u| !u.trim().is_empty()) else {
        return ToolServerStatus {
            connected: false,
            url: None,
            available_tools: Vec::new(),
            error: Some("No MCP server URL configured".to_string()),
        };
    };

    match ToolServerClient::new(http.clone(), url.clone()).list_tools().await {
        Ok(tools) => ToolServerStatus {
            connected: true,
            url: Some(url),
            available_tools: tools.into_iter().map(|t| t.name).collect(),
            error: None,
        },
        Err(e) => {
            error!(error = ?e, "Tool server status check failed.");
            ToolServerStatus {
                connected: false,
                url: Some(url),
                available_tools: Vec::new(),
                error: Some(format!("{:#}", e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::McpSettings;
    use httpmock::prelude::*;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: None,
            input_schema: None,
        }
    }

    fn settings_with_server(url: &str, allowed: &[&str]) -> Settings {
        Settings {
            mcp: McpSettings {
                server_url: Some(url.to_string()),
                allowed_tools: allowed.iter().map(|s| s.to_string()).collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_description_fallback_order() {
        let known = to_tool_definition(&ToolDescriptor {
            description: Some("server text".into()),
            ..descriptor("mcp1_grep")
        });
        assert_eq!(known.description, "Search for text patterns in files");

        let described = to_tool_definition(&ToolDescriptor {
            description: Some("server text".into()),
            ..descriptor("custom")
        });
        assert_eq!(described.description, "server text");

        let bare = to_tool_definition(&descriptor("custom"));
        assert_eq!(bare.description, "MCP tool: custom");
    }

    #[test]
    fn test_schema_is_permissive_and_keeps_required() {
        let def = to_tool_definition(&ToolDescriptor {
            input_schema: Some(crate::models::tools::ToolInputSchema {
                properties: Some(
                    json!({"path": {"type": "string"}}).as_object().cloned().unwrap(),
                ),
                required: Some(vec!["path".into()]),
            }),
            ..descriptor("mcp1_fs_read_text")
        });
        assert!(def.parameters.additional_properties);
        assert_eq!(def.parameters.param_type, "object");
        assert_eq!(def.parameters.required, vec!["path".to_string()]);
        assert_eq!(def.parameters.properties["path"], json!({"type": "string"}));
    }

    #[test]
    fn test_filter_is_set_intersection_regardless_of_order() {
        let catalog = vec![descriptor("c"), descriptor("a"), descriptor("x"), descriptor("b")];
        let allowed = vec!["b".to_string(), "a".to_string(), "missing".to_string()];
        let mut names: Vec<&str> = filter_allowed(&catalog, &allowed).map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        let reversed: Vec<ToolDescriptor> = catalog.iter().rev().cloned().collect();
        let mut names_rev: Vec<&str> = filter_allowed(&reversed, &allowed).map(|t| t.name.as_str()).collect();
        names_rev.sort();
        assert_eq!(names, names_rev);
    }

    #[tokio::test]
    async fn test_attach_tools_without_configuration_makes_no_request() {
        let attachment = attach_tools(&Settings::default(), &Client::new()).await;
        assert!(attachment.is_empty());
        assert!(attachment.server.is_none());
    }

    #[tokio::test]
    async fn test_attach_tools_filters_catalog() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/tools/list");
                then.status(200).json_body(json!({
                    "tools": [
                        {"name": "mcp1_grep", "inputSchema": {"properties": {"pattern": {"type": "string"}}, "required": ["pattern"]}},
                        {"name": "mcp1_proc_run", "description": "dangerous"},
                        {"name": "custom_tool", "description": "Does custom things"}
                    ]
                }));
            })
            .await;

        let settings = settings_with_server(&server.base_url(), &["custom_tool", "mcp1_grep"]);
        let attachment = attach_tools(&settings, &Client::new()).await;
        mock.assert_async().await;
        let names: Vec<&str> = attachment.definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["mcp1_grep", "custom_tool"]);
        assert!(attachment.server.is_some());
    }

    #[tokio::test]
    async fn test_attach_tools_swallows_catalog_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tools/list");
                then.status(500);
            })
            .await;
        let settings = settings_with_server(&server.base_url(), &["mcp1_grep"]);
        let attachment = attach_tools(&settings, &Client::new()).await;
        assert!(attachment.is_empty());
        assert!(attachment.server.is_none());
    }

    #[tokio::test]
    async fn test_execute_posts_name_and_arguments() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/tools/execute")
                    .json_body(json!({"name": "mcp1_grep", "arguments": {"pattern": "fn main"}}));
                then.status(200).json_body(json!({"matches": 3}));
            })
            .await;
        let client = ToolServerClient::new(Client::new(), server.base_url());
        let result = client.execute("mcp1_grep", json!({"pattern": "fn main"})).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result, json!({"matches": 3}));
    }

    #[tokio::test]
    async fn test_execute_non_success_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/tools/execute");
                then.status(404);
            })
            .await;
        let client = ToolServerClient::new(Client::new(), server.base_url());
        let err = client.execute("nope", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool execution failed: Not Found");
    }

    #[tokio::test]
    async fn test_server_status_reports_tools() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tools/list");
                then.status(200).json_body(json!({"tools": [{"name": "a"}, {"name": "b"}]}));
            })
            .await;
        let settings = settings_with_server(&server.base_url(), &[]);
        let status = server_status(&settings, &Client::new()).await;
        assert!(status.connected);
        assert_eq!(status.available_tools, vec!["a", "b"]);

        let unconfigured = server_status(&Settings::default(), &Client::new()).await;
        assert!(!unconfigured.connected);
        assert_eq!(unconfigured.error.as_deref(), Some("No MCP server URL configured"));
    }
}
