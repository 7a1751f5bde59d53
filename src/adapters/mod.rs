//! Adapter contract and shared MCP definitions.
//!
//! Every server in this crate is an [`Adapter`]: a set of tools (plus optional
//! prompts and resources) in front of one wrapped capability. The protocol loop
//! in [`crate::server`] only ever talks to this trait.

pub mod cli;
pub mod datagen;
pub mod fetch;
pub mod git;
pub mod sentry;
pub mod sqlite;
pub mod time;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{McpError, Result};

/// A tool definition for the MCP tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (e.g., "git_status")
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

impl ToolDef {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, input_schema: JsonValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// A prompt argument descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether the client must supply it
    pub required: bool,
}

/// A prompt definition for the MCP prompts/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDef {
    /// Prompt name (e.g., "mcp-demo")
    pub name: String,
    /// Prompt description
    pub description: String,
    /// Accepted arguments
    pub arguments: Vec<PromptArgument>,
}

impl PromptDef {
    /// Create a prompt taking a single argument.
    pub fn with_argument(
        name: &str,
        description: &str,
        arg_name: &str,
        arg_description: &str,
        required: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            arguments: vec![PromptArgument {
                name: arg_name.to_string(),
                description: arg_description.to_string(),
                required,
            }],
        }
    }
}

/// One message of a rendered prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker role ("user" or "assistant")
    pub role: String,
    /// Message content
    pub content: Content,
}

/// The result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResult {
    /// Description of the rendered prompt
    pub description: String,
    /// Messages to seed the conversation with
    pub messages: Vec<PromptMessage>,
}

impl PromptResult {
    /// A prompt consisting of a single user message.
    pub fn user_text(description: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: Content::text(text),
            }],
        }
    }
}

/// A resource definition for the MCP resources/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Resource URI
    pub uri: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// MIME type of the contents
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl ResourceDef {
    /// Create a new resource definition.
    pub fn new(uri: &str, name: &str, description: &str, mime_type: &str) -> Self {
        Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: mime_type.to_string(),
        }
    }
}

/// Content block carried by tool results and prompt messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text.
    #[serde(rename = "text")]
    Text {
        /// The text
        text: String,
    },
}

impl Content {
    /// Build a text content block.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }
}

/// A capability exposed over MCP.
#[async_trait]
pub trait Adapter: Send {
    /// Name reported in `serverInfo`.
    fn server_name(&self) -> &str;

    /// Tool definitions for tools/list.
    fn tools(&self) -> Vec<ToolDef>;

    /// Execute a tool and return its text output.
    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String>;

    /// Prompt definitions for prompts/list.
    fn prompts(&self) -> Vec<PromptDef> {
        Vec::new()
    }

    /// Render a prompt.
    async fn get_prompt(
        &mut self,
        name: &str,
        _args: Map<String, JsonValue>,
    ) -> Result<PromptResult> {
        Err(McpError::UnknownPrompt(name.to_string()))
    }

    /// Resource definitions for resources/list.
    fn resources(&self) -> Vec<ResourceDef> {
        Vec::new()
    }

    /// Read a resource by URI.
    async fn read_resource(&mut self, uri: &str) -> Result<String> {
        Err(McpError::UnknownResource(uri.to_string()))
    }

    /// URIs of resources changed since the last call, for `notifications/resources/updated`.
    fn drain_resource_updates(&mut self) -> Vec<String> {
        Vec::new()
    }
}

/// Helper macro for creating JSON Schema for tool input parameters.
///
/// Each property may carry a description: `"url": string => "URL to fetch"`.
#[macro_export]
macro_rules! schema {
    // Object with required and optional properties
    (object {
        required: { $($req_name:literal : $req_type:tt $(=> $req_desc:expr)?),* $(,)? },
        optional: { $($opt_name:literal : $opt_type:tt $(=> $opt_desc:expr)?),* $(,)? }
    }) => {{
        #[allow(unused_mut)]
        let mut required: Vec<&str> = Vec::new();
        $(required.push($req_name);)*

        #[allow(unused_mut)]
        let mut props = serde_json::Map::new();
        $(props.insert($req_name.to_string(), $crate::schema!(@prop $req_type $(, $req_desc)?));)*
        $(props.insert($opt_name.to_string(), $crate::schema!(@prop $opt_type $(, $opt_desc)?));)*

        serde_json::json!({
            "type": "object",
            "properties": props,
            "required": required
        })
    }};

    // Object with only required properties
    (object {
        required: { $($req_name:literal : $req_type:tt $(=> $req_desc:expr)?),* $(,)? }
    }) => {
        $crate::schema!(object {
            required: { $($req_name : $req_type $(=> $req_desc)?),* },
            optional: {}
        })
    };

    // Object with only optional properties
    (object {
        optional: { $($opt_name:literal : $opt_type:tt $(=> $opt_desc:expr)?),* $(,)? }
    }) => {
        $crate::schema!(object {
            required: {},
            optional: { $($opt_name : $opt_type $(=> $opt_desc)?),* }
        })
    };

    // Empty object (no parameters)
    (object {}) => {{
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }};

    (@prop $ty:tt) => { $crate::schema!(@type $ty) };
    (@prop $ty:tt, $desc:expr) => {{
        let mut prop = $crate::schema!(@type $ty);
        prop["description"] = serde_json::Value::from($desc);
        prop
    }};

    // Type mappings
    (@type string) => { serde_json::json!({"type": "string"}) };
    (@type number) => { serde_json::json!({"type": "number"}) };
    (@type integer) => { serde_json::json!({"type": "integer"}) };
    (@type boolean) => { serde_json::json!({"type": "boolean"}) };
    (@type any) => { serde_json::json!({}) };
    (@type array_string) => { serde_json::json!({"type": "array", "items": {"type": "string"}}) };
    (@type object) => { serde_json::json!({"type": "object"}) };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_schema_macro_required_and_described() {
        let schema = crate::schema!(object {
            required: { "repo_path": string },
            optional: { "max_count": integer => "Maximum number of commits" }
        });
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], serde_json::json!(["repo_path"]));
        assert_eq!(schema["properties"]["repo_path"]["type"], "string");
        assert_eq!(
            schema["properties"]["max_count"]["description"],
            "Maximum number of commits"
        );
    }

    #[test]
    fn test_schema_macro_empty() {
        let schema = crate::schema!(object {});
        assert_eq!(schema["properties"], serde_json::json!({}));
        assert_eq!(schema["required"], serde_json::json!([]));
    }
}
