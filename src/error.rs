//! Error types for the MCP servers.
//!
//! Maps library errors from every adapter to MCP-friendly error responses.

use serde::{Deserialize, Serialize};

/// MCP server errors.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum McpError {
    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Unknown prompt requested.
    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),

    /// Unknown or malformed resource URI.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Argument name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Timezone name not present in the IANA database.
    #[error("invalid timezone: '{0}'")]
    InvalidTimezone(String),

    /// A git invocation failed.
    #[error("git error: {0}")]
    Git(String),

    /// SQLite error or a query rejected by a tool's guard.
    #[error("database error: {0}")]
    Database(String),

    /// HTTP transport or fetch failure.
    #[error("{0}")]
    Fetch(String),

    /// Sentry API failure.
    #[error("{0}")]
    Sentry(String),

    /// Synthetic data generation failure.
    #[error("{0}")]
    Generation(String),

    /// Failure while parsing or running a CLI command.
    #[error("{0}")]
    Command(String),

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        McpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Protocol(format!("JSON error: {}", err))
    }
}

impl From<rusqlite::Error> for McpError {
    fn from(err: rusqlite::Error) -> Self {
        McpError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for McpError {
    fn from(err: reqwest::Error) -> Self {
        McpError::Fetch(err.to_string())
    }
}

impl From<clap::Error> for McpError {
    fn from(err: clap::Error) -> Self {
        McpError::Command(err.render().to_string().trim_end().to_string())
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl McpError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            McpError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            McpError::UnknownPrompt(_) | McpError::UnknownResource(_) => {
                rpc_codes::INVALID_PARAMS
            }
            McpError::MissingArg(_)
            | McpError::InvalidArg { .. }
            | McpError::InvalidTimezone(_) => rpc_codes::INVALID_PARAMS,
            McpError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }

    /// Whether this error came from the wrapped capability rather than from the request.
    ///
    /// Tool failures are reported inside a successful `tools/call` result with
    /// `isError: true` so the model can read them; everything else becomes a
    /// JSON-RPC error object.
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            McpError::Git(_)
                | McpError::Database(_)
                | McpError::Fetch(_)
                | McpError::Sentry(_)
                | McpError::Generation(_)
                | McpError::Command(_)
                | McpError::Io(_)
        )
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
