//! # mcp-servers
//!
//! MCP (Model Context Protocol) servers that put existing tools and libraries in
//! front of AI agents.
//!
//! Each server wraps one capability (git, SQLite, HTTP fetch, Sentry, timezones,
//! synthetic data, or any clap command tree) as an [`Adapter`] and speaks the MCP
//! protocol over stdin/stdout using line-delimited JSON-RPC 2.0.
//!
//! ## Servers
//!
//! | Binary               | Adapter                        |
//! |----------------------|--------------------------------|
//! | `mcp-server-git`     | [`GitAdapter`]                 |
//! | `mcp-server-sqlite`  | [`SqliteAdapter`]              |
//! | `mcp-server-fetch`   | [`FetchAdapter`]               |
//! | `mcp-server-time`    | [`TimeAdapter`]                |
//! | `mcp-server-sentry`  | [`SentryAdapter`]              |
//! | `mcp-server-datagen` | [`DatagenAdapter`]             |
//! | `mcp-server-cli`     | [`CliAdapter`]                 |
//!
//! ## Usage
//!
//! The servers are typically run as executables and configured in AI tools like Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "git": {
//!       "command": "/path/to/mcp-server-git",
//!       "args": ["--repository", "/path/to/repo"]
//!     },
//!     "sqlite": {
//!       "command": "/path/to/mcp-server-sqlite",
//!       "args": ["--db-path", "~/analysis.db"]
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, wrap an adapter in [`McpServer`]:
//!
//! ```no_run
//! use mcp_servers::{McpServer, TimeAdapter};
//!
//! # async fn run() -> mcp_servers::Result<()> {
//! let adapter = TimeAdapter::new(Some("Europe/Warsaw"))?;
//! let mut server = McpServer::new(adapter);
//!
//! // Reads from stdin, writes to stdout
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod adapters;
pub mod args;
pub mod error;
pub mod logging;
pub mod server;

pub use adapters::cli::CliAdapter;
pub use adapters::datagen::DatagenAdapter;
pub use adapters::fetch::FetchAdapter;
pub use adapters::git::GitAdapter;
pub use adapters::sentry::SentryAdapter;
pub use adapters::sqlite::SqliteAdapter;
pub use adapters::time::TimeAdapter;
pub use adapters::{Adapter, PromptDef, PromptResult, ResourceDef, ToolDef};
pub use error::{McpError, Result};
pub use server::{JsonRpcRequest, JsonRpcResponse, McpServer};
