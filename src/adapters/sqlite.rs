//! SQLite tools, the insights memo resource and the demo prompt.
//!
//! Tools: read_query, write_query, create_table, list_tables, describe_table, append_insight

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Value as JsonValue};

use crate::adapters::{Adapter, PromptDef, PromptResult, ResourceDef, ToolDef};
use crate::args::{get_optional_string, get_string_arg};
use crate::error::{McpError, Result};
use crate::schema;

/// URI of the insights memo resource.
pub const MEMO_URI: &str = "memo://insights";

const DEMO_TEMPLATE: &str = include_str!("sqlite_demo.txt");

const WRITE_PREFIXES: &[&str] = &["INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER"];

/// A single result row, keyed by column name in column order.
pub type Row = Map<String, JsonValue>;

fn leading_keyword(query: &str) -> String {
    query.trim().to_uppercase()
}

fn value_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(t) => JsonValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => JsonValue::String(BASE64.encode(b)),
    }
}

/// Render the insights memo.
pub fn synthesize_memo(insights: &[String]) -> String {
    if insights.is_empty() {
        return "No business insights have been discovered yet.".to_string();
    }

    let lines: Vec<String> = insights.iter().map(|i| format!("- {}", i)).collect();
    let mut memo = String::from("📊 Business Intelligence Memo 📊\n\nKey Insights Discovered:\n\n");
    memo.push_str(&lines.join("\n"));

    if insights.len() > 1 {
        memo.push_str("\nSummary:\n");
        memo.push_str(&format!(
            "Analysis has revealed {} key business insights that suggest opportunities for strategic optimization and growth.",
            insights.len()
        ));
    }
    memo
}

/// SQLite server state: one connection plus the insights collected so far.
pub struct SqliteAdapter {
    conn: Connection,
    insights: Vec<String>,
    pending_updates: Vec<String>,
}

impl SqliteAdapter {
    /// Open (or create) the database, expanding `~` and creating parent directories.
    pub fn open(db_path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(db_path).to_string();
        if let Some(parent) = Path::new(&expanded).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!("Opening SQLite database at {}", expanded);
        Ok(Self::with_connection(Connection::open(&expanded)?))
    }

    /// Wrap an existing connection.
    pub fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            insights: Vec::new(),
            pending_updates: Vec::new(),
        }
    }

    /// Insights recorded so far.
    pub fn insights(&self) -> &[String] {
        &self.insights
    }

    /// Execute one statement.
    ///
    /// Write statements report `[{"affected_rows": n}]`; everything else returns its rows.
    pub fn execute(&self, query: &str) -> Result<Vec<Row>> {
        tracing::debug!("Executing query: {}", query);
        let keyword = leading_keyword(query);

        if WRITE_PREFIXES.iter().any(|p| keyword.starts_with(p)) {
            let affected = self.conn.execute(query, [])?;
            tracing::debug!("Write query affected {} rows", affected);
            let mut row = Row::new();
            row.insert("affected_rows".to_string(), JsonValue::from(affected));
            return Ok(vec![row]);
        }

        let mut stmt = self.conn.prepare(query)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut obj = Row::new();
            for (i, name) in names.iter().enumerate() {
                obj.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            results.push(obj);
        }
        tracing::debug!("Read query returned {} rows", results.len());
        Ok(results)
    }

    fn rows_text(&self, query: &str) -> Result<String> {
        Ok(serde_json::to_string(&self.execute(query)?)?)
    }
}

/// Get all sqlite tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "read_query",
            "Execute a SELECT query on the SQLite database",
            schema!(object { required: { "query": string => "SELECT SQL query to execute" } }),
        ),
        ToolDef::new(
            "write_query",
            "Execute an INSERT, UPDATE, or DELETE query on the SQLite database",
            schema!(object { required: { "query": string => "SQL query to execute" } }),
        ),
        ToolDef::new(
            "create_table",
            "Create a new table in the SQLite database",
            schema!(object { required: { "query": string => "CREATE TABLE SQL statement" } }),
        ),
        ToolDef::new(
            "list_tables",
            "List all tables in the SQLite database",
            schema!(object {}),
        ),
        ToolDef::new(
            "describe_table",
            "Get the schema information for a specific table",
            schema!(object {
                required: { "table_name": string => "Name of the table to describe" }
            }),
        ),
        ToolDef::new(
            "append_insight",
            "Add a business insight to the memo",
            schema!(object {
                required: { "insight": string => "Business insight discovered from data analysis" }
            }),
        ),
    ]
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn server_name(&self) -> &str {
        "sqlite"
    }

    fn tools(&self) -> Vec<ToolDef> {
        tools()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        match name {
            "list_tables" => self.rows_text("SELECT name FROM sqlite_master WHERE type='table'"),

            "describe_table" => {
                let table = get_string_arg(&args, "table_name")?;
                let quoted = table.replace('"', "\"\"");
                self.rows_text(&format!("PRAGMA table_info(\"{}\")", quoted))
            }

            "append_insight" => {
                let insight = get_string_arg(&args, "insight")?;
                self.insights.push(insight);
                self.pending_updates.push(MEMO_URI.to_string());
                Ok("Insight added to memo".to_string())
            }

            "read_query" => {
                let query = get_string_arg(&args, "query")?;
                if !leading_keyword(&query).starts_with("SELECT") {
                    return Err(McpError::Database(
                        "Only SELECT queries are allowed for read_query".to_string(),
                    ));
                }
                self.rows_text(&query)
            }

            "write_query" => {
                let query = get_string_arg(&args, "query")?;
                if leading_keyword(&query).starts_with("SELECT") {
                    return Err(McpError::Database(
                        "SELECT queries are not allowed for write_query".to_string(),
                    ));
                }
                self.rows_text(&query)
            }

            "create_table" => {
                let query = get_string_arg(&args, "query")?;
                if !leading_keyword(&query).starts_with("CREATE TABLE") {
                    return Err(McpError::Database(
                        "Only CREATE TABLE statements are allowed".to_string(),
                    ));
                }
                self.execute(&query)?;
                Ok("Table created successfully".to_string())
            }

            _ => Err(McpError::UnknownTool(name.to_string())),
        }
    }

    fn prompts(&self) -> Vec<PromptDef> {
        vec![PromptDef::with_argument(
            "mcp-demo",
            "A prompt to seed the database with initial data and demonstrate what you can do with an SQLite MCP Server",
            "topic",
            "Topic to seed the database with initial data",
            true,
        )]
    }

    async fn get_prompt(
        &mut self,
        name: &str,
        args: Map<String, JsonValue>,
    ) -> Result<PromptResult> {
        if name != "mcp-demo" {
            return Err(McpError::UnknownPrompt(name.to_string()));
        }
        let topic = get_optional_string(&args, "topic")
            .ok_or_else(|| McpError::MissingArg("topic".to_string()))?;
        let text = DEMO_TEMPLATE.replace("{topic}", &topic);
        Ok(PromptResult::user_text(
            format!("Demo template for {}", topic),
            text.trim(),
        ))
    }

    fn resources(&self) -> Vec<ResourceDef> {
        vec![ResourceDef::new(
            MEMO_URI,
            "Business Insights Memo",
            "A living document of discovered business insights",
            "text/plain",
        )]
    }

    async fn read_resource(&mut self, uri: &str) -> Result<String> {
        let (scheme, path) = uri.split_once("://").unwrap_or((uri, ""));
        if scheme != "memo" {
            return Err(McpError::InvalidArg {
                name: "uri".to_string(),
                reason: format!("Unsupported URI scheme: {}", scheme),
            });
        }
        if path != "insights" {
            return Err(McpError::InvalidArg {
                name: "uri".to_string(),
                reason: format!("Unknown resource path: {}", path),
            });
        }
        Ok(synthesize_memo(&self.insights))
    }

    fn drain_resource_updates(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_updates)
    }
}
