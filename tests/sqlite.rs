//! Integration tests for the SQLite server.

use mcp_servers::adapters::sqlite::MEMO_URI;
use mcp_servers::{Adapter, McpError, SqliteAdapter};
use serde_json::{json, Map, Value as JsonValue};

/// Create a test adapter over an in-memory database.
fn test_adapter() -> SqliteAdapter {
    let conn = rusqlite::Connection::open_in_memory().expect("Failed to open in-memory database");
    SqliteAdapter::with_connection(conn)
}

/// Helper to dispatch a tool call.
async fn call_tool(adapter: &mut SqliteAdapter, name: &str, args: JsonValue) -> String {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    adapter
        .call_tool(name, args_map)
        .await
        .unwrap_or_else(|e| panic!("Tool {} failed: {}", name, e))
}

/// Helper to dispatch a tool call and expect an error.
async fn call_tool_err(adapter: &mut SqliteAdapter, name: &str, args: JsonValue) -> McpError {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    adapter
        .call_tool(name, args_map)
        .await
        .expect_err(&format!("Expected tool {} to fail", name))
}

async fn seed_products(adapter: &mut SqliteAdapter) {
    call_tool(
        adapter,
        "create_table",
        json!({"query": "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price REAL)"}),
    )
    .await;
    call_tool(
        adapter,
        "write_query",
        json!({"query": "INSERT INTO products (name, price) VALUES ('Widget', 9.5), ('Gadget', 20.0)"}),
    )
    .await;
}

// =============================================================================
// Schema tools
// =============================================================================

#[tokio::test]
async fn test_create_and_list_tables() {
    let mut adapter = test_adapter();
    let result = call_tool(
        &mut adapter,
        "create_table",
        json!({"query": "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"}),
    )
    .await;
    assert_eq!(result, "Table created successfully");

    let tables: JsonValue =
        serde_json::from_str(&call_tool(&mut adapter, "list_tables", json!({})).await).unwrap();
    assert_eq!(tables, json!([{"name": "users"}]));
}

#[tokio::test]
async fn test_describe_table() {
    let mut adapter = test_adapter();
    seed_products(&mut adapter).await;

    let columns: JsonValue = serde_json::from_str(
        &call_tool(&mut adapter, "describe_table", json!({"table_name": "products"})).await,
    )
    .unwrap();
    let columns = columns.as_array().unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0]["name"], "id");
    assert_eq!(columns[1]["name"], "name");
    assert_eq!(columns[1]["notnull"], 1);
    assert_eq!(columns[2]["type"], "REAL");
}

#[tokio::test]
async fn test_create_table_rejects_other_statements() {
    let mut adapter = test_adapter();
    let err = call_tool_err(
        &mut adapter,
        "create_table",
        json!({"query": "DROP TABLE users"}),
    )
    .await;
    assert!(err.is_tool_failure());
    assert!(err.to_string().contains("Only CREATE TABLE statements are allowed"));
}

// =============================================================================
// Query tools
// =============================================================================

#[tokio::test]
async fn test_write_reports_affected_rows() {
    let mut adapter = test_adapter();
    seed_products(&mut adapter).await;

    let result: JsonValue = serde_json::from_str(
        &call_tool(
            &mut adapter,
            "write_query",
            json!({"query": "UPDATE products SET price = price * 2"}),
        )
        .await,
    )
    .unwrap();
    assert_eq!(result, json!([{"affected_rows": 2}]));
}

#[tokio::test]
async fn test_read_query_returns_rows_in_column_order() {
    let mut adapter = test_adapter();
    seed_products(&mut adapter).await;

    let text = call_tool(
        &mut adapter,
        "read_query",
        json!({"query": "select name, price from products order by id"}),
    )
    .await;
    assert_eq!(
        text,
        r#"[{"name":"Widget","price":9.5},{"name":"Gadget","price":20.0}]"#
    );
}

#[tokio::test]
async fn test_read_query_rejects_writes() {
    let mut adapter = test_adapter();
    seed_products(&mut adapter).await;

    let err = call_tool_err(
        &mut adapter,
        "read_query",
        json!({"query": "DELETE FROM products"}),
    )
    .await;
    assert!(err.to_string().contains("Only SELECT queries are allowed for read_query"));

    let rows: JsonValue = serde_json::from_str(
        &call_tool(
            &mut adapter,
            "read_query",
            json!({"query": "SELECT COUNT(*) AS n FROM products"}),
        )
        .await,
    )
    .unwrap();
    assert_eq!(rows, json!([{"n": 2}]));
}

#[tokio::test]
async fn test_write_query_rejects_select() {
    let mut adapter = test_adapter();
    let err = call_tool_err(
        &mut adapter,
        "write_query",
        json!({"query": "  SELECT 1"}),
    )
    .await;
    assert!(err.to_string().contains("SELECT queries are not allowed for write_query"));
}

#[tokio::test]
async fn test_sql_errors_are_tool_failures() {
    let mut adapter = test_adapter();
    let err = call_tool_err(
        &mut adapter,
        "read_query",
        json!({"query": "SELECT * FROM missing"}),
    )
    .await;
    assert!(matches!(err, McpError::Database(_)));
    assert!(err.to_string().contains("no such table"));
}

#[tokio::test]
async fn test_blob_and_null_values() {
    let mut adapter = test_adapter();
    call_tool(
        &mut adapter,
        "create_table",
        json!({"query": "CREATE TABLE files (data BLOB, note TEXT)"}),
    )
    .await;
    call_tool(
        &mut adapter,
        "write_query",
        json!({"query": "INSERT INTO files VALUES (x'68656c6c6f', NULL)"}),
    )
    .await;

    let rows: JsonValue = serde_json::from_str(
        &call_tool(&mut adapter, "read_query", json!({"query": "SELECT * FROM files"})).await,
    )
    .unwrap();
    assert_eq!(rows, json!([{"data": "aGVsbG8=", "note": null}]));
}

#[tokio::test]
async fn test_missing_query_argument() {
    let mut adapter = test_adapter();
    let err = call_tool_err(&mut adapter, "read_query", json!({})).await;
    assert!(matches!(err, McpError::MissingArg(_)));
}

// =============================================================================
// Insights memo
// =============================================================================

#[tokio::test]
async fn test_append_insight_updates_memo() {
    let mut adapter = test_adapter();
    assert_eq!(
        adapter.read_resource(MEMO_URI).await.unwrap(),
        "No business insights have been discovered yet."
    );

    let result = call_tool(
        &mut adapter,
        "append_insight",
        json!({"insight": "Gadgets outsell widgets"}),
    )
    .await;
    assert_eq!(result, "Insight added to memo");
    assert_eq!(adapter.drain_resource_updates(), vec![MEMO_URI.to_string()]);
    assert!(adapter.drain_resource_updates().is_empty());

    call_tool(
        &mut adapter,
        "append_insight",
        json!({"insight": "Prices doubled in Q3"}),
    )
    .await;
    let memo = adapter.read_resource(MEMO_URI).await.unwrap();
    assert!(memo.contains("- Gadgets outsell widgets\n- Prices doubled in Q3"));
    assert!(memo.contains("Analysis has revealed 2 key business insights"));
    assert_eq!(adapter.insights().len(), 2);
}

#[tokio::test]
async fn test_read_resource_rejects_unknown_uris() {
    let mut adapter = test_adapter();

    let err = adapter.read_resource("file://insights").await.unwrap_err();
    assert!(err.to_string().contains("Unsupported URI scheme: file"));

    let err = adapter.read_resource("memo://other").await.unwrap_err();
    assert!(err.to_string().contains("Unknown resource path: other"));
}

// =============================================================================
// Demo prompt
// =============================================================================

#[tokio::test]
async fn test_demo_prompt_uses_topic() {
    let mut adapter = test_adapter();
    let mut args = Map::new();
    args.insert("topic".to_string(), json!("coffee shops"));

    let prompt = adapter.get_prompt("mcp-demo", args).await.unwrap();
    assert_eq!(prompt.description, "Demo template for coffee shops");
    assert_eq!(prompt.messages.len(), 1);
    assert_eq!(prompt.messages[0].role, "user");
    let value = serde_json::to_value(&prompt.messages[0].content).unwrap();
    assert!(value["text"].as_str().unwrap().contains("coffee shops"));
    assert!(!value["text"].as_str().unwrap().contains("{topic}"));
}

#[tokio::test]
async fn test_demo_prompt_requires_topic() {
    let mut adapter = test_adapter();
    let err = adapter.get_prompt("mcp-demo", Map::new()).await.unwrap_err();
    assert!(matches!(err, McpError::MissingArg(_)));

    let err = adapter.get_prompt("other", Map::new()).await.unwrap_err();
    assert!(matches!(err, McpError::UnknownPrompt(_)));
}

#[tokio::test]
async fn test_open_expands_and_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/test.db");
    let mut adapter = SqliteAdapter::open(&path.display().to_string()).unwrap();
    call_tool(
        &mut adapter,
        "create_table",
        json!({"query": "CREATE TABLE t (x INTEGER)"}),
    )
    .await;
    assert!(path.exists());
}
