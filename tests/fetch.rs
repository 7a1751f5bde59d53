//! Integration tests for the fetch server against a mock HTTP server.

use mcp_servers::adapters::fetch::{DEFAULT_USER_AGENT_AUTONOMOUS, DEFAULT_USER_AGENT_MANUAL};
use mcp_servers::{Adapter, FetchAdapter, McpError};
use serde_json::{json, Map, Value as JsonValue};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "<html><head><title>Ignored</title><script>alert('x')</script></head>\
<body><h1>Release notes</h1><p>Version <b>2.0</b> is out.</p></body></html>";

/// Helper to dispatch a tool call.
async fn call_tool(adapter: &mut FetchAdapter, name: &str, args: JsonValue) -> String {
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
async fn call_tool_err(adapter: &mut FetchAdapter, name: &str, args: JsonValue) -> McpError {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    adapter
        .call_tool(name, args_map)
        .await
        .expect_err(&format!("Expected tool {} to fail", name))
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, route: &str, body: &str, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(server)
        .await;
}

// =============================================================================
// Content handling
// =============================================================================

#[tokio::test]
async fn test_fetch_html_as_markdown() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_page(&server, "/notes", PAGE, "text/html; charset=utf-8").await;

    let mut adapter = FetchAdapter::new(None, false).unwrap();
    let url = format!("{}/notes", server.uri());
    let result = call_tool(&mut adapter, "fetch", json!({"url": url})).await;

    assert!(result.starts_with(&format!("Contents of {}:\n", url)));
    assert!(result.contains("Release notes"));
    assert!(result.contains("**2.0**"));
    assert!(!result.contains("<h1>"));
    assert!(!result.contains("alert"));
}

#[tokio::test]
async fn test_fetch_raw_keeps_html() {
    let server = MockServer::start().await;
    mount_page(&server, "/notes", PAGE, "text/html").await;

    let mut adapter = FetchAdapter::new(None, true).unwrap();
    let url = format!("{}/notes", server.uri());
    let result = call_tool(&mut adapter, "fetch", json!({"url": url, "raw": true})).await;

    assert!(result.starts_with(
        "Content type text/html cannot be simplified to markdown, but here is the raw content:\n"
    ));
    assert!(result.contains("<h1>Release notes</h1>"));
}

#[tokio::test]
async fn test_fetch_non_html_is_returned_raw() {
    let server = MockServer::start().await;
    mount_page(&server, "/data.json", r#"{"ok":true}"#, "application/json").await;

    let mut adapter = FetchAdapter::new(None, true).unwrap();
    let url = format!("{}/data.json", server.uri());
    let result = call_tool(&mut adapter, "fetch", json!({"url": url})).await;

    assert!(result.starts_with("Content type application/json cannot be simplified"));
    assert!(result.ends_with(r#"{"ok":true}"#));
}

#[tokio::test]
async fn test_fetch_truncates_and_continues() {
    let server = MockServer::start().await;
    let body = "abcdefghij".repeat(3);
    mount_page(&server, "/long.txt", &body, "text/plain").await;

    let mut adapter = FetchAdapter::new(None, true).unwrap();
    let url = format!("{}/long.txt", server.uri());

    let first = call_tool(&mut adapter, "fetch", json!({"url": url, "max_length": 10})).await;
    assert!(first.contains("abcdefghij\n\n<error>Content truncated."));
    assert!(first.contains("start_index of 10"));

    let last = call_tool(
        &mut adapter,
        "fetch",
        json!({"url": url, "max_length": 10, "start_index": 20}),
    )
    .await;
    assert!(last.ends_with("abcdefghij"));
    assert!(!last.contains("truncated"));

    let past_end = call_tool(
        &mut adapter,
        "fetch",
        json!({"url": url, "start_index": 30}),
    )
    .await;
    assert!(past_end.ends_with("<error>No more content available.</error>"));
}

#[tokio::test]
async fn test_fetch_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut adapter = FetchAdapter::new(None, true).unwrap();
    let url = format!("{}/missing", server.uri());
    let err = call_tool_err(&mut adapter, "fetch", json!({"url": url})).await;
    assert!(err.is_tool_failure());
    assert!(err.to_string().ends_with("status code 404"));
}

#[tokio::test]
async fn test_fetch_argument_validation() {
    let mut adapter = FetchAdapter::new(None, true).unwrap();

    let err = call_tool_err(&mut adapter, "fetch", json!({"url": "ftp://example.com/file"})).await;
    assert!(matches!(err, McpError::InvalidArg { .. }));

    let err = call_tool_err(&mut adapter, "fetch", json!({"url": "not a url"})).await;
    assert!(matches!(err, McpError::InvalidArg { .. }));

    let err = call_tool_err(
        &mut adapter,
        "fetch",
        json!({"url": "http://example.com", "max_length": 0}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));

    let err = call_tool_err(&mut adapter, "fetch", json!({})).await;
    assert!(matches!(err, McpError::MissingArg(_)));
}

// =============================================================================
// robots.txt
// =============================================================================

#[tokio::test]
async fn test_robots_disallow_blocks_autonomous_fetch() {
    let server = MockServer::start().await;
    mount_robots(&server, "# keep out\nUser-agent: *\nDisallow: /private\n").await;
    mount_page(&server, "/private/page", PAGE, "text/html").await;

    let mut adapter = FetchAdapter::new(None, false).unwrap();
    let url = format!("{}/private/page", server.uri());
    let err = call_tool_err(&mut adapter, "fetch", json!({"url": url})).await;

    let message = err.to_string();
    assert!(message.contains("autonomous fetching of this page is not allowed"));
    assert!(message.contains(&format!("<useragent>{}</useragent>", DEFAULT_USER_AGENT_AUTONOMOUS)));
    assert!(message.contains("Disallow: /private"));
}

#[tokio::test]
async fn test_robots_group_for_named_agent_blocks() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: ModelContextProtocol\nDisallow: /\n\nUser-agent: *\nAllow: /\n",
    )
    .await;
    mount_page(&server, "/page", PAGE, "text/html").await;

    let mut adapter = FetchAdapter::new(None, false).unwrap();
    let url = format!("{}/page", server.uri());
    let err = call_tool_err(&mut adapter, "fetch", json!({"url": url})).await;
    assert!(err
        .to_string()
        .contains("autonomous fetching of this page is not allowed"));
}

#[tokio::test]
async fn test_robots_ignored_when_configured() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /\n").await;
    mount_page(&server, "/page", PAGE, "text/html").await;

    let mut adapter = FetchAdapter::new(None, true).unwrap();
    let url = format!("{}/page", server.uri());
    let result = call_tool(&mut adapter, "fetch", json!({"url": url})).await;
    assert!(result.contains("Release notes"));
}

#[tokio::test]
async fn test_robots_forbidden_status_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut adapter = FetchAdapter::new(None, false).unwrap();
    let url = format!("{}/page", server.uri());
    let err = call_tool_err(&mut adapter, "fetch", json!({"url": url})).await;
    assert!(err.to_string().contains("received status 403"));
}

#[tokio::test]
async fn test_missing_robots_allows_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "/page", PAGE, "text/html").await;

    let mut adapter = FetchAdapter::new(None, false).unwrap();
    let url = format!("{}/page", server.uri());
    let result = call_tool(&mut adapter, "fetch", json!({"url": url})).await;
    assert!(result.contains("Release notes"));
}

// =============================================================================
// Prompt
// =============================================================================

#[tokio::test]
async fn test_prompt_uses_manual_user_agent_and_skips_robots() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", DEFAULT_USER_AGENT_MANUAL))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
        .mount(&server)
        .await;

    let mut adapter = FetchAdapter::new(None, false).unwrap();
    let url = format!("{}/page", server.uri());
    let mut args = Map::new();
    args.insert("url".to_string(), json!(url));

    let prompt = adapter.get_prompt("fetch", args).await.unwrap();
    assert_eq!(prompt.description, format!("Contents of {}", url));
    let text = serde_json::to_value(&prompt.messages[0].content).unwrap();
    assert!(text["text"].as_str().unwrap().contains("Release notes"));
}

#[tokio::test]
async fn test_prompt_failure_is_reported_in_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut adapter = FetchAdapter::new(Some("custom-agent/1.0".to_string()), false).unwrap();
    let url = format!("{}/gone", server.uri());
    let mut args = Map::new();
    args.insert("url".to_string(), json!(url));

    let prompt = adapter.get_prompt("fetch", args).await.unwrap();
    assert_eq!(prompt.description, format!("Failed to fetch {}", url));
}
