//! Integration tests for the time server.

use mcp_servers::{Adapter, McpError, TimeAdapter};
use serde_json::{json, Map, Value as JsonValue};

fn test_adapter() -> TimeAdapter {
    TimeAdapter::new(Some("Europe/Warsaw")).expect("Europe/Warsaw is a valid zone")
}

/// Helper to dispatch a tool call and parse its JSON output.
async fn call_tool(adapter: &mut TimeAdapter, name: &str, args: JsonValue) -> JsonValue {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    let text = adapter
        .call_tool(name, args_map)
        .await
        .unwrap_or_else(|e| panic!("Tool {} failed: {}", name, e));
    serde_json::from_str(&text).expect("tool output is JSON")
}

/// Helper to dispatch a tool call and expect an error.
async fn call_tool_err(adapter: &mut TimeAdapter, name: &str, args: JsonValue) -> McpError {
    let args_map: Map<String, JsonValue> = match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    };
    adapter
        .call_tool(name, args_map)
        .await
        .expect_err(&format!("Expected tool {} to fail", name))
}

#[tokio::test]
async fn test_local_timezone_override() {
    let adapter = test_adapter();
    assert_eq!(adapter.local_timezone(), "Europe/Warsaw");

    let tools = adapter.tools();
    let description = tools[0].input_schema["properties"]["timezone"]["description"]
        .as_str()
        .unwrap();
    assert!(description.contains("Use 'Europe/Warsaw' as local timezone"));
}

#[tokio::test]
async fn test_invalid_local_timezone_override() {
    let err = TimeAdapter::new(Some("Mars/Olympus")).err().unwrap();
    assert!(matches!(err, McpError::InvalidTimezone(_)));
}

#[tokio::test]
async fn test_get_current_time() {
    let mut adapter = test_adapter();
    let result = call_tool(
        &mut adapter,
        "get_current_time",
        json!({"timezone": "Asia/Tokyo"}),
    )
    .await;
    assert_eq!(result["timezone"], "Asia/Tokyo");
    assert!(result["datetime"].as_str().unwrap().ends_with("+09:00"));
    assert_eq!(result["is_dst"], false);
}

#[tokio::test]
async fn test_get_current_time_invalid_zone() {
    let mut adapter = test_adapter();
    let err = call_tool_err(
        &mut adapter,
        "get_current_time",
        json!({"timezone": "Invalid/Timezone"}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidTimezone(_)));
    assert!(!err.is_tool_failure());

    let err = call_tool_err(&mut adapter, "get_current_time", json!({"timezone": ""})).await;
    assert!(matches!(err, McpError::MissingArg(_) | McpError::InvalidArg { .. }));
}

#[tokio::test]
async fn test_convert_time_between_fixed_zones() {
    let mut adapter = test_adapter();
    let result = call_tool(
        &mut adapter,
        "convert_time",
        json!({"source_timezone": "UTC", "time": "12:00", "target_timezone": "Asia/Kolkata"}),
    )
    .await;
    assert!(result["source"]["datetime"].as_str().unwrap().contains("T12:00:00"));
    assert!(result["target"]["datetime"].as_str().unwrap().contains("T17:30:00+05:30"));
    assert_eq!(result["time_difference"], "+5.5h");
}

#[tokio::test]
async fn test_convert_time_rejects_bad_format() {
    let mut adapter = test_adapter();
    let err = call_tool_err(
        &mut adapter,
        "convert_time",
        json!({"source_timezone": "UTC", "time": "25:99", "target_timezone": "Asia/Tokyo"}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));
    assert!(err.to_string().contains("HH:MM"));
}

#[tokio::test]
async fn test_resources() {
    let mut adapter = test_adapter();
    let resources = adapter.resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, "time://query");
    assert_eq!(resources[0].mime_type, "application/json");

    let local: JsonValue =
        serde_json::from_str(&adapter.read_resource("time://query").await.unwrap()).unwrap();
    assert_eq!(local["timezone"], "Europe/Warsaw");

    let named: JsonValue = serde_json::from_str(
        &adapter
            .read_resource("time://query/America/Argentina/Buenos_Aires")
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(named["timezone"], "America/Argentina/Buenos_Aires");
}

#[tokio::test]
async fn test_convert_resource() {
    let mut adapter = test_adapter();
    let result: JsonValue = serde_json::from_str(
        &adapter
            .read_resource("time://convert/UTC/09:15/to/Asia/Kathmandu")
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(result["source"]["timezone"], "UTC");
    assert_eq!(result["target"]["timezone"], "Asia/Kathmandu");
    assert!(result["target"]["datetime"].as_str().unwrap().contains("T15:00:00+05:45"));
    assert_eq!(result["time_difference"], "+5.75h");

    let err = adapter.read_resource("time://convert/UTC/09:15").await.unwrap_err();
    assert!(matches!(err, McpError::UnknownResource(_)));

    let err = adapter.read_resource("time://elsewhere").await.unwrap_err();
    assert!(matches!(err, McpError::UnknownResource(_)));
}
