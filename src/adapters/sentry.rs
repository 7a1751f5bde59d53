//! Sentry issue retrieval.
//!
//! Tools: get_sentry_issue
//! Prompts: sentry-issue

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use url::Url;

use crate::adapters::{Adapter, PromptDef, PromptResult, ToolDef};
use crate::args::get_optional_string;
use crate::error::{McpError, Result};
use crate::schema;

/// Public Sentry API root.
pub const SENTRY_API_BASE: &str = "https://sentry.io/api/0/";

/// Pull the numeric issue id out of an id or an issue URL.
pub fn extract_issue_id(issue_id_or_url: &str) -> Result<String> {
    if issue_id_or_url.is_empty() {
        return Err(McpError::Sentry("Missing issue_id_or_url argument".to_string()));
    }

    let is_url =
        issue_id_or_url.starts_with("http://") || issue_id_or_url.starts_with("https://");
    let issue_id = if is_url {
        let parsed = Url::parse(issue_id_or_url).map_err(|_| {
            McpError::Sentry("Invalid Sentry URL. Must be a URL ending with .sentry.io".to_string())
        })?;
        let host_ok = parsed
            .host_str()
            .map_or(false, |host| host.ends_with(".sentry.io"));
        if !host_ok {
            return Err(McpError::Sentry(
                "Invalid Sentry URL. Must be a URL ending with .sentry.io".to_string(),
            ));
        }

        let parts: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();
        if parts.len() < 2 || parts[0] != "issues" {
            return Err(McpError::Sentry(
                "Invalid Sentry issue URL. Path must contain '/issues/{issue_id}'".to_string(),
            ));
        }
        parts[parts.len() - 1].to_string()
    } else {
        issue_id_or_url.to_string()
    };

    if issue_id.is_empty() || !issue_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(McpError::Sentry(
            "Invalid Sentry issue ID. Must be a numeric value.".to_string(),
        ));
    }
    Ok(issue_id)
}

fn text_field(value: &JsonValue, key: &str, default: &str) -> String {
    match value.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Render the exceptions of an event as a readable stacktrace.
pub fn create_stacktrace(latest_event: &JsonValue) -> String {
    let mut stacktraces = Vec::new();
    let entries = latest_event
        .get("entries")
        .and_then(|e| e.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    for entry in entries {
        if entry.get("type").and_then(|t| t.as_str()) != Some("exception") {
            continue;
        }
        let values = entry
            .pointer("/data/values")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        for exception in values {
            let mut text = format!(
                "Exception: {}: {}\n\n",
                text_field(exception, "type", "Unknown"),
                text_field(exception, "value", "")
            );

            if let Some(stacktrace) = exception.get("stacktrace").filter(|s| !s.is_null()) {
                text.push_str("Stacktrace:\n");
                let frames = stacktrace
                    .get("frames")
                    .and_then(|f| f.as_array())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for frame in frames {
                    text.push_str(&format!(
                        "{}:{} in {}\n",
                        text_field(frame, "filename", "Unknown"),
                        text_field(frame, "lineNo", "?"),
                        text_field(frame, "function", "Unknown")
                    ));
                    // Context lines are [line_number, source] pairs.
                    if let Some(context) = frame.get("context").and_then(|c| c.as_array()) {
                        for line in context {
                            let source = line.get(1).and_then(|s| s.as_str()).unwrap_or_default();
                            text.push_str(&format!("    {}\n", source));
                        }
                    }
                    text.push('\n');
                }
            }
            stacktraces.push(text);
        }
    }

    if stacktraces.is_empty() {
        "No stacktrace found".to_string()
    } else {
        stacktraces.join("\n")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueResponse {
    title: String,
    status: String,
    level: String,
    first_seen: String,
    last_seen: String,
    count: JsonValue,
}

/// Issue summary with the latest event's stacktrace.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryIssueData {
    /// Issue title
    pub title: String,
    /// Numeric issue id
    pub issue_id: String,
    /// Status (resolved, unresolved, ...)
    pub status: String,
    /// Level (error, warning, ...)
    pub level: String,
    /// First occurrence timestamp
    pub first_seen: String,
    /// Last occurrence timestamp
    pub last_seen: String,
    /// Event count as reported by the API
    pub count: String,
    /// Rendered stacktrace
    pub stacktrace: String,
}

impl SentryIssueData {
    /// Plain text rendering shared by the tool and the prompt.
    pub fn to_text(&self) -> String {
        format!(
            "Sentry Issue: {}\nIssue ID: {}\nStatus: {}\nLevel: {}\nFirst Seen: {}\nLast Seen: {}\nEvent Count: {}\n\n{}\n",
            self.title,
            self.issue_id,
            self.status,
            self.level,
            self.first_seen,
            self.last_seen,
            self.count,
            self.stacktrace
        )
    }
}

/// Sentry server state.
pub struct SentryAdapter {
    client: Client,
    base_url: Url,
    auth_token: String,
}

impl SentryAdapter {
    /// Create the adapter against `api_base` (see [`SENTRY_API_BASE`]).
    pub fn new(auth_token: String, api_base: &str) -> Result<Self> {
        let mut base = api_base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| McpError::InvalidArg {
            name: "api_base".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            auth_token,
        })
    }

    async fn get_json(&self, path: &str) -> Result<JsonValue> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| McpError::Internal(e.to_string()))?;
        tracing::debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| McpError::Sentry(format!("An error occurred: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(McpError::Sentry(
                "Error: Unauthorized. Please check your MCP_SENTRY_AUTH_TOKEN token.".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(McpError::Sentry(format!(
                "Error fetching Sentry issue: HTTP {} for url {}",
                status, url
            )));
        }
        response
            .json()
            .await
            .map_err(|e| McpError::Sentry(format!("An error occurred: {}", e)))
    }

    /// Fetch an issue and the stacktrace of its latest event.
    pub async fn fetch_issue(&self, issue_id_or_url: &str) -> Result<SentryIssueData> {
        let issue_id = extract_issue_id(issue_id_or_url)?;

        let issue_json = self.get_json(&format!("issues/{}/", issue_id)).await?;
        let issue: IssueResponse = serde_json::from_value(issue_json)
            .map_err(|e| McpError::Sentry(format!("An error occurred: {}", e)))?;

        let hashes = self.get_json(&format!("issues/{}/hashes/", issue_id)).await?;
        let first = hashes
            .as_array()
            .and_then(|h| h.first())
            .ok_or_else(|| McpError::Sentry("No Sentry events found for this issue".to_string()))?;
        let stacktrace = create_stacktrace(first.get("latestEvent").unwrap_or(&JsonValue::Null));

        let count = match issue.count {
            JsonValue::String(s) => s,
            other => other.to_string(),
        };

        Ok(SentryIssueData {
            title: issue.title,
            issue_id,
            status: issue.status,
            level: issue.level,
            first_seen: issue.first_seen,
            last_seen: issue.last_seen,
            count,
            stacktrace,
        })
    }
}

/// Get the Sentry tool definition.
pub fn tools() -> Vec<ToolDef> {
    vec![ToolDef::new(
        "get_sentry_issue",
        "Retrieve and analyze a Sentry issue by ID or URL. Use this tool when you need to:\n\
         - Investigate production errors and crashes\n\
         - Access detailed stacktraces from Sentry\n\
         - Analyze error patterns and frequencies\n\
         - Get information about when issues first/last occurred\n\
         - Review error counts and status",
        schema!(object {
            required: { "issue_id_or_url": string => "Sentry issue ID or URL to analyze" }
        }),
    )]
}

#[async_trait]
impl Adapter for SentryAdapter {
    fn server_name(&self) -> &str {
        "sentry"
    }

    fn tools(&self) -> Vec<ToolDef> {
        tools()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        if name != "get_sentry_issue" {
            return Err(McpError::UnknownTool(name.to_string()));
        }
        if !args.contains_key("issue_id_or_url") {
            return Err(McpError::MissingArg("issue_id_or_url".to_string()));
        }
        let target = get_optional_string(&args, "issue_id_or_url").unwrap_or_default();
        Ok(self.fetch_issue(&target).await?.to_text())
    }

    fn prompts(&self) -> Vec<PromptDef> {
        vec![PromptDef::with_argument(
            "sentry-issue",
            "Retrieve a Sentry issue by ID or URL",
            "issue_id_or_url",
            "Sentry issue ID or URL",
            true,
        )]
    }

    async fn get_prompt(
        &mut self,
        name: &str,
        args: Map<String, JsonValue>,
    ) -> Result<PromptResult> {
        if name != "sentry-issue" {
            return Err(McpError::UnknownPrompt(name.to_string()));
        }
        let target = get_optional_string(&args, "issue_id_or_url").unwrap_or_default();
        let issue = self.fetch_issue(&target).await?;
        Ok(PromptResult::user_text(
            format!("Sentry Issue: {}", issue.title),
            issue.to_text(),
        ))
    }
}
