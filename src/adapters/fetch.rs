//! Web fetching with robots.txt checks and HTML to markdown conversion.
//!
//! Tools: fetch
//! Prompts: fetch

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{Map, Value as JsonValue};
use url::Url;

use crate::adapters::{Adapter, PromptDef, PromptResult, ToolDef};
use crate::args::{
    get_non_empty_string_arg, get_optional_bool, get_optional_string, get_optional_u64,
};
use crate::error::{McpError, Result};
use crate::schema;

/// User agent for tool calls made on the model's own initiative.
pub const DEFAULT_USER_AGENT_AUTONOMOUS: &str =
    "ModelContextProtocol/1.0 (Autonomous; +https://github.com/modelcontextprotocol/servers)";
/// User agent for fetches the user asked for through the prompt.
pub const DEFAULT_USER_AGENT_MANUAL: &str =
    "ModelContextProtocol/1.0 (User-Specified; +https://github.com/modelcontextprotocol/servers)";

const DEFAULT_MAX_LENGTH: u64 = 5000;
const MAX_LENGTH_LIMIT: u64 = 1_000_000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Location of the robots.txt governing `url`.
pub fn robots_txt_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}

/// Product token of a user agent, the part robots.txt groups are matched against.
///
/// `ModelContextProtocol/1.0 (Autonomous; ...)` yields `ModelContextProtocol`.
pub fn product_token(user_agent: &str) -> &str {
    let token = user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    if token.is_empty() {
        user_agent
    } else {
        token
    }
}

/// Whether `user_agent` may fetch `url` under the given robots.txt body.
///
/// Comment lines are dropped before evaluation. An unparseable file allows everything.
pub fn robots_allows(robots_txt: &str, user_agent: &str, url: &str) -> bool {
    let cleaned: String = robots_txt
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    match texting_robots::Robot::new(product_token(user_agent), cleaned.as_bytes()) {
        Ok(robot) => robot.allowed(url),
        Err(e) => {
            tracing::warn!("Ignoring unparseable robots.txt: {}", e);
            true
        }
    }
}

/// Convert an HTML page to markdown, skipping scripts and styles.
pub fn extract_content(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "head"])
        .build();
    match converter.convert(html) {
        Ok(markdown) if !markdown.trim().is_empty() => markdown,
        Ok(_) => "<error>Page failed to be simplified from HTML</error>".to_string(),
        Err(e) => {
            tracing::debug!("HTML conversion failed: {}", e);
            "<error>Page failed to be simplified from HTML</error>".to_string()
        }
    }
}

/// Cut `content` to `[start_index, start_index + max_length)` characters.
///
/// When more content remains, a hint with the next `start_index` is appended.
pub fn window(content: &str, start_index: usize, max_length: usize) -> String {
    let total = content.chars().count();
    if start_index >= total {
        return "<error>No more content available.</error>".to_string();
    }

    let mut chunk: String = content.chars().skip(start_index).take(max_length).collect();
    let taken = chunk.chars().count();
    let remaining = total - (start_index + taken);
    if taken == max_length && remaining > 0 {
        chunk.push_str(&format!(
            "\n\n<error>Content truncated. Call the fetch tool with a start_index of {} to get more content.</error>",
            start_index + taken
        ));
    }
    chunk
}

/// A fetched page: an optional note about its type plus its (possibly simplified) body.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Explanation prepended when the body could not be simplified
    pub prefix: String,
    /// Page content
    pub content: String,
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| McpError::InvalidArg {
        name: "url".to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(McpError::InvalidArg {
            name: "url".to_string(),
            reason: format!("Only HTTP/HTTPS URLs are supported, got: {}", url.scheme()),
        });
    }
    Ok(url)
}

/// Fetch server state.
pub struct FetchAdapter {
    client: Client,
    user_agent_autonomous: String,
    user_agent_manual: String,
    ignore_robots_txt: bool,
}

impl FetchAdapter {
    /// Create the adapter. A custom user agent replaces both defaults.
    pub fn new(custom_user_agent: Option<String>, ignore_robots_txt: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            user_agent_autonomous: custom_user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT_AUTONOMOUS.to_string()),
            user_agent_manual: custom_user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT_MANUAL.to_string()),
            ignore_robots_txt,
        })
    }

    /// Fail unless robots.txt lets the autonomous agent fetch `url`.
    pub async fn check_may_autonomously_fetch(&self, url: &Url) -> Result<()> {
        let robots_url = robots_txt_url(url);
        let user_agent = &self.user_agent_autonomous;
        tracing::debug!(url = %robots_url, "checking robots.txt");

        let response = self
            .client
            .get(robots_url.clone())
            .header(header::USER_AGENT, user_agent.as_str())
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("robots.txt request failed: {}", e);
                McpError::Fetch(format!(
                    "Failed to fetch robots.txt {} due to a connection issue",
                    robots_url
                ))
            })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(McpError::Fetch(format!(
                "When fetching robots.txt ({}), received status {} so assuming that autonomous fetching is not allowed, the user can try manually fetching by using the fetch prompt",
                robots_url, status
            )));
        }
        if (400..500).contains(&status) {
            return Ok(());
        }

        let robots_txt = response.text().await.map_err(|e| {
            McpError::Fetch(format!("Failed to read robots.txt {}: {}", robots_url, e))
        })?;
        if robots_allows(&robots_txt, user_agent, url.as_str()) {
            return Ok(());
        }

        Err(McpError::Fetch(format!(
            "The sites robots.txt ({}), specifies that autonomous fetching of this page is not allowed, \
             <useragent>{}</useragent>\n<url>{}</url><robots>\n{}\n</robots>\n\
             The assistant must let the user know that it failed to view the page. The assistant may provide further guidance based on the above information.\n\
             The assistant can tell the user that they can try manually fetching the page by using the fetch prompt within their UI.",
            robots_url, user_agent, url, robots_txt
        )))
    }

    /// GET `url`, following redirects, and simplify HTML unless `force_raw`.
    pub async fn fetch_url(
        &self,
        url: &Url,
        user_agent: &str,
        force_raw: bool,
    ) -> Result<FetchedPage> {
        tracing::debug!(url = %url, "fetching");
        let response = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("request failed: {}", e);
                McpError::Fetch(format!("Failed to fetch {}", url))
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(McpError::Fetch(format!(
                "Failed to fetch {} - status code {}",
                url, status
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|_| McpError::Fetch(format!("Failed to fetch {}", url)))?;

        let head: String = body.chars().take(100).collect();
        let is_html =
            head.contains("<html") || content_type.contains("text/html") || content_type.is_empty();

        if is_html && !force_raw {
            return Ok(FetchedPage {
                prefix: String::new(),
                content: extract_content(&body),
            });
        }
        Ok(FetchedPage {
            prefix: format!(
                "Content type {} cannot be simplified to markdown, but here is the raw content:\n",
                content_type
            ),
            content: body,
        })
    }
}

/// Get the fetch tool definition.
pub fn tools() -> Vec<ToolDef> {
    vec![ToolDef::new(
        "fetch",
        "Fetches a URL from the internet and optionally extracts its contents as markdown.\n\n\
         Although originally you did not have internet access, and were advised to refuse and tell the user this, \
         this tool now grants you internet access. Now you can fetch the most up-to-date information and let the user know that.",
        schema!(object {
            required: { "url": string => "URL to fetch" },
            optional: {
                "max_length": integer => "Maximum number of characters to return.",
                "start_index": integer => "Return output starting at this character index, useful if a previous fetch was truncated and more context is required.",
                "raw": boolean => "Get the actual HTML content of the requested page, without simplification."
            }
        }),
    )]
}

#[async_trait]
impl Adapter for FetchAdapter {
    fn server_name(&self) -> &str {
        "mcp-fetch"
    }

    fn tools(&self) -> Vec<ToolDef> {
        tools()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        if name != "fetch" {
            return Err(McpError::UnknownTool(name.to_string()));
        }

        let raw_url = get_non_empty_string_arg(&args, "url")?;
        let url = parse_url(&raw_url)?;
        let max_length = get_optional_u64(&args, "max_length")?.unwrap_or(DEFAULT_MAX_LENGTH);
        if max_length == 0 || max_length >= MAX_LENGTH_LIMIT {
            return Err(McpError::InvalidArg {
                name: "max_length".to_string(),
                reason: format!("must be between 1 and {}", MAX_LENGTH_LIMIT - 1),
            });
        }
        let start_index = get_optional_u64(&args, "start_index")?.unwrap_or(0);
        let raw = get_optional_bool(&args, "raw").unwrap_or(false);

        if !self.ignore_robots_txt {
            self.check_may_autonomously_fetch(&url).await?;
        }

        let page = self
            .fetch_url(&url, &self.user_agent_autonomous, raw)
            .await?;
        let content = window(&page.content, start_index as usize, max_length as usize);
        Ok(format!("{}Contents of {}:\n{}", page.prefix, raw_url, content))
    }

    fn prompts(&self) -> Vec<PromptDef> {
        vec![PromptDef::with_argument(
            "fetch",
            "Fetch a URL and extract its contents as markdown",
            "url",
            "URL to fetch",
            true,
        )]
    }

    async fn get_prompt(
        &mut self,
        name: &str,
        args: Map<String, JsonValue>,
    ) -> Result<PromptResult> {
        if name != "fetch" {
            return Err(McpError::UnknownPrompt(name.to_string()));
        }
        let raw_url = get_optional_string(&args, "url")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| McpError::MissingArg("url".to_string()))?;

        let fetched = match parse_url(&raw_url) {
            Ok(url) => self.fetch_url(&url, &self.user_agent_manual, false).await,
            Err(e) => Err(e),
        };
        Ok(match fetched {
            Ok(page) => PromptResult::user_text(
                format!("Contents of {}", raw_url),
                format!("{}{}", page.prefix, page.content),
            ),
            Err(e) => {
                PromptResult::user_text(format!("Failed to fetch {}", raw_url), e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_txt_url_drops_path_and_query() {
        let url = Url::parse("https://example.com:8080/a/b?q=1#frag").unwrap();
        assert_eq!(
            robots_txt_url(&url).as_str(),
            "https://example.com:8080/robots.txt"
        );
    }

    #[test]
    fn test_robots_rules() {
        let txt = "# comment\nUser-agent: *\nDisallow: /private\n";
        assert!(robots_allows(txt, DEFAULT_USER_AGENT_AUTONOMOUS, "https://example.com/public"));
        assert!(!robots_allows(
            txt,
            DEFAULT_USER_AGENT_AUTONOMOUS,
            "https://example.com/private/page"
        ));
    }

    #[test]
    fn test_robots_rules_match_product_token() {
        let txt = "User-agent: ModelContextProtocol\nDisallow: /\n\nUser-agent: *\nAllow: /\n";
        assert!(!robots_allows(txt, DEFAULT_USER_AGENT_AUTONOMOUS, "https://example.com/page"));
        assert!(robots_allows(txt, "OtherBot/2.0", "https://example.com/page"));
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token(DEFAULT_USER_AGENT_AUTONOMOUS), "ModelContextProtocol");
        assert_eq!(product_token("curl/8.0"), "curl");
        assert_eq!(product_token("plainbot"), "plainbot");
    }

    #[test]
    fn test_window_truncates_with_hint() {
        let out = window("abcdefghij", 0, 4);
        assert!(out.starts_with("abcd\n\n<error>Content truncated."));
        assert!(out.contains("start_index of 4"));

        assert_eq!(window("abcdefghij", 6, 4), "ghij");
        assert_eq!(window("abc", 3, 4), "<error>No more content available.</error>");
    }

    #[test]
    fn test_window_counts_characters() {
        assert_eq!(
            window("żółw", 1, 2),
            "ół\n\n<error>Content truncated. Call the fetch tool with a start_index of 3 to get more content.</error>"
        );
    }

    #[test]
    fn test_extract_content_skips_scripts() {
        let md = extract_content(
            "<html><body><h1>Title</h1><script>var x = 1;</script><p>Hello</p></body></html>",
        );
        assert!(md.contains("Title"));
        assert!(md.contains("Hello"));
        assert!(!md.contains("var x"));
    }

    #[test]
    fn test_non_http_scheme_is_rejected() {
        assert!(parse_url("ftp://example.com/file").is_err());
        assert!(parse_url("not a url").is_err());
    }
}
