use std::time::Duration;

use schemars::JsonSchema;
use serde::Deserialize;
use url::Url;

use crate::config::WebSearchConfig;
use crate::executor::{ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params};
use crate::registry::ToolDef;

pub const WEB_SEARCH_TOOL_NAME: &str = "duckduckgo_search";
pub const WEB_SEARCH_DESCRIPTION: &str =
    "Useful for searching the internet for medical information not present in the report.";
pub const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchParams {
    /// Search terms
    query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchResult {
    title: String,
    snippet: String,
    url: Option<String>,
}

/// DuckDuckGo search over the HTML endpoint, parsed with `scrape-core`.
#[derive(Debug, Clone)]
pub struct WebSearchExecutor {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    max_results: usize,
    max_body_bytes: usize,
}

impl WebSearchExecutor {
    #[must_use]
    pub fn new(config: &WebSearchConfig) -> Self {
        Self {
            client: medrag_llm::http::client_with_timeout(Duration::from_secs(config.timeout)),
            base_url: DEFAULT_SEARCH_URL.to_owned(),
            timeout_secs: config.timeout,
            max_results: config.max_results,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Point the executor at a different search endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn definition() -> ToolDef {
        ToolDef {
            id: WEB_SEARCH_TOOL_NAME,
            description: WEB_SEARCH_DESCRIPTION,
            schema: schemars::schema_for!(SearchParams),
        }
    }

    /// Run a search and render up to `max_results` hits as text.
    ///
    /// # Errors
    ///
    /// Returns an error on a blank query, transport failure, timeout, non-2xx
    /// status or oversized response.
    pub async fn search(&self, query: &str) -> Result<String, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidParams {
                message: "query must not be empty".into(),
            });
        }

        let url = Url::parse_with_params(&self.base_url, &[("q", query)]).map_err(|e| {
            ToolError::InvalidParams {
                message: format!("invalid search URL: {e}"),
            }
        })?;

        let html = self.fetch_html(url).await?;
        let max_results = self.max_results;
        let results = tokio::task::spawn_blocking(move || parse_results(&html, max_results))
            .await
            .map_err(|e| ToolError::Execution(std::io::Error::other(e.to_string())))??;

        tracing::debug!(query, results = results.len(), "web search");
        Ok(render_results(query, &results))
    }

    async fn fetch_html(&self, url: Url) -> Result<String, ToolError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                ToolError::Http(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            return Err(ToolError::Http(format!("HTTP {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        if bytes.len() > self.max_body_bytes {
            return Err(ToolError::Http(format!(
                "response too large: {} bytes (max: {})",
                bytes.len(),
                self.max_body_bytes,
            )));
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl ToolExecutor for WebSearchExecutor {
    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![Self::definition()]
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        if call.tool_id != WEB_SEARCH_TOOL_NAME {
            return Ok(None);
        }
        let params: SearchParams = deserialize_params(&call.params)?;
        let summary = self.search(&params.query).await?;
        Ok(Some(ToolOutput {
            tool_name: WEB_SEARCH_TOOL_NAME.to_owned(),
            summary,
        }))
    }
}

fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, ToolError> {
    let soup = scrape_core::Soup::parse(html);
    let mut results = Vec::new();

    for container in soup.find_all(".result").map_err(invalid_selector)? {
        if results.len() >= max_results {
            break;
        }
        let Some(link) = container.find(".result__a").map_err(invalid_selector)? else {
            continue;
        };
        let title = link.text().trim().to_owned();
        if title.is_empty() {
            continue;
        }
        let snippet = container
            .find(".result__snippet")
            .map_err(invalid_selector)?
            .map(|tag| tag.text().trim().to_owned())
            .unwrap_or_default();
        results.push(SearchResult {
            title,
            snippet,
            url: link.get("href").and_then(resolve_result_url),
        });
    }

    Ok(results)
}

fn invalid_selector(e: impl std::fmt::Display) -> ToolError {
    ToolError::Execution(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid selector: {e}"),
    ))
}

/// Result links go through a `/l/?uddg=<target>` redirect; unwrap it.
fn resolve_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_owned()
    };
    let parsed = Url::parse(&absolute).ok()?;
    let target = parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned());
    Some(target.unwrap_or(absolute))
}

fn render_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {query}");
    }
    results
        .iter()
        .map(|r| {
            let mut entry = r.title.clone();
            if !r.snippet.is_empty() {
                entry.push('\n');
                entry.push_str(&r.snippet);
            }
            if let Some(url) = &r.url {
                entry.push_str("\nSource: ");
                entry.push_str(url);
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
