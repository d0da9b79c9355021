//! `fetch_url(url)` built-in tool: strips HTML down to plain text.
//!
//! Document-text-extraction libraries are named as an external boundary;
//! `scraper` (already in the example pack's stack) is the one concrete
//! HTML parser this adapter depends on.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde_json::{json, Value};

use crate::domain::ports::tool::{Tool, ToolError};

pub struct FetchUrlTool {
    client: reqwest::Client,
    clip_chars: usize,
}

impl FetchUrlTool {
    pub fn new(client: reqwest::Client, clip_chars: usize) -> Self {
        Self { client, clip_chars }
    }
}

static SCRIPT_OR_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</\1>").unwrap());

/// Extracts visible text from `html`: drops `<script>`/`<style>` blocks
/// wholesale (their content is otherwise treated as plain text by the
/// HTML5 tokenizer), strips remaining tags, and collapses whitespace.
fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, " ");
    let document = Html::parse_document(&without_scripts);
    let text: String = document.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetches a URL and returns its page text, stripped of HTML markup and clipped to a fixed length."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "url": { "type": "string" } },
            "required": ["url"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let url = arguments
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing required field `url`".to_string()))?;

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return Ok(json!({ "error": e.to_string(), "url": url })),
        };

        if !response.status().is_success() {
            return Ok(json!({ "error": format!("http {}", response.status()), "url": url }));
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Ok(json!({ "error": e.to_string(), "url": url })),
        };

        let mut text = html_to_text(&body);
        text.truncate(self.clip_chars);

        Ok(json!({ "url": url, "content": text }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_scripts_and_collapses_whitespace() {
        let html = r#"
            <html><body>
                <script>var x = 1;</script>
                <h1>Title</h1>
                <p>Hello   world.</p>
            </body></html>
        "#;
        let text = html_to_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("Hello world."));
        assert!(!text.contains("var x"));
    }
}
