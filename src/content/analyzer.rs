use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::keywords::{estimate_reading_time, suggest_tags, DEFAULT_WORDS_PER_MINUTE};
use crate::util::{sanitize_line, validate_fetch_url};

pub const DEFAULT_ANALYZE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// What page analysis learned about a captured page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// Contents of `<title>`, empty when the page has none
    pub title: String,
    pub description: String,
    /// Raw `<meta name="keywords">` content
    pub keywords: String,
    /// Estimated minutes to read the page body
    pub reading_time: u32,
    pub suggested_tags: Vec<String>,
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("response too large")]
    TooLarge,
}

/// Fetches pages and derives capture metadata from their HTML.
#[derive(Debug, Clone)]
pub struct PageAnalyzer {
    client: reqwest::Client,
    timeout: Duration,
    words_per_minute: u32,
}

impl PageAnalyzer {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_ANALYZE_TIMEOUT,
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_words_per_minute(mut self, wpm: u32) -> Self {
        self.words_per_minute = wpm.max(1);
        self
    }

    /// Fetch `url` and analyze the returned HTML.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError`] on validation failure, network error, timeout,
    /// non-success status or a body over 5MB.
    pub async fn analyze(&self, url: &str) -> Result<PageMetadata, AnalyzeError> {
        let target = validate_fetch_url(url).map_err(|e| AnalyzeError::InvalidUrl(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.get(target).send())
            .await
            .map_err(|_| AnalyzeError::Timeout)?
            .map_err(AnalyzeError::Network)?;

        if !response.status().is_success() {
            return Err(AnalyzeError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_page_bytes(response).await?;
        let html = String::from_utf8_lossy(&bytes);
        let metadata = analyze_html(&html, self.words_per_minute);

        tracing::debug!(
            url = %url,
            reading_time = metadata.reading_time,
            tags = metadata.suggested_tags.len(),
            "Analyzed page"
        );
        Ok(metadata)
    }
}

/// Derives metadata from an HTML document without touching the network.
pub fn analyze_html(html: &str, words_per_minute: u32) -> PageMetadata {
    let text = visible_text(html);

    PageMetadata {
        title: extract_title(html).unwrap_or_default(),
        description: extract_meta_content(html, "description").unwrap_or_default(),
        keywords: extract_meta_content(html, "keywords").unwrap_or_default(),
        reading_time: estimate_reading_time(&text, words_per_minute),
        suggested_tags: suggest_tags(&text),
    }
}

/// Reads the response body with a size limit using stream-based reading.
async fn read_page_bytes(response: reqwest::Response) -> Result<Vec<u8>, AnalyzeError> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_PAGE_SIZE {
            return Err(AnalyzeError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(AnalyzeError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > MAX_PAGE_SIZE {
            return Err(AnalyzeError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

// ============================================================================
// HTML scanning
//
// Simple string scanning, no HTML parser. Positions are found in an
// ASCII-lowercased copy, which keeps byte offsets identical to the original.
// ============================================================================

fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title")?;

    let title = sanitize_line(&decode_entities(&html[content_start..content_end]));
    (!title.is_empty()).then_some(title)
}

/// Finds `<meta name="{name}" content="...">` and returns the content.
fn extract_meta_content(html: &str, name: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(offset) = lower[search_from..].find("<meta") {
        let start = search_from + offset;
        let end = start + lower[start..].find('>')?;
        let tag_lower = &lower[start..=end];

        if has_attr(tag_lower, "name", name) {
            let content = attr_value(&html[start..=end], "content")?;
            return Some(sanitize_line(&decode_entities(content)));
        }

        search_from = end + 1;
    }

    None
}

/// Checks if a lowercased tag contains `attr="value"` or `attr='value'`.
fn has_attr(tag: &str, attr: &str, value: &str) -> bool {
    tag.contains(&format!("{attr}=\"{value}\"")) || tag.contains(&format!("{attr}='{value}'"))
}

/// Extracts a quoted attribute value from a tag, preserving case.
fn attr_value<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let prefix = format!(" {attr}=");
    let value_start = tag.to_ascii_lowercase().find(&prefix)? + prefix.len();
    let rest = tag.get(value_start..)?;
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    Some(&inner[..end])
}

/// Text a reader would see: the body, minus scripts, styles and markup.
fn visible_text(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let body = match lower.find("<body") {
        Some(start) => {
            let end = lower[start..]
                .find("</body")
                .map_or(html.len(), |e| start + e);
            &html[start..end]
        }
        None => html,
    };

    let mut cleaned = body.to_owned();
    for element in ["script", "style", "noscript", "template"] {
        cleaned = remove_elements(&cleaned, element);
    }

    decode_entities(&strip_tags(&cleaned))
}

/// Removes every `<element ...>...</element>` block, contents included.
fn remove_elements(html: &str, element: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{element}");
    let close = format!("</{element}");

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find(&open) {
        let start = cursor + offset;
        out.push_str(&html[cursor..start]);

        let Some(close_offset) = lower[start..].find(&close) else {
            // Unterminated block: drop the remainder
            return out;
        };
        let close_start = start + close_offset;
        cursor = lower[close_start..]
            .find('>')
            .map_or(html.len(), |gt| close_start + gt + 1);
        out.push(' ');
    }

    out.push_str(&html[cursor..]);
    out
}

/// Replaces every tag with a space so adjacent words stay separated.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
