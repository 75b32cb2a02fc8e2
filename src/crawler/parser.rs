//! Outlink extraction from fetched page text
//!
//! Links are found with a permissive `href=` pattern rather than an HTML
//! parser, so markup quality does not matter. Only absolute `http`/`https`
//! links are kept; relative links are dropped without being resolved.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Matches `href='...'`, `href="..."` and unquoted `href=...`
static HREF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=['"]?([^'" >]+)"#).expect("Invalid href regex"));

/// Returns every `href` value in the text, in document order
pub fn extract_hrefs(content: &str) -> Vec<&str> {
    HREF_REGEX
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Returns true for absolute URLs with an `http` or `https` scheme
pub fn is_absolute_http(link: &str) -> bool {
    Url::parse(link)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Extracts the distinct absolute http(s) outlinks of a page
///
/// # Arguments
///
/// * `content` - The page's textual body
///
/// # Returns
///
/// Links exactly as written in the page, first occurrence first.
///
/// # Example
///
/// ```
/// use crawlflow::crawler::extract_outlinks;
///
/// let html = r#"<a href="http://b.example/x">x</a> <a href="/private">p</a>"#;
/// assert_eq!(extract_outlinks(html), vec!["http://b.example/x"]);
/// ```
pub fn extract_outlinks(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_hrefs(content)
        .into_iter()
        .filter(|link| is_absolute_http(link))
        .filter(|link| seen.insert(*link))
        .map(str::to_string)
        .collect()
}
