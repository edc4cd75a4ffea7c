use regex::Regex;
use std::sync::LazyLock;

// A URL runs from the scheme up to the first whitespace, quote or `>`.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'>]+"#).expect("static URL pattern"));

/// Collect every `http://`/`https://` token in `html`, left to right.
///
/// Repeated URLs are reported once per occurrence. Matching is purely textual,
/// so `<script src>` and `<img src>` URLs come back alongside anchor hrefs.
///
/// ```
/// use deploylink_links::extract_urls;
///
/// let html = r#"<a href="https://link1.com">x</a><a href="https://link1.com">y</a>"#;
/// assert_eq!(extract_urls(html), vec!["https://link1.com", "https://link1.com"]);
/// assert!(extract_urls("").is_empty());
/// ```
pub fn extract_urls(html: &str) -> Vec<String> {
    URL_RE
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect()
}
