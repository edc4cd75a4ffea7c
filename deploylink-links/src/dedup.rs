use crate::extract::extract_urls;

/// Whether `candidate` already appears among `existing`.
///
/// Both sides are trimmed, then compared byte-for-byte: no case folding, no
/// trailing-slash or percent-decoding normalization. A blank candidate never
/// matches.
///
/// ```
/// use deploylink_links::is_duplicate;
///
/// let seen = ["https://link1.com"];
/// assert!(is_duplicate(&seen, " https://link1.com "));
/// assert!(!is_duplicate(&seen, "https://LINK1.com"));
/// assert!(!is_duplicate(&seen, "   "));
/// ```
pub fn is_duplicate<S: AsRef<str>>(existing: &[S], candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return false;
    }
    existing.iter().any(|url| url.as_ref().trim() == candidate)
}

/// Extract URLs from every body and check `candidate` against all of them.
pub fn contains_link<I, B>(bodies: I, candidate: &str) -> bool
where
    I: IntoIterator<Item = B>,
    B: AsRef<str>,
{
    let urls: Vec<String> = bodies
        .into_iter()
        .flat_map(|body| extract_urls(body.as_ref()))
        .collect();
    is_duplicate(&urls, candidate)
}
