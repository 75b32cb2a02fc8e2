/// Checks if a host matches a filter pattern
///
/// `a.example` matches only itself. `*.a.example` matches the bare host and
/// any subdomain of it, at any depth.
///
/// # Examples
///
/// ```
/// use crawlflow::url::matches_wildcard;
///
/// assert!(matches_wildcard("a.example", "a.example"));
/// assert!(matches_wildcard("*.a.example", "a.example"));
/// assert!(matches_wildcard("*.a.example", "x.y.a.example"));
/// assert!(!matches_wildcard("*.a.example", "ba.example"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
