use url::Url;

/// Extracts the domain key `scheme://host[:port]` from a URL string
///
/// The key groups URLs that share one robots.txt. A URL that cannot be parsed,
/// or has no host, yields an empty string; callers treat the empty key as
/// "no domain" rather than as a domain to fetch.
///
/// # Examples
///
/// ```
/// use crawlflow::url::extract_domain;
///
/// assert_eq!(extract_domain("http://a.example/page?q=1"), "http://a.example");
/// assert_eq!(extract_domain("https://A.Example:8443/"), "https://a.example:8443");
/// assert_eq!(extract_domain("not a url"), "");
/// ```
pub fn extract_domain(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return String::new(),
    };

    match parsed.host_str() {
        Some(host) if !host.is_empty() => match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        },
        _ => String::new(),
    }
}

/// Builds the robots.txt location for a domain key
pub fn robots_url(domain: &str) -> String {
    format!("{}/robots.txt", domain.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        assert_eq!(extract_domain("http://a.example/"), "http://a.example");
    }

    #[test]
    fn test_same_scheme_and_host_share_a_key() {
        assert_eq!(
            extract_domain("http://a.example/one"),
            extract_domain("http://a.example/two?x=1#frag")
        );
    }

    #[test]
    fn test_scheme_is_part_of_the_key() {
        assert_ne!(
            extract_domain("http://a.example/"),
            extract_domain("https://a.example/")
        );
    }

    #[test]
    fn test_default_port_is_dropped() {
        assert_eq!(extract_domain("https://a.example:443/"), "https://a.example");
    }

    #[test]
    fn test_explicit_port_is_kept() {
        assert_eq!(
            extract_domain("http://127.0.0.1:8080/x"),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_host_is_lowercased() {
        assert_eq!(extract_domain("http://A.EXAMPLE/"), "http://a.example");
    }

    #[test]
    fn test_malformed_url_yields_empty_key() {
        assert_eq!(extract_domain(""), "");
        assert_eq!(extract_domain("/relative/path"), "");
        assert_eq!(extract_domain("http://"), "");
    }

    #[test]
    fn test_hostless_scheme_yields_empty_key() {
        assert_eq!(extract_domain("mailto:someone@a.example"), "");
    }

    #[test]
    fn test_robots_url() {
        assert_eq!(robots_url("http://a.example"), "http://a.example/robots.txt");
        assert_eq!(robots_url("http://a.example/"), "http://a.example/robots.txt");
    }
}
