//! URL handling module
//!
//! Domain-key extraction for robots grouping and the domain allow list applied
//! to discovered links.

mod domain;
mod matcher;

use crate::ConfigError;
use ::url::Url;

pub use domain::{extract_domain, robots_url};
pub use matcher::matches_wildcard;

/// One allow-list entry
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterEntry {
    /// A `scheme://host[:port]` domain key, matched exactly
    Domain(String),
    /// A host pattern, optionally prefixed with `*.`
    Host(String),
}

/// Domain allow list for frontier growth
///
/// An empty filter admits every URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlFilter {
    entries: Vec<FilterEntry>,
}

impl UrlFilter {
    /// Builds a filter from `domain_urlfilter` entries
    ///
    /// Entries containing `://` are domain keys; anything else is a host
    /// pattern. Domain keys are normalized through [`extract_domain`].
    pub fn new(entries: Vec<String>) -> Result<Self, ConfigError> {
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            if entry.contains("://") {
                let key = extract_domain(entry);
                if key.is_empty() {
                    return Err(ConfigError::InvalidUrl(format!(
                        "Invalid url filter entry '{}'",
                        entry
                    )));
                }
                parsed.push(FilterEntry::Domain(key));
            } else {
                parsed.push(FilterEntry::Host(entry.to_lowercase()));
            }
        }
        Ok(Self { entries: parsed })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the URL may enter the frontier
    pub fn allows(&self, url: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }

        let domain = extract_domain(url);
        if domain.is_empty() {
            return false;
        }
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();

        self.entries.iter().any(|entry| match entry {
            FilterEntry::Domain(key) => key == &domain,
            FilterEntry::Host(pattern) => matches_wildcard(pattern, &host),
        })
    }
}
