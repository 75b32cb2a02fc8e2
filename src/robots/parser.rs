//! Robots.txt parser implementation
//!
//! This module provides the admission check over a domain's robots.txt body
//! using the robotstxt crate.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt policy for one domain
///
/// An empty body allows everything. The body is matched on demand, so
/// building a policy never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsPolicy {
    content: String,
}

impl RobotsPolicy {
    /// Creates a policy from a raw robots.txt body
    pub fn from_body(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Creates a permissive policy that allows everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true if the policy places no restrictions
    pub fn is_permissive(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn body(&self) -> &str {
        &self.content
    }

    /// Checks whether `agent` may fetch `url`
    ///
    /// # Arguments
    ///
    /// * `agent` - The agent name matched against `User-agent` groups
    /// * `url` - The absolute URL of the record
    pub fn can_fetch(&self, agent: &str, url: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }
}
