//! Fetch status of a crawl record
//!
//! A record starts `Unfetched` and moves to exactly one terminal status when
//! the fetch stage processes it. Terminal statuses never move back.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchStatus {
    /// Known to the frontier, awaiting a fetch decision
    Unfetched,

    /// Fetched successfully; content is stored
    Fetched,

    /// Fetch attempted and failed (timeout, network error, policy violation)
    Failed,

    /// Disallowed by robots.txt; no request was made
    Skipped,
}

impl FetchStatus {
    /// Returns true for the statuses the fetch stage writes
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unfetched)
    }

    /// Returns true if a record in this status may be moved to `next`
    ///
    /// Status writes are last-value overwrites, so a re-delivered record may
    /// move between terminal statuses, but never back to `Unfetched`.
    pub fn can_transition_to(&self, next: FetchStatus) -> bool {
        next.is_terminal() || !self.is_terminal()
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unfetched => "unfetched",
            Self::Fetched => "fetched",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unfetched" => Some(Self::Unfetched),
            "fetched" => Some(Self::Fetched),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn all_statuses() -> [Self; 4] {
        [Self::Unfetched, Self::Fetched, Self::Failed, Self::Skipped]
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
