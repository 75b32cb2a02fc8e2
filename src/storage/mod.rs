//! Storage module for persisting crawl data
//!
//! This module handles all document store operations for the crawler:
//! - SQLite database initialization and schema management
//! - Crawl record persistence and the live per-domain query
//! - Fetched content children, stored once per record
//! - Frontier growth from discovered links

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, StorageError, StorageResult};

use crate::state::FetchStatus;
use crate::CrawlError;
use chrono::{DateTime, Utc};

use std::path::Path;

/// Initializes or opens a document store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized store
/// * `Err(CrawlError)` - Failed to initialize store
pub fn open_store(path: &Path) -> Result<SqliteStore, CrawlError> {
    SqliteStore::new(path)
}

/// One crawl record, identified by its URL
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRecord {
    pub url: String,
    /// URL of the page this one was discovered on; `None` for seeds
    pub parent_url: Option<String>,
    /// Domain key written by the domain extraction stage
    pub domain: Option<String>,
    pub status: FetchStatus,
    pub crawl_depth: u32,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Failure description for `Failed` records
    pub failure: Option<String>,
}

impl CrawlRecord {
    /// Creates a fresh unfetched record
    pub fn new(url: impl Into<String>, parent_url: Option<String>, crawl_depth: u32) -> Self {
        Self {
            url: url.into(),
            parent_url,
            domain: None,
            status: FetchStatus::Unfetched,
            crawl_depth,
            last_fetched_at: None,
            last_updated_at: None,
            failure: None,
        }
    }
}

/// Content of one successful fetch, owned by exactly one crawl record
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedContent {
    /// URL of the owning crawl record
    pub url: String,
    /// Final URL after redirects
    pub fetched_url: String,
    pub fetch_time: DateTime<Utc>,
    /// Body decoded as text, when it is valid UTF-8
    pub content_text: Option<String>,
    pub content_binary: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Observed transfer rate in bytes per second
    pub response_rate: f64,
    /// Response headers, one `name: value` per line
    pub headers: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unfetched() {
        let record = CrawlRecord::new("http://a.example/", None, 0);
        assert_eq!(record.status, FetchStatus::Unfetched);
        assert!(record.domain.is_none());
        assert!(record.last_fetched_at.is_none());
    }

    #[test]
    fn test_open_store_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.db");
        let store = open_store(&path).unwrap();
        assert_eq!(store.count_total().unwrap(), 0);
        assert!(path.exists());
    }
}
