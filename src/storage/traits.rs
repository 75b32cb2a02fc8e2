//! Storage traits and error types
//!
//! This module defines the document store interface used by the pipeline
//! stages and its error type.

use crate::state::FetchStatus;
use crate::storage::{CrawlRecord, FetchedContent};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid status transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: FetchStatus,
        to: FetchStatus,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Document store shared by every shard of every stage
///
/// Reads observe all writes committed earlier in the same process; the
/// domain query in particular is a live lookup, not a snapshot. Every
/// write is an idempotent last-value overwrite so shards can be re-run.
pub trait DocumentStore: Send + Sync {
    // ===== Frontier =====

    /// Inserts a seed record (depth 0, unfetched) if the URL is unknown
    ///
    /// Returns true if a record was created.
    fn insert_seed(&self, url: &str) -> StorageResult<bool>;

    /// Writes a discovered URL into the frontier
    ///
    /// New URLs get `parent_url` as their lineage reference and
    /// `crawl_depth`. A known URL, seed or discovered, is left untouched.
    ///
    /// Returns true if a record was created.
    fn discover(&self, url: &str, parent_url: &str, crawl_depth: u32) -> StorageResult<bool>;

    // ===== Records =====

    fn get_record(&self, url: &str) -> StorageResult<Option<CrawlRecord>>;

    fn records_by_status(&self, status: FetchStatus) -> StorageResult<Vec<CrawlRecord>>;

    /// Unfetched records tagged with `domain`, read at call time
    fn pending_records_for_domain(&self, domain: &str) -> StorageResult<Vec<CrawlRecord>>;

    /// Tags a record with its domain key if it is still unfetched
    ///
    /// Returns true if the tag was written.
    fn tag_domain(&self, url: &str, domain: &str) -> StorageResult<bool>;

    // ===== Terminal status writes =====

    fn mark_skipped(&self, url: &str) -> StorageResult<()>;

    fn mark_failed(&self, url: &str, failure: &str) -> StorageResult<()>;

    /// Stores the content child and marks the record fetched, atomically
    ///
    /// Content is immutable once stored; a second call keeps the first copy.
    fn mark_fetched(&self, url: &str, content: &FetchedContent) -> StorageResult<()>;

    fn get_content(&self, url: &str) -> StorageResult<Option<FetchedContent>>;

    // ===== Statistics =====

    fn count_by_status(&self, status: FetchStatus) -> StorageResult<u64>;

    fn count_total(&self) -> StorageResult<u64>;
}
