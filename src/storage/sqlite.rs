//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore
//! trait. The connection sits behind a mutex so concurrent shards share one
//! store; every statement commits before the lock is released.

use crate::state::FetchStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use crate::storage::{CrawlRecord, FetchedContent};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const RECORD_COLUMNS: &str =
    "url, parent_url, domain, status, crawl_depth, last_fetched_at, last_updated_at, failure";

/// SQLite document store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(CrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        // Configure SQLite for concurrent shard writers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<CrawlRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, |row| Ok(RawRecord::from_row(row)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRecord::into_record).collect()
    }

    /// Writes a terminal status after checking the transition is legal
    fn write_status(
        conn: &Connection,
        url: &str,
        status: FetchStatus,
        failure: Option<&str>,
        fetched_at: Option<&str>,
    ) -> StorageResult<()> {
        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM crawl_records WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        let current = current.ok_or_else(|| StorageError::RecordNotFound(url.to_string()))?;
        let current = parse_status(&current)?;
        if !current.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                url: url.to_string(),
                from: current,
                to: status,
            });
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE crawl_records
             SET status = ?1, failure = ?2, last_updated_at = ?3,
                 last_fetched_at = COALESCE(?4, last_fetched_at)
             WHERE url = ?5",
            params![status.to_db_string(), failure, now, fetched_at, url],
        )?;
        Ok(())
    }
}

/// Column values as stored, before status and timestamp parsing
struct RawRecord {
    url: rusqlite::Result<String>,
    parent_url: rusqlite::Result<Option<String>>,
    domain: rusqlite::Result<Option<String>>,
    status: rusqlite::Result<String>,
    crawl_depth: rusqlite::Result<u32>,
    last_fetched_at: rusqlite::Result<Option<String>>,
    last_updated_at: rusqlite::Result<Option<String>>,
    failure: rusqlite::Result<Option<String>>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> Self {
        Self {
            url: row.get(0),
            parent_url: row.get(1),
            domain: row.get(2),
            status: row.get(3),
            crawl_depth: row.get(4),
            last_fetched_at: row.get(5),
            last_updated_at: row.get(6),
            failure: row.get(7),
        }
    }

    fn into_record(self) -> StorageResult<CrawlRecord> {
        Ok(CrawlRecord {
            url: self.url?,
            parent_url: self.parent_url?,
            domain: self.domain?,
            status: parse_status(&self.status?)?,
            crawl_depth: self.crawl_depth?,
            last_fetched_at: parse_time(self.last_fetched_at?)?,
            last_updated_at: parse_time(self.last_updated_at?)?,
            failure: self.failure?,
        })
    }
}

fn parse_status(value: &str) -> StorageResult<FetchStatus> {
    FetchStatus::from_db_string(value)
        .ok_or_else(|| StorageError::Serialization(format!("Unknown fetch status '{}'", value)))
}

fn parse_time(value: Option<String>) -> StorageResult<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| StorageError::Serialization(format!("Bad timestamp '{}': {}", s, e)))
        })
        .transpose()
}

impl DocumentStore for SqliteStore {
    // ===== Frontier =====

    fn insert_seed(&self, url: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO crawl_records (url, status, crawl_depth, last_updated_at)
             VALUES (?1, ?2, 0, ?3)",
            params![url, FetchStatus::Unfetched.to_db_string(), now],
        )?;
        Ok(inserted > 0)
    }

    fn discover(&self, url: &str, parent_url: &str, crawl_depth: u32) -> StorageResult<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        // Parent and depth are written together, once
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO crawl_records
                 (url, parent_url, status, crawl_depth, last_updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                url,
                parent_url,
                FetchStatus::Unfetched.to_db_string(),
                crawl_depth,
                now
            ],
        )?;
        Ok(inserted > 0)
    }

    // ===== Records =====

    fn get_record(&self, url: &str) -> StorageResult<Option<CrawlRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM crawl_records WHERE url = ?1", RECORD_COLUMNS);
        let raw = conn
            .query_row(&sql, params![url], |row| Ok(RawRecord::from_row(row)))
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    fn records_by_status(&self, status: FetchStatus) -> StorageResult<Vec<CrawlRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM crawl_records WHERE status = ?1 ORDER BY url",
            RECORD_COLUMNS
        );
        Self::query_records(&conn, &sql, params![status.to_db_string()])
    }

    fn pending_records_for_domain(&self, domain: &str) -> StorageResult<Vec<CrawlRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM crawl_records WHERE domain = ?1 AND status = ?2 ORDER BY url",
            RECORD_COLUMNS
        );
        Self::query_records(
            &conn,
            &sql,
            params![domain, FetchStatus::Unfetched.to_db_string()],
        )
    }

    fn tag_domain(&self, url: &str, domain: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE crawl_records SET domain = ?1, last_updated_at = ?2
             WHERE url = ?3 AND status = ?4",
            params![domain, now, url, FetchStatus::Unfetched.to_db_string()],
        )?;
        Ok(updated > 0)
    }

    // ===== Terminal status writes =====

    fn mark_skipped(&self, url: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        Self::write_status(&conn, url, FetchStatus::Skipped, None, None)
    }

    fn mark_failed(&self, url: &str, failure: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        Self::write_status(&conn, url, FetchStatus::Failed, Some(failure), None)
    }

    fn mark_fetched(&self, url: &str, content: &FetchedContent) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO fetched_content
             (url, fetched_url, fetch_time, content_text, content_binary, mime_type,
              size_bytes, response_rate, http_headers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                url,
                content.fetched_url,
                content.fetch_time.to_rfc3339(),
                content.content_text,
                content.content_binary,
                content.mime_type,
                content.size_bytes as i64,
                content.response_rate,
                content.headers,
            ],
        )?;

        let fetched_at = content.fetch_time.to_rfc3339();
        Self::write_status(&tx, url, FetchStatus::Fetched, None, Some(&fetched_at))?;

        tx.commit()?;
        Ok(())
    }

    fn get_content(&self, url: &str) -> StorageResult<Option<FetchedContent>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT url, fetched_url, fetch_time, content_text, content_binary, mime_type,
                        size_bytes, response_rate, http_headers
                 FROM fetched_content WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, f64>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            url,
            fetched_url,
            fetch_time,
            content_text,
            content_binary,
            mime_type,
            size,
            rate,
            headers,
        )) = row
        else {
            return Ok(None);
        };

        let fetch_time = parse_time(Some(fetch_time))?.unwrap_or_else(Utc::now);
        Ok(Some(FetchedContent {
            url,
            fetched_url,
            fetch_time,
            content_text,
            content_binary,
            mime_type,
            size_bytes: size as u64,
            response_rate: rate,
            headers,
        }))
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: FetchStatus) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM crawl_records WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM crawl_records", [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(url: &str, body: &str) -> FetchedContent {
        FetchedContent {
            url: url.to_string(),
            fetched_url: url.to_string(),
            fetch_time: Utc::now(),
            content_text: Some(body.to_string()),
            content_binary: body.as_bytes().to_vec(),
            mime_type: "text/html".to_string(),
            size_bytes: body.len() as u64,
            response_rate: 1000.0,
            headers: "content-type: text/html".to_string(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        let store = SqliteStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_insert_seed_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.insert_seed("http://a.example/").unwrap());
        assert!(!store.insert_seed("http://a.example/").unwrap());
        assert_eq!(store.count_total().unwrap(), 1);

        let record = store.get_record("http://a.example/").unwrap().unwrap();
        assert_eq!(record.status, FetchStatus::Unfetched);
        assert_eq!(record.crawl_depth, 0);
        assert!(record.parent_url.is_none());
    }

    #[test]
    fn test_tag_domain_only_touches_unfetched_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/1").unwrap();
        store.insert_seed("http://a.example/2").unwrap();
        store.mark_skipped("http://a.example/2").unwrap();

        assert!(store
            .tag_domain("http://a.example/1", "http://a.example")
            .unwrap());
        assert!(!store
            .tag_domain("http://a.example/2", "http://a.example")
            .unwrap());

        let pending = store.pending_records_for_domain("http://a.example").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "http://a.example/1");
    }

    #[test]
    fn test_domain_query_is_live() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/1").unwrap();
        store
            .tag_domain("http://a.example/1", "http://a.example")
            .unwrap();
        assert_eq!(
            store
                .pending_records_for_domain("http://a.example")
                .unwrap()
                .len(),
            1
        );

        store.mark_failed("http://a.example/1", "timeout").unwrap();
        assert!(store
            .pending_records_for_domain("http://a.example")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mark_fetched_stores_content_and_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/").unwrap();
        store
            .mark_fetched("http://a.example/", &content("http://a.example/", "<html>"))
            .unwrap();

        let record = store.get_record("http://a.example/").unwrap().unwrap();
        assert_eq!(record.status, FetchStatus::Fetched);
        assert!(record.last_fetched_at.is_some());

        let stored = store.get_content("http://a.example/").unwrap().unwrap();
        assert_eq!(stored.content_text.as_deref(), Some("<html>"));
        assert_eq!(stored.size_bytes, 6);
    }

    #[test]
    fn test_content_is_stored_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/").unwrap();
        store
            .mark_fetched("http://a.example/", &content("http://a.example/", "first"))
            .unwrap();
        store
            .mark_fetched("http://a.example/", &content("http://a.example/", "second"))
            .unwrap();

        let stored = store.get_content("http://a.example/").unwrap().unwrap();
        assert_eq!(stored.content_text.as_deref(), Some("first"));
    }

    #[test]
    fn test_mark_unknown_record_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.mark_skipped("http://missing.example/");
        assert!(matches!(result, Err(StorageError::RecordNotFound(_))));
    }

    #[test]
    fn test_failure_is_recorded() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/").unwrap();
        store
            .mark_failed("http://a.example/", "HTTP 500 for http://a.example/")
            .unwrap();

        let record = store.get_record("http://a.example/").unwrap().unwrap();
        assert_eq!(record.status, FetchStatus::Failed);
        assert_eq!(
            record.failure.as_deref(),
            Some("HTTP 500 for http://a.example/")
        );
    }

    #[test]
    fn test_discover_creates_child_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/").unwrap();
        store
            .discover("http://b.example/x", "http://a.example/", 1)
            .unwrap();

        let record = store.get_record("http://b.example/x").unwrap().unwrap();
        assert_eq!(record.status, FetchStatus::Unfetched);
        assert_eq!(record.crawl_depth, 1);
        assert_eq!(record.parent_url.as_deref(), Some("http://a.example/"));
        assert!(record.domain.is_none());
    }

    #[test]
    fn test_rediscovery_keeps_parent_and_never_regresses() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/").unwrap();
        store
            .mark_fetched("http://a.example/", &content("http://a.example/", "x"))
            .unwrap();

        // A page linking back to the seed must not reopen it
        store
            .discover("http://a.example/", "http://b.example/", 2)
            .unwrap();
        let seed = store.get_record("http://a.example/").unwrap().unwrap();
        assert_eq!(seed.status, FetchStatus::Fetched);
        assert_eq!(seed.crawl_depth, 0);
        assert!(seed.parent_url.is_none());

        assert!(store
            .discover("http://c.example/", "http://a.example/", 1)
            .unwrap());
        assert!(!store
            .discover("http://c.example/", "http://a.example/", 1)
            .unwrap());
        let child = store.get_record("http://c.example/").unwrap().unwrap();
        assert_eq!(child.crawl_depth, 1);
        assert_eq!(child.parent_url.as_deref(), Some("http://a.example/"));
    }

    #[test]
    fn test_second_parent_does_not_split_lineage() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .discover("http://x.example/", "http://a.example/", 1)
            .unwrap();
        store
            .discover("http://x.example/", "http://deep.example/", 4)
            .unwrap();

        let record = store.get_record("http://x.example/").unwrap().unwrap();
        assert_eq!(record.status, FetchStatus::Unfetched);
        assert_eq!(record.parent_url.as_deref(), Some("http://a.example/"));
        assert_eq!(record.crawl_depth, 1);
    }

    #[test]
    fn test_unfetched_seed_keeps_depth_zero_when_linked() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://s.example/").unwrap();
        assert!(!store
            .discover("http://s.example/", "http://deep.example/", 4)
            .unwrap());

        let seed = store.get_record("http://s.example/").unwrap().unwrap();
        assert_eq!(seed.status, FetchStatus::Unfetched);
        assert!(seed.parent_url.is_none());
        assert_eq!(seed.crawl_depth, 0);
    }

    #[test]
    fn test_counts_by_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_seed("http://a.example/1").unwrap();
        store.insert_seed("http://a.example/2").unwrap();
        store.insert_seed("http://a.example/3").unwrap();
        store.mark_skipped("http://a.example/3").unwrap();

        assert_eq!(store.count_by_status(FetchStatus::Unfetched).unwrap(), 2);
        assert_eq!(store.count_by_status(FetchStatus::Skipped).unwrap(), 1);
        assert_eq!(store.count_total().unwrap(), 3);
        assert_eq!(
            store.records_by_status(FetchStatus::Unfetched).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .insert_seed(&format!("http://a.example/{}", i))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count_total().unwrap(), 4);
    }
}
