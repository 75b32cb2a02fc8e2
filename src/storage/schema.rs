//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per known URL; the URL is the identity key
CREATE TABLE IF NOT EXISTS crawl_records (
    url TEXT PRIMARY KEY,
    parent_url TEXT,
    domain TEXT,
    status TEXT NOT NULL,
    crawl_depth INTEGER NOT NULL DEFAULT 0,
    last_fetched_at TEXT,
    last_updated_at TEXT,
    failure TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_records_domain ON crawl_records(domain);
CREATE INDEX IF NOT EXISTS idx_crawl_records_status ON crawl_records(status);

-- Fetched content, owned by exactly one crawl record
CREATE TABLE IF NOT EXISTS fetched_content (
    url TEXT PRIMARY KEY REFERENCES crawl_records(url),
    fetched_url TEXT NOT NULL,
    fetch_time TEXT NOT NULL,
    content_text TEXT,
    content_binary BLOB NOT NULL,
    mime_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    response_rate REAL NOT NULL,
    http_headers TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
