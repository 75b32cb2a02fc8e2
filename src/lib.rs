//! Crawlflow: the control core of a sharded, resumable web crawler
//!
//! For every discovered URL this crate decides whether and when to fetch it,
//! enforces per-domain politeness through robots.txt, records fetch outcomes
//! durably, and grows the crawl frontier from links found in fetched pages.
//! Work is expressed as five batch stages that run one after another over an
//! execution engine, each stage fully completing before the next starts.

pub mod config;
pub mod crawler;
pub mod engine;
pub mod output;
pub mod robots;
pub mod stages;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Shard {shard} of stage {stage} failed after {attempts} attempt(s): {message}")]
    ShardFailed {
        stage: engine::StageId,
        shard: usize,
        attempts: u32,
        message: String,
    },

    #[error("Stage {stage} failed: {failed} of {total} shards failed")]
    StageFailed {
        stage: engine::StageId,
        failed: usize,
        total: usize,
    },

    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("No handler registered for stage {0}")]
    UnregisteredStage(engine::StageId),
}

/// Configuration-specific errors
///
/// Every variant is fatal: configuration is loaded before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No configs found in {0}")]
    EmptyDocument(String),

    #[error("Found {count} YAML documents in {file}, expected exactly one")]
    MultipleDocuments { file: String, count: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure of a single fetch
///
/// Page fetch failures are recorded on the crawl record and never abort a shard.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Redirect from {url} not followed (redirect mode follow_none)")]
    RedirectNotFollowed { url: String },

    #[error("Content of {url} exceeds {limit} bytes for {mime_type}")]
    ContentTooLarge {
        url: String,
        mime_type: String,
        limit: u64,
    },

    #[error("Mime type {mime_type} of {url} is not accepted")]
    InvalidMimeType { url: String, mime_type: String },

    #[error("Response rate {rate:.0} B/s for {url} is below the minimum of {minimum} B/s")]
    SlowResponse { url: String, rate: f64, minimum: u64 },

    #[error("Crawl window closed before fetching {url}")]
    CrawlWindowClosed { url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Returns true if the error is an HTTP client error status (4xx)
    pub fn is_client_status(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if (400..500).contains(status))
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::{FetcherPolicy, JobConfig, Policies};
pub use crawler::{Pipeline, RunReport};
pub use state::FetchStatus;
pub use storage::{CrawlRecord, DocumentStore, FetchedContent, SqliteStore};
pub use url::{extract_domain, UrlFilter};
