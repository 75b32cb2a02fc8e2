use serde::Deserialize;
use std::time::Duration;

/// Default per-mime content limit when no `max_content_size` entry matches
pub const DEFAULT_MAX_CONTENT_SIZE: u64 = 64 * 1024;

/// Job configuration (TOML), loaded once per process
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub job: JobSection,
    #[serde(default)]
    pub robots: RobotsShardingConfig,
    pub storage: StorageConfig,
    pub policies: PolicyPaths,
}

/// Pipeline job settings
#[derive(Debug, Clone, Deserialize)]
pub struct JobSection {
    /// Job name, used to namespace stage artifacts
    pub name: String,

    /// Number of shards per stage
    #[serde(rename = "shard-count")]
    pub shard_count: usize,

    /// How many times the engine runs a failing shard before giving up
    #[serde(rename = "max-shard-attempts", default = "default_max_shard_attempts")]
    pub max_shard_attempts: u32,

    /// Directory holding intermediate stage artifacts
    #[serde(rename = "work-dir")]
    pub work_dir: String,
}

/// Bounds for balancing the robots.txt fetch shards
#[derive(Debug, Clone, Deserialize)]
pub struct RobotsShardingConfig {
    #[serde(rename = "max-shard-count", default = "default_max_robots_shards")]
    pub max_shard_count: usize,

    #[serde(rename = "max-domains-per-shard", default = "default_max_domains_per_shard")]
    pub max_domains_per_shard: usize,
}

impl Default for RobotsShardingConfig {
    fn default() -> Self {
        Self {
            max_shard_count: default_max_robots_shards(),
            max_domains_per_shard: default_max_domains_per_shard(),
        }
    }
}

/// Document store location
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Locations of the policy resource files
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyPaths {
    #[serde(rename = "fetcher-policy")]
    pub fetcher_policy: String,

    #[serde(rename = "score-config")]
    pub score_config: Option<String>,

    #[serde(rename = "url-filter")]
    pub url_filter: Option<String>,
}

fn default_max_shard_attempts() -> u32 {
    3
}

fn default_max_robots_shards() -> usize {
    256
}

fn default_max_domains_per_shard() -> usize {
    256
}

/// Redirect handling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMode {
    /// Follow redirects up to `max_redirects`
    #[default]
    FollowAll,
    /// Never follow; a redirect response is a fetch failure
    FollowNone,
}

/// Content size limit for one mime type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaxContentSize {
    pub content_type: String,
    pub size: u64,
}

/// Root of `fetcher_policy.yaml`
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherPolicyDocument {
    pub fetcher_policy: FetcherPolicy,
}

/// Fetch constraints shared by every fetch in a run
///
/// Durations are milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherPolicy {
    pub agent_name: String,
    pub email_address: String,
    pub web_address: String,

    /// Minimum accepted transfer rate in bytes per second (0 disables the check)
    #[serde(default)]
    pub min_response_rate: u64,

    #[serde(default)]
    pub max_content_size: Vec<MaxContentSize>,

    /// Length of the crawl window from fetcher start (0 means unbounded)
    #[serde(default)]
    pub crawl_end_time: u64,

    #[serde(default)]
    pub crawl_delay: u64,

    pub max_redirects: u32,

    pub accept_language: String,

    /// `None` or a comma-separated list of accepted mime types
    #[serde(default = "default_valid_mime_types")]
    pub valid_mime_types: String,

    #[serde(default)]
    pub redirect_mode: RedirectMode,

    pub request_timeout: u64,

    /// Upper bound on outlinks kept per page (0 means unbounded)
    #[serde(default)]
    pub max_links_per_page: u32,
}

fn default_valid_mime_types() -> String {
    "None".to_string()
}

impl FetcherPolicy {
    /// Builds the User-Agent header value
    pub fn user_agent(&self) -> String {
        format!(
            "{} (+{}; {})",
            self.agent_name, self.web_address, self.email_address
        )
    }

    /// Returns the size limit for a mime type
    ///
    /// Entries match on exact type or on a `type/*` prefix; the default limit
    /// applies when nothing matches.
    pub fn max_content_size_for(&self, mime_type: &str) -> u64 {
        self.max_content_size
            .iter()
            .find(|entry| {
                entry.content_type.eq_ignore_ascii_case(mime_type)
                    || entry
                        .content_type
                        .strip_suffix("/*")
                        .is_some_and(|prefix| {
                            mime_type
                                .split('/')
                                .next()
                                .is_some_and(|major| major.eq_ignore_ascii_case(prefix))
                        })
            })
            .map(|entry| entry.size)
            .unwrap_or(DEFAULT_MAX_CONTENT_SIZE)
    }

    /// Returns the accepted mime types, or an empty list when unrestricted
    pub fn accepted_mime_types(&self) -> Vec<String> {
        let raw = self.valid_mime_types.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return Vec::new();
        }
        raw.split(',')
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect()
    }

    /// Returns true if the mime type passes `valid_mime_types`
    pub fn accepts_mime_type(&self, mime_type: &str) -> bool {
        let accepted = self.accepted_mime_types();
        accepted.is_empty() || accepted.iter().any(|m| m == &mime_type.to_lowercase())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay)
    }

    pub fn crawl_window(&self) -> Option<Duration> {
        (self.crawl_end_time > 0).then(|| Duration::from_millis(self.crawl_end_time))
    }
}

/// Root of `score_config.yaml`
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreConfigDocument {
    pub score_config: ScoreConfig,
}

/// Query and adoption threshold consumed by the page scoring stage
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreConfig {
    pub score_query: String,
    pub adopt_score: f64,
}

/// Root of `url_filter.yaml`
#[derive(Debug, Clone, Deserialize)]
pub struct UrlFilterDocument {
    #[serde(default)]
    pub domain_urlfilter: Vec<String>,
}

/// Every policy a run needs, loaded once at startup
#[derive(Debug, Clone)]
pub struct Policies {
    pub fetcher: FetcherPolicy,
    pub score: Option<ScoreConfig>,
    pub url_filter: crate::url::UrlFilter,
}
