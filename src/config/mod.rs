//! Configuration module
//!
//! Two layers are loaded once at process start and passed explicitly to every
//! component that needs them:
//!
//! - the TOML job file (shard counts, artifact directory, database, policy paths)
//! - the YAML policy resources (`fetcher_policy.yaml`, `score_config.yaml`,
//!   `url_filter.yaml`), each holding exactly one document
//!
//! # Example
//!
//! ```no_run
//! use crawlflow::config::{load_job_config, load_policies};
//! use std::path::Path;
//!
//! let config = load_job_config(Path::new("crawl.toml")).unwrap();
//! let policies = load_policies(&config, Path::new(".")).unwrap();
//! println!("Crawling as {}", policies.fetcher.agent_name);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    FetcherPolicy, JobConfig, JobSection, MaxContentSize, Policies, PolicyPaths, RedirectMode,
    RobotsShardingConfig, ScoreConfig, StorageConfig, DEFAULT_MAX_CONTENT_SIZE,
};

pub use parser::{
    compute_config_hash, load_fetcher_policy, load_job_config, load_job_config_with_hash,
    load_policies, load_score_config, load_url_filter, parse_single_document,
};
