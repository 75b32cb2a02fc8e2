use crate::config::types::{
    FetcherPolicy, FetcherPolicyDocument, JobConfig, Policies, ScoreConfig, ScoreConfigDocument,
    UrlFilterDocument,
};
use crate::config::validation::{validate_fetcher_policy, validate_job, validate_score_config};
use crate::url::UrlFilter;
use crate::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Loads and validates the job configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML job file
///
/// # Returns
///
/// * `Ok(JobConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use crawlflow::config::load_job_config;
///
/// let config = load_job_config(Path::new("crawl.toml")).unwrap();
/// println!("Shards per stage: {}", config.job.shard_count);
/// ```
pub fn load_job_config(path: &Path) -> Result<JobConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    validate_job(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the job file content
///
/// Logged at startup so runs can be matched to the configuration they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a job configuration and returns both the config and its hash
pub fn load_job_config_with_hash(path: &Path) -> Result<(JobConfig, String), ConfigError> {
    let config = load_job_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Parses YAML content that must hold exactly one non-empty document
pub fn parse_single_document<T: DeserializeOwned>(
    content: &str,
    file: &str,
) -> Result<T, ConfigError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    match documents.len() {
        0 => Err(ConfigError::EmptyDocument(file.to_string())),
        1 => Ok(serde_yaml::from_value(documents.remove(0))?),
        count => Err(ConfigError::MultipleDocuments {
            file: file.to_string(),
            count,
        }),
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_single_document(&content, &path.display().to_string())
}

/// Loads `fetcher_policy.yaml`
pub fn load_fetcher_policy(path: &Path) -> Result<FetcherPolicy, ConfigError> {
    let document: FetcherPolicyDocument = read_document(path)?;
    validate_fetcher_policy(&document.fetcher_policy)?;
    Ok(document.fetcher_policy)
}

/// Loads `score_config.yaml`
pub fn load_score_config(path: &Path) -> Result<ScoreConfig, ConfigError> {
    let document: ScoreConfigDocument = read_document(path)?;
    validate_score_config(&document.score_config)?;
    Ok(document.score_config)
}

/// Loads `url_filter.yaml`
pub fn load_url_filter(path: &Path) -> Result<UrlFilter, ConfigError> {
    let document: UrlFilterDocument = read_document(path)?;
    UrlFilter::new(document.domain_urlfilter)
}

/// Loads every policy file named by the job configuration
///
/// Relative paths resolve against `base_dir`, normally the directory holding
/// the job file.
pub fn load_policies(config: &JobConfig, base_dir: &Path) -> Result<Policies, ConfigError> {
    let resolve = |p: &str| -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    };

    let fetcher = load_fetcher_policy(&resolve(&config.policies.fetcher_policy))?;
    let score = config
        .policies
        .score_config
        .as_deref()
        .map(|p| load_score_config(&resolve(p)))
        .transpose()?;
    let url_filter = match config.policies.url_filter.as_deref() {
        Some(p) => load_url_filter(&resolve(p))?,
        None => UrlFilter::default(),
    };

    Ok(Policies {
        fetcher,
        score,
        url_filter,
    })
}
