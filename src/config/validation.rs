use crate::config::types::{FetcherPolicy, JobConfig, ScoreConfig};
use crate::ConfigError;
use url::Url;

const MAX_SHARD_COUNT: usize = 1024;

/// Validates the job configuration
pub fn validate_job(config: &JobConfig) -> Result<(), ConfigError> {
    let job = &config.job;

    if job.name.is_empty() {
        return Err(ConfigError::Validation("job name cannot be empty".to_string()));
    }

    // The name becomes a directory under work-dir
    if !job
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "job name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            job.name
        )));
    }

    if job.shard_count < 1 || job.shard_count > MAX_SHARD_COUNT {
        return Err(ConfigError::Validation(format!(
            "shard-count must be between 1 and {}, got {}",
            MAX_SHARD_COUNT, job.shard_count
        )));
    }

    if job.max_shard_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-shard-attempts must be >= 1".to_string(),
        ));
    }

    if job.work_dir.is_empty() {
        return Err(ConfigError::Validation("work-dir cannot be empty".to_string()));
    }

    if config.robots.max_shard_count < 1 || config.robots.max_domains_per_shard < 1 {
        return Err(ConfigError::Validation(
            "robots max-shard-count and max-domains-per-shard must be >= 1".to_string(),
        ));
    }

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.policies.fetcher_policy.is_empty() {
        return Err(ConfigError::Validation(
            "fetcher-policy path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a fetcher policy
pub fn validate_fetcher_policy(policy: &FetcherPolicy) -> Result<(), ConfigError> {
    // The agent name is the product token matched against robots.txt groups
    if policy.agent_name.is_empty() {
        return Err(ConfigError::Validation(
            "agent_name cannot be empty".to_string(),
        ));
    }

    if !policy
        .agent_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "agent_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            policy.agent_name
        )));
    }

    Url::parse(&policy.web_address)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid web_address: {}", e)))?;

    validate_email(&policy.email_address)?;

    if policy.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be > 0".to_string(),
        ));
    }

    if policy.accept_language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "accept_language cannot be empty".to_string(),
        ));
    }

    for entry in &policy.max_content_size {
        if entry.content_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "max_content_size entries need a content_type".to_string(),
            ));
        }
        if entry.size == 0 {
            return Err(ConfigError::Validation(format!(
                "max_content_size for '{}' must be > 0",
                entry.content_type
            )));
        }
    }

    Ok(())
}

/// Validates a score configuration
pub fn validate_score_config(config: &ScoreConfig) -> Result<(), ConfigError> {
    if config.score_query.trim().is_empty() {
        return Err(ConfigError::Validation(
            "score_query cannot be empty".to_string(),
        ));
    }

    if !config.adopt_score.is_finite() || config.adopt_score < 0.0 {
        return Err(ConfigError::Validation(format!(
            "adopt_score must be a non-negative number, got {}",
            config.adopt_score
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "email_address cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
