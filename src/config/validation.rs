use crate::config::types::{Config, DatabaseConfig, HttpConfig, WorkerConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_worker_config(&config.worker)?;
    validate_http_config(&config.http)?;
    validate_database_config(&config.database)?;
    Ok(())
}

/// Validates dispatcher and pool settings
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > 100 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and 100, got {}",
            config.pool_size
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.stale_after_secs < 1 {
        return Err(ConfigError::Validation(
            "stale_after_secs must be >= 1".to_string(),
        ));
    }

    // A crawl still inside its deadline must never look stale to the sweep
    if config.job_timeout_secs > 0 && config.job_timeout_secs >= config.stale_after_secs {
        return Err(ConfigError::Validation(format!(
            "job_timeout_secs ({}) must be less than stale_after_secs ({})",
            config.job_timeout_secs, config.stale_after_secs
        )));
    }

    if config.job_timeout_secs == 0 && config.sweep_interval_secs > 0 {
        return Err(ConfigError::Validation(
            "sweep_interval_secs requires a non-zero job_timeout_secs".to_string(),
        ));
    }

    Ok(())
}

/// Validates outbound HTTP settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.link_check_concurrency < 1 || config.link_check_concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "link_check_concurrency must be between 1 and 64, got {}",
            config.link_check_concurrency
        )));
    }

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
