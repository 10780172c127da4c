use super::models::{Config, RetryConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No roots given (at least one root is required)")]
    NoRoots,

    #[error("Root #{index} is empty")]
    EmptyRoot { index: usize },

    #[error("concurrency must be greater than 0")]
    InvalidConcurrency,

    #[error("workers must be greater than 0")]
    InvalidWorkers,

    #[error("resolve_rate_per_sec must be greater than 0")]
    InvalidRate,

    #[error("poll_interval_ms must be greater than 0")]
    InvalidPollInterval,

    #[error("{section}.max_attempts must be greater than 0")]
    InvalidRetryAttempts { section: String },

    #[error("{section}.initial_delay_ms ({initial}) exceeds max_delay_ms ({max})")]
    InvalidRetryDelays {
        section: String,
        initial: u64,
        max: u64,
    },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_roots(config)?;
    validate_dispatch(config)?;
    validate_retry("resolve_retry", &config.resolve_retry)?;
    validate_retry("walk.retry", &config.walk.retry)?;
    Ok(())
}

fn validate_roots(config: &Config) -> Result<(), ValidationError> {
    if config.roots.is_empty() {
        return Err(ValidationError::NoRoots);
    }

    if let Some(index) = config.roots.iter().position(|root| root.trim().is_empty()) {
        return Err(ValidationError::EmptyRoot { index });
    }

    Ok(())
}

fn validate_dispatch(config: &Config) -> Result<(), ValidationError> {
    let dispatch = &config.dispatch;

    if dispatch.concurrency == 0 {
        return Err(ValidationError::InvalidConcurrency);
    }
    if dispatch.workers == Some(0) {
        return Err(ValidationError::InvalidWorkers);
    }
    if dispatch.resolve_rate_per_sec == 0 {
        return Err(ValidationError::InvalidRate);
    }
    if dispatch.poll_interval_ms == 0 {
        return Err(ValidationError::InvalidPollInterval);
    }

    Ok(())
}

fn validate_retry(section: &str, retry: &RetryConfig) -> Result<(), ValidationError> {
    if retry.max_attempts == 0 {
        return Err(ValidationError::InvalidRetryAttempts {
            section: section.to_string(),
        });
    }

    if retry.initial_delay_ms > retry.max_delay_ms {
        return Err(ValidationError::InvalidRetryDelays {
            section: section.to_string(),
            initial: retry.initial_delay_ms,
            max: retry.max_delay_ms,
        });
    }

    Ok(())
}
