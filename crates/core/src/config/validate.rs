use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Remote endpoint is set
/// - Locale and country are set
/// - Page size and write concurrency are positive
/// - A retry ceiling, when set, allows at least one attempt
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.remote.endpoint.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "remote.endpoint cannot be empty".to_string(),
        ));
    }

    if config.catalog.locale.trim().is_empty() || config.catalog.country.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.locale and catalog.country must be set".to_string(),
        ));
    }

    if config.catalog.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.page_size cannot be 0".to_string(),
        ));
    }

    if config.catalog.write_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.write_concurrency cannot be 0".to_string(),
        ));
    }

    if config.retry.max_attempts == Some(0) {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts cannot be 0 (omit it to retry forever)".to_string(),
        ));
    }

    if config.sync.enabled && config.sync.branch.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "sync.branch cannot be empty when sync is enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_page_size_zero_fails() {
        let mut config = Config::default();
        config.catalog.page_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_empty_endpoint_fails() {
        let mut config = Config::default();
        config.remote.endpoint = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = Config::default();
        config.retry.max_attempts = Some(0);
        assert!(validate_config(&config).is_err());

        config.retry.max_attempts = Some(1);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_write_concurrency_fails() {
        let mut config = Config::default();
        config.catalog.write_concurrency = 0;
        assert!(validate_config(&config).is_err());
    }
}
