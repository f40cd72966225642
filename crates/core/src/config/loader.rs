use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment prefix for configuration overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `OFFERMIRROR_CATALOG__PAGE_SIZE=500`.
pub const ENV_PREFIX: &str = "OFFERMIRROR_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[remote]
endpoint = "https://graphql.example.com/graphql"

[catalog]
page_size = 500
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.catalog.page_size, 500);
        assert_eq!(config.remote.endpoint, "https://graphql.example.com/graphql");
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[catalog]
page_size = "lots"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/offermirror.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[catalog]
locale = "de"
country = "DE"
namespaces = ["ue"]

[storage]
database_root = "/tmp/mirror-db"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.catalog.locale, "de");
        assert_eq!(config.catalog.country, "DE");
        assert_eq!(config.catalog.namespaces, vec!["ue".to_string()]);
        assert_eq!(
            config.storage.database_root.to_string_lossy(),
            "/tmp/mirror-db"
        );
    }

    #[test]
    fn test_env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "offermirror.toml",
                r#"
[catalog]
page_size = 10
locale = "de"

[retry]
delay_ms = 250
"#,
            )?;
            jail.set_env("OFFERMIRROR_CATALOG__PAGE_SIZE", "500");
            jail.set_env("OFFERMIRROR_RETRY__MAX_ATTEMPTS", "7");

            let config =
                load_config(Path::new("offermirror.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.catalog.page_size, 500);
            assert_eq!(config.catalog.locale, "de");
            assert_eq!(config.retry.delay_ms, 250);
            assert_eq!(config.retry.max_attempts, Some(7));
            Ok(())
        });
    }
}
