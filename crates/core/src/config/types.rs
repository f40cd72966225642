use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub queries: QueriesConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Remote GraphQL endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Extra headers sent with every request
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            headers: default_headers(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://graphql.epicgames.com/graphql".to_string()
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Origin".to_string(), "https://epicgames.com".to_string())])
}

fn default_timeout() -> u32 {
    30
}

/// What to mirror and how to page through it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_sort_dir")]
    pub sort_dir: String,
    /// Namespaces mirrored after the store-wide search, in this order
    /// (e.g. `ue` for marketplace offers that are not in the store search).
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Maximum record writes in flight within one page
    #[serde(default = "default_write_concurrency")]
    pub write_concurrency: usize,
    #[serde(default)]
    pub on_namespace_error: NamespaceErrorPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            country: default_country(),
            sort_by: default_sort_by(),
            sort_dir: default_sort_dir(),
            namespaces: Vec::new(),
            page_size: default_page_size(),
            write_concurrency: default_write_concurrency(),
            on_namespace_error: NamespaceErrorPolicy::default(),
        }
    }
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

fn default_sort_by() -> String {
    "lastModifiedDate".to_string()
}

fn default_sort_dir() -> String {
    "DESC".to_string()
}

fn default_page_size() -> u64 {
    1000
}

fn default_write_concurrency() -> usize {
    16
}

/// What a run does when a namespace drain fails for good
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceErrorPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log and continue with the next namespace.
    Skip,
}

/// Retry policy for remote application errors
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Fixed delay between attempts (milliseconds)
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
    /// Total attempts per page, including the first. Unset retries forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_retry_delay(),
            max_attempts: None,
        }
    }
}

fn default_retry_delay() -> u64 {
    1000
}

/// Local database layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_root")]
    pub database_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_root: default_database_root(),
        }
    }
}

fn default_database_root() -> PathBuf {
    PathBuf::from("database")
}

impl StorageConfig {
    /// Directory holding one JSON file per offer.
    pub fn records_dir(&self) -> PathBuf {
        self.database_root.join("offers")
    }

    /// Directory holding the derived index artifacts.
    pub fn index_dir(&self) -> PathBuf {
        self.database_root.join("index")
    }
}

/// Optional overrides for the GraphQL query documents
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueriesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_offers: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offers_by_namespace: Option<PathBuf>,
}

/// Git snapshot publishing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Working tree the database lives in
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,
    /// Remote to push to; commits stay local when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_git_path")]
    pub git_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_dir: default_repo_dir(),
            remote: None,
            branch: default_branch(),
            git_path: default_git_path(),
        }
    }
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_git_path() -> PathBuf {
    PathBuf::from("git")
}

/// Prometheus text file output
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile: Option<PathBuf>,
}

/// Sanitized config for display (header values redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub remote: SanitizedRemoteConfig,
    pub catalog: CatalogConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub queries: QueriesConfig,
    pub sync: SyncConfig,
    pub metrics: MetricsConfig,
}

/// Remote config with header values hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRemoteConfig {
    pub endpoint: String,
    pub header_names: Vec<String>,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            remote: SanitizedRemoteConfig {
                endpoint: config.remote.endpoint.clone(),
                header_names: config.remote.headers.keys().cloned().collect(),
                timeout_secs: config.remote.timeout_secs,
            },
            catalog: config.catalog.clone(),
            retry: config.retry.clone(),
            storage: config.storage.clone(),
            queries: config.queries.clone(),
            sync: config.sync.clone(),
            metrics: config.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.remote.endpoint, "https://graphql.epicgames.com/graphql");
        assert_eq!(
            config.remote.headers.get("Origin").map(String::as_str),
            Some("https://epicgames.com")
        );
        assert_eq!(config.catalog.locale, "en");
        assert_eq!(config.catalog.country, "US");
        assert_eq!(config.catalog.page_size, 1000);
        assert_eq!(config.catalog.on_namespace_error, NamespaceErrorPolicy::Abort);
        assert_eq!(config.retry.delay_ms, 1000);
        assert_eq!(config.retry.max_attempts, None);
        assert!(!config.sync.enabled);
        assert_eq!(config.storage.records_dir(), PathBuf::from("database/offers"));
        assert_eq!(config.storage.index_dir(), PathBuf::from("database/index"));
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
[remote]
endpoint = "http://localhost:4000/graphql"
timeout_secs = 5

[remote.headers]
Origin = "https://example.com"
Authorization = "bearer secret"

[catalog]
namespaces = ["ue", "fn"]
page_size = 250
write_concurrency = 4
on_namespace_error = "skip"

[retry]
delay_ms = 250
max_attempts = 10

[sync]
enabled = true
remote = "origin"
branch = "main"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.timeout_secs, 5);
        assert_eq!(config.remote.headers.len(), 2);
        assert_eq!(config.catalog.namespaces, vec!["ue", "fn"]);
        assert_eq!(config.catalog.on_namespace_error, NamespaceErrorPolicy::Skip);
        assert_eq!(config.retry.max_attempts, Some(10));
        assert_eq!(config.sync.remote.as_deref(), Some("origin"));
        assert_eq!(config.sync.branch, "main");
    }

    #[test]
    fn test_sanitized_config_hides_header_values() {
        let mut config = Config::default();
        config
            .remote
            .headers
            .insert("Authorization".to_string(), "bearer secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(json.contains("Authorization"));
        assert!(!json.contains("bearer secret"));
    }
}
