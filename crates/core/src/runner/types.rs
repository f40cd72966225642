//! Run report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::fetcher::DrainSummary;
use crate::sync::PublishOutcome;

/// Short, stable fingerprint of the configuration a run used.
pub fn config_hash(config: &Config) -> String {
    let config_json = serde_json::to_string(config).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    digest[..16].to_string()
}

/// Timing and volume of one run phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    /// `store`, `namespace:<key>`, `index` or `publish`.
    pub name: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub records: usize,
    #[serde(default)]
    pub failures: usize,
}

impl PhaseMetrics {
    pub fn new(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            pages: 0,
            records: 0,
            failures: 0,
        }
    }

    /// Phase entry for a finished drain.
    pub fn from_drain(name: impl Into<String>, duration_ms: u64, drain: &DrainSummary) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            pages: drain.pages,
            records: drain.persisted,
            failures: drain.write_failures,
        }
    }
}

/// Metrics artifact of a run, written to `metrics.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub started_at: DateTime<Utc>,
    /// Set once indexing has completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub phases: Vec<PhaseMetrics>,
}

impl RunMetrics {
    pub fn start(config_hash: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            last_update: None,
            config_hash: config_hash.into(),
            phases: Vec::new(),
        }
    }

    pub fn record(&mut self, phase: PhaseMetrics) {
        self.phases.push(phase);
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseMetrics> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Records persisted across all fetch phases.
    pub fn records_persisted(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.name == "store" || p.name.starts_with("namespace:"))
            .map(|p| p.records)
            .sum()
    }
}

/// Everything a finished run reports back to the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub metrics: RunMetrics,
    /// Namespaces whose drain failed and was skipped by policy.
    pub skipped_namespaces: Vec<String>,
    /// Offers in the rebuilt index.
    pub indexed: usize,
    /// Whether the rebuilt index differs from the previous one.
    pub index_changed: bool,
    pub publish: PublishOutcome,
}
