//! Coordinator configuration
//!
//! Loaded from a JSON file. Every field is optional; missing fields take the
//! defaults below. `validate()` runs after every load.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::barrier::BarrierConfig;
use super::errors::{ConfigError, ConfigResult};
use crate::barrier::RegionEndpoint;
use crate::observability::Severity;

/// Account consistency level. Only `Strong` activates barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    Session,
    ConsistentPrefix,
    Eventual,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::BoundedStaleness => "bounded_staleness",
            Self::Session => "session",
            Self::ConsistentPrefix => "consistent_prefix",
            Self::Eventual => "eventual",
        }
    }
}

/// How the client reaches replicas. Barrier logic is identical in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    #[default]
    Direct,
    Gateway,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Gateway => "gateway",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_consistency_level")]
    pub consistency_level: ConsistencyLevel,

    #[serde(default)]
    pub connection_mode: ConnectionMode,

    /// Overall budget for one logical request, barrier included
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Read failover order, most preferred first. Empty means whatever the
    /// address cache lists.
    #[serde(default)]
    pub preferred_regions: Vec<String>,

    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    #[serde(default)]
    pub barrier: BarrierConfig,
}

fn default_consistency_level() -> ConsistencyLevel {
    ConsistencyLevel::Strong
}

fn default_request_timeout_ms() -> u64 {
    6_000
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            consistency_level: default_consistency_level(),
            connection_mode: ConnectionMode::default(),
            request_timeout_ms: default_request_timeout_ms(),
            preferred_regions: Vec::new(),
            log_level: default_log_level(),
            barrier: BarrierConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: CoordinatorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_ms",
                "must be greater than zero",
            ));
        }

        let mut seen = HashSet::new();
        for region in &self.preferred_regions {
            if region.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "preferred_regions",
                    "region names must not be empty",
                ));
            }
            if !seen.insert(region.as_str()) {
                return Err(ConfigError::invalid(
                    "preferred_regions",
                    format!("duplicate region '{}'", region),
                ));
            }
        }

        self.barrier.validate()?;

        // Attempt exhaustion must be reachable before the request deadline.
        let worst_case = self.barrier.worst_case_retry_delay();
        if worst_case >= self.request_timeout() {
            return Err(ConfigError::invalid(
                "barrier.max_attempts",
                format!(
                    "worst-case retry delay {} ms does not fit request_timeout_ms {}",
                    worst_case.as_millis(),
                    self.request_timeout_ms
                ),
            ));
        }
        Ok(())
    }

    pub fn is_strong(&self) -> bool {
        self.consistency_level == ConsistencyLevel::Strong
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn preferred_regions(&self) -> Vec<RegionEndpoint> {
        self.preferred_regions
            .iter()
            .map(|r| RegionEndpoint::new(r.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoordinatorConfig::default());
        assert!(config.is_strong());
        assert_eq!(config.connection_mode, ConnectionMode::Direct);
        assert_eq!(config.request_timeout(), Duration::from_secs(6));
        assert_eq!(config.log_level, Severity::Info);
    }

    #[test]
    fn test_full_config() {
        let config = CoordinatorConfig::from_json_str(
            r#"{
                "consistency_level": "session",
                "connection_mode": "gateway",
                "request_timeout_ms": 2500,
                "preferred_regions": ["west", "east"],
                "log_level": "trace",
                "barrier": {"max_attempts": 12, "retry_interval_ms": 5, "short_retry_interval_ms": 1}
            }"#,
        )
        .unwrap();

        assert_eq!(config.consistency_level, ConsistencyLevel::Session);
        assert!(!config.is_strong());
        assert_eq!(config.connection_mode, ConnectionMode::Gateway);
        assert_eq!(config.request_timeout_ms, 2500);
        assert_eq!(
            config.preferred_regions(),
            vec![RegionEndpoint::new("west"), RegionEndpoint::new("east")]
        );
        assert_eq!(config.log_level, Severity::Trace);
        assert_eq!(config.barrier.max_attempts, 12);
    }

    #[test]
    fn test_rejects_unknown_consistency_level() {
        let err = CoordinatorConfig::from_json_str(r#"{"consistency_level": "linearizable"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = CoordinatorConfig::from_json_str(r#"{"request_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "request_timeout_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_duplicate_regions() {
        let err = CoordinatorConfig::from_json_str(r#"{"preferred_regions": ["west", "west"]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate region"));
    }

    #[test]
    fn test_barrier_validation_propagates() {
        let err = CoordinatorConfig::from_json_str(r#"{"barrier": {"max_attempts": 0}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("barrier.max_attempts"));
    }

    #[test]
    fn test_rejects_attempts_outlasting_timeout() {
        let err = CoordinatorConfig::from_json_str(
            r#"{"request_timeout_ms": 6000, "barrier": {"max_attempts": 1000, "retry_interval_ms": 30}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "barrier.max_attempts",
                ..
            }
        ));
        assert!(err.to_string().contains("request_timeout_ms 6000"));

        let fits = CoordinatorConfig::from_json_str(
            r#"{"request_timeout_ms": 1000, "barrier": {"max_attempts": 20, "retry_interval_ms": 30}}"#,
        );
        assert!(fits.is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"preferred_regions": ["north"]}}"#).unwrap();

        let config = CoordinatorConfig::load(file.path()).unwrap();
        assert_eq!(config.preferred_regions, vec!["north".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CoordinatorConfig::load(Path::new("/nonexistent/aerobarrier.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
