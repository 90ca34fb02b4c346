//! Barrier retry budget and cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};

/// Probes allowed per session, across every tier and region.
pub const DEFAULT_MAX_BARRIER_ATTEMPTS: u32 = 30;
/// Probes issued at the short interval before backing off.
pub const DEFAULT_SHORT_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_SHORT_RETRY_INTERVAL_MS: u64 = 10;
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 30;
/// Consecutive primary 410/1022 in one region before a read fails over.
pub const DEFAULT_PRIMARY_LEASE_FAILURES_BEFORE_FAILOVER: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_short_retry_attempts")]
    pub short_retry_attempts: u32,

    #[serde(default = "default_short_retry_interval_ms")]
    pub short_retry_interval_ms: u64,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_primary_lease_failures_before_failover")]
    pub primary_lease_failures_before_failover: u32,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_BARRIER_ATTEMPTS
}

fn default_short_retry_attempts() -> u32 {
    DEFAULT_SHORT_RETRY_ATTEMPTS
}

fn default_short_retry_interval_ms() -> u64 {
    DEFAULT_SHORT_RETRY_INTERVAL_MS
}

fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL_MS
}

fn default_primary_lease_failures_before_failover() -> u32 {
    DEFAULT_PRIMARY_LEASE_FAILURES_BEFORE_FAILOVER
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            short_retry_attempts: default_short_retry_attempts(),
            short_retry_interval_ms: default_short_retry_interval_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            primary_lease_failures_before_failover: default_primary_lease_failures_before_failover(),
        }
    }
}

impl BarrierConfig {
    pub fn short_retry_interval(&self) -> Duration {
        Duration::from_millis(self.short_retry_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Total delay a session can spend between probes before the attempt
    /// bound stops it.
    pub fn worst_case_retry_delay(&self) -> Duration {
        let short = u64::from(self.short_retry_attempts.min(self.max_attempts));
        let long = u64::from(self.max_attempts) - short;
        Duration::from_millis(
            short
                .saturating_mul(self.short_retry_interval_ms)
                .saturating_add(long.saturating_mul(self.retry_interval_ms)),
        )
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "barrier.max_attempts",
                "must allow at least one probe",
            ));
        }
        if self.short_retry_interval_ms > self.retry_interval_ms {
            return Err(ConfigError::invalid(
                "barrier.short_retry_interval_ms",
                format!(
                    "{} exceeds retry_interval_ms {}",
                    self.short_retry_interval_ms, self.retry_interval_ms
                ),
            ));
        }
        if self.primary_lease_failures_before_failover == 0 {
            return Err(ConfigError::invalid(
                "barrier.primary_lease_failures_before_failover",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
