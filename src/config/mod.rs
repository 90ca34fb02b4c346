//! Coordinator and barrier configuration

mod barrier;
mod coordinator;
mod errors;

pub use barrier::{
    BarrierConfig, DEFAULT_MAX_BARRIER_ATTEMPTS, DEFAULT_PRIMARY_LEASE_FAILURES_BEFORE_FAILOVER,
    DEFAULT_RETRY_INTERVAL_MS, DEFAULT_SHORT_RETRY_ATTEMPTS, DEFAULT_SHORT_RETRY_INTERVAL_MS,
};
pub use coordinator::{ConnectionMode, ConsistencyLevel, CoordinatorConfig};
pub use errors::{ConfigError, ConfigResult};
