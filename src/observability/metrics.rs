//! Barrier counters
//!
//! Counters only, monotonic, reset only by constructing a new registry.
//! One registry is usually shared by every session of a coordinator.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for barrier sessions.
///
/// Relaxed ordering throughout: counters are independent and only read
/// through snapshots.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Barrier probes sent, any target
    probes_issued: AtomicU64,
    /// Probes routed to the primary
    primary_probes: AtomicU64,
    /// Primary address refreshes performed before a probe
    address_refreshes: AtomicU64,
    /// 410/1022 observed
    lease_not_found: AtomicU64,
    /// Reads moved to another region
    region_failovers: AtomicU64,
    /// Sessions that observed global commit
    barriers_met: AtomicU64,
    /// Sessions that gave up
    barriers_failed: AtomicU64,
    /// Responses that needed no barrier
    barriers_skipped: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_probes(&self) {
        self.probes_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_primary_probes(&self) {
        self.primary_probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_address_refreshes(&self) {
        self.address_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lease_not_found(&self) {
        self.lease_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_region_failovers(&self) {
        self.region_failovers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_barriers_met(&self) {
        self.barriers_met.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_barriers_failed(&self) {
        self.barriers_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_barriers_skipped(&self) {
        self.barriers_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probes_issued(&self) -> u64 {
        self.probes_issued.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            probes_issued: self.probes_issued.load(Ordering::Relaxed),
            primary_probes: self.primary_probes.load(Ordering::Relaxed),
            address_refreshes: self.address_refreshes.load(Ordering::Relaxed),
            lease_not_found: self.lease_not_found.load(Ordering::Relaxed),
            region_failovers: self.region_failovers.load(Ordering::Relaxed),
            barriers_met: self.barriers_met.load(Ordering::Relaxed),
            barriers_failed: self.barriers_failed.load(Ordering::Relaxed),
            barriers_skipped: self.barriers_skipped.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub probes_issued: u64,
    pub primary_probes: u64,
    pub address_refreshes: u64,
    pub lease_not_found: u64,
    pub region_failovers: u64,
    pub barriers_met: u64,
    pub barriers_failed: u64,
    pub barriers_skipped: u64,
}
