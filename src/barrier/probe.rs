//! Barrier probes: one HEAD request checking global commit of an LSN.

use std::fmt;

use uuid::Uuid;

use super::region::{PartitionKeyRangeId, RegionEndpoint};
use crate::config::ConnectionMode;
use crate::response::Lsn;

/// Which replica(s) of the partition a probe is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeTarget {
    /// The replica set that served the original operation
    ReplicaSet,
    /// The partition's primary replica, freshly resolved
    Primary,
}

impl ProbeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplicaSet => "replica_set",
            Self::Primary => "primary",
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single barrier (HEAD) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierProbe {
    /// Session the probe belongs to
    pub activity_id: Uuid,
    /// Replica set or primary
    pub target: ProbeTarget,
    /// Address cache is refreshed before the probe is sent
    pub force_refresh_address_cache: bool,
    /// Region endpoint being probed
    pub region: RegionEndpoint,
    /// Partition being probed
    pub partition: PartitionKeyRangeId,
    /// Resource address of the original operation
    pub resource_address: String,
    /// 1-based attempt number within the session
    pub attempt_number: u32,
    /// LSN that must be globally committed
    pub required_lsn: Lsn,
    /// Direct or Gateway
    pub connection_mode: ConnectionMode,
}

impl BarrierProbe {
    pub fn targets_primary(&self) -> bool {
        self.target == ProbeTarget::Primary
    }
}
