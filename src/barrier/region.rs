//! Region endpoints, partitions and the per-operation request context.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// A region endpoint the client can route requests to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionEndpoint(String);

impl RegionEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the partition key range the operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKeyRangeId(String);

impl PartitionKeyRangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKeyRangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller hands the coordinator alongside the response it got.
///
/// `started_at` anchors the overall request deadline, so time spent on the
/// original write or read counts against the timeout.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Region that served the original operation
    pub region: RegionEndpoint,
    /// Partition the operation targeted
    pub partition: PartitionKeyRangeId,
    /// Resource address (e.g. `dbs/db/colls/c/docs/id`)
    pub resource_address: String,
    /// When the caller started the logical operation
    pub started_at: Instant,
}

impl OperationContext {
    pub fn new(
        region: RegionEndpoint,
        partition: PartitionKeyRangeId,
        resource_address: impl Into<String>,
    ) -> Self {
        Self {
            region,
            partition,
            resource_address: resource_address.into(),
            started_at: Instant::now(),
        }
    }

    /// Same operation, routed to another region.
    pub fn in_region(&self, region: RegionEndpoint) -> Self {
        Self {
            region,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_region_keeps_start_time() {
        let ctx = OperationContext::new(
            RegionEndpoint::new("west"),
            PartitionKeyRangeId::new("0"),
            "dbs/d/colls/c/docs/1",
        );
        let moved = ctx.in_region(RegionEndpoint::new("east"));

        assert_eq!(moved.region.as_str(), "east");
        assert_eq!(moved.partition, ctx.partition);
        assert_eq!(moved.started_at, ctx.started_at);
        assert_eq!(moved.resource_address, ctx.resource_address);
    }
}
