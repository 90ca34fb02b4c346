//! Collaborator seams: the transport that reaches replicas and the address
//! cache that resolves them.
//!
//! Implementations must report `410/1022` as an `Ok` response so the
//! escalation policy can see it. `Err` is reserved for failures that are not
//! store responses at all (connection refused, auth rejected locally, ...) and
//! is surfaced to the caller without retry.

use async_trait::async_trait;

use super::errors::BarrierResult;
use super::probe::BarrierProbe;
use super::region::{OperationContext, PartitionKeyRangeId, RegionEndpoint};
use crate::response::LogicalStoreResponse;

/// Sends logical requests to replicas.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// Send a barrier HEAD request.
    async fn send_probe(&self, probe: &BarrierProbe) -> BarrierResult<LogicalStoreResponse>;

    /// Re-issue the original point read against `region`.
    async fn read(
        &self,
        region: &RegionEndpoint,
        operation: &OperationContext,
    ) -> BarrierResult<LogicalStoreResponse>;
}

/// Resolves physical replica addresses.
#[async_trait]
pub trait AddressCache: Send + Sync {
    /// Drop and re-resolve the cached primary address for a partition.
    async fn refresh_primary(
        &self,
        region: &RegionEndpoint,
        partition: &PartitionKeyRangeId,
    ) -> BarrierResult<()>;

    /// Preferred read regions, most preferred first.
    fn list_regions(&self) -> Vec<RegionEndpoint>;
}
