//! Barrier Request Issuer
//!
//! Builds probes from session state and sends them through the transport,
//! refreshing the primary address first when the probe asks for it. Every
//! await is bounded by the session deadline and the caller's cancellation
//! token.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::deadline::bounded;
use super::errors::BarrierResult;
use super::probe::{BarrierProbe, ProbeTarget};
use super::region::{OperationContext, RegionEndpoint};
use super::session::BarrierSession;
use super::transport::{AddressCache, StoreTransport};
use crate::config::ConnectionMode;
use crate::observability::{Event, Logger, MetricsRegistry, Severity};
use crate::response::LogicalStoreResponse;

#[derive(Clone)]
pub struct BarrierIssuer {
    transport: Arc<dyn StoreTransport>,
    address_cache: Arc<dyn AddressCache>,
    connection_mode: ConnectionMode,
    metrics: Arc<MetricsRegistry>,
}

impl BarrierIssuer {
    pub fn new(
        transport: Arc<dyn StoreTransport>,
        address_cache: Arc<dyn AddressCache>,
        connection_mode: ConnectionMode,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            transport,
            address_cache,
            connection_mode,
            metrics,
        }
    }

    /// Record the next attempt on `session` and build its probe.
    pub fn next_probe(
        &self,
        session: &mut BarrierSession,
        operation: &OperationContext,
        target: ProbeTarget,
        force_refresh: bool,
    ) -> BarrierProbe {
        let attempt_number = session.record_probe(target, force_refresh);
        BarrierProbe {
            activity_id: session.activity_id(),
            target,
            force_refresh_address_cache: force_refresh,
            region: session.current_region().clone(),
            partition: operation.partition.clone(),
            resource_address: operation.resource_address.clone(),
            attempt_number,
            required_lsn: session.required_lsn(),
            connection_mode: self.connection_mode,
        }
    }

    /// Send one probe.
    pub async fn issue(
        &self,
        probe: &BarrierProbe,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> BarrierResult<LogicalStoreResponse> {
        self.metrics.increment_probes();
        if probe.targets_primary() {
            self.metrics.increment_primary_probes();
        }

        if Logger::enabled(Severity::Trace) {
            let activity_id = probe.activity_id.to_string();
            let attempt = probe.attempt_number.to_string();
            let required = probe.required_lsn.to_string();
            let force_refresh = probe.force_refresh_address_cache.to_string();
            Logger::trace(
                Event::BarrierProbe,
                &[
                    ("activity_id", activity_id.as_str()),
                    ("attempt", attempt.as_str()),
                    ("connection_mode", self.connection_mode.as_str()),
                    ("force_refresh", force_refresh.as_str()),
                    ("region", probe.region.as_str()),
                    ("required_lsn", required.as_str()),
                    ("target", probe.target.as_str()),
                ],
            );
        }

        let response =
            bounded(deadline, cancel, "barrier probe", self.refresh_and_send(probe)).await?;

        if response.is_lease_not_found() {
            self.metrics.increment_lease_not_found();
        }
        Ok(response)
    }

    async fn refresh_and_send(&self, probe: &BarrierProbe) -> BarrierResult<LogicalStoreResponse> {
        if probe.force_refresh_address_cache {
            self.address_cache
                .refresh_primary(&probe.region, &probe.partition)
                .await?;
            self.metrics.increment_address_refreshes();
            Logger::trace(
                Event::BarrierAddressRefresh,
                &[
                    ("partition", probe.partition.as_str()),
                    ("region", probe.region.as_str()),
                ],
            );
        }
        self.transport.send_probe(probe).await
    }

    /// Re-issue the original read in another region.
    pub async fn reread(
        &self,
        region: &RegionEndpoint,
        operation: &OperationContext,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> BarrierResult<LogicalStoreResponse> {
        bounded(
            deadline,
            cancel,
            "read re-issue",
            self.transport.read(region, operation),
        )
        .await
    }

    /// Regions the address cache would route reads to, most preferred first.
    pub fn list_regions(&self) -> Vec<RegionEndpoint> {
        self.address_cache.list_regions()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::{BarrierErrorKind, PartitionKeyRangeId};
    use crate::response::Lsn;
    use crate::sim::SimulatedStore;
    use std::time::Duration;

    fn operation() -> OperationContext {
        OperationContext::new(
            RegionEndpoint::new("west"),
            PartitionKeyRangeId::new("7"),
            "dbs/d/colls/c/docs/1",
        )
    }

    fn issuer(store: &Arc<SimulatedStore>, metrics: &Arc<MetricsRegistry>) -> BarrierIssuer {
        BarrierIssuer::new(
            store.clone(),
            store.clone(),
            ConnectionMode::Gateway,
            metrics.clone(),
        )
    }

    #[test]
    fn test_next_probe_reflects_session() {
        let store = Arc::new(SimulatedStore::new(["west"]));
        let metrics = Arc::new(MetricsRegistry::new());
        let issuer = issuer(&store, &metrics);
        let mut session = BarrierSession::open_write(
            Lsn::new(42),
            RegionEndpoint::new("west"),
            Instant::now() + Duration::from_secs(5),
        );

        let first = issuer.next_probe(&mut session, &operation(), ProbeTarget::ReplicaSet, false);
        let second = issuer.next_probe(&mut session, &operation(), ProbeTarget::Primary, true);

        assert_eq!(first.attempt_number, 1);
        assert_eq!(second.attempt_number, 2);
        assert_eq!(second.required_lsn, Lsn::new(42));
        assert_eq!(second.partition.as_str(), "7");
        assert_eq!(second.connection_mode, ConnectionMode::Gateway);
        assert_eq!(first.activity_id, second.activity_id);
        assert!(second.force_refresh_address_cache);
    }

    #[tokio::test]
    async fn test_primary_probe_refreshes_address_first() {
        let store = Arc::new(SimulatedStore::new(["west"]));
        store.script_probes([LogicalStoreResponse::lease_not_found()]);
        let metrics = Arc::new(MetricsRegistry::new());
        let issuer = issuer(&store, &metrics);
        let mut session = BarrierSession::open_write(
            Lsn::new(42),
            RegionEndpoint::new("west"),
            Instant::now() + Duration::from_secs(5),
        );

        let probe = issuer.next_probe(&mut session, &operation(), ProbeTarget::Primary, true);
        let response = issuer
            .issue(&probe, session.deadline(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(response.is_lease_not_found());
        assert_eq!(store.address_refreshes(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.probes_issued, 1);
        assert_eq!(snapshot.primary_probes, 1);
        assert_eq!(snapshot.address_refreshes, 1);
        assert_eq!(snapshot.lease_not_found, 1);
    }

    #[tokio::test]
    async fn test_cancelled_probe_is_not_sent() {
        let store = Arc::new(SimulatedStore::new(["west"]));
        let metrics = Arc::new(MetricsRegistry::new());
        let issuer = issuer(&store, &metrics);
        let mut session = BarrierSession::open_write(
            Lsn::new(42),
            RegionEndpoint::new("west"),
            Instant::now() + Duration::from_secs(5),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let probe = issuer.next_probe(&mut session, &operation(), ProbeTarget::ReplicaSet, false);
        let err = issuer.issue(&probe, session.deadline(), &cancel).await.unwrap_err();

        assert_eq!(err.kind, BarrierErrorKind::Cancelled);
        assert_eq!(store.probe_count(), 0);
    }
}
