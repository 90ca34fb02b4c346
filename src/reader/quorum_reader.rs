//! Quorum Reader
//!
//! A Strong read on a multi-region account is only returned once the read
//! LSN is globally committed. When the primary in the current region cannot
//! serve barriers, the read is re-issued in the next preferred region and
//! the same session continues there with the fresh read's LSN; attempt
//! budget and deadline are shared across regions. The fresh read is always
//! confirmed by at least one probe in its own region.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::barrier::{
    AddressCache, BarrierDriver, BarrierError, BarrierIssuer, BarrierResult, BarrierSession,
    DriveOutcome, EscalationPolicy, OperationContext, RegionEndpoint, SessionKind,
    StoreTransport,
};
use crate::config::CoordinatorConfig;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::response::LogicalStoreResponse;

/// A read whose LSN is confirmed globally committed, or that needed no
/// barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumRead {
    /// Latest read response; from another region after a failover
    pub response: LogicalStoreResponse,
    /// Probes issued across every region
    pub barrier_probes: u32,
    /// Regions the read was served from, in order
    pub regions_contacted: Vec<RegionEndpoint>,
    /// Barrier session id, if one was opened
    pub activity_id: Option<Uuid>,
}

pub struct QuorumReader {
    config: CoordinatorConfig,
    driver: BarrierDriver,
}

impl QuorumReader {
    pub fn new(
        config: CoordinatorConfig,
        transport: Arc<dyn StoreTransport>,
        address_cache: Arc<dyn AddressCache>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let issuer = BarrierIssuer::new(transport, address_cache, config.connection_mode, metrics);
        let driver = BarrierDriver::new(EscalationPolicy::new(config.barrier.clone()), issuer);
        Self { config, driver }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Whether `response` is a read the quorum check applies to.
    pub fn requires_quorum_check(&self, response: &LogicalStoreResponse) -> bool {
        self.config.is_strong() && response.is_multi_region() && response.status_code.is_success()
    }

    /// Failover order: configured preferred regions, else the address cache's.
    fn preferred_regions(&self) -> Vec<RegionEndpoint> {
        if self.config.preferred_regions.is_empty() {
            self.driver.issuer().list_regions()
        } else {
            self.config.preferred_regions()
        }
    }

    /// Confirm the read's LSN is globally committed, probing and failing over
    /// across regions as needed.
    pub async fn ensure_read_quorum(
        &self,
        read: &OperationContext,
        response: LogicalStoreResponse,
        cancel: &CancellationToken,
    ) -> BarrierResult<QuorumRead> {
        let served_from = vec![read.region.clone()];

        if !self.requires_quorum_check(&response) {
            self.driver.issuer().metrics().increment_barriers_skipped();
            return Ok(QuorumRead {
                response,
                barrier_probes: 0,
                regions_contacted: served_from,
                activity_id: None,
            });
        }

        let read_lsn = match response.read_lsn() {
            Some(lsn) => lsn,
            None => {
                return Err(self.driver.reject(
                    SessionKind::Read,
                    BarrierError::malformed_response("read response carries no lsn"),
                ))
            }
        };

        if response.is_globally_committed(read_lsn) {
            self.driver.issuer().metrics().increment_barriers_skipped();
            let lsn = read_lsn.to_string();
            Logger::trace(
                Event::ReadQuorumSatisfied,
                &[("read_lsn", lsn.as_str()), ("region", read.region.as_str())],
            );
            return Ok(QuorumRead {
                response,
                barrier_probes: 0,
                regions_contacted: served_from,
                activity_id: None,
            });
        }

        let deadline = read.started_at + self.config.request_timeout();
        let mut session = BarrierSession::open_read(
            read_lsn,
            read.region.clone(),
            self.preferred_regions(),
            deadline,
        );

        let lsn = read_lsn.to_string();
        let gclsn = response
            .global_committed_lsn
            .map(|l| l.to_string())
            .unwrap_or_default();
        Logger::info(
            Event::ReadBarrierBegin,
            &[
                ("activity_id", session.activity_id().to_string().as_str()),
                ("global_committed_lsn", gclsn.as_str()),
                ("read_lsn", lsn.as_str()),
                ("region", read.region.as_str()),
                ("resource", read.resource_address.as_str()),
            ],
        );

        let mut latest = response;
        let mut operation = read.clone();
        loop {
            match self.driver.drive(&mut session, &operation, cancel).await? {
                DriveOutcome::Met => break,
                DriveOutcome::SwitchRegion(region) => {
                    let (moved, fresh) = self
                        .driver
                        .switch_region(&mut session, region, read, cancel)
                        .await?;
                    // The next drive probes the new region even when the
                    // fresh read already looks committed. Eligibility was
                    // decided on the original response and is not re-checked.
                    operation = moved;
                    latest = fresh;
                }
            }
        }

        Ok(QuorumRead {
            response: latest,
            barrier_probes: session.attempts_made(),
            regions_contacted: session.regions_attempted().to_vec(),
            activity_id: Some(session.activity_id()),
        })
    }
}
