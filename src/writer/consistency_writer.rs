//! Consistency Writer
//!
//! After a write under Strong consistency on a multi-region account, the
//! write is only reported committed once some replica reports a global
//! committed LSN at or above the write's LSN. The write itself is never
//! re-issued and never leaves its region.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::barrier::{
    AddressCache, BarrierDriver, BarrierError, BarrierIssuer, BarrierResult, BarrierSession,
    DriveOutcome, EscalationPolicy, OperationContext, SessionKind, StoreTransport,
};
use crate::config::CoordinatorConfig;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::response::{LogicalStoreResponse, StatusCode, SubStatusCode};

/// A write whose global commit is confirmed, or that needed no barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// The original write response
    pub response: LogicalStoreResponse,
    /// Probes issued; zero when no barrier was needed
    pub barrier_probes: u32,
    /// Barrier session id, if one was opened
    pub activity_id: Option<Uuid>,
}

impl Committed {
    fn without_barrier(response: LogicalStoreResponse) -> Self {
        Self {
            response,
            barrier_probes: 0,
            activity_id: None,
        }
    }
}

pub struct ConsistencyWriter {
    config: CoordinatorConfig,
    driver: BarrierDriver,
}

impl ConsistencyWriter {
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

    /// Whether `response` is subject to the write barrier at all.
    ///
    /// Conflicts, failed preconditions and plain not-found still carry an
    /// LSN that must be globally committed before the outcome is final.
    pub fn requires_barrier(&self, response: &LogicalStoreResponse) -> bool {
        self.config.is_strong() && response.is_multi_region() && has_barrier_status(response)
    }

    /// Confirm global commit of a write, probing as needed.
    pub async fn ensure_write_committed(
        &self,
        write: &OperationContext,
        response: LogicalStoreResponse,
        cancel: &CancellationToken,
    ) -> BarrierResult<Committed> {
        if !self.requires_barrier(&response) {
            self.driver.issuer().metrics().increment_barriers_skipped();
            let status = response.status_code.to_string();
            let regions = response.number_of_read_regions.to_string();
            Logger::trace(
                Event::WriteBarrierSkipped,
                &[
                    ("consistency_level", self.config.consistency_level.as_str()),
                    ("read_regions", regions.as_str()),
                    ("status", status.as_str()),
                ],
            );
            return Ok(Committed::without_barrier(response));
        }

        let (lsn, global_committed) = match (response.lsn, response.global_committed_lsn) {
            (Some(lsn), Some(global_committed)) => (lsn, global_committed),
            (None, _) => {
                return Err(self.driver.reject(
                    SessionKind::Write,
                    BarrierError::malformed_response("write response carries no lsn"),
                ))
            }
            (Some(_), None) => {
                return Err(self.driver.reject(
                    SessionKind::Write,
                    BarrierError::malformed_response(
                        "write response carries no global committed lsn",
                    ),
                ))
            }
        };

        if global_committed >= lsn {
            self.driver.issuer().metrics().increment_barriers_skipped();
            return Ok(Committed::without_barrier(response));
        }

        let deadline = write.started_at + self.config.request_timeout();
        let mut session = BarrierSession::open_write(lsn, write.region.clone(), deadline);

        let lsn_field = lsn.to_string();
        let gclsn_field = global_committed.to_string();
        Logger::info(
            Event::WriteBarrierBegin,
            &[
                ("activity_id", session.activity_id().to_string().as_str()),
                ("global_committed_lsn", gclsn_field.as_str()),
                ("lsn", lsn_field.as_str()),
                ("region", write.region.as_str()),
                ("resource", write.resource_address.as_str()),
            ],
        );

        match self.driver.drive(&mut session, write, cancel).await? {
            DriveOutcome::Met => Ok(Committed {
                response,
                barrier_probes: session.attempts_made(),
                activity_id: Some(session.activity_id()),
            }),
            DriveOutcome::SwitchRegion(region) => Err(BarrierError::barrier_not_met(format!(
                "write barrier cannot move to region {}",
                region
            ))),
        }
    }
}

fn has_barrier_status(response: &LogicalStoreResponse) -> bool {
    let status = response.status_code;
    status.is_success()
        || status == StatusCode::CONFLICT
        || status == StatusCode::PRECONDITION_FAILED
        || (status == StatusCode::NOT_FOUND
            && response.sub_status_code != SubStatusCode::READ_SESSION_NOT_AVAILABLE)
}
