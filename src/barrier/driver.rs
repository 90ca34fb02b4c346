//! Barrier Driver
//!
//! Runs one barrier session: asks the policy for the next action, applies it
//! to the session, performs the I/O it calls for and feeds the observation
//! back. The loop stops on the first terminal action, or when a switch to
//! another region needs the caller to re-issue its read.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::deadline::pause;
use super::errors::{BarrierError, BarrierErrorKind, BarrierResult};
use super::issuer::BarrierIssuer;
use super::policy::{EscalationPolicy, EscalationState, FailureCause, NextAction, ProbeObservation};
use super::probe::ProbeTarget;
use super::region::{OperationContext, RegionEndpoint};
use super::session::{BarrierSession, SessionKind};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::response::{LogicalStoreResponse, Lsn};

/// How a drive ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    /// Required LSN observed as globally committed
    Met,
    /// Current region exhausted; re-issue the read in `region` and continue
    /// the same session there
    SwitchRegion(RegionEndpoint),
}

#[derive(Clone)]
pub struct BarrierDriver {
    policy: EscalationPolicy,
    issuer: BarrierIssuer,
}

impl BarrierDriver {
    pub fn new(policy: EscalationPolicy, issuer: BarrierIssuer) -> Self {
        Self { policy, issuer }
    }

    pub fn issuer(&self) -> &BarrierIssuer {
        &self.issuer
    }

    fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.issuer.metrics()
    }

    /// Drive `session` from its current state.
    pub async fn drive(
        &self,
        session: &mut BarrierSession,
        operation: &OperationContext,
        cancel: &CancellationToken,
    ) -> BarrierResult<DriveOutcome> {
        if cancel.is_cancelled() {
            return Err(self.abort(
                session,
                BarrierError::cancelled("cancelled before barrier probe"),
            ));
        }

        let mut action = self.policy.first_action(session, Instant::now());
        loop {
            let previous = session.state();
            session.advance(&action);

            match action {
                NextAction::Complete => {
                    self.met(session);
                    return Ok(DriveOutcome::Met);
                }
                NextAction::Fail(cause) => return Err(self.fail(session, cause)),
                NextAction::SwitchRegion { region } => {
                    self.metrics().increment_region_failovers();
                    let lease_failures = session.primary_lease_failures().to_string();
                    Logger::warn(
                        Event::BarrierRegionFailover,
                        &[
                            ("activity_id", session.activity_id().to_string().as_str()),
                            ("from_region", session.current_region().as_str()),
                            ("primary_lease_failures", lease_failures.as_str()),
                            ("to_region", region.as_str()),
                        ],
                    );
                    return Ok(DriveOutcome::SwitchRegion(region));
                }
                NextAction::Probe {
                    target,
                    force_refresh,
                    delay,
                } => {
                    if target == ProbeTarget::Primary && previous == EscalationState::ProbingReplica {
                        Logger::warn(
                            Event::BarrierEscalatePrimary,
                            &[
                                ("activity_id", session.activity_id().to_string().as_str()),
                                ("region", session.current_region().as_str()),
                            ],
                        );
                    }

                    if !delay.is_zero() {
                        if let Err(e) = pause(delay, session.deadline(), cancel).await {
                            return Err(self.abort(session, e));
                        }
                    }

                    let probe = self.issuer.next_probe(session, operation, target, force_refresh);
                    let observation = match self
                        .issuer
                        .issue(&probe, session.deadline(), cancel)
                        .await
                        .and_then(|r| ProbeObservation::classify(&r, probe.required_lsn))
                    {
                        Ok(observation) => observation,
                        Err(e) => return Err(self.abort(session, e)),
                    };

                    session.observe(&observation);
                    action = self.policy.next_action(session, &observation, Instant::now());
                }
            }
        }
    }

    /// Re-issue the read in `region` and restart `session` there with the
    /// fresh response's read LSN.
    pub async fn switch_region(
        &self,
        session: &mut BarrierSession,
        region: RegionEndpoint,
        read: &OperationContext,
        cancel: &CancellationToken,
    ) -> BarrierResult<(OperationContext, LogicalStoreResponse)> {
        let operation = read.in_region(region.clone());
        let fresh = match self
            .issuer
            .reread(&region, &operation, session.deadline(), cancel)
            .await
            .and_then(|r| Self::fresh_read_lsn(&r).map(|lsn| (r, lsn)))
        {
            Ok(fresh) => fresh,
            Err(e) => return Err(self.abort(session, e)),
        };
        let (response, read_lsn) = fresh;

        session.restart_in_region(region, read_lsn);
        let lsn = read_lsn.to_string();
        Logger::info(
            Event::ReadReissued,
            &[
                ("activity_id", session.activity_id().to_string().as_str()),
                ("read_lsn", lsn.as_str()),
                ("region", session.current_region().as_str()),
            ],
        );
        Ok((operation, response))
    }

    fn fresh_read_lsn(response: &LogicalStoreResponse) -> BarrierResult<Lsn> {
        if !response.status_code.is_success() {
            return Err(BarrierError::transport(
                response.status_code,
                response.sub_status_code,
                format!(
                    "re-issued read returned {}/{}",
                    response.status_code, response.sub_status_code
                ),
            ));
        }
        response
            .read_lsn()
            .ok_or_else(|| BarrierError::malformed_response("re-issued read carries no lsn"))
    }

    fn met(&self, session: &BarrierSession) {
        self.metrics().increment_barriers_met();
        let attempts = session.attempts_made().to_string();
        let required = session.required_lsn().to_string();
        Logger::info(
            Event::BarrierMet,
            &[
                ("activity_id", session.activity_id().to_string().as_str()),
                ("attempts", attempts.as_str()),
                ("kind", session.kind().as_str()),
                ("region", session.current_region().as_str()),
                ("required_lsn", required.as_str()),
            ],
        );
    }

    /// Turn a policy failure into the error the caller sees.
    fn fail(&self, session: &BarrierSession, cause: FailureCause) -> BarrierError {
        let seen = session
            .max_global_committed_lsn()
            .map(|lsn| lsn.to_string())
            .unwrap_or_else(|| "none".to_string());
        let detail = format!(
            "{} barrier for lsn {} not met after {} probes in {} region(s); highest global committed lsn seen {}",
            session.kind().as_str(),
            session.required_lsn(),
            session.attempts_made(),
            session.regions_attempted().len(),
            seen
        );

        let err = match cause {
            FailureCause::AttemptsExhausted
                if session.kind() == SessionKind::Read && session.regions_attempted().len() > 1 =>
            {
                BarrierError::service_unavailable(detail)
            }
            FailureCause::AttemptsExhausted => BarrierError::barrier_not_met(detail),
            FailureCause::DeadlineElapsed => BarrierError::timeout(detail),
            FailureCause::Cancelled => BarrierError::cancelled(detail),
            FailureCause::Fatal => BarrierError::malformed_response(detail),
        };
        self.failed(session, cause, &err);
        err
    }

    /// Account for a `kind` operation whose response cannot open a session.
    pub fn reject(&self, kind: SessionKind, err: BarrierError) -> BarrierError {
        self.metrics().increment_barriers_failed();
        let status = err.status_code().to_string();
        Logger::error(
            Event::BarrierFailed,
            &[
                ("attempts", "0"),
                ("cause", FailureCause::Fatal.as_str()),
                ("kind", kind.as_str()),
                ("message", err.message.as_str()),
                ("status", status.as_str()),
            ],
        );
        err
    }

    /// Terminate the session on an error raised by I/O or classification.
    fn abort(&self, session: &mut BarrierSession, err: BarrierError) -> BarrierError {
        let cause = match err.kind {
            BarrierErrorKind::Timeout => FailureCause::DeadlineElapsed,
            BarrierErrorKind::Cancelled => FailureCause::Cancelled,
            _ => FailureCause::Fatal,
        };
        session.advance(&NextAction::Fail(cause));
        self.failed(session, cause, &err);
        err
    }

    fn failed(&self, session: &BarrierSession, cause: FailureCause, err: &BarrierError) {
        self.metrics().increment_barriers_failed();
        let attempts = session.attempts_made().to_string();
        let required = session.required_lsn().to_string();
        let status = err.status_code().to_string();
        let seen = session
            .max_global_committed_lsn()
            .map(|lsn| lsn.to_string())
            .unwrap_or_default();
        Logger::error(
            Event::BarrierFailed,
            &[
                ("activity_id", session.activity_id().to_string().as_str()),
                ("attempts", attempts.as_str()),
                ("cause", cause.as_str()),
                ("kind", session.kind().as_str()),
                ("max_global_committed_lsn", seen.as_str()),
                ("message", err.message.as_str()),
                ("required_lsn", required.as_str()),
                ("status", status.as_str()),
            ],
        );
    }
}
