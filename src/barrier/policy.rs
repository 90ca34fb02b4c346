//! Region/Replica Escalation Policy
//!
//! ```text
//!   ProbingReplica --410/1022--> ProbingPrimary --410/1022 (read, regions left)--> ProbingNextRegion
//!        |                         |   ^    |                                           |
//!        |                         |   |____| 410/1022 or behind                        | re-read
//!        |                         |                                                    v
//!        +-------committed---------+----------------> Succeeded          ProbingReplica (next region)
//!
//!   any state --budget or deadline--> Failed
//! ```
//!
//! The policy is a pure function of the session and the latest observation.
//! It never performs I/O and never mutates the session; the driver applies
//! the returned action.

use std::time::Duration;

use tokio::time::Instant;

use super::errors::{BarrierError, BarrierResult};
use super::probe::ProbeTarget;
use super::region::RegionEndpoint;
use super::session::{BarrierSession, SessionKind};
use crate::config::BarrierConfig;
use crate::response::{LogicalStoreResponse, Lsn};

/// Escalation state of a barrier session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    /// Probing the replica set that served the operation
    ProbingReplica,
    /// Probing the primary with a forced address refresh
    ProbingPrimary,
    /// Current region exhausted, moving the read to the next region
    ProbingNextRegion,
    /// Required LSN observed as globally committed
    Succeeded,
    /// Budget, deadline, cancellation, or fatal response
    Failed(FailureCause),
}

impl EscalationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::ProbingReplica => "ProbingReplica",
            Self::ProbingPrimary => "ProbingPrimary",
            Self::ProbingNextRegion => "ProbingNextRegion",
            Self::Succeeded => "Succeeded",
            Self::Failed(_) => "Failed",
        }
    }
}

/// Why a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    AttemptsExhausted,
    DeadlineElapsed,
    Cancelled,
    Fatal,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttemptsExhausted => "attempts_exhausted",
            Self::DeadlineElapsed => "deadline_elapsed",
            Self::Cancelled => "cancelled",
            Self::Fatal => "fatal",
        }
    }
}

/// What one probe response says about the required LSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeObservation {
    /// `global_committed_lsn >= required`
    Committed { global_committed_lsn: Lsn },
    /// Probe served, but global commit has not caught up yet
    Behind { global_committed_lsn: Option<Lsn> },
    /// 410/1022: the target cannot serve barrier checks
    LeaseNotFound,
}

impl ProbeObservation {
    /// Classify a probe response against the required LSN.
    ///
    /// Only success responses and 410/1022 are observations; any other
    /// status is returned as a transport error and is not retried.
    pub fn classify(response: &LogicalStoreResponse, required: Lsn) -> BarrierResult<Self> {
        if response.is_lease_not_found() {
            return Ok(Self::LeaseNotFound);
        }

        if !response.status_code.is_success() {
            return Err(BarrierError::transport(
                response.status_code,
                response.sub_status_code,
                format!(
                    "barrier probe returned {}/{}",
                    response.status_code, response.sub_status_code
                ),
            ));
        }

        match response.global_committed_lsn {
            Some(committed) if committed >= required => Ok(Self::Committed {
                global_committed_lsn: committed,
            }),
            committed => Ok(Self::Behind {
                global_committed_lsn: committed,
            }),
        }
    }
}

/// Next step for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Barrier met; stop probing
    Complete,
    /// Issue another probe after `delay`
    Probe {
        target: ProbeTarget,
        force_refresh: bool,
        delay: Duration,
    },
    /// Re-run the read in `region`
    SwitchRegion { region: RegionEndpoint },
    /// Give up
    Fail(FailureCause),
}

/// Escalation decisions for barrier sessions.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    config: BarrierConfig,
}

impl EscalationPolicy {
    pub fn new(config: BarrierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    /// First action of a session, or of a session restarted in a new region.
    pub fn first_action(&self, session: &BarrierSession, now: Instant) -> NextAction {
        if let Some(cause) = self.budget_exhausted(session, now) {
            return NextAction::Fail(cause);
        }
        NextAction::Probe {
            target: ProbeTarget::ReplicaSet,
            force_refresh: false,
            delay: Duration::ZERO,
        }
    }

    /// Decide what follows `observation`.
    pub fn next_action(
        &self,
        session: &BarrierSession,
        observation: &ProbeObservation,
        now: Instant,
    ) -> NextAction {
        if let ProbeObservation::Committed { .. } = observation {
            return NextAction::Complete;
        }

        if let Some(cause) = self.budget_exhausted(session, now) {
            return NextAction::Fail(cause);
        }

        match (session.state(), observation) {
            (EscalationState::ProbingReplica, ProbeObservation::LeaseNotFound) => {
                self.probe_primary(Duration::ZERO)
            }
            (EscalationState::ProbingReplica, _) => NextAction::Probe {
                target: ProbeTarget::ReplicaSet,
                force_refresh: false,
                delay: self.retry_delay(session.attempts_made()),
            },
            (EscalationState::ProbingPrimary, ProbeObservation::LeaseNotFound) => {
                if let Some(region) = self.failover_region(session) {
                    return NextAction::SwitchRegion { region };
                }
                self.probe_primary(self.retry_delay(session.attempts_made()))
            }
            (EscalationState::ProbingPrimary, _) => {
                self.probe_primary(self.retry_delay(session.attempts_made()))
            }
            (EscalationState::ProbingNextRegion, _) => NextAction::Probe {
                target: ProbeTarget::ReplicaSet,
                force_refresh: false,
                delay: Duration::ZERO,
            },
            (EscalationState::Succeeded, _) => NextAction::Complete,
            (EscalationState::Failed(cause), _) => NextAction::Fail(cause),
        }
    }

    /// Delay before the next retry, given how many probes were already made.
    pub fn retry_delay(&self, attempts_made: u32) -> Duration {
        if attempts_made > self.config.short_retry_attempts {
            self.config.retry_interval()
        } else {
            self.config.short_retry_interval()
        }
    }

    fn probe_primary(&self, delay: Duration) -> NextAction {
        NextAction::Probe {
            target: ProbeTarget::Primary,
            force_refresh: true,
            delay,
        }
    }

    // Writes are pinned to their region; only reads fail over.
    fn failover_region(&self, session: &BarrierSession) -> Option<RegionEndpoint> {
        if session.kind() != SessionKind::Read {
            return None;
        }
        if session.primary_lease_failures() < self.config.primary_lease_failures_before_failover {
            return None;
        }
        session.next_unattempted_region().cloned()
    }

    fn budget_exhausted(&self, session: &BarrierSession, now: Instant) -> Option<FailureCause> {
        if session.attempts_made() >= self.config.max_attempts {
            return Some(FailureCause::AttemptsExhausted);
        }
        if now >= session.deadline() {
            return Some(FailureCause::DeadlineElapsed);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::StatusCode;

    fn policy() -> EscalationPolicy {
        EscalationPolicy::new(BarrierConfig::default())
    }

    fn far() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn write_session() -> BarrierSession {
        BarrierSession::open_write(Lsn::new(100), RegionEndpoint::new("west"), far())
    }

    fn read_session(regions: &[&str]) -> BarrierSession {
        BarrierSession::open_read(
            Lsn::new(100),
            RegionEndpoint::new(regions[0]),
            regions.iter().map(|r| RegionEndpoint::new(*r)).collect(),
            far(),
        )
    }

    fn probe_and_observe(
        policy: &EscalationPolicy,
        session: &mut BarrierSession,
        action: NextAction,
        observation: ProbeObservation,
    ) -> NextAction {
        session.advance(&action);
        if let NextAction::Probe {
            target,
            force_refresh,
            ..
        } = action
        {
            session.record_probe(target, force_refresh);
        }
        session.observe(&observation);
        policy.next_action(session, &observation, Instant::now())
    }

    #[test]
    fn test_classify() {
        let required = Lsn::new(100);

        let met = LogicalStoreResponse::new(StatusCode::OK).with_global_committed_lsn(100);
        assert_eq!(
            ProbeObservation::classify(&met, required).unwrap(),
            ProbeObservation::Committed {
                global_committed_lsn: Lsn::new(100)
            }
        );

        let behind = LogicalStoreResponse::new(StatusCode::OK).with_global_committed_lsn(50);
        assert_eq!(
            ProbeObservation::classify(&behind, required).unwrap(),
            ProbeObservation::Behind {
                global_committed_lsn: Some(Lsn::new(50))
            }
        );

        let lease = LogicalStoreResponse::lease_not_found();
        assert_eq!(
            ProbeObservation::classify(&lease, required).unwrap(),
            ProbeObservation::LeaseNotFound
        );

        let other_gone = LogicalStoreResponse::new(StatusCode::GONE);
        assert!(ProbeObservation::classify(&other_gone, required)
            .unwrap_err()
            .is_fatal());
    }

    #[test]
    fn test_first_action_probes_replica_set() {
        let session = write_session();
        assert_eq!(
            policy().first_action(&session, Instant::now()),
            NextAction::Probe {
                target: ProbeTarget::ReplicaSet,
                force_refresh: false,
                delay: Duration::ZERO,
            }
        );
    }

    #[test]
    fn test_lease_not_found_on_replica_escalates_to_primary() {
        let policy = policy();
        let mut session = write_session();
        let first = policy.first_action(&session, Instant::now());

        let next = probe_and_observe(&policy, &mut session, first, ProbeObservation::LeaseNotFound);
        assert_eq!(
            next,
            NextAction::Probe {
                target: ProbeTarget::Primary,
                force_refresh: true,
                delay: Duration::ZERO,
            }
        );
    }

    #[test]
    fn test_committed_completes_from_any_state() {
        let policy = policy();
        let mut session = write_session();
        let committed = ProbeObservation::Committed {
            global_committed_lsn: Lsn::new(100),
        };

        assert_eq!(
            policy.next_action(&session, &committed, Instant::now()),
            NextAction::Complete
        );

        session.advance(&policy.probe_primary(Duration::ZERO));
        assert_eq!(
            policy.next_action(&session, &committed, Instant::now()),
            NextAction::Complete
        );
    }

    #[test]
    fn test_primary_self_loop_keeps_force_refresh() {
        let policy = policy();
        let mut session = write_session();
        let mut action = policy.first_action(&session, Instant::now());

        for _ in 0..5 {
            action = probe_and_observe(&policy, &mut session, action, ProbeObservation::LeaseNotFound);
            match action {
                NextAction::Probe {
                    target,
                    force_refresh,
                    ..
                } => {
                    assert_eq!(target, ProbeTarget::Primary);
                    assert!(force_refresh);
                }
                ref other => panic!("unexpected action {:?}", other),
            }
        }
    }

    #[test]
    fn test_write_never_switches_region() {
        let policy = policy();
        let mut session = BarrierSession::open_write(Lsn::new(100), RegionEndpoint::new("west"), far());
        let mut action = policy.first_action(&session, Instant::now());

        for _ in 0..10 {
            action = probe_and_observe(&policy, &mut session, action, ProbeObservation::LeaseNotFound);
            assert!(!matches!(action, NextAction::SwitchRegion { .. }));
        }
    }

    #[test]
    fn test_read_switches_region_after_primary_lease_failure() {
        let policy = policy();
        let mut session = read_session(&["west", "east"]);
        let first = policy.first_action(&session, Instant::now());

        let primary = probe_and_observe(&policy, &mut session, first, ProbeObservation::LeaseNotFound);
        let next = probe_and_observe(&policy, &mut session, primary, ProbeObservation::LeaseNotFound);
        assert_eq!(
            next,
            NextAction::SwitchRegion {
                region: RegionEndpoint::new("east")
            }
        );
    }

    #[test]
    fn test_read_without_spare_region_loops_on_primary() {
        let policy = policy();
        let mut session = read_session(&["west"]);
        let first = policy.first_action(&session, Instant::now());

        let primary = probe_and_observe(&policy, &mut session, first, ProbeObservation::LeaseNotFound);
        let next = probe_and_observe(&policy, &mut session, primary, ProbeObservation::LeaseNotFound);
        assert!(matches!(
            next,
            NextAction::Probe {
                target: ProbeTarget::Primary,
                force_refresh: true,
                ..
            }
        ));
    }

    #[test]
    fn test_behind_retries_same_tier_with_delay() {
        let policy = policy();
        let mut session = write_session();
        let first = policy.first_action(&session, Instant::now());

        let next = probe_and_observe(
            &policy,
            &mut session,
            first,
            ProbeObservation::Behind {
                global_committed_lsn: Some(Lsn::new(10)),
            },
        );
        assert_eq!(
            next,
            NextAction::Probe {
                target: ProbeTarget::ReplicaSet,
                force_refresh: false,
                delay: policy.config().short_retry_interval(),
            }
        );
    }

    #[test]
    fn test_attempt_budget_fails_session() {
        let config = BarrierConfig {
            max_attempts: 3,
            ..BarrierConfig::default()
        };
        let policy = EscalationPolicy::new(config);
        let mut session = write_session();
        let mut action = policy.first_action(&session, Instant::now());

        let mut probes = 0;
        while let NextAction::Probe { .. } = action {
            probes += 1;
            action = probe_and_observe(&policy, &mut session, action, ProbeObservation::LeaseNotFound);
        }

        assert_eq!(probes, 3);
        assert_eq!(action, NextAction::Fail(FailureCause::AttemptsExhausted));
        assert_eq!(session.attempts_made(), 3);
    }

    #[test]
    fn test_deadline_fails_session() {
        let policy = policy();
        let session = BarrierSession::open_write(
            Lsn::new(100),
            RegionEndpoint::new("west"),
            Instant::now(),
        );
        assert_eq!(
            policy.next_action(&session, &ProbeObservation::LeaseNotFound, Instant::now()),
            NextAction::Fail(FailureCause::DeadlineElapsed)
        );
    }

    #[test]
    fn test_retry_delay_short_then_long() {
        let policy = policy();
        let config = policy.config().clone();

        assert_eq!(policy.retry_delay(1), config.short_retry_interval());
        assert_eq!(
            policy.retry_delay(config.short_retry_attempts),
            config.short_retry_interval()
        );
        assert_eq!(
            policy.retry_delay(config.short_retry_attempts + 1),
            config.retry_interval()
        );
    }
}
