//! Per-request barrier session state.
//!
//! A session is owned by exactly one request. It carries the attempt budget,
//! the escalation state and the deadline; nothing here is shared across
//! requests.

use tokio::time::Instant;
use uuid::Uuid;

use super::policy::{EscalationState, NextAction, ProbeObservation};
use super::probe::ProbeTarget;
use super::region::RegionEndpoint;
use crate::response::Lsn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Write,
    Read,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BarrierSession {
    activity_id: Uuid,
    kind: SessionKind,
    required_lsn: Lsn,
    state: EscalationState,
    attempts_made: u32,
    primary_probes: u32,
    force_refresh_probes: u32,
    primary_lease_failures: u32,
    current_region: RegionEndpoint,
    preferred_regions: Vec<RegionEndpoint>,
    regions_attempted: Vec<RegionEndpoint>,
    deadline: Instant,
    max_global_committed_lsn: Option<Lsn>,
}

impl BarrierSession {
    /// Session for a write: probes stay in the write region.
    pub fn open_write(required_lsn: Lsn, region: RegionEndpoint, deadline: Instant) -> Self {
        Self::open(SessionKind::Write, required_lsn, region, Vec::new(), deadline)
    }

    /// Session for a read: may fail over across `preferred_regions`.
    pub fn open_read(
        required_lsn: Lsn,
        region: RegionEndpoint,
        preferred_regions: Vec<RegionEndpoint>,
        deadline: Instant,
    ) -> Self {
        Self::open(
            SessionKind::Read,
            required_lsn,
            region,
            preferred_regions,
            deadline,
        )
    }

    fn open(
        kind: SessionKind,
        required_lsn: Lsn,
        region: RegionEndpoint,
        preferred_regions: Vec<RegionEndpoint>,
        deadline: Instant,
    ) -> Self {
        Self {
            activity_id: Uuid::new_v4(),
            kind,
            required_lsn,
            state: EscalationState::ProbingReplica,
            attempts_made: 0,
            primary_probes: 0,
            force_refresh_probes: 0,
            primary_lease_failures: 0,
            regions_attempted: vec![region.clone()],
            current_region: region,
            preferred_regions,
            deadline,
            max_global_committed_lsn: None,
        }
    }

    pub fn activity_id(&self) -> Uuid {
        self.activity_id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn required_lsn(&self) -> Lsn {
        self.required_lsn
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    /// Probes issued so far, across all regions.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn primary_probes(&self) -> u32 {
        self.primary_probes
    }

    pub fn force_refresh_probes(&self) -> u32 {
        self.force_refresh_probes
    }

    /// Consecutive 410/1022 from the primary in the current region.
    pub fn primary_lease_failures(&self) -> u32 {
        self.primary_lease_failures
    }

    pub fn current_region(&self) -> &RegionEndpoint {
        &self.current_region
    }

    pub fn regions_attempted(&self) -> &[RegionEndpoint] {
        &self.regions_attempted
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Highest global committed LSN any probe reported.
    pub fn max_global_committed_lsn(&self) -> Option<Lsn> {
        self.max_global_committed_lsn
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// First preferred region this session has not been in yet.
    pub fn next_unattempted_region(&self) -> Option<&RegionEndpoint> {
        self.preferred_regions
            .iter()
            .find(|region| !self.regions_attempted.contains(region))
    }

    /// Count a probe about to be sent. Returns its 1-based attempt number.
    pub fn record_probe(&mut self, target: ProbeTarget, force_refresh: bool) -> u32 {
        self.attempts_made += 1;
        if target == ProbeTarget::Primary {
            self.primary_probes += 1;
        }
        if force_refresh {
            self.force_refresh_probes += 1;
        }
        self.attempts_made
    }

    /// Fold a probe observation into the session.
    pub fn observe(&mut self, observation: &ProbeObservation) {
        match observation {
            ProbeObservation::Committed {
                global_committed_lsn,
            } => self.raise_global_committed(Some(*global_committed_lsn)),
            ProbeObservation::Behind {
                global_committed_lsn,
            } => {
                self.raise_global_committed(*global_committed_lsn);
                if self.state == EscalationState::ProbingPrimary {
                    self.primary_lease_failures = 0;
                }
            }
            ProbeObservation::LeaseNotFound => {
                if self.state == EscalationState::ProbingPrimary {
                    self.primary_lease_failures += 1;
                }
            }
        }
    }

    /// Move to the state implied by `action`. Terminal states are sticky.
    pub fn advance(&mut self, action: &NextAction) {
        if self.state.is_terminal() {
            return;
        }
        self.state = match action {
            NextAction::Complete => EscalationState::Succeeded,
            NextAction::Probe {
                target: ProbeTarget::ReplicaSet,
                ..
            } => EscalationState::ProbingReplica,
            NextAction::Probe {
                target: ProbeTarget::Primary,
                ..
            } => EscalationState::ProbingPrimary,
            NextAction::SwitchRegion { .. } => EscalationState::ProbingNextRegion,
            NextAction::Fail(cause) => EscalationState::Failed(*cause),
        };
    }

    /// Continue in `region` after the read there returned a new read LSN.
    /// Attempt budget and deadline carry over.
    pub fn restart_in_region(&mut self, region: RegionEndpoint, required_lsn: Lsn) {
        if !self.regions_attempted.contains(&region) {
            self.regions_attempted.push(region.clone());
        }
        self.current_region = region;
        self.required_lsn = required_lsn;
        self.primary_lease_failures = 0;
        self.max_global_committed_lsn = None;
        self.state = EscalationState::ProbingReplica;
    }

    fn raise_global_committed(&mut self, candidate: Option<Lsn>) {
        if let Some(lsn) = candidate {
            self.max_global_committed_lsn = Some(match self.max_global_committed_lsn {
                Some(current) => current.max(lsn),
                None => lsn,
            });
        }
    }
}
