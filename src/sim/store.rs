//! Scriptable in-memory store
//!
//! Implements both collaborator traits. Probe and read responses are popped
//! from per-region scripts first, then a global script, then a default.
//! Every probe, read and address refresh is recorded for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::barrier::{
    AddressCache, BarrierError, BarrierProbe, BarrierResult, OperationContext,
    PartitionKeyRangeId, RegionEndpoint, StoreTransport,
};
use crate::response::{LogicalStoreResponse, StatusCode, SubStatusCode};

#[derive(Debug, Default)]
struct SimState {
    probe_script: VecDeque<LogicalStoreResponse>,
    region_probe_scripts: HashMap<RegionEndpoint, VecDeque<LogicalStoreResponse>>,
    default_probe: Option<LogicalStoreResponse>,
    read_scripts: HashMap<RegionEndpoint, VecDeque<LogicalStoreResponse>>,
    default_read: Option<LogicalStoreResponse>,
    probe_latency: Duration,
    probes: Vec<BarrierProbe>,
    reads: Vec<RegionEndpoint>,
    refreshes: Vec<(RegionEndpoint, PartitionKeyRangeId)>,
}

/// In-memory `StoreTransport` + `AddressCache`.
///
/// With nothing scripted, a probe reports its own required LSN as globally
/// committed and a read fails with 503.
#[derive(Debug)]
pub struct SimulatedStore {
    regions: Vec<RegionEndpoint>,
    state: Mutex<SimState>,
}

impl SimulatedStore {
    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regions: regions
                .into_iter()
                .map(|r| RegionEndpoint::new(r.into()))
                .collect(),
            state: Mutex::new(SimState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue probe responses for any region.
    pub fn script_probes<I>(&self, responses: I)
    where
        I: IntoIterator<Item = LogicalStoreResponse>,
    {
        self.state().probe_script.extend(responses);
    }

    /// Queue probe responses for one region; these win over the global script.
    pub fn script_region_probes<I>(&self, region: &str, responses: I)
    where
        I: IntoIterator<Item = LogicalStoreResponse>,
    {
        self.state()
            .region_probe_scripts
            .entry(RegionEndpoint::new(region))
            .or_default()
            .extend(responses);
    }

    /// Response for probes once the scripts run dry.
    pub fn set_default_probe_response(&self, response: LogicalStoreResponse) {
        self.state().default_probe = Some(response);
    }

    /// Queue responses for reads re-issued in `region`.
    pub fn script_reads<I>(&self, region: &str, responses: I)
    where
        I: IntoIterator<Item = LogicalStoreResponse>,
    {
        self.state()
            .read_scripts
            .entry(RegionEndpoint::new(region))
            .or_default()
            .extend(responses);
    }

    pub fn set_default_read_response(&self, response: LogicalStoreResponse) {
        self.state().default_read = Some(response);
    }

    /// Delay every probe by `latency` before answering.
    pub fn set_probe_latency(&self, latency: Duration) {
        self.state().probe_latency = latency;
    }

    pub fn probes(&self) -> Vec<BarrierProbe> {
        self.state().probes.clone()
    }

    pub fn probe_count(&self) -> usize {
        self.state().probes.len()
    }

    pub fn primary_probe_count(&self) -> usize {
        self.state()
            .probes
            .iter()
            .filter(|p| p.targets_primary())
            .count()
    }

    pub fn force_refresh_probe_count(&self) -> usize {
        self.state()
            .probes
            .iter()
            .filter(|p| p.force_refresh_address_cache)
            .count()
    }

    /// Distinct regions probed, in first-probe order.
    pub fn regions_probed(&self) -> Vec<RegionEndpoint> {
        let state = self.state();
        let mut seen: Vec<RegionEndpoint> = Vec::new();
        for probe in &state.probes {
            if !seen.contains(&probe.region) {
                seen.push(probe.region.clone());
            }
        }
        seen
    }

    pub fn reads(&self) -> Vec<RegionEndpoint> {
        self.state().reads.clone()
    }

    pub fn address_refreshes(&self) -> usize {
        self.state().refreshes.len()
    }

    fn next_probe_response(&self, probe: &BarrierProbe) -> (LogicalStoreResponse, Duration) {
        let mut guard = self.state();
        let state = &mut *guard;
        state.probes.push(probe.clone());

        let scripted = state
            .region_probe_scripts
            .get_mut(&probe.region)
            .and_then(|script| script.pop_front())
            .or_else(|| state.probe_script.pop_front());

        let response = scripted
            .or_else(|| state.default_probe.clone())
            .unwrap_or_else(|| {
                LogicalStoreResponse::new(StatusCode::OK)
                    .with_lsn(probe.required_lsn.value())
                    .with_global_committed_lsn(probe.required_lsn.value())
            });
        (response, state.probe_latency)
    }
}

#[async_trait]
impl StoreTransport for SimulatedStore {
    async fn send_probe(&self, probe: &BarrierProbe) -> BarrierResult<LogicalStoreResponse> {
        let (response, latency) = self.next_probe_response(probe);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(response)
    }

    async fn read(
        &self,
        region: &RegionEndpoint,
        _operation: &OperationContext,
    ) -> BarrierResult<LogicalStoreResponse> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.reads.push(region.clone());

        let scripted = state
            .read_scripts
            .get_mut(region)
            .and_then(|script| script.pop_front());
        match scripted.or_else(|| state.default_read.clone()) {
            Some(response) => Ok(response),
            None => Err(BarrierError::transport(
                StatusCode::SERVICE_UNAVAILABLE,
                SubStatusCode::UNKNOWN,
                format!("no read scripted for region {}", region),
            )),
        }
    }
}

#[async_trait]
impl AddressCache for SimulatedStore {
    async fn refresh_primary(
        &self,
        region: &RegionEndpoint,
        partition: &PartitionKeyRangeId,
    ) -> BarrierResult<()> {
        self.state()
            .refreshes
            .push((region.clone(), partition.clone()));
        Ok(())
    }

    fn list_regions(&self) -> Vec<RegionEndpoint> {
        self.regions.clone()
    }
}
