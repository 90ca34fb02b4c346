//! Canonical barrier scenarios against the simulated store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::store::SimulatedStore;
use crate::barrier::{OperationContext, PartitionKeyRangeId, RegionEndpoint};
use crate::config::CoordinatorConfig;
use crate::observability::{Event, Logger, MetricsRegistry, MetricsSnapshot};
use crate::reader::QuorumReader;
use crate::response::{LogicalStoreResponse, StatusCode};
use crate::writer::ConsistencyWriter;

const WRITE_LSN: u64 = 100;
const STALE_GCLSN: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Replica set loses its lease, primary confirms the write
    WriteLeaseFailover,
    /// Replica set loses its lease, primary confirms the read
    ReadLeaseFailover,
    /// Every probe reports a lost lease until the budget runs out
    WriteExhaustion,
    /// Primary in the first region loses its lease, read moves on
    ReadRegionFailover,
    /// Single-region account, no barrier
    SingleRegion,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::WriteLeaseFailover,
        Scenario::ReadLeaseFailover,
        Scenario::WriteExhaustion,
        Scenario::ReadRegionFailover,
        Scenario::SingleRegion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::WriteLeaseFailover => "write-lease-failover",
            Scenario::ReadLeaseFailover => "read-lease-failover",
            Scenario::WriteExhaustion => "write-exhaustion",
            Scenario::ReadRegionFailover => "read-region-failover",
            Scenario::SingleRegion => "single-region",
        }
    }

    fn is_read(&self) -> bool {
        matches!(self, Scenario::ReadLeaseFailover | Scenario::ReadRegionFailover)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown scenario '{}' (known: {})", s, known.join(", "))
            })
    }
}

/// What happened when a scenario ran.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub outcome: &'static str,
    pub status: u16,
    pub probes: usize,
    pub primary_probes: usize,
    pub force_refresh_probes: usize,
    pub regions_contacted: Vec<RegionEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: MetricsSnapshot,
}

impl ScenarioReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == "committed"
    }
}

fn regions(config: &CoordinatorConfig) -> Vec<String> {
    if config.preferred_regions.is_empty() {
        vec!["west".to_string(), "east".to_string()]
    } else {
        config.preferred_regions.clone()
    }
}

fn write_response(read_regions: u32) -> LogicalStoreResponse {
    LogicalStoreResponse::new(StatusCode::CREATED)
        .with_lsn(WRITE_LSN)
        .with_global_committed_lsn(STALE_GCLSN)
        .with_number_of_read_regions(read_regions)
}

fn read_response(item_lsn: u64, gclsn: u64) -> LogicalStoreResponse {
    LogicalStoreResponse::new(StatusCode::OK)
        .with_lsn(item_lsn + 5)
        .with_item_lsn(item_lsn)
        .with_global_committed_lsn(gclsn)
        .with_number_of_read_regions(2)
}

fn committed_probe() -> LogicalStoreResponse {
    LogicalStoreResponse::new(StatusCode::OK).with_global_committed_lsn(u64::MAX / 2)
}

/// Script the store for `scenario`.
fn script(store: &SimulatedStore, scenario: Scenario, regions: &[String]) {
    let first = regions[0].as_str();
    match scenario {
        Scenario::WriteLeaseFailover | Scenario::ReadLeaseFailover => {
            store.script_probes([LogicalStoreResponse::lease_not_found(), committed_probe()]);
        }
        Scenario::WriteExhaustion => {
            store.set_default_probe_response(LogicalStoreResponse::lease_not_found());
        }
        Scenario::ReadRegionFailover => {
            store.script_region_probes(
                first,
                [
                    LogicalStoreResponse::lease_not_found(),
                    LogicalStoreResponse::lease_not_found(),
                ],
            );
            for region in regions.iter().skip(1) {
                store.script_reads(region, [read_response(WRITE_LSN + 20, STALE_GCLSN)]);
            }
        }
        Scenario::SingleRegion => {}
    }
}

/// Run `scenario` with `config` against a fresh simulated store.
pub async fn run_scenario(scenario: Scenario, config: &CoordinatorConfig) -> ScenarioReport {
    let regions = regions(config);
    let store = Arc::new(SimulatedStore::new(regions.clone()));
    let metrics = Arc::new(MetricsRegistry::new());
    script(&store, scenario, &regions);

    Logger::info(Event::SimulationBegin, &[("scenario", scenario.as_str())]);

    let operation = OperationContext::new(
        RegionEndpoint::new(regions[0].as_str()),
        PartitionKeyRangeId::new("0"),
        "dbs/sim/colls/barrier/docs/1",
    );
    let cancel = CancellationToken::new();

    let result = if scenario.is_read() {
        let reader = QuorumReader::new(config.clone(), store.clone(), store.clone(), metrics.clone());
        reader
            .ensure_read_quorum(&operation, read_response(WRITE_LSN, STALE_GCLSN), &cancel)
            .await
            .map(|read| (read.response.status_code, read.regions_contacted))
    } else {
        let read_regions = if scenario == Scenario::SingleRegion { 1 } else { 2 };
        let writer = ConsistencyWriter::new(config.clone(), store.clone(), store.clone(), metrics.clone());
        writer
            .ensure_write_committed(&operation, write_response(read_regions), &cancel)
            .await
            .map(|committed| (committed.response.status_code, vec![operation.region.clone()]))
    };

    let (outcome, status, regions_contacted, error) = match result {
        Ok((status, regions)) => ("committed", status.as_u16(), regions, None),
        Err(e) => (
            "failed",
            e.status_code().as_u16(),
            store.regions_probed(),
            Some(e.to_string()),
        ),
    };

    let report = ScenarioReport {
        scenario: scenario.as_str().to_string(),
        outcome,
        status,
        probes: store.probe_count(),
        primary_probes: store.primary_probe_count(),
        force_refresh_probes: store.force_refresh_probe_count(),
        regions_contacted,
        error,
        metrics: metrics.snapshot(),
    };

    let probes = report.probes.to_string();
    Logger::info(
        Event::SimulationComplete,
        &[
            ("outcome", report.outcome),
            ("probes", probes.as_str()),
            ("scenario", scenario.as_str()),
        ],
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BarrierConfig;

    fn fast() -> CoordinatorConfig {
        CoordinatorConfig {
            barrier: BarrierConfig {
                short_retry_interval_ms: 1,
                retry_interval_ms: 1,
                ..BarrierConfig::default()
            },
            ..CoordinatorConfig::default()
        }
    }

    #[test]
    fn test_parse_names() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.as_str().parse::<Scenario>().unwrap(), scenario);
        }
        let err = "chaos".parse::<Scenario>().unwrap_err();
        assert!(err.contains("write-exhaustion"));
    }

    #[tokio::test]
    async fn test_write_lease_failover() {
        let report = run_scenario(Scenario::WriteLeaseFailover, &fast()).await;
        assert!(report.succeeded());
        assert_eq!(report.probes, 2);
        assert_eq!(report.force_refresh_probes, 1);
    }

    #[tokio::test]
    async fn test_write_exhaustion() {
        let report = run_scenario(Scenario::WriteExhaustion, &fast()).await;
        assert!(!report.succeeded());
        assert_eq!(report.status, 410);
        assert_eq!(report.probes, 30);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn test_read_region_failover() {
        let report = run_scenario(Scenario::ReadRegionFailover, &fast()).await;
        assert!(report.succeeded());
        assert_eq!(report.probes, 3);
        assert_eq!(report.regions_contacted.len(), 2);
        assert_eq!(report.metrics.region_failovers, 1);
    }

    #[tokio::test]
    async fn test_single_region() {
        let report = run_scenario(Scenario::SingleRegion, &fast()).await;
        assert!(report.succeeded());
        assert_eq!(report.probes, 0);
    }
}
