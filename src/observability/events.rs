//! Observable events
//!
//! Every line the coordinator logs names one of these.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// Configuration rejected
    ConfigRejected,

    // Write barrier
    /// Write response inspected, barrier not required
    WriteBarrierSkipped,
    /// Write barrier session opened
    WriteBarrierBegin,

    // Read quorum
    /// Read response already globally committed
    ReadQuorumSatisfied,
    /// Read barrier session opened
    ReadBarrierBegin,
    /// Read re-issued in another region
    ReadReissued,

    // Probing
    /// One barrier probe sent
    BarrierProbe,
    /// Replica set lost its lease, switching to the primary
    BarrierEscalatePrimary,
    /// Primary address refreshed before a probe
    BarrierAddressRefresh,
    /// Read moved to the next preferred region
    BarrierRegionFailover,
    /// Required LSN observed as globally committed
    BarrierMet,
    /// Session gave up
    BarrierFailed,

    // Simulation
    /// Simulated scenario started
    SimulationBegin,
    /// Simulated scenario finished
    SimulationComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConfigRejected => "CONFIG_REJECTED",

            Event::WriteBarrierSkipped => "WRITE_BARRIER_SKIPPED",
            Event::WriteBarrierBegin => "WRITE_BARRIER_BEGIN",

            Event::ReadQuorumSatisfied => "READ_QUORUM_SATISFIED",
            Event::ReadBarrierBegin => "READ_BARRIER_BEGIN",
            Event::ReadReissued => "READ_REISSUED",

            Event::BarrierProbe => "BARRIER_PROBE",
            Event::BarrierEscalatePrimary => "BARRIER_ESCALATE_PRIMARY",
            Event::BarrierAddressRefresh => "BARRIER_ADDRESS_REFRESH",
            Event::BarrierRegionFailover => "BARRIER_REGION_FAILOVER",
            Event::BarrierMet => "BARRIER_MET",
            Event::BarrierFailed => "BARRIER_FAILED",

            Event::SimulationBegin => "SIMULATION_BEGIN",
            Event::SimulationComplete => "SIMULATION_COMPLETE",
        }
    }

    /// Events that end a barrier session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::BarrierMet | Event::BarrierFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
