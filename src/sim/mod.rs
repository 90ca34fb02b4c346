//! In-memory simulation of the store side
//!
//! Used by the test suite and by `aerobarrier simulate`.

mod scenarios;
mod store;

pub use scenarios::{run_scenario, Scenario, ScenarioReport};
pub use store::SimulatedStore;
