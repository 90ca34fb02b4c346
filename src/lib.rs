//! aerobarrier - client-side write barrier and quorum read coordinator
//!
//! After a write or a Strong read against one replica of a multi-region
//! account, decides whether the operation is globally committed and, if not,
//! probes replicas, then the primary, then (for reads) other regions until
//! it is, or until the retry budget or request deadline runs out.
//!
//! - `response`: typed replica responses and the header adapter
//! - `barrier`: sessions, escalation policy, probe issuing
//! - `writer` / `reader`: the two entry points
//! - `config`, `observability`: ambient configuration, logging, counters
//! - `sim`: in-memory store for tests and the CLI

pub mod barrier;
pub mod cli;
pub mod config;
pub mod observability;
pub mod reader;
pub mod response;
pub mod sim;
pub mod writer;

pub use barrier::{
    AddressCache, BarrierError, BarrierErrorKind, BarrierResult, OperationContext,
    PartitionKeyRangeId, RegionEndpoint, StoreTransport,
};
pub use config::CoordinatorConfig;
pub use reader::{QuorumRead, QuorumReader};
pub use response::{LogicalStoreResponse, Lsn, StatusCode, SubStatusCode};
pub use writer::{Committed, ConsistencyWriter};
