//! Barrier sessions
//!
//! Everything between "this response is not yet globally committed" and a
//! definitive answer:
//!
//! - `policy`: pure escalation decisions
//! - `session`: per-request state the policy reads
//! - `issuer`: probe construction and sending
//! - `driver`: the loop tying the three together
//!
//! The writer and reader only decide whether a barrier is needed and what
//! LSN it must confirm.

mod deadline;
mod driver;
mod errors;
mod issuer;
mod policy;
mod probe;
mod region;
mod session;
mod transport;

pub use driver::{BarrierDriver, DriveOutcome};
pub use errors::{BarrierError, BarrierErrorKind, BarrierResult};
pub use issuer::BarrierIssuer;
pub use policy::{EscalationPolicy, EscalationState, FailureCause, NextAction, ProbeObservation};
pub use probe::{BarrierProbe, ProbeTarget};
pub use region::{OperationContext, PartitionKeyRangeId, RegionEndpoint};
pub use session::{BarrierSession, SessionKind};
pub use transport::{AddressCache, StoreTransport};
