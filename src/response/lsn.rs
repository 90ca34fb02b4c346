//! Lsn - Totally ordered log sequence number
//!
//! Every operation applied at a replica is assigned an LSN. The global
//! committed LSN reported by a replica is expressed in the same space, so the
//! two are directly comparable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A log sequence number assigned by a replica.
///
/// Absence is modelled as `Option<Lsn>` by callers; there is no sentinel
/// value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lsn(u64);

impl Lsn {
    /// The zero LSN. A global committed LSN of zero is a valid "behind" signal.
    pub const ZERO: Lsn = Lsn(0);

    /// Creates a new Lsn with the given value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Lsn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
