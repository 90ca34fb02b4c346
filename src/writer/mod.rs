//! Write-path barrier

mod consistency_writer;

pub use consistency_writer::{Committed, ConsistencyWriter};
