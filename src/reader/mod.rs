//! Read-path quorum barrier

mod quorum_reader;

pub use quorum_reader::{QuorumRead, QuorumReader};
