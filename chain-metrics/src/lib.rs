#![deny(missing_docs)]

//! Block chain metrics for a node.
//!
//! Counters and rates are maintained elsewhere and read through
//! [`MeterSource`]. [`BlockChainMetrics`] turns them into block processing
//! and transaction rates, and tracks which block producers still run an old
//! protocol version.

mod aggregator;
mod meter;
mod rate;
mod version;

pub use aggregator::BlockChainMetrics;
pub use meter::{MemoryMeters, Meter, MeterSource, MetricsKey};
pub use rate::{RateInfo, RateKind};
pub use version::{BlockHeaderInfo, VersionTracker, WitnessDirectory, WitnessInfo};

/// `tracing` target of this crate's events.
pub const COMPONENT: &str = "shielded-chain-metrics";
