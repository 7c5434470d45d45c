use std::collections::HashMap;

use tracing::debug;

use crate::COMPONENT;

/// The parts of a block header the version tracker reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeaderInfo {
    /// Address of the block producer.
    pub witness_address: Vec<u8>,
    /// Protocol version the block was produced with.
    pub version: u32,
}

/// A block producer and the version of its latest block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WitnessInfo {
    /// Address of the block producer.
    pub address: Vec<u8>,
    /// Version of the latest block it produced.
    pub version: u32,
}

/// The set of registered block producers.
pub trait WitnessDirectory {
    /// Whether `address` belongs to a registered block producer.
    fn is_witness(&self, address: &[u8]) -> bool;
}

impl<F: Fn(&[u8]) -> bool> WitnessDirectory for F {
    fn is_witness(&self, address: &[u8]) -> bool {
        self(address)
    }
}

/// Latest block version seen from each block producer, and the highest
/// version seen overall.
#[derive(Clone, Debug, Default)]
pub struct VersionTracker {
    versions: HashMap<Vec<u8>, u32>,
    current_version: u32,
}

impl VersionTracker {
    /// Nothing observed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest block version seen.
    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Latest version seen from `address`, if it is tracked.
    pub fn version_of(&self, address: &[u8]) -> Option<u32> {
        self.versions.get(address).copied()
    }

    /// Record a block. Producers are tracked from their first block once
    /// `directory` recognizes them; blocks from unknown addresses only raise
    /// the current version.
    pub fn observe(&mut self, header: &BlockHeaderInfo, directory: &impl WitnessDirectory) {
        self.current_version = self.current_version.max(header.version);

        match self.versions.get_mut(&header.witness_address) {
            Some(version) => {
                if *version != header.version {
                    debug!(
                        target: COMPONENT,
                        witness = %hex::encode(&header.witness_address),
                        from = *version,
                        to = header.version,
                        "block producer changed version"
                    );
                    *version = header.version;
                }
            }
            None => {
                if directory.is_witness(&header.witness_address) {
                    self.versions
                        .insert(header.witness_address.clone(), header.version);
                }
            }
        }
    }

    /// Tracked producers among `active` whose latest block is not on the
    /// current version, in `active` order.
    pub fn not_upgraded<A: AsRef<[u8]>>(&self, active: &[A]) -> Vec<WitnessInfo> {
        active
            .iter()
            .filter_map(|address| {
                let address = address.as_ref();
                let version = self.version_of(address)?;
                (version != self.current_version).then(|| WitnessInfo {
                    address: address.to_vec(),
                    version,
                })
            })
            .collect()
    }
}
