//! Shielded commitment tree for a block-chain node.
//!
//! Commitments produced by shielded outputs are appended, in block order, to
//! a fixed-depth, append-only binary Merkle tree. Each finalized block stores
//! a snapshot of the tree under its root, so proofs that reference a
//! historical root (an anchor) can be checked against real tree states.
//!
//! # Architecture
//!
//! - [`IncrementalMerkleTree`] keeps the tree in frontier form: two pending
//!   leaves and one carry slot per level.
//! - [`MerkleWitness`] follows one leaf as later leaves arrive and produces
//!   its [`MerklePath`].
//! - [`CommitmentTreeManager`] owns the `current` (being assembled) and
//!   `best` (last finalized) trees and persists them through
//!   [`shielded_storage::KvStore`] keyspaces.
//! - [`AnchorReader`] answers root queries from other threads.
//!
//! Node hashing goes through the [`Hashable`] trait. [`CommitmentHash`] is
//! the 32-byte implementation used by the node.

mod error;
mod hash;
mod manager;
mod path;
mod serialization;
mod snapshot;
pub mod store;
mod tree;
mod witness;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::CommitmentTreeError;
pub use hash::{CommitmentHash, Hashable, empty_roots};
pub use manager::{AnchorReader, CommitmentTreeManager};
pub use path::{MerklePath, Side};
pub use snapshot::TreeSnapshot;
pub use store::{CURRENT_TREE_KEY, LAST_TREE_KEY, TreeIndex, TreeStore};
pub use tree::IncrementalMerkleTree;
pub use witness::MerkleWitness;

/// `tracing` target of this crate's events.
pub const COMPONENT: &str = "shielded-commitment-tree";

/// Depth of the shielded commitment tree.
pub const SHIELDED_TREE_DEPTH: u8 = 32;

/// The node's commitment tree.
pub type ShieldedTree = IncrementalMerkleTree<CommitmentHash, SHIELDED_TREE_DEPTH>;
/// Witness into a [`ShieldedTree`].
pub type ShieldedWitness = MerkleWitness<CommitmentHash, SHIELDED_TREE_DEPTH>;
/// Authentication path in a [`ShieldedTree`].
pub type ShieldedPath = MerklePath<CommitmentHash, SHIELDED_TREE_DEPTH>;
/// Manager of [`ShieldedTree`]s over tree keyspace `T` and index keyspace
/// `I`.
pub type ShieldedTreeManager<T, I> =
    CommitmentTreeManager<CommitmentHash, SHIELDED_TREE_DEPTH, T, I>;
