//! Node hashing for the commitment tree.
//!
//! The compression function itself is a protocol primitive; the tree only
//! relies on the [`Hashable`] contract. [`CommitmentHash`] is the 32-byte
//! node type shipped with this crate, hashing with domain-tagged blake3.

use std::fmt;

/// A node value of the commitment tree.
///
/// `combine` must be deterministic and order-sensitive. It receives the
/// level of the two children (0 for leaves) so that implementations can
/// personalise per level; implementations are free to ignore it.
pub trait Hashable: Clone + Eq + fmt::Debug + Sized {
    /// Width of the byte encoding.
    const SIZE: usize;

    /// The sentinel occupying every leaf that has not been appended yet.
    fn empty_leaf() -> Self;

    /// Parent of `left` and `right`, both at `level`.
    fn combine(level: u8, left: &Self, right: &Self) -> Self;

    /// Root of an empty subtree of height `level`.
    fn empty_root(level: u8) -> Self {
        (0..level).fold(Self::empty_leaf(), |node, l| Self::combine(l, &node, &node))
    }

    /// Fixed-width encoding, exactly `SIZE` bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decode from exactly `SIZE` bytes.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;
}

/// Roots of empty subtrees of height `0..=depth`.
///
/// Index 0 is the empty leaf; index `depth` is the root of an empty tree.
pub fn empty_roots<H: Hashable>(depth: u8) -> Vec<H> {
    let mut roots = Vec::with_capacity(depth as usize + 1);
    roots.push(H::empty_leaf());
    for level in 0..depth {
        let below = &roots[level as usize];
        let next = H::combine(level, below, below);
        roots.push(next);
    }
    roots
}

/// Domain tag for internal nodes.
const NODE_TAG: u8 = 0x01;
/// Input to the empty leaf sentinel.
const UNCOMMITTED_TAG: &[u8] = b"shielded_uncommitted";

/// A 32-byte commitment tree node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitmentHash(pub [u8; 32]);

impl CommitmentHash {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for CommitmentHash {
    fn from(bytes: [u8; 32]) -> Self {
        CommitmentHash(bytes)
    }
}

impl fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentHash({})", hex::encode(self.0))
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Hashable for CommitmentHash {
    const SIZE: usize = 32;

    fn empty_leaf() -> Self {
        CommitmentHash(*blake3::hash(UNCOMMITTED_TAG).as_bytes())
    }

    /// `blake3(0x01 || level || left || right)`
    fn combine(level: u8, left: &Self, right: &Self) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[NODE_TAG, level]);
        hasher.update(&left.0);
        hasher.update(&right.0);
        CommitmentHash(*hasher.finalize().as_bytes())
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(CommitmentHash)
    }
}
