//! Authentication paths.

use crate::{CommitmentTreeError, Hashable};

/// Which side of the path node a sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The sibling is the left child; the path node is the right child.
    Left,
    /// The sibling is the right child; the path node is the left child.
    Right,
}

/// Authentication path of one leaf: exactly `DEPTH` siblings ordered from
/// the leaf level up to the children of the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath<H, const DEPTH: u8> {
    auth_path: Vec<(H, Side)>,
}

impl<H: Hashable, const DEPTH: u8> MerklePath<H, DEPTH> {
    /// Build a path from `(sibling, side)` pairs, leaf level first.
    pub fn from_parts(auth_path: Vec<(H, Side)>) -> Result<Self, CommitmentTreeError> {
        if auth_path.len() != DEPTH as usize {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "authentication path has {} levels, expected {}",
                auth_path.len(),
                DEPTH
            )));
        }
        Ok(Self { auth_path })
    }

    /// The `(sibling, side)` pairs, leaf level first.
    pub fn auth_path(&self) -> &[(H, Side)] {
        &self.auth_path
    }

    /// Sibling hashes, leaf level first.
    pub fn siblings(&self) -> impl Iterator<Item = &H> {
        self.auth_path.iter().map(|(sibling, _)| sibling)
    }

    /// Sibling sides, leaf level first.
    pub fn sides(&self) -> impl Iterator<Item = Side> + '_ {
        self.auth_path.iter().map(|(_, side)| *side)
    }

    /// Index of the leaf this path authenticates.
    pub fn position(&self) -> u64 {
        self.auth_path
            .iter()
            .enumerate()
            .filter(|(_, (_, side))| *side == Side::Left)
            .fold(0u64, |pos, (level, _)| pos | (1u64 << level))
    }

    /// Root obtained by folding `leaf` up through the path.
    pub fn root(&self, leaf: &H) -> H {
        self.auth_path
            .iter()
            .enumerate()
            .fold(leaf.clone(), |node, (level, (sibling, side))| match side {
                Side::Left => H::combine(level as u8, sibling, &node),
                Side::Right => H::combine(level as u8, &node, sibling),
            })
    }

    /// Whether `leaf` together with this path reproduces `root`.
    pub fn verify(&self, leaf: &H, root: &H) -> bool {
        &self.root(leaf) == root
    }
}
