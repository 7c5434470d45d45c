//! Witnesses: authentication paths that follow the tree as it grows.
//!
//! A witness freezes the frontier at the moment its leaf was appended. Every
//! later commitment is fed through a cursor, itself a small frontier, until
//! the cursor completes the next right-hand subtree; that subtree root is
//! then recorded as the next resolved sibling.

use std::collections::VecDeque;

use shielded_costs::{CostResult, CostsExt, OperationCost, cost_return_on_error};

use crate::{
    CommitmentTreeError, Hashable, IncrementalMerkleTree, MerklePath, tree::PathFiller,
};

#[cfg(test)]
mod tests;

/// Tracks the authentication path of one leaf while later leaves are
/// appended to the same tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleWitness<H, const DEPTH: u8> {
    pub(crate) tree: IncrementalMerkleTree<H, DEPTH>,
    pub(crate) filled: Vec<H>,
    pub(crate) cursor_depth: u8,
    pub(crate) cursor: Option<IncrementalMerkleTree<H, DEPTH>>,
}

impl<H: Hashable, const DEPTH: u8> MerkleWitness<H, DEPTH> {
    /// Witness the most recently appended leaf of `tree`.
    pub fn from_leaf(tree: &IncrementalMerkleTree<H, DEPTH>) -> Result<Self, CommitmentTreeError> {
        if tree.is_empty() {
            return Err(CommitmentTreeError::EmptyTree);
        }
        Ok(Self {
            tree: tree.clone(),
            filled: Vec::new(),
            cursor_depth: 0,
            cursor: None,
        })
    }

    /// The witnessed commitment.
    pub fn element(&self) -> Option<&H> {
        self.tree.last()
    }

    /// Index of the witnessed leaf.
    pub fn position(&self) -> u64 {
        self.tree.size() - 1
    }

    /// Number of path levels with a resolved sibling.
    pub fn resolved_levels(&self) -> u8 {
        let unresolved = self.tree.right_sibling_levels() - self.filled.len();
        DEPTH - unresolved as u8
    }

    /// Whether every level of the path has a resolved sibling.
    pub fn is_complete(&self) -> bool {
        self.cursor.is_none() && self.filled.len() == self.tree.right_sibling_levels()
    }

    /// Feed the next commitment appended to the tree after the witnessed
    /// leaf.
    ///
    /// Fails with [`CommitmentTreeError::DepthExceeded`] when the tree
    /// cannot take another leaf, leaving the witness untouched.
    pub fn append(&mut self, commitment: H) -> CostResult<(), CommitmentTreeError> {
        let mut cost = OperationCost::default();

        if let Some(cursor) = self.cursor.as_mut() {
            cost_return_on_error!(&mut cost, cursor.append(commitment));
            if cursor.is_complete_at(self.cursor_depth) {
                let subtree_root = cursor
                    .root_with_filler(self.cursor_depth, &mut PathFiller::empty(self.cursor_depth));
                cost += OperationCost::with_compress_calls(u32::from(self.cursor_depth));
                self.filled.push(subtree_root);
                self.cursor = None;
            }
            return Ok(()).wrap_with_cost(cost);
        }

        let depth = self.tree.next_depth(self.filled.len());
        if depth >= DEPTH as usize {
            return Err(CommitmentTreeError::DepthExceeded { depth: DEPTH }).wrap_with_cost(cost);
        }
        if depth == 0 {
            self.filled.push(commitment);
        } else {
            let mut cursor = IncrementalMerkleTree::new();
            cost_return_on_error!(&mut cost, cursor.append(commitment));
            self.cursor_depth = depth as u8;
            self.cursor = Some(cursor);
        }
        Ok(()).wrap_with_cost(cost)
    }

    /// Resolved siblings so far, followed by the padded root of the
    /// subtree under construction.
    fn partial_path(&self) -> VecDeque<H> {
        let mut partial: VecDeque<H> = self.filled.iter().cloned().collect();
        if let Some(cursor) = &self.cursor {
            partial.push_back(
                cursor.root_with_filler(self.cursor_depth, &mut PathFiller::empty(self.cursor_depth)),
            );
        }
        partial
    }

    /// Root of the tree as it stands after every commitment fed so far.
    pub fn root(&self) -> H {
        self.tree
            .root_with_filler(DEPTH, &mut PathFiller::new(self.partial_path(), DEPTH))
    }

    /// The authentication path, only once every level is resolved by real
    /// appends.
    pub fn path(&self) -> Result<MerklePath<H, DEPTH>, CommitmentTreeError> {
        if !self.is_complete() {
            return Err(CommitmentTreeError::Incomplete {
                resolved: self.resolved_levels(),
                depth: DEPTH,
            });
        }
        self.padded_path()
    }

    /// The authentication path with unresolved siblings padded by empty
    /// subtree roots. Valid against [`MerkleWitness::root`].
    pub fn padded_path(&self) -> Result<MerklePath<H, DEPTH>, CommitmentTreeError> {
        self.tree
            .path_with_filler(&mut PathFiller::new(self.partial_path(), DEPTH))
    }
}
