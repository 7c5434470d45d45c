//! Compact incremental Merkle tree (frontier).
//!
//! Only the pending leaves and one carry slot per level are kept, so append
//! and root are `O(DEPTH)` regardless of how many leaves the tree holds.

use std::collections::VecDeque;

use shielded_costs::{CostResult, CostsExt, OperationCost};

use crate::{
    CommitmentTreeError, Hashable, MerklePath, Side,
    hash::empty_roots,
};


/// Supplies sibling hashes for positions the frontier has no value for:
/// caller-provided hashes first, then roots of empty subtrees.
pub(crate) struct PathFiller<H> {
    queue: VecDeque<H>,
    empty_roots: Vec<H>,
}

impl<H: Hashable> PathFiller<H> {
    pub(crate) fn new(queue: VecDeque<H>, depth: u8) -> Self {
        Self {
            queue,
            empty_roots: empty_roots(depth),
        }
    }

    pub(crate) fn empty(depth: u8) -> Self {
        Self::new(VecDeque::new(), depth)
    }

    pub(crate) fn next(&mut self, level: u8) -> H {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.empty_roots[level as usize].clone())
    }
}

/// A depth-`DEPTH` append-only binary Merkle tree in frontier form.
///
/// - `left`/`right` are the pending children at level 0.
/// - `parents[i]` holds an incomplete left sibling at level `i + 1`, waiting
///   for the carry that completes it.
/// - `size` counts every commitment ever appended.
///
/// The represented tree is the full depth-`DEPTH` tree whose first `size`
/// leaves are the appended commitments and whose remaining leaves are
/// [`Hashable::empty_leaf`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncrementalMerkleTree<H, const DEPTH: u8> {
    pub(crate) left: Option<H>,
    pub(crate) right: Option<H>,
    pub(crate) parents: Vec<Option<H>>,
    pub(crate) size: u64,
}

impl<H: Hashable, const DEPTH: u8> Default for IncrementalMerkleTree<H, DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Hashable, const DEPTH: u8> IncrementalMerkleTree<H, DEPTH> {
    /// An empty tree.
    pub fn new() -> Self {
        const { assert!(DEPTH >= 1 && DEPTH <= 63, "tree depth must be in 1..=63") };
        Self {
            left: None,
            right: None,
            parents: Vec::new(),
            size: 0,
        }
    }

    /// Number of leaves the tree can hold.
    pub const fn capacity() -> u64 {
        1u64 << DEPTH
    }

    /// Number of commitments appended so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether no commitment has been appended.
    pub fn is_empty(&self) -> bool {
        self.left.is_none()
    }

    /// The most recently appended commitment.
    pub fn last(&self) -> Option<&H> {
        self.right.as_ref().or(self.left.as_ref())
    }

    /// Whether the tree holds `2^DEPTH` leaves.
    pub fn is_complete(&self) -> bool {
        self.is_complete_at(DEPTH)
    }

    /// Whether the leaves appended so far fill a subtree of height `depth`.
    pub(crate) fn is_complete_at(&self, depth: u8) -> bool {
        self.left.is_some()
            && self.right.is_some()
            && self.parents.len() == depth as usize - 1
            && self.parents.iter().all(Option::is_some)
    }

    /// Append a commitment.
    ///
    /// Pairs of leaves are carried upwards as in binary addition: a carry
    /// lands in the first empty slot, merging with every filled slot on the
    /// way. Fails with [`CommitmentTreeError::DepthExceeded`] once the tree
    /// is complete, leaving it untouched.
    pub fn append(&mut self, commitment: H) -> CostResult<(), CommitmentTreeError> {
        let mut cost = OperationCost::default();
        if self.is_complete() {
            return Err(CommitmentTreeError::DepthExceeded { depth: DEPTH }).wrap_with_cost(cost);
        }

        match (self.left.take(), self.right.take()) {
            (None, right) => {
                self.left = Some(commitment);
                self.right = right;
            }
            (Some(left), None) => {
                self.left = Some(left);
                self.right = Some(commitment);
            }
            (Some(left), Some(right)) => {
                let mut carry = H::combine(0, &left, &right);
                cost += OperationCost::with_compress_calls(1);
                self.left = Some(commitment);

                let mut absorbed = false;
                for (i, slot) in self.parents.iter_mut().enumerate() {
                    match slot.take() {
                        Some(sibling) => {
                            carry = H::combine(i as u8 + 1, &sibling, &carry);
                            cost += OperationCost::with_compress_calls(1);
                        }
                        None => {
                            *slot = Some(carry.clone());
                            absorbed = true;
                            break;
                        }
                    }
                }
                if !absorbed {
                    self.parents.push(Some(carry));
                }
            }
        }

        self.size += 1;
        Ok(()).wrap_with_cost(cost)
    }

    /// Root of the full depth-`DEPTH` tree.
    pub fn root(&self) -> H {
        self.root_with_filler(DEPTH, &mut PathFiller::empty(DEPTH))
    }

    /// Root of the height-`depth` tree, taking missing right-hand siblings
    /// from `filler`.
    pub(crate) fn root_with_filler(&self, depth: u8, filler: &mut PathFiller<H>) -> H {
        let left = match &self.left {
            Some(left) => left.clone(),
            None => filler.next(0),
        };
        let right = match &self.right {
            Some(right) => right.clone(),
            None => filler.next(0),
        };
        let mut root = H::combine(0, &left, &right);

        let mut level = 1u8;
        for parent in &self.parents {
            root = match parent {
                Some(parent) => H::combine(level, parent, &root),
                None => H::combine(level, &root, &filler.next(level)),
            };
            level += 1;
        }
        while level < depth {
            root = H::combine(level, &root, &filler.next(level));
            level += 1;
        }
        root
    }

    /// Authentication path of the most recently appended leaf, padded with
    /// empty subtree roots.
    pub fn path(&self) -> Result<MerklePath<H, DEPTH>, CommitmentTreeError> {
        self.path_with_filler(&mut PathFiller::empty(DEPTH))
    }

    pub(crate) fn path_with_filler(
        &self,
        filler: &mut PathFiller<H>,
    ) -> Result<MerklePath<H, DEPTH>, CommitmentTreeError> {
        let Some(left) = &self.left else {
            return Err(CommitmentTreeError::EmptyTree);
        };

        let mut auth_path = Vec::with_capacity(DEPTH as usize);
        if self.right.is_some() {
            auth_path.push((left.clone(), Side::Left));
        } else {
            auth_path.push((filler.next(0), Side::Right));
        }
        for (i, parent) in self.parents.iter().enumerate() {
            match parent {
                Some(parent) => auth_path.push((parent.clone(), Side::Left)),
                None => auth_path.push((filler.next(i as u8 + 1), Side::Right)),
            }
        }
        while auth_path.len() < DEPTH as usize {
            let level = auth_path.len() as u8;
            auth_path.push((filler.next(level), Side::Right));
        }
        MerklePath::from_parts(auth_path)
    }

    /// Height of the subtree that the next filler hash must cover, after
    /// skipping `skip` already-filled positions.
    pub(crate) fn next_depth(&self, mut skip: usize) -> usize {
        if self.left.is_none() {
            if skip == 0 {
                return 0;
            }
            skip -= 1;
        }
        if self.right.is_none() {
            if skip == 0 {
                return 0;
            }
            skip -= 1;
        }
        let mut depth = 1;
        for parent in &self.parents {
            if parent.is_none() {
                if skip == 0 {
                    return depth;
                }
                skip -= 1;
            }
            depth += 1;
        }
        depth + skip
    }

    /// Number of path levels whose sibling lies to the right of the most
    /// recent leaf and therefore has to come from later appends.
    pub(crate) fn right_sibling_levels(&self) -> usize {
        let level_zero = usize::from(self.left.is_some() && self.right.is_none());
        let empty_parents = self.parents.iter().filter(|p| p.is_none()).count();
        let above = DEPTH as usize - 1 - self.parents.len();
        level_zero + empty_parents + above
    }

    /// Leaf count implied by which slots are filled.
    pub(crate) fn derived_size(&self) -> u64 {
        let leaves = u64::from(self.left.is_some()) + u64::from(self.right.is_some());
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .fold(leaves, |acc, (i, _)| acc + (1u64 << (i + 1)))
    }
}
