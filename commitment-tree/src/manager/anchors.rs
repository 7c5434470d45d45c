//! Read-only access to committed anchors.

use std::marker::PhantomData;

use shielded_costs::{CostResult, CostsExt, OperationCost, cost_return_on_error};
use shielded_storage::KvStore;

use crate::{CommitmentTreeError, Hashable, MerklePath, TreeSnapshot, store::TreeStore};

/// Queries over the content-addressed part of the tree keyspace.
///
/// Root-keyed snapshots are written once and never changed, so readers can
/// run alongside block assembly without coordinating with the
/// [`CommitmentTreeManager`](crate::CommitmentTreeManager). Cloning is as
/// cheap as cloning the underlying store handle.
pub struct AnchorReader<H, const DEPTH: u8, S> {
    trees: TreeStore<S>,
    _hash: PhantomData<fn() -> H>,
}

impl<H, const DEPTH: u8, S: Clone> Clone for AnchorReader<H, DEPTH, S> {
    fn clone(&self) -> Self {
        Self {
            trees: self.trees.clone(),
            _hash: PhantomData,
        }
    }
}

impl<H: Hashable, const DEPTH: u8, S: KvStore> AnchorReader<H, DEPTH, S> {
    /// Reader over a tree keyspace.
    pub fn new(trees: S) -> Self {
        Self {
            trees: TreeStore::new(trees),
            _hash: PhantomData,
        }
    }

    /// Whether a tree with this root was ever committed.
    pub fn root_exists(&self, root: &H) -> CostResult<bool, CommitmentTreeError> {
        self.trees.contains(&root.to_bytes())
    }

    /// The committed snapshot whose root is `root`.
    pub fn get_tree_by_root(
        &self,
        root: &H,
    ) -> CostResult<TreeSnapshot<H, DEPTH>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let key = root.to_bytes();
        let snapshot = cost_return_on_error!(&mut cost, self.trees.get::<H, DEPTH>(&key));
        let result = match snapshot {
            None => Err(CommitmentTreeError::NotFound(format!(
                "no tree with root {}",
                hex::encode(&key)
            ))),
            Some(snapshot) if snapshot.root() != root => {
                Err(CommitmentTreeError::CorruptedData(format!(
                    "tree stored under {} has root {}",
                    hex::encode(&key),
                    hex::encode(snapshot.root_key())
                )))
            }
            Some(snapshot) => Ok(snapshot),
        };
        result.wrap_with_cost(cost)
    }

    /// Authentication path of the last leaf appended before the tree with
    /// root `root` was committed.
    pub fn path_for_root(&self, root: &H) -> CostResult<MerklePath<H, DEPTH>, CommitmentTreeError> {
        self.get_tree_by_root(root)
            .flat_map_ok(|snapshot| snapshot.tree().path().wrap_with_cost(Default::default()))
    }

    /// Like [`path_for_root`](Self::path_for_root), but fails with
    /// [`CommitmentTreeError::LeafMismatch`] unless `commitment` is the leaf
    /// the path authenticates.
    pub fn path_for_root_and_leaf(
        &self,
        root: &H,
        commitment: &H,
    ) -> CostResult<MerklePath<H, DEPTH>, CommitmentTreeError> {
        self.get_tree_by_root(root).flat_map_ok(|snapshot| {
            let tree = snapshot.tree();
            let path = match tree.last() {
                None => Err(CommitmentTreeError::EmptyTree),
                Some(last) if last != commitment => Err(CommitmentTreeError::LeafMismatch),
                Some(_) => tree.path(),
            };
            path.wrap_with_cost(Default::default())
        })
    }
}
