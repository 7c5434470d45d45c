//! Current and best tree bookkeeping for block application.

mod anchors;

use std::marker::PhantomData;

use shielded_costs::{CostResult, CostsExt, OperationCost, cost_return_on_error};
use shielded_storage::KvStore;
use tracing::{debug, error, info, warn};

pub use self::anchors::AnchorReader;
use crate::{
    COMPONENT, CommitmentTreeError, Hashable, IncrementalMerkleTree, MerklePath, TreeSnapshot,
    store::{CURRENT_TREE_KEY, LAST_TREE_KEY, TreeIndex, TreeStore},
};


/// Owns the `current` (being assembled) and `best` (last finalized) trees.
///
/// `T` is the tree keyspace, holding the two reserved snapshots and every
/// committed snapshot under its root. `I` is the height index keyspace.
///
/// Block application is sequential: writes take `&mut self`, and a failed
/// write must abort the block. Historical queries only need `&self`, or an
/// [`AnchorReader`] from [`anchors`](Self::anchors) when they run on other
/// threads.
pub struct CommitmentTreeManager<H, const DEPTH: u8, T, I> {
    trees: TreeStore<T>,
    index: TreeIndex<I>,
    _hash: PhantomData<fn() -> H>,
}

impl<H: Hashable, const DEPTH: u8, T: KvStore, I: KvStore> CommitmentTreeManager<H, DEPTH, T, I> {
    /// Manager over a tree keyspace and a height index keyspace.
    pub fn new(trees: T, index: I) -> Self {
        Self {
            trees: TreeStore::new(trees),
            index: TreeIndex::new(index),
            _hash: PhantomData,
        }
    }

    /// The tree keyspace.
    pub fn trees(&self) -> &T {
        self.trees.inner()
    }

    /// The height index keyspace.
    pub fn index(&self) -> &I {
        self.index.inner()
    }

    fn reader(&self) -> AnchorReader<H, DEPTH, &T> {
        AnchorReader::new(self.trees.inner())
    }

    /// Read-only handle for concurrent anchor queries.
    pub fn anchors(&self) -> AnchorReader<H, DEPTH, T>
    where
        T: Clone,
    {
        AnchorReader::new(self.trees.inner().clone())
    }

    /// The tree being assembled.
    ///
    /// Resolution order:
    /// 1. the `CURRENT_TREE` snapshot,
    /// 2. otherwise the best tree (see [`get_best`](Self::get_best)).
    ///
    /// Only storage failures are reported as errors.
    pub fn get_current(&self) -> CostResult<IncrementalMerkleTree<H, DEPTH>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let current = cost_return_on_error!(&mut cost, self.trees.get::<H, DEPTH>(CURRENT_TREE_KEY));
        match current {
            Some(snapshot) => Ok(snapshot.into_tree()).wrap_with_cost(cost),
            None => self.get_best().add_cost(cost),
        }
    }

    /// The last finalized tree.
    ///
    /// Resolution order:
    /// 1. the `LAST_TREE` snapshot,
    /// 2. otherwise a new empty tree.
    pub fn get_best(&self) -> CostResult<IncrementalMerkleTree<H, DEPTH>, CommitmentTreeError> {
        self.trees
            .get::<H, DEPTH>(LAST_TREE_KEY)
            .map_ok(|best| best.map(TreeSnapshot::into_tree).unwrap_or_default())
    }

    /// Replace the tree being assembled.
    pub fn set_current(
        &mut self,
        tree: &IncrementalMerkleTree<H, DEPTH>,
    ) -> CostResult<(), CommitmentTreeError> {
        debug!(target: COMPONENT, size = tree.size(), "storing current tree");
        self.trees
            .put(CURRENT_TREE_KEY, &TreeSnapshot::new(tree.clone()))
    }

    /// Start assembling a new block from the best tree.
    pub fn reset_current(&mut self) -> CostResult<(), CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let best = cost_return_on_error!(&mut cost, self.get_best());
        self.set_current(&best).add_cost(cost)
    }

    /// Append `commitment` to `tree`.
    ///
    /// Fails with [`CommitmentTreeError::DepthExceeded`] once the tree is
    /// full, in which case the block being assembled must be rejected.
    pub fn append_commitment(
        tree: &mut IncrementalMerkleTree<H, DEPTH>,
        commitment: H,
    ) -> CostResult<(), CommitmentTreeError> {
        tree.append(commitment)
    }

    /// Append `commitment` to the tree being assembled and store it.
    pub fn append_to_current(&mut self, commitment: H) -> CostResult<(), CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let mut tree = cost_return_on_error!(&mut cost, self.get_current());
        cost_return_on_error!(&mut cost, Self::append_commitment(&mut tree, commitment));
        self.set_current(&tree).add_cost(cost)
    }

    /// Store `snapshot` under an explicit key.
    pub fn put_tree(
        &mut self,
        key: &[u8],
        snapshot: &TreeSnapshot<H, DEPTH>,
    ) -> CostResult<(), CommitmentTreeError> {
        self.trees.put(key, snapshot)
    }

    /// Finalize the tree being assembled as the best tree of block `height`.
    ///
    /// Writes, in order, the snapshot under its root, `LAST_TREE`, then the
    /// height index entry. A crash part way leaves `LAST_TREE` and the index
    /// on the previous block, with at most an extra root-keyed snapshot.
    /// Returns the committed root.
    pub fn commit_current_as_best(&mut self, height: u64) -> CostResult<H, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let result = self
            .get_current()
            .flat_map_ok(|tree| {
                let snapshot = TreeSnapshot::new(tree);
                self.write_best(height, &snapshot)
                    .map_ok(|()| snapshot)
            })
            .unwrap_add_cost(&mut cost);

        match result {
            Ok(snapshot) => {
                info!(
                    target: COMPONENT,
                    height,
                    root = %hex::encode(snapshot.root_key()),
                    size = snapshot.tree().size(),
                    "committed block tree"
                );
                Ok(snapshot.root().clone()).wrap_with_cost(cost)
            }
            Err(e) => {
                error!(target: COMPONENT, height, error = %e, "failed to commit block tree");
                Err(e).wrap_with_cost(cost)
            }
        }
    }

    /// Record `tree` as the best tree of block `height`, with the same write
    /// order as [`commit_current_as_best`](Self::commit_current_as_best).
    pub fn set_best(
        &mut self,
        height: u64,
        tree: IncrementalMerkleTree<H, DEPTH>,
    ) -> CostResult<H, CommitmentTreeError> {
        let snapshot = TreeSnapshot::new(tree);
        self.write_best(height, &snapshot)
            .map_ok(|()| snapshot.root().clone())
    }

    fn write_best(
        &self,
        height: u64,
        snapshot: &TreeSnapshot<H, DEPTH>,
    ) -> CostResult<(), CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let root_key = snapshot.root_key();
        cost_return_on_error!(&mut cost, self.trees.put(&root_key, snapshot));
        cost_return_on_error!(&mut cost, self.trees.put(LAST_TREE_KEY, snapshot));
        self.index.put(height, &root_key).add_cost(cost)
    }

    /// Root committed at block `height`.
    pub fn root_at_height(&self, height: u64) -> CostResult<Option<H>, CommitmentTreeError> {
        self.index.get(height).flat_map_ok(|root_key| {
            root_key
                .map(|bytes| {
                    H::from_bytes(&bytes).ok_or_else(|| {
                        CommitmentTreeError::CorruptedData(format!(
                            "index entry for height {} is not a root: {}",
                            height,
                            hex::encode(&bytes)
                        ))
                    })
                })
                .transpose()
                .wrap_with_cost(OperationCost::default())
        })
    }

    /// Undo every block above `height`.
    ///
    /// Index entries above `height` are deleted, `LAST_TREE` is reset to the
    /// tree of the highest remaining entry (or removed when none remain) and
    /// `CURRENT_TREE` is cleared. Root-keyed snapshots are kept. Returns the
    /// height the best tree now belongs to.
    ///
    /// Must not run concurrently with assembly or commit.
    pub fn rollback_to(&mut self, height: u64) -> CostResult<Option<u64>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let previous = cost_return_on_error!(&mut cost, self.index.highest());
        let tip = cost_return_on_error!(&mut cost, self.index.truncate_above(height));

        let best_height = match tip {
            Some((best_height, root_key)) => {
                let snapshot = cost_return_on_error!(&mut cost, self.trees.get::<H, DEPTH>(&root_key));
                let Some(snapshot) = snapshot else {
                    return Err(CommitmentTreeError::NotFound(format!(
                        "index entry for height {} points at missing tree {}",
                        best_height,
                        hex::encode(&root_key)
                    )))
                    .wrap_with_cost(cost);
                };
                cost_return_on_error!(&mut cost, self.trees.put(LAST_TREE_KEY, &snapshot));
                Some(best_height)
            }
            None => {
                cost_return_on_error!(&mut cost, self.trees.delete(LAST_TREE_KEY));
                None
            }
        };
        cost_return_on_error!(&mut cost, self.trees.delete(CURRENT_TREE_KEY));

        warn!(
            target: COMPONENT,
            target_height = height,
            previous_highest = ?previous,
            best_height = ?best_height,
            "rolled back commitment tree"
        );
        Ok(best_height).wrap_with_cost(cost)
    }

    /// Whether a tree with this root was ever committed.
    pub fn root_exists(&self, root: &H) -> CostResult<bool, CommitmentTreeError> {
        self.reader().root_exists(root)
    }

    /// The committed snapshot whose root is `root`.
    pub fn get_tree_by_root(
        &self,
        root: &H,
    ) -> CostResult<TreeSnapshot<H, DEPTH>, CommitmentTreeError> {
        self.reader().get_tree_by_root(root)
    }

    /// Authentication path of the last leaf appended before the tree with
    /// root `root` was committed, padded with empty subtree roots.
    pub fn path_for_root(&self, root: &H) -> CostResult<MerklePath<H, DEPTH>, CommitmentTreeError> {
        self.reader().path_for_root(root)
    }

    /// [`path_for_root`](Self::path_for_root) for a caller that names the
    /// leaf it expects.
    pub fn path_for_root_and_leaf(
        &self,
        root: &H,
        commitment: &H,
    ) -> CostResult<MerklePath<H, DEPTH>, CommitmentTreeError> {
        self.reader().path_for_root_and_leaf(root, commitment)
    }
}
