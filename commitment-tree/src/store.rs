//! Typed views over the two persistence keyspaces.
//!
//! # Key Scheme
//!
//! Tree keyspace:
//! - `CURRENT_TREE` -> snapshot of the tree being assembled
//! - `LAST_TREE` -> snapshot of the last finalized tree
//! - root bytes -> snapshot with that root (written once, never removed)
//!
//! Index keyspace:
//! - 8-byte BE block height -> next lower committed height (if any) and
//!   root bytes
//! - `highest_height` -> 8-byte BE highest committed height

use shielded_costs::{
    CostResult, CostsExt, OperationCost, cost_return_on_error, cost_return_on_error_no_add,
};
use shielded_storage::KvStore;

use crate::{CommitmentTreeError, Hashable, TreeSnapshot};

/// Reserved key of the in-progress tree.
pub const CURRENT_TREE_KEY: &[u8] = b"CURRENT_TREE";
/// Reserved key of the last finalized tree.
pub const LAST_TREE_KEY: &[u8] = b"LAST_TREE";

const HIGHEST_HEIGHT_KEY: &[u8] = b"highest_height";

/// Index key of a block height.
pub fn height_key(height: u64) -> [u8; 8] {
    height.to_be_bytes()
}

fn decode_height(bytes: &[u8]) -> Result<u64, CommitmentTreeError> {
    let buf: [u8; 8] = bytes.try_into().map_err(|_| {
        CommitmentTreeError::CorruptedData(format!("height must be 8 bytes, got {}", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(buf))
}

/// Snapshot keyspace.
#[derive(Clone, Debug)]
pub struct TreeStore<S> {
    store: S,
}

impl<S: KvStore> TreeStore<S> {
    /// Wrap a keyspace.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying keyspace.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Load and verify the snapshot stored under `key`.
    pub fn get<H: Hashable, const DEPTH: u8>(
        &self,
        key: &[u8],
    ) -> CostResult<Option<TreeSnapshot<H, DEPTH>>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let bytes = cost_return_on_error!(&mut cost, self.store.get(key));
        bytes
            .map(|bytes| TreeSnapshot::from_bytes(&bytes))
            .transpose()
            .wrap_with_cost(cost)
    }

    /// Store `snapshot` under `key`.
    pub fn put<H: Hashable, const DEPTH: u8>(
        &self,
        key: &[u8],
        snapshot: &TreeSnapshot<H, DEPTH>,
    ) -> CostResult<(), CommitmentTreeError> {
        self.store
            .put(key, &snapshot.to_bytes())
            .map_err(CommitmentTreeError::from)
    }

    /// Whether anything is stored under `key`.
    pub fn contains(&self, key: &[u8]) -> CostResult<bool, CommitmentTreeError> {
        self.store.contains(key).map_err(CommitmentTreeError::from)
    }

    /// Remove `key`.
    pub fn delete(&self, key: &[u8]) -> CostResult<(), CommitmentTreeError> {
        self.store.delete(key).map_err(CommitmentTreeError::from)
    }
}

/// One index entry: the root committed at a height, linked to the next
/// lower committed height.
#[derive(Clone, Debug, PartialEq, Eq)]
struct IndexEntry {
    prev: Option<u64>,
    root_key: Vec<u8>,
}

impl IndexEntry {
    /// `0x00 || root_key` or `0x01 || prev: u64 BE || root_key`.
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.root_key.len());
        match self.prev {
            None => buf.push(0x00),
            Some(prev) => {
                buf.push(0x01);
                buf.extend_from_slice(&height_key(prev));
            }
        }
        buf.extend_from_slice(&self.root_key);
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self, CommitmentTreeError> {
        match bytes.split_first() {
            Some((0x00, root_key)) => Ok(Self {
                prev: None,
                root_key: root_key.to_vec(),
            }),
            Some((0x01, rest)) if rest.len() >= 8 => {
                let (prev, root_key) = rest.split_at(8);
                Ok(Self {
                    prev: Some(decode_height(prev)?),
                    root_key: root_key.to_vec(),
                })
            }
            _ => Err(CommitmentTreeError::CorruptedData(format!(
                "invalid index entry: {}",
                hex::encode(bytes)
            ))),
        }
    }
}

/// Block height to root keyspace.
///
/// Entries form a chain from the highest committed height downwards, so
/// rollback and out-of-order inserts touch only the entries they pass,
/// however far apart the heights are.
#[derive(Clone, Debug)]
pub struct TreeIndex<S> {
    store: S,
}

impl<S: KvStore> TreeIndex<S> {
    /// Wrap a keyspace.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying keyspace.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Root key recorded for `height`.
    pub fn get(&self, height: u64) -> CostResult<Option<Vec<u8>>, CommitmentTreeError> {
        self.read_entry(height)
            .map_ok(|entry| entry.map(|entry| entry.root_key))
    }

    /// Highest committed height, if any.
    pub fn highest(&self) -> CostResult<Option<u64>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let bytes = cost_return_on_error!(&mut cost, self.store.get(HIGHEST_HEIGHT_KEY));
        bytes
            .map(|bytes| decode_height(&bytes))
            .transpose()
            .wrap_with_cost(cost)
    }

    /// Record `root_key` for `height`, replacing any root already recorded
    /// there.
    ///
    /// Appending above the highest height costs a constant number of
    /// operations. Inserting below it walks the entries above `height`. New
    /// entries are written before anything links to them.
    pub fn put(&self, height: u64, root_key: &[u8]) -> CostResult<(), CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let Some(highest) = cost_return_on_error!(&mut cost, self.highest()) else {
            let entry = IndexEntry {
                prev: None,
                root_key: root_key.to_vec(),
            };
            cost_return_on_error!(&mut cost, self.write_entry(height, &entry));
            return self.write_highest(height).add_cost(cost);
        };

        if height > highest {
            let entry = IndexEntry {
                prev: Some(highest),
                root_key: root_key.to_vec(),
            };
            cost_return_on_error!(&mut cost, self.write_entry(height, &entry));
            return self.write_highest(height).add_cost(cost);
        }

        // Find the lowest entry above `height`.
        let mut above = highest;
        let mut above_entry = cost_return_on_error!(&mut cost, self.required_entry(highest));
        if above == height {
            let entry = IndexEntry {
                prev: above_entry.prev,
                root_key: root_key.to_vec(),
            };
            return self.write_entry(height, &entry).add_cost(cost);
        }
        loop {
            match above_entry.prev {
                Some(prev) if prev > height => {
                    above = prev;
                    above_entry = cost_return_on_error!(&mut cost, self.required_entry(prev));
                }
                Some(prev) if prev == height => {
                    let existing = cost_return_on_error!(&mut cost, self.required_entry(prev));
                    let entry = IndexEntry {
                        prev: existing.prev,
                        root_key: root_key.to_vec(),
                    };
                    return self.write_entry(height, &entry).add_cost(cost);
                }
                prev => {
                    let entry = IndexEntry {
                        prev,
                        root_key: root_key.to_vec(),
                    };
                    cost_return_on_error!(&mut cost, self.write_entry(height, &entry));
                    above_entry.prev = Some(height);
                    return self.write_entry(above, &above_entry).add_cost(cost);
                }
            }
        }
    }

    /// Delete every entry above `target` and return the highest remaining
    /// `(height, root_key)`, if any.
    ///
    /// The highest-height pointer is moved before any entry is deleted so a
    /// crash part way never leaves it on a deleted entry.
    pub fn truncate_above(
        &self,
        target: u64,
    ) -> CostResult<Option<(u64, Vec<u8>)>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let Some(highest) = cost_return_on_error!(&mut cost, self.highest()) else {
            return Ok(None).wrap_with_cost(cost);
        };

        let mut doomed = Vec::new();
        let mut tip = None;
        let mut next = Some(highest);
        while let Some(height) = next {
            let entry = cost_return_on_error!(&mut cost, self.required_entry(height));
            if height <= target {
                tip = Some((height, entry.root_key));
                break;
            }
            doomed.push(height);
            next = entry.prev;
        }

        match &tip {
            Some((height, _)) if *height == highest => {}
            Some((height, _)) => {
                cost_return_on_error!(&mut cost, self.write_highest(*height));
            }
            None => {
                cost_return_on_error!(&mut cost, self.store.delete(HIGHEST_HEIGHT_KEY));
            }
        }
        for height in doomed {
            cost_return_on_error!(&mut cost, self.store.delete(&height_key(height)));
        }
        Ok(tip).wrap_with_cost(cost)
    }

    fn read_entry(&self, height: u64) -> CostResult<Option<IndexEntry>, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let bytes = cost_return_on_error!(&mut cost, self.store.get(&height_key(height)));
        bytes
            .map(|bytes| IndexEntry::decode(&bytes))
            .transpose()
            .wrap_with_cost(cost)
    }

    fn required_entry(&self, height: u64) -> CostResult<IndexEntry, CommitmentTreeError> {
        let mut cost = OperationCost::default();
        let entry = cost_return_on_error!(&mut cost, self.read_entry(height));
        let entry = cost_return_on_error_no_add!(
            &cost,
            entry.ok_or_else(|| CommitmentTreeError::CorruptedData(format!(
                "index chain references missing height {}",
                height
            )))
        );
        Ok(entry).wrap_with_cost(cost)
    }

    fn write_entry(&self, height: u64, entry: &IndexEntry) -> CostResult<(), CommitmentTreeError> {
        self.store
            .put(&height_key(height), &entry.encode())
            .map_err(CommitmentTreeError::from)
    }

    fn write_highest(&self, height: u64) -> CostResult<(), CommitmentTreeError> {
        self.store
            .put(HIGHEST_HEIGHT_KEY, &height_key(height))
            .map_err(CommitmentTreeError::from)
    }
}

#[cfg(test)]
mod tests {
    use shielded_storage::MemoryStore;

    use super::*;

    #[test]
    fn test_index_put_tracks_highest() {
        let index = TreeIndex::new(MemoryStore::new());
        assert_eq!(index.highest().unwrap().expect("highest"), None);

        index.put(10, b"root10").unwrap().expect("put 10");
        index.put(11, b"root11").unwrap().expect("put 11");
        index.put(12, b"root12").unwrap().expect("put 12");
        assert_eq!(index.highest().unwrap().expect("highest"), Some(12));
        assert_eq!(index.get(11).unwrap().expect("get"), Some(b"root11".to_vec()));
        assert_eq!(index.get(13).unwrap().expect("get"), None);
    }

    #[test]
    fn test_put_replaces_existing_height() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(3, b"a3").unwrap().expect("put");
        index.put(7, b"a7").unwrap().expect("put");
        index.put(9, b"a9").unwrap().expect("put");

        index.put(9, b"b9").unwrap().expect("replace tip");
        index.put(7, b"b7").unwrap().expect("replace middle");
        assert_eq!(index.get(9).unwrap().expect("get"), Some(b"b9".to_vec()));
        assert_eq!(index.get(7).unwrap().expect("get"), Some(b"b7".to_vec()));

        // The chain below the replaced entries is intact.
        let tip = index.truncate_above(6).unwrap().expect("truncate");
        assert_eq!(tip, Some((3, b"a3".to_vec())));
    }

    #[test]
    fn test_put_below_highest_links_into_chain() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(5, b"root5").unwrap().expect("put");
        index.put(1, b"root1").unwrap().expect("put");
        index.put(3, b"root3").unwrap().expect("put");
        assert_eq!(index.highest().unwrap().expect("highest"), Some(5));

        let tip = index.truncate_above(4).unwrap().expect("truncate");
        assert_eq!(tip, Some((3, b"root3".to_vec())));
        let tip = index.truncate_above(2).unwrap().expect("truncate");
        assert_eq!(tip, Some((1, b"root1".to_vec())));
        assert_eq!(index.get(3).unwrap().expect("get"), None);
        assert_eq!(index.highest().unwrap().expect("highest"), Some(1));
    }

    #[test]
    fn test_truncate_above_returns_new_tip() {
        let index = TreeIndex::new(MemoryStore::new());
        for height in 5..=9u64 {
            index
                .put(height, format!("root{}", height).as_bytes())
                .unwrap()
                .expect("put");
        }

        let tip = index.truncate_above(7).unwrap().expect("truncate");
        assert_eq!(tip, Some((7, b"root7".to_vec())));
        assert_eq!(index.get(8).unwrap().expect("get 8"), None);
        assert_eq!(index.get(9).unwrap().expect("get 9"), None);
        assert_eq!(index.highest().unwrap().expect("highest"), Some(7));

        // Truncating above the tip changes nothing.
        let tip = index.truncate_above(100).unwrap().expect("truncate");
        assert_eq!(tip, Some((7, b"root7".to_vec())));
        assert_eq!(index.get(5).unwrap().expect("get 5"), Some(b"root5".to_vec()));
    }

    #[test]
    fn test_truncate_below_lowest_clears_index() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(5, b"root5").unwrap().expect("put");
        index.put(6, b"root6").unwrap().expect("put");

        assert_eq!(index.truncate_above(4).unwrap().expect("truncate"), None);
        assert_eq!(index.highest().unwrap().expect("highest"), None);
        assert_eq!(index.get(5).unwrap().expect("get"), None);
        assert!(index.inner().is_empty());
    }

    #[test]
    fn test_truncate_skips_gaps() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(1, b"root1").unwrap().expect("put");
        index.put(4, b"root4").unwrap().expect("put");

        let tip = index.truncate_above(3).unwrap().expect("truncate");
        assert_eq!(tip, Some((1, b"root1".to_vec())));
        assert_eq!(index.highest().unwrap().expect("highest"), Some(1));
    }

    #[test]
    fn test_truncate_cost_ignores_height_gap() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(1, b"root1").unwrap().expect("put");
        index.put(2_000_000, b"root2m").unwrap().expect("put");

        let ctx = index.truncate_above(0);
        assert!(
            ctx.cost.seek_count < 20,
            "seek count {} grows with the height gap",
            ctx.cost.seek_count
        );
        assert_eq!(ctx.value.expect("truncate"), None);
        assert!(index.inner().is_empty());
    }

    #[test]
    fn test_put_below_sparse_tip_ignores_height_gap() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(2_000_000, b"root2m").unwrap().expect("put");

        let ctx = index.put(1, b"root1");
        assert!(ctx.cost.seek_count < 20);
        ctx.value.expect("put");
        assert_eq!(index.get(1).unwrap().expect("get"), Some(b"root1".to_vec()));
    }

    #[test]
    fn test_broken_chain_is_corrupted_data() {
        let index = TreeIndex::new(MemoryStore::new());
        index.put(1, b"root1").unwrap().expect("put");
        index.put(2, b"root2").unwrap().expect("put");
        index
            .inner()
            .delete(&height_key(1))
            .unwrap()
            .expect("delete");

        let result = index.truncate_above(0).unwrap();
        assert!(matches!(result, Err(CommitmentTreeError::CorruptedData(_))));
    }

    #[test]
    fn test_height_keys_sort_by_height() {
        assert!(height_key(255) < height_key(256));
        assert_eq!(decode_height(&height_key(42)).expect("decode"), 42);
        assert!(decode_height(b"short").is_err());
    }
}
