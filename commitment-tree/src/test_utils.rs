//! Shared test utilities for the commitment-tree crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use shielded_costs::{CostResult, CostsExt, OperationCost};
use shielded_storage::{Error, KvStore, MemoryStore};

use crate::{CommitmentHash, Hashable};

/// 16-bit node with `combine(a, b) = (2a + b) mod 65536` and empty leaf `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToyHash(pub u16);

impl Hashable for ToyHash {
    const SIZE: usize = 2;

    fn empty_leaf() -> Self {
        ToyHash(1)
    }

    fn combine(_level: u8, left: &Self, right: &Self) -> Self {
        ToyHash(left.0.wrapping_mul(2).wrapping_add(right.0))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(|b| ToyHash(u16::from_be_bytes(b)))
    }
}

/// Deterministic distinct commitment for an index.
pub fn test_commitment(index: u64) -> CommitmentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"test_commitment");
    hasher.update(&index.to_be_bytes());
    CommitmentHash(*hasher.finalize().as_bytes())
}

/// Root of the full depth-`depth` tree over `leaves` padded with empty
/// leaves, computed level by level.
pub fn brute_force_root<H: Hashable>(leaves: &[H], depth: u8) -> H {
    let width = 1usize << depth;
    assert!(leaves.len() <= width, "too many leaves for depth");
    let mut level: Vec<H> = leaves.to_vec();
    level.resize(width, H::empty_leaf());
    for l in 0..depth {
        level = level
            .chunks(2)
            .map(|pair| H::combine(l, &pair[0], &pair[1]))
            .collect();
    }
    level.remove(0)
}

/// Memory store that starts failing writes after a budget runs out.
pub struct FailingStore {
    pub inner: MemoryStore,
    writes_left: AtomicUsize,
}

impl FailingStore {
    pub fn new(writes_allowed: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            writes_left: AtomicUsize::new(writes_allowed),
        }
    }

    pub fn allow_writes(&self, writes_allowed: usize) {
        self.writes_left.store(writes_allowed, Ordering::SeqCst);
    }

    fn take_write(&self) -> Result<(), Error> {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| Error::StorageError("injected write failure".to_string()))
    }
}

impl KvStore for FailingStore {
    fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        self.inner.get(key)
    }

    fn contains(&self, key: &[u8]) -> CostResult<bool, Error> {
        self.inner.contains(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> CostResult<(), Error> {
        match self.take_write() {
            Ok(()) => self.inner.put(key, value),
            Err(e) => Err(e).wrap_with_cost(OperationCost::default()),
        }
    }

    fn delete(&self, key: &[u8]) -> CostResult<(), Error> {
        match self.take_write() {
            Ok(()) => self.inner.delete(key),
            Err(e) => Err(e).wrap_with_cost(OperationCost::default()),
        }
    }
}
