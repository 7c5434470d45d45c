//! In-process store backed by a `BTreeMap`.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use shielded_costs::{CostResult, CostsExt, OperationCost};

use crate::{Error, KvStore};

/// Thread-safe in-memory [`KvStore`].
///
/// Readers share a read lock so historical lookups can run alongside block
/// application. Costs are reported exactly like a disk store would report
/// them, which keeps cost assertions in tests meaningful.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys, in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.read()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>, Error> {
        self.data
            .read()
            .map_err(|_| Error::StorageError("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>, Error> {
        self.data
            .write()
            .map_err(|_| Error::StorageError("memory store lock poisoned".to_string()))
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.keys().iter().map(hex::encode).collect();
        f.debug_struct("MemoryStore").field("keys", &keys).finish()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        match self.read() {
            Ok(data) => Ok::<_, Error>(data.get(key).cloned()).wrap_fn_cost(|value| {
                let loaded = value.as_ref().ok().and_then(Option::as_ref);
                OperationCost::for_read(loaded.map_or(0, Vec::len))
            }),
            Err(e) => Err(e).wrap_with_cost(OperationCost::default()),
        }
    }

    fn contains(&self, key: &[u8]) -> CostResult<bool, Error> {
        match self.read() {
            Ok(data) => Ok(data.contains_key(key)).wrap_with_cost(OperationCost::with_seek_count(1)),
            Err(e) => Err(e).wrap_with_cost(OperationCost::default()),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> CostResult<(), Error> {
        match self.write() {
            Ok(mut data) => {
                data.insert(key.to_vec(), value.to_vec());
                Ok(()).wrap_with_cost(OperationCost::for_write(key, value))
            }
            Err(e) => Err(e).wrap_with_cost(OperationCost::default()),
        }
    }

    fn delete(&self, key: &[u8]) -> CostResult<(), Error> {
        match self.write() {
            Ok(mut data) => {
                let removed = data
                    .remove(key)
                    .map_or(0, |value| key.len() + value.len());
                Ok(()).wrap_with_cost(OperationCost::for_removal(removed))
            }
            Err(e) => Err(e).wrap_with_cost(OperationCost::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn put_get_contains_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put(b"k", b"value").unwrap().expect("put");
        assert_eq!(store.get(b"k").unwrap().expect("get"), Some(b"value".to_vec()));
        assert!(store.contains(b"k").unwrap().expect("contains"));
        assert!(!store.contains(b"other").unwrap().expect("contains other"));

        store.delete(b"k").unwrap().expect("delete");
        assert_eq!(store.get(b"k").unwrap().expect("get after delete"), None);
        store.delete(b"k").unwrap().expect("deleting twice is fine");
    }

    #[test]
    fn costs_reflect_bytes() {
        let store = MemoryStore::new();
        let put = store.put(b"abc", b"12345");
        assert_eq!(put.cost.storage_written_bytes, 8);
        assert_eq!(put.cost.seek_count, 1);

        let get = store.get(b"abc");
        assert_eq!(get.cost.storage_loaded_bytes, 5);

        let missing = store.get(b"zzz");
        assert_eq!(missing.cost.storage_loaded_bytes, 0);
        assert_eq!(missing.cost.seek_count, 1);

        let delete = store.delete(b"abc");
        assert_eq!(delete.cost.storage_removed_bytes, 8);
    }

    #[test]
    fn last_write_wins() {
        let store = MemoryStore::new();
        store.put(b"k", b"one").unwrap().expect("put one");
        store.put(b"k", b"two").unwrap().expect("put two");
        assert_eq!(store.get(b"k").unwrap().expect("get"), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn shared_readers_across_threads() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"anchor", b"tree").unwrap().expect("put");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.contains(b"anchor").unwrap().expect("contains"))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().expect("reader thread"));
        }
    }

    #[test]
    fn debug_prints_hex_keys() {
        let store = MemoryStore::new();
        store.put(&[0xab, 0xcd], b"v").unwrap().expect("put");
        assert!(format!("{:?}", store).contains("abcd"));
    }
}
