//! Storage backend over RocksDB.
//!
//! The commitment tree uses two keyspaces, each a column family: `trees`
//! (reserved snapshot keys and content-addressed snapshots) and
//! `tree_index` (block height to root).

use std::{path::Path, sync::Arc};

use lazy_static::lazy_static;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB};
use shielded_costs::{CostResult, CostsExt, OperationCost};

use crate::{Error, KvStore};

/// Column family holding tree snapshots.
pub const TREES_CF_NAME: &str = "trees";
/// Column family holding the block height index.
pub const TREE_INDEX_CF_NAME: &str = "tree_index";

lazy_static! {
    static ref DEFAULT_OPTS: rocksdb::Options = {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.create_missing_column_families(true);
        opts.set_atomic_flush(true);
        opts
    };
}

/// RocksDB database opened with the commitment tree column families.
#[derive(Clone)]
pub struct RocksDbStorage {
    db: Arc<DB>,
}

impl RocksDbStorage {
    /// Open (or create) a database at `path`.
    pub fn default_rocksdb_with_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let db = DB::open_cf_descriptors(
            &DEFAULT_OPTS,
            &path,
            [
                ColumnFamilyDescriptor::new(TREES_CF_NAME, DEFAULT_OPTS.clone()),
                ColumnFamilyDescriptor::new(TREE_INDEX_CF_NAME, DEFAULT_OPTS.clone()),
            ],
        )?;
        Ok(RocksDbStorage { db: Arc::new(db) })
    }

    /// Handle on a named column family.
    pub fn keyspace(&self, cf_name: &'static str) -> Result<RocksDbKeyspace, Error> {
        if self.db.cf_handle(cf_name).is_none() {
            return Err(Error::MissingKeyspace(cf_name.to_string()));
        }
        Ok(RocksDbKeyspace {
            db: Arc::clone(&self.db),
            cf_name,
        })
    }

    /// Keyspace for tree snapshots.
    pub fn trees(&self) -> Result<RocksDbKeyspace, Error> {
        self.keyspace(TREES_CF_NAME)
    }

    /// Keyspace for the height index.
    pub fn tree_index(&self) -> Result<RocksDbKeyspace, Error> {
        self.keyspace(TREE_INDEX_CF_NAME)
    }

    /// Flush memtables of every column family to disk.
    pub fn flush(&self) -> Result<(), Error> {
        Ok(self.db.flush()?)
    }
}

/// One column family of a [`RocksDbStorage`], usable as a [`KvStore`].
#[derive(Clone)]
pub struct RocksDbKeyspace {
    db: Arc<DB>,
    cf_name: &'static str,
}

impl RocksDbKeyspace {
    fn cf(&self) -> Result<&ColumnFamily, Error> {
        self.db
            .cf_handle(self.cf_name)
            .ok_or_else(|| Error::MissingKeyspace(self.cf_name.to_string()))
    }
}

impl KvStore for RocksDbKeyspace {
    fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        let result = self
            .cf()
            .and_then(|cf| self.db.get_cf(cf, key).map_err(Error::from));
        match result {
            Ok(value) => {
                let loaded = value.as_ref().map_or(0, Vec::len);
                Ok(value).wrap_with_cost(OperationCost::for_read(loaded))
            }
            Err(e) => Err(e).wrap_with_cost(OperationCost::with_seek_count(1)),
        }
    }

    fn contains(&self, key: &[u8]) -> CostResult<bool, Error> {
        self.cf()
            .and_then(|cf| {
                self.db
                    .get_pinned_cf(cf, key)
                    .map(|value| value.is_some())
                    .map_err(Error::from)
            })
            .wrap_with_cost(OperationCost::with_seek_count(1))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> CostResult<(), Error> {
        self.cf()
            .and_then(|cf| self.db.put_cf(cf, key, value).map_err(Error::from))
            .wrap_with_cost(OperationCost::for_write(key, value))
    }

    fn delete(&self, key: &[u8]) -> CostResult<(), Error> {
        let mut cost = OperationCost::default();
        let existing = match self.get(key).unwrap_add_cost(&mut cost) {
            Ok(existing) => existing,
            Err(e) => return Err(e).wrap_with_cost(cost),
        };
        let removed = existing.map_or(0, |value| key.len() + value.len());
        let result = self
            .cf()
            .and_then(|cf| self.db.delete_cf(cf, key).map_err(Error::from));
        cost.storage_removed_bytes += removed as u64;
        result.wrap_with_cost(cost)
    }
}

/// RocksDB storage in a temporary directory, removed on drop.
pub struct TempStorage {
    storage: RocksDbStorage,
    _dir: tempfile::TempDir,
}

impl TempStorage {
    /// Create new `TempStorage`
    pub fn new() -> Result<Self, Error> {
        let dir = tempfile::TempDir::new()
            .map_err(|e| Error::StorageError(format!("cannot create tempdir: {}", e)))?;
        let storage = RocksDbStorage::default_rocksdb_with_path(dir.path())?;
        Ok(TempStorage { storage, _dir: dir })
    }
}

impl std::ops::Deref for TempStorage {
    type Target = RocksDbStorage;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}
