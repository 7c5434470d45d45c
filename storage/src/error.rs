//! Storage errors

/// Storage and underlying errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic backend failure
    #[error("storage error: {0}")]
    StorageError(String),
    /// A keyspace the caller asked for was never opened
    #[error("missing keyspace: {0}")]
    MissingKeyspace(String),
    /// Rocks DB error
    #[cfg(feature = "rocksdb_storage")]
    #[error("rocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
}
