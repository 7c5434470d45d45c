#![deny(missing_docs)]

//! Key-value persistence abstraction for the shielded commitment tree.
//!
//! The commitment tree never talks to a database directly. It goes through
//! [`KvStore`], a binary key to binary value mapping whose calls are each
//! atomic. [`MemoryStore`] is the in-process implementation; the RocksDB
//! backend lives behind the `rocksdb_storage` feature.

mod error;
mod kv_store;
mod memory;
#[cfg(feature = "rocksdb_storage")]
pub mod rocksdb_store;

pub use error::Error;
pub use kv_store::KvStore;
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb_storage")]
pub use rocksdb_store::{RocksDbKeyspace, RocksDbStorage};
