use std::sync::Arc;

use shielded_costs::CostResult;

use crate::Error;

/// Binary key to binary value persistence.
///
/// Every call is atomic on its own and writes are durable once the call
/// returns `Ok`. Methods take `&self` so that one store can be shared
/// between the block-application path and concurrent readers; implementors
/// provide their own interior synchronization.
pub trait KvStore {
    /// Fetch the value stored under `key`.
    fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error>;

    /// Whether anything is stored under `key`.
    fn contains(&self, key: &[u8]) -> CostResult<bool, Error>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> CostResult<(), Error>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> CostResult<(), Error>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        (**self).get(key)
    }

    fn contains(&self, key: &[u8]) -> CostResult<bool, Error> {
        (**self).contains(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> CostResult<(), Error> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> CostResult<(), Error> {
        (**self).delete(key)
    }
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        (**self).get(key)
    }

    fn contains(&self, key: &[u8]) -> CostResult<bool, Error> {
        (**self).contains(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> CostResult<(), Error> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> CostResult<(), Error> {
        (**self).delete(key)
    }
}
