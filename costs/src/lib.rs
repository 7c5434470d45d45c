#![deny(missing_docs)]
//! Cost accounting shared by the shielded commitment tree crates.
//!
//! Every operation that touches persistence or runs the compression function
//! reports what it did through an [`OperationCost`]. Results travel inside a
//! [`CostContext`] so callers can accumulate costs across a whole block
//! application without losing them on early returns.

pub mod context;

use std::ops::{Add, AddAssign};

pub use context::{CostContext, CostResult, CostsExt};

/// Approximate resources consumed by an operation.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct OperationCost {
    /// Number of storage lookups (get, contains, put and delete each count one).
    pub seek_count: u32,
    /// Bytes written to storage.
    pub storage_written_bytes: u64,
    /// Bytes loaded from storage.
    pub storage_loaded_bytes: u64,
    /// Bytes removed from storage.
    pub storage_removed_bytes: u64,
    /// Invocations of the two-to-one compression function.
    pub compress_calls: u32,
}

impl OperationCost {
    /// Cost of a single storage seek.
    pub fn with_seek_count(seek_count: u32) -> Self {
        OperationCost {
            seek_count,
            ..Default::default()
        }
    }

    /// Cost of `compress_calls` compression function invocations.
    pub fn with_compress_calls(compress_calls: u32) -> Self {
        OperationCost {
            compress_calls,
            ..Default::default()
        }
    }

    /// Cost of one read returning `loaded` bytes.
    pub fn for_read(loaded: usize) -> Self {
        OperationCost {
            seek_count: 1,
            storage_loaded_bytes: loaded as u64,
            ..Default::default()
        }
    }

    /// Cost of one write of `key` and `value`.
    pub fn for_write(key: &[u8], value: &[u8]) -> Self {
        OperationCost {
            seek_count: 1,
            storage_written_bytes: (key.len() + value.len()) as u64,
            ..Default::default()
        }
    }

    /// Cost of one removal freeing `removed` bytes.
    pub fn for_removal(removed: usize) -> Self {
        OperationCost {
            seek_count: 1,
            storage_removed_bytes: removed as u64,
            ..Default::default()
        }
    }
}

impl Add for OperationCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        OperationCost {
            seek_count: self.seek_count + rhs.seek_count,
            storage_written_bytes: self.storage_written_bytes + rhs.storage_written_bytes,
            storage_loaded_bytes: self.storage_loaded_bytes + rhs.storage_loaded_bytes,
            storage_removed_bytes: self.storage_removed_bytes + rhs.storage_removed_bytes,
            compress_calls: self.compress_calls + rhs.compress_calls,
        }
    }
}

impl AddAssign for OperationCost {
    fn add_assign(&mut self, rhs: Self) {
        self.seek_count += rhs.seek_count;
        self.storage_written_bytes += rhs.storage_written_bytes;
        self.storage_loaded_bytes += rhs.storage_loaded_bytes;
        self.storage_removed_bytes += rhs.storage_removed_bytes;
        self.compress_calls += rhs.compress_calls;
    }
}

/// Early return on error for expressions producing a [`CostResult`].
///
/// The inner cost is added to the accumulator named after `&mut`; on error
/// the function returns with everything accumulated so far.
#[macro_export]
macro_rules! cost_return_on_error {
    ( &mut $cost:ident, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result_with_cost = { $($body)+ };
            let result = result_with_cost.unwrap_add_cost(&mut $cost);
            match result {
                Ok(x) => x,
                Err(e) => return Err(e.into()).wrap_with_cost($cost),
            }
        }
    };
}

/// Early return on error for plain `Result` expressions.
///
/// No cost is added; the accumulator is only used for the early return.
#[macro_export]
macro_rules! cost_return_on_error_no_add {
    ( &$cost:ident, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result = { $($body)+ };
            match result {
                Ok(x) => x,
                Err(e) => return Err(e.into()).wrap_with_cost($cost),
            }
        }
    };
}
