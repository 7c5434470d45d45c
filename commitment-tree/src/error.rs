use thiserror::Error;

/// Errors that can occur during commitment tree operations.
#[derive(Debug, Error)]
pub enum CommitmentTreeError {
    /// The tree already holds `2^depth` leaves. Fatal for the block being
    /// assembled.
    #[error("tree is full (depth {depth}, max {max} leaves)", max = 1u128 << .depth)]
    DepthExceeded { depth: u8 },
    /// Unknown root or tree key. The referencing anchor is stale or invalid.
    #[error("not found: {0}")]
    NotFound(String),
    /// A witness path was requested before every level had a sibling.
    #[error("witness incomplete: {resolved} of {depth} levels resolved")]
    Incomplete { resolved: u8, depth: u8 },
    /// Authentication path requested from a tree with no leaves.
    #[error("tree has no leaves")]
    EmptyTree,
    /// The commitment is not the leaf the snapshot can produce a path for.
    #[error("commitment is not the most recent leaf of the snapshot")]
    LeafMismatch,
    /// Stored bytes could not be decoded or failed verification.
    #[error("corrupted data: {0}")]
    CorruptedData(String),
    /// Underlying persistence failure.
    #[error("storage error: {0}")]
    StorageError(#[from] shielded_storage::Error),
}
