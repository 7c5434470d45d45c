//! Persisted form of a tree: the frontier together with its root.

use crate::{CommitmentTreeError, Hashable, IncrementalMerkleTree, serialization::ByteReader};

/// A frontier paired with the root it derives.
///
/// Encoded as `root || tree`. Decoding recomputes the root from the frontier
/// and rejects the bytes if the two disagree, so a snapshot read back from
/// storage is always self-consistent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeSnapshot<H, const DEPTH: u8> {
    tree: IncrementalMerkleTree<H, DEPTH>,
    root: H,
}

impl<H: Hashable, const DEPTH: u8> TreeSnapshot<H, DEPTH> {
    /// Snapshot `tree`, deriving its root.
    pub fn new(tree: IncrementalMerkleTree<H, DEPTH>) -> Self {
        let root = tree.root();
        Self { tree, root }
    }

    /// Snapshot of an empty tree.
    pub fn empty() -> Self {
        Self::new(IncrementalMerkleTree::new())
    }

    /// The frontier.
    pub fn tree(&self) -> &IncrementalMerkleTree<H, DEPTH> {
        &self.tree
    }

    /// Take the frontier out.
    pub fn into_tree(self) -> IncrementalMerkleTree<H, DEPTH> {
        self.tree
    }

    /// The derived root.
    pub fn root(&self) -> &H {
        &self.root
    }

    /// Key under which the snapshot is stored content-addressed.
    pub fn root_key(&self) -> Vec<u8> {
        self.root.to_bytes()
    }

    /// Encode as `root || tree`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.root.to_bytes();
        self.tree.write(&mut buf);
        buf
    }

    /// Decode and verify the stored root against the frontier.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommitmentTreeError> {
        let mut reader = ByteReader::new(bytes);
        let root: H = reader.read_hash("root")?;
        let tree = IncrementalMerkleTree::<H, DEPTH>::read(&mut reader)?;
        reader.finish()?;

        let derived = tree.root();
        if derived != root {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "stored root {} does not match frontier root {}",
                hex::encode(root.to_bytes()),
                hex::encode(derived.to_bytes())
            )));
        }
        Ok(Self { tree, root })
    }
}

impl<H: Hashable, const DEPTH: u8> From<IncrementalMerkleTree<H, DEPTH>> for TreeSnapshot<H, DEPTH> {
    fn from(tree: IncrementalMerkleTree<H, DEPTH>) -> Self {
        Self::new(tree)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{CommitmentHash, test_utils::test_commitment};

    type Snapshot = TreeSnapshot<CommitmentHash, 8>;

    #[test]
    fn test_snapshot_roundtrip() {
        let mut tree = IncrementalMerkleTree::new();
        for i in 0..13 {
            tree.append(test_commitment(i)).unwrap().expect("append");
        }
        let snapshot = Snapshot::new(tree.clone());
        assert_eq!(snapshot.root(), &tree.root());
        assert_eq!(snapshot.root_key(), tree.root().to_bytes());

        let decoded = Snapshot::from_bytes(&snapshot.to_bytes()).expect("decode");
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.into_tree(), tree);
    }

    #[test]
    fn test_snapshot_rejects_forged_root() {
        let snapshot = Snapshot::empty();
        let mut bytes = snapshot.to_bytes();
        bytes[0] ^= 0xff;
        assert_matches!(
            Snapshot::from_bytes(&bytes),
            Err(CommitmentTreeError::CorruptedData(_))
        );
    }
}
