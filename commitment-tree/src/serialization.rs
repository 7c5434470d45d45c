//! Binary serialization for frontiers and witnesses.
//!
//! # Wire Format
//!
//! ## IncrementalMerkleTree
//! ```text
//! version: u8 (0x01)
//! size: u64 BE
//! left: optional hash
//! right: optional hash
//! parent_count: u8
//! parents: [parent_count × optional hash]
//! ```
//! An optional hash is `0x00` (empty) or `0x01` followed by `H::SIZE` bytes.
//!
//! ## MerkleWitness
//! ```text
//! tree: IncrementalMerkleTree
//! filled_count: u8
//! filled: [filled_count × H::SIZE bytes]
//! cursor: 0x00 | 0x01 + cursor_depth: u8 + IncrementalMerkleTree
//! ```

use crate::{CommitmentTreeError, Hashable, IncrementalMerkleTree, MerkleWitness};

const FORMAT_VERSION: u8 = 0x01;
const SLOT_EMPTY: u8 = 0x00;
const SLOT_FILLED: u8 = 0x01;

/// Cursor over a byte slice with bounds-checked reads.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8], CommitmentTreeError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(CommitmentTreeError::CorruptedData(format!(
                "truncated {} at offset {}",
                what, self.pos
            ))),
        }
    }

    pub(crate) fn read_u8(&mut self, what: &str) -> Result<u8, CommitmentTreeError> {
        Ok(self.read_bytes(1, what)?[0])
    }

    pub(crate) fn read_u64(&mut self, what: &str) -> Result<u64, CommitmentTreeError> {
        let bytes = self.read_bytes(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    pub(crate) fn read_hash<H: Hashable>(&mut self, what: &str) -> Result<H, CommitmentTreeError> {
        let bytes = self.read_bytes(H::SIZE, what)?;
        H::from_bytes(bytes)
            .ok_or_else(|| CommitmentTreeError::CorruptedData(format!("invalid {} hash", what)))
    }

    fn read_optional_hash<H: Hashable>(&mut self, what: &str) -> Result<Option<H>, CommitmentTreeError> {
        match self.read_u8(what)? {
            SLOT_EMPTY => Ok(None),
            SLOT_FILLED => self.read_hash(what).map(Some),
            flag => Err(CommitmentTreeError::CorruptedData(format!(
                "invalid {} flag: 0x{:02x}",
                what, flag
            ))),
        }
    }

    pub(crate) fn finish(&self) -> Result<(), CommitmentTreeError> {
        if self.pos != self.data.len() {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}

fn write_optional_hash<H: Hashable>(buf: &mut Vec<u8>, hash: Option<&H>) {
    match hash {
        None => buf.push(SLOT_EMPTY),
        Some(hash) => {
            buf.push(SLOT_FILLED);
            buf.extend_from_slice(&hash.to_bytes());
        }
    }
}

impl<H: Hashable, const DEPTH: u8> IncrementalMerkleTree<H, DEPTH> {
    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&self.size.to_be_bytes());
        write_optional_hash(buf, self.left.as_ref());
        write_optional_hash(buf, self.right.as_ref());
        buf.push(self.parents.len() as u8);
        for parent in &self.parents {
            write_optional_hash(buf, parent.as_ref());
        }
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, CommitmentTreeError> {
        let version = reader.read_u8("version")?;
        if version != FORMAT_VERSION {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "unsupported tree format version {}",
                version
            )));
        }
        let size = reader.read_u64("size")?;
        let left = reader.read_optional_hash("left")?;
        let right = reader.read_optional_hash("right")?;
        let parent_count = reader.read_u8("parent count")? as usize;
        if parent_count >= DEPTH as usize {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "{} parents exceed depth {}",
                parent_count, DEPTH
            )));
        }
        let mut parents = Vec::with_capacity(parent_count);
        for _ in 0..parent_count {
            parents.push(reader.read_optional_hash("parent")?);
        }

        let tree = Self {
            left,
            right,
            parents,
            size,
        };
        if tree.left.is_none() && (tree.right.is_some() || !tree.parents.is_empty()) {
            return Err(CommitmentTreeError::CorruptedData(
                "frontier has slots filled without a left leaf".to_string(),
            ));
        }
        if tree.derived_size() != size {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "size {} does not match frontier ({} leaves)",
                size,
                tree.derived_size()
            )));
        }
        Ok(tree)
    }

    /// Serialize the frontier.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write(&mut buf);
        buf
    }

    /// Deserialize a frontier, validating its shape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommitmentTreeError> {
        let mut reader = ByteReader::new(bytes);
        let tree = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(tree)
    }
}

impl<H: Hashable, const DEPTH: u8> MerkleWitness<H, DEPTH> {
    /// Serialize the witness.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.tree.write(&mut buf);
        buf.push(self.filled.len() as u8);
        for hash in &self.filled {
            buf.extend_from_slice(&hash.to_bytes());
        }
        match &self.cursor {
            None => buf.push(SLOT_EMPTY),
            Some(cursor) => {
                buf.push(SLOT_FILLED);
                buf.push(self.cursor_depth);
                cursor.write(&mut buf);
            }
        }
        buf
    }

    /// Deserialize a witness, validating its shape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommitmentTreeError> {
        let mut reader = ByteReader::new(bytes);
        let tree = IncrementalMerkleTree::<H, DEPTH>::read(&mut reader)?;
        if tree.is_empty() {
            return Err(CommitmentTreeError::CorruptedData(
                "witness over an empty tree".to_string(),
            ));
        }
        let filled_count = reader.read_u8("filled count")? as usize;
        if filled_count > tree.right_sibling_levels() {
            return Err(CommitmentTreeError::CorruptedData(format!(
                "{} filled siblings exceed the {} open levels",
                filled_count,
                tree.right_sibling_levels()
            )));
        }
        let mut filled = Vec::with_capacity(filled_count);
        for _ in 0..filled_count {
            filled.push(reader.read_hash("filled")?);
        }

        let (cursor_depth, cursor) = match reader.read_u8("cursor flag")? {
            SLOT_EMPTY => (0, None),
            SLOT_FILLED => {
                let cursor_depth = reader.read_u8("cursor depth")?;
                if cursor_depth == 0 || cursor_depth >= DEPTH {
                    return Err(CommitmentTreeError::CorruptedData(format!(
                        "invalid cursor depth {}",
                        cursor_depth
                    )));
                }
                if filled_count >= tree.right_sibling_levels()
                    || cursor_depth as usize != tree.next_depth(filled_count)
                {
                    return Err(CommitmentTreeError::CorruptedData(format!(
                        "cursor depth {} does not match the next open level after {} filled",
                        cursor_depth, filled_count
                    )));
                }
                let cursor = IncrementalMerkleTree::<H, DEPTH>::read(&mut reader)?;
                if cursor.is_empty() || cursor.is_complete_at(cursor_depth) {
                    return Err(CommitmentTreeError::CorruptedData(
                        "cursor must be partially filled".to_string(),
                    ));
                }
                (cursor_depth, Some(cursor))
            }
            flag => {
                return Err(CommitmentTreeError::CorruptedData(format!(
                    "invalid cursor flag: 0x{:02x}",
                    flag
                )));
            }
        };
        reader.finish()?;

        Ok(Self {
            tree,
            filled,
            cursor_depth,
            cursor,
        })
    }
}
