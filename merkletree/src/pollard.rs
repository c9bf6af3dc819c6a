//! Pollards: the flattened top levels of a tree.
//!
//! A pollard of depth `h` holds the digests at heap indices
//! `[1, 2^(h+1) - 1]`, root first. Any proof whose path is at least `h`
//! siblings long can be checked against the pollard entry it reaches instead
//! of the root.

use bincode::{Decode, Encode};
use tracing::trace;

use crate::{
    HashProvider, MerkleTree, MerkleTreeError,
    hash::node_hash,
    proof::{MAX_DECODE_BYTES, MAX_PROOF_SIBLINGS},
    tree::ROOT_INDEX,
};

/// The top `depth + 1` levels of a Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "PollardLevels")
)]
pub struct Pollard {
    depth: u32,
    digests: Vec<Vec<u8>>,
}

/// Unchecked wire form of a [`Pollard`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct PollardLevels {
    depth: u32,
    digests: Vec<Vec<u8>>,
}

#[cfg(feature = "serde")]
impl TryFrom<PollardLevels> for Pollard {
    type Error = MerkleTreeError;

    fn try_from(levels: PollardLevels) -> Result<Self, Self::Error> {
        Pollard::with_declared_depth(levels.depth, levels.digests)
    }
}

impl Pollard {
    /// Take the top `depth + 1` levels of `tree`.
    pub fn generate<H: HashProvider>(
        tree: &MerkleTree<H>,
        depth: u32,
    ) -> Result<Self, MerkleTreeError> {
        let max = tree.height();
        if depth > max {
            return Err(MerkleTreeError::InvalidDepth { depth, max });
        }
        let node_count = (1usize << (depth + 1)) - 1;
        let digests = (ROOT_INDEX..=node_count)
            .map(|index| tree.node(index).to_vec())
            .collect();
        trace!(depth, node_count, "generated pollard");
        Ok(Pollard { depth, digests })
    }

    /// Wrap digests received in heap order, root first.
    ///
    /// The count must be `2^(h+1) - 1` for some depth `h`, and all digests
    /// must have the same non-zero length.
    pub fn from_digests(digests: Vec<Vec<u8>>) -> Result<Self, MerkleTreeError> {
        let count = digests.len();
        let depth = (count + 1).trailing_zeros();
        if count == 0 || (count + 1) != 1usize << depth {
            return Err(MerkleTreeError::InvalidData(format!(
                "{} digests do not form complete pollard levels",
                count
            )));
        }
        if depth as usize > MAX_PROOF_SIBLINGS + 1 {
            return Err(MerkleTreeError::InvalidData(format!(
                "pollard of {} levels is deeper than any tree",
                depth
            )));
        }
        let digest_len = digests[0].len();
        if digest_len == 0 || digests.iter().any(|d| d.len() != digest_len) {
            return Err(MerkleTreeError::InvalidData(
                "pollard digests must share one non-zero length".into(),
            ));
        }
        Ok(Pollard {
            depth: depth - 1,
            digests,
        })
    }

    /// [`from_digests`](Self::from_digests), additionally checking a depth
    /// carried alongside the digests.
    fn with_declared_depth(depth: u32, digests: Vec<Vec<u8>>) -> Result<Self, MerkleTreeError> {
        let checked = Pollard::from_digests(digests)?;
        if checked.depth != depth {
            return Err(MerkleTreeError::InvalidData(format!(
                "pollard declares depth {} but holds {} digests",
                depth,
                checked.node_count()
            )));
        }
        Ok(checked)
    }

    /// Depth of the deepest level, 0 for a root-only pollard.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of digests, `2^(depth+1) - 1`.
    pub fn node_count(&self) -> usize {
        self.digests.len()
    }

    /// Length of the digests held.
    pub fn digest_len(&self) -> usize {
        self.root().len()
    }

    /// The tree root.
    pub fn root(&self) -> &[u8] {
        self.digests.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Digest at heap `index` (1-based), if the pollard covers it.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        index
            .checked_sub(ROOT_INDEX)
            .and_then(|offset| self.digests.get(offset))
            .map(Vec::as_slice)
    }

    /// All digests in heap order.
    pub fn digests(&self) -> &[Vec<u8>] {
        &self.digests
    }

    /// Consume the pollard, returning its digests in heap order.
    pub fn into_digests(self) -> Vec<Vec<u8>> {
        self.digests
    }

    /// Check that every entry above the deepest level is the hash of its two
    /// children, so the pollard is consistent with its own root.
    pub fn verify<H: HashProvider + ?Sized>(&self, hash: &H) -> bool {
        let digest_len = hash.digest_len();
        if self.digests.iter().any(|d| d.len() != digest_len) {
            return false;
        }
        let Some(first_deepest) = 1usize.checked_shl(self.depth) else {
            return false;
        };
        (ROOT_INDEX..first_deepest).all(|index| {
            match (self.get(index), self.get(2 * index), self.get(2 * index + 1)) {
                (Some(parent), Some(left), Some(right)) => {
                    node_hash(hash, left, right).as_slice() == parent
                }
                _ => false,
            }
        })
    }

    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, MerkleTreeError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| MerkleTreeError::InvalidData(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode, re-validating the level structure.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self, MerkleTreeError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<MAX_DECODE_BYTES>();
        let (pollard, _): (Self, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| MerkleTreeError::InvalidData(format!("decode error: {}", e)))?;
        Pollard::with_declared_depth(pollard.depth, pollard.digests)
    }
}
