//! Audit proofs for a single leaf.
//!
//! An [`AuditProof`] carries the leaf position and the sibling digests on the
//! path from the leaf up to (but excluding) the root, leaf-adjacent sibling
//! first. Each sibling records which side of its parent it sits on.

use bincode::{Decode, Encode};
use tracing::trace;

use crate::{HashProvider, MerkleTree, MerkleTreeError, tree::ROOT_INDEX};


/// Maximum number of siblings in a proof. A tree with `2^63` leaves is
/// already beyond addressable memory.
pub const MAX_PROOF_SIBLINGS: usize = 63;

/// Size limit for decoding proofs and pollards.
pub(crate) const MAX_DECODE_BYTES: usize = 100 * 1024 * 1024;

/// Which side of its parent a sibling digest occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// The sibling is the left child; the path node is on the right.
    Left,
    /// The sibling is the right child; the path node is on the left.
    Right,
}

impl Side {
    /// Side of the sibling of the node at heap `index`.
    pub(crate) fn of_sibling(index: u64) -> Side {
        if index % 2 == 0 { Side::Right } else { Side::Left }
    }
}

/// One step of an audit path.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProofEntry {
    /// Side the sibling occupies.
    pub side: Side,
    /// The sibling's digest.
    pub digest: Vec<u8>,
}

/// Inclusion proof for the leaf at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditProof {
    /// 0-based leaf position.
    pub index: u64,
    /// Sibling digests from the leaf level upwards.
    pub siblings: Vec<ProofEntry>,
}

impl AuditProof {
    /// Generate the proof for the real leaf at `position`.
    pub fn generate<H: HashProvider>(
        tree: &MerkleTree<H>,
        position: usize,
    ) -> Result<Self, MerkleTreeError> {
        if position >= tree.leaf_count() {
            return Err(MerkleTreeError::IndexOutOfRange {
                index: position,
                limit: tree.leaf_count(),
            });
        }

        let mut siblings = Vec::with_capacity(tree.height() as usize);
        let mut index = tree.padded_leaf_count() + position;
        while index > ROOT_INDEX {
            siblings.push(ProofEntry {
                side: Side::of_sibling(index as u64),
                digest: tree.node(index ^ 1).to_vec(),
            });
            index /= 2;
        }
        trace!(position, siblings = siblings.len(), "generated audit proof");

        Ok(AuditProof {
            index: position as u64,
            siblings,
        })
    }

    /// Heap index of the proved leaf in a tree of `2^siblings` leaves. The
    /// path must already be shape-checked.
    pub(crate) fn leaf_node_index(&self) -> u64 {
        (1u64 << self.siblings.len()) + self.index
    }

    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, MerkleTreeError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| MerkleTreeError::InvalidData(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode.
    ///
    /// Rejects proofs with more than [`MAX_PROOF_SIBLINGS`] siblings or a
    /// leaf index beyond the tree size the sibling count implies.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self, MerkleTreeError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<MAX_DECODE_BYTES>();
        let (proof, _): (Self, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| MerkleTreeError::InvalidData(format!("decode error: {}", e)))?;
        proof
            .check_path_shape()
            .map_err(|e| MerkleTreeError::InvalidData(e.to_string()))?;
        Ok(proof)
    }

    /// Check that the sibling count and sides are consistent with the leaf
    /// index.
    pub(crate) fn check_path_shape(&self) -> Result<(), MerkleTreeError> {
        if self.siblings.len() > MAX_PROOF_SIBLINGS {
            return Err(MerkleTreeError::MalformedProof(format!(
                "{} siblings exceeds the maximum of {}",
                self.siblings.len(),
                MAX_PROOF_SIBLINGS
            )));
        }
        let padded_leaf_count = 1u64 << self.siblings.len();
        if self.index >= padded_leaf_count {
            return Err(MerkleTreeError::MalformedProof(format!(
                "leaf index {} does not fit a path of {} siblings",
                self.index,
                self.siblings.len()
            )));
        }
        let mut index = self.leaf_node_index();
        for (step, entry) in self.siblings.iter().enumerate() {
            if entry.side != Side::of_sibling(index) {
                return Err(MerkleTreeError::MalformedProof(format!(
                    "sibling {} is on the {:?} side, expected {:?}",
                    step,
                    entry.side,
                    Side::of_sibling(index)
                )));
            }
            index /= 2;
        }
        Ok(())
    }
}
