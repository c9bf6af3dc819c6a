//! Byte encoding of a built tree.
//!
//! The snapshot is the flat node-digest array plus the metadata needed to
//! interpret it. Decoding re-checks every node, so a snapshot can be loaded
//! from untrusted bytes.

use bincode::{Decode, Encode};
use tracing::debug;

use crate::{HashProvider, MerkleTree, MerkleTreeError, hash::node_hash, tree::ROOT_INDEX};

/// Size limit for decoding snapshots.
const MAX_SNAPSHOT_BYTES: usize = 1024 * 1024 * 1024;

#[derive(Debug, Encode, Decode)]
struct TreeSnapshot {
    hash_name: String,
    salted: bool,
    leaf_count: u64,
    padded_leaf_count: u64,
    nodes: Vec<u8>,
}

impl<H: HashProvider> MerkleTree<H> {
    /// Encode the tree using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, MerkleTreeError> {
        let snapshot = TreeSnapshot {
            hash_name: self.hash_provider().name().to_string(),
            salted: self.is_salted(),
            leaf_count: self.leaf_count() as u64,
            padded_leaf_count: self.padded_leaf_count() as u64,
            nodes: self.raw_nodes().to_vec(),
        };
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(&snapshot, config)
            .map_err(|e| MerkleTreeError::InvalidData(format!("encode error: {}", e)))
    }

    /// Decode a tree encoded with [`encode_to_vec`](Self::encode_to_vec).
    ///
    /// `hash` must be the provider the tree was built with. Every internal
    /// node is rehashed and every padding leaf must be zero.
    pub fn decode_from_slice(bytes: &[u8], hash: H) -> Result<Self, MerkleTreeError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<MAX_SNAPSHOT_BYTES>();
        let (snapshot, _): (TreeSnapshot, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| MerkleTreeError::InvalidData(format!("decode error: {}", e)))?;

        if snapshot.hash_name != hash.name() {
            return Err(MerkleTreeError::HashProviderMismatch {
                expected: hash.name().to_string(),
                actual: snapshot.hash_name,
            });
        }
        let leaf_count = usize::try_from(snapshot.leaf_count)
            .map_err(|_| MerkleTreeError::InvalidData("leaf count overflows usize".into()))?;
        let padded_leaf_count = usize::try_from(snapshot.padded_leaf_count)
            .map_err(|_| MerkleTreeError::InvalidData("padded count overflows usize".into()))?;
        if leaf_count == 0 || leaf_count.checked_next_power_of_two() != Some(padded_leaf_count) {
            return Err(MerkleTreeError::InvalidData(format!(
                "padded leaf count {} does not fit {} leaves",
                padded_leaf_count, leaf_count
            )));
        }
        let digest_len = hash.digest_len();
        if digest_len == 0 {
            return Err(MerkleTreeError::InvalidData(format!(
                "hash provider {} has a zero digest length",
                hash.name()
            )));
        }
        let expected_bytes = padded_leaf_count
            .checked_mul(2)
            .and_then(|count| (count - 1).checked_mul(digest_len));
        if expected_bytes != Some(snapshot.nodes.len()) {
            return Err(MerkleTreeError::InvalidData(format!(
                "node array of {} bytes does not fit {} padded leaves",
                snapshot.nodes.len(),
                padded_leaf_count
            )));
        }

        let tree = MerkleTree::from_parts(
            hash,
            snapshot.salted,
            leaf_count,
            padded_leaf_count,
            snapshot.nodes,
        );
        tree.check_integrity()?;
        Ok(tree)
    }

    /// Check that padding leaves are zero and internal nodes match their
    /// children.
    fn check_integrity(&self) -> Result<(), MerkleTreeError> {
        let padded_leaf_count = self.padded_leaf_count();
        for index in padded_leaf_count + self.leaf_count()..=self.node_count() {
            if self.node(index).iter().any(|byte| *byte != 0) {
                debug!(index, "rejected snapshot with non-zero padding leaf");
                return Err(MerkleTreeError::InvalidData(format!(
                    "padding leaf at node {} is not zero",
                    index
                )));
            }
        }
        for index in ROOT_INDEX..padded_leaf_count {
            let expected = node_hash(
                self.hash_provider(),
                self.node(2 * index),
                self.node(2 * index + 1),
            );
            if expected.as_slice() != self.node(index) {
                debug!(index, "rejected snapshot with inconsistent node");
                return Err(MerkleTreeError::InvalidData(format!(
                    "node {} does not match its children",
                    index
                )));
            }
        }
        Ok(())
    }
}
