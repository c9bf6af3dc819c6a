use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::{
    AuditProof, MerkleTreeError, Pollard,
    hash::{Blake2b256, HashProvider, leaf_hash, node_hash},
};

/// Heap index of the root node.
pub(crate) const ROOT_INDEX: usize = 1;

/// Build configuration for a [`MerkleTree`].
///
/// ```
/// use merkletree_pollard::{Keccak256, TreeBuilder};
///
/// let tree = TreeBuilder::new(Keccak256)
///     .salted(true)
///     .build(&[b"Foo", b"Bar"])
///     .expect("non-empty input");
/// assert_eq!(tree.size(), (2, 2));
/// ```
#[derive(Debug, Clone)]
pub struct TreeBuilder<H> {
    hash: H,
    salted: bool,
}

impl<H: HashProvider> TreeBuilder<H> {
    /// Start a builder for an unsalted tree hashed with `hash`.
    pub fn new(hash: H) -> Self {
        TreeBuilder {
            hash,
            salted: false,
        }
    }

    /// Bind each leaf's position into its digest.
    pub fn salted(mut self, salted: bool) -> Self {
        self.salted = salted;
        self
    }

    /// Build the tree over `data`, in order.
    ///
    /// Hashes each real leaf once and each internal node once. Padding leaves
    /// are never hashed.
    ///
    /// # Panics
    ///
    /// If the provider returns a digest whose length differs from its
    /// `digest_len`.
    pub fn build<D: AsRef<[u8]> + Sync>(
        self,
        data: &[D],
    ) -> Result<MerkleTree<H>, MerkleTreeError> {
        let leaf_count = data.len();
        if leaf_count == 0 {
            return Err(MerkleTreeError::EmptyInput);
        }
        if self.salted && leaf_count - 1 > u32::MAX as usize {
            return Err(MerkleTreeError::InvalidData(format!(
                "salted trees hold at most 2^32 leaves, got {}",
                leaf_count
            )));
        }
        let digest_len = self.hash.digest_len();
        if digest_len == 0 {
            return Err(MerkleTreeError::InvalidData(format!(
                "hash provider {} has a zero digest length",
                self.hash.name()
            )));
        }

        let padded_leaf_count = leaf_count.next_power_of_two();
        let node_count = 2 * padded_leaf_count - 1;
        let mut nodes = vec![0u8; node_count * digest_len];

        // Padding leaves keep their zero fill.
        let first_leaf = (padded_leaf_count - 1) * digest_len;
        let leaf_area = &mut nodes[first_leaf..first_leaf + leaf_count * digest_len];
        hash_leaves(&self.hash, data, self.salted, leaf_area, digest_len);

        let mut level_start = padded_leaf_count / 2;
        while level_start >= ROOT_INDEX {
            hash_level(&self.hash, &mut nodes, level_start, digest_len);
            level_start /= 2;
        }

        debug!(
            leaf_count,
            padded_leaf_count,
            salted = self.salted,
            hash = self.hash.name(),
            "built merkle tree"
        );

        Ok(MerkleTree {
            hash: self.hash,
            salted: self.salted,
            leaf_count,
            padded_leaf_count,
            digest_len,
            nodes,
        })
    }
}

#[cfg(not(feature = "parallel"))]
fn hash_leaves<H: HashProvider, D: AsRef<[u8]> + Sync>(
    hash: &H,
    data: &[D],
    salted: bool,
    leaf_area: &mut [u8],
    digest_len: usize,
) {
    for (position, (slot, leaf)) in leaf_area.chunks_mut(digest_len).zip(data).enumerate() {
        let salt = salted.then_some(position as u32);
        slot.copy_from_slice(&leaf_hash(hash, leaf.as_ref(), salt));
    }
}

#[cfg(feature = "parallel")]
fn hash_leaves<H: HashProvider, D: AsRef<[u8]> + Sync>(
    hash: &H,
    data: &[D],
    salted: bool,
    leaf_area: &mut [u8],
    digest_len: usize,
) {
    leaf_area
        .par_chunks_mut(digest_len)
        .zip(data.par_iter())
        .enumerate()
        .for_each(|(position, (slot, leaf))| {
            let salt = salted.then_some(position as u32);
            slot.copy_from_slice(&leaf_hash(hash, leaf.as_ref(), salt));
        });
}

/// Hash the level whose first heap index is `level_start` from the level
/// below it. Nodes within one level are independent.
fn hash_level<H: HashProvider>(hash: &H, nodes: &mut [u8], level_start: usize, digest_len: usize) {
    let (upper, lower) = nodes.split_at_mut((2 * level_start - 1) * digest_len);
    let parents = &mut upper[(level_start - 1) * digest_len..];
    let children = &lower[..2 * level_start * digest_len];

    #[cfg(feature = "parallel")]
    parents
        .par_chunks_mut(digest_len)
        .zip(children.par_chunks(2 * digest_len))
        .for_each(|(parent, pair)| {
            let (left, right) = pair.split_at(digest_len);
            parent.copy_from_slice(&node_hash(hash, left, right));
        });

    #[cfg(not(feature = "parallel"))]
    for (parent, pair) in parents
        .chunks_mut(digest_len)
        .zip(children.chunks(2 * digest_len))
    {
        let (left, right) = pair.split_at(digest_len);
        parent.copy_from_slice(&node_hash(hash, left, right));
    }
}

/// An immutable binary Merkle tree.
///
/// All `2p - 1` node digests live in one contiguous buffer, addressed by
/// 1-based heap index: the root is 1, the children of `i` are `2i` and
/// `2i + 1`, and the leaf at position `k` is `p + k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree<H = Blake2b256> {
    hash: H,
    salted: bool,
    leaf_count: usize,
    padded_leaf_count: usize,
    digest_len: usize,
    nodes: Vec<u8>,
}

impl MerkleTree<Blake2b256> {
    /// Build an unsalted tree hashed with BLAKE2b-256.
    pub fn new<D: AsRef<[u8]> + Sync>(
        data: &[D],
    ) -> Result<MerkleTree<Blake2b256>, MerkleTreeError> {
        TreeBuilder::new(Blake2b256).build(data)
    }
}

impl<H: HashProvider> MerkleTree<H> {
    /// Build a tree over `data` hashed with `hash`.
    pub fn build<D: AsRef<[u8]> + Sync>(
        data: &[D],
        hash: H,
        salted: bool,
    ) -> Result<Self, MerkleTreeError> {
        TreeBuilder::new(hash).salted(salted).build(data)
    }

    /// Reassemble a tree from parts already checked by the caller.
    pub(crate) fn from_parts(
        hash: H,
        salted: bool,
        leaf_count: usize,
        padded_leaf_count: usize,
        nodes: Vec<u8>,
    ) -> Self {
        let digest_len = hash.digest_len();
        MerkleTree {
            hash,
            salted,
            leaf_count,
            padded_leaf_count,
            digest_len,
            nodes,
        }
    }

    /// The root digest.
    pub fn root(&self) -> &[u8] {
        self.node(ROOT_INDEX)
    }

    /// `(leaf_count, padded_leaf_count)`.
    pub fn size(&self) -> (usize, usize) {
        (self.leaf_count, self.padded_leaf_count)
    }

    /// Number of real leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Leaf count rounded up to a power of two.
    pub fn padded_leaf_count(&self) -> usize {
        self.padded_leaf_count
    }

    /// Number of hops from any leaf to the root.
    pub fn height(&self) -> u32 {
        self.padded_leaf_count.trailing_zeros()
    }

    /// Number of nodes, `2p - 1`.
    pub fn node_count(&self) -> usize {
        2 * self.padded_leaf_count - 1
    }

    /// Length of every digest in the tree.
    pub fn digest_len(&self) -> usize {
        self.digest_len
    }

    /// Whether leaf digests are salted with their position.
    pub fn is_salted(&self) -> bool {
        self.salted
    }

    /// The hash provider the tree was built with.
    pub fn hash_provider(&self) -> &H {
        &self.hash
    }

    /// Digest of the leaf at `position`, padding leaves included.
    pub fn leaf_digest(&self, position: usize) -> Result<&[u8], MerkleTreeError> {
        if position >= self.padded_leaf_count {
            return Err(MerkleTreeError::IndexOutOfRange {
                index: position,
                limit: self.padded_leaf_count,
            });
        }
        Ok(self.node(self.padded_leaf_count + position))
    }

    /// Digest of the node at heap `index` (1-based).
    pub fn node_digest(&self, index: usize) -> Result<&[u8], MerkleTreeError> {
        if index < ROOT_INDEX || index > self.node_count() {
            return Err(MerkleTreeError::IndexOutOfRange {
                index,
                limit: self.node_count(),
            });
        }
        Ok(self.node(index))
    }

    /// Generate an audit proof for the leaf at `position`.
    pub fn generate_proof(&self, position: usize) -> Result<AuditProof, MerkleTreeError> {
        AuditProof::generate(self, position)
    }

    /// Export the top `depth + 1` levels of the tree.
    pub fn pollard(&self, depth: u32) -> Result<Pollard, MerkleTreeError> {
        Pollard::generate(self, depth)
    }

    /// Flat node buffer, heap index 1 first.
    pub(crate) fn raw_nodes(&self) -> &[u8] {
        &self.nodes
    }

    /// Unchecked node access. `index` must be in `[1, 2p - 1]`.
    pub(crate) fn node(&self, index: usize) -> &[u8] {
        let start = (index - 1) * self.digest_len;
        &self.nodes[start..start + self.digest_len]
    }
}

impl<H: HashProvider> fmt::Display for MerkleTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.root()))
    }
}
