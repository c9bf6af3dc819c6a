//! Binary Merkle tree over an ordered sequence of data blocks.
//!
//! The tree is stored as a single heap-indexed array of digests: index 1 is
//! the root, node `i` has children `2i` and `2i + 1`, and the leaf at input
//! position `k` lives at index `p + k` where `p` is the leaf count rounded up
//! to a power of two.
//!
//! - Leaves hash as `H(data)`, or `H(data || be32(k))` when salted.
//! - Padding leaves carry an all-zero digest and are never hashed.
//! - Internal nodes hash as `H(left || right)`.
//!
//! From a built tree, [`AuditProof`]s prove inclusion of a single leaf and
//! [`Pollard`]s export the top levels of the tree as a smaller trust anchor.
//! The hash function is pluggable through [`HashProvider`].

#![warn(missing_docs)]

mod error;
pub mod hash;
mod pollard;
mod proof;
mod snapshot;
mod tree;
mod verify;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::MerkleTreeError;
pub use hash::{
    Blake2b256, Blake3, HashProvider, Keccak256, Sha256, Sha3_256, hash_provider_by_name,
};
pub use pollard::Pollard;
pub use proof::{AuditProof, MAX_PROOF_SIBLINGS, ProofEntry, Side};
pub use tree::{MerkleTree, TreeBuilder};
pub use verify::VerifyTarget;

/// A digest produced by a [`HashProvider`].
pub type Digest = Vec<u8>;
