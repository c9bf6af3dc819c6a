//! Audit proof verification.
//!
//! Pure function of the proof, the claimed leaf data and a trust anchor: no
//! tree is required. The leaf digest is recomputed the way the tree builder
//! computes it, folded with the siblings bottom-up, and compared with either
//! the root or the matching entry of a [`Pollard`].

use tracing::debug;

use crate::{
    AuditProof, HashProvider, MerkleTreeError, Pollard, Side,
    hash::{leaf_hash, node_hash},
};

/// What a folded proof is compared against.
#[derive(Debug, Clone, Copy)]
pub enum VerifyTarget<'a> {
    /// The tree root.
    Root(&'a [u8]),
    /// The top levels of the tree. Folding stops at the pollard's deepest
    /// level.
    Pollard(&'a Pollard),
}

impl AuditProof {
    /// Verify that `data` is the leaf at `self.index` under `target`.
    ///
    /// Returns `Ok(false)` when the proof is well formed but does not match,
    /// including a root of the wrong length. Returns
    /// [`MerkleTreeError::MalformedProof`] when the proof cannot belong to
    /// any tree built with `hash`: wrong digest lengths, sides that disagree
    /// with the index, or a pollard deeper than the path.
    pub fn verify<H: HashProvider + ?Sized>(
        &self,
        data: &[u8],
        target: VerifyTarget<'_>,
        hash: &H,
        salted: bool,
    ) -> Result<bool, MerkleTreeError> {
        self.check_path_shape()?;
        let digest_len = hash.digest_len();
        if let Some(step) = self
            .siblings
            .iter()
            .position(|entry| entry.digest.len() != digest_len)
        {
            return Err(MerkleTreeError::MalformedProof(format!(
                "sibling {} has {} bytes, expected {}",
                step,
                self.siblings[step].digest.len(),
                digest_len
            )));
        }
        let salt = if salted {
            Some(u32::try_from(self.index).map_err(|_| {
                MerkleTreeError::MalformedProof(format!(
                    "leaf index {} cannot be salted",
                    self.index
                ))
            })?)
        } else {
            None
        };

        let steps = match target {
            VerifyTarget::Root(_) => self.siblings.len(),
            VerifyTarget::Pollard(pollard) => {
                if pollard.digest_len() != digest_len {
                    return Err(MerkleTreeError::MalformedProof(format!(
                        "pollard digests have {} bytes, expected {}",
                        pollard.digest_len(),
                        digest_len
                    )));
                }
                let depth = pollard.depth() as usize;
                if depth > self.siblings.len() {
                    return Err(MerkleTreeError::MalformedProof(format!(
                        "pollard depth {} exceeds proof path length {}",
                        depth,
                        self.siblings.len()
                    )));
                }
                self.siblings.len() - depth
            }
        };

        let mut current = leaf_hash(hash, data, salt);
        let mut index = self.leaf_node_index();
        for entry in &self.siblings[..steps] {
            current = match entry.side {
                Side::Right => node_hash(hash, &current, &entry.digest),
                Side::Left => node_hash(hash, &entry.digest, &current),
            };
            index /= 2;
        }

        let expected = match target {
            VerifyTarget::Root(root) => root,
            VerifyTarget::Pollard(pollard) => {
                pollard.get(index as usize).ok_or_else(|| {
                    MerkleTreeError::MalformedProof(format!(
                        "pollard has no entry at index {}",
                        index
                    ))
                })?
            }
        };

        let verified = current.as_slice() == expected;
        if !verified {
            debug!(
                leaf = self.index,
                node = index,
                "audit proof does not match its target"
            );
        }
        Ok(verified)
    }

    /// Verify against a root digest.
    pub fn verify_root<H: HashProvider + ?Sized>(
        &self,
        data: &[u8],
        root: &[u8],
        hash: &H,
        salted: bool,
    ) -> Result<bool, MerkleTreeError> {
        self.verify(data, VerifyTarget::Root(root), hash, salted)
    }

    /// Verify against a pollard.
    pub fn verify_pollard<H: HashProvider + ?Sized>(
        &self,
        data: &[u8],
        pollard: &Pollard,
        hash: &H,
        salted: bool,
    ) -> Result<bool, MerkleTreeError> {
        self.verify(data, VerifyTarget::Pollard(pollard), hash, salted)
    }
}
