//! Pluggable hash functions and the tree's hashing scheme.
//!
//! - Leaf: `H(data)`, or `H(data || be32(index))` when salted.
//! - Internal node: `H(left || right)`, raw concatenation.
//! - Padding leaf: `[0; digest_len]`, never hashed.

mod providers;

pub use providers::{Blake2b256, Blake3, Keccak256, Sha256, Sha3_256};

/// A hash function usable by the tree.
///
/// Implementations must be deterministic and always return exactly
/// [`digest_len`](Self::digest_len) bytes.
pub trait HashProvider: Send + Sync {
    /// Stable name of the algorithm, recorded in encoded snapshots.
    fn name(&self) -> &'static str;

    /// Length in bytes of every digest this provider returns.
    fn digest_len(&self) -> usize;

    /// Hash `data`.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Hash the concatenation of `parts`.
    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        self.hash(&parts.concat())
    }
}

impl<T: HashProvider + ?Sized> HashProvider for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn digest_len(&self) -> usize {
        (**self).digest_len()
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        (**self).hash(data)
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        (**self).hash_parts(parts)
    }
}

impl<T: HashProvider + ?Sized> HashProvider for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn digest_len(&self) -> usize {
        (**self).digest_len()
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        (**self).hash(data)
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        (**self).hash_parts(parts)
    }
}

/// Look up a built-in provider by its [`name`](HashProvider::name).
pub fn hash_provider_by_name(name: &str) -> Option<Box<dyn HashProvider>> {
    let provider: Box<dyn HashProvider> = match name {
        "blake2b" => Box::new(Blake2b256),
        "keccak256" => Box::new(Keccak256),
        "sha3" => Box::new(Sha3_256),
        "sha256" => Box::new(Sha256),
        "blake3" => Box::new(Blake3),
        _ => return None,
    };
    Some(provider)
}

/// Big-endian salt appended to the data of the leaf at `index`.
pub fn salt_bytes(index: u32) -> [u8; 4] {
    index.to_be_bytes()
}

/// Digest of a real leaf. `salt` is the leaf position when salting is on.
pub fn leaf_hash<H: HashProvider + ?Sized>(hash: &H, data: &[u8], salt: Option<u32>) -> Vec<u8> {
    match salt {
        Some(index) => hash.hash_parts(&[data, &salt_bytes(index)]),
        None => hash.hash(data),
    }
}

/// Digest of an internal node: `H(left || right)`.
pub fn node_hash<H: HashProvider + ?Sized>(hash: &H, left: &[u8], right: &[u8]) -> Vec<u8> {
    hash.hash_parts(&[left, right])
}
