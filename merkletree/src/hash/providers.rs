use blake2::digest::consts::U32;
use sha2::Digest;

use super::HashProvider;

/// Implement [`HashProvider`] for a RustCrypto `Digest` type.
macro_rules! digest_provider {
    ($(#[$meta:meta])* $provider:ident, $hasher:ty, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $provider;

        impl HashProvider for $provider {
            fn name(&self) -> &'static str {
                $name
            }

            fn digest_len(&self) -> usize {
                <$hasher as Digest>::output_size()
            }

            fn hash(&self, data: &[u8]) -> Vec<u8> {
                <$hasher as Digest>::digest(data).to_vec()
            }

            fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
                let mut hasher = <$hasher as Digest>::new();
                for part in parts {
                    Digest::update(&mut hasher, part);
                }
                hasher.finalize().to_vec()
            }
        }
    };
}

digest_provider!(
    /// BLAKE2b with a 32-byte output. The default provider.
    Blake2b256,
    blake2::Blake2b<U32>,
    "blake2b"
);

digest_provider!(
    /// Legacy Keccak-256, compatible with the EVM `keccak256` opcode.
    Keccak256,
    sha3::Keccak256,
    "keccak256"
);

digest_provider!(
    /// NIST SHA3-256.
    Sha3_256,
    sha3::Sha3_256,
    "sha3"
);

digest_provider!(
    /// SHA-256.
    Sha256,
    sha2::Sha256,
    "sha256"
);

/// BLAKE3 with the standard 32-byte output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Blake3;

impl HashProvider for Blake3 {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn digest_len(&self) -> usize {
        blake3::OUT_LEN
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().as_bytes().to_vec()
    }
}
