//! Test utilities: instrumented hash provider and fixtures.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::{Blake2b256, HashProvider, hash::leaf_hash};

/// BLAKE2b-256 provider that counts invocations.
#[derive(Debug, Default)]
pub(crate) struct CountingProvider {
    calls: AtomicU32,
}

impl CountingProvider {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HashProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "blake2b"
    }

    fn digest_len(&self) -> usize {
        Blake2b256.digest_len()
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Blake2b256.hash(data)
    }
}

/// Leaves from string literals.
pub(crate) fn leaves(values: &[&str]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.as_bytes().to_vec()).collect()
}

/// The nine leaves used by the reference vectors.
pub(crate) fn nine_leaves() -> Vec<Vec<u8>> {
    leaves(&[
        "Foo", "Bar", "Baz", "Qux", "Quux", "Quuz", "FooBar", "FooBaz", "BarBaz",
    ])
}

pub(crate) fn decode_hex(value: &str) -> Vec<u8> {
    hex::decode(value).expect("valid hex fixture")
}

/// Root computed level by level with vectors, independent of the heap
/// layout.
pub(crate) fn reference_root<H: HashProvider>(hash: &H, data: &[Vec<u8>], salted: bool) -> Vec<u8> {
    let padded = data.len().next_power_of_two();
    let mut level: Vec<Vec<u8>> = (0..padded)
        .map(|k| match data.get(k) {
            Some(leaf) => leaf_hash(hash, leaf, salted.then_some(k as u32)),
            None => vec![0u8; hash.digest_len()],
        })
        .collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hash.hash(&[pair[0].as_slice(), pair[1].as_slice()].concat()))
            .collect();
    }
    level.remove(0)
}
