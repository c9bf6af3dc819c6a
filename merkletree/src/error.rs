use thiserror::Error;

/// Errors from Merkle tree construction, proof and pollard operations.
///
/// A proof that is well formed but does not match its target is not an
/// error; verification reports it as `Ok(false)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleTreeError {
    /// The tree was built from zero leaves.
    #[error("tree must have at least 1 piece of data")]
    EmptyInput,
    /// A leaf or node index outside the tree.
    #[error("index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of valid indices.
        limit: usize,
    },
    /// A pollard deeper than the tree.
    #[error("invalid pollard depth {depth} (max {max})")]
    InvalidDepth {
        /// The requested depth.
        depth: u32,
        /// Height of the tree.
        max: u32,
    },
    /// A proof whose shape cannot belong to any tree of this hash provider.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// Undecodable or inconsistent encoded data.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Encoded data produced with a different hash provider.
    #[error("hash provider mismatch: expected {expected}, got {actual}")]
    HashProviderMismatch {
        /// Name of the provider supplied by the caller.
        expected: String,
        /// Name recorded in the encoded data.
        actual: String,
    },
}
