//! Merkleization for dynamic SSZ.
//!
//! The [`HashEngine`] trait abstracts the chunk hasher: given a contiguous
//! input of 64-byte pairs it writes 32-byte digests. Everything else in this
//! crate (padded merkleization, progressive merkleization, the explicit
//! [`MerkleTree`](tree::MerkleTree) and its proofs) is generic over it, with
//! [`Sha256Engine`] as the default backend.

use std::sync::LazyLock;

use digest::Digest;

pub mod merkleize;
pub mod progressive;
pub mod proof;
pub mod tree;

pub use dynssz_primitives::Hash256;
pub use merkleize::{merkle_root, merkleize_chunks, pack_bytes};
pub use progressive::{merkleize_progressive, mix_in_active_fields};
pub use proof::{
    CompressedMultiproof, Multiproof, Proof, ProofHash, required_indices, verify_multiproof,
    verify_proof,
};
pub use tree::MerkleTree;

use thiserror::Error;

/// Number of bytes in a merkle chunk.
pub const BYTES_PER_CHUNK: usize = 32;

/// Size of the input consumed per digest by a chunk hasher.
pub const MERKLE_HASH_CHUNK: usize = 2 * BYTES_PER_CHUNK;

/// Highest depth for which zero-subtree hashes are precomputed.
pub const ZERO_HASHES_MAX_INDEX: usize = 48;

/// Errors raised by merkleization and proof handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// Chunk-hasher input was not a multiple of 64 bytes, or the output
    /// buffer was too small for it.
    #[error("chunk hasher input/output lengths are inconsistent: in {input}, out {output}")]
    InvalidHashInput {
        /// Input length in bytes.
        input: usize,
        /// Output length in bytes.
        output: usize,
    },

    /// More leaves were supplied than the tree limit admits.
    #[error("{leaves} leaves exceed the tree limit of {limit}")]
    TooManyLeaves {
        /// Number of leaves supplied.
        leaves: usize,
        /// The power-of-two leaf limit.
        limit: usize,
    },

    /// The leaf limit was not a power of two.
    #[error("tree limit {0} is not a power of two")]
    InvalidLimit(usize),

    /// A zero-subtree hash deeper than the precomputed table was requested.
    #[error("zero-subtree depth {0} exceeds the precomputed maximum")]
    DepthOutOfRange(usize),

    /// A generalized index that does not address a node of this tree.
    #[error("generalized index {0} is out of range for the tree")]
    InvalidGeneralizedIndex(u64),

    /// A proof whose shape cannot be folded to a root.
    #[error("malformed proof: {0}")]
    MalformedProof(&'static str),
}

/// A chunk hasher: hashes pairs of 32-byte nodes into parent nodes.
///
/// `input.len()` must be a multiple of [`MERKLE_HASH_CHUNK`] and `out` must
/// hold at least `input.len() / 2` bytes. Implementations write one 32-byte
/// digest per 64-byte input block.
pub trait HashEngine {
    /// Hashes consecutive 64-byte blocks of `input` into `out`.
    fn hash_chunks(out: &mut [u8], input: &[u8]) -> Result<(), MerkleError>;

    /// Hashes an arbitrary byte string into a single digest.
    fn hash(data: &[u8]) -> Hash256;

    /// Precomputed zero-subtree hashes; entry `d` is the root of an empty
    /// subtree of depth `d`.
    fn zero_hashes() -> &'static [Hash256];

    /// Hashes the concatenation of two 32-byte nodes.
    fn hash_concat(left: &[u8], right: &[u8]) -> Hash256 {
        let mut input = [0u8; MERKLE_HASH_CHUNK];
        input[..BYTES_PER_CHUNK].copy_from_slice(left);
        input[BYTES_PER_CHUNK..].copy_from_slice(right);
        let mut out = [0u8; BYTES_PER_CHUNK];
        Self::hash_chunks(&mut out, &input).expect("one full chunk is always a valid input");
        Hash256::from(out)
    }

    /// Returns the zero-subtree hash at `depth`.
    fn zero_hash(depth: usize) -> Result<Hash256, MerkleError> {
        Self::zero_hashes()
            .get(depth)
            .copied()
            .ok_or(MerkleError::DepthOutOfRange(depth))
    }
}

/// Zero-subtree hashes for SHA-256, up to [`ZERO_HASHES_MAX_INDEX`].
static ZERO_HASHES_SHA256: LazyLock<Vec<Hash256>> = LazyLock::new(|| {
    let mut hashes = vec![Hash256::ZERO; ZERO_HASHES_MAX_INDEX + 1];
    for i in 0..ZERO_HASHES_MAX_INDEX {
        hashes[i + 1] = Sha256Engine::hash_concat(hashes[i].as_slice(), hashes[i].as_slice());
    }
    hashes
});

/// The default chunk hasher, backed by [`sha2::Sha256`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Engine;

impl HashEngine for Sha256Engine {
    fn hash_chunks(out: &mut [u8], input: &[u8]) -> Result<(), MerkleError> {
        if input.len() % MERKLE_HASH_CHUNK != 0 || out.len() < input.len() / 2 {
            return Err(MerkleError::InvalidHashInput {
                input: input.len(),
                output: out.len(),
            });
        }
        for (block, digest) in input
            .chunks_exact(MERKLE_HASH_CHUNK)
            .zip(out.chunks_exact_mut(BYTES_PER_CHUNK))
        {
            let mut hasher = sha2::Sha256::new();
            hasher.update(block);
            digest.copy_from_slice(&hasher.finalize());
        }
        Ok(())
    }

    fn hash(data: &[u8]) -> Hash256 {
        let mut hasher = sha2::Sha256::new();
        hasher.update(data);
        Hash256::from_slice(&hasher.finalize())
    }

    fn zero_hashes() -> &'static [Hash256] {
        &ZERO_HASHES_SHA256
    }
}

/// Returns the node created by hashing `root` and the little-endian `length`.
///
/// Used to finish list roots.
pub fn mix_in_length<H: HashEngine>(root: &Hash256, length: usize) -> Hash256 {
    let mut length_chunk = [0u8; BYTES_PER_CHUNK];
    length_chunk[..8].copy_from_slice(&(length as u64).to_le_bytes());
    H::hash_concat(root.as_slice(), &length_chunk)
}

/// Returns the node created by hashing `root` and a union `selector`.
pub fn mix_in_selector<H: HashEngine>(root: &Hash256, selector: u8) -> Hash256 {
    let mut selector_chunk = [0u8; BYTES_PER_CHUNK];
    selector_chunk[0] = selector;
    H::hash_concat(root.as_slice(), &selector_chunk)
}

/// Returns the node created by hashing `root` and an auxiliary chunk.
pub fn mix_in_aux<H: HashEngine>(root: &Hash256, aux: &Hash256) -> Hash256 {
    H::hash_concat(root.as_slice(), aux.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_table_links() {
        let hashes = Sha256Engine::zero_hashes();
        assert_eq!(hashes.len(), ZERO_HASHES_MAX_INDEX + 1);
        assert_eq!(hashes[0], Hash256::ZERO);
        assert_eq!(
            hashes[3],
            Sha256Engine::hash_concat(hashes[2].as_slice(), hashes[2].as_slice())
        );
    }

    #[test]
    fn hash_chunks_rejects_partial_blocks() {
        let mut out = [0u8; 32];
        assert!(Sha256Engine::hash_chunks(&mut out, &[0u8; 63]).is_err());
        assert!(Sha256Engine::hash_chunks(&mut out, &[0u8; 64]).is_ok());
    }

    #[test]
    fn hash_chunks_matches_hash_concat() {
        let left = Hash256::repeat_byte(0xab);
        let right = Hash256::repeat_byte(0xcd);
        let mut input = [0u8; 64];
        input[..32].copy_from_slice(left.as_slice());
        input[32..].copy_from_slice(right.as_slice());
        let mut out = [0u8; 32];
        Sha256Engine::hash_chunks(&mut out, &input).unwrap();
        assert_eq!(
            Hash256::from(out),
            Sha256Engine::hash_concat(left.as_slice(), right.as_slice())
        );
    }

    #[test]
    fn mix_length_matches_manual_hash() {
        let root = Hash256::repeat_byte(42);
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(root.as_slice());
        preimage[32] = 42;
        assert_eq!(
            mix_in_length::<Sha256Engine>(&root, 42),
            Sha256Engine::hash(&preimage)
        );
    }
}
