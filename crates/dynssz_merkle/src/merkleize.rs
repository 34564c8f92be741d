//! Padded binary merkleization over 32-byte chunks.

use crate::{BYTES_PER_CHUNK, Hash256, HashEngine, MerkleError};

/// Splits `bytes` into 32-byte chunks, zero-padding the final chunk.
pub fn pack_bytes(bytes: &[u8]) -> Vec<Hash256> {
    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(Hash256::right_padding_from)
        .collect()
}

/// Merkleizes `chunks` into a tree with `limit` leaf positions.
///
/// `limit` must be a power of two (or zero, meaning "exactly the padded
/// chunk count"). Missing leaves are zero-subtrees; supplying more chunks
/// than `limit` is an error.
pub fn merkleize_chunks<H: HashEngine>(
    chunks: &[Hash256],
    limit: usize,
) -> Result<Hash256, MerkleError> {
    let limit = if limit == 0 {
        chunks.len().next_power_of_two().max(1)
    } else {
        limit
    };
    if !limit.is_power_of_two() {
        return Err(MerkleError::InvalidLimit(limit));
    }
    if chunks.len() > limit {
        return Err(MerkleError::TooManyLeaves {
            leaves: chunks.len(),
            limit,
        });
    }
    subtree_root::<H>(chunks, depth_for_limit(limit))
}

/// Merkleizes a raw byte string, padding to at least `min_chunks` leaves.
///
/// Fast paths for zero- and one-chunk inputs skip hashing entirely.
pub fn merkle_root<H: HashEngine>(bytes: &[u8], min_chunks: usize) -> Result<Hash256, MerkleError> {
    let leaves = bytes.len().div_ceil(BYTES_PER_CHUNK).max(min_chunks);
    if leaves <= 1 {
        return Ok(Hash256::right_padding_from(bytes));
    }
    merkleize_chunks::<H>(&pack_bytes(bytes), leaves.next_power_of_two())
}

/// Number of tree levels below the root for a power-of-two `limit`.
pub(crate) fn depth_for_limit(limit: usize) -> usize {
    limit.trailing_zeros() as usize
}

fn subtree_root<H: HashEngine>(chunks: &[Hash256], depth: usize) -> Result<Hash256, MerkleError> {
    if chunks.is_empty() {
        return H::zero_hash(depth);
    }
    if depth == 0 {
        return Ok(chunks[0]);
    }
    let split = chunks.len().min(1 << (depth - 1));
    let left = subtree_root::<H>(&chunks[..split], depth - 1)?;
    let right = subtree_root::<H>(&chunks[split..], depth - 1)?;
    Ok(H::hash_concat(left.as_slice(), right.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sha256Engine;

    #[test]
    fn empty_input_is_zero_subtree() {
        assert_eq!(
            merkleize_chunks::<Sha256Engine>(&[], 8).unwrap(),
            Sha256Engine::zero_hash(3).unwrap()
        );
    }

    #[test]
    fn single_chunk_is_identity() {
        let chunk = Hash256::repeat_byte(7);
        assert_eq!(merkleize_chunks::<Sha256Engine>(&[chunk], 1).unwrap(), chunk);
    }

    #[test]
    fn two_chunks_hash_once() {
        let a = Hash256::repeat_byte(1);
        let b = Hash256::repeat_byte(2);
        assert_eq!(
            merkleize_chunks::<Sha256Engine>(&[a, b], 2).unwrap(),
            Sha256Engine::hash_concat(a.as_slice(), b.as_slice())
        );
    }

    #[test]
    fn padding_uses_zero_subtrees() {
        let a = Hash256::repeat_byte(1);
        let left = Sha256Engine::hash_concat(a.as_slice(), Hash256::ZERO.as_slice());
        let right = Sha256Engine::zero_hash(1).unwrap();
        assert_eq!(
            merkleize_chunks::<Sha256Engine>(&[a], 4).unwrap(),
            Sha256Engine::hash_concat(left.as_slice(), right.as_slice())
        );
    }

    #[test]
    fn limit_overflow_is_rejected() {
        let chunks = vec![Hash256::ZERO; 3];
        assert_eq!(
            merkleize_chunks::<Sha256Engine>(&chunks, 2),
            Err(MerkleError::TooManyLeaves {
                leaves: 3,
                limit: 2
            })
        );
    }

    #[test]
    fn merkle_root_small_inputs() {
        assert_eq!(merkle_root::<Sha256Engine>(&[], 0).unwrap(), Hash256::ZERO);
        assert_eq!(
            merkle_root::<Sha256Engine>(&[0xff; 20], 0).unwrap(),
            Hash256::right_padding_from(&[0xff; 20])
        );
    }

    #[test]
    fn pack_bytes_pads_tail() {
        let chunks = pack_bytes(&[1u8; 40]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].as_slice()[..8], [1u8; 8]);
        assert_eq!(chunks[1].as_slice()[8..], [0u8; 24]);
    }
}
