//! Progressive merkleization.
//!
//! The right spine of a progressive tree holds binary subtrees of
//! geometrically growing size (1, 4, 16, … leaves), so append-heavy
//! structures only rehash the small subtrees near the front. An empty
//! remainder terminates the spine with a zero chunk.

use crate::{Hash256, HashEngine, MerkleError, merkleize::merkleize_chunks};

/// Merkleizes `chunks` progressively.
///
/// Level `k` of the spine stores the next `4^k` chunks as a standard binary
/// subtree on the right; the remainder recurses on the left. The caller is
/// responsible for any length or active-fields mixin on top.
pub fn merkleize_progressive<H: HashEngine>(chunks: &[Hash256]) -> Result<Hash256, MerkleError> {
    progressive_subtree::<H>(chunks, 1)
}

fn progressive_subtree<H: HashEngine>(
    chunks: &[Hash256],
    subtree_leaves: usize,
) -> Result<Hash256, MerkleError> {
    if chunks.is_empty() {
        return Ok(Hash256::ZERO);
    }
    let split = chunks.len().min(subtree_leaves);
    let right = merkleize_chunks::<H>(&chunks[..split], subtree_leaves)?;
    let left = progressive_subtree::<H>(&chunks[split..], subtree_leaves * 4)?;
    Ok(H::hash_concat(left.as_slice(), right.as_slice()))
}

/// Mixes an active-fields bitvector into a progressive-container root.
///
/// `active_fields` holds the raw bitvector bytes (bit `i` set when field
/// index `i` is present); it is padded on the right into a single 32-byte
/// chunk.
pub fn mix_in_active_fields<H: HashEngine>(root: &Hash256, active_fields: &[u8]) -> Hash256 {
    let aux = Hash256::right_padding_from(active_fields);
    H::hash_concat(root.as_slice(), aux.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sha256Engine;

    fn chunk(byte: u8) -> Hash256 {
        Hash256::repeat_byte(byte)
    }

    #[test]
    fn empty_input_is_zero_chunk() {
        assert_eq!(
            merkleize_progressive::<Sha256Engine>(&[]).unwrap(),
            Hash256::ZERO
        );
    }

    #[test]
    fn single_chunk_spine() {
        let c = chunk(1);
        let expected = Sha256Engine::hash_concat(Hash256::ZERO.as_slice(), c.as_slice());
        assert_eq!(merkleize_progressive::<Sha256Engine>(&[c]).unwrap(), expected);
    }

    #[test]
    fn two_chunks_spill_into_four_leaf_subtree() {
        let a = chunk(1);
        let b = chunk(2);
        let right = a;
        let level1 = merkleize_chunks::<Sha256Engine>(&[b], 4).unwrap();
        let left = Sha256Engine::hash_concat(Hash256::ZERO.as_slice(), level1.as_slice());
        let expected = Sha256Engine::hash_concat(left.as_slice(), right.as_slice());
        assert_eq!(
            merkleize_progressive::<Sha256Engine>(&[a, b]).unwrap(),
            expected
        );
    }

    #[test]
    fn spine_subtree_sizes_grow_by_four() {
        // 1 + 4 + 16 chunks fill the first three spine levels exactly.
        let chunks: Vec<Hash256> = (0..21).map(|i| chunk(i as u8 + 1)).collect();
        let right0 = chunks[0];
        let right1 = merkleize_chunks::<Sha256Engine>(&chunks[1..5], 4).unwrap();
        let right2 = merkleize_chunks::<Sha256Engine>(&chunks[5..21], 16).unwrap();
        let left2 = Sha256Engine::hash_concat(Hash256::ZERO.as_slice(), right2.as_slice());
        let left1 = Sha256Engine::hash_concat(left2.as_slice(), right1.as_slice());
        let expected = Sha256Engine::hash_concat(left1.as_slice(), right0.as_slice());
        assert_eq!(
            merkleize_progressive::<Sha256Engine>(&chunks).unwrap(),
            expected
        );
    }

    #[test]
    fn active_fields_pad_right() {
        let root = chunk(9);
        let mixed = mix_in_active_fields::<Sha256Engine>(&root, &[0b0101_0101]);
        let mut aux = [0u8; 32];
        aux[0] = 0b0101_0101;
        assert_eq!(
            mixed,
            Sha256Engine::hash_concat(root.as_slice(), &aux)
        );
    }
}
