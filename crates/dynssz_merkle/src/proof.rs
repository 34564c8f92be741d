//! Single-leaf proofs and compressed multiproofs over generalized indices.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Hash256, HashEngine, MerkleError};

/// A proof that one node belongs to a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Value of the proven node.
    pub leaf: Hash256,
    /// Generalized index of the proven node (root is 1).
    pub index: u64,
    /// Sibling hashes, ordered leaf-to-root.
    pub hashes: Vec<Hash256>,
}

/// Verifies a single-leaf proof against `root`.
///
/// Folds each sibling into the running hash, using the index bits to decide
/// left/right placement; the proof is rejected if its length does not match
/// the index depth.
pub fn verify_proof<H: HashEngine>(root: &Hash256, proof: &Proof) -> bool {
    if proof.index == 0 || proof.index.ilog2() as usize != proof.hashes.len() {
        return false;
    }
    let mut node = proof.leaf;
    for (level, sibling) in proof.hashes.iter().enumerate() {
        node = if (proof.index >> level) & 1 == 1 {
            H::hash_concat(sibling.as_slice(), node.as_slice())
        } else {
            H::hash_concat(node.as_slice(), sibling.as_slice())
        };
    }
    node == *root
}

/// A multiproof: several proven nodes sharing sibling hashes.
///
/// `hashes` holds each required sibling exactly once, in the order produced
/// by [`required_indices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiproof {
    /// Generalized indices of the proven nodes.
    pub indices: Vec<u64>,
    /// Values of the proven nodes, parallel to `indices`.
    pub leaves: Vec<Hash256>,
    /// Shared sibling hashes, deepest first.
    pub hashes: Vec<Hash256>,
}

/// Computes the sibling indices a multiproof must carry for `indices`.
///
/// A sibling is required when it is neither proven itself nor recomputable
/// from proven descendants. The result is sorted descending (deepest first)
/// so verification can fold level by level.
pub fn required_indices(indices: &[u64]) -> Vec<u64> {
    let mut branch_indices = BTreeSet::new();
    let mut path_indices = BTreeSet::new();
    for &index in indices {
        let mut node = index;
        while node > 1 {
            branch_indices.insert(node ^ 1);
            path_indices.insert(node);
            node /= 2;
        }
        path_indices.insert(1);
    }
    let mut helper: Vec<u64> = branch_indices.difference(&path_indices).copied().collect();
    helper.sort_unstable_by(|a, b| b.cmp(a));
    helper
}

/// Verifies a multiproof against `root`.
///
/// `hashes` and `leaves`/`indices` are combined into a node map, then folded
/// bottom-up; the proof is rejected when a needed sibling is absent, a
/// supplied hash goes unused, or the computed root differs.
pub fn verify_multiproof<H: HashEngine>(
    root: &Hash256,
    hashes: &[Hash256],
    leaves: &[Hash256],
    indices: &[u64],
) -> bool {
    calculate_multiproof_root::<H>(hashes, leaves, indices)
        .map(|computed| computed == *root)
        .unwrap_or(false)
}

/// Folds a multiproof to its root.
pub fn calculate_multiproof_root<H: HashEngine>(
    hashes: &[Hash256],
    leaves: &[Hash256],
    indices: &[u64],
) -> Result<Hash256, MerkleError> {
    if leaves.len() != indices.len() {
        return Err(MerkleError::MalformedProof("leaf/index count mismatch"));
    }
    if indices.is_empty() {
        return Err(MerkleError::MalformedProof("no leaves to prove"));
    }
    if indices.contains(&0) {
        return Err(MerkleError::MalformedProof("generalized index zero"));
    }
    let helper = required_indices(indices);
    if helper.len() != hashes.len() {
        return Err(MerkleError::MalformedProof("sibling count mismatch"));
    }

    let mut nodes: BTreeMap<u64, Hash256> = BTreeMap::new();
    for (&index, &leaf) in indices.iter().zip(leaves) {
        if nodes.insert(index, leaf).is_some_and(|prev| prev != leaf) {
            return Err(MerkleError::MalformedProof("conflicting leaf values"));
        }
    }
    for (&index, &hash) in helper.iter().zip(hashes) {
        nodes.insert(index, hash);
    }

    // Fold deepest-first: the largest index with a known sibling always has
    // its parent still unknown, so one descending sweep suffices.
    let mut queue: Vec<u64> = nodes.keys().copied().collect();
    queue.sort_unstable_by(|a, b| b.cmp(a));
    let mut pos = 0;
    while pos < queue.len() {
        let index = queue[pos];
        pos += 1;
        if index == 1 {
            continue;
        }
        let parent = index / 2;
        if nodes.contains_key(&parent) {
            continue;
        }
        let (Some(left), Some(right)) = (nodes.get(&(parent * 2)), nodes.get(&(parent * 2 + 1)))
        else {
            continue;
        };
        let hash = H::hash_concat(left.as_slice(), right.as_slice());
        nodes.insert(parent, hash);
        // Keep descending order: parent is smaller than everything folded so
        // far, so scanning forward stays correct.
        queue.push(parent);
    }

    nodes
        .get(&1)
        .copied()
        .ok_or(MerkleError::MalformedProof("root not reachable"))
}

/// One entry of a compressed multiproof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofHash {
    /// A literal sibling hash.
    Hash(Hash256),
    /// A zero-subtree hash, transported as its depth.
    Zero(u8),
}

/// A multiproof with zero-subtree hashes replaced by depth tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedMultiproof {
    /// Generalized indices of the proven nodes.
    pub indices: Vec<u64>,
    /// Values of the proven nodes.
    pub leaves: Vec<Hash256>,
    /// Sibling hashes, zero subtrees compressed to depth tags.
    pub hashes: Vec<ProofHash>,
}

impl Multiproof {
    /// Compresses this proof for transport.
    pub fn compress<H: HashEngine>(&self) -> CompressedMultiproof {
        let zero_hashes = H::zero_hashes();
        let hashes = self
            .hashes
            .iter()
            .map(|hash| {
                match zero_hashes.iter().position(|zero| zero == hash) {
                    Some(depth) => ProofHash::Zero(depth as u8),
                    None => ProofHash::Hash(*hash),
                }
            })
            .collect();
        CompressedMultiproof {
            indices: self.indices.clone(),
            leaves: self.leaves.clone(),
            hashes,
        }
    }

    /// Verifies this proof against `root`.
    pub fn verify<H: HashEngine>(&self, root: &Hash256) -> bool {
        verify_multiproof::<H>(root, &self.hashes, &self.leaves, &self.indices)
    }
}

impl CompressedMultiproof {
    /// Expands depth tags back into zero-subtree hashes.
    pub fn decompress<H: HashEngine>(&self) -> Result<Multiproof, MerkleError> {
        let mut hashes = Vec::with_capacity(self.hashes.len());
        for entry in &self.hashes {
            hashes.push(match entry {
                ProofHash::Hash(hash) => *hash,
                ProofHash::Zero(depth) => H::zero_hash(*depth as usize)?,
            });
        }
        Ok(Multiproof {
            indices: self.indices.clone(),
            leaves: self.leaves.clone(),
            hashes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MerkleTree, Sha256Engine};

    fn tree_of(n: u8, limit: usize) -> MerkleTree {
        let leaves: Vec<Hash256> = (1..=n).map(Hash256::repeat_byte).collect();
        MerkleTree::build::<Sha256Engine>(&leaves, limit).unwrap()
    }

    #[test]
    fn single_proof_round_trip() {
        let tree = tree_of(4, 4);
        let root = tree.hash::<Sha256Engine>();
        for gindex in 4..8u64 {
            let proof = tree.generate_proof::<Sha256Engine>(gindex).unwrap();
            assert!(verify_proof::<Sha256Engine>(&root, &proof));
        }
    }

    #[test]
    fn mutated_sibling_fails() {
        let tree = tree_of(4, 4);
        let root = tree.hash::<Sha256Engine>();
        let mut proof = tree.generate_proof::<Sha256Engine>(4).unwrap();
        proof.hashes[0].as_mut()[0] ^= 1;
        assert!(!verify_proof::<Sha256Engine>(&root, &proof));
    }

    #[test]
    fn wrong_depth_fails() {
        let tree = tree_of(4, 4);
        let root = tree.hash::<Sha256Engine>();
        let mut proof = tree.generate_proof::<Sha256Engine>(4).unwrap();
        proof.hashes.pop();
        assert!(!verify_proof::<Sha256Engine>(&root, &proof));
    }

    #[test]
    fn required_indices_for_sibling_pair() {
        // Proving leaves 4 and 5 only needs their uncle 3.
        assert_eq!(required_indices(&[4, 5]), vec![3]);
        // Proving leaf 4 needs 5 and 3, deepest first.
        assert_eq!(required_indices(&[4]), vec![5, 3]);
    }

    #[test]
    fn multiproof_round_trip() {
        let tree = tree_of(8, 8);
        let root = tree.hash::<Sha256Engine>();
        let proof = tree
            .generate_multiproof::<Sha256Engine>(&[8, 11, 14])
            .unwrap();
        assert!(proof.verify::<Sha256Engine>(&root));
    }

    #[test]
    fn multiproof_detects_tampering() {
        let tree = tree_of(8, 8);
        let root = tree.hash::<Sha256Engine>();
        let mut proof = tree.generate_multiproof::<Sha256Engine>(&[9, 13]).unwrap();
        proof.leaves[1].as_mut()[5] ^= 0xff;
        assert!(!proof.verify::<Sha256Engine>(&root));
    }

    #[test]
    fn compression_round_trip() {
        // A sparse tree gives the proof real zero-subtree siblings.
        let tree = tree_of(2, 16);
        let root = tree.hash::<Sha256Engine>();
        let proof = tree.generate_multiproof::<Sha256Engine>(&[16]).unwrap();
        let compressed = proof.compress::<Sha256Engine>();
        assert!(
            compressed
                .hashes
                .iter()
                .any(|h| matches!(h, ProofHash::Zero(_)))
        );
        let expanded = compressed.decompress::<Sha256Engine>().unwrap();
        assert_eq!(expanded, proof);
        assert!(expanded.verify::<Sha256Engine>(&root));
    }
}
