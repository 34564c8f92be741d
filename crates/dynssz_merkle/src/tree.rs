//! Explicit merkle tree with cached node hashes.

use std::sync::Arc;

use crate::{
    Hash256, HashEngine, MerkleError,
    merkleize::depth_for_limit,
    proof::{Multiproof, Proof},
};

/// A merkle tree node.
///
/// Absent positions are represented by [`MerkleTree::Zero`] carrying the
/// subtree depth, so padding costs one enum variant instead of hashing.
#[derive(Debug, Clone)]
pub enum MerkleTree {
    /// A leaf holding a 32-byte chunk.
    Leaf(Hash256),

    /// An interior node with both children and its cached hash.
    Branch {
        /// Cached hash of `left || right`.
        hash: Hash256,
        /// Left child.
        left: Arc<MerkleTree>,
        /// Right child.
        right: Arc<MerkleTree>,
    },

    /// An all-zero subtree of the given depth.
    Zero(usize),
}

impl MerkleTree {
    /// Builds a tree from `leaves` with `limit` leaf positions.
    ///
    /// `limit` must be a power of two at least `leaves.len()`; zero means
    /// "next power of two of the leaf count".
    pub fn build<H: HashEngine>(leaves: &[Hash256], limit: usize) -> Result<Self, MerkleError> {
        let limit = if limit == 0 {
            leaves.len().next_power_of_two().max(1)
        } else {
            limit
        };
        if !limit.is_power_of_two() {
            return Err(MerkleError::InvalidLimit(limit));
        }
        if leaves.len() > limit {
            return Err(MerkleError::TooManyLeaves {
                leaves: leaves.len(),
                limit,
            });
        }
        Self::build_subtree::<H>(leaves, depth_for_limit(limit))
    }

    fn build_subtree<H: HashEngine>(leaves: &[Hash256], depth: usize) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            // Force the zero-hash table lookup now so `hash()` cannot fail.
            H::zero_hash(depth)?;
            return Ok(MerkleTree::Zero(depth));
        }
        if depth == 0 {
            return Ok(MerkleTree::Leaf(leaves[0]));
        }
        let split = leaves.len().min(1 << (depth - 1));
        let left = Self::build_subtree::<H>(&leaves[..split], depth - 1)?;
        let right = Self::build_subtree::<H>(&leaves[split..], depth - 1)?;
        let hash = H::hash_concat(left.hash::<H>().as_slice(), right.hash::<H>().as_slice());
        Ok(MerkleTree::Branch {
            hash,
            left: Arc::new(left),
            right: Arc::new(right),
        })
    }

    /// Returns this node's hash.
    pub fn hash<H: HashEngine>(&self) -> Hash256 {
        match self {
            MerkleTree::Leaf(hash) => *hash,
            MerkleTree::Branch { hash, .. } => *hash,
            MerkleTree::Zero(depth) => {
                H::zero_hash(*depth).expect("depth was validated during construction")
            }
        }
    }

    /// Depth of the subtree rooted at this node.
    pub fn depth(&self) -> usize {
        match self {
            MerkleTree::Leaf(_) => 0,
            MerkleTree::Zero(depth) => *depth,
            MerkleTree::Branch { left, .. } => left.depth() + 1,
        }
    }

    /// Returns the hash of the node at `gindex` (root is 1).
    pub fn node<H: HashEngine>(&self, gindex: u64) -> Result<Hash256, MerkleError> {
        let bits = path_bits(gindex, self.depth())?;
        self.node_at::<H>(&bits, gindex)
    }

    fn node_at<H: HashEngine>(&self, bits: &[bool], gindex: u64) -> Result<Hash256, MerkleError> {
        match (self, bits.split_first()) {
            (node, None) => Ok(node.hash::<H>()),
            (MerkleTree::Branch { left, right, .. }, Some((step, rest))) => {
                let child = if *step { right } else { left };
                child.node_at::<H>(rest, gindex)
            }
            (MerkleTree::Zero(depth), Some(_)) => {
                let target = depth
                    .checked_sub(bits.len())
                    .ok_or(MerkleError::InvalidGeneralizedIndex(gindex))?;
                H::zero_hash(target)
            }
            (MerkleTree::Leaf(_), Some(_)) => Err(MerkleError::InvalidGeneralizedIndex(gindex)),
        }
    }

    /// Generates a single-leaf proof for the node at `gindex`.
    ///
    /// Sibling hashes are ordered leaf-to-root.
    pub fn generate_proof<H: HashEngine>(&self, gindex: u64) -> Result<Proof, MerkleError> {
        let bits = path_bits(gindex, self.depth())?;
        let mut hashes = Vec::with_capacity(bits.len());
        let leaf = self.prove_at::<H>(&bits, gindex, &mut hashes)?;
        Ok(Proof {
            leaf,
            index: gindex,
            hashes,
        })
    }

    /// Collects siblings on the unwind, so `hashes` ends up leaf-to-root.
    fn prove_at<H: HashEngine>(
        &self,
        bits: &[bool],
        gindex: u64,
        hashes: &mut Vec<Hash256>,
    ) -> Result<Hash256, MerkleError> {
        match (self, bits.split_first()) {
            (node, None) => Ok(node.hash::<H>()),
            (MerkleTree::Branch { left, right, .. }, Some((step, rest))) => {
                let (child, sibling) = if *step { (right, left) } else { (left, right) };
                let leaf = child.prove_at::<H>(rest, gindex, hashes)?;
                hashes.push(sibling.hash::<H>());
                Ok(leaf)
            }
            (MerkleTree::Zero(depth), Some(_)) => {
                let target = depth
                    .checked_sub(bits.len())
                    .ok_or(MerkleError::InvalidGeneralizedIndex(gindex))?;
                for level in target..*depth {
                    hashes.push(H::zero_hash(level)?);
                }
                H::zero_hash(target)
            }
            (MerkleTree::Leaf(_), Some(_)) => Err(MerkleError::InvalidGeneralizedIndex(gindex)),
        }
    }

    /// Generates a multiproof for the nodes at `gindices`.
    pub fn generate_multiproof<H: HashEngine>(
        &self,
        gindices: &[u64],
    ) -> Result<Multiproof, MerkleError> {
        let mut leaves = Vec::with_capacity(gindices.len());
        for &gindex in gindices {
            leaves.push(self.node::<H>(gindex)?);
        }
        let helper = crate::proof::required_indices(gindices);
        let mut hashes = Vec::with_capacity(helper.len());
        for &gindex in &helper {
            hashes.push(self.node::<H>(gindex)?);
        }
        Ok(Multiproof {
            indices: gindices.to_vec(),
            leaves,
            hashes,
        })
    }
}

/// Root-to-leaf direction bits for `gindex` in a tree of `depth` levels.
///
/// `true` means "descend right".
fn path_bits(gindex: u64, depth: usize) -> Result<Vec<bool>, MerkleError> {
    if gindex == 0 {
        return Err(MerkleError::InvalidGeneralizedIndex(gindex));
    }
    let node_depth = gindex.ilog2() as usize;
    if node_depth > depth {
        return Err(MerkleError::InvalidGeneralizedIndex(gindex));
    }
    let mut bits = Vec::with_capacity(node_depth);
    for level in (0..node_depth).rev() {
        bits.push((gindex >> level) & 1 == 1);
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sha256Engine, merkleize_chunks, verify_proof};

    fn leaves(n: u8) -> Vec<Hash256> {
        (1..=n).map(Hash256::repeat_byte).collect()
    }

    #[test]
    fn root_matches_merkleize() {
        for n in [1u8, 2, 3, 4, 5, 8] {
            let leaves = leaves(n);
            let limit = (n as usize).next_power_of_two();
            let tree = MerkleTree::build::<Sha256Engine>(&leaves, limit).unwrap();
            assert_eq!(
                tree.hash::<Sha256Engine>(),
                merkleize_chunks::<Sha256Engine>(&leaves, limit).unwrap()
            );
        }
    }

    #[test]
    fn node_addressing() {
        let leaves = leaves(4);
        let tree = MerkleTree::build::<Sha256Engine>(&leaves, 4).unwrap();
        assert_eq!(
            tree.node::<Sha256Engine>(1).unwrap(),
            tree.hash::<Sha256Engine>()
        );
        for (i, leaf) in leaves.iter().enumerate() {
            assert_eq!(tree.node::<Sha256Engine>(4 + i as u64).unwrap(), *leaf);
        }
        assert!(tree.node::<Sha256Engine>(8).is_err());
        assert!(tree.node::<Sha256Engine>(0).is_err());
    }

    #[test]
    fn zero_padding_nodes_resolve() {
        let tree = MerkleTree::build::<Sha256Engine>(&leaves(1), 4).unwrap();
        assert_eq!(tree.node::<Sha256Engine>(5).unwrap(), Hash256::ZERO);
        assert_eq!(
            tree.node::<Sha256Engine>(3).unwrap(),
            Sha256Engine::zero_hash(1).unwrap()
        );
    }

    #[test]
    fn proofs_over_padding_verify() {
        let tree = MerkleTree::build::<Sha256Engine>(&leaves(3), 8).unwrap();
        let root = tree.hash::<Sha256Engine>();
        for gindex in 8..16u64 {
            let proof = tree.generate_proof::<Sha256Engine>(gindex).unwrap();
            assert!(verify_proof::<Sha256Engine>(&root, &proof));
        }
    }
}
