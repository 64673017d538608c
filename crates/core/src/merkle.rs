//! Sorted-pair Merkle accumulator (spec.md §4.2).
//!
//! Leaves are inserted in arbitrary order; the root and membership proofs
//! are rebuilt lazily on first access after an insertion invalidates the
//! cache. The fold rule sorts each `(current, sibling)` pair by byte value
//! before hashing, so proofs carry no direction bits — the same pair hashes
//! to the same parent regardless of which side it was inserted on.

use alloy::primitives::{keccak256, B256};
use parking_lot::Mutex;

fn fold(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Cached tree levels, rebuilt from `leaves` whenever stale.
struct Cache {
    levels: Vec<Vec<B256>>,
}

/// Append-only Merkle accumulator over `B256` leaves.
pub struct MerkleAccumulator {
    leaves: Vec<B256>,
    cache: Mutex<Option<Cache>>,
}

impl MerkleAccumulator {
    pub fn new() -> Self {
        Self {
            leaves: Vec::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn from_leaves(leaves: Vec<B256>) -> Self {
        Self {
            leaves,
            cache: Mutex::new(None),
        }
    }

    /// Insert a leaf, invalidating the cached root/proof levels.
    pub fn insert(&mut self, leaf: B256) {
        self.leaves.push(leaf);
        *self.cache.lock() = None;
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    fn rebuild(&self) -> Cache {
        let mut levels = vec![self.leaves.clone()];
        while levels.last().unwrap().len() > 1 {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            let mut i = 0;
            while i < current.len() {
                let left = current[i];
                let right = if i + 1 < current.len() {
                    current[i + 1]
                } else {
                    current[i] // odd count: duplicate the final element
                };
                next.push(fold(left, right));
                i += 2;
            }
            levels.push(next);
        }
        Cache { levels }
    }

    fn with_cache<R>(&self, f: impl FnOnce(&Cache) -> R) -> R {
        let mut guard = self.cache.lock();
        if guard.is_none() {
            *guard = Some(self.rebuild());
        }
        f(guard.as_ref().unwrap())
    }

    /// Current root, or the all-zero digest for an empty tree.
    pub fn root(&self) -> B256 {
        if self.leaves.is_empty() {
            return B256::ZERO;
        }
        self.with_cache(|c| *c.levels.last().unwrap().first().unwrap())
    }

    /// Ordered sibling digests from `index`'s leaf up to the root.
    pub fn proof(&self, index: usize) -> Option<Vec<B256>> {
        if index >= self.leaves.len() {
            return None;
        }
        Some(self.with_cache(|c| {
            let mut path = Vec::new();
            let mut idx = index;
            for level in &c.levels[..c.levels.len() - 1] {
                let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
                let sibling = if sibling_idx < level.len() {
                    level[sibling_idx]
                } else {
                    level[idx] // odd count: the duplicated final element
                };
                path.push(sibling);
                idx /= 2;
            }
            path
        }))
    }

    /// Verify `leaf` against `root` by folding it with `proof`'s siblings in
    /// order. Direction-free: the sorted-pair fold means this is the exact
    /// inverse of the construction in `rebuild`.
    pub fn verify(leaf: B256, proof: &[B256], root: B256) -> bool {
        let mut current = leaf;
        for sibling in proof {
            current = fold(current, *sibling);
        }
        current == root
    }
}

impl Default for MerkleAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        keccak256(bytes)
    }

    #[test]
    fn empty_tree_root_is_zero() {
        let tree = MerkleAccumulator::new();
        assert_eq!(tree.root(), B256::ZERO);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let mut tree = MerkleAccumulator::new();
        tree.insert(leaf(1));
        assert_eq!(tree.root(), leaf(1));
    }

    #[test]
    fn every_leaf_proves_membership() {
        let leaves: Vec<B256> = (0..7).map(leaf).collect();
        let mut tree = MerkleAccumulator::new();
        for l in &leaves {
            tree.insert(*l);
        }
        let root = tree.root();
        for (i, l) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(MerkleAccumulator::verify(*l, &proof, root), "leaf {i} failed to verify");
        }
    }

    #[test]
    fn duplicate_leaves_are_allowed_and_provable() {
        let mut tree = MerkleAccumulator::new();
        tree.insert(leaf(5));
        tree.insert(leaf(5));
        tree.insert(leaf(9));
        let root = tree.root();
        for i in 0..3 {
            let proof = tree.proof(i).unwrap();
            let l = if i == 2 { leaf(9) } else { leaf(5) };
            assert!(MerkleAccumulator::verify(l, &proof, root));
        }
    }

    #[test]
    fn proof_is_symmetric_regardless_of_insertion_order() {
        let mut forward = MerkleAccumulator::new();
        forward.insert(leaf(1));
        forward.insert(leaf(2));

        let mut backward = MerkleAccumulator::new();
        backward.insert(leaf(2));
        backward.insert(leaf(1));

        assert_eq!(forward.root(), backward.root());
    }

    #[test]
    fn tampered_leaf_fails_verification() {
        let mut tree = MerkleAccumulator::new();
        tree.insert(leaf(1));
        tree.insert(leaf(2));
        tree.insert(leaf(3));
        let root = tree.root();
        let proof = tree.proof(0).unwrap();
        assert!(!MerkleAccumulator::verify(leaf(99), &proof, root));
    }

    #[test]
    fn out_of_range_index_returns_none() {
        let mut tree = MerkleAccumulator::new();
        tree.insert(leaf(1));
        assert!(tree.proof(5).is_none());
    }

    #[test]
    fn lazy_rebuild_reflects_latest_insertion() {
        let mut tree = MerkleAccumulator::new();
        tree.insert(leaf(1));
        let root_before = tree.root();
        tree.insert(leaf(2));
        let root_after = tree.root();
        assert_ne!(root_before, root_after);
    }
}
