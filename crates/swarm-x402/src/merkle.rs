//! Binary SHA-256 hash tree for batch provenance.
//!
//! Leaves are hashed individually; each parent is
//! `sha256(hex(left) || hex(right))` over the lowercase hex text of its
//! children, which is the form existing provenance records were produced
//! with. An odd level duplicates its last node before the next level is
//! built, and that duplicate is kept in the level, so the last leaf of an odd
//! level carries its own hash as a proof sibling.
//!
//! An empty batch still yields a one-node tree whose root is `sha256("")`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::X402Error;

/// A 32-byte SHA-256 digest.
pub type NodeHash = [u8; 32];

/// Side of the proof sibling relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    #[serde(with = "hex_node")]
    pub hash: NodeHash,
    pub position: Side,
}

/// Sibling hashes from a leaf up to (excluding) the root.
pub type Proof = Vec<ProofStep>;

/// Hash raw leaf content.
pub fn hash_leaf(content: &[u8]) -> NodeHash {
    Sha256::digest(content).into()
}

/// Hash two child nodes into their parent.
pub fn hash_pair(left: &NodeHash, right: &NodeHash) -> NodeHash {
    let mut hasher = Sha256::new();
    hasher.update(alloy::hex::encode(left).as_bytes());
    hasher.update(alloy::hex::encode(right).as_bytes());
    hasher.finalize().into()
}

/// Lowercase hex, no prefix.
pub fn to_hex(hash: &NodeHash) -> String {
    alloy::hex::encode(hash)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<NodeHash>>,
    leaf_count: usize,
    root: NodeHash,
}

impl MerkleTree {
    /// Build a tree over leaf contents, in order.
    pub fn build<I>(leaves: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let hashed: Vec<NodeHash> = leaves
            .into_iter()
            .map(|leaf| hash_leaf(leaf.as_ref()))
            .collect();
        let leaf_count = hashed.len();

        if hashed.is_empty() {
            let root = hash_leaf(b"");
            return Self {
                levels: vec![vec![root]],
                leaf_count,
                root,
            };
        }

        let mut levels = vec![hashed];
        while let Some(level) = levels.last_mut().filter(|level| level.len() > 1) {
            if level.len() % 2 == 1 {
                if let Some(&last) = level.last() {
                    level.push(last);
                }
            }
            let next: Vec<NodeHash> = level
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }

        let root = levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_else(|| hash_leaf(b""));

        Self {
            levels,
            leaf_count,
            root,
        }
    }

    pub fn root(&self) -> NodeHash {
        self.root
    }

    pub fn root_hex(&self) -> String {
        to_hex(&self.root)
    }

    /// Number of leaves the tree was built from (padding excluded).
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// All levels, leaves first. Odd levels include their duplicated last node.
    pub fn levels(&self) -> &[Vec<NodeHash>] {
        &self.levels
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<Proof, X402Error> {
        if index >= self.leaf_count {
            return Err(X402Error::LeafOutOfRange {
                index,
                leaves: self.leaf_count,
            });
        }

        let below_root = self
            .levels
            .split_last()
            .map(|(_, rest)| rest)
            .unwrap_or_default();

        let mut steps = Vec::with_capacity(below_root.len());
        let mut idx = index;
        for level in below_root {
            let (sibling, position) = if idx % 2 == 0 {
                (idx + 1, Side::Right)
            } else {
                (idx - 1, Side::Left)
            };
            if let Some(hash) = level.get(sibling) {
                steps.push(ProofStep {
                    hash: *hash,
                    position,
                });
            }
            idx /= 2;
        }
        Ok(steps)
    }

    /// Proofs for every leaf, in leaf order.
    pub fn proofs(&self) -> Vec<Proof> {
        (0..self.leaf_count)
            .filter_map(|index| self.proof(index).ok())
            .collect()
    }
}

/// Check that `leaf` content folds up to `root` through `proof`.
pub fn verify(leaf: &[u8], proof: &[ProofStep], root: &NodeHash) -> bool {
    verify_hash(&hash_leaf(leaf), proof, root)
}

/// Like [`verify`], starting from an already-hashed leaf.
pub fn verify_hash(leaf_hash: &NodeHash, proof: &[ProofStep], root: &NodeHash) -> bool {
    let folded = proof.iter().fold(*leaf_hash, |acc, step| match step.position {
        Side::Right => hash_pair(&acc, &step.hash),
        Side::Left => hash_pair(&step.hash, &acc),
    });
    &folded == root
}

mod hex_node {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::NodeHash;

    pub fn serialize<S: Serializer>(hash: &NodeHash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&alloy::hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NodeHash, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = alloy::hex::decode(text.strip_prefix("0x").unwrap_or(&text))
            .map_err(de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| de::Error::custom("expected a 32-byte hash"))
    }
}
