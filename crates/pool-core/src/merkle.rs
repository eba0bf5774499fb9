//! Merkle tree computation for Bitcoin transactions.
//!
//! All hashes here are in internal byte order. A level with an odd number
//! of nodes pairs its last node with itself.

use crate::hash::hash_pair;

/// Witness commitment header (BIP141).
pub const WITNESS_COMMITMENT_MAGIC: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

/// Hash one tree level into the next.
fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Compute the merkle root from a list of transaction IDs.
///
/// A single transaction is its own root. An empty list yields zero.
pub fn compute_merkle_root(txids: &[[u8; 32]]) -> [u8; 32] {
    if txids.is_empty() {
        return [0u8; 32];
    }

    let mut level = txids.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Authentication path for the first leaf (the coinbase), leaf to root.
///
/// At each level the sibling of the coinbase's ancestor is always index 1,
/// so the branch is independent of the coinbase hash itself and can be
/// published before the coinbase is final. `leaves[0]` is never read; any
/// placeholder works there.
pub fn merkle_branch(leaves: &[[u8; 32]]) -> Vec<[u8; 32]> {
    let mut branch = Vec::new();
    let mut level = leaves.to_vec();

    while level.len() > 1 {
        branch.push(level[1]);
        level = next_level(&level);
    }

    branch
}

/// Recompute a root from the first leaf and its branch.
///
/// Folds `SHA256d(running || sibling)` over the branch in order.
pub fn merkle_root_from_branch(leaf: &[u8; 32], branch: &[[u8; 32]]) -> [u8; 32] {
    branch
        .iter()
        .fold(*leaf, |running, sibling| hash_pair(&running, sibling))
}

/// Witness merkle root for a block.
///
/// The coinbase's wtxid is defined as 32 zero bytes, so callers pass only
/// the wtxids of the remaining transactions, in block order.
pub fn witness_merkle_root(non_coinbase_wtxids: &[[u8; 32]]) -> [u8; 32] {
    let mut leaves = Vec::with_capacity(non_coinbase_wtxids.len() + 1);
    leaves.push([0u8; 32]);
    leaves.extend_from_slice(non_coinbase_wtxids);
    compute_merkle_root(&leaves)
}

/// Compute the witness commitment for a SegWit block.
///
/// `SHA256d(witness_merkle_root || witness_reserved_value)`, where the
/// reserved value is the single witness item of the coinbase input.
pub fn compute_witness_commitment(
    witness_merkle_root: &[u8; 32],
    witness_reserved_value: &[u8; 32],
) -> [u8; 32] {
    hash_pair(witness_merkle_root, witness_reserved_value)
}

/// Generate the scriptPubKey for a witness commitment output.
///
/// Format: OP_RETURN PUSH36 aa21a9ed <commitment>
pub fn witness_commitment_script(witness_commitment: &[u8; 32]) -> Vec<u8> {
    let mut script = Vec::with_capacity(38);
    script.push(0x6a); // OP_RETURN
    script.push(0x24); // Push 36 bytes
    script.extend_from_slice(&WITNESS_COMMITMENT_MAGIC);
    script.extend_from_slice(witness_commitment);
    script
}
