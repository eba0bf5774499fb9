//! SHA256 double-hashing and the byte-order conversions Stratum needs.
//!
//! Every Bitcoin-style digest in this crate (txids, merkle nodes, the
//! witness commitment, header hashes) goes through [`double_sha256`].

use sha2::{Digest, Sha256};

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Double SHA256 of two concatenated 32-byte nodes.
///
/// This is the merkle combination step: `SHA256d(left || right)`.
#[inline]
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

/// Reverse the byte order of a 32-byte array.
///
/// Nodes display hashes big-endian; headers and merkle trees use the
/// reversed (internal) order.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Reverse the bytes inside each 4-byte word, keeping word order.
///
/// Stratum v1 sends the previous block hash as eight 32-bit words, each
/// printed big-endian. Applied to internal byte order this yields the
/// `prevhash` field of `mining.notify`; applying it twice is a no-op.
///
/// ```text
/// internal: [fd 55 64 6b] [c1 62 b9 6d] ...
/// stratum:  [6b 64 55 fd] [6d b9 62 c1] ...
/// ```
pub fn word_swap(bytes: &[u8; 32]) -> [u8; 32] {
    let mut swapped = *bytes;
    for word in swapped.chunks_mut(4) {
        word.reverse();
    }
    swapped
}

/// Convert a hash in internal byte order to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}
