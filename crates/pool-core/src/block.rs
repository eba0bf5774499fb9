//! Bitcoin block header and block serialization.

use crate::encode::encode_varint;
use crate::hash::double_sha256;
use crate::network::BLOCK_HEADER_SIZE;
use crate::transaction::Transaction;

/// A Bitcoin block header (80 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version with BIP9 versionbits.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];

        // Version (4 bytes, little-endian)
        header[0..4].copy_from_slice(&self.version.to_le_bytes());

        // Previous block hash (32 bytes, internal byte order)
        header[4..36].copy_from_slice(&self.prev_block_hash);

        // Merkle root (32 bytes)
        header[36..68].copy_from_slice(&self.merkle_root);

        // Timestamp (4 bytes, little-endian)
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());

        // Bits (4 bytes, little-endian)
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());

        // Nonce (4 bytes, little-endian)
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Compute the block hash (double SHA256), internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }
}

/// A block: header plus transactions, coinbase first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Serialize the complete block for submission (witness form).
    pub fn serialize(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + 256 * self.transactions.len());
        block.extend_from_slice(&self.header.serialize());
        encode_varint(self.transactions.len() as u64, &mut block);
        for tx in &self.transactions {
            block.extend_from_slice(&tx.serialize());
        }
        block
    }

    /// Get the block as hex string for `submitblock`.
    pub fn serialize_hex(&self) -> String {
        hex::encode(self.serialize())
    }
}

/// Get the current Unix timestamp.
pub fn current_timestamp() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_to_display_hex;

    fn header() -> BlockHeader {
        BlockHeader {
            version: 0x20000000,
            prev_block_hash: [0x12; 32],
            merkle_root: [0x34; 32],
            timestamp: 1_700_000_000,
            bits: 0x17034219,
            nonce: 0xDEADBEEF,
        }
    }

    #[test]
    fn test_block_header_serialization() {
        let serialized = header().serialize();

        assert_eq!(serialized.len(), 80);
        assert_eq!(&serialized[0..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&serialized[4..36], &[0x12; 32]);
        assert_eq!(&serialized[36..68], &[0x34; 32]);
        assert_eq!(&serialized[72..76], &[0x19, 0x42, 0x03, 0x17]);
        assert_eq!(&serialized[76..80], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_genesis_header_hash() {
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(
            &hex::decode("3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a")
                .unwrap(),
        );
        let genesis = BlockHeader {
            version: 1,
            prev_block_hash: [0u8; 32],
            merkle_root,
            timestamp: 1_231_006_505,
            bits: 0x1d00ffff,
            nonce: 2_083_236_893,
        };

        assert_eq!(
            hash_to_display_hex(&genesis.hash()),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_empty_block_serialization() {
        let block = Block {
            header: header(),
            transactions: Vec::new(),
        };
        let bytes = block.serialize();
        assert_eq!(bytes.len(), 81);
        assert_eq!(bytes[80], 0x00);
    }
}
