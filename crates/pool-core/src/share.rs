//! Candidate block reconstruction from miner shares.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::block::{Block, BlockHeader};
use crate::difficulty::{bits_to_target, hash_meets_target};
use crate::error::Result;
use crate::hash::{hash_to_display_hex, reverse_bytes};
use crate::job::MiningJob;
use crate::merkle::merkle_root_from_branch;
use crate::transaction::Transaction;

/// A miner's `mining.submit`, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSubmission {
    /// Version bits the miner rolled (BIP320). Zero or absent means none.
    #[serde(default)]
    pub version_mask: Option<u32>,
    pub nonce: u32,
    #[serde(with = "hex::serde")]
    pub extranonce1: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub extranonce2: Vec<u8>,
    /// Header time the miner used, if it rolled ntime.
    #[serde(default)]
    pub ntime: Option<u32>,
}

/// A fully assembled block for one share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBlock {
    block: Block,
}

impl CandidateBlock {
    pub fn header(&self) -> &BlockHeader {
        &self.block.header
    }

    /// Transactions in block order, coinbase first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.block.transactions
    }

    pub fn header_bytes(&self) -> [u8; 80] {
        self.block.header.serialize()
    }

    /// Header hash, internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        self.block.header.hash()
    }

    /// Whether the header hash is at or below the network target.
    pub fn meets_target(&self) -> bool {
        let target = bits_to_target(self.block.header.bits);
        hash_meets_target(&reverse_bytes(&self.hash()), &target)
    }

    pub fn merkle_root(&self) -> [u8; 32] {
        self.block.header.merkle_root
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.block.serialize()
    }

    pub fn serialize_hex(&self) -> String {
        self.block.serialize_hex()
    }

    pub fn into_block(self) -> Block {
        self.block
    }
}

impl MiningJob {
    /// Rebuild the block a miner hashed for `share`.
    ///
    /// Works on a copy of the job's skeleton, so any number of threads can
    /// call this on one job at once.
    pub fn candidate(&self, share: &ShareSubmission) -> Result<CandidateBlock> {
        let coinbase = self
            .coinbase
            .with_extranonce(&share.extranonce1, &share.extranonce2)?;

        let mut block = self.block.clone();
        let header = &mut block.header;
        header.nonce = share.nonce;
        if let Some(mask) = share.version_mask.filter(|&mask| mask != 0) {
            header.version ^= mask as i32;
        }
        if let Some(ntime) = share.ntime {
            header.timestamp = ntime;
        }

        header.merkle_root = merkle_root_from_branch(&coinbase.txid(), &self.merkle_branch);
        block.transactions[0] = coinbase;

        trace!(
            job_id = %self.job_id,
            nonce = share.nonce,
            hash = %hash_to_display_hex(&block.header.hash()),
            "Reconstructed candidate block"
        );

        Ok(CandidateBlock { block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobSettings;
    use crate::error::{Error, ExtranonceKind};
    use crate::job::JobBuilder;
    use crate::merkle::compute_merkle_root;
    use crate::network::Network;
    use crate::payout::{Payout, PayoutAddress};
    use crate::template::{BlockTemplate, TemplateTransaction};
    use std::sync::Arc;

    const BLOCK_170_TX: &str = "0100000001c997a5e56e104102fa209c6a852dd90660a20b2d9c352423edce25857fcd3704000000004847304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd410220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d0901ffffffff0200ca9a3b00000000434104ae1a62fe09c5f51b13905f07f06b99a2f7159b2225f374cd378d71302fa28414e7aab37397f554a7df5f142c21c1b7303b8a0626f1baded5c72a704f7e6cd84cac00286bee0000000043410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3ac00000000";

    fn job(txs: usize) -> MiningJob {
        let entry = PayoutAddress {
            address: "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq".to_string(),
            percent: 100.0,
        };
        let settings = JobSettings {
            network: Network::Mainnet,
            payouts: vec![Payout::resolve(&entry, Network::Mainnet).unwrap()],
            extranonce1_size: 4,
            extranonce2_size: 4,
            commitment_placement: Default::default(),
        };
        let template = BlockTemplate {
            previousblockhash: "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054"
                .to_string(),
            version: 0x20000000,
            bits: "170d2f10".to_string(),
            height: 800_000,
            coinbasevalue: 625_000_000,
            transactions: (0..txs)
                .map(|_| TemplateTransaction {
                    data: BLOCK_170_TX.to_string(),
                })
                .collect(),
        };
        JobBuilder::new(&settings, &template)
            .timestamp(1_690_168_629)
            .build()
            .unwrap()
    }

    fn share(nonce: u32) -> ShareSubmission {
        ShareSubmission {
            version_mask: None,
            nonce,
            extranonce1: vec![0xde, 0xad, 0xbe, 0xef],
            extranonce2: vec![0x00, 0x00, 0x00, 0x2a],
            ntime: None,
        }
    }

    #[test]
    fn test_reconstruction_is_deterministic() {
        let job = job(2);
        let first = job.candidate(&share(12345)).unwrap();
        let second = job.candidate(&share(12345)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.header_bytes(), second.header_bytes());
        assert_eq!(first.header().nonce, 12345);
    }

    #[test]
    fn test_zero_extranonces_match_skeleton_root() {
        let job = job(3);
        let mut zero = share(0);
        zero.extranonce1 = vec![0; 4];
        zero.extranonce2 = vec![0; 4];

        let candidate = job.candidate(&zero).unwrap();
        assert_eq!(candidate.merkle_root(), job.block().header.merkle_root);
    }

    #[test]
    fn test_root_covers_all_transactions() {
        let job = job(3);
        let candidate = job.candidate(&share(7)).unwrap();

        let txids: Vec<[u8; 32]> = candidate.transactions().iter().map(Transaction::txid).collect();
        assert_eq!(candidate.merkle_root(), compute_merkle_root(&txids));
        assert_ne!(candidate.merkle_root(), job.block().header.merkle_root);

        let script = &candidate.transactions()[0].inputs[0].script_sig;
        assert_eq!(&script[script.len() - 8..], &[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0x2a]);
    }

    #[test]
    fn test_coinbase_matches_stratum_assembly() {
        let job = job(1);
        let submitted = share(1);
        let candidate = job.candidate(&submitted).unwrap();

        let mut legacy = job.coinb1().to_vec();
        legacy.extend_from_slice(&submitted.extranonce1);
        legacy.extend_from_slice(&submitted.extranonce2);
        legacy.extend_from_slice(job.coinb2());
        assert_eq!(candidate.transactions()[0].serialize_legacy(), legacy);
    }

    #[test]
    fn test_version_mask_xor() {
        let job = job(0);
        let mask = 0x1fffe000;
        let mut rolled = share(1);
        rolled.version_mask = Some(mask);

        let candidate = job.candidate(&rolled).unwrap();
        assert_eq!(candidate.header().version, 0x20000000 ^ mask as i32);
        assert_eq!(candidate.header().version ^ mask as i32, job.version());

        rolled.version_mask = Some(0);
        assert_eq!(job.candidate(&rolled).unwrap().header().version, job.version());
    }

    #[test]
    fn test_ntime_override() {
        let job = job(0);
        let mut rolled = share(1);
        assert_eq!(job.candidate(&rolled).unwrap().header().timestamp, 1_690_168_629);

        rolled.ntime = Some(1_690_168_700);
        assert_eq!(job.candidate(&rolled).unwrap().header().timestamp, 1_690_168_700);
    }

    #[test]
    fn test_extranonce_mismatch() {
        let job = job(0);
        let mut bad = share(1);
        bad.extranonce2 = vec![0; 8];

        assert!(matches!(
            job.candidate(&bad),
            Err(Error::ExtranonceLengthMismatch {
                kind: ExtranonceKind::Extranonce2,
                expected: 4,
                got: 8
            })
        ));
    }

    #[test]
    fn test_concurrent_candidates() {
        let job = Arc::new(job(2));
        let expected = job.candidate(&share(99)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let job = Arc::clone(&job);
                std::thread::spawn(move || job.candidate(&share(99)).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_share_from_json() {
        let parsed: ShareSubmission = serde_json::from_str(
            r#"{"nonce": 305419896, "extranonce1": "deadbeef", "extranonce2": "0000002a"}"#,
        )
        .unwrap();

        assert_eq!(parsed, share(0x12345678));
    }

    #[test]
    fn test_meets_target() {
        let job = job(0);
        // A real share at mainnet difficulty is out of reach for a test.
        assert!(!job.candidate(&share(1)).unwrap().meets_target());

        // Regtest target: roughly half of all hashes qualify.
        let mut easy = job.candidate(&share(1)).unwrap().into_block();
        easy.header.bits = 0x207fffff;
        let results: Vec<bool> = (0..64)
            .map(|nonce| {
                let mut block = easy.clone();
                block.header.nonce = nonce;
                CandidateBlock { block }.meets_target()
            })
            .collect();
        assert!(results.contains(&true));
        assert!(results.contains(&false));
    }

    #[test]
    fn test_block_serialization_starts_with_header() {
        let job = job(1);
        let candidate = job.candidate(&share(5)).unwrap();
        let bytes = candidate.serialize();

        assert_eq!(&bytes[..80], &candidate.header_bytes());
        assert_eq!(bytes[80], 2);
        assert_eq!(candidate.serialize_hex(), hex::encode(&bytes));
    }
}
