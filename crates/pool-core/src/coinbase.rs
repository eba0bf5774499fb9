//! Coinbase transaction construction for pool jobs.
//!
//! The coinbase input script is laid out as
//!
//! ```text
//! [BIP34 height push][extranonce1][extranonce2]
//! ```
//!
//! and the legacy serialization is cut at the start of the extranonce slot
//! to produce Stratum's `coinb1` and `coinb2`.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{check_extranonce_sizes, ConfigError};
use crate::error::{Error, ExtranonceKind, Result};
use crate::merkle::{compute_witness_commitment, witness_commitment_script, witness_merkle_root};
use crate::network::{
    COINBASE_TX_VERSION, MAX_COINBASE_SCRIPTSIG_SIZE, MIN_COINBASE_SCRIPTSIG_SIZE,
};
use crate::payout::{split_value, Payout};
use crate::transaction::{OutPoint, Transaction, TxIn, TxOut};

/// Widest script number accepted for the BIP34 height.
const MAX_HEIGHT_NUM_BYTES: usize = 4;

/// Coinbase witness item committed to alongside the witness root (BIP141).
const WITNESS_RESERVED_VALUE: [u8; 32] = [0u8; 32];

/// Where the segwit commitment script goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentPlacement {
    /// Replace the first payout output's script, keeping its value.
    #[default]
    OverwriteFirst,
    /// Append a separate zero-value commitment output.
    Append,
}

/// Builder for constructing coinbase transactions.
pub struct CoinbaseBuilder<'a> {
    /// The block height (required by BIP34).
    block_height: u64,
    /// Payout destinations, first one absorbs rounding.
    payouts: &'a [Payout],
    extranonce1_size: usize,
    extranonce2_size: usize,
    placement: CommitmentPlacement,
}

impl<'a> CoinbaseBuilder<'a> {
    /// Create a new coinbase builder with 4-byte extranonces.
    pub fn new(block_height: u64, payouts: &'a [Payout]) -> Self {
        CoinbaseBuilder {
            block_height,
            payouts,
            extranonce1_size: 4,
            extranonce2_size: 4,
            placement: CommitmentPlacement::default(),
        }
    }

    /// Set the extranonce slot sizes.
    pub fn with_extranonce_sizes(mut self, extranonce1: usize, extranonce2: usize) -> Self {
        self.extranonce1_size = extranonce1;
        self.extranonce2_size = extranonce2;
        self
    }

    /// Choose where the witness commitment goes.
    pub fn with_commitment_placement(mut self, placement: CommitmentPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Build the coinbase for a block containing `block_txs` after it.
    ///
    /// The extranonce slot is filled with zeros. The returned transaction
    /// already carries the witness commitment over `block_txs`.
    pub fn build(&self, total_reward: u64, block_txs: &[Transaction]) -> Result<Coinbase> {
        if self.payouts.is_empty() {
            return Err(ConfigError::NoPayouts.into());
        }
        check_extranonce_sizes(self.extranonce1_size, self.extranonce2_size)?;

        let height_script = encode_height_script(self.block_height)?;
        let extranonce_size = self.extranonce1_size + self.extranonce2_size;

        let mut script_sig = Vec::with_capacity(height_script.len() + extranonce_size);
        script_sig.extend_from_slice(&height_script);
        script_sig.resize(height_script.len() + extranonce_size, 0);
        debug_assert!(
            (MIN_COINBASE_SCRIPTSIG_SIZE..=MAX_COINBASE_SCRIPTSIG_SIZE).contains(&script_sig.len())
        );

        let outputs = split_value(self.payouts, total_reward)
            .into_iter()
            .zip(self.payouts)
            .map(|(value, payout)| TxOut {
                value,
                script_pubkey: payout.script_pubkey.clone(),
            })
            .collect();

        let mut tx = Transaction {
            version: COINBASE_TX_VERSION,
            inputs: vec![TxIn {
                previous_output: OutPoint::NULL,
                script_sig,
                sequence: 0xffff_ffff,
                witness: vec![WITNESS_RESERVED_VALUE.to_vec()],
            }],
            outputs,
            lock_time: 0,
        };

        // The coinbase's own wtxid counts as zero, so the commitment does
        // not depend on the coinbase bytes.
        let wtxids: Vec<[u8; 32]> = block_txs.iter().map(Transaction::wtxid).collect();
        let witness_root = witness_merkle_root(&wtxids);
        let commitment = compute_witness_commitment(&witness_root, &WITNESS_RESERVED_VALUE);
        let commitment_script = witness_commitment_script(&commitment);

        match self.placement {
            CommitmentPlacement::OverwriteFirst => {
                tx.outputs[0].script_pubkey = commitment_script;
            }
            CommitmentPlacement::Append => tx.outputs.push(TxOut {
                value: 0,
                script_pubkey: commitment_script,
            }),
        }

        trace!(
            height = self.block_height,
            outputs = tx.outputs.len(),
            commitment = %hex::encode(commitment),
            "Built coinbase"
        );

        Ok(Coinbase {
            tx,
            height_script,
            extranonce1_size: self.extranonce1_size,
            extranonce2_size: self.extranonce2_size,
        })
    }
}

/// A coinbase transaction with a zero-filled extranonce slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coinbase {
    /// The transaction, witness reserved value included.
    pub tx: Transaction,
    /// BIP34 height push at the start of the input script.
    pub height_script: Vec<u8>,
    pub extranonce1_size: usize,
    pub extranonce2_size: usize,
}

impl Coinbase {
    /// Split the legacy serialization around the extranonce slot.
    ///
    /// The serializer reports where the input script starts; the slot begins
    /// right after the height push and spans both extranonces.
    pub fn split(&self) -> CoinbaseSplit {
        let (bytes, script_offset) = self.tx.serialize_legacy_with_script_offset();
        let insertion = script_offset + self.height_script.len();
        let resume = insertion + self.extranonce1_size + self.extranonce2_size;

        CoinbaseSplit {
            coinb1: bytes[..insertion].to_vec(),
            coinb2: bytes[resume..].to_vec(),
        }
    }

    /// The coinbase with real extranonces in place of the zero slot.
    pub fn with_extranonce(&self, extranonce1: &[u8], extranonce2: &[u8]) -> Result<Transaction> {
        check_len(ExtranonceKind::Extranonce1, self.extranonce1_size, extranonce1)?;
        check_len(ExtranonceKind::Extranonce2, self.extranonce2_size, extranonce2)?;

        let mut tx = self.tx.clone();
        let script = &mut tx.inputs[0].script_sig;
        script.clear();
        script.extend_from_slice(&self.height_script);
        script.extend_from_slice(extranonce1);
        script.extend_from_slice(extranonce2);
        Ok(tx)
    }
}

fn check_len(kind: ExtranonceKind, expected: usize, value: &[u8]) -> Result<()> {
    if value.len() != expected {
        return Err(Error::ExtranonceLengthMismatch {
            kind,
            expected,
            got: value.len(),
        });
    }
    Ok(())
}

/// Stratum `coinb1`/`coinb2` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseSplit {
    /// Legacy coinbase bytes up to the extranonce slot.
    pub coinb1: Vec<u8>,
    /// Legacy coinbase bytes after the extranonce slot.
    pub coinb2: Vec<u8>,
}

impl CoinbaseSplit {
    /// `coinb1 || extranonce1 || extranonce2 || coinb2`, as a miner builds it.
    pub fn assemble(&self, extranonce1: &[u8], extranonce2: &[u8]) -> Vec<u8> {
        let mut tx = Vec::with_capacity(
            self.coinb1.len() + extranonce1.len() + extranonce2.len() + self.coinb2.len(),
        );
        tx.extend_from_slice(&self.coinb1);
        tx.extend_from_slice(extranonce1);
        tx.extend_from_slice(extranonce2);
        tx.extend_from_slice(&self.coinb2);
        tx
    }
}

/// BIP34 height push, as `CScript() << height` encodes it.
///
/// Heights 0..=16 use the single-byte OP_0/OP_1..OP_16 opcodes. Larger
/// heights push the minimal little-endian script number, with an extra zero
/// byte when the top bit would otherwise read as a sign.
pub fn encode_height_script(height: u64) -> Result<Vec<u8>> {
    match height {
        0 => return Ok(vec![0x00]),
        1..=16 => return Ok(vec![0x50 + height as u8]),
        _ => {}
    }

    let mut num = Vec::with_capacity(MAX_HEIGHT_NUM_BYTES + 1);
    let mut n = height;
    while n > 0 {
        num.push((n & 0xff) as u8);
        n >>= 8;
    }
    if num.last().is_some_and(|&last| last & 0x80 != 0) {
        num.push(0x00);
    }

    if num.len() > MAX_HEIGHT_NUM_BYTES {
        return Err(Error::UnsupportedHeightEncoding { height });
    }

    let mut script = Vec::with_capacity(num.len() + 1);
    script.push(num.len() as u8); // Push opcode
    script.extend_from_slice(&num);
    Ok(script)
}
