//! Bitcoin transaction model with consensus serialization.
//!
//! Two encodings matter for mining:
//! - the legacy form (no marker, flag or witness), hashed into the txid and
//!   therefore into the header merkle root;
//! - the witness form (BIP144), hashed into the wtxid and used when the
//!   block is serialized for submission.

use crate::encode::{encode_bytes, encode_varint, DecodeError, Reader};
use crate::hash::double_sha256;

/// Reference to a previous transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    /// Txid in internal byte order.
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// The outpoint every coinbase input spends.
    pub const NULL: OutPoint = OutPoint {
        txid: [0u8; 32],
        vout: 0xffff_ffff,
    };

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Witness stack; empty for non-segwit inputs.
    pub witness: Vec<Vec<u8>>,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A Bitcoin transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// True when any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// True for a single-input transaction spending the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Legacy serialization (used for the txid).
    pub fn serialize_legacy(&self) -> Vec<u8> {
        self.encode(false).0
    }

    /// Legacy serialization plus the byte offset at which the first input's
    /// script begins.
    ///
    /// The coinbase split uses this offset to locate the extranonce slot
    /// without searching the serialized bytes.
    pub fn serialize_legacy_with_script_offset(&self) -> (Vec<u8>, usize) {
        self.encode(false)
    }

    /// Network serialization: witness form when any witness is present,
    /// legacy form otherwise.
    pub fn serialize(&self) -> Vec<u8> {
        self.encode(self.has_witness()).0
    }

    /// Transaction id, internal byte order.
    pub fn txid(&self) -> [u8; 32] {
        double_sha256(&self.serialize_legacy())
    }

    /// Witness transaction id, internal byte order.
    ///
    /// Equal to the txid for transactions without witness data. Note that
    /// the witness merkle tree substitutes zero for the coinbase's wtxid;
    /// that rule lives in [`crate::merkle::witness_merkle_root`].
    pub fn wtxid(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    fn encode(&self, with_witness: bool) -> (Vec<u8>, usize) {
        let mut out = Vec::with_capacity(256);
        let mut script_offset = 0;

        out.extend_from_slice(&self.version.to_le_bytes());
        if with_witness {
            out.push(0x00); // Marker
            out.push(0x01); // Flag
        }

        encode_varint(self.inputs.len() as u64, &mut out);
        for (i, input) in self.inputs.iter().enumerate() {
            out.extend_from_slice(&input.previous_output.txid);
            out.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            encode_varint(input.script_sig.len() as u64, &mut out);
            if i == 0 {
                script_offset = out.len();
            }
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        encode_varint(self.outputs.len() as u64, &mut out);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            encode_bytes(&output.script_pubkey, &mut out);
        }

        if with_witness {
            for input in &self.inputs {
                encode_varint(input.witness.len() as u64, &mut out);
                for item in &input.witness {
                    encode_bytes(item, &mut out);
                }
            }
        }

        out.extend_from_slice(&self.lock_time.to_le_bytes());
        (out, script_offset)
    }

    /// Decode a transaction in either legacy or witness form.
    ///
    /// The whole slice must be consumed.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let tx = Self::decode(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }
        Ok(tx)
    }

    /// Decode one transaction from the reader.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = reader.read_u32_le()? as i32;

        // A zero input count is impossible, so 0x00 here is the segwit marker.
        let segwit = reader.peek_u8()? == 0x00;
        if segwit {
            reader.read_u8()?;
            let flag = reader.read_u8()?;
            if flag != 0x01 {
                return Err(DecodeError::UnsupportedSegwitFlag(flag));
            }
        }

        let input_count = reader.read_varint()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let txid = reader.read_array::<32>()?;
            let vout = reader.read_u32_le()?;
            let script_sig = reader.read_bytes()?;
            let sequence = reader.read_u32_le()?;
            inputs.push(TxIn {
                previous_output: OutPoint { txid, vout },
                script_sig,
                sequence,
                witness: Vec::new(),
            });
        }

        let output_count = reader.read_varint()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = reader.read_u64_le()?;
            let script_pubkey = reader.read_bytes()?;
            outputs.push(TxOut { value, script_pubkey });
        }

        if segwit {
            for input in inputs.iter_mut() {
                let items = reader.read_varint()?;
                for _ in 0..items {
                    input.witness.push(reader.read_bytes()?);
                }
            }
            if inputs.iter().all(|input| input.witness.is_empty()) {
                return Err(DecodeError::EmptyWitness);
            }
        }

        let lock_time = reader.read_u32_le()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }
}
