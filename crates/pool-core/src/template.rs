//! Block template input as returned by a node's `getblocktemplate`.
//!
//! Only the fields the job needs are modelled; anything else in the node's
//! response (`txid`, `hash`, `fee`, `curtime`, ...) is ignored. Transaction
//! ids are recomputed from the raw bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::DecodeError;
use crate::hash::reverse_bytes;
use crate::transaction::Transaction;

/// Errors decoding template fields into consensus types.
#[derive(Debug, Error)]
pub enum TemplateDecodeError {
    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{field} must be {expected} bytes, got {got}")]
    Length {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("transaction {index}: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("transaction {index} is a coinbase; templates must not include one")]
    UnexpectedCoinbase { index: usize },
}

/// Raw block template (external input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    /// Previous block hash, display (big-endian) hex.
    pub previousblockhash: String,
    pub version: i32,
    /// Compact target as hex, e.g. `"170d2f10"`.
    pub bits: String,
    pub height: u64,
    /// Subsidy plus fees, in satoshis.
    pub coinbasevalue: u64,
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
}

/// One non-coinbase transaction from the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTransaction {
    /// Signed transaction bytes, hex (witness form when applicable).
    pub data: String,
}

/// Template fields decoded into consensus types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTemplate {
    /// Previous block hash, internal (little-endian) byte order.
    pub prev_hash: [u8; 32],
    pub version: i32,
    pub bits: u32,
    pub height: u64,
    pub coinbase_value: u64,
    pub transactions: Vec<Transaction>,
}

impl BlockTemplate {
    /// Parse a template from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Decode all hex fields. Fails on the first malformed field.
    pub fn decode(&self) -> Result<DecodedTemplate, TemplateDecodeError> {
        let prev_display: [u8; 32] = decode_fixed("previousblockhash", &self.previousblockhash)?;
        let bits = u32::from_be_bytes(decode_fixed("bits", &self.bits)?);

        let transactions = self
            .transactions
            .iter()
            .enumerate()
            .map(|(index, tx)| {
                let raw = hex::decode(&tx.data).map_err(|source| TemplateDecodeError::Hex {
                    field: "transactions[].data",
                    source,
                })?;
                let decoded = Transaction::from_bytes(&raw)
                    .map_err(|source| TemplateDecodeError::Transaction { index, source })?;
                if decoded.is_coinbase() {
                    return Err(TemplateDecodeError::UnexpectedCoinbase { index });
                }
                Ok(decoded)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DecodedTemplate {
            prev_hash: reverse_bytes(&prev_display),
            version: self.version,
            bits,
            height: self.height,
            coinbase_value: self.coinbasevalue,
            transactions,
        })
    }
}

fn decode_fixed<const N: usize>(
    field: &'static str,
    hex_str: &str,
) -> Result<[u8; N], TemplateDecodeError> {
    let bytes = hex::decode(hex_str).map_err(|source| TemplateDecodeError::Hex { field, source })?;
    let got = bytes.len();
    bytes.try_into().map_err(|_| TemplateDecodeError::Length {
        field,
        expected: N,
        got,
    })
}
