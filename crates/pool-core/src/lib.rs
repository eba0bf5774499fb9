//! Core job construction for the scratch-off solo pool.
//!
//! This crate provides pure Rust implementations of:
//! - Segwit payout address decoding (P2WPKH, P2WSH, P2TR)
//! - Coinbase transaction building with BIP34 heights and BIP141 commitments
//! - Stratum `mining.notify` job assembly with `coinb1`/`coinb2` splitting
//! - Candidate block reconstruction from submitted shares
//! - Difficulty target conversion and comparison
//!
//! Everything is synchronous and deterministic; logging goes through
//! `tracing` and the crate never installs a subscriber.

pub mod address;
pub mod block;
pub mod coinbase;
pub mod config;
pub mod difficulty;
pub mod encode;
pub mod error;
pub mod hash;
pub mod job;
pub mod merkle;
pub mod network;
pub mod payout;
pub mod share;
pub mod template;
pub mod transaction;

pub use address::{decode_address, AddressError, WitnessAddress};
pub use block::{Block, BlockHeader};
pub use coinbase::{Coinbase, CoinbaseBuilder, CoinbaseSplit, CommitmentPlacement};
pub use config::{ConfigError, JobSettings, PoolConfig};
pub use difficulty::{bits_to_difficulty, bits_to_target, hash_meets_target};
pub use error::{Error, ExtranonceKind, Result};
pub use hash::{double_sha256, hash_to_display_hex};
pub use job::{JobBuilder, JobIdSequence, MiningJob, Notification};
pub use merkle::{compute_merkle_root, merkle_branch, merkle_root_from_branch};
pub use network::Network;
pub use payout::{split_value, Payout, PayoutAddress};
pub use share::{CandidateBlock, ShareSubmission};
pub use template::{BlockTemplate, DecodedTemplate, TemplateDecodeError, TemplateTransaction};
pub use transaction::{OutPoint, Transaction, TxIn, TxOut};
