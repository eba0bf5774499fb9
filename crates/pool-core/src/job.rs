//! Mining job assembly.
//!
//! A [`MiningJob`] is built once from a block template and never changes
//! afterwards. It carries both the Stratum view of the work (`coinb1`,
//! `coinb2`, merkle branch) and a block skeleton with a zero-filled
//! extranonce slot, which `MiningJob::candidate` clones when a share comes
//! back.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::block::{current_timestamp, Block, BlockHeader};
use crate::coinbase::{Coinbase, CoinbaseBuilder};
use crate::config::JobSettings;
use crate::difficulty::{bits_to_difficulty, bits_to_target, format_difficulty};
use crate::error::Result;
use crate::hash::word_swap;
use crate::merkle::{compute_merkle_root, merkle_branch};
use crate::template::BlockTemplate;
use crate::transaction::Transaction;

/// Builds a [`MiningJob`] from validated settings and a block template.
pub struct JobBuilder<'a> {
    settings: &'a JobSettings,
    template: &'a BlockTemplate,
    job_id: String,
    clean_jobs: bool,
    timestamp: Option<u32>,
}

impl<'a> JobBuilder<'a> {
    pub fn new(settings: &'a JobSettings, template: &'a BlockTemplate) -> Self {
        JobBuilder {
            settings,
            template,
            job_id: "0".to_string(),
            clean_jobs: true,
            timestamp: None,
        }
    }

    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    pub fn clean_jobs(mut self, clean_jobs: bool) -> Self {
        self.clean_jobs = clean_jobs;
        self
    }

    /// Header timestamp. Defaults to the current time.
    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Assemble the job. Nothing is built if any step fails.
    pub fn build(self) -> Result<MiningJob> {
        let template = self.template.decode()?;
        let settings = self.settings;

        let coinbase = CoinbaseBuilder::new(template.height, &settings.payouts)
            .with_extranonce_sizes(settings.extranonce1_size, settings.extranonce2_size)
            .with_commitment_placement(settings.commitment_placement)
            .build(template.coinbase_value, &template.transactions)?;
        let split = coinbase.split();

        let mut txids = Vec::with_capacity(template.transactions.len() + 1);
        txids.push(coinbase.tx.txid());
        txids.extend(template.transactions.iter().map(Transaction::txid));

        let branch = merkle_branch(&txids);
        let header = BlockHeader {
            version: template.version,
            prev_block_hash: template.prev_hash,
            merkle_root: compute_merkle_root(&txids),
            timestamp: self.timestamp.unwrap_or_else(current_timestamp),
            bits: template.bits,
            nonce: 0,
        };

        let mut transactions = Vec::with_capacity(txids.len());
        transactions.push(coinbase.tx.clone());
        transactions.extend(template.transactions);

        let difficulty = bits_to_difficulty(template.bits);

        debug!(
            job_id = %self.job_id,
            height = template.height,
            transactions = transactions.len(),
            branch = branch.len(),
            difficulty = %format_difficulty(difficulty),
            "Built mining job"
        );

        Ok(MiningJob {
            job_id: self.job_id,
            height: template.height,
            merkle_branch: branch,
            coinb1: split.coinb1,
            coinb2: split.coinb2,
            difficulty,
            clean_jobs: self.clean_jobs,
            coinbase,
            block: Block {
                header,
                transactions,
            },
        })
    }
}

/// Work handed to miners, plus what is needed to rebuild their blocks.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub(crate) job_id: String,
    pub(crate) height: u64,
    /// Sibling hashes for the coinbase, leaf to root.
    pub(crate) merkle_branch: Vec<[u8; 32]>,
    pub(crate) coinb1: Vec<u8>,
    pub(crate) coinb2: Vec<u8>,
    pub(crate) difficulty: f64,
    pub(crate) clean_jobs: bool,
    /// Coinbase with a zero extranonce slot.
    pub(crate) coinbase: Coinbase,
    /// Block skeleton: header with nonce 0, coinbase first.
    pub(crate) block: Block,
}

impl MiningJob {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Previous block hash, internal byte order.
    pub fn prev_hash(&self) -> [u8; 32] {
        self.block.header.prev_block_hash
    }

    pub fn version(&self) -> i32 {
        self.block.header.version
    }

    pub fn bits(&self) -> u32 {
        self.block.header.bits
    }

    pub fn timestamp(&self) -> u32 {
        self.block.header.timestamp
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn merkle_branch(&self) -> &[[u8; 32]] {
        &self.merkle_branch
    }

    pub fn coinb1(&self) -> &[u8] {
        &self.coinb1
    }

    pub fn coinb2(&self) -> &[u8] {
        &self.coinb2
    }

    /// Network difficulty implied by `bits`.
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn target(&self) -> [u8; 32] {
        bits_to_target(self.bits())
    }

    pub fn clean_jobs(&self) -> bool {
        self.clean_jobs
    }

    pub fn extranonce1_size(&self) -> usize {
        self.coinbase.extranonce1_size
    }

    pub fn extranonce2_size(&self) -> usize {
        self.coinbase.extranonce2_size
    }

    /// The block skeleton the job was built around.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Whether miners should drop older work when this job arrives.
    ///
    /// True for the first job and whenever the chain tip moved.
    pub fn should_clean(&self, previous: Option<&MiningJob>) -> bool {
        previous.map_or(true, |prev| prev.prev_hash() != self.prev_hash())
    }

    /// `mining.notify` params:
    ///
    /// ```text
    /// [job_id, prevhash, coinb1, coinb2, [branch...], version, nbits, ntime, clean_jobs]
    /// ```
    ///
    /// `prevhash` is the internal byte order with each 4-byte word reversed.
    /// `version` and `ntime` are unpadded hex, `nbits` is 8 hex digits.
    pub fn notify_params(&self) -> Vec<Value> {
        let branch: Vec<Value> = self
            .merkle_branch
            .iter()
            .map(|node| Value::String(hex::encode(node)))
            .collect();

        vec![
            json!(self.job_id),
            json!(hex::encode(word_swap(&self.prev_hash()))),
            json!(hex::encode(&self.coinb1)),
            json!(hex::encode(&self.coinb2)),
            Value::Array(branch),
            json!(format!("{:x}", self.version() as u32)),
            json!(format!("{:08x}", self.bits())),
            json!(format!("{:x}", self.timestamp())),
            json!(self.clean_jobs),
        ]
    }

    /// The full `mining.notify` message.
    pub fn notify(&self) -> Notification {
        Notification {
            id: None,
            method: "mining.notify",
            params: self.notify_params(),
        }
    }
}

/// A Stratum server-to-client notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Option<u64>,
    pub method: &'static str,
    pub params: Vec<Value>,
}

/// Hex job ids from a shared counter.
#[derive(Debug, Default)]
pub struct JobIdSequence {
    next: AtomicU64,
}

impl JobIdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting at `first`.
    pub fn starting_at(first: u64) -> Self {
        JobIdSequence {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> String {
        format!("{:x}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}
