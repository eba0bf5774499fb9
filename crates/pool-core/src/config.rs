//! Pool configuration.
//!
//! The raw [`PoolConfig`] is what the operator writes; [`PoolConfig::validate`]
//! turns it into [`JobSettings`] with every payout address resolved to its
//! output script, so job construction never sees an unchecked address.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::address::AddressError;
use crate::coinbase::CommitmentPlacement;
use crate::network::{Network, MAX_COINBASE_SCRIPTSIG_SIZE};
use crate::payout::{Payout, PayoutAddress};

/// Bytes reserved in the coinbase script for both extranonces.
///
/// The height push takes at most 5 bytes and pools leave headroom for a
/// tag, so the slot is capped well below the 100-byte script limit.
pub const MAX_EXTRANONCE_TOTAL: usize = 32;

const _: () = assert!(MAX_EXTRANONCE_TOTAL + 5 <= MAX_COINBASE_SCRIPTSIG_SIZE);

/// Tolerance when checking that percentages add up to 100.
const PERCENT_EPSILON: f64 = 1e-9;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("at least one payout address is required")]
    NoPayouts,

    #[error("payout {index} has invalid percent {percent}")]
    InvalidPercent { index: usize, percent: f64 },

    #[error("payouts after the first claim {total}%, more than 100%")]
    PayoutsExceedTotal { total: f64 },

    #[error("payout address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error(
        "extranonce sizes {extranonce1}+{extranonce2} invalid: each must be at least 1 \
         and together at most {max}"
    )]
    ExtranonceSize {
        extranonce1: usize,
        extranonce2: usize,
        max: usize,
    },
}

/// Pool configuration as loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    #[serde(default)]
    pub network: Network,
    /// Payout destinations. The first one absorbs rounding residue.
    pub payouts: Vec<PayoutAddress>,
    #[serde(default = "default_extranonce_size")]
    pub extranonce1_size: usize,
    #[serde(default = "default_extranonce_size")]
    pub extranonce2_size: usize,
    #[serde(default)]
    pub commitment_placement: CommitmentPlacement,
}

fn default_extranonce_size() -> usize {
    4
}

/// Each extranonce needs at least one byte and both together must fit
/// [`MAX_EXTRANONCE_TOTAL`].
pub(crate) fn check_extranonce_sizes(
    extranonce1: usize,
    extranonce2: usize,
) -> Result<(), ConfigError> {
    if extranonce1 == 0 || extranonce2 == 0 || extranonce1 + extranonce2 > MAX_EXTRANONCE_TOTAL {
        return Err(ConfigError::ExtranonceSize {
            extranonce1,
            extranonce2,
            max: MAX_EXTRANONCE_TOTAL,
        });
    }
    Ok(())
}

/// Validated settings consumed by the job builder.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSettings {
    pub network: Network,
    pub payouts: Vec<Payout>,
    pub extranonce1_size: usize,
    pub extranonce2_size: usize,
    pub commitment_placement: CommitmentPlacement,
}

impl PoolConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check the configuration and resolve payout addresses.
    ///
    /// Percentages that do not add up to 100 are accepted with a warning;
    /// the first payout takes whatever the others leave.
    pub fn validate(&self) -> Result<JobSettings, ConfigError> {
        if self.payouts.is_empty() {
            return Err(ConfigError::NoPayouts);
        }

        for (index, entry) in self.payouts.iter().enumerate() {
            if !entry.percent.is_finite() || !(0.0..=100.0).contains(&entry.percent) {
                return Err(ConfigError::InvalidPercent {
                    index,
                    percent: entry.percent,
                });
            }
        }

        let rest: f64 = self.payouts[1..].iter().map(|p| p.percent).sum();
        if rest > 100.0 + PERCENT_EPSILON {
            return Err(ConfigError::PayoutsExceedTotal { total: rest });
        }

        let total = rest + self.payouts[0].percent;
        if (total - 100.0).abs() > PERCENT_EPSILON {
            warn!(
                total,
                first = %self.payouts[0].address,
                "Payout percentages do not sum to 100; first address absorbs the difference"
            );
        }

        let (en1, en2) = (self.extranonce1_size, self.extranonce2_size);
        check_extranonce_sizes(en1, en2)?;

        let payouts = self
            .payouts
            .iter()
            .map(|entry| {
                Payout::resolve(entry, self.network).map_err(|source| ConfigError::Address {
                    address: entry.address.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JobSettings {
            network: self.network,
            payouts,
            extranonce1_size: en1,
            extranonce2_size: en2,
            commitment_placement: self.commitment_placement,
        })
    }
}
