//! Bitcoin network definitions and constants.

use serde::{Deserialize, Serialize};

/// Bitcoin network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet
    #[default]
    #[serde(alias = "main", alias = "bitcoin")]
    Mainnet,
    /// Bitcoin testnet (testnet3 and testnet4 share address encoding)
    #[serde(alias = "test", alias = "testnet3", alias = "testnet4")]
    Testnet,
    /// Bitcoin signet
    Signet,
    /// Local regression test network
    Regtest,
}

impl Network {
    /// Get the Bech32 human-readable part for this network.
    pub fn bech32_hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet | Network::Signet => "tb",
            Network::Regtest => "bcrt",
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Version of the coinbase transaction built for every job.
pub const COINBASE_TX_VERSION: i32 = 2;

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Maximum size of coinbase scriptSig.
pub const MAX_COINBASE_SCRIPTSIG_SIZE: usize = 100;

/// Minimum size of coinbase scriptSig.
pub const MIN_COINBASE_SCRIPTSIG_SIZE: usize = 2;
