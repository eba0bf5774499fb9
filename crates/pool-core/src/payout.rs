//! Percentage split of the coinbase value across payout addresses.

use serde::{Deserialize, Serialize};

use crate::address::{decode_address, AddressError};
use crate::network::Network;

/// A configured payout destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutAddress {
    pub address: String,
    pub percent: f64,
}

/// A payout resolved to its output script.
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub address: String,
    pub percent: f64,
    pub script_pubkey: Vec<u8>,
}

impl Payout {
    /// Resolve a configured address for `network`.
    pub fn resolve(entry: &PayoutAddress, network: Network) -> Result<Self, AddressError> {
        let decoded = decode_address(&entry.address, network)?;
        Ok(Payout {
            address: decoded.display.clone(),
            percent: entry.percent,
            script_pubkey: decoded.script_pubkey(),
        })
    }
}

/// Amount for one payout: `floor(percent / 100 * total)`.
fn share_of(total: u64, percent: f64) -> u64 {
    (percent / 100.0 * total as f64).floor() as u64
}

/// Split `total` across `payouts`, returning one value per payout in order.
///
/// Every payout after the first gets its floored percentage share. The
/// first payout gets whatever is left, so truncation residue and any
/// percentage shortfall land there and the values always sum to `total`.
pub fn split_value(payouts: &[Payout], total: u64) -> Vec<u64> {
    let Some((_, rest)) = payouts.split_first() else {
        return Vec::new();
    };

    let mut remaining = total;
    let mut values = Vec::with_capacity(payouts.len());
    values.push(0);
    for payout in rest {
        let value = share_of(total, payout.percent).min(remaining);
        remaining -= value;
        values.push(value);
    }
    values[0] = remaining;
    values
}
