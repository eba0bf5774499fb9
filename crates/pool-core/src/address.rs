//! Payout address decoding into witness-program scriptPubKeys.
//!
//! Pool payouts are paid to native segwit outputs, so only Bech32 (witness
//! v0) and Bech32m (witness v1+) addresses are accepted:
//! - P2WPKH: `OP_0 <20 bytes>`
//! - P2WSH: `OP_0 <32 bytes>`
//! - P2TR: `OP_1 <32 bytes>`

use thiserror::Error;

use crate::network::Network;

/// Address decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Base58 or otherwise non-segwit address
    #[error("address {0} is not a segwit address")]
    NotSegwit(String),
    /// Invalid Bech32 encoding
    #[error("invalid bech32 encoding: {0}")]
    InvalidBech32(String),
    /// Invalid witness version
    #[error("invalid witness version: {0}")]
    InvalidWitnessVersion(u8),
    /// Invalid witness program length
    #[error("invalid witness program length {len} for version {version}")]
    InvalidWitnessProgramLength { version: u8, len: usize },
    /// Address network mismatch
    #[error("address network mismatch: expected {expected}, got hrp {hrp}")]
    NetworkMismatch { expected: Network, hrp: String },
}

/// A decoded segwit address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessAddress {
    pub witness_version: u8,
    pub program: Vec<u8>,
    /// The original address string.
    pub display: String,
}

impl WitnessAddress {
    /// Output script: `OP_n <program>`.
    pub fn script_pubkey(&self) -> Vec<u8> {
        // OP_0 = 0x00, OP_1..OP_16 = 0x51..0x60
        let version_opcode = match self.witness_version {
            0 => 0x00,
            v => 0x50 + v,
        };
        let mut script = Vec::with_capacity(2 + self.program.len());
        script.push(version_opcode);
        script.push(self.program.len() as u8);
        script.extend_from_slice(&self.program);
        script
    }
}

/// Decode a segwit address for the given network.
pub fn decode_address(address: &str, network: Network) -> Result<WitnessAddress, AddressError> {
    let trimmed = address.trim();
    let (hrp, data, variant) = bech32_decode(trimmed).map_err(|e| match e {
        // No separator or a bad charset almost always means base58.
        AddressError::InvalidBech32(_) if !trimmed.contains('1') || is_base58_like(trimmed) => {
            AddressError::NotSegwit(trimmed.to_string())
        }
        other => other,
    })?;

    if hrp != network.bech32_hrp() {
        return Err(AddressError::NetworkMismatch {
            expected: network,
            hrp,
        });
    }

    let (&witness_version, payload) = data
        .split_first()
        .ok_or_else(|| AddressError::InvalidBech32("empty data part".into()))?;
    if witness_version > 16 {
        return Err(AddressError::InvalidWitnessVersion(witness_version));
    }

    let expected_variant = if witness_version == 0 {
        Bech32Variant::Bech32
    } else {
        Bech32Variant::Bech32m
    };
    if variant != expected_variant {
        return Err(AddressError::InvalidBech32(format!(
            "witness v{} must use {:?}",
            witness_version, expected_variant
        )));
    }

    let program = convert_bits(payload, 5, 8)?;
    // v0: P2WPKH or P2WSH, v1: P2TR, v2+: reserved for future upgrades
    let len = program.len();
    let valid_len = match witness_version {
        0 => len == 20 || len == 32,
        1 => len == 32,
        _ => (2..=40).contains(&len),
    };
    if !valid_len {
        return Err(AddressError::InvalidWitnessProgramLength {
            version: witness_version,
            len,
        });
    }

    Ok(WitnessAddress {
        witness_version,
        program,
        display: trimmed.to_string(),
    })
}

fn is_base58_like(s: &str) -> bool {
    matches!(s.chars().next(), Some('1' | '3' | 'm' | 'n' | '2'))
        && !s.to_lowercase().starts_with("bc1")
}

// ============================================================================
// Bech32/Bech32m (BIP173, BIP350)
// ============================================================================

const BECH32_CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32_MAX_LEN: usize = 90;
const BECH32M_CONST: u32 = 0x2bc8_30a3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bech32Variant {
    Bech32,
    Bech32m,
}

fn bech32_decode(input: &str) -> Result<(String, Vec<u8>, Bech32Variant), AddressError> {
    if input.len() > BECH32_MAX_LEN {
        return Err(AddressError::InvalidBech32(format!(
            "{} characters, limit is {BECH32_MAX_LEN}",
            input.len()
        )));
    }
    let has_lower = input.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = input.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(AddressError::InvalidBech32("mixed case".into()));
    }
    let input = input.to_ascii_lowercase();

    let sep = input
        .rfind('1')
        .ok_or_else(|| AddressError::InvalidBech32("no separator".into()))?;
    if sep == 0 || sep + 7 > input.len() {
        return Err(AddressError::InvalidBech32("invalid separator position".into()));
    }
    let (hrp, rest) = input.split_at(sep);

    let mut data = Vec::with_capacity(rest.len() - 1);
    for c in rest[1..].bytes() {
        let value = BECH32_CHARSET
            .iter()
            .position(|&x| x == c)
            .ok_or_else(|| AddressError::InvalidBech32(format!("invalid character {:?}", c as char)))?;
        data.push(value as u8);
    }

    let mut values: Vec<u8> = hrp.bytes().map(|b| b >> 5).collect();
    values.push(0);
    values.extend(hrp.bytes().map(|b| b & 31));
    values.extend_from_slice(&data);

    let variant = match polymod(&values) {
        1 => Bech32Variant::Bech32,
        BECH32M_CONST => Bech32Variant::Bech32m,
        _ => return Err(AddressError::InvalidBech32("checksum mismatch".into())),
    };

    data.truncate(data.len() - 6);
    Ok((hrp.to_string(), data, variant))
}

fn polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];

    values.iter().fold(1u32, |chk, &value| {
        let top = chk >> 25;
        let mut chk = ((chk & 0x1ff_ffff) << 5) ^ value as u32;
        for (i, g) in GEN.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= g;
            }
        }
        chk
    })
}

/// Regroup 5-bit words into bytes, rejecting non-zero padding.
fn convert_bits(data: &[u8], from: u32, to: u32) -> Result<Vec<u8>, AddressError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize);

    for &value in data {
        acc = (acc << from) | value as u32;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max) as u8);
        }
    }

    if bits >= from || (acc << (to - bits)) & max != 0 {
        return Err(AddressError::InvalidBech32("invalid padding".into()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2wpkh_mainnet() {
        let address = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
        let decoded = decode_address(address, Network::Mainnet).unwrap();

        assert_eq!(decoded.witness_version, 0);
        assert_eq!(
            hex::encode(decoded.script_pubkey()),
            "0014e8df018c7e326cc253faac7e46cdc51e68542c42"
        );
    }

    #[test]
    fn test_p2wsh_mainnet() {
        let address = "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3";
        let decoded = decode_address(address, Network::Mainnet).unwrap();

        assert_eq!(decoded.program.len(), 32);
        assert_eq!(decoded.script_pubkey().len(), 34);
        assert_eq!(decoded.script_pubkey()[..2], [0x00, 0x20]);
    }

    #[test]
    fn test_p2tr_mainnet() {
        let address = "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr";
        let decoded = decode_address(address, Network::Mainnet).unwrap();

        assert_eq!(decoded.witness_version, 1);
        assert_eq!(decoded.script_pubkey()[..2], [0x51, 0x20]);
    }

    #[test]
    fn test_testnet_and_regtest() {
        let tb = decode_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx", Network::Testnet);
        assert_eq!(tb.unwrap().program.len(), 20);

        let rt = decode_address("bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080", Network::Regtest);
        assert_eq!(
            hex::encode(rt.unwrap().script_pubkey()),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_uppercase_accepted() {
        let address = "BC1QAR0SRRR7XFKVY5L643LYDNW9RE59GTZZWF5MDQ";
        assert!(decode_address(address, Network::Mainnet).is_ok());
    }

    #[test]
    fn test_network_mismatch() {
        let result = decode_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", Network::Testnet);
        assert!(matches!(result, Err(AddressError::NetworkMismatch { .. })));
    }

    #[test]
    fn test_base58_rejected() {
        let result = decode_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", Network::Mainnet);
        assert!(matches!(result, Err(AddressError::NotSegwit(_))));

        let result = decode_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy", Network::Mainnet);
        assert!(matches!(result, Err(AddressError::NotSegwit(_))));
    }

    #[test]
    fn test_over_length_rejected() {
        let address = format!("bc1q{}", "q".repeat(87));
        assert_eq!(address.len(), 91);
        assert!(matches!(
            decode_address(&address, Network::Mainnet),
            Err(AddressError::InvalidBech32(msg)) if msg.starts_with("91 characters")
        ));
    }

    #[test]
    fn test_bad_checksum() {
        let result = decode_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdr", Network::Mainnet);
        assert!(matches!(result, Err(AddressError::InvalidBech32(_))));
    }
}
