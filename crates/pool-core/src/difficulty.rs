//! Bitcoin difficulty target conversion and utilities.

/// Exponent of 2 in the difficulty-1 target `0xffff * 2^208`.
const DIFF1_SHIFT: i32 = 208;

/// Mantissa of the difficulty-1 target.
const DIFF1_MANTISSA: f64 = 65535.0;

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target. A set
/// sign bit, or a mantissa that would overflow 256 bits, yields zero.
/// Exponents 33 and 34 are fine while the mantissa's high bytes are empty.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;
    let mut target = [0u8; 32];

    let overflow = exponent > 34
        || (mantissa > 0xff && exponent > 33)
        || (mantissa > 0xffff && exponent > 32);
    if bits & 0x0080_0000 != 0 || overflow {
        return target;
    }

    if exponent <= 3 {
        // Mantissa shifted right; only its top `exponent` bytes survive.
        let value = mantissa >> (8 * (3 - exponent));
        target[28..].copy_from_slice(&value.to_be_bytes());
        return target;
    }

    // Least significant mantissa byte lands at index 34 - exponent; bytes
    // that would fall off the top are zero after the overflow check.
    let lowest = 34 - exponent as i32;
    for (i, byte) in mantissa.to_be_bytes()[1..].iter().enumerate() {
        let pos = lowest - 2 + i as i32;
        if (0..32).contains(&pos) {
            target[pos as usize] = *byte;
        }
    }

    target
}

/// Check if a hash meets the difficulty target.
///
/// Both values are 32-byte big-endian numbers; equal counts as meeting.
#[inline]
pub fn hash_meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    hash <= target
}

/// Network difficulty for compact `bits`: `(0xffff * 2^208) / target`.
///
/// With `target = mantissa * 2^(8 * (exponent - 3))` this is evaluated as
/// `(65535 / mantissa) * 2^(208 - 8 * (exponent - 3))`. The power-of-two
/// factor is exact in f64, so the only rounding is the one division. A zero
/// mantissa gives infinity.
pub fn bits_to_difficulty(bits: u32) -> f64 {
    let exponent = (bits >> 24) as i32;
    let mantissa = bits & 0x007f_ffff;

    if mantissa == 0 {
        return f64::INFINITY;
    }

    let shift = DIFF1_SHIFT - 8 * (exponent - 3);
    DIFF1_MANTISSA / mantissa as f64 * 2f64.powi(shift)
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    const UNITS: [(f64, &str); 5] = [
        (1e15, "P"),
        (1e12, "T"),
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "K"),
    ];

    for (scale, suffix) in UNITS {
        if difficulty >= scale {
            return format!("{:.2}{}", difficulty / scale, suffix);
        }
    }
    format!("{:.2}", difficulty)
}
