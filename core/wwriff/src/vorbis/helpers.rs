//! Integer helpers defined by the Vorbis I specification.

/// Bits needed to represent `v`: `floor(log2(v)) + 1`, and 0 for 0.
#[inline]
pub fn ilog(v: u32) -> u8 {
    (u32::BITS - v.leading_zeros()) as u8
}

/// `v^dimensions`, saturating at `u64::MAX`.
fn saturating_pow(v: u32, dimensions: u32) -> u64 {
    (0..dimensions).fold(1u64, |acc, _| acc.saturating_mul(v as u64))
}

/// Number of values in a type 1 lookup table: the largest `v` with
/// `v^dimensions <= entries < (v + 1)^dimensions`.
pub fn book_map_type1_quantvals(entries: u32, dimensions: u32) -> u32 {
    if entries == 0 || dimensions == 0 {
        return 0;
    }

    // Starting estimate from the bit length of `entries`, then walk to the exact root.
    let shift = (ilog(entries) as u32 - 1) * (dimensions - 1) / dimensions;
    let mut v = entries >> shift;
    let entries = entries as u64;

    while saturating_pow(v, dimensions) > entries {
        v -= 1;
    }
    while saturating_pow(v + 1, dimensions) <= entries {
        v += 1;
    }
    v
}
