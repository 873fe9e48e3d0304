//! HPACK prefix integers (RFC 7541 Section 5.1)
//!
//! An integer starts in the low `prefix_bits` bits of one octet; values that
//! do not fit continue in little-endian base-128 octets with a continuation
//! bit. Decoding bounds the accumulated magnitude: the RFC places no limit,
//! which lets a peer stream continuation octets forever, so anything that
//! would exceed 32 bits is rejected outright.

use crate::error::{Error, Result};

/// Upper bound on decoded integers. Nothing in the protocol needs more than
/// 32 bits (indices, string lengths, table sizes are all u32-ranged).
pub const MAX_INTEGER: u64 = u32::MAX as u64;

/// Decode a prefix integer from `src`.
///
/// Returns `(value, octets_consumed)`. Fails on truncated input or a value
/// exceeding [`MAX_INTEGER`].
pub fn decode(src: &[u8], prefix_bits: u8) -> Result<(u64, usize)> {
    debug_assert!((1..=8).contains(&prefix_bits));

    let first = *src
        .first()
        .ok_or_else(|| Error::compression("integer truncated at first octet"))?;
    let mask: u8 = ((1u16 << prefix_bits) - 1) as u8;
    let stub = first & mask;

    if stub < mask {
        return Ok((stub as u64, 1));
    }

    // Continuation form: prefix saturated, remainder in base-128 octets.
    let mut value = mask as u64;
    let mut shift = 0u32;
    for (i, &octet) in src[1..].iter().enumerate() {
        value += ((octet & 0x7F) as u64) << shift;
        if value > MAX_INTEGER {
            return Err(Error::compression("integer exceeds 32-bit bound"));
        }
        if octet & 0x80 == 0 {
            return Ok((value, i + 2));
        }
        shift += 7;
        // 5 continuation octets already cover 35 bits; a sixth can only
        // overflow or pad, both of which we refuse.
        if shift > 35 {
            return Err(Error::compression("integer continuation too long"));
        }
    }

    Err(Error::compression("integer truncated mid-continuation"))
}

/// Encode `value` with the given prefix width, OR-ing the first octet into
/// `first_octet_bits` (the representation's pattern bits).
pub fn encode(value: u64, prefix_bits: u8, first_octet_bits: u8, dst: &mut Vec<u8>) {
    debug_assert!((1..=8).contains(&prefix_bits));
    let mask: u64 = (1u64 << prefix_bits) - 1;

    if value < mask {
        dst.push(first_octet_bits | value as u8);
        return;
    }

    dst.push(first_octet_bits | mask as u8);
    let mut rest = value - mask;
    while rest >= 0x80 {
        dst.push((rest & 0x7F) as u8 | 0x80);
        rest >>= 7;
    }
    dst.push(rest as u8);
}
