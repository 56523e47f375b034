//! Unsigned LEB128 varints
//!
//! Locator keys are written as varints so that the common case (small
//! positional indexes) costs one byte.

use arbor_core::{Error, Result};

/// Maximum encoded length of a `u64` varint
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `out` as an unsigned LEB128 varint
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes `encode_varint` writes for `value`
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Decode a varint from the front of `bytes`
///
/// Returns the value and the number of bytes consumed. `offset` is only used
/// to report where a short read happened.
pub fn decode_varint(bytes: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        let chunk = (byte & 0x7f) as u64;
        if i == MAX_VARINT_LEN - 1 && chunk > 1 {
            return Err(Error::serialization("varint overflows u64"));
        }
        value |= chunk << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() >= MAX_VARINT_LEN {
        return Err(Error::serialization("varint longer than 10 bytes"));
    }
    Err(Error::Truncated {
        offset: offset + bytes.len(),
    })
}
