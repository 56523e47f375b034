//! Framing limits for journal entries
//!
//! The length field of a framed entry is 3 bytes, which caps the framed body
//! at `0xFF_FFFF` bytes. The default maximum entry size is far below that and
//! can be lowered per journal.

/// Bytes occupied by the big-endian length field
pub const LENGTH_FIELD_SIZE: usize = 3;

/// Bytes occupied by the length field plus the type byte
pub const ENTRY_HEADER_SIZE: usize = LENGTH_FIELD_SIZE + 1;

/// Largest value the 3-byte length field can hold
pub const MAX_LENGTH_FIELD: usize = 0xFF_FFFF;

/// Largest framed entry the wire format can represent
pub const MAX_FRAMED_ENTRY: usize = MAX_LENGTH_FIELD + LENGTH_FIELD_SIZE;

/// Default maximum framed entry size (16 KiB)
pub const DEFAULT_MAX_ENTRY_SIZE: usize = 16 * 1024;

/// Default journal buffer capacity (4 MiB)
pub const DEFAULT_JOURNAL_CAPACITY: usize = 4 * 1024 * 1024;

/// Encode a body length into the 3-byte big-endian length field
///
/// Returns `None` when the length does not fit in 24 bits.
pub fn encode_length(len: usize) -> Option<[u8; LENGTH_FIELD_SIZE]> {
    if len > MAX_LENGTH_FIELD {
        return None;
    }
    let bytes = (len as u32).to_be_bytes();
    Some([bytes[1], bytes[2], bytes[3]])
}

/// Decode the 3-byte big-endian length field
pub fn decode_length(bytes: [u8; LENGTH_FIELD_SIZE]) -> usize {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) as usize
}
