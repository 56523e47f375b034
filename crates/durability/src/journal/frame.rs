//! Journal entry framing.
//!
//! # Entry Layout
//!
//! ```text
//! ┌──────────────────────┬──────────────┬─────────────────────────┐
//! │ Length (3 bytes, BE) │ Type (1)     │ Payload (length - 1)    │
//! └──────────────────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! The length field counts every byte after itself: the type byte plus the
//! payload. A valid entry therefore always has `length >= 1`.

use arbor_core::{
    decode_length, encode_length, Error, JournalType, Result, ENTRY_HEADER_SIZE, LENGTH_FIELD_SIZE,
};

/// Decoded header of one framed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Bytes following the length field (type byte + payload)
    pub length: usize,
    /// Raw type byte; unassigned values are preserved for the caller
    pub journal_type: u8,
}

impl EntryHeader {
    /// Header for an entry with `payload_len` payload bytes.
    pub fn new(journal_type: JournalType, payload_len: usize) -> Self {
        EntryHeader {
            length: payload_len + 1,
            journal_type: journal_type.as_byte(),
        }
    }

    /// Decode the header at `offset`.
    ///
    /// Fails with `Truncated` if fewer than four bytes remain, if the length
    /// is zero, or if the framed region runs past the end of `buf`.
    pub fn decode(buf: &[u8], offset: usize) -> Result<Self> {
        let header = buf
            .get(offset..offset + ENTRY_HEADER_SIZE)
            .ok_or(Error::Truncated { offset })?;

        let length = decode_length([header[0], header[1], header[2]]);
        if length == 0 {
            return Err(Error::Truncated { offset });
        }
        if offset + LENGTH_FIELD_SIZE + length > buf.len() {
            return Err(Error::Truncated { offset });
        }

        Ok(EntryHeader {
            length,
            journal_type: header[3],
        })
    }

    /// Encode into the 4-byte on-wire header.
    pub fn encode(&self) -> Result<[u8; ENTRY_HEADER_SIZE]> {
        let len = encode_length(self.length).ok_or(Error::EntryTooLarge {
            size: self.framed_len(),
            max: arbor_core::MAX_FRAMED_ENTRY,
        })?;
        Ok([len[0], len[1], len[2], self.journal_type])
    }

    /// Total framed size: length field plus everything it covers.
    pub fn framed_len(&self) -> usize {
        LENGTH_FIELD_SIZE + self.length
    }

    /// Payload size (excludes the type byte).
    pub fn payload_len(&self) -> usize {
        self.length - 1
    }

    /// Typed journal type, if the byte is assigned.
    pub fn kind(&self) -> Option<JournalType> {
        JournalType::try_from(self.journal_type).ok()
    }
}

/// One framed entry borrowed from a journal buffer.
#[derive(Debug, Clone, Copy)]
pub struct FramedEntry<'a> {
    /// Offset of the length field within the buffer
    pub offset: usize,
    /// Decoded header
    pub header: EntryHeader,
    /// Payload bytes (after the type byte)
    pub payload: &'a [u8],
}

impl<'a> FramedEntry<'a> {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> usize {
        self.offset + ENTRY_HEADER_SIZE
    }

    /// Offset of the entry that follows this one.
    pub fn next_offset(&self) -> usize {
        self.offset + self.header.framed_len()
    }
}

/// Iterator over the framed entries of a buffer.
///
/// Yields `Err` once on the first framing error and then stops, since no
/// later offset can be trusted.
pub struct EntryIter<'a> {
    buf: &'a [u8],
    cursor: usize,
    failed: bool,
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = Result<FramedEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.buf.len() {
            return None;
        }
        match EntryHeader::decode(self.buf, self.cursor) {
            Ok(header) => {
                let start = self.cursor + ENTRY_HEADER_SIZE;
                let entry = FramedEntry {
                    offset: self.cursor,
                    header,
                    payload: &self.buf[start..start + header.payload_len()],
                };
                self.cursor = entry.next_offset();
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterate the framed entries in `buf`.
pub fn iter_entries(buf: &[u8]) -> EntryIter<'_> {
    EntryIter {
        buf,
        cursor: 0,
        failed: false,
    }
}
