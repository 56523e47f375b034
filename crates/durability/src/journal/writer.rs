//! Per-entry journal writer.
//!
//! A `JournalWriter` holds one entry while it is being built: three reserved
//! length bytes, the type byte, then whatever the caller appends. The length
//! is patched in by [`JournalWriter::frame`] once the payload is complete.
//!
//! Writers draw their backing buffer from a thread-local scratch slot and
//! hand it back on drop, so steady-state journaling does not allocate.

use arbor_codec::{ByteWriter, Formatter, ValueFormatter};
use arbor_core::{
    encode_length, Error, JournalRecord, JournalType, Result, ENTRY_HEADER_SIZE,
    LENGTH_FIELD_SIZE, MAX_FRAMED_ENTRY,
};
use serde::Serialize;
use std::cell::RefCell;
use std::mem;

/// Scratch buffers larger than this are dropped instead of recycled.
const MAX_RECYCLED_CAPACITY: usize = 64 * 1024;

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

fn take_scratch() -> Vec<u8> {
    SCRATCH
        .try_with(|slot| {
            slot.try_borrow_mut()
                .map(|mut buf| mem::take(&mut *buf))
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

fn recycle_scratch(buf: Vec<u8>) {
    if buf.capacity() > MAX_RECYCLED_CAPACITY {
        return;
    }
    let _ = SCRATCH.try_with(|slot| {
        if let Ok(mut current) = slot.try_borrow_mut() {
            if current.capacity() < buf.capacity() {
                *current = buf;
            }
        }
    });
}

/// Writer for a single framed journal entry
#[derive(Debug)]
pub struct JournalWriter {
    buf: ByteWriter,
    journal_type: JournalType,
}

impl JournalWriter {
    /// Start an entry of `journal_type`.
    pub fn begin(journal_type: JournalType) -> Self {
        let mut buf = ByteWriter::from_vec(take_scratch());
        buf.reserve(LENGTH_FIELD_SIZE);
        buf.write_u8(journal_type.as_byte());
        JournalWriter { buf, journal_type }
    }

    /// Type of the entry being written
    pub fn journal_type(&self) -> JournalType {
        self.journal_type
    }

    /// Write a single record marker byte
    pub fn write_marker(&mut self, marker: JournalRecord) {
        self.buf.write_u8(marker.as_byte());
    }

    /// Write a `Key` segment
    pub fn write_key(&mut self, key: u32) {
        self.write_marker(JournalRecord::Key);
        self.buf.write_varint(u64::from(key));
    }

    /// Write a `Locator` segment carrying length-prefixed addressing bytes
    pub fn write_locator(&mut self, address: &[u8]) {
        self.write_marker(JournalRecord::Locator);
        self.buf.write_len_prefixed(address);
    }

    /// Encode `value` with `formatter`
    pub fn write_value<T: Serialize + ?Sized>(
        &mut self,
        formatter: &Formatter,
        value: &T,
    ) -> Result<()> {
        formatter.encode(value, &mut self.buf)
    }

    /// Write a raw byte
    pub fn write_u8(&mut self, value: u8) {
        self.buf.write_u8(value);
    }

    /// Write an unsigned LEB128 varint
    pub fn write_varint(&mut self, value: u64) {
        self.buf.write_varint(value);
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.write_bytes(bytes);
    }

    /// Underlying byte writer, for custom payload encodings
    pub fn writer_mut(&mut self) -> &mut ByteWriter {
        &mut self.buf
    }

    /// Payload written so far (excludes the header)
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[ENTRY_HEADER_SIZE..]
    }

    /// Size of the entry once framed
    pub fn framed_len(&self) -> usize {
        self.buf.len()
    }

    /// Patch the length field and return the complete framed entry.
    ///
    /// The length counts every byte after the length field itself.
    pub fn frame(&mut self) -> Result<&[u8]> {
        let framed_len = self.buf.len();
        let length = encode_length(framed_len - LENGTH_FIELD_SIZE).ok_or(Error::EntryTooLarge {
            size: framed_len,
            max: MAX_FRAMED_ENTRY,
        })?;
        self.buf.patch(0, &length)?;
        Ok(self.buf.as_slice())
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        recycle_scratch(mem::take(&mut self.buf).into_bytes());
    }
}
