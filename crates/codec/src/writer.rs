//! Growable scratch writer.
//!
//! `ByteWriter` accumulates an entry in memory. Space can be reserved up
//! front and patched later, which is how journal entries get their length
//! prefix once the payload size is known.

use crate::varint::encode_varint;
use arbor_core::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use std::io;

/// Growable byte writer backed by a `Vec<u8>`
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with preallocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Reuse an existing allocation; its contents are discarded
    pub fn from_vec(mut buf: Vec<u8>) -> Self {
        buf.clear();
        ByteWriter { buf }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write one byte
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a big-endian `u16`
    pub fn write_u16_be(&mut self, value: u16) {
        let mut tmp = [0u8; 2];
        BigEndian::write_u16(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    /// Write a big-endian `u32`
    pub fn write_u32_be(&mut self, value: u32) {
        let mut tmp = [0u8; 4];
        BigEndian::write_u32(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    /// Write a big-endian `u64`
    pub fn write_u64_be(&mut self, value: u64) {
        let mut tmp = [0u8; 8];
        BigEndian::write_u64(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    /// Write an unsigned LEB128 varint
    pub fn write_varint(&mut self, value: u64) {
        encode_varint(value, &mut self.buf);
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a varint length followed by the bytes
    pub fn write_len_prefixed(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Reserve `n` zeroed bytes and return their offset for a later `patch`
    pub fn reserve(&mut self, n: usize) -> usize {
        let offset = self.buf.len();
        self.buf.resize(offset + n, 0);
        offset
    }

    /// Overwrite previously written bytes at `offset`
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.buf.len())
            .ok_or(Error::Truncated { offset })?;
        self.buf[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Written bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Flush into one contiguous buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl io::Write for ByteWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
