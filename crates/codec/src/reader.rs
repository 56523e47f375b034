//! Forward-only byte reader.
//!
//! Readers borrow the underlying buffer and can be forked cheaply: a fork
//! starts at the current position and advances independently. Offsets in
//! errors are absolute positions in the original buffer.

use crate::varint::decode_varint;
use arbor_core::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Cursor over a borrowed byte slice
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader over the whole slice
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Create a reader whose error offsets start at `base`
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        ByteReader { data, pos: 0, base }
    }

    /// Absolute offset of the next unread byte
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes consumed from this reader
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread byte count
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread bytes, without consuming them
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Independent reader starting at the current position
    pub fn fork(&self) -> ByteReader<'a> {
        ByteReader {
            data: &self.data[self.pos..],
            pos: 0,
            base: self.offset(),
        }
    }

    /// Consume the next `n` bytes into a reader of their own
    pub fn sub_reader(&mut self, n: usize) -> Result<ByteReader<'a>> {
        let base = self.offset();
        let bytes = self.read_bytes(n)?;
        Ok(ByteReader::with_base(bytes, base))
    }

    /// Skip `n` bytes
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(self.short_read());
        }
        self.pos += n;
        Ok(())
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8().ok_or_else(|| self.short_read())?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a big-endian `u16`
    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    /// Read a big-endian `u32`
    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    /// Read a big-endian `u64`
    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    /// Read an unsigned LEB128 varint
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, used) = decode_varint(self.rest(), self.offset())?;
        self.pos += used;
        Ok(value)
    }

    /// Read a varint that must fit in `u32`
    pub fn read_varint_u32(&mut self) -> Result<u32> {
        let value = self.read_varint()?;
        u32::try_from(value)
            .map_err(|_| Error::serialization(format!("varint {} exceeds u32", value)))
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.short_read());
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read a varint length followed by that many bytes
    pub fn read_len_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::serialization(format!("length {} exceeds usize", len)))?;
        self.read_bytes(len)
    }

    fn short_read(&self) -> Error {
        Error::Truncated {
            offset: self.base + self.data.len(),
        }
    }
}
