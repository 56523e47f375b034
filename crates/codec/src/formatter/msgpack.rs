//! MessagePack formatters backed by `rmp-serde`.

use super::traits::ValueFormatter;
use crate::{ByteReader, ByteWriter};
use arbor_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Compact MessagePack: structs are written as arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePack;

/// MessagePack with field names: structs are written as maps.
///
/// Larger than [`MessagePack`], but tolerant of field reordering between
/// the writer's and the reader's version of a type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedMessagePack;

impl ValueFormatter for MessagePack {
    fn formatter_id(&self) -> &'static str {
        "msgpack"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, writer: &mut ByteWriter) -> Result<()> {
        rmp_serde::encode::write(writer, value).map_err(Error::serialization)
    }

    fn decode<T: DeserializeOwned>(&self, reader: &mut ByteReader<'_>) -> Result<T> {
        decode_msgpack(reader)
    }
}

impl ValueFormatter for NamedMessagePack {
    fn formatter_id(&self) -> &'static str {
        "msgpack-named"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, writer: &mut ByteWriter) -> Result<()> {
        rmp_serde::encode::write_named(writer, value).map_err(Error::serialization)
    }

    fn decode<T: DeserializeOwned>(&self, reader: &mut ByteReader<'_>) -> Result<T> {
        decode_msgpack(reader)
    }
}

/// Both layouts decode through the same deserializer; it accepts structs
/// written either as arrays or as maps.
fn decode_msgpack<T: DeserializeOwned>(reader: &mut ByteReader<'_>) -> Result<T> {
    let mut input = reader.rest();
    let available = input.len();
    let value = {
        let mut de = rmp_serde::Deserializer::new(&mut input);
        T::deserialize(&mut de).map_err(Error::serialization)?
    };
    reader.advance(available - input.len())?;
    Ok(value)
}
