//! Value formatter trait definitions.

use crate::{ByteReader, ByteWriter};
use arbor_core::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Value formatter trait.
///
/// Encodes the payload of a journal `Value`/`AddItem`/`DeleteItem` record
/// and decodes it again on replay. Encodings must be self-delimiting: the
/// decoder consumes exactly the bytes the encoder produced and leaves the
/// reader positioned right after them.
///
/// # Thread Safety
///
/// Formatters must be `Send + Sync` so one instance can serve every thread
/// that journals into the same root.
pub trait ValueFormatter: Send + Sync {
    /// Unique formatter identifier.
    fn formatter_id(&self) -> &'static str;

    /// Append the encoding of `value` to `writer`.
    fn encode<T: Serialize + ?Sized>(&self, value: &T, writer: &mut ByteWriter) -> Result<()>;

    /// Decode one value from the front of `reader`.
    fn decode<T: DeserializeOwned>(&self, reader: &mut ByteReader<'_>) -> Result<T>;

    /// Encode `value` into a fresh buffer.
    fn to_bytes<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut writer = ByteWriter::new();
        self.encode(value, &mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Decode a value that must occupy all of `bytes`.
    fn from_bytes<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let mut reader = ByteReader::new(bytes);
        let value = self.decode(&mut reader)?;
        if !reader.is_empty() {
            return Err(arbor_core::Error::serialization(format!(
                "{} trailing bytes after value",
                reader.remaining()
            )));
        }
        Ok(value)
    }
}
