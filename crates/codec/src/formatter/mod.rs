//! Value formatter abstraction.
//!
//! Journal records carry application values (a replaced field, an added
//! collection item). The formatter seam decides how those values are turned
//! into bytes. The default is compact MessagePack via `rmp-serde`.
//!
//! # Usage
//!
//! ```ignore
//! use arbor_codec::formatter::{get_formatter, ValueFormatter};
//!
//! let formatter = get_formatter("msgpack")?;
//! let bytes = formatter.to_bytes(&("name", 3u32))?;
//! let back: (String, u32) = formatter.from_bytes(&bytes)?;
//! ```

mod msgpack;
mod traits;

pub use msgpack::{MessagePack, NamedMessagePack};
pub use traits::ValueFormatter;

use crate::{ByteReader, ByteWriter};
use arbor_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Formatter selected at runtime by identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Formatter {
    /// Compact MessagePack
    #[default]
    MessagePack,
    /// MessagePack with field names
    NamedMessagePack,
}

impl ValueFormatter for Formatter {
    fn formatter_id(&self) -> &'static str {
        match self {
            Formatter::MessagePack => MessagePack.formatter_id(),
            Formatter::NamedMessagePack => NamedMessagePack.formatter_id(),
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, writer: &mut ByteWriter) -> Result<()> {
        match self {
            Formatter::MessagePack => MessagePack.encode(value, writer),
            Formatter::NamedMessagePack => NamedMessagePack.encode(value, writer),
        }
    }

    fn decode<T: DeserializeOwned>(&self, reader: &mut ByteReader<'_>) -> Result<T> {
        match self {
            Formatter::MessagePack => MessagePack.decode(reader),
            Formatter::NamedMessagePack => NamedMessagePack.decode(reader),
        }
    }
}

/// Get a formatter by its identifier.
///
/// # Known Formatters
///
/// - `"msgpack"`: compact MessagePack (default)
/// - `"msgpack-named"`: MessagePack with struct field names
pub fn get_formatter(formatter_id: &str) -> Result<Formatter> {
    match formatter_id {
        "msgpack" => Ok(Formatter::MessagePack),
        "msgpack-named" => Ok(Formatter::NamedMessagePack),
        other => Err(Error::Config(format!("unknown value formatter: {}", other))),
    }
}
