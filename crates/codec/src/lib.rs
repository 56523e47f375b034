//! Binary primitives and value formatting for arbor
//!
//! - `ByteWriter`: growable scratch writer with reserve/patch support
//! - `ByteReader`: forkable cursor over a borrowed buffer
//! - `varint`: unsigned LEB128 encoding used for locator keys
//! - `formatter`: serde-based value formatters (MessagePack via `rmp-serde`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod formatter;
pub mod reader;
pub mod varint;
pub mod writer;

pub use formatter::{get_formatter, Formatter, MessagePack, NamedMessagePack, ValueFormatter};
pub use reader::ByteReader;
pub use varint::{decode_varint, encode_varint, varint_len, MAX_VARINT_LEN};
pub use writer::ByteWriter;
