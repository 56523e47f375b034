//! Arbor - path-addressed structural journaling for in-memory object graphs
//!
//! Every mutation of a node attached to a journal root is recorded as a
//! compact entry that names the node by its path from the root. Replaying
//! the journal into a graph of the same shape reproduces the mutations.
//!
//! # Quick Start
//!
//! ```ignore
//! use arbor::{attach_to_root, read_journal, JournalBuffer, JournalConfig, JournaledValue};
//! use std::sync::Arc;
//!
//! let journal = Arc::new(JournalBuffer::new(JournalConfig::default())?);
//! let title = JournaledValue::new(String::new());
//! attach_to_root(&title, &journal);
//!
//! title.set("draft".into())?;
//!
//! let replica = JournaledValue::new(String::new());
//! assert!(read_journal(&replica, &journal.snapshot()));
//! ```
//!
//! # Architecture
//!
//! - `arbor-core`: error type, entry and marker enums, framing limits
//! - `arbor-codec`: byte cursors, varints, value formatters
//! - `arbor-concurrency`: node locks, persistence lifecycle, save queue
//! - `arbor-durability`: graph links, locators, journal buffer, replay
//!
//! This crate re-exports the public surface of all four.

pub use arbor_codec::{
    decode_varint, encode_varint, get_formatter, varint_len, ByteReader, ByteWriter, Formatter,
    MessagePack, NamedMessagePack, ValueFormatter, MAX_VARINT_LEN,
};
pub use arbor_concurrency::{
    FileStore, LifecycleConfig, MemoryStore, NodeLock, PersistStore, Persistable, PersistentCell,
    Residency, SaveOutcome, SaveQueue, SaveReport, SaveWorker,
};
pub use arbor_core::{
    Error, JournalRecord, JournalType, NodeId, Result, StoreMode, DEFAULT_JOURNAL_CAPACITY,
    DEFAULT_MAX_ENTRY_SIZE, ENTRY_HEADER_SIZE, MAX_FRAMED_ENTRY, NO_KEY,
};
pub use arbor_durability::*;
