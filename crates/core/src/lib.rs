//! Core types for arbor
//!
//! This crate defines the vocabulary shared by every other crate:
//! - JournalType / JournalRecord: entry tags and record markers
//! - StoreMode: persistence policy for save operations
//! - NodeId: identity of persisted node data
//! - Limits: framing constants and the 3-byte length codec
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod types;

pub use error::{Error, Result};
pub use limits::{
    decode_length, encode_length, DEFAULT_JOURNAL_CAPACITY, DEFAULT_MAX_ENTRY_SIZE,
    ENTRY_HEADER_SIZE, LENGTH_FIELD_SIZE, MAX_FRAMED_ENTRY, MAX_LENGTH_FIELD,
};
pub use types::{JournalRecord, JournalType, NodeId, StoreMode, NO_KEY};
