//! Journal framing and the reference in-memory journal.
//!
//! - `frame`: entry header codec and entry iteration
//! - `writer`: per-entry writer with thread-local scratch reuse
//! - `buffer`: fixed-capacity append-only journal (`StructuralRoot`)
//! - `config`: journal configuration

pub mod buffer;
pub mod config;
pub mod frame;
pub mod writer;

pub use buffer::{JournalBuffer, JournalStats};
pub use config::{JournalConfig, JournalConfigError};
pub use frame::{iter_entries, EntryHeader, EntryIter, FramedEntry};
pub use writer::JournalWriter;
