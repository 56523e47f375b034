//! Structural journaling for arbor
//!
//! This crate turns mutations of an in-memory object graph into
//! path-addressed journal entries and replays them:
//!
//! - Node / Root: `StructuralNode` and `StructuralRoot` capabilities, graph links
//! - Locator: iterative ancestor walk producing the locator path
//! - Record: journaling helpers and the mutate-and-journal protocol
//! - Journal: entry framing, per-entry writer, fixed-capacity `JournalBuffer`
//! - Replay: best-effort replay engine and record-reading helpers
//! - Nodes: ready-made journaled leaves
//!
//! # Entry Layout
//!
//! ```text
//! length (3 bytes, BE) | type (1 byte) | payload
//!
//! record  := segment* terminal
//! segment := KEY varint | LOCATOR len-prefixed bytes
//! terminal:= VALUE value | DELETE | ADDITEM item | DELETEITEM item_key
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod journal;
pub mod locator;
pub mod node;
pub mod nodes;
pub mod record;
pub mod replay;
pub mod root;

pub use journal::{
    iter_entries, EntryHeader, FramedEntry, JournalBuffer, JournalConfig, JournalConfigError,
    JournalStats, JournalWriter,
};
pub use locator::{acquire_journal_writer, locate, write_key_or_locator, Locator};
pub use node::{
    attach_child, attach_child_dyn, attach_to_root, attach_to_root_dyn, detach, LinkState,
    NodeLinks, StructuralNode, MAX_WALK_DEPTH,
};
pub use nodes::{JournaledValue, JournaledVec, PersistentValue};
pub use record::{
    add_journal_record, journal_add_item, journal_delete, journal_delete_item,
    journal_field_value, journal_value, journaled_modify, journaled_set, journaled_update,
    JournalOutcome,
};
pub use replay::{
    decode_value, decode_value_with, expect_marker, read_journal, read_marker, read_segment,
    read_value, replay, ReplayStats, Segment,
};
pub use root::{schedule_save, Commit, StructuralRoot};
