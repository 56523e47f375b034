//! Structural root capability.
//!
//! A root owns the append-only journal of one graph. Nodes never hold a
//! strong reference to it; they reach it through the weak link recorded on
//! the top node of their ancestor chain.

use crate::journal::JournalWriter;
use crate::node::StructuralNode;
use arbor_codec::Formatter;
use arbor_concurrency::{Persistable, SaveQueue};
use arbor_core::{JournalType, Result};
use std::sync::Arc;

/// Result of handing a finished entry to the root.
///
/// `NoRoom` is backpressure, not failure: nothing was copied and the caller
/// may retry after the journal is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Entry appended; `sequence` is the total byte count committed so far
    Appended {
        /// Monotonic sequence number
        sequence: u64,
    },
    /// Entry did not fit in the remaining capacity
    NoRoom {
        /// Framed size of the entry
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },
}

impl Commit {
    /// Whether the entry was appended
    pub fn is_appended(&self) -> bool {
        matches!(self, Commit::Appended { .. })
    }

    /// Sequence number, or `None` if the entry did not fit
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Commit::Appended { sequence } => Some(*sequence),
            Commit::NoRoom { .. } => None,
        }
    }
}

/// Owner of a graph's journal.
pub trait StructuralRoot: Send + Sync {
    /// Start a new entry of `journal_type`.
    fn begin_entry(&self, journal_type: JournalType) -> JournalWriter {
        JournalWriter::begin(journal_type)
    }

    /// Frame `writer` and append it to the journal.
    ///
    /// Oversized entries fail with `EntryTooLarge` before the journal is
    /// touched. A full journal yields `Ok(Commit::NoRoom { .. })`.
    fn commit_entry(&self, writer: JournalWriter) -> Result<Commit>;

    /// Formatter used for record payload values.
    fn formatter(&self) -> Formatter {
        Formatter::default()
    }

    /// Whether journaling failures should surface as errors.
    fn is_strict(&self) -> bool {
        false
    }

    /// Queue of nodes awaiting background persistence, if the root has one.
    fn save_queue(&self) -> Option<&SaveQueue> {
        None
    }
}

/// Queue `node` on its root's save queue.
///
/// Returns `false` if the node is unattached, its root keeps no save queue,
/// or the node is already queued.
pub fn schedule_save<N>(node: &Arc<N>) -> bool
where
    N: StructuralNode + Persistable + 'static,
{
    let Some(root) = node.root() else {
        return false;
    };
    let Some(queue) = root.save_queue() else {
        return false;
    };
    let handle: Arc<dyn Persistable> = node.clone();
    queue.push(&handle)
}
