//! Journal record helpers.
//!
//! Everything a node needs to journal one mutation:
//!
//! ```text
//! walk to root -> locator segments -> [prefix] -> marker -> payload -> commit
//! ```
//!
//! Journaling is best-effort. A node outside any graph produces
//! `JournalOutcome::Unattached`; a full buffer or an entry that cannot be
//! built is logged and reported as an outcome. Only a root in strict mode
//! turns those failures into errors.
//!
//! The mutate-and-journal contract is: take the node's write lock, mutate,
//! journal, release. [`journaled_update`] and [`journaled_set`] package it.

use crate::journal::JournalWriter;
use crate::locator::locate;
use crate::node::StructuralNode;
use crate::root::{Commit, StructuralRoot};
use arbor_codec::Formatter;
use arbor_concurrency::{NodeLock, PersistentCell};
use arbor_core::{Error, JournalRecord, JournalType, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{trace, warn};

/// What happened to a journaling request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalOutcome {
    /// Entry appended to the journal
    Committed {
        /// Sequence number returned by the root
        sequence: u64,
    },
    /// Node is not attached to a live graph; nothing was written
    Unattached,
    /// Journal is full; nothing was written
    NoRoom {
        /// Framed size of the entry
        needed: usize,
        /// Bytes left in the journal
        remaining: usize,
    },
    /// Entry exceeded the maximum entry size; nothing was written
    TooLarge {
        /// Framed size of the entry
        size: usize,
        /// Configured maximum
        max: usize,
    },
    /// Entry could not be built; nothing was written
    Dropped,
}

impl JournalOutcome {
    /// Whether the entry reached the journal
    pub fn is_committed(&self) -> bool {
        matches!(self, JournalOutcome::Committed { .. })
    }

    /// Sequence number of a committed entry
    pub fn sequence(&self) -> Option<u64> {
        match self {
            JournalOutcome::Committed { sequence } => Some(*sequence),
            _ => None,
        }
    }
}

/// Journal one record for `node`.
///
/// `payload` runs after the terminal marker is written and appends the
/// operation's own bytes using the root's formatter.
pub fn add_journal_record<N, F>(
    node: &N,
    op: JournalRecord,
    include_current: bool,
    payload: F,
) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    F: FnOnce(&mut JournalWriter, &Formatter) -> Result<()>,
{
    journal_at(node, op, include_current, None, payload)
}

/// Journal a full replacement of `node`'s value.
pub fn journal_value<N, T>(node: &N, value: &T) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    T: Serialize + ?Sized,
{
    add_journal_record(node, JournalRecord::Value, true, |writer, formatter| {
        writer.write_value(formatter, value)
    })
}

/// Journal a replacement of field `field` of `node`.
///
/// The field index is written as one more `Key` segment below the node.
pub fn journal_field_value<N, T>(node: &N, field: u32, value: &T) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    T: Serialize + ?Sized,
{
    journal_at(node, JournalRecord::Value, true, Some(field), |writer, formatter| {
        writer.write_value(formatter, value)
    })
}

/// Journal removal of `node` from its parent.
pub fn journal_delete<N>(node: &N) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
{
    add_journal_record(node, JournalRecord::Delete, true, |_, _| Ok(()))
}

/// Journal an item added to the collection `node`.
pub fn journal_add_item<N, T>(node: &N, item: &T) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    T: Serialize + ?Sized,
{
    add_journal_record(node, JournalRecord::AddItem, true, |writer, formatter| {
        writer.write_value(formatter, item)
    })
}

/// Journal an item removed from the collection `node`, identified by
/// `item_key`.
pub fn journal_delete_item<N, K>(node: &N, item_key: &K) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    K: Serialize + ?Sized,
{
    add_journal_record(node, JournalRecord::DeleteItem, true, |writer, formatter| {
        writer.write_value(formatter, item_key)
    })
}

/// Mutate `cell` and journal its new value under one write lock.
///
/// The mutation is applied to a copy, and the copy is installed only once
/// journaling returned `Ok`. A strict-mode error leaves the cell unchanged.
/// Any save of the same cell (including `ForceRelease`) observes the value
/// either before or after this update, never in between.
pub fn journaled_update<N, T, F>(
    node: &N,
    cell: &PersistentCell<T>,
    mutate: F,
) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync,
    F: FnOnce(&mut T),
{
    let mut guard = cell.write()?;
    let mut next = guard.clone();
    mutate(&mut next);
    let outcome = journal_value(node, &next)?;
    *guard = next;
    Ok(outcome)
}

/// Replace the value behind `lock` and journal it under one write lock.
///
/// In strict mode a journaling error leaves the value unchanged.
pub fn journaled_set<N, T>(node: &N, lock: &NodeLock<T>, value: T) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    T: Serialize,
{
    let mut guard = lock.write();
    let outcome = journal_value(node, &value)?;
    *guard = value;
    Ok(outcome)
}

/// [`journaled_update`] for a value behind a plain [`NodeLock`].
pub fn journaled_modify<N, T, F>(
    node: &N,
    lock: &NodeLock<T>,
    mutate: F,
) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    T: Serialize + Clone,
    F: FnOnce(&mut T),
{
    let mut guard = lock.write();
    let mut next = guard.clone();
    mutate(&mut next);
    let outcome = journal_value(node, &next)?;
    *guard = next;
    Ok(outcome)
}

fn journal_at<N, F>(
    node: &N,
    op: JournalRecord,
    include_current: bool,
    field: Option<u32>,
    payload: F,
) -> Result<JournalOutcome>
where
    N: StructuralNode + ?Sized,
    F: FnOnce(&mut JournalWriter, &Formatter) -> Result<()>,
{
    let Some(locator) = locate(node) else {
        trace!(op = op.name(), "Node not attached, record skipped");
        return Ok(JournalOutcome::Unattached);
    };
    let root: &Arc<dyn StructuralRoot> = locator.root();
    let strict = root.is_strict();

    let built = (|| -> Result<Commit> {
        let formatter = root.formatter();
        let mut writer = root.begin_entry(JournalType::Record);
        locator.write_segments(node, include_current, &mut writer)?;
        if let Some(field) = field {
            writer.write_key(field);
        }
        node.write_record_prefix(&mut writer)?;
        writer.write_marker(op);
        payload(&mut writer, &formatter)?;
        root.commit_entry(writer)
    })();

    match built {
        Ok(Commit::Appended { sequence }) => Ok(JournalOutcome::Committed { sequence }),
        Ok(Commit::NoRoom { needed, remaining }) => {
            if strict {
                return Err(Error::BufferFull { needed, remaining });
            }
            warn!(op = op.name(), needed, remaining, "Journal full, record dropped");
            Ok(JournalOutcome::NoRoom { needed, remaining })
        }
        Err(e) if strict => Err(e),
        Err(Error::EntryTooLarge { size, max }) => {
            warn!(op = op.name(), size, max, "Journal entry too large, record dropped");
            Ok(JournalOutcome::TooLarge { size, max })
        }
        Err(e) => {
            warn!(op = op.name(), error = %e, "Journal record dropped");
            Ok(JournalOutcome::Dropped)
        }
    }
}
