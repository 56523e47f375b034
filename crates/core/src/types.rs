//! Core types for arbor
//!
//! This module defines the fixed vocabulary shared by writers and readers:
//! - JournalType: tag byte of a framed journal entry
//! - JournalRecord: marker bytes inside a `Record` entry payload
//! - StoreMode: persistence policy passed to save operations
//! - NodeId: identity of a node inside an external store

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key sentinel meaning "no positional index, write a custom locator"
pub const NO_KEY: i32 = -1;

/// Journal entry types with explicit byte values
///
/// The type byte immediately follows the 3-byte length of every framed
/// entry. Only `Record` carries a payload the replay engine dispatches;
/// the other two are checkpoint markers and are skipped on replay.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JournalType {
    /// Start of a journal segment
    StartingPoint = 0,

    /// Intermediate checkpoint
    Waypoint = 1,

    /// Path-addressed mutation record
    Record = 2,
}

impl JournalType {
    /// Byte value written to the wire
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether replay dispatches entries of this type to the target node
    pub fn is_dispatched(self) -> bool {
        matches!(self, JournalType::Record)
    }
}

impl TryFrom<u8> for JournalType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(JournalType::StartingPoint),
            1 => Ok(JournalType::Waypoint),
            2 => Ok(JournalType::Record),
            other => Err(Error::UnknownJournalType(other)),
        }
    }
}

/// Marker bytes inside a `Record` payload
///
/// `Locator` and `Key` are locator segments that descend one level into the
/// graph. `Value`, `Delete`, `AddItem` and `DeleteItem` are terminal: exactly
/// one of them ends every record and is consumed by the addressed node.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JournalRecord {
    /// Descend via application-defined addressing bytes
    Locator = 0,

    /// Descend via integer index
    Key = 1,

    /// Replace the addressed value
    Value = 2,

    /// Remove the addressed node
    Delete = 3,

    /// Add an item to the addressed collection
    AddItem = 4,

    /// Remove an item from the addressed collection
    DeleteItem = 5,

    /// Never written; produced when a marker cannot be read
    Invalid = 255,
}

impl JournalRecord {
    /// Byte value written to the wire
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether this marker ends a record
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JournalRecord::Value
                | JournalRecord::Delete
                | JournalRecord::AddItem
                | JournalRecord::DeleteItem
        )
    }

    /// Whether this marker is a locator segment
    pub fn is_segment(self) -> bool {
        matches!(self, JournalRecord::Locator | JournalRecord::Key)
    }

    /// Human-readable marker name
    pub fn name(self) -> &'static str {
        match self {
            JournalRecord::Locator => "Locator",
            JournalRecord::Key => "Key",
            JournalRecord::Value => "Value",
            JournalRecord::Delete => "Delete",
            JournalRecord::AddItem => "AddItem",
            JournalRecord::DeleteItem => "DeleteItem",
            JournalRecord::Invalid => "Invalid",
        }
    }
}

impl TryFrom<u8> for JournalRecord {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(JournalRecord::Locator),
            1 => Ok(JournalRecord::Key),
            2 => Ok(JournalRecord::Value),
            3 => Ok(JournalRecord::Delete),
            4 => Ok(JournalRecord::AddItem),
            5 => Ok(JournalRecord::DeleteItem),
            255 => Ok(JournalRecord::Invalid),
            other => Err(Error::UnknownMarker(other)),
        }
    }
}

impl fmt::Display for JournalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Persistence policy for a save operation
///
/// | Mode | Persists | Releases memory | On contention |
/// |------|----------|-----------------|---------------|
/// | StoreOnly | yes | no | waits for a read lock |
/// | TryRelease | yes | yes | skipped |
/// | ForceRelease | yes | yes | blocks (bounded) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreMode {
    /// Persist and keep the data resident
    #[default]
    StoreOnly,

    /// Persist and release, unless the node lock is contended
    TryRelease,

    /// Persist and release, waiting for the node lock
    ForceRelease,
}

impl StoreMode {
    /// Whether a successful save in this mode evicts resident data
    pub fn releases(self) -> bool {
        !matches!(self, StoreMode::StoreOnly)
    }

    /// Whether this mode may wait on the node lock
    pub fn blocks(self) -> bool {
        matches!(self, StoreMode::ForceRelease)
    }
}

/// Identity of a node's persisted bytes in an external store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        NodeId(raw)
    }

    /// Raw id value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
