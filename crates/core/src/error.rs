//! Error types for arbor
//!
//! This module defines the error taxonomy shared by every crate in the
//! workspace. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Conditions that are *expected* during normal operation are not errors:
//! an unattached node, a full journal buffer or a contended `TryRelease` are
//! reported through outcome enums by the crates that produce them. The
//! variants below cover what the caller has to treat as a failure.

use std::io;
use thiserror::Error;

/// Result type alias for arbor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for arbor
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from an external store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Value formatter failed to encode or decode a payload
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Journal entry exceeds the configured maximum entry size
    ///
    /// Raised before any buffer mutation, so the entry is never partially
    /// committed.
    #[error("Journal entry too large: {size} bytes (max {max})")]
    EntryTooLarge {
        /// Framed size of the rejected entry
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Journal buffer has no room for the entry (strict mode only)
    #[error("Journal buffer full: needed {needed} bytes, {remaining} remaining")]
    BufferFull {
        /// Framed size of the entry
        needed: usize,
        /// Bytes left in the buffer at commit time
        remaining: usize,
    },

    /// Bounded lock wait elapsed
    #[error("Lock wait timed out after {waited_ms}ms")]
    LockTimeout {
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Input ended before a complete item could be read
    #[error("Truncated input at offset {offset}")]
    Truncated {
        /// Offset at which the read failed
        offset: usize,
    },

    /// A marker byte other than the one the decoder required
    #[error("Unexpected journal marker: expected {expected}, found {found}")]
    UnexpectedMarker {
        /// Marker name the decoder expected
        expected: &'static str,
        /// Marker byte actually found
        found: u8,
    },

    /// Byte does not name any journal record marker
    #[error("Unknown journal marker: {0:#04x}")]
    UnknownMarker(u8),

    /// Byte does not name any journal entry type
    #[error("Unknown journal entry type: {0:#04x}")]
    UnknownJournalType(u8),

    /// Locator key does not address a child of the node
    #[error("Invalid locator key: {0}")]
    InvalidKey(u32),

    /// Custom locator bytes do not address a child of the node
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// Node data was released and could not be reloaded
    #[error("Node {id:016x} is not resident")]
    NotResident {
        /// Raw node id
        id: u64,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a serialization error from any displayable cause
    pub fn serialization(cause: impl std::fmt::Display) -> Self {
        Error::Serialization(cause.to_string())
    }

    /// Whether the error is a bounded-wait timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::LockTimeout { .. })
    }

    /// Whether the error describes malformed journal bytes
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::UnexpectedMarker { .. }
                | Error::UnknownMarker(_)
                | Error::UnknownJournalType(_)
        )
    }
}
