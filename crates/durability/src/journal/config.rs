//! Journal configuration.
//!
//! This module provides configuration for the in-memory journal buffer.

use arbor_codec::Formatter;
use arbor_core::{
    DEFAULT_JOURNAL_CAPACITY, DEFAULT_MAX_ENTRY_SIZE, ENTRY_HEADER_SIZE, MAX_FRAMED_ENTRY,
};

/// Journal configuration parameters.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Buffer capacity in bytes (default: 4MB).
    ///
    /// The buffer never grows. Once full, commits report no room until the
    /// buffer is drained.
    pub capacity: usize,

    /// Maximum framed entry size in bytes (default: 16KB).
    ///
    /// Larger entries are rejected before the buffer is touched.
    pub max_entry_size: usize,

    /// Surface journaling failures as errors instead of outcomes
    /// (default: false).
    pub strict: bool,

    /// Formatter for record payload values (default: compact MessagePack).
    pub formatter: Formatter,
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            capacity: DEFAULT_JOURNAL_CAPACITY,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            strict: false,
            formatter: Formatter::MessagePack,
        }
    }
}

impl JournalConfig {
    /// Create a new journal configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set buffer capacity (builder pattern).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set maximum entry size (builder pattern).
    pub fn with_max_entry_size(mut self, size: usize) -> Self {
        self.max_entry_size = size;
        self
    }

    /// Enable or disable strict mode (builder pattern).
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the payload formatter (builder pattern).
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), JournalConfigError> {
        if self.capacity == 0 {
            return Err(JournalConfigError::ZeroCapacity);
        }
        if self.max_entry_size <= ENTRY_HEADER_SIZE {
            return Err(JournalConfigError::EntrySizeTooSmall);
        }
        if self.max_entry_size > MAX_FRAMED_ENTRY {
            return Err(JournalConfigError::EntrySizeExceedsFraming);
        }
        Ok(())
    }

    /// Create a configuration optimized for testing (small buffer).
    pub fn for_testing() -> Self {
        JournalConfig {
            capacity: 64 * 1024,
            max_entry_size: 4 * 1024,
            strict: false,
            formatter: Formatter::MessagePack,
        }
    }
}

/// Journal configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalConfigError {
    /// Capacity is zero.
    #[error("Journal capacity must be non-zero")]
    ZeroCapacity,

    /// Maximum entry size cannot hold a header plus one payload byte.
    #[error("Maximum entry size must exceed the 4-byte entry header")]
    EntrySizeTooSmall,

    /// Maximum entry size cannot be expressed in the 3-byte length field.
    #[error("Maximum entry size exceeds the 3-byte length field")]
    EntrySizeExceedsFraming,
}

impl From<JournalConfigError> for arbor_core::Error {
    fn from(e: JournalConfigError) -> Self {
        arbor_core::Error::Config(e.to_string())
    }
}
