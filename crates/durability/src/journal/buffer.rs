//! In-memory journal buffer.
//!
//! `JournalBuffer` is the reference [`StructuralRoot`]: a fixed-capacity,
//! append-only byte buffer holding framed entries back to back. Commits are
//! serialized by a single mutex held only for the capacity check and the
//! copy. The buffer never grows; callers drain it to make room.
//!
//! # Sequence numbers
//!
//! A successful commit returns the total number of bytes committed since
//! the buffer was created. Draining resets the write position but not the
//! sequence, so sequence numbers stay monotonic across drains.

use super::config::JournalConfig;
use super::writer::JournalWriter;
use crate::root::{Commit, StructuralRoot};
use arbor_codec::Formatter;
use arbor_concurrency::{Persistable, SaveQueue, SaveReport, SaveWorker};
use arbor_core::{Error, JournalType, Result, StoreMode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

struct BufferState {
    data: Vec<u8>,
    committed: u64,
    appended: u64,
}

/// Counters describing a journal buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalStats {
    /// Entries appended since creation
    pub appended: u64,
    /// Total bytes appended since creation (the current sequence number)
    pub committed_bytes: u64,
    /// Commits refused because the buffer was full
    pub rejected_no_room: u64,
    /// Commits refused because the entry exceeded the maximum size
    pub rejected_oversized: u64,
    /// Current write position
    pub position: usize,
    /// Fixed capacity
    pub capacity: usize,
}

/// Fixed-capacity append-only journal
pub struct JournalBuffer {
    config: JournalConfig,
    state: Mutex<BufferState>,
    save_queue: Arc<SaveQueue>,
    rejected_no_room: AtomicU64,
    rejected_oversized: AtomicU64,
}

impl std::fmt::Debug for JournalBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalBuffer")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl JournalBuffer {
    /// Create a journal with the given configuration.
    pub fn new(config: JournalConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            max_entry_size = config.max_entry_size,
            strict = config.strict,
            "Journal buffer created"
        );
        Ok(JournalBuffer {
            state: Mutex::new(BufferState {
                data: Vec::with_capacity(config.capacity),
                committed: 0,
                appended: 0,
            }),
            config,
            save_queue: Arc::new(SaveQueue::new()),
            rejected_no_room: AtomicU64::new(0),
            rejected_oversized: AtomicU64::new(0),
        })
    }

    /// Create a journal with default settings and the given capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(JournalConfig::default().with_capacity(capacity))
    }

    /// Configuration this journal was created with
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Append an empty `StartingPoint` or `Waypoint` entry.
    pub fn write_marker(&self, journal_type: JournalType) -> Result<Commit> {
        if journal_type.is_dispatched() {
            return Err(Error::Config(
                "record entries must be written through a node".into(),
            ));
        }
        self.commit_entry(self.begin_entry(journal_type))
    }

    /// Copy of the committed bytes
    pub fn snapshot(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// Take the committed bytes and reset the write position.
    pub fn drain(&self) -> Vec<u8> {
        let mut state = self.state.lock();
        let drained = std::mem::replace(&mut state.data, Vec::with_capacity(self.config.capacity));
        debug!(
            bytes = drained.len(),
            sequence = state.committed,
            "Journal buffer drained"
        );
        drained
    }

    /// Current write position
    pub fn position(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Fixed capacity in bytes
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Bytes left before commits report no room
    pub fn remaining(&self) -> usize {
        self.config.capacity - self.position()
    }

    /// Whether nothing is committed since creation or the last drain
    pub fn is_empty(&self) -> bool {
        self.position() == 0
    }

    /// Current counters
    pub fn stats(&self) -> JournalStats {
        let state = self.state.lock();
        JournalStats {
            appended: state.appended,
            committed_bytes: state.committed,
            rejected_no_room: self.rejected_no_room.load(Ordering::Relaxed),
            rejected_oversized: self.rejected_oversized.load(Ordering::Relaxed),
            position: state.data.len(),
            capacity: self.config.capacity,
        }
    }

    /// Queue `node` for background persistence.
    ///
    /// Returns `false` if it was already queued.
    pub fn mark_dirty(&self, node: &Arc<dyn Persistable>) -> bool {
        self.save_queue.push(node)
    }

    /// Save every queued node with `mode`.
    pub fn process_saves(&self, mode: StoreMode) -> SaveReport {
        self.save_queue.process(mode)
    }

    /// Start a background worker processing this journal's save queue.
    pub fn spawn_save_worker(
        &self,
        mode: StoreMode,
        interval: Duration,
    ) -> std::io::Result<SaveWorker> {
        SaveWorker::spawn(Arc::clone(&self.save_queue), mode, interval)
    }
}

impl StructuralRoot for JournalBuffer {
    fn commit_entry(&self, mut writer: JournalWriter) -> Result<Commit> {
        let needed = writer.framed_len();
        if needed > self.config.max_entry_size {
            self.rejected_oversized.fetch_add(1, Ordering::Relaxed);
            return Err(Error::EntryTooLarge {
                size: needed,
                max: self.config.max_entry_size,
            });
        }
        let entry = writer.frame()?;

        let mut state = self.state.lock();
        let remaining = self.config.capacity - state.data.len();
        if needed > remaining {
            drop(state);
            self.rejected_no_room.fetch_add(1, Ordering::Relaxed);
            return Ok(Commit::NoRoom { needed, remaining });
        }
        state.data.extend_from_slice(entry);
        state.committed += needed as u64;
        state.appended += 1;
        let sequence = state.committed;
        drop(state);

        trace!(sequence, len = needed, "Journal entry committed");
        Ok(Commit::Appended { sequence })
    }

    fn formatter(&self) -> Formatter {
        self.config.formatter
    }

    fn is_strict(&self) -> bool {
        self.config.strict
    }

    fn save_queue(&self) -> Option<&SaveQueue> {
        Some(&self.save_queue)
    }
}
