//! Save queue and background saver
//!
//! A journal root mediates background persistence: nodes that changed are
//! queued, and a pass over the queue saves each of them with one
//! [`StoreMode`]. The queue holds weak handles, so a node dropped by the
//! application simply falls out of the queue.
//!
//! Entries that are skipped (lock contended), rejected by the store or fail
//! with an error stay queued for the next pass.

use crate::lifecycle::{Persistable, SaveOutcome};
use arbor_core::{NodeId, StoreMode};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<(NodeId, Weak<dyn Persistable>)>,
    queued: HashSet<NodeId>,
}

/// Queue of nodes waiting to be saved
#[derive(Default)]
pub struct SaveQueue {
    state: Mutex<QueueState>,
}

impl std::fmt::Debug for SaveQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveQueue").field("len", &self.len()).finish()
    }
}

/// Counters from one pass over the queue
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Persisted and left resident
    pub stored: usize,
    /// Persisted and released
    pub released: usize,
    /// Lock contended, requeued
    pub skipped: usize,
    /// Store declined, requeued
    pub rejected: usize,
    /// Save returned an error, requeued
    pub failed: usize,
    /// Node no longer alive, removed
    pub dropped: usize,
}

impl SaveReport {
    /// Entries that went back into the queue
    pub fn requeued(&self) -> usize {
        self.skipped + self.rejected + self.failed
    }

    /// Entries persisted during the pass
    pub fn persisted(&self) -> usize {
        self.stored + self.released
    }
}

impl SaveQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a node; returns `false` if it was already queued
    pub fn push(&self, node: &Arc<dyn Persistable>) -> bool {
        let id = node.node_id();
        let mut state = self.state.lock();
        if !state.queued.insert(id) {
            return false;
        }
        state.pending.push_back((id, Arc::downgrade(node)));
        true
    }

    /// Number of queued nodes
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// Save every queued node with `mode`
    ///
    /// The queue lock is not held while saving, so nodes can be queued
    /// concurrently with a pass.
    pub fn process(&self, mode: StoreMode) -> SaveReport {
        let batch: Vec<_> = {
            let mut state = self.state.lock();
            state.queued.clear();
            state.pending.drain(..).collect()
        };

        let mut report = SaveReport::default();
        let mut retry = Vec::new();

        for (id, weak) in batch {
            let Some(node) = weak.upgrade() else {
                report.dropped += 1;
                continue;
            };
            match node.save(mode) {
                Ok(SaveOutcome::Stored) => report.stored += 1,
                Ok(SaveOutcome::Released) => report.released += 1,
                Ok(SaveOutcome::Skipped) => {
                    report.skipped += 1;
                    retry.push((id, weak));
                }
                Ok(SaveOutcome::Rejected) => {
                    report.rejected += 1;
                    retry.push((id, weak));
                }
                Err(e) => {
                    warn!(node = %id, error = %e, "Save failed, node requeued");
                    report.failed += 1;
                    retry.push((id, weak));
                }
            }
        }

        if !retry.is_empty() {
            let mut state = self.state.lock();
            for (id, weak) in retry {
                if state.queued.insert(id) {
                    state.pending.push_back((id, weak));
                }
            }
        }

        debug!(?mode, ?report, "Save queue pass completed");
        report
    }
}

struct WorkerSignal {
    shutdown: Mutex<bool>,
    wake: Condvar,
}

/// Background thread that processes a [`SaveQueue`] on an interval
pub struct SaveWorker {
    signal: Arc<WorkerSignal>,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    /// Start processing `queue` with `mode` every `interval`
    pub fn spawn(
        queue: Arc<SaveQueue>,
        mode: StoreMode,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let signal = Arc::new(WorkerSignal {
            shutdown: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name("arbor-save".into())
            .spawn(move || {
                info!(?mode, interval_ms = interval.as_millis() as u64, "Save worker started");
                loop {
                    {
                        let mut shutdown = thread_signal.shutdown.lock();
                        if !*shutdown {
                            thread_signal.wake.wait_for(&mut shutdown, interval);
                        }
                        if *shutdown {
                            break;
                        }
                    }
                    if !queue.is_empty() {
                        queue.process(mode);
                    }
                }
                // final pass so nothing queued before shutdown is lost
                let report = queue.process(mode);
                info!(?report, "Save worker stopped");
            })?;

        Ok(SaveWorker {
            signal,
            handle: Some(handle),
        })
    }

    /// Wake the worker for an immediate pass
    pub fn nudge(&self) {
        self.signal.wake.notify_one();
    }

    /// Stop the worker after a final pass and wait for it
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        *self.signal.shutdown.lock() = true;
        self.signal.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
