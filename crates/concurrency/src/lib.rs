//! Concurrency and lifecycle layer for arbor
//!
//! This crate implements:
//! - NodeLock: per-node reader-writer lock with bounded waits
//! - Lifecycle: `Persistable` nodes, `PersistentCell` residency state machine
//! - Stores: `PersistStore` contract with memory and directory backends
//! - SaveQueue / SaveWorker: deferred and background persistence

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lifecycle;
pub mod lock;
pub mod save_queue;
pub mod store;

pub use lifecycle::{LifecycleConfig, Persistable, PersistentCell, Residency, SaveOutcome};
pub use lock::NodeLock;
pub use save_queue::{SaveQueue, SaveReport, SaveWorker};
pub use store::{FileStore, MemoryStore, PersistStore};
