//! Node lifecycle: persistence and release of resident data
//!
//! ## State machine
//!
//! ```text
//!             TryRelease / ForceRelease
//!   Resident ───────────────────────────▶ Released
//!      ▲                                     │
//!      └──────────── next access ────────────┘
//!                  (reload from store)
//! ```
//!
//! `StoreOnly` persists without leaving `Resident`. Releasing a node that is
//! already released is a successful no-op.

use crate::lock::NodeLock;
use crate::store::PersistStore;
use arbor_codec::{Formatter, ValueFormatter};
use arbor_core::{Error, NodeId, Result, StoreMode};
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Lifecycle configuration parameters.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Maximum wait for the node lock in `ForceRelease` and on reload
    /// (default: 5s).
    pub lock_timeout: Duration,

    /// Formatter used for persisted node bytes (default: compact MessagePack).
    pub formatter: Formatter,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            lock_timeout: Duration::from_secs(5),
            formatter: Formatter::MessagePack,
        }
    }
}

impl LifecycleConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lock timeout (builder pattern).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the persisted-bytes formatter (builder pattern).
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.lock_timeout.is_zero() {
            return Err(Error::Config("lock timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Result of a save call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Persisted; data stays resident
    Stored,
    /// Persisted and released from memory
    Released,
    /// Node lock was contended; nothing persisted or released
    Skipped,
    /// The store declined the write; data stays resident
    Rejected,
}

impl SaveOutcome {
    /// Whether the node's current state is now persisted
    pub fn is_persisted(self) -> bool {
        matches!(self, SaveOutcome::Stored | SaveOutcome::Released)
    }
}

/// Capability of nodes that can persist their data
///
/// The defaults describe a node with no storage of its own: saving trivially
/// succeeds and erasing does nothing.
pub trait Persistable: Send + Sync {
    /// Identity used for the external store and save queue de-duplication
    fn node_id(&self) -> NodeId;

    /// Persist according to `mode`
    fn save(&self, mode: StoreMode) -> Result<SaveOutcome> {
        let _ = mode;
        Ok(SaveOutcome::Stored)
    }

    /// Remove persisted and in-memory state unconditionally
    fn erase(&self) -> Result<()> {
        Ok(())
    }
}

/// Resident data or the placeholder left after release
#[derive(Debug)]
pub enum Residency<T> {
    /// Data is in memory
    Resident(T),
    /// Data lives only in the store
    Released,
}

impl<T> Residency<T> {
    /// Whether data is in memory
    pub fn is_resident(&self) -> bool {
        matches!(self, Residency::Resident(_))
    }

    /// Borrow resident data
    pub fn as_resident(&self) -> Option<&T> {
        match self {
            Residency::Resident(value) => Some(value),
            Residency::Released => None,
        }
    }

    /// Mutably borrow resident data
    pub fn as_resident_mut(&mut self) -> Option<&mut T> {
        match self {
            Residency::Resident(value) => Some(value),
            Residency::Released => None,
        }
    }
}

/// Node data guarded by a [`NodeLock`] and backed by an external store
///
/// Reads and writes transparently reload released data. Writers that also
/// journal must keep the guard returned by [`PersistentCell::write`] alive
/// until their journal entry is committed.
pub struct PersistentCell<T> {
    id: NodeId,
    state: NodeLock<Residency<T>>,
    store: Arc<dyn PersistStore>,
    config: LifecycleConfig,
}

impl<T> std::fmt::Debug for PersistentCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCell")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T> PersistentCell<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    /// Create a resident cell
    pub fn new(id: NodeId, value: T, store: Arc<dyn PersistStore>) -> Self {
        Self::with_config(id, value, store, LifecycleConfig::default())
    }

    /// Create a resident cell with explicit configuration
    pub fn with_config(
        id: NodeId,
        value: T,
        store: Arc<dyn PersistStore>,
        config: LifecycleConfig,
    ) -> Self {
        PersistentCell {
            id,
            state: NodeLock::new(Residency::Resident(value)),
            store,
            config,
        }
    }

    /// Create a cell whose data is only in the store
    pub fn released(id: NodeId, store: Arc<dyn PersistStore>, config: LifecycleConfig) -> Self {
        PersistentCell {
            id,
            state: NodeLock::new(Residency::Released),
            store,
            config,
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether data is currently in memory
    pub fn is_resident(&self) -> bool {
        self.state.read().is_resident()
    }

    /// Shared access, reloading released data first
    pub fn read(&self) -> Result<MappedRwLockReadGuard<'_, T>> {
        if let Ok(guard) = RwLockReadGuard::try_map(self.state.read(), Residency::as_resident) {
            return Ok(guard);
        }
        let mut guard = self.state.write_timeout(self.config.lock_timeout)?;
        self.ensure_resident(&mut guard)?;
        RwLockReadGuard::try_map(RwLockWriteGuard::downgrade(guard), Residency::as_resident)
            .map_err(|_| self.not_resident())
    }

    /// Exclusive access, reloading released data first
    ///
    /// This is the lock taken by the mutate-and-journal protocol.
    pub fn write(&self) -> Result<MappedRwLockWriteGuard<'_, T>> {
        let mut guard = self.state.write_timeout(self.config.lock_timeout)?;
        self.ensure_resident(&mut guard)?;
        RwLockWriteGuard::try_map(guard, Residency::as_resident_mut).map_err(|_| self.not_resident())
    }

    /// Exclusive access without blocking
    ///
    /// Returns `Ok(None)` on contention.
    pub fn try_write(&self) -> Result<Option<MappedRwLockWriteGuard<'_, T>>> {
        let Some(mut guard) = self.state.try_write() else {
            return Ok(None);
        };
        self.ensure_resident(&mut guard)?;
        RwLockWriteGuard::try_map(guard, Residency::as_resident_mut)
            .map(Some)
            .map_err(|_| self.not_resident())
    }

    fn ensure_resident(&self, state: &mut Residency<T>) -> Result<()> {
        if state.is_resident() {
            return Ok(());
        }
        let value = match self.store.load(self.id)? {
            Some(bytes) => self.config.formatter.from_bytes(&bytes)?,
            None => return Err(self.not_resident()),
        };
        debug!(node = %self.id, "Reloaded released node");
        *state = Residency::Resident(value);
        Ok(())
    }

    fn persist(&self, value: &T) -> Result<bool> {
        let bytes = self.config.formatter.to_bytes(value)?;
        let accepted = self.store.persist(self.id, &bytes)?;
        trace!(node = %self.id, len = bytes.len(), accepted, "Persisted node");
        Ok(accepted)
    }

    fn persist_and_release(&self, state: &mut Residency<T>) -> Result<SaveOutcome> {
        let Some(value) = state.as_resident() else {
            return Ok(SaveOutcome::Released);
        };
        if !self.persist(value)? {
            return Ok(SaveOutcome::Rejected);
        }
        *state = Residency::Released;
        debug!(node = %self.id, "Released node data");
        Ok(SaveOutcome::Released)
    }

    fn not_resident(&self) -> Error {
        Error::NotResident {
            id: self.id.as_u64(),
        }
    }
}

impl<T> Persistable for PersistentCell<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn save(&self, mode: StoreMode) -> Result<SaveOutcome> {
        match mode {
            StoreMode::StoreOnly => {
                let state = self.state.read();
                match state.as_resident() {
                    Some(value) if !self.persist(value)? => Ok(SaveOutcome::Rejected),
                    _ => Ok(SaveOutcome::Stored),
                }
            }
            StoreMode::TryRelease => match self.state.try_write() {
                Some(mut state) => self.persist_and_release(&mut state),
                None => {
                    trace!(node = %self.id, "Release skipped, node lock contended");
                    Ok(SaveOutcome::Skipped)
                }
            },
            StoreMode::ForceRelease => {
                let mut state = self.state.write_timeout(self.config.lock_timeout)?;
                self.persist_and_release(&mut state)
            }
        }
    }

    fn erase(&self) -> Result<()> {
        let mut state = self.state.write_timeout(self.config.lock_timeout)?;
        self.store.delete_persisted(self.id)?;
        *state = Residency::Resident(T::default());
        debug!(node = %self.id, "Erased node");
        Ok(())
    }
}
