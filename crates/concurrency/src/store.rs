//! External stores for persisted node data
//!
//! A store is whatever holds node bytes while they are not resident: a
//! directory, a remote service, or a map in tests. The lifecycle layer only
//! needs three calls.

use arbor_core::{NodeId, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Persisted-bytes store keyed by node id
///
/// Implementations must be `Send + Sync`; saves for different nodes may run
/// concurrently.
pub trait PersistStore: Send + Sync {
    /// Store `bytes` for `id`, replacing any previous copy.
    ///
    /// Returns `false` if the store declined the write.
    fn persist(&self, id: NodeId, bytes: &[u8]) -> Result<bool>;

    /// Remove the persisted copy. Returns whether one existed.
    fn delete_persisted(&self, id: NodeId) -> Result<bool>;

    /// Fetch the persisted copy, if any.
    fn load(&self, id: NodeId) -> Result<Option<Vec<u8>>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<NodeId, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted nodes
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is persisted
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether `id` has a persisted copy
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.lock().contains_key(&id)
    }
}

impl PersistStore for MemoryStore {
    fn persist(&self, id: NodeId, bytes: &[u8]) -> Result<bool> {
        self.entries.lock().insert(id, bytes.to_vec());
        Ok(true)
    }

    fn delete_persisted(&self, id: NodeId) -> Result<bool> {
        Ok(self.entries.lock().remove(&id).is_some())
    }

    fn load(&self, id: NodeId) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(&id).cloned())
    }
}

/// Directory-backed store, one file per node
///
/// Files are named `<id>.node`. Writes go to a `.tmp` sibling first and are
/// renamed into place, so a crash never leaves a half-written node file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the persisted copy of `id`
    pub fn node_path(&self, id: NodeId) -> PathBuf {
        self.dir.join(format!("{}.node", id))
    }
}

impl PersistStore for FileStore {
    fn persist(&self, id: NodeId, bytes: &[u8]) -> Result<bool> {
        let path = self.node_path(id);
        let tmp = path.with_extension("node.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(true)
    }

    fn delete_persisted(&self, id: NodeId) -> Result<bool> {
        match fs::remove_file(self.node_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, id: NodeId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.node_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
