//! Ready-made journaled nodes.
//!
//! These cover the common leaf shapes: a single value, a persistable value
//! and a list. Each one follows the mutate-and-journal contract under its
//! own lock and knows how to apply its records on replay. Application types
//! with children implement [`StructuralNode`] themselves and delegate to
//! these for their leaves.

use crate::node::{NodeLinks, StructuralNode};
use crate::record::{
    journal_add_item, journal_delete_item, journaled_modify, journaled_set, journaled_update,
    JournalOutcome,
};
use crate::replay::{decode_value, read_segment, read_value, Segment};
use arbor_codec::ByteReader;
use arbor_concurrency::{
    LifecycleConfig, NodeLock, PersistStore, Persistable, PersistentCell, SaveOutcome,
};
use arbor_core::{Error, JournalRecord, NodeId, Result, StoreMode};
use parking_lot::RwLockReadGuard;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A single journaled value
#[derive(Debug, Default)]
pub struct JournaledValue<T> {
    links: NodeLinks,
    value: NodeLock<T>,
}

impl<T> JournaledValue<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Create an unattached value
    pub fn new(value: T) -> Self {
        JournaledValue {
            links: NodeLinks::new(),
            value: NodeLock::new(value),
        }
    }

    /// Copy of the current value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Shared access to the current value
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.value.read()
    }

    /// Replace the value and journal it
    pub fn set(&self, value: T) -> Result<JournalOutcome> {
        journaled_set(self, &self.value, value)
    }

    /// Modify the value in place and journal the result
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> Result<JournalOutcome> {
        journaled_modify(self, &self.value, mutate)
    }
}

impl<T> StructuralNode for JournaledValue<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        let value: T = read_value(reader)?;
        *self.value.write() = value;
        Ok(())
    }
}

/// A journaled value whose data can be persisted and released
pub struct PersistentValue<T> {
    links: NodeLinks,
    cell: PersistentCell<T>,
}

impl<T> std::fmt::Debug for PersistentValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentValue")
            .field("links", &self.links)
            .field("cell", &self.cell)
            .finish()
    }
}

impl<T> PersistentValue<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync,
{
    /// Create an unattached, resident value
    pub fn new(id: NodeId, value: T, store: Arc<dyn PersistStore>) -> Self {
        Self::with_config(id, value, store, LifecycleConfig::default())
    }

    /// Create an unattached, resident value with explicit configuration
    pub fn with_config(
        id: NodeId,
        value: T,
        store: Arc<dyn PersistStore>,
        config: LifecycleConfig,
    ) -> Self {
        PersistentValue {
            links: NodeLinks::new(),
            cell: PersistentCell::with_config(id, value, store, config),
        }
    }

    /// Create an unattached value whose data is only in `store`
    pub fn released(id: NodeId, store: Arc<dyn PersistStore>, config: LifecycleConfig) -> Self {
        PersistentValue {
            links: NodeLinks::new(),
            cell: PersistentCell::released(id, store, config),
        }
    }

    /// Copy of the current value, reloading it if released
    pub fn get(&self) -> Result<T> {
        Ok(self.cell.read()?.clone())
    }

    /// Replace the value and journal it
    pub fn set(&self, value: T) -> Result<JournalOutcome> {
        journaled_update(self, &self.cell, |current| *current = value)
    }

    /// Modify the value in place and journal the result
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> Result<JournalOutcome> {
        journaled_update(self, &self.cell, mutate)
    }

    /// Whether the data is in memory
    pub fn is_resident(&self) -> bool {
        self.cell.is_resident()
    }

    /// Underlying cell
    pub fn cell(&self) -> &PersistentCell<T> {
        &self.cell
    }
}

impl<T> StructuralNode for PersistentValue<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync,
{
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        let value: T = read_value(reader)?;
        *self.cell.write()? = value;
        Ok(())
    }
}

impl<T> Persistable for PersistentValue<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync,
{
    fn node_id(&self) -> NodeId {
        self.cell.id()
    }

    fn save(&self, mode: StoreMode) -> Result<SaveOutcome> {
        self.cell.save(mode)
    }

    fn erase(&self) -> Result<()> {
        self.cell.erase()
    }
}

/// A journaled list
///
/// `push` journals `AddItem` with the item, `remove` journals `DeleteItem`
/// with the index, and `replace_all` journals `Value` with the whole list.
#[derive(Debug, Default)]
pub struct JournaledVec<T> {
    links: NodeLinks,
    items: NodeLock<Vec<T>>,
}

impl<T> JournaledVec<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Create an unattached list
    pub fn new(items: Vec<T>) -> Self {
        JournaledVec {
            links: NodeLinks::new(),
            items: NodeLock::new(items),
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Copy of the item at `index`
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Copy of every item
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Append `item` and journal it.
    ///
    /// In strict mode a journaling error leaves the list unchanged.
    pub fn push(&self, item: T) -> Result<JournalOutcome> {
        let mut items = self.items.write();
        let outcome = journal_add_item(self, &item)?;
        items.push(item);
        Ok(outcome)
    }

    /// Remove the item at `index` and journal the removal.
    pub fn remove(&self, index: usize) -> Result<(T, JournalOutcome)> {
        let mut items = self.items.write();
        if index >= items.len() {
            return Err(Error::InvalidKey(index_key(index as u64)));
        }
        let outcome = journal_delete_item(self, &(index as u64))?;
        Ok((items.remove(index), outcome))
    }

    /// Replace every item and journal the new list.
    pub fn replace_all(&self, items: Vec<T>) -> Result<JournalOutcome> {
        journaled_set(self, &self.items, items)
    }
}

fn index_key(index: u64) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

impl<T> StructuralNode for JournaledVec<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        match read_segment(reader)? {
            Segment::Terminal(JournalRecord::AddItem) => {
                let item: T = decode_value(reader)?;
                self.items.write().push(item);
            }
            Segment::Terminal(JournalRecord::DeleteItem) => {
                let index: u64 = decode_value(reader)?;
                let mut items = self.items.write();
                match usize::try_from(index) {
                    Ok(index) if index < items.len() => {
                        items.remove(index);
                    }
                    _ => return Err(Error::InvalidKey(index_key(index))),
                }
            }
            Segment::Terminal(JournalRecord::Value) => {
                let all: Vec<T> = decode_value(reader)?;
                *self.items.write() = all;
            }
            other => {
                return Err(Error::UnexpectedMarker {
                    expected: "AddItem, DeleteItem or Value",
                    found: other.marker().as_byte(),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalBuffer, JournalConfig};
    use crate::node::attach_to_root;
    use crate::replay::read_journal;
    use arbor_concurrency::MemoryStore;

    fn journal() -> Arc<JournalBuffer> {
        Arc::new(JournalBuffer::new(JournalConfig::for_testing()).unwrap())
    }

    #[test]
    fn test_value_set_and_replay() {
        let journal = journal();
        let source = JournaledValue::new(String::from("a"));
        attach_to_root(&source, &journal);
        assert!(source.set("b".into()).unwrap().is_committed());
        source.update(|s| s.push('c')).unwrap();
        assert_eq!(source.get(), "bc");

        let replica = JournaledValue::new(String::new());
        assert!(read_journal(&replica, &journal.snapshot()));
        assert_eq!(replica.get(), "bc");
    }

    #[test]
    fn test_unattached_value_still_mutates() {
        let value = JournaledValue::new(1u32);
        assert_eq!(value.set(2).unwrap(), JournalOutcome::Unattached);
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn test_vec_push_remove_replay() {
        let journal = journal();
        let source = JournaledVec::new(vec![1u32]);
        attach_to_root(&source, &journal);
        source.push(2).unwrap();
        source.push(3).unwrap();
        let (removed, _) = source.remove(0).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(source.to_vec(), vec![2, 3]);

        let replica = JournaledVec::new(vec![1u32]);
        assert!(read_journal(&replica, &journal.snapshot()));
        assert_eq!(replica.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_vec_remove_out_of_range() {
        let list: JournaledVec<u8> = JournaledVec::new(vec![]);
        assert!(matches!(list.remove(0), Err(Error::InvalidKey(0))));
    }

    #[test]
    fn test_vec_replay_bad_index_fails() {
        let journal = journal();
        let source = JournaledVec::new(vec![1u8, 2]);
        attach_to_root(&source, &journal);
        source.remove(1).unwrap();

        let replica: JournaledVec<u8> = JournaledVec::new(vec![]);
        assert!(!read_journal(&replica, &journal.snapshot()));
    }

    #[test]
    fn test_vec_replace_all() {
        let journal = journal();
        let source = JournaledVec::new(vec![0u8]);
        attach_to_root(&source, &journal);
        source.replace_all(vec![7, 8]).unwrap();

        let replica = JournaledVec::new(vec![9u8, 9, 9]);
        assert!(read_journal(&replica, &journal.snapshot()));
        assert_eq!(replica.to_vec(), vec![7, 8]);
    }

    fn strict_journal(capacity: usize) -> Arc<JournalBuffer> {
        let config = JournalConfig::for_testing()
            .with_capacity(capacity)
            .with_strict(true);
        Arc::new(JournalBuffer::new(config).unwrap())
    }

    #[test]
    fn test_strict_value_keeps_old_value_on_full_journal() {
        let journal = strict_journal(8);
        let value = JournaledValue::new(0u64);
        attach_to_root(&value, &journal);

        value.set(1).unwrap();
        assert!(matches!(
            value.set(2),
            Err(Error::BufferFull {
                needed: 6,
                remaining: 2
            })
        ));
        assert_eq!(value.get(), 1);
        assert!(value.update(|v| *v = 3).is_err());
        assert_eq!(value.get(), 1);
    }

    #[test]
    fn test_strict_persistent_value_keeps_old_value_on_full_journal() {
        let journal = strict_journal(8);
        let store = Arc::new(MemoryStore::new());
        let value = PersistentValue::new(NodeId::new(1), 0u64, store.clone());
        attach_to_root(&value, &journal);

        value.set(1).unwrap();
        assert!(value.set(2).is_err());
        assert!(value.update(|v| *v += 5).is_err());
        assert_eq!(value.get().unwrap(), 1);

        // a save after the failure persists only the journaled value
        value.save(StoreMode::ForceRelease).unwrap();
        let replica: PersistentValue<u64> = PersistentValue::released(NodeId::new(1), store, LifecycleConfig::default());
        assert_eq!(replica.get().unwrap(), 1);
    }

    #[test]
    fn test_persistent_value_release_and_replay() {
        let journal = journal();
        let store = Arc::new(MemoryStore::new());
        let source = PersistentValue::new(NodeId::new(7), 10u64, store.clone());
        attach_to_root(&source, &journal);

        source.update(|v| *v += 5).unwrap();
        assert_eq!(
            source.save(StoreMode::ForceRelease).unwrap(),
            SaveOutcome::Released
        );
        assert!(!source.is_resident());
        assert_eq!(source.get().unwrap(), 15);

        let replica = PersistentValue::new(NodeId::new(8), 0u64, store.clone());
        assert!(read_journal(&replica, &journal.snapshot()));
        assert_eq!(replica.get().unwrap(), 15);

        let restored: PersistentValue<u64> =
            PersistentValue::released(NodeId::new(7), store, LifecycleConfig::default());
        assert!(!restored.is_resident());
        assert_eq!(restored.get().unwrap(), 15);
    }
}
