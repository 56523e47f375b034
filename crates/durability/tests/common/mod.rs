//! Shared graph fixtures for durability integration tests
//!
//! `Branch` is an interior node with keyed children, named children (custom
//! locator) and a `u64` field of its own. Tests build the same shape twice:
//! once attached to a journal, once detached as the replay target.

#![allow(dead_code)]

use arbor_codec::ByteReader;
use arbor_concurrency::NodeLock;
use arbor_core::{Error, JournalRecord, Result, NO_KEY};
use arbor_durability::{
    attach_child, attach_to_root, decode_value, journal_delete, journaled_set, read_segment,
    read_value, JournalBuffer, JournalConfig, JournalOutcome, JournalWriter, NodeLinks, Segment,
    StructuralNode,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Journal with the test configuration
pub fn test_journal() -> Arc<JournalBuffer> {
    init_tracing();
    Arc::new(JournalBuffer::new(JournalConfig::for_testing()).expect("valid config"))
}

/// Interior node with a value of its own
#[derive(Default)]
pub struct Branch {
    links: NodeLinks,
    value: NodeLock<u64>,
    keyed: Mutex<BTreeMap<u32, Arc<dyn StructuralNode>>>,
    named: Mutex<BTreeMap<String, Arc<dyn StructuralNode>>>,
}

impl Branch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn value(&self) -> u64 {
        *self.value.read()
    }

    pub fn set_value(&self, value: u64) -> Result<JournalOutcome> {
        journaled_set(self, &self.value, value)
    }

    /// Insert `child` at `key` and return it
    pub fn add<C>(self: &Arc<Self>, key: u32, child: Arc<C>) -> Arc<C>
    where
        C: StructuralNode + 'static,
    {
        attach_child(child.as_ref(), self, key as i32);
        self.keyed.lock().insert(key, child.clone());
        child
    }

    /// Insert a named child addressed by custom locator
    pub fn add_named(self: &Arc<Self>, child: Arc<Named>) -> Arc<Named> {
        attach_child(child.as_ref(), self, NO_KEY);
        self.named.lock().insert(child.name.clone(), child.clone());
        child
    }

    pub fn has_child(&self, key: u32) -> bool {
        self.keyed.lock().contains_key(&key)
    }

    /// Remove the child at `key` and journal the removal
    pub fn remove(&self, key: u32) -> Result<JournalOutcome> {
        let Some(child) = self.keyed.lock().get(&key).cloned() else {
            return Err(Error::InvalidKey(key));
        };
        let outcome = journal_delete(child.as_ref())?;
        self.keyed.lock().remove(&key);
        Ok(outcome)
    }
}

impl StructuralNode for Branch {
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        match read_segment(reader)? {
            Segment::Key(key) => {
                let child = self
                    .keyed
                    .lock()
                    .get(&key)
                    .cloned()
                    .ok_or(Error::InvalidKey(key))?;
                if reader.peek_u8() == Some(JournalRecord::Delete.as_byte()) {
                    reader.read_u8()?;
                    self.keyed.lock().remove(&key);
                    return Ok(());
                }
                child.read_record(reader)
            }
            Segment::Locator(address) => {
                let name = String::from_utf8_lossy(address);
                let child = self
                    .named
                    .lock()
                    .get(name.as_ref())
                    .cloned()
                    .ok_or_else(|| Error::InvalidLocator(name.to_string()))?;
                child.read_record(reader)
            }
            Segment::Terminal(JournalRecord::Value) => {
                let value: u64 = decode_value(reader)?;
                *self.value.write() = value;
                Ok(())
            }
            other => Err(Error::UnexpectedMarker {
                expected: "Key, Locator or Value",
                found: other.marker().as_byte(),
            }),
        }
    }

    fn children(&self) -> Vec<Arc<dyn StructuralNode>> {
        let mut children: Vec<_> = self.keyed.lock().values().cloned().collect();
        children.extend(self.named.lock().values().cloned());
        children
    }
}

/// Leaf addressed by name instead of index
pub struct Named {
    links: NodeLinks,
    name: String,
    text: NodeLock<String>,
}

impl Named {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Named {
            links: NodeLinks::new(),
            name: name.to_string(),
            text: NodeLock::new(String::new()),
        })
    }

    pub fn text(&self) -> String {
        self.text.read().clone()
    }

    pub fn set_text(&self, text: &str) -> Result<JournalOutcome> {
        journaled_set(self, &self.text, text.to_string())
    }
}

impl StructuralNode for Named {
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        let text: String = read_value(reader)?;
        *self.text.write() = text;
        Ok(())
    }

    fn write_locator(&self, writer: &mut JournalWriter) -> Result<()> {
        writer.write_locator(self.name.as_bytes());
        Ok(())
    }
}

/// Chain of `depth` branches below a top branch, keyed by `key_for(level)`
///
/// Returns every node from the top down. The top is attached to `journal`
/// when one is given.
pub fn chain(depth: usize, journal: Option<&Arc<JournalBuffer>>) -> Vec<Arc<Branch>> {
    let top = Branch::new();
    if let Some(journal) = journal {
        attach_to_root(top.as_ref(), journal);
    }
    let mut nodes = vec![top];
    for level in 0..depth {
        let parent = nodes[nodes.len() - 1].clone();
        let child = parent.add(key_for(level), Branch::new());
        nodes.push(child);
    }
    nodes
}

/// Key used at `level` by [`chain`]
pub fn key_for(level: usize) -> u32 {
    (level as u32 * 7) % 130
}

/// `Root -> A(0) -> B(2)`
pub struct ThreeLevel {
    pub top: Arc<Branch>,
    pub a: Arc<Branch>,
    pub b: Arc<Branch>,
}

impl ThreeLevel {
    pub fn build(journal: Option<&Arc<JournalBuffer>>) -> Self {
        let top = Branch::new();
        if let Some(journal) = journal {
            attach_to_root(top.as_ref(), journal);
        }
        let a = top.add(0, Branch::new());
        let b = a.add(2, Branch::new());
        ThreeLevel { top, a, b }
    }
}
