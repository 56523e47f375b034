//! Document model and in-memory journal scenarios

use crate::journal;
use arbor::{
    attach_child, attach_to_root, read_journal, read_segment, replay, schedule_save, ByteReader,
    Error, JournalBuffer, JournalConfig, JournalOutcome, JournaledValue, JournaledVec,
    LifecycleConfig, MemoryStore, NodeId, NodeLinks, PersistStore, PersistentValue, Result,
    Segment, StoreMode, StructuralNode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const TITLE: u32 = 0;
pub const TAGS: u32 = 1;
pub const BODY: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub text: String,
    pub revision: u32,
}

/// Top node of a document graph
pub struct Document {
    links: NodeLinks,
    pub title: Arc<JournaledValue<String>>,
    pub tags: Arc<JournaledVec<String>>,
    pub body: Arc<PersistentValue<Body>>,
}

impl Document {
    /// Build an empty document; `journal` attaches it
    pub fn new(
        id: u64,
        store: Arc<dyn PersistStore>,
        journal: Option<&Arc<JournalBuffer>>,
    ) -> Arc<Self> {
        let body = PersistentValue::new(NodeId::new(id), Body::default(), store);
        Self::with_body(body, journal)
    }

    /// Build a detached document whose body is loaded from `store`
    pub fn restore(id: u64, store: Arc<dyn PersistStore>) -> Arc<Self> {
        let body = PersistentValue::released(NodeId::new(id), store, LifecycleConfig::default());
        Self::with_body(body, None)
    }

    fn with_body(body: PersistentValue<Body>, journal: Option<&Arc<JournalBuffer>>) -> Arc<Self> {
        let doc = Arc::new(Document {
            links: NodeLinks::new(),
            title: Arc::new(JournaledValue::new(String::new())),
            tags: Arc::new(JournaledVec::new(Vec::new())),
            body: Arc::new(body),
        });
        if let Some(journal) = journal {
            attach_to_root(doc.as_ref(), journal);
        }
        attach_child(doc.title.as_ref(), &doc, TITLE as i32);
        attach_child(doc.tags.as_ref(), &doc, TAGS as i32);
        attach_child(doc.body.as_ref(), &doc, BODY as i32);
        doc
    }

    pub fn edit_body(&self, text: &str) -> Result<JournalOutcome> {
        self.body.update(|body| {
            body.text = text.to_string();
            body.revision += 1;
        })
    }

    pub fn state(&self) -> (String, Vec<String>, Body) {
        (
            self.title.get(),
            self.tags.to_vec(),
            self.body.get().unwrap_or_default(),
        )
    }
}

impl StructuralNode for Document {
    fn links(&self) -> &NodeLinks {
        &self.links
    }

    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        match read_segment(reader)? {
            Segment::Key(TITLE) => self.title.read_record(reader),
            Segment::Key(TAGS) => self.tags.read_record(reader),
            Segment::Key(BODY) => self.body.read_record(reader),
            Segment::Key(other) => Err(Error::InvalidKey(other)),
            other => Err(Error::UnexpectedMarker {
                expected: "Key",
                found: other.marker().as_byte(),
            }),
        }
    }

    fn children(&self) -> Vec<Arc<dyn StructuralNode>> {
        vec![
            self.title.clone() as Arc<dyn StructuralNode>,
            self.tags.clone() as Arc<dyn StructuralNode>,
            self.body.clone() as Arc<dyn StructuralNode>,
        ]
    }
}

fn memory() -> Arc<dyn PersistStore> {
    Arc::new(MemoryStore::new())
}

#[test]
fn test_document_edits_replay() {
    let journal = journal(JournalConfig::for_testing());
    let doc = Document::new(1, memory(), Some(&journal));

    doc.title.set("Notes".into()).unwrap();
    doc.tags.push("draft".into()).unwrap();
    doc.tags.push("rust".into()).unwrap();
    doc.edit_body("first").unwrap();
    doc.edit_body("second").unwrap();
    doc.tags.remove(0).unwrap();

    let replica = Document::new(2, memory(), None);
    let stats = replay(replica.as_ref(), &journal.snapshot());
    assert!(stats.is_clean());
    assert_eq!(stats.records_applied, 6);
    assert_eq!(replica.state(), doc.state());
    assert_eq!(replica.body.get().unwrap().revision, 2);
}

#[test]
fn test_released_body_still_journals() {
    let journal = journal(JournalConfig::for_testing());
    let store = Arc::new(MemoryStore::new());
    let doc = Document::new(3, store.clone(), Some(&journal));

    doc.edit_body("kept on disk").unwrap();
    assert!(schedule_save(&doc.body));
    let report = journal.process_saves(StoreMode::ForceRelease);
    assert_eq!(report.released, 1);
    assert!(!doc.body.is_resident());
    assert!(store.contains(NodeId::new(3)));

    doc.edit_body("reloaded").unwrap();
    assert!(doc.body.is_resident());

    let replica = Document::new(4, memory(), None);
    assert!(read_journal(replica.as_ref(), &journal.snapshot()));
    assert_eq!(
        replica.body.get().unwrap(),
        Body {
            text: "reloaded".into(),
            revision: 2
        }
    );
}

#[test]
fn test_detached_document_edits_are_local() {
    let journal = journal(JournalConfig::for_testing());
    let doc = Document::new(5, memory(), Some(&journal));
    doc.title.set("attached".into()).unwrap();

    arbor::detach(doc.as_ref());
    assert_eq!(
        doc.title.set("local".into()).unwrap(),
        JournalOutcome::Unattached
    );
    assert_eq!(journal.stats().appended, 1);
    assert_eq!(doc.title.get(), "local");
}
