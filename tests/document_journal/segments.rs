//! Journals drained to segment files and replayed from disk

use crate::document::Document;
use crate::journal;
use arbor::{
    iter_entries, replay, FileStore, JournalBuffer, JournalConfig, JournalOutcome, JournalType,
    PersistStore, Persistable, Result, SaveOutcome, StoreMode,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes drained journal bytes to numbered segment files
struct SegmentLog {
    dir: PathBuf,
    next: usize,
}

impl SegmentLog {
    fn new(dir: &Path) -> Self {
        fs::create_dir_all(dir).unwrap();
        SegmentLog {
            dir: dir.to_path_buf(),
            next: 0,
        }
    }

    fn flush(&mut self, journal: &JournalBuffer) {
        let bytes = journal.drain();
        if bytes.is_empty() {
            return;
        }
        let path = self.dir.join(format!("segment-{:04}.log", self.next));
        fs::write(path, bytes).unwrap();
        self.next += 1;
    }

    fn segments(&self) -> Vec<Vec<u8>> {
        let mut paths: Vec<_> = fs::read_dir(&self.dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        paths.sort();
        paths.into_iter().map(|p| fs::read(p).unwrap()).collect()
    }
}

/// Largest entry the edits below produce, with room to spare
const HEADROOM: usize = 64;

/// Apply `edit` after flushing the journal if it is running low
fn edit(
    log: &mut SegmentLog,
    journal: &JournalBuffer,
    apply: impl FnOnce() -> Result<JournalOutcome>,
) {
    if journal.remaining() < HEADROOM {
        log.flush(journal);
    }
    assert!(apply().unwrap().is_committed());
}

#[test]
fn test_segments_rebuild_document() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn PersistStore> =
        Arc::new(FileStore::open(dir.path().join("nodes")).unwrap());
    let mut log = SegmentLog::new(&dir.path().join("journal"));

    let journal = journal(JournalConfig::for_testing().with_capacity(256));
    let doc = Document::new(10, store.clone(), Some(&journal));

    for round in 0..40u32 {
        edit(&mut log, &journal, || doc.title.set(format!("title {round}")));
        edit(&mut log, &journal, || doc.tags.push(format!("tag-{round}")));
        if round % 3 == 0 {
            edit(&mut log, &journal, || doc.tags.remove(0).map(|(_, o)| o));
        }
        edit(&mut log, &journal, || doc.edit_body(&"x".repeat(round as usize)));
    }
    log.flush(&journal);

    let segments = log.segments();
    assert!(segments.len() > 1, "expected the journal to fill up");
    for segment in &segments {
        assert!(segment.len() <= 256);
        let covered: usize = iter_entries(segment)
            .map(|e| e.unwrap().header.framed_len())
            .sum();
        assert_eq!(covered, segment.len());
    }

    let replica = Document::new(11, store, None);
    for segment in &segments {
        let stats = replay(replica.as_ref(), segment);
        assert!(stats.is_clean());
    }
    assert_eq!(replica.state(), doc.state());
    assert_eq!(replica.body.get().unwrap().revision, 40);
}

#[test]
fn test_checkpoint_then_persisted_body() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn PersistStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let journal = journal(JournalConfig::for_testing());
    let doc = Document::new(20, store.clone(), Some(&journal));

    doc.edit_body("before checkpoint").unwrap();
    assert_eq!(
        doc.body.save(StoreMode::ForceRelease).unwrap(),
        SaveOutcome::Released
    );
    journal.drain();
    journal.write_marker(JournalType::StartingPoint).unwrap();
    doc.title.set("after".into()).unwrap();

    // a replica that starts from the persisted body needs only the tail
    let replica = Document::restore(20, store);
    let stats = replay(replica.as_ref(), &journal.snapshot());
    assert!(stats.is_clean());
    assert_eq!(stats.markers_skipped, 1);
    assert_eq!(stats.records_applied, 1);
    assert_eq!(replica.title.get(), "after");
    assert_eq!(replica.body.get().unwrap().text, "before checkpoint");
}
