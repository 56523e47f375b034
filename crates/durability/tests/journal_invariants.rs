//! Journal invariants under arbitrary mutation sequences, full buffers and
//! damaged entries

mod common;

use arbor_core::{Error, JournalType, ENTRY_HEADER_SIZE};
use arbor_durability::{
    iter_entries, read_journal, replay, JournalBuffer, JournalConfig, JournalOutcome,
};
use common::{chain, init_tracing, test_journal, ThreeLevel};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Framed size of `b.set_value(1_000)` in a [`ThreeLevel`] graph:
/// header 4, path 4, marker 1, msgpack u16 3
const THREE_LEVEL_ENTRY: usize = 12;

fn small_journal(capacity: usize, strict: bool) -> Arc<JournalBuffer> {
    init_tracing();
    let config = JournalConfig::for_testing()
        .with_capacity(capacity)
        .with_strict(strict);
    Arc::new(JournalBuffer::new(config).unwrap())
}

fn assert_tiled(bytes: &[u8]) -> usize {
    let mut covered = 0;
    let mut count = 0;
    for entry in iter_entries(bytes) {
        let entry = entry.unwrap();
        assert_eq!(entry.offset, covered);
        assert_eq!(entry.header.length, entry.payload.len() + 1);
        assert_eq!(
            entry.header.framed_len(),
            entry.payload.len() + ENTRY_HEADER_SIZE
        );
        covered = entry.next_offset();
        count += 1;
    }
    assert_eq!(covered, bytes.len());
    count
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_entries_tile_the_buffer(
        ops in prop::collection::vec((0usize..=12, any::<u64>()), 1..40)
    ) {
        let journal = test_journal();
        let source = chain(12, Some(&journal));
        for (level, value) in &ops {
            let outcome = source[*level].set_value(*value).unwrap();
            prop_assert!(outcome.is_committed());
        }

        let bytes = journal.snapshot();
        prop_assert_eq!(assert_tiled(&bytes), ops.len());
        prop_assert_eq!(journal.stats().committed_bytes, bytes.len() as u64);

        let replica = chain(12, None);
        prop_assert!(read_journal(replica[0].as_ref(), &bytes));
        for (level, node) in replica.iter().enumerate() {
            let last = ops.iter().rev().find(|(l, _)| *l == level).map(|(_, v)| *v);
            prop_assert_eq!(node.value(), last.unwrap_or(0));
        }
    }

    #[test]
    fn prop_replay_never_panics_on_garbage(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let replica = chain(3, None);
        let stats = replay(replica[0].as_ref(), &bytes);
        prop_assert!(stats.entries_read <= bytes.len() / ENTRY_HEADER_SIZE + 1);
    }
}

#[test]
fn test_sequence_is_monotonic_across_drain() {
    let journal = test_journal();
    let tree = ThreeLevel::build(Some(&journal));
    let mut last = 0;
    for round in 0..5u64 {
        for value in 0..4 {
            let sequence = tree.b.set_value(round * 10 + value).unwrap().sequence().unwrap();
            assert!(sequence > last);
            last = sequence;
        }
        journal.drain();
    }
    assert!(journal.is_empty());
    assert_eq!(journal.stats().appended, 20);
}

#[test]
fn test_full_buffer_is_left_untouched() {
    let journal = small_journal(30, false);
    let tree = ThreeLevel::build(Some(&journal));

    tree.b.set_value(1_000).unwrap();
    tree.b.set_value(1_001).unwrap();
    let before = journal.snapshot();
    assert_eq!(before.len(), 2 * THREE_LEVEL_ENTRY);

    for attempt in 0..3 {
        let outcome = tree.b.set_value(2_000 + attempt).unwrap();
        assert_eq!(
            outcome,
            JournalOutcome::NoRoom {
                needed: THREE_LEVEL_ENTRY,
                remaining: 30 - 2 * THREE_LEVEL_ENTRY,
            }
        );
        assert_eq!(journal.snapshot(), before);
        assert_eq!(journal.position(), before.len());
    }

    // the in-memory mutation still happened
    assert_eq!(tree.b.value(), 2_002);

    let stats = journal.stats();
    assert_eq!(stats.appended, 2);
    assert_eq!(stats.rejected_no_room, 3);
    assert_tiled(&journal.snapshot());

    journal.drain();
    assert!(tree.b.set_value(3_000).unwrap().is_committed());
}

#[test]
fn test_strict_journal_surfaces_full_buffer() {
    let journal = small_journal(30, true);
    let tree = ThreeLevel::build(Some(&journal));
    tree.b.set_value(1_000).unwrap();
    tree.b.set_value(1_001).unwrap();

    let err = tree.b.set_value(1_002).unwrap_err();
    assert!(matches!(
        err,
        Error::BufferFull {
            needed: THREE_LEVEL_ENTRY,
            remaining: 6
        }
    ));
    assert_eq!(journal.position(), 2 * THREE_LEVEL_ENTRY);
    // the refused update is not applied in memory either
    assert_eq!(tree.b.value(), 1_001);
}

#[test]
fn test_oversized_entry_rejected_before_buffer() {
    init_tracing();
    let config = JournalConfig::for_testing().with_max_entry_size(8);
    let journal = Arc::new(JournalBuffer::new(config).unwrap());
    let tree = ThreeLevel::build(Some(&journal));

    assert_eq!(
        tree.b.set_value(1).unwrap(),
        JournalOutcome::TooLarge { size: 10, max: 8 }
    );
    assert_eq!(tree.b.value(), 1);
    assert!(journal.is_empty());
    assert_eq!(journal.stats().rejected_oversized, 1);

    let strict = Arc::new(
        JournalBuffer::new(
            JournalConfig::for_testing()
                .with_max_entry_size(8)
                .with_strict(true),
        )
        .unwrap(),
    );
    let tree = ThreeLevel::build(Some(&strict));
    assert!(matches!(
        tree.b.set_value(1),
        Err(Error::EntryTooLarge { max: 8, .. })
    ));
    assert!(strict.is_empty());
    assert_eq!(tree.b.value(), 0);
}

#[test]
fn test_corrupt_record_fails_alone() {
    let journal = test_journal();
    let source = ThreeLevel::build(Some(&journal));
    for value in 1..=5 {
        source.b.set_value(value * 100).unwrap();
        source.a.set_value(value).unwrap();
    }

    let mut bytes = journal.snapshot();
    let third = iter_entries(&bytes).nth(2).unwrap().unwrap().payload_offset();
    bytes[third] = 0x7E;

    let replica = ThreeLevel::build(None);
    let stats = replay(replica.top.as_ref(), &bytes);
    assert_eq!(stats.entries_read, 10);
    assert_eq!(stats.records_failed, 1);
    assert_eq!(stats.records_applied, 9);
    assert!(stats.truncated_at.is_none());
    assert_eq!(replica.b.value(), 500);
    assert_eq!(replica.a.value(), 5);

    assert!(!read_journal(ThreeLevel::build(None).top.as_ref(), &bytes));
}

#[test]
fn test_truncated_tail_keeps_earlier_records() {
    let journal = test_journal();
    let source = ThreeLevel::build(Some(&journal));
    source.b.set_value(1).unwrap();
    source.b.set_value(2).unwrap();

    let bytes = journal.snapshot();
    let cut = bytes.len() - 2;

    let replica = ThreeLevel::build(None);
    let stats = replay(replica.top.as_ref(), &bytes[..cut]);
    assert_eq!(stats.records_applied, 1);
    assert_eq!(stats.truncated_at, Some(bytes.len() / 2));
    assert_eq!(replica.b.value(), 1);
}

#[test]
fn test_interleaved_markers_keep_tiling() {
    let journal = test_journal();
    let source = chain(4, Some(&journal));
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xA4B0);

    let mut records = 0;
    for _ in 0..200 {
        match rng.gen_range(0..10) {
            0 => {
                journal.write_marker(JournalType::Waypoint).unwrap();
            }
            _ => {
                let level = rng.gen_range(0..source.len());
                source[level].set_value(rng.gen()).unwrap();
                records += 1;
            }
        }
    }

    let bytes = journal.snapshot();
    assert_eq!(assert_tiled(&bytes), 200);

    let replica = chain(4, None);
    let stats = replay(replica[0].as_ref(), &bytes);
    assert!(stats.is_clean());
    assert_eq!(stats.records_applied, records);
    assert_eq!(stats.markers_skipped, 200 - records);
    for (ours, theirs) in source.iter().zip(&replica) {
        assert_eq!(ours.value(), theirs.value());
    }
}

#[test]
fn test_record_type_marker_is_refused() {
    let journal = test_journal();
    assert!(journal.write_marker(JournalType::Record).is_err());
    assert!(journal.is_empty());
}
