//! Journal replay.
//!
//! Replay walks a buffer of framed entries front to back and hands every
//! `Record` payload to the target node, which resolves the locator path
//! itself. It is best-effort and forward-only:
//!
//! - a framing error (short header, zero length, entry past the end of the
//!   buffer) stops replay, because no later offset can be trusted;
//! - a record the target rejects, or panics on, is counted as failed and
//!   replay moves on to the next entry;
//! - `StartingPoint`, `Waypoint` and unassigned entry types are skipped.
//!
//! The cursor always advances by the framed length, however much of the
//! payload the target consumed.
//!
//! The `read_*` helpers are for `StructuralNode::read_record`
//! implementations.

use crate::journal::EntryHeader;
use crate::node::StructuralNode;
use arbor_codec::{ByteReader, Formatter, ValueFormatter};
use arbor_core::{Error, JournalRecord, JournalType, Result, ENTRY_HEADER_SIZE};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Statistics from journal replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Entries whose header was decoded
    pub entries_read: usize,
    /// Records the target applied
    pub records_applied: usize,
    /// Records the target rejected or panicked on
    pub records_failed: usize,
    /// `StartingPoint` / `Waypoint` entries skipped
    pub markers_skipped: usize,
    /// Entries with an unassigned type byte, skipped
    pub unknown_skipped: usize,
    /// Offset of the framing error that stopped replay, if any
    pub truncated_at: Option<usize>,
}

impl ReplayStats {
    /// Whether every record applied and the whole buffer was framed correctly
    pub fn is_clean(&self) -> bool {
        self.records_failed == 0 && self.truncated_at.is_none()
    }
}

/// Replay `buffer` into `target`, returning per-entry statistics.
pub fn replay<N>(target: &N, buffer: &[u8]) -> ReplayStats
where
    N: StructuralNode + ?Sized,
{
    let mut stats = ReplayStats::default();
    let mut cursor = 0;

    while cursor < buffer.len() {
        let header = match EntryHeader::decode(buffer, cursor) {
            Ok(header) => header,
            Err(e) => {
                warn!(offset = cursor, error = %e, "Journal framing error, replay stopped");
                stats.truncated_at = Some(cursor);
                break;
            }
        };
        stats.entries_read += 1;

        let payload_start = cursor + ENTRY_HEADER_SIZE;
        let payload = &buffer[payload_start..cursor + header.framed_len()];

        match JournalType::try_from(header.journal_type) {
            Ok(JournalType::Record) => {
                let mut reader = ByteReader::with_base(payload, payload_start);
                match apply_record(target, &mut reader) {
                    Ok(()) => stats.records_applied += 1,
                    Err(reason) => {
                        warn!(offset = cursor, %reason, "Journal record not applied");
                        stats.records_failed += 1;
                    }
                }
            }
            Ok(_) => stats.markers_skipped += 1,
            Err(_) => {
                warn!(
                    offset = cursor,
                    journal_type = header.journal_type,
                    "Unknown journal entry type skipped"
                );
                stats.unknown_skipped += 1;
            }
        }

        cursor += header.framed_len();
    }

    debug!(?stats, "Journal replay finished");
    stats
}

/// Replay `buffer` into `target`.
///
/// Returns `false` if any record failed or the buffer ended in a framing
/// error. Records after a failed one are still applied.
pub fn read_journal<N>(target: &N, buffer: &[u8]) -> bool
where
    N: StructuralNode + ?Sized,
{
    replay(target, buffer).is_clean()
}

fn apply_record<N>(target: &N, reader: &mut ByteReader<'_>) -> std::result::Result<(), String>
where
    N: StructuralNode + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| target.read_record(reader))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!("panic: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// One step of a record payload, as seen by the node reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Descend into the child at this index
    Key(u32),
    /// Descend into the child these addressing bytes name
    Locator(&'a [u8]),
    /// The record's operation; its payload follows in the reader
    Terminal(JournalRecord),
}

impl Segment<'_> {
    /// Marker that introduced this segment
    pub fn marker(&self) -> JournalRecord {
        match self {
            Segment::Key(_) => JournalRecord::Key,
            Segment::Locator(_) => JournalRecord::Locator,
            Segment::Terminal(op) => *op,
        }
    }
}

/// Read one marker byte.
pub fn read_marker(reader: &mut ByteReader<'_>) -> Result<JournalRecord> {
    let byte = reader.read_u8()?;
    match JournalRecord::try_from(byte)? {
        JournalRecord::Invalid => Err(Error::UnknownMarker(byte)),
        marker => Ok(marker),
    }
}

/// Read the next segment or the terminal marker.
///
/// `Locator` bytes are read in the length-prefixed form written by
/// `JournalWriter::write_locator`. Nodes with a different custom encoding
/// read the marker with [`read_marker`] and parse the rest themselves.
pub fn read_segment<'a>(reader: &mut ByteReader<'a>) -> Result<Segment<'a>> {
    match read_marker(reader)? {
        JournalRecord::Key => Ok(Segment::Key(reader.read_varint_u32()?)),
        JournalRecord::Locator => Ok(Segment::Locator(reader.read_len_prefixed()?)),
        op => Ok(Segment::Terminal(op)),
    }
}

/// Read a marker that must be `expected`.
pub fn expect_marker(reader: &mut ByteReader<'_>, expected: JournalRecord) -> Result<()> {
    let found = reader.read_u8()?;
    if found != expected.as_byte() {
        return Err(Error::UnexpectedMarker {
            expected: expected.name(),
            found,
        });
    }
    Ok(())
}

/// Decode one payload value with the default formatter.
pub fn decode_value<T: DeserializeOwned>(reader: &mut ByteReader<'_>) -> Result<T> {
    Formatter::default().decode(reader)
}

/// Decode one payload value with `formatter`.
pub fn decode_value_with<T: DeserializeOwned>(
    formatter: &Formatter,
    reader: &mut ByteReader<'_>,
) -> Result<T> {
    formatter.decode(reader)
}

/// Read a `Value` marker and the value after it.
pub fn read_value<T: DeserializeOwned>(reader: &mut ByteReader<'_>) -> Result<T> {
    expect_marker(reader, JournalRecord::Value)?;
    decode_value(reader)
}
