//! End-to-end tests through the `arbor` facade.
//!
//! A small document model (title, tags, persisted body) is journaled while
//! it is edited, the journal is drained to segment files on disk, and a
//! fresh document is rebuilt by replaying those files in order.

mod document;
mod segments;

use arbor::{JournalBuffer, JournalConfig};
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();
}

pub fn journal(config: JournalConfig) -> Arc<JournalBuffer> {
    init_tracing();
    Arc::new(JournalBuffer::new(config).unwrap())
}
