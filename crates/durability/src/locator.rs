//! Ancestor walk and locator encoding.
//!
//! A locator is the path from the graph's top node down to a node, written
//! as one segment per level:
//!
//! ```text
//! segment := KEY key:varint | LOCATOR custom_bytes
//! ```
//!
//! The top node (the one holding the root link) is written like any other
//! ancestor: a non-negative key becomes a `Key` segment, otherwise its
//! locator hook runs, and the default hook writes nothing. A graph whose top
//! node has no key therefore replays from the top node itself. The walk is
//! iterative and works at any depth. Each
//! hop reads the visited node's links once, and a parent link that no
//! longer upgrades aborts the walk instead of producing a partial path.

use crate::journal::JournalWriter;
use crate::node::{StructuralNode, MAX_WALK_DEPTH};
use crate::root::StructuralRoot;
use arbor_core::{JournalType, Result};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

type Ancestors = SmallVec<[(Arc<dyn StructuralNode>, i32); 8]>;

/// Resolved position of a node in its graph.
pub struct Locator {
    root: Arc<dyn StructuralRoot>,
    node_key: i32,
    // nearest-to-node first; the last element is the top node
    ancestors: Ancestors,
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("node_key", &self.node_key)
            .field("path", &self.path_keys())
            .finish_non_exhaustive()
    }
}

impl Locator {
    /// Root owning the node's graph
    pub fn root(&self) -> &Arc<dyn StructuralRoot> {
        &self.root
    }

    /// Number of parent hops from the node to the top node
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Whether the node is the top node of its graph
    pub fn is_top(&self) -> bool {
        self.ancestors.is_empty()
    }

    /// Keys of every level from the top node down to the node itself.
    ///
    /// Negative keys mark levels addressed by a locator hook.
    pub fn path_keys(&self) -> Vec<i32> {
        let mut keys: Vec<i32> = self.ancestors.iter().rev().map(|(_, key)| *key).collect();
        keys.push(self.node_key);
        keys
    }

    /// Write the locator segments for `node` into `writer`.
    ///
    /// `node` must be the node this locator was resolved from. With
    /// `include_current` unset the path stops at the node's parent.
    pub fn write_segments<N>(
        &self,
        node: &N,
        include_current: bool,
        writer: &mut JournalWriter,
    ) -> Result<()>
    where
        N: StructuralNode + ?Sized,
    {
        for (ancestor, key) in self.ancestors.iter().rev() {
            write_segment(ancestor.as_ref(), *key, writer)?;
        }
        if include_current {
            write_segment(node, self.node_key, writer)?;
        }
        Ok(())
    }
}

/// Walk from `node` to the top of its graph.
///
/// Returns `None` when the graph has no live root, when a link in the chain
/// has been dropped, or when the chain is implausibly deep.
pub fn locate<N>(node: &N) -> Option<Locator>
where
    N: StructuralNode + ?Sized,
{
    let mut links = node.links().snapshot();
    let node_key = links.key;
    let mut ancestors = Ancestors::new();

    while let Some(weak) = links.parent.take() {
        let Some(parent) = weak.upgrade() else {
            trace!(depth = ancestors.len(), "Ancestor dropped during walk");
            return None;
        };
        if ancestors.len() >= MAX_WALK_DEPTH {
            trace!("Ancestor walk exceeded depth bound");
            return None;
        }
        links = parent.links().snapshot();
        ancestors.push((parent, links.key));
    }

    let root = links.root?.upgrade()?;
    Some(Locator {
        root,
        node_key,
        ancestors,
    })
}

/// Obtain a `Record` writer from `node`'s root, pre-filled with its locator.
///
/// Returns `Ok(None)` when the node is not attached to a live graph. Errors
/// come only from custom locator hooks.
pub fn acquire_journal_writer<N>(
    node: &N,
    include_current: bool,
) -> Result<Option<(Arc<dyn StructuralRoot>, JournalWriter)>>
where
    N: StructuralNode + ?Sized,
{
    let Some(locator) = locate(node) else {
        return Ok(None);
    };
    let mut writer = locator.root.begin_entry(JournalType::Record);
    locator.write_segments(node, include_current, &mut writer)?;
    Ok(Some((locator.root, writer)))
}

/// Write `node`'s own segment: `Key` for a non-negative key, its custom
/// locator otherwise.
pub fn write_key_or_locator<N>(node: &N, writer: &mut JournalWriter) -> Result<()>
where
    N: StructuralNode + ?Sized,
{
    write_segment(node, node.key(), writer)
}

fn write_segment<N>(node: &N, key: i32, writer: &mut JournalWriter) -> Result<()>
where
    N: StructuralNode + ?Sized,
{
    match u32::try_from(key) {
        Ok(key) => {
            writer.write_key(key);
            Ok(())
        }
        Err(_) => node.write_locator(writer),
    }
}
