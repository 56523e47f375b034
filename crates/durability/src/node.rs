//! Structural node capability and graph links.
//!
//! Every journaled node embeds a [`NodeLinks`] holding three lookup links:
//! a weak reference to its parent, a weak reference to the graph root and
//! the node's key within its parent. Ownership of the graph is top-down and
//! lives in the application's own types; these links never keep anything
//! alive.
//!
//! Links are assigned by [`attach_to_root`] / [`attach_child`] and cleared
//! by [`detach`]. Attaching propagates the root to every descendant the node
//! reports through [`StructuralNode::children`].

use crate::journal::JournalWriter;
use crate::root::StructuralRoot;
use arbor_codec::ByteReader;
use arbor_core::{Result, NO_KEY};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Upper bound on ancestor and descendant walks.
///
/// Real graphs are far shallower; a walk that reaches this depth is
/// following a cycle and fails closed.
pub const MAX_WALK_DEPTH: usize = 1 << 16;

/// Point-in-time copy of a node's links
#[derive(Clone)]
pub struct LinkState {
    /// Enclosing node, if any
    pub parent: Option<Weak<dyn StructuralNode>>,
    /// Graph root, if attached
    pub root: Option<Weak<dyn StructuralRoot>>,
    /// Index within the parent, or [`NO_KEY`]
    pub key: i32,
}

impl Default for LinkState {
    fn default() -> Self {
        LinkState {
            parent: None,
            root: None,
            key: NO_KEY,
        }
    }
}

impl fmt::Debug for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkState")
            .field("has_parent", &self.parent.is_some())
            .field("has_root", &self.root.is_some())
            .field("key", &self.key)
            .finish()
    }
}

/// Parent/root/key links of one node
#[derive(Debug, Default)]
pub struct NodeLinks {
    state: RwLock<LinkState>,
}

impl NodeLinks {
    /// Unattached links
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current links, taken under one read lock
    pub fn snapshot(&self) -> LinkState {
        self.state.read().clone()
    }

    /// Live parent, if any
    pub fn parent(&self) -> Option<Arc<dyn StructuralNode>> {
        self.state.read().parent.as_ref()?.upgrade()
    }

    /// Live root, if any
    pub fn root(&self) -> Option<Arc<dyn StructuralRoot>> {
        self.state.read().root.as_ref()?.upgrade()
    }

    /// Key within the parent
    pub fn key(&self) -> i32 {
        self.state.read().key
    }

    /// Whether a root link is recorded (it may be dead)
    pub fn is_attached(&self) -> bool {
        self.state.read().root.is_some()
    }

    fn set(&self, links: LinkState) {
        *self.state.write() = links;
    }

    fn set_root(&self, root: Option<Weak<dyn StructuralRoot>>) {
        self.state.write().root = root;
    }
}

/// A member of a journaled object graph.
///
/// Implementors supply their links and the replay entry point; locator and
/// prefix hooks have no-op defaults. The ancestor walk and the record
/// helpers are free functions over this trait.
pub trait StructuralNode: Send + Sync {
    /// The node's graph links.
    fn links(&self) -> &NodeLinks;

    /// Apply one record whose payload starts at `reader`.
    ///
    /// The reader is positioned at this node's part of the locator path: a
    /// node with children reads the next segment and delegates, a leaf reads
    /// the terminal marker and applies it.
    fn read_record(&self, reader: &mut ByteReader<'_>) -> Result<()>;

    /// Write custom addressing for a node whose key is negative.
    ///
    /// An override must emit a `Locator` marker first, usually through
    /// [`JournalWriter::write_locator`]. The default writes nothing, so the
    /// node shares its parent's address.
    fn write_locator(&self, _writer: &mut JournalWriter) -> Result<()> {
        Ok(())
    }

    /// Write per-record prefix data ahead of the terminal marker.
    fn write_record_prefix(&self, _writer: &mut JournalWriter) -> Result<()> {
        Ok(())
    }

    /// Direct children, for root propagation on attach.
    fn children(&self) -> Vec<Arc<dyn StructuralNode>> {
        Vec::new()
    }

    /// Live parent, if any.
    fn parent(&self) -> Option<Arc<dyn StructuralNode>> {
        self.links().parent()
    }

    /// Live root, if any.
    fn root(&self) -> Option<Arc<dyn StructuralRoot>> {
        self.links().root()
    }

    /// Key within the parent.
    fn key(&self) -> i32 {
        self.links().key()
    }
}

/// Make `node` a top-level member of the graph owned by `root`.
///
/// The node's key is kept as-is. A non-negative key is written as the
/// first segment of every locator in the graph.
pub fn attach_to_root<R>(node: &dyn StructuralNode, root: &Arc<R>)
where
    R: StructuralRoot + 'static,
{
    let weak: Weak<R> = Arc::downgrade(root);
    attach_to_root_weak(node, weak);
}

/// [`attach_to_root`] for a type-erased root.
pub fn attach_to_root_dyn(node: &dyn StructuralNode, root: &Arc<dyn StructuralRoot>) {
    attach_to_root_weak(node, Arc::downgrade(root));
}

fn attach_to_root_weak(node: &dyn StructuralNode, root: Weak<dyn StructuralRoot>) {
    let key = node.links().key();
    node.links().set(LinkState {
        parent: None,
        root: Some(root.clone()),
        key,
    });
    propagate_root(node, Some(root));
}

/// Insert `child` under `parent` at `key`.
///
/// The child inherits the parent's root, and so do its descendants.
pub fn attach_child<P>(child: &dyn StructuralNode, parent: &Arc<P>, key: i32)
where
    P: StructuralNode + 'static,
{
    let weak: Weak<P> = Arc::downgrade(parent);
    attach_child_weak(child, weak, parent.links().snapshot().root, key);
}

/// [`attach_child`] for a type-erased parent.
pub fn attach_child_dyn(child: &dyn StructuralNode, parent: &Arc<dyn StructuralNode>, key: i32) {
    attach_child_weak(
        child,
        Arc::downgrade(parent),
        parent.links().snapshot().root,
        key,
    );
}

fn attach_child_weak(
    child: &dyn StructuralNode,
    parent: Weak<dyn StructuralNode>,
    root: Option<Weak<dyn StructuralRoot>>,
    key: i32,
) {
    child.links().set(LinkState {
        parent: Some(parent),
        root: root.clone(),
        key,
    });
    propagate_root(child, root);
}

/// Remove `node` from its graph.
///
/// Clears the node's links and the root link of its descendants. Journaling
/// from any of them is a no-op until they are attached again.
pub fn detach(node: &dyn StructuralNode) {
    node.links().set(LinkState::default());
    propagate_root(node, None);
}

fn propagate_root(node: &dyn StructuralNode, root: Option<Weak<dyn StructuralRoot>>) {
    let mut stack: Vec<(Arc<dyn StructuralNode>, usize)> =
        node.children().into_iter().map(|child| (child, 1)).collect();

    while let Some((current, depth)) = stack.pop() {
        current.links().set_root(root.clone());
        if depth < MAX_WALK_DEPTH {
            stack.extend(
                current
                    .children()
                    .into_iter()
                    .map(|child| (child, depth + 1)),
            );
        }
    }
}
