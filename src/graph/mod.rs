//! Sequence graph container: node storage, validation, and id lookup.
//!
//! The graph is an arena of [`Node`]s keyed by [`NodeId`]. Lookup goes
//! through a lazily rebuilt index; the index is invalidated by a
//! monotonically increasing version counter that every structural mutation
//! bumps, so same-size add/remove pairs are detected just as reliably as
//! growth.
//!
//! The runtime contract is read-only: a loaded graph is handed to a playback
//! session as `Arc<SequenceGraph>` and never mutated for the session's
//! duration. The mutation API exists for the authoring side
//! ([`SequenceGraphBuilder`]) and for tools.
//!
//! Dangling exit links are *not* structural errors here; they are a runtime
//! terminal condition handled by the engine.

pub mod builder;
pub mod node;


pub use builder::SequenceGraphBuilder;
pub use node::{
    ArgumentBag, ArgumentConnection, Connection, DataNode, DialogueNode, ExitLink, LogicNode, Node,
    StartNode, TriggerNode,
};

use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::types::{NodeId, START_NODE_ID};

/// Errors raised when assembling or validating a sequence graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The graph has no start node under the fixed id.
    #[error("graph has no start node (expected id {START_NODE_ID:?})")]
    #[diagnostic(
        code(taleflow::graph::missing_start),
        help("Every sequence graph needs exactly one start node under the well-known id.")
    )]
    MissingStart,

    /// A start node was registered under an id other than the fixed one.
    #[error("start node registered under foreign id {id:?}")]
    #[diagnostic(code(taleflow::graph::foreign_start_id))]
    ForeignStartId { id: NodeId },

    /// Two nodes share the same id.
    #[error("duplicate node id {id:?}")]
    #[diagnostic(code(taleflow::graph::duplicate_node))]
    DuplicateNode { id: NodeId },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct NodeEntry {
    id: NodeId,
    #[serde(flatten)]
    node: Node,
}

#[derive(Default)]
struct IndexCache {
    by_id: FxHashMap<NodeId, usize>,
    built_version: u64,
}

/// An authored narrative sequence: all nodes of one graph, with uniform
/// id-keyed lookup across every kind including the start node.
#[derive(Serialize, Deserialize)]
pub struct SequenceGraph {
    nodes: Vec<NodeEntry>,
    // Starts at 1 so a freshly deserialized graph never matches the zeroed
    // index cache.
    #[serde(skip, default = "initial_version")]
    version: AtomicU64,
    #[serde(skip)]
    index: Mutex<IndexCache>,
}

fn initial_version() -> AtomicU64 {
    AtomicU64::new(1)
}

impl SequenceGraph {
    pub(crate) fn from_entries(entries: Vec<(NodeId, Node)>) -> Result<Self, GraphError> {
        let graph = Self {
            nodes: entries
                .into_iter()
                .map(|(id, node)| NodeEntry { id, node })
                .collect(),
            version: initial_version(),
            index: Mutex::new(IndexCache::default()),
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Check the structural invariants: unique ids, exactly one start node,
    /// start node under the fixed id.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen: FxHashSet<&NodeId> = FxHashSet::default();
        let mut start_found = false;
        for entry in &self.nodes {
            if !seen.insert(&entry.id) {
                return Err(GraphError::DuplicateNode {
                    id: entry.id.clone(),
                });
            }
            if entry.node.is_start() {
                if !entry.id.is_start() {
                    return Err(GraphError::ForeignStartId {
                        id: entry.id.clone(),
                    });
                }
                start_found = true;
            }
        }
        if !start_found {
            return Err(GraphError::MissingStart);
        }
        Ok(())
    }

    /// Uniform lookup across all node kinds, including the start node.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        let mut cache = self.index.lock();
        let version = self.version.load(Ordering::Acquire);
        if cache.built_version != version {
            cache.by_id = self
                .nodes
                .iter()
                .enumerate()
                .map(|(i, entry)| (entry.id.clone(), i))
                .collect();
            cache.built_version = version;
        }
        cache.by_id.get(id).map(|&i| &self.nodes[i].node)
    }

    /// Narrow lookup used by the dataflow resolver.
    #[must_use]
    pub fn data_node(&self, id: &NodeId) -> Option<&DataNode> {
        self.node(id).and_then(Node::as_data)
    }

    /// The mandatory entry-point node.
    ///
    /// Validation at construction guarantees presence; a graph that lost its
    /// start node through later mutation surfaces here.
    #[must_use]
    pub fn start(&self) -> Option<&StartNode> {
        match self.node(&NodeId::start()) {
            Some(Node::Start(start)) => Some(start),
            _ => None,
        }
    }

    /// Number of nodes in the graph, all kinds combined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over `(id, node)` pairs in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter().map(|entry| (&entry.id, &entry.node))
    }

    /// Current structural version. Bumped on every mutation; the lookup index
    /// compares against it instead of collection sizes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Insert or replace a node (authoring/tooling API, not part of the
    /// runtime contract).
    pub fn insert(&mut self, id: impl Into<NodeId>, node: Node) {
        let id = id.into();
        if let Some(existing) = self.nodes.iter_mut().find(|entry| entry.id == id) {
            existing.node = node;
        } else {
            self.nodes.push(NodeEntry { id, node });
        }
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    /// Remove a node by id, returning it if present.
    pub fn remove(&mut self, id: &NodeId) -> Option<Node> {
        let position = self.nodes.iter().position(|entry| &entry.id == id)?;
        let entry = self.nodes.remove(position);
        self.version.fetch_add(1, Ordering::AcqRel);
        Some(entry.node)
    }
}

impl std::fmt::Debug for SequenceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceGraph")
            .field("nodes", &self.nodes.len())
            .field("version", &self.version())
            .finish()
    }
}

impl Clone for SequenceGraph {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            version: AtomicU64::new(1),
            index: Mutex::new(IndexCache::default()),
        }
    }
}
