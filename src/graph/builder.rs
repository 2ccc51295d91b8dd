//! Fluent construction of sequence graphs for tests and tooling.
//!
//! Shipped graphs come out of the external editor as serialized assets; the
//! builder exists so tests and in-process tools can assemble the same
//! structures without hand-writing JSON. `build()` runs the structural
//! validation the deserializer relies on.
//!
//! # Example
//!
//! ```rust
//! use taleflow::graph::SequenceGraphBuilder;
//! use taleflow::types::ScreenSide;
//!
//! let graph = SequenceGraphBuilder::new()
//!     .entry("greeting")
//!     .dialogue(
//!         "greeting",
//!         "narrator",
//!         "idle",
//!         ScreenSide::Left,
//!         "Hello there.",
//!         vec![],
//!     )
//!     .build()
//!     .expect("valid graph");
//!
//! assert_eq!(graph.len(), 2);
//! ```

use serde_json::Value;

use super::node::{
    ArgumentBag, ArgumentConnection, Connection, DataNode, DialogueNode, ExitLink, LogicNode, Node,
    StartNode, TriggerNode,
};
use super::{GraphError, SequenceGraph};
use crate::types::{ActorRef, NodeId, ScreenSide};

/// Builder for [`SequenceGraph`].
#[derive(Debug, Default)]
pub struct SequenceGraphBuilder {
    entries: Vec<(NodeId, Node)>,
}

impl SequenceGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the start node with `target` as the sequence entry.
    #[must_use]
    pub fn entry(self, target: impl Into<NodeId>) -> Self {
        self.start(vec![ExitLink {
            target: target.into(),
            label: None,
        }])
    }

    /// Add the start node with an explicit exit-link set.
    #[must_use]
    pub fn start(mut self, exits: Vec<ExitLink>) -> Self {
        self.entries
            .push((NodeId::start(), Node::Start(StartNode { exits })));
        self
    }

    #[must_use]
    pub fn dialogue(
        mut self,
        id: impl Into<NodeId>,
        speaker: impl Into<ActorRef>,
        pose: impl Into<String>,
        side: ScreenSide,
        text: impl Into<String>,
        exits: Vec<ExitLink>,
    ) -> Self {
        self.entries.push((
            id.into(),
            Node::Dialogue(DialogueNode {
                speaker: speaker.into(),
                pose: pose.into(),
                side,
                text: text.into(),
                exits,
            }),
        ));
        self
    }

    #[must_use]
    pub fn trigger(
        mut self,
        id: impl Into<NodeId>,
        kind: impl Into<String>,
        args: impl IntoIterator<Item = (&'static str, Value)>,
        exits: Vec<ExitLink>,
    ) -> Self {
        let args: ArgumentBag = args
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        self.entries.push((
            id.into(),
            Node::Trigger(TriggerNode {
                kind: kind.into(),
                args,
                arg_connections: vec![],
                exits,
            }),
        ));
        self
    }

    /// Wire a trigger argument field to a producer port. Applies to the most
    /// recently added trigger node.
    #[must_use]
    pub fn wire_argument(
        mut self,
        field: impl Into<String>,
        source_node: impl Into<NodeId>,
        source_port: impl Into<String>,
    ) -> Self {
        if let Some((_, Node::Trigger(trigger))) = self
            .entries
            .iter_mut()
            .rev()
            .find(|(_, node)| matches!(node, Node::Trigger(_)))
        {
            trigger.arg_connections.push(ArgumentConnection {
                field: field.into(),
                source: Connection::new(source_node, source_port),
            });
        }
        self
    }

    #[must_use]
    pub fn logic(
        mut self,
        id: impl Into<NodeId>,
        default: bool,
        condition: Option<Connection>,
        when_true: Vec<ExitLink>,
        when_false: Vec<ExitLink>,
    ) -> Self {
        self.entries.push((
            id.into(),
            Node::Logic(LogicNode {
                default,
                condition,
                when_true,
                when_false,
            }),
        ));
        self
    }

    #[must_use]
    pub fn data(
        mut self,
        id: impl Into<NodeId>,
        kind: impl Into<String>,
        params: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Self {
        let params: ArgumentBag = params
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        self.entries.push((
            id.into(),
            Node::Data(DataNode {
                kind: kind.into(),
                params,
            }),
        ));
        self
    }

    /// Escape hatch for node records built elsewhere.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeId>, node: Node) -> Self {
        self.entries.push((id.into(), node));
        self
    }

    /// Validate and produce the graph.
    pub fn build(self) -> Result<SequenceGraph, GraphError> {
        SequenceGraph::from_entries(self.entries)
    }
}
