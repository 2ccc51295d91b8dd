//! Node model for sequence graphs.
//!
//! A sequence graph is authored in an external editor and persisted as an
//! asset; by the time the interpreter sees it, it has been deserialized into
//! the plain data records defined here. Nodes come in five kinds, folded into
//! the [`Node`] sum type so the container can store and look them up
//! uniformly:
//!
//! - **Start**: the mandatory entry point (fixed id, first exit link is the
//!   sequence's true entry).
//! - **Dialogue**: one spoken line plus presentation hints.
//! - **Trigger**: a side effect, identified by a discriminator string and
//!   configured through an argument bag.
//! - **Logic**: a boolean branch with a stored default and an optional
//!   dataflow-driven condition.
//! - **Data**: a value producer exposing named output ports.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::{ActorRef, NodeId, ScreenSide};

/// Typed key→value record carried by trigger and data nodes.
pub type ArgumentBag = FxHashMap<String, serde_json::Value>;

/// Directed edge to the next node.
///
/// `label` is reserved for a future multi-choice UI and is ignored by the
/// interpreter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExitLink {
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ExitLink {
    pub fn to(target: impl Into<NodeId>) -> Self {
        Self {
            target: target.into(),
            label: None,
        }
    }

    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A wire from a consumer slot to a producer data node's named output port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub node: NodeId,
    pub port: String,
}

impl Connection {
    pub fn new(node: impl Into<NodeId>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

/// Binding of one trigger argument field to a producer port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentConnection {
    pub field: String,
    pub source: Connection,
}

/// The mandatory entry point. Exactly one per graph, under the fixed id.
///
/// Only the first exit link is honored; it is the sequence's true entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartNode {
    #[serde(default)]
    pub exits: Vec<ExitLink>,
}

/// One spoken line plus the hints the presentation layer needs to stage it.
///
/// Multiple exit links are carried for a choice UI that does not exist yet;
/// the interpreter always follows the first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub speaker: ActorRef,
    pub pose: String,
    pub side: ScreenSide,
    pub text: String,
    #[serde(default)]
    pub exits: Vec<ExitLink>,
}

/// A side effect: discriminator selects the concrete trigger implementation,
/// the argument bag configures it, and argument connections let producer
/// nodes override authoring-time defaults at visit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerNode {
    pub kind: String,
    #[serde(default)]
    pub args: ArgumentBag,
    #[serde(default)]
    pub arg_connections: Vec<ArgumentConnection>,
    #[serde(default)]
    pub exits: Vec<ExitLink>,
}

/// A boolean branch. The condition comes from the connected producer when one
/// is wired and convertible, otherwise from the stored default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogicNode {
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Connection>,
    #[serde(default)]
    pub when_true: Vec<ExitLink>,
    #[serde(default)]
    pub when_false: Vec<ExitLink>,
}

/// A value producer. The discriminator selects a registered
/// [`DataProvider`](crate::providers::DataProvider); `params` configures it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    pub kind: String,
    #[serde(default)]
    pub params: ArgumentBag,
}

/// One node of a sequence graph, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind_tag", rename_all = "snake_case")]
pub enum Node {
    Start(StartNode),
    Dialogue(DialogueNode),
    Trigger(TriggerNode),
    Logic(LogicNode),
    Data(DataNode),
}

impl Node {
    /// Human-readable kind name, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Start(_) => "start",
            Node::Dialogue(_) => "dialogue",
            Node::Trigger(_) => "trigger",
            Node::Logic(_) => "logic",
            Node::Data(_) => "data",
        }
    }

    /// The unconditional exit links of this node.
    ///
    /// Logic nodes branch and have no unconditional set; Data nodes are not
    /// part of the control flow at all. Both report an empty slice.
    #[must_use]
    pub fn exits(&self) -> &[ExitLink] {
        match self {
            Node::Start(n) => &n.exits,
            Node::Dialogue(n) => &n.exits,
            Node::Trigger(n) => &n.exits,
            Node::Logic(_) | Node::Data(_) => &[],
        }
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Node::Start(_))
    }

    #[must_use]
    pub fn as_data(&self) -> Option<&DataNode> {
        match self {
            Node::Data(n) => Some(n),
            _ => None,
        }
    }
}
