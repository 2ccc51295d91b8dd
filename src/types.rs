//! Core identifier and presentation-slot types for the taleflow interpreter.
//!
//! These are the fundamental domain concepts shared by every module: node
//! identity within a sequence graph, actor references into the external
//! asset catalogue, and the enumerated screen slots dialogue is rendered
//! into.
//!
//! # Examples
//!
//! ```rust
//! use taleflow::types::{NodeId, ScreenSide, START_NODE_ID};
//!
//! let id: NodeId = "intro_line".into();
//! assert_eq!(id.as_str(), "intro_line");
//!
//! let start = NodeId::start();
//! assert_eq!(start.as_str(), START_NODE_ID);
//!
//! assert_ne!(ScreenSide::Left, ScreenSide::Right);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed, well-known identifier of the single start node every sequence
/// graph must contain.
pub const START_NODE_ID: &str = "__start__";

/// Stable identifier of a node, unique within its owning graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id of the mandatory entry-point node.
    #[must_use]
    pub fn start() -> Self {
        Self(START_NODE_ID.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the fixed start-node id.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.0 == START_NODE_ID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Developer experience: allow string literals where a NodeId is expected.
impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to an actor in the external asset catalogue.
///
/// The interpreter never dereferences this beyond handing it to the
/// presentation layer, which resolves it to a model prefab and pose clips.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorRef(String);

impl ActorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Enumerated presentation slot a dialogue line is rendered into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenSide {
    Left,
    Right,
}

impl ScreenSide {
    /// All sides, in presentation order.
    pub const ALL: [ScreenSide; 2] = [ScreenSide::Left, ScreenSide::Right];
}

impl fmt::Display for ScreenSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}
