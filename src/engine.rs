//! The traversal/execution state machine.
//!
//! The engine advances a cursor across the graph, dispatching on node kind:
//! trigger and logic nodes are processed synchronously inside one
//! [`Engine::advance`] call, dialogue nodes suspend by returning an
//! [`EngineStep::Line`] for the playback layer to present, and every dead
//! end (no exit links, dangling link target, unexecutable node kind) lands
//! in the absorbing [`EngineState::Terminal`] state.
//!
//! All "cannot find target" and "no exit" paths end the session the same
//! way; they differ only in their log message, not in control flow.
//!
//! There is no cycle detection: a trigger/logic loop with no dialogue in it
//! will spin inside a single `advance` call, which preserves the authored
//! semantics rather than inventing a step limit.

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::graph::{ExitLink, Node, SequenceGraph};
use crate::providers::ProviderRegistry;
use crate::resolve;
use crate::triggers::TriggerRegistry;
use crate::types::{ActorRef, NodeId, ScreenSide};

/// Where the cursor currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    AtStart,
    AtTrigger,
    AtLogic,
    AtDialogue,
    /// Absorbing: once terminal, every `advance` reports `Finished`.
    Terminal,
}

/// One dialogue line, lifted out of the graph for presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct DialogueLine {
    pub speaker: ActorRef,
    pub pose: String,
    pub side: ScreenSide,
    pub text: String,
}

/// What an [`Engine::advance`] call produced.
#[derive(Debug, PartialEq)]
pub enum EngineStep {
    /// Traversal reached a dialogue node; present this line, then call
    /// `advance` again to continue past it.
    Line(DialogueLine),
    /// Traversal reached the terminal state; the session is over.
    Finished,
}

/// Node-kind-dispatching traversal over one sequence graph.
pub struct Engine {
    graph: Arc<SequenceGraph>,
    triggers: Arc<TriggerRegistry>,
    providers: Arc<ProviderRegistry>,
    state: EngineState,
    cursor: Option<NodeId>,
    /// Set when the cursor just arrived at a dialogue node and its line has
    /// not been handed out yet.
    dialogue_pending: bool,
}

impl Engine {
    #[must_use]
    pub fn new(
        graph: Arc<SequenceGraph>,
        triggers: Arc<TriggerRegistry>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            graph,
            triggers,
            providers,
            state: EngineState::AtStart,
            cursor: None,
            dialogue_pending: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current cursor position, once traversal has left the start node.
    #[must_use]
    pub fn cursor(&self) -> Option<&NodeId> {
        self.cursor.as_ref()
    }

    /// Run the traversal until the next suspension point.
    ///
    /// Trigger and logic chains contain no yield points and are executed to
    /// completion within this call.
    pub fn advance(&mut self) -> EngineStep {
        loop {
            match self.state {
                EngineState::Terminal => return EngineStep::Finished,
                EngineState::AtStart => {
                    let Some(start) = self.graph.start() else {
                        error!("sequence graph has no start node");
                        self.state = EngineState::Terminal;
                        return EngineStep::Finished;
                    };
                    let Some(link) = start.exits.first() else {
                        warn!("start node has no connections");
                        self.state = EngineState::Terminal;
                        return EngineStep::Finished;
                    };
                    let target = link.target.clone();
                    // Start dead ends are warnings, like a missing exit set;
                    // only mid-traversal dangling links log as errors.
                    if self.graph.node(&target).is_none() {
                        warn!(target = %target, "cannot find next node");
                        self.state = EngineState::Terminal;
                        return EngineStep::Finished;
                    }
                    if !self.goto(&target) {
                        return EngineStep::Finished;
                    }
                }
                EngineState::AtDialogue => {
                    if self.dialogue_pending {
                        self.dialogue_pending = false;
                        let line = self.current_line();
                        debug!(node = ?self.cursor, "suspending at dialogue");
                        return EngineStep::Line(line);
                    }
                    // Resumed past the line: follow the first exit link.
                    // Extra links are reserved for a choice UI and ignored.
                    let exits = self.current_exits();
                    if !self.follow_first(&exits) {
                        return EngineStep::Finished;
                    }
                }
                EngineState::AtTrigger => {
                    self.run_current_trigger();
                    let exits = self.current_exits();
                    if !self.follow_first(&exits) {
                        return EngineStep::Finished;
                    }
                }
                EngineState::AtLogic => {
                    let exits = self.current_branch();
                    if !self.follow_first(&exits) {
                        return EngineStep::Finished;
                    }
                }
            }
        }
    }

    /// Move the cursor to `target` and dispatch on its kind. Returns `false`
    /// when traversal terminated instead.
    fn goto(&mut self, target: &NodeId) -> bool {
        let Some(node) = self.graph.node(target) else {
            error!(target = %target, "cannot find next node");
            self.state = EngineState::Terminal;
            return false;
        };
        self.state = match node {
            Node::Dialogue(_) => {
                self.dialogue_pending = true;
                EngineState::AtDialogue
            }
            Node::Trigger(_) => EngineState::AtTrigger,
            Node::Logic(_) => EngineState::AtLogic,
            Node::Start(_) | Node::Data(_) => {
                error!(
                    target = %target,
                    kind = node.kind_name(),
                    "node kind is not executable"
                );
                self.state = EngineState::Terminal;
                return false;
            }
        };
        self.cursor = Some(target.clone());
        true
    }

    /// Follow the first link of an exit set, terminating on empty sets and
    /// dangling targets.
    fn follow_first(&mut self, exits: &[ExitLink]) -> bool {
        let Some(link) = exits.first() else {
            warn!(node = ?self.cursor, "end of graph");
            self.state = EngineState::Terminal;
            return false;
        };
        let target = link.target.clone();
        self.goto(&target)
    }

    fn current_node(&self) -> &Node {
        let id = self.cursor.as_ref().expect("cursor set after start");
        self.graph.node(id).expect("cursor points at a live node")
    }

    fn current_exits(&self) -> Vec<ExitLink> {
        self.current_node().exits().to_vec()
    }

    fn current_line(&self) -> DialogueLine {
        match self.current_node() {
            Node::Dialogue(node) => DialogueLine {
                speaker: node.speaker.clone(),
                pose: node.pose.clone(),
                side: node.side,
                text: node.text.clone(),
            },
            other => unreachable!("AtDialogue cursor on {} node", other.kind_name()),
        }
    }

    /// Build and execute the trigger under the cursor. A trigger that cannot
    /// be built or fails mid-execution is a logged no-op; traversal proceeds
    /// either way.
    fn run_current_trigger(&self) {
        let Node::Trigger(node) = self.current_node() else {
            unreachable!("AtTrigger cursor on non-trigger node");
        };
        match self.triggers.build(node, &self.graph, &self.providers) {
            Some(mut trigger) => {
                debug!(kind = %node.kind, "executing trigger");
                if let Err(err) = trigger.execute() {
                    error!(kind = %node.kind, %err, "trigger execution failed");
                }
            }
            None => {
                warn!(kind = %node.kind, "trigger could not be activated; continuing");
            }
        }
    }

    /// Evaluate the logic condition and return the chosen branch's exit set.
    fn current_branch(&self) -> Vec<ExitLink> {
        let Node::Logic(node) = self.current_node() else {
            unreachable!("AtLogic cursor on non-logic node");
        };
        let condition = resolve::resolve_condition(node, &self.graph, &self.providers);
        debug!(node = ?self.cursor, condition, "logic branch chosen");
        if condition {
            node.when_true.clone()
        } else {
            node.when_false.clone()
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .finish()
    }
}
