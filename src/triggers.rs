//! Trigger activation: turning a trigger node's discriminator and argument
//! bag into an executable side effect.
//!
//! Construction and execution are deliberately separate steps. The
//! [`TriggerRegistry`] builds a [`Trigger`] from a node (resolving argument
//! connections first, so externally-wired values override authoring-time
//! defaults); the engine executes it afterwards. That split keeps
//! construction failures (unknown discriminator, malformed arguments)
//! distinguishable from execution failures in the logs.
//!
//! The registry is an explicit map from a closed set of discriminator tags to
//! typed factory functions. Each factory deserializes its own argument
//! schema from the bag; there is no reflective field matching by name.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::graph::{ArgumentBag, SequenceGraph, TriggerNode};
use crate::providers::{ProviderRegistry, VariableStore};
use crate::resolve;

/// Errors raised while constructing or executing a trigger.
///
/// None of these cross the interpreter's boundary: the engine downgrades
/// them to log entries and treats the trigger as a no-op.
#[derive(Debug, Error, Diagnostic)]
pub enum TriggerError {
    /// The argument bag does not match the trigger kind's schema.
    #[error("trigger arguments do not match the {kind:?} schema: {source}")]
    #[diagnostic(code(taleflow::triggers::bad_arguments))]
    BadArguments {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// The side effect itself failed.
    #[error("trigger execution failed: {message}")]
    #[diagnostic(code(taleflow::triggers::execution))]
    Execution { message: String },
}

impl TriggerError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

/// An executable side effect, constructed but not yet invoked.
pub trait Trigger: fmt::Debug + Send {
    fn execute(&mut self) -> Result<(), TriggerError>;
}

type TriggerFactory =
    Box<dyn Fn(&ArgumentBag) -> Result<Box<dyn Trigger>, TriggerError> + Send + Sync>;

/// Explicit discriminator → factory map.
pub struct TriggerRegistry {
    factories: FxHashMap<String, TriggerFactory>,
}

impl TriggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Registry pre-populated with the built-in trigger kinds, with
    /// `set_variable` writes going to `vars`.
    #[must_use]
    pub fn with_builtins(vars: VariableStore) -> Self {
        let mut registry = Self::new();
        registry.register_typed::<NoteTrigger>("note");
        registry.register("set_variable", move |args| {
            let args: SetVariableArgs = from_bag("set_variable", args)?;
            Ok(Box::new(SetVariableTrigger {
                args,
                vars: vars.clone(),
            }))
        });
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ArgumentBag) -> Result<Box<dyn Trigger>, TriggerError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Register a kind whose argument schema *is* its trigger type: the bag
    /// is deserialized straight into `T`.
    pub fn register_typed<T>(&mut self, kind: impl Into<String>)
    where
        T: Trigger + DeserializeOwned + 'static,
    {
        let kind = kind.into();
        let schema_kind = kind.clone();
        self.register(kind, move |args| {
            let trigger: T = from_bag(&schema_kind, args)?;
            Ok(Box::new(trigger))
        });
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build the executable trigger for a node, or `None` when the node is
    /// not activatable (missing discriminator, unknown kind, construction
    /// failure). The caller decides how loudly to log a `None`.
    pub fn build(
        &self,
        node: &TriggerNode,
        graph: &SequenceGraph,
        providers: &ProviderRegistry,
    ) -> Option<Box<dyn Trigger>> {
        if node.kind.is_empty() {
            warn!("trigger node has no discriminator; skipping activation");
            return None;
        }

        // Wired values override authored defaults before construction.
        let bag = resolve::bind_arguments(node, graph, providers);

        let Some(factory) = self.factories.get(&node.kind) else {
            return None;
        };
        match factory(&bag) {
            Ok(trigger) => Some(trigger),
            Err(err) => {
                error!(kind = %node.kind, %err, "trigger construction failed");
                None
            }
        }
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn from_bag<T: DeserializeOwned>(kind: &str, bag: &ArgumentBag) -> Result<T, TriggerError> {
    let object = Value::Object(
        bag.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    );
    serde_json::from_value(object).map_err(|source| TriggerError::BadArguments {
        kind: kind.to_string(),
        source,
    })
}

/// Built-in `note` trigger: writes an authored remark to the log.
#[derive(Debug, serde::Deserialize)]
pub struct NoteTrigger {
    pub message: String,
}

impl Trigger for NoteTrigger {
    fn execute(&mut self) -> Result<(), TriggerError> {
        info!(message = %self.message, "note trigger");
        Ok(())
    }
}

#[derive(Debug, serde::Deserialize)]
struct SetVariableArgs {
    name: String,
    value: Value,
}

/// Built-in `set_variable` trigger: writes one entry of the shared
/// [`VariableStore`].
#[derive(Debug)]
pub struct SetVariableTrigger {
    args: SetVariableArgs,
    vars: VariableStore,
}

impl Trigger for SetVariableTrigger {
    fn execute(&mut self) -> Result<(), TriggerError> {
        self.vars.set(self.args.name.clone(), self.args.value.clone());
        Ok(())
    }
}
