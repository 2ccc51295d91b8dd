//! Data-node providers: the pluggable value producers behind `Data` nodes.
//!
//! A data node carries a discriminator string and a parameter bag; the
//! [`ProviderRegistry`] maps the discriminator to a [`DataProvider`]
//! implementation that answers named-port queries. The registry is an
//! explicit closed set with no reflective type-name construction: a
//! discriminator either resolves here or the connection stays unresolved.
//!
//! Providers receive the owning graph as read context so a producer may
//! consult other graph state. Port queries must not mutate anything.
//!
//! Two built-in kinds ship with the crate:
//!
//! - `constant`: echoes its `value` parameter.
//! - `variable`: reads a named entry from a shared [`VariableStore`], the
//!   external-game-state read path.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::graph::{ArgumentBag, SequenceGraph};
use crate::value::ValueType;

/// Name and declared type of one output port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub name: &'static str,
    pub ty: ValueType,
}

/// Read context handed to port queries.
#[derive(Clone, Copy)]
pub struct ProviderContext<'a> {
    pub graph: &'a SequenceGraph,
}

/// Contract implemented by every data-node kind.
pub trait DataProvider: Send + Sync {
    /// The named output ports this provider exposes, with type descriptors.
    fn ports(&self) -> &[PortSpec];

    /// Query one named port. `None` means "no value"; the consumer keeps its
    /// default and this is not an error.
    fn output(&self, port: &str, params: &ArgumentBag, ctx: ProviderContext<'_>) -> Option<Value>;
}

/// Explicit discriminator → provider map.
pub struct ProviderRegistry {
    providers: FxHashMap<String, Box<dyn DataProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: FxHashMap::default(),
        }
    }

    /// Registry pre-populated with the built-in provider kinds, with
    /// `variable` reads served from `vars`.
    #[must_use]
    pub fn with_builtins(vars: VariableStore) -> Self {
        let mut registry = Self::new();
        registry.register("constant", ConstantProvider);
        registry.register("variable", VariableProvider { vars });
        registry
    }

    pub fn register<P>(&mut self, kind: impl Into<String>, provider: P)
    where
        P: DataProvider + 'static,
    {
        self.providers.insert(kind.into(), Box::new(provider));
    }

    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&dyn DataProvider> {
        self.providers.get(kind).map(Box::as_ref)
    }

    /// Registered discriminators, for diagnostics.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared mutable game state readable by providers and writable by triggers.
///
/// This is deliberately the only mutable state the dataflow layer touches,
/// and it lives outside the graph: resolver reads never mutate node data.
#[derive(Clone, Default)]
pub struct VariableStore {
    inner: Arc<RwLock<FxHashMap<String, Value>>>,
}

impl VariableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.inner.write().insert(name.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStore")
            .field("entries", &self.len())
            .finish()
    }
}

/// Built-in `constant` provider: port `value` echoes the node's `value`
/// parameter.
struct ConstantProvider;

const CONSTANT_PORTS: [PortSpec; 1] = [PortSpec {
    name: "value",
    ty: ValueType::Text,
}];

impl DataProvider for ConstantProvider {
    fn ports(&self) -> &[PortSpec] {
        &CONSTANT_PORTS
    }

    fn output(&self, port: &str, params: &ArgumentBag, _ctx: ProviderContext<'_>) -> Option<Value> {
        if port != "value" {
            return None;
        }
        params.get("value").cloned()
    }
}

/// Built-in `variable` provider: port `value` reads the store entry named by
/// the node's `name` parameter.
struct VariableProvider {
    vars: VariableStore,
}

const VARIABLE_PORTS: [PortSpec; 1] = [PortSpec {
    name: "value",
    ty: ValueType::Text,
}];

impl DataProvider for VariableProvider {
    fn ports(&self) -> &[PortSpec] {
        &VARIABLE_PORTS
    }

    fn output(&self, port: &str, params: &ArgumentBag, _ctx: ProviderContext<'_>) -> Option<Value> {
        if port != "value" {
            return None;
        }
        let name = params.get("name").and_then(Value::as_str)?;
        self.vars.get(name)
    }
}
