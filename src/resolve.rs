//! Dataflow resolution: bridging connections to strongly-typed consumer
//! slots.
//!
//! Two call sites use this module: logic-node condition evaluation and
//! trigger argument binding. Both share the same fallback policy: anything
//! that cannot be resolved or converted leaves the consumer's authored
//! default in place, with at most a warning in the log. Resolution never
//! fails traversal.

use serde_json::Value;
use tracing::warn;

use crate::graph::{ArgumentBag, Connection, LogicNode, SequenceGraph, TriggerNode};
use crate::providers::{ProviderContext, ProviderRegistry};
use crate::value::{self, ValueType};

/// Resolve one connection against its producer, converting toward the
/// consumer's declared type.
///
/// Returns `None` (and the caller keeps its default) when the producer is
/// missing, the port yields nothing, or conversion fails. Boolean producer
/// values skip conversion entirely.
pub fn resolve_connection(
    connection: &Connection,
    target: ValueType,
    graph: &SequenceGraph,
    providers: &ProviderRegistry,
) -> Option<Value> {
    let Some(data_node) = graph.data_node(&connection.node) else {
        warn!(
            node = %connection.node,
            port = %connection.port,
            "dataflow connection points at a missing data node; keeping default"
        );
        return None;
    };

    let Some(provider) = providers.get(&data_node.kind) else {
        let registered: Vec<&str> = providers.kinds().collect();
        warn!(
            node = %connection.node,
            provider_kind = %data_node.kind,
            ?registered,
            "no provider registered for data node kind; keeping default"
        );
        return None;
    };

    let produced = provider.output(
        &connection.port,
        &data_node.params,
        ProviderContext { graph },
    )?;

    // Booleans pass through untouched; same-typed values need no work.
    if produced.is_boolean() || ValueType::of(&produced) == Some(target) {
        return Some(produced);
    }

    match value::coerce(&produced, target) {
        Ok(converted) => Some(converted),
        Err(err) => {
            warn!(
                node = %connection.node,
                port = %connection.port,
                %err,
                "produced value does not convert to the consumer type; keeping default"
            );
            None
        }
    }
}

/// Evaluate a logic node's condition: the connected value when present and
/// convertible, the stored default otherwise.
pub fn resolve_condition(
    logic: &LogicNode,
    graph: &SequenceGraph,
    providers: &ProviderRegistry,
) -> bool {
    let Some(connection) = &logic.condition else {
        return logic.default;
    };
    match resolve_connection(connection, ValueType::Bool, graph, providers) {
        Some(resolved) => value::to_bool(&resolved).unwrap_or_else(|err| {
            warn!(%err, "condition value is not truthy-convertible; using default");
            logic.default
        }),
        None => logic.default,
    }
}

/// Produce the argument bag a trigger is constructed with: the authored
/// defaults, overridden field-by-field by whatever the wired producers yield.
///
/// Binding is a one-shot copy per node visit; nothing is written back to the
/// graph asset.
pub fn bind_arguments(
    trigger: &TriggerNode,
    graph: &SequenceGraph,
    providers: &ProviderRegistry,
) -> ArgumentBag {
    let mut bag = trigger.args.clone();
    for binding in &trigger.arg_connections {
        let Some(default) = bag.get(&binding.field) else {
            warn!(
                field = %binding.field,
                trigger_kind = %trigger.kind,
                "argument connection targets a field the trigger does not declare; skipping"
            );
            continue;
        };
        // The field's declared type is the type of its authored default.
        // Untypable defaults (null, structured) accept whatever is produced.
        let target = ValueType::of(default).unwrap_or(ValueType::Text);
        if let Some(resolved) = resolve_connection(&binding.source, target, graph, providers) {
            bag.insert(binding.field.clone(), resolved);
        }
    }
    bag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ArgumentConnection, ExitLink, SequenceGraphBuilder};
    use crate::providers::VariableStore;
    use serde_json::json;

    fn providers() -> ProviderRegistry {
        ProviderRegistry::with_builtins(VariableStore::new())
    }

    #[test]
    fn missing_producer_keeps_default() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .build()
            .expect("valid graph");
        let connection = Connection::new("gone", "value");
        assert_eq!(
            resolve_connection(&connection, ValueType::Bool, &graph, &providers()),
            None
        );
    }

    #[test]
    fn unregistered_provider_kind_keeps_default() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .data("feed", "telemetry_feed", [("value", json!(1))])
            .build()
            .expect("valid graph");
        let connection = Connection::new("feed", "value");
        assert_eq!(
            resolve_connection(&connection, ValueType::Integer, &graph, &providers()),
            None
        );
    }

    #[test]
    fn condition_falls_back_to_default_without_a_connection() {
        let logic = LogicNode {
            default: true,
            condition: None,
            when_true: vec![ExitLink::to("a")],
            when_false: vec![],
        };
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .build()
            .expect("valid graph");
        assert!(resolve_condition(&logic, &graph, &providers()));
    }

    #[test]
    fn string_true_flips_a_false_default() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .data("flag", "constant", [("value", json!("true"))])
            .build()
            .expect("valid graph");
        let logic = LogicNode {
            default: false,
            condition: Some(Connection::new("flag", "value")),
            when_true: vec![],
            when_false: vec![],
        };
        assert!(resolve_condition(&logic, &graph, &providers()));
    }

    #[test]
    fn unconvertible_condition_value_keeps_default() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .data("noise", "constant", [("value", json!("not a bool"))])
            .build()
            .expect("valid graph");
        let logic = LogicNode {
            default: true,
            condition: Some(Connection::new("noise", "value")),
            when_true: vec![],
            when_false: vec![],
        };
        assert!(resolve_condition(&logic, &graph, &providers()));
    }

    #[test]
    fn bound_arguments_override_authored_defaults() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .data("volume", "constant", [("value", json!("11"))])
            .build()
            .expect("valid graph");
        let trigger = TriggerNode {
            kind: "note".into(),
            args: [("level".to_string(), json!(3))].into_iter().collect(),
            arg_connections: vec![ArgumentConnection {
                field: "level".into(),
                source: Connection::new("volume", "value"),
            }],
            exits: vec![],
        };
        let bag = bind_arguments(&trigger, &graph, &providers());
        // "11" converted toward the integer default.
        assert_eq!(bag.get("level"), Some(&json!(11)));
    }

    #[test]
    fn failed_override_leaves_the_field_untouched() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .data("noise", "constant", [("value", json!("eleven"))])
            .build()
            .expect("valid graph");
        let trigger = TriggerNode {
            kind: "note".into(),
            args: [("level".to_string(), json!(3))].into_iter().collect(),
            arg_connections: vec![ArgumentConnection {
                field: "level".into(),
                source: Connection::new("noise", "value"),
            }],
            exits: vec![],
        };
        let bag = bind_arguments(&trigger, &graph, &providers());
        assert_eq!(bag.get("level"), Some(&json!(3)));
    }

    #[test]
    fn connections_to_undeclared_fields_are_skipped() {
        let graph = SequenceGraphBuilder::new()
            .start(vec![])
            .data("volume", "constant", [("value", json!(1))])
            .build()
            .expect("valid graph");
        let trigger = TriggerNode {
            kind: "note".into(),
            args: ArgumentBag::default(),
            arg_connections: vec![ArgumentConnection {
                field: "ghost".into(),
                source: Connection::new("volume", "value"),
            }],
            exits: vec![],
        };
        let bag = bind_arguments(&trigger, &graph, &providers());
        assert!(bag.is_empty());
    }
}
