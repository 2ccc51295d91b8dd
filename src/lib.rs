//! # Taleflow: narrative-graph interpreter
//!
//! Taleflow walks a directed graph of dialogue lines, branch conditions, and
//! side-effect triggers, resolves typed values flowing between nodes, and
//! drives a presentation layer (text reveal, actor visibility, fades)
//! through a frame-stepped, suspendable playback loop.
//!
//! ## Core concepts
//!
//! - **Nodes**: plain data records in five kinds (start, dialogue, trigger,
//!   logic, data) stored in one [`graph::SequenceGraph`] arena.
//! - **Dataflow**: logic conditions and trigger arguments may be wired to a
//!   data node's named output port; [`resolve`] bridges the connection with
//!   a keep-default fallback on every failure.
//! - **Triggers**: side effects built from a closed discriminator registry
//!   and executed by the engine, construction and execution kept separate.
//! - **Engine**: a node-kind-dispatching state machine that runs
//!   trigger/logic chains synchronously and suspends at dialogue lines.
//! - **Playback**: one active session at a time, advanced by `tick(dt)`
//!   through fade-in, reveal, wait-for-continue, and fade-out phases.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taleflow::graph::SequenceGraphBuilder;
//! use taleflow::playback::{PlaybackController, SessionSlot};
//! use taleflow::providers::{ProviderRegistry, VariableStore};
//! use taleflow::stage::MemoryStage;
//! use taleflow::triggers::TriggerRegistry;
//! use taleflow::types::ScreenSide;
//!
//! let graph = SequenceGraphBuilder::new()
//!     .entry("hello")
//!     .dialogue("hello", "rin", "idle", ScreenSide::Left, "Hi!", vec![])
//!     .build()
//!     .expect("valid graph");
//!
//! let vars = VariableStore::new();
//! let stage = MemoryStage::new();
//! let mut controller = PlaybackController::new(
//!     stage.clone(),
//!     Arc::new(TriggerRegistry::with_builtins(vars.clone())),
//!     Arc::new(ProviderRegistry::with_builtins(vars)),
//! )
//! .with_slot(SessionSlot::new());
//!
//! assert!(controller.start_session(Arc::new(graph)));
//! while controller.session_active() {
//!     controller.tick(Duration::from_millis(16));
//!     controller.signal_continue(true);
//! }
//! assert_eq!(stage.last_text(ScreenSide::Left), Some("Hi!".to_string()));
//! ```

pub mod engine;
pub mod events;
pub mod graph;
pub mod playback;
pub mod providers;
pub mod resolve;
pub mod stage;
pub mod telemetry;
pub mod triggers;
pub mod types;
pub mod value;
