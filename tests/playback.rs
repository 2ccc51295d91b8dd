//! Session lifecycle and frame-stepped playback tests.
//!
//! Each test drives the controller with a manual tick loop and a
//! `MemoryStage` recording double; timings are scaled down so a whole
//! session fits in a handful of ticks.

use std::sync::Arc;
use std::time::Duration;

use taleflow::engine::EngineState;
use taleflow::events::{EventBus, MemorySink, PlaybackEvent};
use taleflow::graph::{ExitLink, SequenceGraph, SequenceGraphBuilder};
use taleflow::playback::{PlaybackConfig, PlaybackController, SessionSlot};
use taleflow::providers::{ProviderRegistry, VariableStore};
use taleflow::stage::{ActorCatalog, MemoryStage, StageOp, StaticCatalog};
use taleflow::triggers::TriggerRegistry;
use taleflow::types::ScreenSide;

const TICK: Duration = Duration::from_millis(10);

fn fast_config() -> PlaybackConfig {
    PlaybackConfig::default()
        .with_reveal_interval(Duration::from_millis(10))
        .with_fade_duration(Duration::from_millis(20))
}

fn controller(stage: MemoryStage, slot: SessionSlot) -> PlaybackController<MemoryStage> {
    let vars = VariableStore::new();
    PlaybackController::new(
        stage,
        Arc::new(TriggerRegistry::with_builtins(vars.clone())),
        Arc::new(ProviderRegistry::with_builtins(vars)),
    )
    .with_config(fast_config())
    .with_slot(slot)
}

fn hi_graph() -> Arc<SequenceGraph> {
    Arc::new(
        SequenceGraphBuilder::new()
            .entry("hi")
            .dialogue("hi", "rin", "idle", ScreenSide::Left, "Hi", vec![])
            .build()
            .expect("valid graph"),
    )
}

/// Tick until the session ends, pressing continue after every frame.
/// Panics if the session never ends.
fn run_to_completion(controller: &mut PlaybackController<MemoryStage>) {
    for _ in 0..500 {
        if !controller.session_active() {
            return;
        }
        controller.tick(TICK);
        controller.signal_continue(true);
    }
    panic!("session did not complete within the tick budget");
}

#[test]
fn scenario_single_line_session_reveals_waits_and_tears_down() {
    let stage = MemoryStage::new();
    let slot = SessionSlot::new();
    let mut controller = controller(stage.clone(), slot.clone());

    assert!(controller.start_session(hi_graph()));
    assert!(slot.occupied());

    // Frame 1: engine suspends at the line, the Left side is zeroed for its
    // first appearance. The fade itself runs over the following frames.
    controller.tick(TICK);
    assert_eq!(stage.last_alpha(ScreenSide::Left), Some(0.0));
    controller.tick(TICK);
    assert_eq!(stage.last_alpha(ScreenSide::Left), Some(0.5));
    controller.tick(TICK);
    assert_eq!(stage.last_alpha(ScreenSide::Left), Some(1.0));

    // Character-by-character reveal.
    controller.tick(TICK);
    assert_eq!(stage.last_text(ScreenSide::Left), Some("H".to_string()));
    controller.tick(TICK);
    assert_eq!(stage.last_text(ScreenSide::Left), Some("Hi".to_string()));

    // Gate: nothing moves until continue is pressed.
    controller.tick(TICK);
    controller.tick(TICK);
    assert!(controller.session_active());
    assert_eq!(stage.last_text(ScreenSide::Left), Some("Hi".to_string()));

    controller.signal_continue(true);
    run_to_completion(&mut controller);

    // Fade-out ran and teardown freed the slot.
    assert_eq!(stage.last_alpha(ScreenSide::Left), Some(0.0));
    assert_eq!(stage.release_count(), 1);
    assert!(!slot.occupied());
}

#[test]
fn second_start_while_active_is_rejected_without_side_effects() {
    let stage_a = MemoryStage::new();
    let stage_b = MemoryStage::new();
    let slot = SessionSlot::new();
    let mut first = controller(stage_a.clone(), slot.clone());
    let mut second = controller(stage_b.clone(), slot.clone());

    assert!(first.start_session(hi_graph()));
    // Reach the middle of the session.
    for _ in 0..3 {
        first.tick(TICK);
    }
    let ops_before = stage_a.snapshot();
    let state_before = first.engine().expect("active engine").state();

    assert!(!second.start_session(hi_graph()));

    // The original session is untouched and the loser acquired nothing.
    assert_eq!(first.engine().expect("active engine").state(), state_before);
    assert_eq!(stage_a.snapshot(), ops_before);
    assert!(stage_b.snapshot().is_empty());
    assert!(slot.occupied());
}

#[test]
fn slot_is_reusable_after_natural_completion() {
    let slot = SessionSlot::new();
    let stage = MemoryStage::new();
    let mut controller = controller(stage.clone(), slot.clone());

    assert!(controller.start_session(hi_graph()));
    run_to_completion(&mut controller);
    assert!(!slot.occupied());

    assert!(controller.start_session(hi_graph()));
    assert!(slot.occupied());
}

#[test]
fn cleanup_is_idempotent_across_natural_end_and_forced_teardown() {
    let stage = MemoryStage::new();
    let slot = SessionSlot::new();
    let mut controller = controller(stage.clone(), slot.clone());

    assert!(controller.start_session(hi_graph()));
    run_to_completion(&mut controller);
    // Natural completion already cleaned up; explicit and drop-time calls
    // must not release anything twice.
    controller.cleanup();
    drop(controller);

    assert_eq!(stage.release_count(), 1);
    assert!(!slot.occupied());
}

#[test]
fn forced_teardown_mid_session_releases_everything_once() {
    let stage = MemoryStage::new();
    let slot = SessionSlot::new();
    let mut controller = controller(stage.clone(), slot.clone());

    assert!(controller.start_session(hi_graph()));
    controller.tick(TICK);
    drop(controller);

    assert_eq!(stage.release_count(), 1);
    assert!(!slot.occupied());
}

#[test]
fn setup_failure_aborts_cleans_up_and_frees_the_slot() {
    let stage = MemoryStage::new().failing_acquire();
    let slot = SessionSlot::new();
    let sink = MemorySink::new();
    let vars = VariableStore::new();
    let mut controller = PlaybackController::new(
        stage.clone(),
        Arc::new(TriggerRegistry::with_builtins(vars.clone())),
        Arc::new(ProviderRegistry::with_builtins(vars)),
    )
    .with_config(fast_config())
    .with_slot(slot.clone())
    .with_events(EventBus::with_sink(sink.clone()));

    assert!(!controller.start_session(hi_graph()));
    assert!(!slot.occupied());
    assert!(!controller.session_active());
    // The stage never acquired, so there is nothing to release.
    assert_eq!(stage.release_count(), 0);

    // Lifecycle notifications still bracket the attempt.
    let events = sink.snapshot();
    assert!(matches!(events[0], PlaybackEvent::SessionStarted { .. }));
    assert!(matches!(events[1], PlaybackEvent::SessionEnded { .. }));
}

#[test]
fn continue_mid_reveal_completes_the_line_and_still_gates() {
    let stage = MemoryStage::new();
    let mut controller = controller(stage.clone(), SessionSlot::new());
    let graph = Arc::new(
        SequenceGraphBuilder::new()
            .entry("line")
            .dialogue(
                "line",
                "rin",
                "idle",
                ScreenSide::Left,
                "A rather long line",
                vec![],
            )
            .build()
            .expect("valid graph"),
    );

    assert!(controller.start_session(graph));
    // Enter the line and finish the fade-in.
    controller.tick(TICK);
    controller.tick(TICK);
    controller.tick(TICK);
    // One revealed character, then interrupt.
    controller.tick(TICK);
    assert_eq!(stage.last_text(ScreenSide::Left), Some("A".to_string()));
    controller.signal_continue(true);
    controller.tick(TICK);
    assert_eq!(
        stage.last_text(ScreenSide::Left),
        Some("A rather long line".to_string())
    );

    // The interrupt consumed the press; the gate still blocks.
    controller.tick(TICK);
    controller.tick(TICK);
    assert!(controller.session_active());
    assert_eq!(
        controller.engine().expect("active engine").state(),
        EngineState::AtDialogue
    );
}

#[test]
fn second_line_on_the_same_side_skips_the_fade_in() {
    let stage = MemoryStage::new();
    let mut controller = controller(stage.clone(), SessionSlot::new());
    let graph = Arc::new(
        SequenceGraphBuilder::new()
            .entry("a")
            .dialogue(
                "a",
                "rin",
                "idle",
                ScreenSide::Left,
                "A",
                vec![ExitLink::to("b")],
            )
            .dialogue("b", "rin", "idle", ScreenSide::Left, "B", vec![])
            .build()
            .expect("valid graph"),
    );

    assert!(controller.start_session(graph));
    // First line: entry frame, two fade frames, one reveal frame.
    controller.tick(TICK);
    controller.tick(TICK);
    controller.tick(TICK);
    controller.tick(TICK);
    assert_eq!(stage.last_text(ScreenSide::Left), Some("A".to_string()));
    let fades_after_first = count_alpha_ops(&stage);

    // Gate, advance into the second line.
    controller.signal_continue(true);
    controller.tick(TICK);
    controller.tick(TICK);
    // Reveal of "B" starts without any new alpha ramp.
    controller.tick(TICK);
    assert_eq!(stage.last_text(ScreenSide::Left), Some("B".to_string()));
    assert_eq!(count_alpha_ops(&stage), fades_after_first);
}

#[test]
fn both_sides_fade_out_in_parallel_at_session_end() {
    let stage = MemoryStage::new();
    let mut controller = controller(stage.clone(), SessionSlot::new());
    let graph = Arc::new(
        SequenceGraphBuilder::new()
            .entry("l")
            .dialogue(
                "l",
                "rin",
                "idle",
                ScreenSide::Left,
                "L",
                vec![ExitLink::to("r")],
            )
            .dialogue("r", "sota", "idle", ScreenSide::Right, "R", vec![])
            .build()
            .expect("valid graph"),
    );

    assert!(controller.start_session(graph));
    run_to_completion(&mut controller);

    assert_eq!(stage.last_alpha(ScreenSide::Left), Some(0.0));
    assert_eq!(stage.last_alpha(ScreenSide::Right), Some(0.0));
    assert_eq!(stage.release_count(), 1);
}

#[test]
fn lifecycle_events_bracket_a_completed_session() {
    let sink = MemorySink::new();
    let stage = MemoryStage::new();
    let vars = VariableStore::new();
    let mut controller = PlaybackController::new(
        stage,
        Arc::new(TriggerRegistry::with_builtins(vars.clone())),
        Arc::new(ProviderRegistry::with_builtins(vars)),
    )
    .with_config(fast_config())
    .with_slot(SessionSlot::new())
    .with_events(EventBus::with_sink(sink.clone()));

    assert!(controller.start_session(hi_graph()));
    run_to_completion(&mut controller);

    let events = sink.snapshot();
    assert_eq!(events.len(), 2);
    let (started, ended) = match (&events[0], &events[1]) {
        (
            PlaybackEvent::SessionStarted { session: a, .. },
            PlaybackEvent::SessionEnded { session: b, .. },
        ) => (a, b),
        other => panic!("unexpected event sequence: {other:?}"),
    };
    assert_eq!(started, ended);
}

#[test]
fn actor_placement_resolves_through_the_catalog() {
    let catalog = Arc::new(StaticCatalog::new().with_actor("rin", "models/rin"));
    assert_eq!(
        catalog.pose_clip(&"rin".into(), "idle"),
        Some("models/rin/idle".to_string())
    );

    let stage = MemoryStage::new().with_catalog(catalog);
    let mut controller = controller(stage.clone(), SessionSlot::new());
    assert!(controller.start_session(hi_graph()));
    controller.tick(TICK);

    let placed = stage
        .snapshot()
        .into_iter()
        .find_map(|op| match op {
            StageOp::Actor { prefab, pose, .. } => Some((prefab, pose)),
            _ => None,
        })
        .expect("actor placed on line entry");
    assert_eq!(placed, (Some("models/rin".to_string()), "idle".to_string()));
}

#[test]
fn empty_graph_session_ends_without_presentation() {
    let stage = MemoryStage::new();
    let slot = SessionSlot::new();
    let mut controller = controller(stage.clone(), slot.clone());
    let graph = Arc::new(
        SequenceGraphBuilder::new()
            .start(vec![])
            .build()
            .expect("valid graph"),
    );

    assert!(controller.start_session(graph));
    controller.tick(TICK);
    assert!(!controller.session_active());
    assert!(!slot.occupied());
    // Acquired and released, nothing shown in between.
    assert!(
        !stage
            .snapshot()
            .iter()
            .any(|op| matches!(op, StageOp::Text { .. } | StageOp::Alpha { .. }))
    );
}

fn count_alpha_ops(stage: &MemoryStage) -> usize {
    stage
        .snapshot()
        .iter()
        .filter(|op| matches!(op, StageOp::Alpha { .. }))
        .count()
}
