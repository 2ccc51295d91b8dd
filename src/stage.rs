//! Presentation seam: the narrow interfaces the playback layer drives.
//!
//! The interpreter never talks to widgets, render targets, or 3D models
//! directly. It drives a [`Stage`]: per-side text targets, a combined alpha
//! channel for fades (backdrop, text color, and actor visibility move
//! together), and actor placement. Concrete stages live in the enclosing
//! game; [`MemoryStage`] ships here as a recording double for tests and
//! headless runs.
//!
//! Actor assets are resolved through an [`ActorCatalog`]: the interpreter
//! only requests instantiation, the catalogue maps a reference to a model
//! prefab and pose clips.

use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{ActorRef, ScreenSide};

/// Errors raised while acquiring presentation collaborators.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    /// A required collaborator could not be located at session setup.
    #[error("required presentation collaborator missing: {what}")]
    #[diagnostic(
        code(taleflow::stage::missing_collaborator),
        help("Session setup aborts and cleanup runs; the session slot is released.")
    )]
    MissingCollaborator { what: &'static str },
}

/// The presentation surface a playback session drives.
///
/// `acquire` and `release` bracket one session: acquire locates or
/// instantiates the session-owned resources (render targets, presentation
/// root), release frees them. Release must tolerate being called without a
/// successful acquire.
pub trait Stage {
    fn acquire(&mut self) -> Result<(), StageError>;
    fn release(&mut self);

    /// Replace the visible text of one side.
    fn set_text(&mut self, side: ScreenSide, text: &str);

    /// Drive the combined fade channel of one side: text backdrop, text
    /// color, and actor visibility at the same alpha.
    fn set_side_alpha(&mut self, side: ScreenSide, alpha: f32);

    /// Place (or re-pose) the speaker's avatar on a side.
    fn show_actor(&mut self, side: ScreenSide, actor: &ActorRef, pose: &str);

    /// Disable a side's widgets entirely.
    fn clear_side(&mut self, side: ScreenSide);
}

/// Asset catalogue consumed by concrete stages: actor reference → model
/// prefab and pose clips.
pub trait ActorCatalog: Send + Sync {
    fn prefab(&self, actor: &ActorRef) -> Option<String>;
    fn pose_clip(&self, actor: &ActorRef, pose: &str) -> Option<String>;
}

/// Catalogue backed by a static map, for tests and tools.
#[derive(Default)]
pub struct StaticCatalog {
    prefabs: FxHashMap<ActorRef, String>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<ActorRef>, prefab: impl Into<String>) -> Self {
        self.prefabs.insert(actor.into(), prefab.into());
        self
    }
}

impl ActorCatalog for StaticCatalog {
    fn prefab(&self, actor: &ActorRef) -> Option<String> {
        self.prefabs.get(actor).cloned()
    }

    fn pose_clip(&self, actor: &ActorRef, pose: &str) -> Option<String> {
        self.prefabs
            .get(actor)
            .map(|prefab| format!("{prefab}/{pose}"))
    }
}

/// One recorded stage call.
#[derive(Clone, Debug, PartialEq)]
pub enum StageOp {
    Acquired,
    Released,
    Text { side: ScreenSide, text: String },
    Alpha { side: ScreenSide, alpha: f32 },
    Actor {
        side: ScreenSide,
        actor: ActorRef,
        pose: String,
        prefab: Option<String>,
    },
    Cleared { side: ScreenSide },
}

/// Recording stage double for tests and headless runs.
///
/// Clones share the same operation log, so a test can keep a handle while
/// the controller owns the stage.
#[derive(Clone, Default)]
pub struct MemoryStage {
    ops: Arc<Mutex<Vec<StageOp>>>,
    catalog: Option<Arc<dyn ActorCatalog>>,
    fail_acquire: bool,
}

impl MemoryStage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve actor prefabs through `catalog` when placing avatars.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn ActorCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Make `acquire` fail, simulating a missing collaborator.
    #[must_use]
    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    /// Snapshot of all recorded operations.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StageOp> {
        self.ops.lock().clone()
    }

    /// The text most recently set on `side`.
    #[must_use]
    pub fn last_text(&self, side: ScreenSide) -> Option<String> {
        self.ops.lock().iter().rev().find_map(|op| match op {
            StageOp::Text { side: s, text } if *s == side => Some(text.clone()),
            _ => None,
        })
    }

    /// The alpha most recently set on `side`.
    #[must_use]
    pub fn last_alpha(&self, side: ScreenSide) -> Option<f32> {
        self.ops.lock().iter().rev().find_map(|op| match op {
            StageOp::Alpha { side: s, alpha } if *s == side => Some(*alpha),
            _ => None,
        })
    }

    /// Number of `Released` records, for cleanup-idempotence assertions.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, StageOp::Released))
            .count()
    }

    fn record(&self, op: StageOp) {
        self.ops.lock().push(op);
    }
}

impl Stage for MemoryStage {
    fn acquire(&mut self) -> Result<(), StageError> {
        if self.fail_acquire {
            return Err(StageError::MissingCollaborator {
                what: "presentation root",
            });
        }
        self.record(StageOp::Acquired);
        Ok(())
    }

    fn release(&mut self) {
        self.record(StageOp::Released);
    }

    fn set_text(&mut self, side: ScreenSide, text: &str) {
        self.record(StageOp::Text {
            side,
            text: text.to_string(),
        });
    }

    fn set_side_alpha(&mut self, side: ScreenSide, alpha: f32) {
        self.record(StageOp::Alpha { side, alpha });
    }

    fn show_actor(&mut self, side: ScreenSide, actor: &ActorRef, pose: &str) {
        let prefab = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.prefab(actor));
        self.record(StageOp::Actor {
            side,
            actor: actor.clone(),
            pose: pose.to_string(),
            prefab,
        });
    }

    fn clear_side(&mut self, side: ScreenSide) {
        self.record(StageOp::Cleared { side });
    }
}

impl std::fmt::Debug for MemoryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStage")
            .field("ops", &self.ops.lock().len())
            .field("fail_acquire", &self.fail_acquire)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_resolves_prefab_and_pose_clip() {
        let catalog = StaticCatalog::new().with_actor("rin", "models/rin");
        assert_eq!(
            catalog.prefab(&"rin".into()),
            Some("models/rin".to_string())
        );
        assert_eq!(
            catalog.pose_clip(&"rin".into(), "idle"),
            Some("models/rin/idle".to_string())
        );
        assert_eq!(catalog.prefab(&"sota".into()), None);
        assert_eq!(catalog.pose_clip(&"sota".into(), "idle"), None);
    }

    #[test]
    fn memory_stage_records_catalog_prefabs() {
        let catalog = Arc::new(StaticCatalog::new().with_actor("rin", "models/rin"));
        let mut stage = MemoryStage::new().with_catalog(catalog);
        stage.show_actor(ScreenSide::Left, &"rin".into(), "happy");
        stage.show_actor(ScreenSide::Right, &"sota".into(), "idle");

        let ops = stage.snapshot();
        assert_eq!(
            ops[0],
            StageOp::Actor {
                side: ScreenSide::Left,
                actor: "rin".into(),
                pose: "happy".into(),
                prefab: Some("models/rin".into()),
            }
        );
        // Actors missing from the catalogue are placed without a prefab.
        assert!(matches!(&ops[1], StageOp::Actor { prefab: None, .. }));
    }

    #[test]
    fn stage_without_a_catalog_never_resolves_prefabs() {
        let mut stage = MemoryStage::new();
        stage.show_actor(ScreenSide::Left, &"rin".into(), "idle");
        assert!(matches!(
            &stage.snapshot()[0],
            StageOp::Actor { prefab: None, .. }
        ));
    }
}
