//! Scene kernel: fragment lifecycle, physics transform sync, explosion animator.
//!
//! # Invariants
//! - Exactly one representation (whole mesh or cut set) is visible and simulated.
//! - Per tick the order is: physics step, sync dynamic poses, animator. The
//!   animator's position write always wins.
//! - All state mutations flow through [`Scene`] operations and are recorded as
//!   [`SceneEvent`]s.

pub mod explosion;
mod fragment;
pub mod frame;
pub mod gate;
pub mod scene;
pub mod scramble;
pub mod sync;

pub use explosion::{ArmReport, ExplosionState};
pub use fragment::{Fragment, FragmentSet};
pub use frame::{RenderFrame, RenderItem};
pub use gate::{PhysicsGate, ReadySignal, ready_channel};
pub use scene::{CutReport, Representation, Scene, SceneEvent, ScrambleTarget, TickReport};

use shatter_common::FragmentId;
use shatter_physics::PhysicsError;

/// Errors from scene operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("no whole mesh loaded")]
    NoMesh,
    #[error("cut failed: {0}")]
    FragmentationFailed(String),
    #[error("cut produced no usable fragments")]
    EmptyCut,
    #[error("physics is not ready")]
    PhysicsNotReady,
    #[error("explosion direction undefined for fragment {0}")]
    DegenerateDirection(FragmentId),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

pub fn crate_info() -> &'static str {
    "shatter-kernel v0.1.0"
}
