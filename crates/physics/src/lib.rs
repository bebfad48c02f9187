//! Physics: a rapier3d world plus the registry that owns one body per fragment.
//!
//! # Invariants
//! - Physics never owns scale: bodies carry translation and rotation, scale is
//!   baked into the collision hull.
//! - Collision hulls are shrunk (`SimConfig::hull_scale`) while visual geometry
//!   stays full size, so adjacent fragments never start interpenetrating.

mod registry;
mod world;

pub use registry::{BodyHandle, MassState, RigidBodyRegistry};
pub use world::PhysicsWorld;

use shatter_common::FragmentId;

/// Errors from body registry operations.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("invalid geometry for fragment {fragment}: {reason}")]
    InvalidGeometry { fragment: FragmentId, reason: String },
    #[error("body {0:?} is not attached")]
    UnknownBody(BodyHandle),
    #[error("invalid mass {0}")]
    InvalidMass(f32),
}

pub fn crate_info() -> &'static str {
    "shatter-physics v0.1.0"
}
