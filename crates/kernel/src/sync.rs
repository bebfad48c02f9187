//! Physics → scene transform sync.
//!
//! Simulated poses are world-space. Fragments store local transforms under a
//! parent node, so each pose is pulled back through the parent's inverse world
//! matrix. Scale never comes from physics; the fragment keeps its own.

use glam::{Mat4, Quat, Vec3};
use shatter_common::Transform;
use shatter_physics::RigidBodyRegistry;

use crate::Fragment;

/// Local transform that places a fragment at world pose `(position, rotation)`
/// under a parent with world matrix `parent_world`.
pub fn local_from_physics(
    parent_world: Mat4,
    position: Vec3,
    rotation: Quat,
    preserved_scale: Vec3,
) -> Transform {
    let world = Mat4::from_rotation_translation(rotation, position);
    let local = parent_world.inverse() * world;
    let (_, rotation, position) = local.to_scale_rotation_translation();
    Transform {
        position,
        rotation: rotation.normalize(),
        scale: preserved_scale,
    }
}

/// Counts from one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub synced: usize,
    /// Dynamic fragments whose body had no pose this tick.
    pub missing: usize,
}

/// Overwrite the local transform of every dynamic fragment with its body pose.
///
/// Static and unattached fragments are skipped. A dynamic fragment whose body
/// has vanished keeps its last transform.
pub fn sync_fragments(
    registry: &RigidBodyRegistry,
    parent: &Transform,
    fragments: &mut [Fragment],
) -> SyncStats {
    let parent_world = parent.to_mat4();
    let mut stats = SyncStats::default();
    for fragment in fragments {
        let Some(handle) = fragment.body() else {
            continue;
        };
        if !registry.state(handle).is_dynamic() {
            continue;
        }
        match registry.world_pose(handle) {
            Some((position, rotation)) => {
                fragment.local =
                    local_from_physics(parent_world, position, rotation, fragment.local.scale);
                stats.synced += 1;
            }
            None => {
                tracing::warn!(fragment = %fragment.id(), ?handle, "no simulated pose, keeping last transform");
                stats.missing += 1;
            }
        }
    }
    stats
}
