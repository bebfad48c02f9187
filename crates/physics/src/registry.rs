use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use rapier3d::na::Point3;
use rapier3d::prelude::*;
use shatter_common::{FragmentId, SimConfig, Transform};
use shatter_mesh::FragmentGeometry;

use crate::PhysicsError;
use crate::world::{PhysicsWorld, to_isometry};

/// Registry-issued handle to one physics body. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// Mass state of a body.
///
/// ```text
/// Unattached --attach(0)--> Static ----------promote---------> ActiveDynamic
/// Unattached --attach(m)--> SleepingDynamic --activate/promote--> ActiveDynamic
/// any --detach--> Unattached (terminal for that handle)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MassState {
    Unattached,
    Static,
    SleepingDynamic,
    ActiveDynamic,
}

impl MassState {
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::SleepingDynamic | Self::ActiveDynamic)
    }
}

#[derive(Debug, Clone)]
struct BodyEntry {
    fragment: FragmentId,
    rigid_body: RigidBodyHandle,
    collider: ColliderHandle,
    mass: f32,
    state: MassState,
}

/// Owns one physics body per attached fragment, and the world they live in.
///
/// # Invariants
/// - At most one live body per fragment id.
/// - Every entry's rapier body and collider are registered in `world`, unless
///   removed behind the registry's back through [`Self::world_mut`].
pub struct RigidBodyRegistry {
    world: PhysicsWorld,
    hull_scale: f32,
    entries: BTreeMap<BodyHandle, BodyEntry>,
    by_fragment: BTreeMap<FragmentId, BodyHandle>,
    next_handle: u64,
}

impl RigidBodyRegistry {
    pub fn new(world: PhysicsWorld, config: &SimConfig) -> Self {
        Self {
            world,
            hull_scale: config.hull_scale,
            entries: BTreeMap::new(),
            by_fragment: BTreeMap::new(),
            next_handle: 0,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// Direct world access. Bodies removed through it stay registered here
    /// and simply report no pose.
    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    /// The rapier body behind a registry handle.
    pub fn rigid_body(&self, handle: BodyHandle) -> Option<RigidBodyHandle> {
        self.entries.get(&handle).map(|e| e.rigid_body)
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.entries.len()
    }

    pub fn handle_for(&self, fragment: FragmentId) -> Option<BodyHandle> {
        self.by_fragment.get(&fragment).copied()
    }

    /// Build a convex-hull body for a fragment and register it.
    ///
    /// `world_transform` is the fragment's world transform. Its scale goes into
    /// the hull; the body itself only carries translation and rotation.
    /// Bodies with `mass > 0` start asleep. A body already registered for
    /// `fragment` is detached first.
    pub fn attach(
        &mut self,
        fragment: FragmentId,
        geometry: &FragmentGeometry,
        world_transform: &Transform,
        mass: f32,
    ) -> Result<BodyHandle, PhysicsError> {
        if mass < 0.0 || !mass.is_finite() {
            return Err(PhysicsError::InvalidMass(mass));
        }
        geometry
            .validate()
            .map_err(|e| PhysicsError::InvalidGeometry {
                fragment,
                reason: e.to_string(),
            })?;

        let points = hull_points(geometry, world_transform.scale, self.hull_scale);
        // rapier hulls have no collision margin, so none needs clearing.
        let mut collider = ColliderBuilder::convex_hull(&points).ok_or_else(|| {
            PhysicsError::InvalidGeometry {
                fragment,
                reason: "convex hull construction failed".into(),
            }
        })?;
        if mass > 0.0 {
            // Inertia follows from the hull shape at this mass.
            collider = collider.mass(mass);
        }

        if let Some(previous) = self.by_fragment.get(&fragment).copied() {
            tracing::debug!(%fragment, ?previous, "releasing previous body before attach");
            self.detach(previous);
        }

        let pose = to_isometry(world_transform.position, world_transform.rotation);
        let (body, state) = if mass > 0.0 {
            (
                RigidBodyBuilder::dynamic().position(pose).sleeping(true).build(),
                MassState::SleepingDynamic,
            )
        } else {
            (RigidBodyBuilder::fixed().position(pose).build(), MassState::Static)
        };

        let rigid_body = self.world.bodies.insert(body);
        let collider = self.world.colliders.insert_with_parent(
            collider.build(),
            rigid_body,
            &mut self.world.bodies,
        );
        if state == MassState::SleepingDynamic {
            if let Some(body) = self.world.bodies.get_mut(rigid_body) {
                body.sleep();
            }
        }

        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.insert(
            handle,
            BodyEntry {
                fragment,
                rigid_body,
                collider,
                mass,
                state,
            },
        );
        self.by_fragment.insert(fragment, handle);
        tracing::debug!(%fragment, ?handle, mass, ?state, "body attached");
        Ok(handle)
    }

    /// Remove a body from the world. Returns false if it was already gone.
    pub fn detach(&mut self, handle: BodyHandle) -> bool {
        let Some(entry) = self.entries.remove(&handle) else {
            return false;
        };
        if self.by_fragment.get(&entry.fragment) == Some(&handle) {
            self.by_fragment.remove(&entry.fragment);
        }
        if !self.world.remove_body(entry.rigid_body) {
            tracing::warn!(?handle, "rapier body already missing on detach");
        }
        tracing::debug!(fragment = %entry.fragment, ?handle, "body detached");
        true
    }

    /// Switch a body to dynamic at `new_mass` and wake it.
    ///
    /// Keeps the existing shape and pose; only mass properties and activation change.
    pub fn promote(&mut self, handle: BodyHandle, new_mass: f32) -> Result<(), PhysicsError> {
        if !(new_mass > 0.0) || !new_mass.is_finite() {
            return Err(PhysicsError::InvalidMass(new_mass));
        }
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;

        let collider = self
            .world
            .colliders
            .get_mut(entry.collider)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        collider.set_mass(new_mass);

        let body = self
            .world
            .bodies
            .get_mut(entry.rigid_body)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        body.set_body_type(RigidBodyType::Dynamic, true);
        body.recompute_mass_properties_from_colliders(&self.world.colliders);
        body.wake_up(true);

        entry.mass = new_mass;
        entry.state = MassState::ActiveDynamic;
        tracing::debug!(fragment = %entry.fragment, ?handle, new_mass, "body promoted");
        Ok(())
    }

    /// Wake a sleeping dynamic body. Static bodies stay static.
    /// Returns false for unknown handles.
    pub fn activate(&mut self, handle: BodyHandle) -> bool {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return false;
        };
        if let Some(body) = self.world.bodies.get_mut(entry.rigid_body) {
            body.wake_up(true);
        }
        if entry.state == MassState::SleepingDynamic {
            entry.state = MassState::ActiveDynamic;
        }
        true
    }

    pub fn state(&self, handle: BodyHandle) -> MassState {
        self.entries
            .get(&handle)
            .map_or(MassState::Unattached, |e| e.state)
    }

    pub fn mass(&self, handle: BodyHandle) -> Option<f32> {
        self.entries.get(&handle).map(|e| e.mass)
    }

    /// Authoritative world pose from the simulation, if the body is live.
    pub fn world_pose(&self, handle: BodyHandle) -> Option<(Vec3, Quat)> {
        let entry = self.entries.get(&handle)?;
        self.world.body_pose(entry.rigid_body)
    }

    /// Advance the simulation by a frame delta.
    pub fn step(&mut self, delta: f32) -> u32 {
        self.world.step(delta)
    }
}

/// Hull vertices: local positions scaled by the world scale, then shrunk about
/// their centroid so neighbouring hulls never start in contact.
fn hull_points(geometry: &FragmentGeometry, world_scale: Vec3, hull_scale: f32) -> Vec<Point<Real>> {
    let center = geometry.centroid() * world_scale;
    geometry
        .positions()
        .iter()
        .map(|p| {
            let v = center + (*p * world_scale - center) * hull_scale;
            Point3::new(v.x, v.y, v.z)
        })
        .collect()
}
