use std::collections::BTreeMap;

use glam::Vec3;
use shatter_common::{FragmentId, Transform};

use crate::{Fragment, SceneError};

/// Unit vector from `center` to `point`, or `DegenerateDirection` when they coincide.
pub fn explosion_direction(
    fragment: FragmentId,
    center: Vec3,
    point: Vec3,
) -> Result<Vec3, SceneError> {
    let offset = point - center;
    if offset.length_squared() < 1e-12 || !offset.is_finite() {
        return Err(SceneError::DegenerateDirection(fragment));
    }
    Ok(offset.normalize())
}

/// Outcome of arming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArmReport {
    pub armed: usize,
    /// Fragments whose centroid sits on the explosion center; they stay put.
    pub degenerate: Vec<FragmentId>,
}

/// Kinematic outward flight of fragments from a world-space center.
///
/// Directions are computed once on arming and reused every tick, so the
/// animation is a straight line per fragment regardless of what physics does
/// to its rotation.
#[derive(Debug, Clone)]
pub struct ExplosionState {
    center: Vec3,
    speed: f32,
    armed: bool,
    directions: BTreeMap<FragmentId, Vec3>,
}

impl ExplosionState {
    pub fn new(center: Vec3, speed: f32) -> Self {
        Self {
            center,
            speed,
            armed: false,
            directions: BTreeMap::new(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self, id: FragmentId) -> Option<Vec3> {
        self.directions.get(&id).copied()
    }

    pub fn directions(&self) -> &BTreeMap<FragmentId, Vec3> {
        &self.directions
    }

    /// Record a direction for every fragment from `center` to its world centroid.
    ///
    /// Replaces any previous arming.
    pub fn arm(&mut self, fragments: &[Fragment], parent: &Transform, center: Vec3) -> ArmReport {
        self.center = center;
        self.directions.clear();
        let parent_world = parent.to_mat4();
        let mut report = ArmReport::default();
        for fragment in fragments {
            let world_centroid = (parent_world * fragment.local().to_mat4())
                .transform_point3(fragment.geometry().centroid());
            let dir = match explosion_direction(fragment.id(), center, world_centroid) {
                Ok(dir) => dir,
                Err(e) => {
                    tracing::debug!(error = %e, "fragment will not move");
                    report.degenerate.push(fragment.id());
                    Vec3::ZERO
                }
            };
            self.directions.insert(fragment.id(), dir);
            report.armed += 1;
        }
        self.armed = true;
        report
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.directions.clear();
    }

    /// Move each armed fragment `speed * dt` along its direction in world space.
    ///
    /// Writes local positions, so whatever the physics sync wrote this tick is
    /// overridden. Returns the number of fragments moved.
    pub fn advance(&self, fragments: &mut [Fragment], parent: &Transform, dt: f32) -> usize {
        if !self.armed {
            return 0;
        }
        let parent_inverse = parent.to_mat4().inverse();
        let mut moved = 0;
        for fragment in fragments {
            let Some(dir) = self.directions.get(&fragment.id()) else {
                continue;
            };
            if *dir == Vec3::ZERO {
                continue;
            }
            let step = *dir * self.speed * dt;
            fragment.local.position += parent_inverse.transform_vector3(step);
            moved += 1;
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use shatter_mesh::FragmentGeometry;

    fn tet_around(c: Vec3) -> Fragment {
        let g = FragmentGeometry::tetrahedron([
            c + Vec3::new(0.1, 0.0, 0.0),
            c + Vec3::new(-0.1, 0.0, 0.0),
            c + Vec3::new(0.0, 0.1, 0.0),
            c + Vec3::new(0.0, -0.05, 0.1),
        ]);
        Fragment::new(g, Transform::default())
    }

    #[test]
    fn direction_is_normalized() {
        let d = explosion_direction(FragmentId::new(), Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert!(d.abs_diff_eq(Vec3::new(0.0, 0.6, 0.8), 1e-6));
    }

    #[test]
    fn coincident_center_is_degenerate() {
        let id = FragmentId::new();
        assert!(matches!(
            explosion_direction(id, Vec3::ONE, Vec3::ONE),
            Err(SceneError::DegenerateDirection(d)) if d == id
        ));
    }

    #[test]
    fn arming_twice_gives_same_directions() {
        let fragments = vec![tet_around(Vec3::X), tet_around(Vec3::new(0.0, 2.0, 1.0))];
        let parent = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(0.3),
            scale: Vec3::splat(2.0),
        };
        let mut a = ExplosionState::new(Vec3::ZERO, 5.0);
        let mut b = ExplosionState::new(Vec3::ZERO, 5.0);
        a.arm(&fragments, &parent, Vec3::ZERO);
        b.arm(&fragments, &parent, Vec3::ZERO);
        assert_eq!(a.directions(), b.directions());
    }

    #[test]
    fn degenerate_fragment_gets_zero_direction() {
        let fragments = vec![tet_around(Vec3::ZERO), tet_around(Vec3::X)];
        let mut e = ExplosionState::new(Vec3::ZERO, 5.0);
        let report = e.arm(&fragments, &Transform::default(), fragments[0].geometry().centroid());
        assert_eq!(report.armed, 2);
        assert_eq!(report.degenerate, vec![fragments[0].id()]);
        assert_eq!(e.direction(fragments[0].id()), Some(Vec3::ZERO));
    }

    #[test]
    fn advance_moves_along_world_direction() {
        let parent = Transform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        let mut fragments = vec![tet_around(Vec3::X)];
        let mut e = ExplosionState::new(Vec3::ZERO, 5.0);
        e.arm(&fragments, &parent, Vec3::ZERO);
        let dir = e.direction(fragments[0].id()).unwrap();

        let before = fragments[0].world_transform(&parent).position;
        assert_eq!(e.advance(&mut fragments, &parent, 0.1), 1);
        let after = fragments[0].world_transform(&parent).position;
        assert!((after - before).abs_diff_eq(dir * 0.5, 1e-5));
    }

    #[test]
    fn disarmed_state_does_nothing() {
        let mut fragments = vec![tet_around(Vec3::X)];
        let mut e = ExplosionState::new(Vec3::ZERO, 5.0);
        e.arm(&fragments, &Transform::default(), Vec3::ZERO);
        e.disarm();
        assert!(!e.is_armed());
        assert!(e.directions().is_empty());
        assert_eq!(e.advance(&mut fragments, &Transform::default(), 1.0), 0);
        assert_eq!(fragments[0].local().position, Vec3::ZERO);
    }
}
