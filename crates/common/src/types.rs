use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a fragment (whole mesh or one tetrahedron).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(pub Uuid);

impl FragmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and debug output.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for FragmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Uniform scale plus rotation, no translation.
    pub fn from_rotation_scale(rotation: Quat, scale: f32) -> Self {
        Self {
            rotation,
            scale: Vec3::splat(scale),
            ..Self::default()
        }
    }

    /// Affine matrix applying scale, then rotation, then translation.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose an affine matrix. Shear is lost.
    pub fn from_mat4(m: Mat4) -> Self {
        let (scale, rotation, position) = m.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    /// World transform of a child whose local transform is `self`.
    pub fn under(&self, parent: &Transform) -> Transform {
        Self::from_mat4(parent.to_mat4() * self.to_mat4())
    }

    pub fn abs_diff_eq(&self, other: &Transform, eps: f32) -> bool {
        self.position.abs_diff_eq(other.position, eps)
            && self.scale.abs_diff_eq(other.scale, eps)
            // q and -q are the same rotation
            && (self.rotation.abs_diff_eq(other.rotation, eps)
                || self.rotation.abs_diff_eq(-other.rotation, eps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_id_uniqueness() {
        let a = FragmentId::new();
        let b = FragmentId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.to_mat4(), Mat4::IDENTITY);
    }

    #[test]
    fn mat4_roundtrip_keeps_components() {
        let t = Transform {
            position: Vec3::new(1.0, -2.0, 3.5),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::splat(2.0),
        };
        let back = Transform::from_mat4(t.to_mat4());
        assert!(back.abs_diff_eq(&t, 1e-5));
    }

    #[test]
    fn under_composes_parent_first() {
        let parent = Transform {
            position: Vec3::new(0.0, 10.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = child.under(&parent);
        assert!(world.position.abs_diff_eq(Vec3::new(2.0, 10.0, 0.0), 1e-5));
        assert!(world.scale.abs_diff_eq(Vec3::splat(2.0), 1e-5));
    }
}
