use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;
use shatter_common::SimConfig;

/// rapier3d simulation state stepped with a fixed internal timestep.
///
/// `step` takes a variable frame delta and runs as many fixed substeps as fit,
/// capped at `max_substeps`. Leftover time carries to the next call.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    max_substeps: u32,
    accumulator: f32,
    steps_taken: u64,
}

impl PhysicsWorld {
    pub fn new(config: &SimConfig) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: config.fixed_timestep,
            ..IntegrationParameters::default()
        };
        Self {
            gravity: vector![config.gravity.x, config.gravity.y, config.gravity.z],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
            steps_taken: 0,
        }
    }

    pub fn fixed_timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Total fixed steps run since creation.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Advance by a frame delta. Returns the number of fixed substeps run.
    pub fn step(&mut self, delta: f32) -> u32 {
        let fixed = self.fixed_timestep();
        self.accumulator += delta.max(0.0);
        let mut substeps = 0;
        // Tolerance keeps a delta equal to the fixed step from losing a step to rounding.
        while self.accumulator + fixed * 1e-3 >= fixed && substeps < self.max_substeps {
            self.step_fixed();
            self.accumulator -= fixed;
            substeps += 1;
        }
        if substeps == self.max_substeps {
            // Spiral-of-death guard: drop what could not be simulated.
            self.accumulator = self.accumulator.clamp(0.0, fixed);
        }
        self.accumulator = self.accumulator.max(0.0);
        tracing::trace!(delta, substeps, "physics step");
        substeps
    }

    fn step_fixed(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.steps_taken += 1;
    }

    /// Removes a rigid body and all its attached colliders and joints.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Current world pose of a body: translation and rotation only.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies.get(handle).map(|body| from_isometry(body.position()))
    }
}

pub(crate) fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = rotation.normalize();
    Isometry::from_parts(
        Translation3::new(position.x, position.y, position.z),
        UnitQuaternion::from_quaternion(Quaternion::new(
            rotation.w, rotation.x, rotation.y, rotation.z,
        )),
    )
}

pub(crate) fn from_isometry(iso: &Isometry<Real>) -> (Vec3, Quat) {
    let t = iso.translation.vector;
    let q = iso.rotation.into_inner().coords;
    (
        Vec3::new(t.x, t.y, t.z),
        Quat::from_xyzw(q.x, q.y, q.z, q.w).normalize(),
    )
}
