use glam::Vec3;
use serde::{Deserialize, Serialize};
use shatter_common::{FragmentId, SimConfig, Transform};
use shatter_mesh::{FragmentDescriptor, MaterialKind, Mesh};
use shatter_physics::{PhysicsError, PhysicsWorld, RigidBodyRegistry};
use shatter_tetgen::{FragmentationError, Fragmenter};

use crate::explosion::{ArmReport, ExplosionState};
use crate::frame::{RenderFrame, RenderItem};
use crate::gate::PhysicsGate;
use crate::scramble::{SplitMix64, circle_layout, random_position};
use crate::sync::sync_fragments;
use crate::{Fragment, FragmentSet, SceneError};

/// An event record produced by every scene mutation.
///
/// Plain ticks are not recorded; a scene that only ticks keeps its log at a
/// fixed length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    WholeLoaded { fragment: FragmentId, name: String },
    BodyAttached { fragment: FragmentId, mass: f32 },
    AttachFailed { fragment: FragmentId, reason: String },
    CutApplied { fragments: usize, skipped: usize },
    CutRejected { reason: String },
    Reset,
    Promoted { fragments: usize, mass: f32 },
    /// Promotion requested before physics was ready; applied on attach.
    PromoteDeferred { mass: f32 },
    Armed { fragments: usize, degenerate: usize },
    Disarmed,
    Scrambled { fragments: usize },
    PhysicsReady { tick: u64 },
}

/// Which representation is visible. Never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Empty,
    Whole,
    Cut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrambleTarget {
    /// Every fragment of the visible representation.
    Active,
    Fragment(FragmentId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutReport {
    pub fragments: usize,
    /// Descriptor indices dropped for degenerate geometry.
    pub skipped: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub substeps: u32,
    pub synced: usize,
    pub flown: usize,
}

#[derive(Debug)]
struct WholeMesh {
    mesh: Mesh,
    fragment: Fragment,
    attach_pending: bool,
}

/// Lifecycle controller: owns the whole mesh, the cut fragment set, physics
/// and the explosion animator, and advances them one tick at a time.
///
/// # Invariants
/// - Exactly one of {whole mesh, cut set} is visible and holds bodies.
/// - Physics work requested before the gate opens is queued and flushed once.
#[derive(Debug)]
pub struct Scene {
    config: SimConfig,
    gate: PhysicsGate,
    whole: Option<WholeMesh>,
    cut: Option<FragmentSet>,
    explosion: ExplosionState,
    rng: SplitMix64,
    tick: u64,
    events: Vec<SceneEvent>,
}

impl Scene {
    pub fn new(config: SimConfig, gate: PhysicsGate) -> Self {
        let explosion = ExplosionState::new(config.explosion_center, config.explosion_speed);
        let rng = SplitMix64::new(config.seed);
        Self {
            config,
            gate,
            whole: None,
            cut: None,
            explosion,
            rng,
            tick: 0,
            events: Vec::new(),
        }
    }

    /// A scene whose physics is ready from the first tick.
    pub fn with_physics(config: SimConfig) -> Self {
        let gate = PhysicsGate::ready(PhysicsWorld::new(&config), &config);
        Self::new(config, gate)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_physics_ready(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn registry(&self) -> Option<&RigidBodyRegistry> {
        self.gate.registry().ok()
    }

    pub fn representation(&self) -> Representation {
        match (&self.cut, &self.whole) {
            (Some(_), _) => Representation::Cut,
            (None, Some(_)) => Representation::Whole,
            (None, None) => Representation::Empty,
        }
    }

    pub fn whole_mesh(&self) -> Option<&Mesh> {
        self.whole.as_ref().map(|w| &w.mesh)
    }

    pub fn whole_fragment(&self) -> Option<&Fragment> {
        self.whole.as_ref().map(|w| &w.fragment)
    }

    pub fn fragment_set(&self) -> Option<&FragmentSet> {
        self.cut.as_ref()
    }

    pub fn explosion(&self) -> &ExplosionState {
        &self.explosion
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Hand the scene an initialized physics world directly.
    pub fn physics_ready(&mut self, world: PhysicsWorld) {
        if self.gate.open(world, &self.config) {
            self.on_physics_ready();
        }
    }

    /// Show `mesh` as the whole representation, replacing whatever was loaded.
    pub fn load_whole(&mut self, mesh: Mesh, transform: Transform) -> FragmentId {
        self.teardown_cut();
        self.detach_whole();

        let fragment = Fragment::new(mesh.geometry(), transform);
        let id = fragment.id();
        tracing::info!(fragment = %id, mesh = %mesh.data().name, "whole mesh loaded");
        self.events.push(SceneEvent::WholeLoaded {
            fragment: id,
            name: mesh.data().name.clone(),
        });
        self.whole = Some(WholeMesh {
            mesh,
            fragment,
            attach_pending: true,
        });
        self.flush_pending();
        id
    }

    /// Ask `fragmenter` for a split of the whole mesh and apply it.
    ///
    /// On failure nothing changes: the whole mesh stays visible and attached.
    pub fn cut(&mut self, fragmenter: &mut dyn Fragmenter) -> Result<CutReport, SceneError> {
        let Some(whole) = self.whole.as_ref() else {
            return Err(SceneError::NoMesh);
        };
        let data = whole.mesh.data();
        let _span = tracing::info_span!("cut", mesh = %data.name).entered();

        let result = fragmenter
            .fragment(data)
            .and_then(|tets| tets.descriptors(data).map_err(FragmentationError::from));
        let descriptors = match result {
            Ok(descriptors) => descriptors,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(%reason, "cut rejected, keeping whole mesh");
                self.events.push(SceneEvent::CutRejected {
                    reason: reason.clone(),
                });
                return Err(SceneError::FragmentationFailed(reason));
            }
        };
        self.apply_cut(descriptors)
    }

    /// Replace the visible representation with one fragment per descriptor.
    ///
    /// Degenerate descriptors are skipped. If none survive the scene is left as it was.
    pub fn apply_cut(
        &mut self,
        descriptors: Vec<FragmentDescriptor>,
    ) -> Result<CutReport, SceneError> {
        let mut skipped = Vec::new();
        let mut fragments = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let geometry = descriptor.into_geometry();
            match geometry.validate() {
                Ok(()) => fragments.push(Fragment::new(geometry, Transform::default())),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping fragment");
                    skipped.push(index);
                }
            }
        }
        if fragments.is_empty() {
            self.events.push(SceneEvent::CutRejected {
                reason: SceneError::EmptyCut.to_string(),
            });
            return Err(SceneError::EmptyCut);
        }

        self.teardown_cut();
        self.detach_whole();

        let parent = self
            .whole
            .as_ref()
            .map_or_else(Transform::default, |w| *w.fragment.local());
        let report = CutReport {
            fragments: fragments.len(),
            skipped,
        };
        tracing::info!(fragments = report.fragments, skipped = report.skipped.len(), "cut applied");
        self.events.push(SceneEvent::CutApplied {
            fragments: report.fragments,
            skipped: report.skipped.len(),
        });
        self.cut = Some(FragmentSet::new(parent, fragments));
        self.flush_pending();
        Ok(report)
    }

    /// Drop the cut set and bring the whole mesh back.
    pub fn reset(&mut self) {
        self.teardown_cut();
        if let Some(whole) = self.whole.as_mut() {
            if whole.fragment.body().is_none() {
                whole.attach_pending = true;
            }
        }
        tracing::info!("scene reset");
        self.events.push(SceneEvent::Reset);
        self.flush_pending();
    }

    /// Move fragments to new positions. Bodies are not moved.
    ///
    /// `Active` lays a cut set out on a circle in the XY plane, or drops the
    /// whole mesh at a random spot. Returns the number of fragments moved.
    pub fn scramble(&mut self, target: ScrambleTarget) -> usize {
        let extent = self.config.scramble_extent;
        let moved = match target {
            ScrambleTarget::Active => {
                if let Some(set) = self.cut.as_mut() {
                    let layout = circle_layout(set.len(), self.config.scramble_radius);
                    for (fragment, position) in set.fragments_mut().iter_mut().zip(layout) {
                        fragment.local.position = position;
                    }
                    set.len()
                } else if let Some(whole) = self.whole.as_mut() {
                    whole.fragment.local.position = random_position(&mut self.rng, extent);
                    1
                } else {
                    0
                }
            }
            ScrambleTarget::Fragment(id) => {
                if let Some(fragment) = self.cut.as_mut().and_then(|set| set.get_mut(id)) {
                    fragment.local.position = random_position(&mut self.rng, extent);
                    1
                } else if let Some(whole) = self
                    .whole
                    .as_mut()
                    .filter(|w| self.cut.is_none() && w.fragment.id() == id)
                {
                    whole.fragment.local.position = random_position(&mut self.rng, extent);
                    1
                } else {
                    tracing::warn!(fragment = %id, "scramble target not found");
                    0
                }
            }
        };
        if moved > 0 {
            self.events.push(SceneEvent::Scrambled { fragments: moved });
        }
        moved
    }

    /// Make every attached fragment of the cut set dynamic at `mass`.
    ///
    /// Before physics is ready the request is queued and 0 is returned.
    pub fn promote_all_to_dynamic(&mut self, mass: f32) -> Result<usize, SceneError> {
        if !(mass > 0.0) || !mass.is_finite() {
            return Err(PhysicsError::InvalidMass(mass).into());
        }
        let Some(set) = self.cut.as_mut() else {
            tracing::debug!("no cut set, nothing to promote");
            return Ok(0);
        };
        match self.gate.registry_mut() {
            Ok(registry) if !set.attach_pending => {
                let count = promote_set(registry, set, mass);
                tracing::info!(count, mass, "fragments promoted");
                self.events.push(SceneEvent::Promoted {
                    fragments: count,
                    mass,
                });
                Ok(count)
            }
            _ => {
                tracing::info!(mass, "physics not ready, promotion deferred");
                set.pending_mass = Some(mass);
                self.events.push(SceneEvent::PromoteDeferred { mass });
                Ok(0)
            }
        }
    }

    /// Arm the explosion at the configured center.
    pub fn arm(&mut self) -> ArmReport {
        self.arm_at(self.config.explosion_center)
    }

    /// Compute flight directions from `center` and wake every fragment body.
    pub fn arm_at(&mut self, center: Vec3) -> ArmReport {
        let Some(set) = self.cut.as_mut() else {
            tracing::warn!("nothing cut, explosion not armed");
            return ArmReport::default();
        };
        let report = self.explosion.arm(set.fragments(), set.parent(), center);
        if let Ok(registry) = self.gate.registry_mut() {
            for fragment in set.fragments_mut() {
                if let Some(handle) = fragment.body() {
                    registry.activate(handle);
                    fragment.set_mass_state(registry.state(handle));
                }
            }
        }
        tracing::info!(armed = report.armed, degenerate = report.degenerate.len(), ?center, "explosion armed");
        self.events.push(SceneEvent::Armed {
            fragments: report.armed,
            degenerate: report.degenerate.len(),
        });
        report
    }

    pub fn disarm(&mut self) {
        if self.explosion.is_armed() {
            self.explosion.disarm();
            self.events.push(SceneEvent::Disarmed);
        }
    }

    /// Advance one frame: pick up physics readiness, step the simulation,
    /// copy dynamic poses back, then let the animator move armed fragments.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let tick = self.tick + 1;
        let _span = tracing::info_span!("scene_tick", tick).entered();
        self.poll_gate();

        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        if let Ok(registry) = self.gate.registry_mut() {
            report.substeps = registry.step(dt);
            let registry = &*registry;
            let stats = if let Some(set) = self.cut.as_mut() {
                let parent = *set.parent();
                sync_fragments(registry, &parent, set.fragments_mut())
            } else if let Some(whole) = self.whole.as_mut() {
                sync_fragments(
                    registry,
                    &Transform::default(),
                    std::slice::from_mut(&mut whole.fragment),
                )
            } else {
                Default::default()
            };
            report.synced = stats.synced;
        }
        if let Some(set) = self.cut.as_mut() {
            let parent = *set.parent();
            report.flown = self.explosion.advance(set.fragments_mut(), &parent, dt);
        }

        self.tick = tick;
        tracing::debug!(substeps = report.substeps, synced = report.synced, flown = report.flown, "tick done");
        report
    }

    /// Snapshot of everything visible.
    pub fn render_frame(&self) -> RenderFrame {
        let items: Vec<RenderItem> = if let Some(set) = &self.cut {
            set.fragments()
                .iter()
                .map(|f| render_item(f, set.parent(), MaterialKind::FRAGMENT))
                .collect()
        } else if let Some(whole) = &self.whole {
            vec![render_item(
                &whole.fragment,
                &Transform::default(),
                whole.mesh.material(),
            )]
        } else {
            Vec::new()
        };
        RenderFrame {
            tick: self.tick,
            items,
        }
    }

    fn poll_gate(&mut self) {
        if self.gate.poll(&self.config) {
            self.on_physics_ready();
        }
    }

    fn on_physics_ready(&mut self) {
        tracing::info!(tick = self.tick, "physics ready");
        self.events.push(SceneEvent::PhysicsReady { tick: self.tick });
        self.flush_pending();
    }

    /// Attach whatever is waiting for physics. No-op until the gate is open.
    fn flush_pending(&mut self) {
        let Ok(registry) = self.gate.registry_mut() else {
            return;
        };
        if let Some(set) = self.cut.as_mut() {
            if set.attach_pending {
                set.attach_pending = false;
                let parent = *set.parent();
                for fragment in set.fragments_mut() {
                    attach_fragment(registry, &mut self.events, fragment, &parent);
                }
                tracing::info!(attached = set.attached_count(), total = set.len(), "cut set attached");
            }
            if let Some(mass) = set.pending_mass.take() {
                let count = promote_set(registry, set, mass);
                tracing::info!(count, mass, "deferred promotion applied");
                self.events.push(SceneEvent::Promoted {
                    fragments: count,
                    mass,
                });
            }
        } else if let Some(whole) = self.whole.as_mut().filter(|w| w.attach_pending) {
            whole.attach_pending = false;
            attach_fragment(
                registry,
                &mut self.events,
                &mut whole.fragment,
                &Transform::default(),
            );
        }
    }

    fn teardown_cut(&mut self) {
        self.disarm();
        let Some(mut set) = self.cut.take() else {
            return;
        };
        let mut detached = 0;
        if let Ok(registry) = self.gate.registry_mut() {
            for fragment in set.fragments_mut() {
                if let Some(handle) = fragment.take_body() {
                    if registry.detach(handle) {
                        detached += 1;
                    }
                }
            }
        }
        tracing::debug!(fragments = set.len(), detached, "cut set torn down");
    }

    fn detach_whole(&mut self) {
        let Some(whole) = self.whole.as_mut() else {
            return;
        };
        whole.attach_pending = false;
        if let Some(handle) = whole.fragment.take_body() {
            if let Ok(registry) = self.gate.registry_mut() {
                registry.detach(handle);
            }
        }
    }
}

/// Attach as a static body at the fragment's current world transform.
fn attach_fragment(
    registry: &mut RigidBodyRegistry,
    events: &mut Vec<SceneEvent>,
    fragment: &mut Fragment,
    parent: &Transform,
) {
    let world = fragment.world_transform(parent);
    match registry.attach(fragment.id(), fragment.geometry(), &world, 0.0) {
        Ok(handle) => {
            fragment.set_body(handle, registry.state(handle));
            events.push(SceneEvent::BodyAttached {
                fragment: fragment.id(),
                mass: 0.0,
            });
        }
        Err(e) => {
            tracing::warn!(fragment = %fragment.id(), error = %e, "attach failed, fragment stays visual only");
            events.push(SceneEvent::AttachFailed {
                fragment: fragment.id(),
                reason: e.to_string(),
            });
        }
    }
}

fn promote_set(registry: &mut RigidBodyRegistry, set: &mut FragmentSet, mass: f32) -> usize {
    let mut count = 0;
    for fragment in set.fragments_mut() {
        let Some(handle) = fragment.body() else {
            continue;
        };
        match registry.promote(handle, mass) {
            Ok(()) => {
                fragment.set_mass_state(registry.state(handle));
                count += 1;
            }
            Err(e) => tracing::warn!(fragment = %fragment.id(), error = %e, "promote failed"),
        }
    }
    count
}

fn render_item(fragment: &Fragment, parent: &Transform, material: MaterialKind) -> RenderItem {
    RenderItem {
        id: fragment.id(),
        parent: *parent,
        local: *fragment.local(),
        world: fragment.world_transform(parent),
        material,
        mass_state: fragment.mass_state(),
    }
}
