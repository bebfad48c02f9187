use glam::Mat4;
use shatter_common::{FragmentId, Transform};
use shatter_mesh::FragmentGeometry;
use shatter_physics::{BodyHandle, MassState};

/// One visual + physical unit: the whole mesh, or one tetrahedron after a cut.
#[derive(Debug, Clone)]
pub struct Fragment {
    id: FragmentId,
    geometry: FragmentGeometry,
    pub(crate) local: Transform,
    body: Option<BodyHandle>,
    mass_state: MassState,
}

impl Fragment {
    pub fn new(geometry: FragmentGeometry, local: Transform) -> Self {
        Self {
            id: FragmentId::new(),
            geometry,
            local,
            body: None,
            mass_state: MassState::Unattached,
        }
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn geometry(&self) -> &FragmentGeometry {
        &self.geometry
    }

    /// Transform relative to the parent node.
    pub fn local(&self) -> &Transform {
        &self.local
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn mass_state(&self) -> MassState {
        self.mass_state
    }

    pub fn world_matrix(&self, parent: &Transform) -> Mat4 {
        parent.to_mat4() * self.local.to_mat4()
    }

    pub fn world_transform(&self, parent: &Transform) -> Transform {
        Transform::from_mat4(self.world_matrix(parent))
    }

    pub(crate) fn set_body(&mut self, handle: BodyHandle, state: MassState) {
        self.body = Some(handle);
        self.mass_state = state;
    }

    pub(crate) fn set_mass_state(&mut self, state: MassState) {
        self.mass_state = state;
    }

    /// Forget the body. The caller detaches it from the registry.
    pub(crate) fn take_body(&mut self) -> Option<BodyHandle> {
        self.mass_state = MassState::Unattached;
        self.body.take()
    }
}

/// Fragments from one cut, sharing a parent transform.
///
/// # Invariants
/// - Members join and leave physics as a group (`attach_pending` covers all of them).
#[derive(Debug, Clone)]
pub struct FragmentSet {
    parent: Transform,
    fragments: Vec<Fragment>,
    pub(crate) attach_pending: bool,
    /// Promotion requested before physics was ready.
    pub(crate) pending_mass: Option<f32>,
}

impl FragmentSet {
    pub fn new(parent: Transform, fragments: Vec<Fragment>) -> Self {
        Self {
            parent,
            fragments,
            attach_pending: true,
            pending_mass: None,
        }
    }

    pub fn parent(&self) -> &Transform {
        &self.parent
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub(crate) fn fragments_mut(&mut self) -> &mut [Fragment] {
        &mut self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: FragmentId) -> Option<&mut Fragment> {
        self.fragments.iter_mut().find(|f| f.id() == id)
    }

    /// Number of members currently holding a body.
    pub fn attached_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.body().is_some()).count()
    }
}
