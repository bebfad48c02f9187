use serde::{Deserialize, Serialize};
use shatter_common::{FragmentId, Transform};
use shatter_mesh::MaterialKind;
use shatter_physics::MassState;

/// One visible fragment as a renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItem {
    pub id: FragmentId,
    pub parent: Transform,
    pub local: Transform,
    pub world: Transform,
    pub material: MaterialKind,
    #[serde(skip, default = "unattached")]
    pub mass_state: MassState,
}

fn unattached() -> MassState {
    MassState::Unattached
}

/// Everything visible after a tick. Either the whole mesh or the cut set, never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub tick: u64,
    pub items: Vec<RenderItem>,
}

impl RenderFrame {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: FragmentId) -> Option<&RenderItem> {
        self.items.iter().find(|item| item.id == id)
    }
}
