use glam::Vec3;
use shatter_kernel::{RenderFrame, RenderItem};
use shatter_mesh::MaterialKind;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov_degrees: 75.0,
        }
    }
}

/// Renderer-agnostic interface.
///
/// A renderer consumes the frame the scene produced after a tick. It never
/// reaches back into the scene.
pub trait Renderer {
    type Output;

    fn render(&self, frame: &RenderFrame, view: &RenderView) -> Self::Output;
}

/// Human-readable dump of a render frame, for the CLI and logs.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    /// Also print local transforms.
    pub show_local: bool,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self) -> Self {
        self.show_local = true;
        self
    }

    fn item_line(&self, item: &RenderItem) -> String {
        let p = item.world.position;
        let material = match item.material {
            MaterialKind::VertexColors => "vertex-colors".to_string(),
            MaterialKind::Wireframe { color } => {
                format!("wire({:.2},{:.2},{:.2})", color[0], color[1], color[2])
            }
        };
        let mut line = format!(
            "  [{}] world=({:.3}, {:.3}, {:.3}) {:?} {}",
            item.id.short(),
            p.x,
            p.y,
            p.z,
            item.mass_state,
            material
        );
        if self.show_local {
            let l = item.local.position;
            line.push_str(&format!(" local=({:.3}, {:.3}, {:.3})", l.x, l.y, l.z));
        }
        line.push('\n');
        line
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, frame: &RenderFrame, view: &RenderView) -> String {
        let mut out = format!("=== Frame (tick={}) ===\n", frame.tick);
        out.push_str(&format!("Fragments: {}\n", frame.len()));
        out.push_str(&format!(
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}\n",
            view.eye.x,
            view.eye.y,
            view.eye.z,
            view.target.x,
            view.target.y,
            view.target.z,
            view.fov_degrees
        ));
        for item in &frame.items {
            out.push_str(&self.item_line(item));
        }
        out
    }
}

/// Axis-aligned world bounds of every fragment origin in the frame.
#[derive(Debug, Default)]
pub struct BoundsRenderer;

impl Renderer for BoundsRenderer {
    type Output = Option<(Vec3, Vec3)>;

    fn render(&self, frame: &RenderFrame, _view: &RenderView) -> Self::Output {
        let mut points = frame.items.iter().map(|item| item.world.position);
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use shatter_common::{SimConfig, Transform};
    use shatter_kernel::Scene;
    use shatter_mesh::{Mesh, unit_cube};
    use shatter_tetgen::FixedFragmenter;

    fn cube_scene() -> Scene {
        let mut scene = Scene::with_physics(SimConfig::default());
        scene.load_whole(
            Mesh::new(unit_cube()).unwrap(),
            Transform::from_rotation_scale(Quat::IDENTITY, 2.0),
        );
        scene
    }

    #[test]
    fn empty_frame() {
        let output = DebugTextRenderer::new().render(&RenderFrame::default(), &RenderView::default());
        assert!(output.contains("tick=0"));
        assert!(output.contains("Fragments: 0"));
    }

    #[test]
    fn whole_mesh_line() {
        let scene = cube_scene();
        let output = DebugTextRenderer::new().render(&scene.render_frame(), &RenderView::default());
        assert!(output.contains("Fragments: 1"));
        assert!(output.contains("Static"));
        assert!(output.contains("wire(0.80,0.48,0.00)"));
    }

    #[test]
    fn cut_frame_lists_every_fragment() {
        let mut scene = cube_scene();
        scene.cut(&mut FixedFragmenter::cube()).unwrap();
        let output = DebugTextRenderer::new()
            .with_local()
            .render(&scene.render_frame(), &RenderView::default());
        assert!(output.contains("Fragments: 6"));
        assert_eq!(output.matches("local=").count(), 6);
        assert_eq!(output.matches("wire(1.00,0.27,0.27)").count(), 6);
    }

    #[test]
    fn bounds_cover_scrambled_circle() {
        let mut scene = cube_scene();
        scene.cut(&mut FixedFragmenter::cube()).unwrap();
        scene.scramble(shatter_kernel::ScrambleTarget::Active);
        let (lo, hi) = BoundsRenderer
            .render(&scene.render_frame(), &RenderView::default())
            .unwrap();
        // Circle of radius 150 under a parent scaled by 2.
        assert!((hi.x - 300.0).abs() < 1e-2);
        assert!(lo.x < -250.0);
        assert!(BoundsRenderer
            .render(&RenderFrame::default(), &RenderView::default())
            .is_none());
    }

    #[test]
    fn render_view_default() {
        let view = RenderView::default();
        assert_eq!(view.fov_degrees, 75.0);
        assert_eq!(view.target, Vec3::ZERO);
    }
}
