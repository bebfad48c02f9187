//! Rendering adapter: renderer-agnostic interface over the scene's render frame.
//!
//! # Invariants
//! - Renderers cannot mutate the scene.
//! - Render output derives only from a [`shatter_kernel::RenderFrame`] and a view.

mod renderer;

pub use renderer::{BoundsRenderer, DebugTextRenderer, RenderView, Renderer};

pub fn crate_info() -> &'static str {
    "shatter-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
