//! Draw-state toggles and the scope guard that restores them.
//!
//! Fixed-function style rendering relies on global toggles (lighting, blend
//! function, culling, ...) that one draw changes and must change back before
//! the next unrelated draw. Instead of pairing every `disable` with a manual
//! `enable`, all temporary changes go through a [`StateScope`]. The scope
//! records the previous value of everything it touches and puts it back, in
//! reverse order, when it is dropped. That includes early returns and panics.

use std::ops::{Deref, DerefMut};

use cgmath::{Matrix4, Point3, SquareMatrix};

use crate::{backend::Backend, data_structures::{handle::TextureHandle, renderable::Color}};

/// Coordinates into the ambient light map (block light, sky light).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightmapCoords {
    pub x: f32,
    pub y: f32,
}

impl LightmapCoords {
    /// Block light 15 and sky light 15.
    pub const FULL_BRIGHT: LightmapCoords = LightmapCoords::from_packed((15 << 20) | (15 << 4));

    /// Splits a packed combined light value into lightmap coordinates.
    pub const fn from_packed(light: u32) -> Self {
        Self {
            x: (light % 65536) as f32,
            y: (light / 65536) as f32,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// `src_alpha, one_minus_src_alpha`
    Normal,
    /// `dst_color, src_alpha`, used for glowing and emissive parts.
    Bright,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CullFace {
    Back,
    Front,
}

/// Everything a backend needs to know to issue a draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    /// Directional shading based on face normals.
    pub system_lighting: bool,
    /// Ambient light sampled from the world.
    pub lightmap: LightmapCoords,
    pub blending: bool,
    pub blend_mode: BlendMode,
    pub texturing: bool,
    pub bound_texture: Option<TextureHandle>,
    pub cull_face: CullFace,
    pub line_width: f32,
    pub color: [f32; 4],
    pub transform: Matrix4<f32>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            system_lighting: true,
            lightmap: LightmapCoords::FULL_BRIGHT,
            blending: true,
            blend_mode: BlendMode::Normal,
            texturing: true,
            bound_texture: None,
            cull_face: CullFace::Back,
            line_width: 1.0,
            color: Color::WHITE.with_alpha(1.0),
            transform: Matrix4::identity(),
        }
    }
}

/// The part of [`DrawState`] that a draw must leave untouched.
///
/// Color and bound texture are excluded: every draw sets its own.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Toggles {
    pub system_lighting: bool,
    pub lightmap: LightmapCoords,
    pub blending: bool,
    pub blend_mode: BlendMode,
    pub texturing: bool,
    pub cull_face: CullFace,
    pub line_width: f32,
    pub transform: Matrix4<f32>,
}

/// Source of the packed combined light value at a block position.
pub trait LightProbe {
    fn combined_light(&self, x: i32, y: i32, z: i32) -> u32;
}

impl DrawState {
    pub fn toggles(&self) -> Toggles {
        Toggles {
            system_lighting: self.system_lighting,
            lightmap: self.lightmap,
            blending: self.blending,
            blend_mode: self.blend_mode,
            texturing: self.texturing,
            cull_face: self.cull_face,
            line_width: self.line_width,
            transform: self.transform,
        }
    }

    pub fn set_color(&mut self, color: Color, alpha: f32) {
        self.color = color.with_alpha(alpha);
    }

    /// Loads the world light at `position` into the lightmap.
    ///
    /// Light is sampled one block above the position; the block the object
    /// stands in is usually solid and would render it black.
    pub fn set_lighting_to_position(&mut self, position: Point3<f64>, probe: &dyn LightProbe) {
        let light = probe.combined_light(
            position.x.floor() as i32,
            (position.y + 1.0).floor() as i32,
            position.z.floor() as i32,
        );
        self.lightmap = LightmapCoords::from_packed(light);
    }
}

#[derive(Copy, Clone, Debug)]
enum Undo {
    SystemLighting(bool),
    Lightmap(LightmapCoords),
    Blending(bool),
    BlendMode(BlendMode),
    Texturing(bool),
    CullFace(CullFace),
    LineWidth(f32),
    Transform(Matrix4<f32>),
}

impl Undo {
    fn restore(self, state: &mut DrawState) {
        match self {
            Undo::SystemLighting(enabled) => state.system_lighting = enabled,
            Undo::Lightmap(coords) => state.lightmap = coords,
            Undo::Blending(enabled) => state.blending = enabled,
            Undo::BlendMode(mode) => state.blend_mode = mode,
            Undo::Texturing(enabled) => state.texturing = enabled,
            Undo::CullFace(face) => state.cull_face = face,
            Undo::LineWidth(width) => state.line_width = width,
            Undo::Transform(matrix) => state.transform = matrix,
        }
    }
}

/// Scoped draw-state changes on top of a backend.
///
/// The scope dereferences to the backend, so draws can be issued through it
/// while the changes are active:
///
/// ```ignore
/// let mut scope = StateScope::new(&mut backend);
/// scope.disable_lighting().bright_blend();
/// scope.draw_vertices(&vertices, Primitive::Triangles);
/// // lighting and blend function are restored here
/// ```
pub struct StateScope<'a, B: Backend> {
    backend: &'a mut B,
    undo: Vec<Undo>,
}

impl<'a, B: Backend> StateScope<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            undo: Vec::with_capacity(8),
        }
    }

    fn push(&mut self, undo: Undo, apply: impl FnOnce(&mut DrawState)) -> &mut Self {
        self.undo.push(undo);
        apply(self.backend.state_mut());
        self
    }

    /// Turns off both directional shading and ambient world light.
    pub fn disable_lighting(&mut self) -> &mut Self {
        self.disable_system_lighting().disable_internal_lighting()
    }

    /// Turns off directional shading; the lightmap still applies.
    pub fn disable_system_lighting(&mut self) -> &mut Self {
        let previous = self.backend.state().system_lighting;
        self.push(Undo::SystemLighting(previous), |state| state.system_lighting = false)
    }

    /// Renders as if in full daylight. The previous lightmap is restored exactly.
    pub fn disable_internal_lighting(&mut self) -> &mut Self {
        let previous = self.backend.state().lightmap;
        self.push(Undo::Lightmap(previous), |state| {
            state.lightmap = LightmapCoords::FULL_BRIGHT
        })
    }

    pub fn bright_blend(&mut self) -> &mut Self {
        let previous = self.backend.state().blend_mode;
        self.push(Undo::BlendMode(previous), |state| state.blend_mode = BlendMode::Bright)
    }

    pub fn enable_blending(&mut self) -> &mut Self {
        self.set_blending(true)
    }

    pub fn disable_blending(&mut self) -> &mut Self {
        self.set_blending(false)
    }

    fn set_blending(&mut self, enabled: bool) -> &mut Self {
        let previous = self.backend.state().blending;
        self.push(Undo::Blending(previous), |state| state.blending = enabled)
    }

    pub fn disable_texturing(&mut self) -> &mut Self {
        let previous = self.backend.state().texturing;
        self.push(Undo::Texturing(previous), |state| state.texturing = false)
    }

    /// Culls front faces instead of back faces, for geometry mirrored on one axis.
    pub fn cull_front(&mut self) -> &mut Self {
        let previous = self.backend.state().cull_face;
        self.push(Undo::CullFace(previous), |state| state.cull_face = CullFace::Front)
    }

    pub fn line_width(&mut self, width: f32) -> &mut Self {
        let previous = self.backend.state().line_width;
        self.push(Undo::LineWidth(previous), |state| state.line_width = width)
    }

    /// Post-multiplies the current transform, like pushing a matrix and scaling it.
    pub fn push_transform(&mut self, matrix: Matrix4<f32>) -> &mut Self {
        let previous = self.backend.state().transform;
        self.push(Undo::Transform(previous), |state| {
            state.transform = previous * matrix
        })
    }

    /// Not restored: every draw sets its own color.
    pub fn set_color(&mut self, color: Color, alpha: f32) -> &mut Self {
        self.backend.state_mut().set_color(color, alpha);
        self
    }

    /// Number of changes that will be undone on drop.
    pub fn depth(&self) -> usize {
        self.undo.len()
    }
}

impl<B: Backend> Deref for StateScope<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: Backend> DerefMut for StateScope<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: Backend> Drop for StateScope<'_, B> {
    fn drop(&mut self) {
        let state = self.backend.state_mut();
        while let Some(undo) = self.undo.pop() {
            undo.restore(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;

    struct Torch;

    impl LightProbe for Torch {
        fn combined_light(&self, _: i32, y: i32, _: i32) -> u32 {
            // block light 12, sky light depends on height
            (y as u32 % 16) << 20 | 12 << 4
        }
    }

    #[test]
    fn full_bright_splits_packed_light() {
        assert_eq!(LightmapCoords::FULL_BRIGHT, LightmapCoords { x: 240.0, y: 240.0 });
    }

    #[test]
    fn lightmap_is_sampled_one_block_above() {
        let mut state = DrawState::default();
        state.set_lighting_to_position(Point3::new(0.5, 3.2, -1.5), &Torch);
        assert_eq!(state.lightmap, LightmapCoords::from_packed(4 << 20 | 12 << 4));
        assert_eq!(state.lightmap, LightmapCoords { x: 192.0, y: 64.0 });
    }

    #[test]
    fn nested_scopes_restore_inner_then_outer() {
        let mut backend = HeadlessBackend::new();
        let before = backend.state().clone();
        {
            let mut outer = StateScope::new(&mut backend);
            outer.bright_blend();
            {
                let mut inner = StateScope::new(&mut *outer);
                inner.bright_blend().disable_texturing();
                assert_eq!(inner.state().blend_mode, BlendMode::Bright);
            }
            assert_eq!(outer.state().blend_mode, BlendMode::Bright);
            assert!(outer.state().texturing);
        }
        assert_eq!(backend.state(), &before);
    }

    #[test]
    fn transforms_compose_and_unwind() {
        let mut backend = HeadlessBackend::new();
        {
            let mut scope = StateScope::new(&mut backend);
            scope
                .push_transform(Matrix4::from_scale(2.0))
                .push_transform(Matrix4::from_scale(3.0));
            assert_eq!(scope.state().transform, Matrix4::from_scale(6.0));
            assert_eq!(scope.depth(), 2);
        }
        assert_eq!(backend.state().transform, Matrix4::identity());
    }
}
