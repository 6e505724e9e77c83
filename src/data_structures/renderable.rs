//! The renderable description consumed by [`crate::render::Renderer`].
//!
//! Scene collaborators build a [`RenderableObject`] once per frame (dynamic
//! geometry) or once at load time (static geometry with `cache_vertices`).
//! The renderer only ever mutates it to swap raw geometry for a cached
//! vertex handle.

use crate::data_structures::{handle::VertexHandle, vertex::Vertex};

/// Reserved identifier for the engine's block/atlas texture.
pub const GLOBAL_TEXTURE_NAME: &str = "global";
/// Reserved identifier for the engine's particle sheet.
pub const PARTICLE_TEXTURE_NAME: &str = "particle";

/// Linear RGB color used to modulate a draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Builds a color from a packed `0xRRGGBB` value.
    pub fn from_rgb(rgb: u32) -> Self {
        let channel = |shift: u32| ((rgb >> shift) & 0xFF) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    pub fn with_alpha(self, alpha: f32) -> [f32; 4] {
        [self.red, self.green, self.blue, alpha]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Geometry plus material plus draw flags for one draw call.
#[derive(Clone, Debug)]
pub struct RenderableObject {
    /// Debug name used for GPU labels and log lines.
    pub label: String,
    /// Raw geometry. Emptied once the object has been cached.
    pub vertices: Vec<Vertex>,
    /// Texture identifier: alias, `domain:path`, plain path or URL. `None` draws untextured.
    pub texture: Option<String>,
    pub color: Color,
    pub alpha: f32,
    pub scale: f32,
    /// Non-zero renders the geometry as a line list of this width.
    pub line_width: f32,
    pub disable_lighting: bool,
    pub ignore_world_shading: bool,
    pub enable_bright_blending: bool,
    pub is_mirrored: bool,
    pub cache_vertices: bool,
    pub(crate) cached_vertices: Option<VertexHandle>,
}

impl RenderableObject {
    /// Triangle geometry with full opacity, unit scale and default lighting.
    pub fn new(
        label: impl Into<String>,
        texture: Option<&str>,
        color: Color,
        vertices: Vec<Vertex>,
        cache_vertices: bool,
    ) -> Self {
        Self {
            label: label.into(),
            vertices,
            texture: texture.map(str::to_string),
            color,
            alpha: 1.0,
            scale: 1.0,
            line_width: 0.0,
            disable_lighting: false,
            ignore_world_shading: false,
            enable_bright_blending: false,
            is_mirrored: false,
            cache_vertices,
            cached_vertices: None,
        }
    }

    /// Untextured line geometry. Lines are never cached.
    pub fn lines(
        label: impl Into<String>,
        color: Color,
        vertices: Vec<Vertex>,
        line_width: f32,
    ) -> Self {
        Self {
            line_width,
            ..Self::new(label, None, color, vertices, false)
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// The handle of the cached geometry, once the object has been rendered with caching on.
    pub fn cached_vertices(&self) -> Option<VertexHandle> {
        self.cached_vertices
    }

    pub fn is_cached(&self) -> bool {
        self.cached_vertices.is_some()
    }
}
