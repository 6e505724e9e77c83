//! Draw dispatch.
//!
//! [`Renderer`] is the composition root of the resource layer: it owns the
//! backend, the texture cache, the vertex cache and the animation clock, and
//! turns one [`RenderableObject`] into one draw call.
//!
//! # Per-draw sequence
//!
//! 1. apply the object's lighting and blending toggles
//! 2. bind its texture, or switch texturing off if it has none
//! 3. set color and alpha
//! 4. push the scale transform (x negated and front faces culled when mirrored)
//! 5. replay cached geometry, draw lines, or stream triangles
//! 6. undo everything from 1, 2 and 4 in reverse order
//!
//! Steps 1–4 go through a [`StateScope`], so step 6 also happens when a
//! backend panics halfway through a draw.

use cgmath::{Matrix4, Point3};
use image::RgbaImage;
use instant::Duration;

use crate::{
    backend::{Backend, Primitive},
    config::RenderConfig,
    data_structures::{handle::TextureHandle, renderable::RenderableObject},
    error::TextureError,
    resources::{
        animation::AnimationClock,
        fetch::{Fetcher, HttpFetcher},
        mesh::VertexCache,
        texture::{Resolution, TextureCache},
    },
    state::{LightProbe, StateScope},
};

pub struct Renderer<B: Backend> {
    backend: B,
    textures: TextureCache<B>,
    vertices: VertexCache<B>,
    clock: AnimationClock,
}

impl<B: Backend> Renderer<B> {
    /// A renderer that downloads remote textures over HTTP.
    pub fn new(backend: B, config: &RenderConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(config)?;
        Self::with_fetcher(backend, config, Box::new(fetcher))
    }

    pub fn with_fetcher(
        mut backend: B,
        config: &RenderConfig,
        fetcher: Box<dyn Fetcher>,
    ) -> anyhow::Result<Self> {
        let textures = TextureCache::new(&mut backend, config, fetcher)?;
        Ok(Self {
            backend,
            textures,
            vertices: VertexCache::new(),
            clock: AnimationClock::start(),
        })
    }

    /// Renders `object` with one draw call and restores every toggle it changed.
    ///
    /// The draw is always issued. `Err` carries the reason the fallback
    /// texture was used instead of the requested one.
    pub fn render(&mut self, object: &mut RenderableObject) -> Result<(), TextureError> {
        #[cfg(debug_assertions)]
        let before = self.backend.state().toggles();

        let elapsed = self.clock.elapsed();
        let result = {
            let mut scope = StateScope::new(&mut self.backend);
            if object.disable_lighting {
                scope.disable_lighting();
            }
            if object.ignore_world_shading {
                scope.disable_system_lighting();
            }
            if object.enable_bright_blending {
                scope.bright_blend();
            }

            let result = match object.texture.as_deref() {
                Some(identifier) => self
                    .textures
                    .bind(&mut *scope, identifier, elapsed)
                    .map(|_| ()),
                None => {
                    scope.disable_texturing();
                    Ok(())
                }
            };
            scope.set_color(object.color, object.alpha);

            let scale = object.scale;
            if object.is_mirrored {
                scope
                    .push_transform(Matrix4::from_nonuniform_scale(-scale, scale, scale))
                    .cull_front();
            } else {
                scope.push_transform(Matrix4::from_scale(scale));
            }

            if object.cache_vertices {
                let handle = match object.cached_vertices {
                    Some(handle) => handle,
                    None => {
                        let handle = self.vertices.cache(&mut *scope, &object.vertices, &object.label);
                        object.cached_vertices = Some(handle);
                        object.vertices = Vec::new();
                        handle
                    }
                };
                self.vertices.render_cached(&mut *scope, handle);
            } else if object.line_width != 0.0 {
                scope.line_width(object.line_width);
                self.vertices.stream(&mut *scope, &object.vertices, Primitive::Lines);
            } else {
                self.vertices.stream(&mut *scope, &object.vertices, Primitive::Triangles);
            }
            result
        };

        #[cfg(debug_assertions)]
        debug_assert_eq!(
            before,
            self.backend.state().toggles(),
            "draw of {} leaked state",
            object.label
        );
        result
    }

    /// Frees the GPU copy of a cached object. The object cannot be drawn afterwards.
    pub fn delete_vertices(&mut self, object: &mut RenderableObject) {
        if let Some(handle) = object.cached_vertices.take() {
            self.vertices.release(&mut self.backend, handle);
        }
    }

    /// Downloads a remote texture now instead of on its first draw.
    pub fn download_url_texture(&mut self, url: &str) -> Result<(), TextureError> {
        self.textures.download(&mut self.backend, url)
    }

    pub fn resolve_texture(&mut self, identifier: &str) -> Resolution {
        let elapsed = self.clock.elapsed();
        self.textures.resolve(&mut self.backend, identifier, elapsed)
    }

    /// Makes `alias` (e.g. [`crate::data_structures::renderable::GLOBAL_TEXTURE_NAME`])
    /// resolve to `image`.
    pub fn register_alias(&mut self, alias: &str, image: &RgbaImage) -> anyhow::Result<TextureHandle> {
        self.textures.register_alias(&mut self.backend, alias, image)
    }

    /// Loads the world light at `position` for the following draws.
    pub fn set_lighting_to_position(&mut self, position: Point3<f64>, probe: &dyn LightProbe) {
        self.backend.state_mut().set_lighting_to_position(position, probe);
    }

    /// Toggles that stay active across several draws until the scope is dropped.
    pub fn scope(&mut self) -> StateScope<'_, B> {
        StateScope::new(&mut self.backend)
    }

    pub fn set_clock(&mut self, clock: AnimationClock) {
        self.clock = clock;
    }

    /// Freezes animated textures at `elapsed`.
    pub fn set_animation_time(&mut self, elapsed: Duration) {
        self.clock = AnimationClock::fixed(elapsed);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn textures(&self) -> &TextureCache<B> {
        &self.textures
    }

    pub fn vertices(&self) -> &VertexCache<B> {
        &self.vertices
    }
}
