//! flow-render
//!
//! Fixed-function style draw dispatch for flow. Game code describes what to
//! draw as a [`RenderableObject`] (geometry, texture identifier, color and a
//! handful of lighting and blending flags) and hands it to a [`Renderer`],
//! which resolves and caches the GPU resources it needs and issues exactly
//! one draw call with scoped state changes.
//!
//! High-level modules
//! - `backend`: the seam to the GPU (wgpu) and a headless recording backend
//! - `config`: resource root, download timeout and other runtime settings
//! - `context`: offscreen wgpu device, targets and pixel readback
//! - `data_structures`: vertices, handles, renderables and GPU textures
//! - `error`: texture resolution errors
//! - `pipelines`: the fixed-function pipeline and its shader
//! - `resources`: texture cache (local, remote and animated) and vertex cache
//! - `render`: the per-object draw dispatcher
//! - `state`: draw-state toggles and the scope guard restoring them
//!

pub mod backend;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod state;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::{Backend, Primitive};
pub use config::RenderConfig;
pub use data_structures::{
    handle::{TextureHandle, VertexHandle},
    renderable::{Color, RenderableObject},
    vertex::Vertex,
};
pub use error::TextureError;
pub use render::Renderer;
pub use state::{DrawState, StateScope};
