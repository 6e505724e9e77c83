//! Graphics backends.
//!
//! The caches and the dispatcher only talk to the GPU through [`Backend`].
//! A backend owns the current [`DrawState`] and reads it whenever a draw is
//! issued, which is what makes the fixed-function style toggles work on top
//! of an explicit API such as wgpu.
//!
//! - `headless` records draws and state snapshots without a GPU
//! - `gpu` turns draws into pipelines and replays them into a render pass

pub mod headless;
pub mod gpu;

use image::RgbaImage;

use crate::{data_structures::vertex::Vertex, state::DrawState};

/// Primitive topology of streamed geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Lines,
}

pub trait Backend {
    /// Backend resource behind a [`crate::data_structures::handle::TextureHandle`].
    type Texture;
    /// Backend resource behind a [`crate::data_structures::handle::VertexHandle`].
    type Buffer;

    fn state(&self) -> &DrawState;

    fn state_mut(&mut self) -> &mut DrawState;

    /// Upload an RGBA image. Called once per texture or animation frame.
    fn upload_texture(&mut self, image: &RgbaImage, label: &str) -> anyhow::Result<Self::Texture>;

    /// Make `texture` the source for the following draws.
    fn bind_texture(&mut self, texture: &Self::Texture);

    /// Copy triangle geometry into a GPU-resident buffer.
    fn upload_vertices(&mut self, vertices: &[Vertex], label: &str) -> Self::Buffer;

    /// Draw a buffer created by [`Backend::upload_vertices`] with the current state.
    fn draw_buffer(&mut self, buffer: &Self::Buffer);

    /// Draw transient geometry with the current state without retaining it.
    fn draw_vertices(&mut self, vertices: &[Vertex], primitive: Primitive);

    fn release_buffer(&mut self, buffer: Self::Buffer);
}
