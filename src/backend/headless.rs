//! A backend without a GPU.
//!
//! Every draw is recorded together with a snapshot of the [`DrawState`] it
//! was issued with. Useful for dedicated servers that share render code with
//! the client, for tooling, and for asserting on draw behavior in tests.

use std::collections::HashMap;

use image::RgbaImage;

use crate::{
    backend::{Backend, Primitive},
    data_structures::vertex::Vertex,
    state::DrawState,
};

/// An uploaded image. Only its size is kept.
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessTexture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// An uploaded vertex buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessBuffer {
    pub id: u64,
    pub vertex_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Cached { buffer: u64, vertex_count: usize },
    Streamed { primitive: Primitive, vertices: Vec<Vertex> },
}

/// One recorded draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub geometry: Geometry,
    /// Backend id of the texture bound at draw time.
    pub texture: Option<u32>,
    pub state: DrawState,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: DrawState,
    bound: Option<u32>,
    textures_uploaded: u32,
    texture_limit: Option<u32>,
    next_buffer: u64,
    live_buffers: HashMap<u64, usize>,
    draws: Vec<DrawCall>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every texture upload after the first `limit`, like a device out of memory.
    pub fn with_texture_limit(mut self, limit: u32) -> Self {
        self.texture_limit = Some(limit);
        self
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn last_draw(&self) -> Option<&DrawCall> {
        self.draws.last()
    }

    /// Returns and forgets all recorded draws, like presenting a frame.
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    pub fn textures_uploaded(&self) -> u32 {
        self.textures_uploaded
    }

    /// Number of vertex buffers uploaded and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.len()
    }

    fn record(&mut self, geometry: Geometry) {
        let texture = if self.state.texturing { self.bound } else { None };
        self.draws.push(DrawCall {
            geometry,
            texture,
            state: self.state.clone(),
        });
    }
}

impl Backend for HeadlessBackend {
    type Texture = HeadlessTexture;
    type Buffer = HeadlessBuffer;

    fn state(&self) -> &DrawState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DrawState {
        &mut self.state
    }

    fn upload_texture(&mut self, image: &RgbaImage, label: &str) -> anyhow::Result<HeadlessTexture> {
        anyhow::ensure!(
            image.width() > 0 && image.height() > 0,
            "cannot upload an empty image for {label}"
        );
        if let Some(limit) = self.texture_limit {
            anyhow::ensure!(
                self.textures_uploaded < limit,
                "out of texture memory after {limit} uploads"
            );
        }
        let texture = HeadlessTexture {
            id: self.textures_uploaded,
            width: image.width(),
            height: image.height(),
        };
        self.textures_uploaded += 1;
        Ok(texture)
    }

    fn bind_texture(&mut self, texture: &HeadlessTexture) {
        self.bound = Some(texture.id);
    }

    fn upload_vertices(&mut self, vertices: &[Vertex], _label: &str) -> HeadlessBuffer {
        let id = self.next_buffer;
        self.next_buffer += 1;
        self.live_buffers.insert(id, vertices.len());
        HeadlessBuffer {
            id,
            vertex_count: vertices.len(),
        }
    }

    fn draw_buffer(&mut self, buffer: &HeadlessBuffer) {
        debug_assert!(
            self.live_buffers.contains_key(&buffer.id),
            "draw of released buffer {}",
            buffer.id
        );
        self.record(Geometry::Cached {
            buffer: buffer.id,
            vertex_count: buffer.vertex_count,
        });
    }

    fn draw_vertices(&mut self, vertices: &[Vertex], primitive: Primitive) {
        self.record(Geometry::Streamed {
            primitive,
            vertices: vertices.to_vec(),
        });
    }

    fn release_buffer(&mut self, buffer: HeadlessBuffer) {
        self.live_buffers.remove(&buffer.id);
    }
}
