use std::collections::HashMap;

use crate::{
    backend::{Backend, Primitive},
    data_structures::{handle::VertexHandle, vertex::Vertex},
};

/**
 * GPU-resident copies of static geometry.
 *
 * Geometry that is drawn every frame but never changes (models, signs, ...)
 * is uploaded once and afterwards replayed by handle. Handles come from a
 * counter and are never reused, so a stale handle can never alias a newer
 * buffer. Releasing is the caller's job; the cache never evicts.
 */
pub struct VertexCache<B: Backend> {
    buffers: HashMap<VertexHandle, B::Buffer>,
    next: u64,
}

impl<B: Backend> VertexCache<B> {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next: 0,
        }
    }

    /// Uploads `vertices` and returns the handle to replay them with.
    pub fn cache(&mut self, backend: &mut B, vertices: &[Vertex], label: &str) -> VertexHandle {
        let handle = VertexHandle(self.next);
        self.next += 1;
        let buffer = backend.upload_vertices(vertices, label);
        self.buffers.insert(handle, buffer);
        log::debug!("Cached {} vertices of {label} as {handle}", vertices.len());
        handle
    }

    pub fn render_cached(&self, backend: &mut B, handle: VertexHandle) {
        debug_assert!(self.buffers.contains_key(&handle), "render of unknown {handle}");
        match self.buffers.get(&handle) {
            Some(buffer) => backend.draw_buffer(buffer),
            None => log::error!("Tried to render {handle}, which was released or never cached"),
        }
    }

    /// Draws `vertices` without keeping anything on the GPU.
    pub fn stream(&self, backend: &mut B, vertices: &[Vertex], primitive: Primitive) {
        backend.draw_vertices(vertices, primitive);
    }

    /// Frees the GPU buffer behind `handle`. Returns `false` for unknown handles.
    pub fn release(&mut self, backend: &mut B, handle: VertexHandle) -> bool {
        match self.buffers.remove(&handle) {
            Some(buffer) => {
                backend.release_buffer(buffer);
                true
            }
            None => {
                debug_assert!(false, "release of unknown {handle}");
                log::error!("Tried to release {handle}, which was released or never cached");
                false
            }
        }
    }

    pub fn contains(&self, handle: VertexHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<B: Backend> Default for VertexCache<B> {
    fn default() -> Self {
        Self::new()
    }
}
