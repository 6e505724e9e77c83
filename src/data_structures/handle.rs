//! Opaque handles into the resource caches.
//!
//! Callers never see backend resources. They hold one of these small `Copy`
//! ids instead, which only the cache that issued it can turn back into a
//! GPU resource.

use std::fmt;

/// Index of an uploaded texture in the texture cache's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// Id of a cached vertex buffer. Ids are never reused within one cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexHandle(pub(crate) u64);

impl VertexHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vertices#{}", self.0)
    }
}
