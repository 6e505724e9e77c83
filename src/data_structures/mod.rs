//! Engine data structures: renderables, vertices, handles and textures.
//!
//! - `renderable` is the geometry + material + flags description handed in by scene code
//! - `vertex` is the interleaved vertex layout shared by cached and streamed geometry
//! - `handle` contains the opaque ids the caches hand out instead of GPU resources
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod handle;
pub mod renderable;
pub mod texture;
pub mod vertex;
