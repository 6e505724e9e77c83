/**
 * This module contains all logic for turning identifiers and raw geometry into
 * GPU resources: texture resolution (local, remote and animated) and cached
 * vertex buffers.
 */
pub mod animation;
pub mod fetch;
pub mod mesh;
pub mod texture;
