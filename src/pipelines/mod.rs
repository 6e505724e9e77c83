//! Render pipelines.
//!
//! wgpu bakes blending, culling and topology into the pipeline, so every
//! distinct combination of those draw-state toggles maps to one pipeline.

pub mod fixed;
