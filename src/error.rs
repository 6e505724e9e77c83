//! Texture resolution errors.
//!
//! None of these abort a draw. The texture cache substitutes the fallback
//! texture and hands the error back so the caller can show it (e.g. in a
//! chat line or a GUI label). The `Display` output is meant for players.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("Could not find texture: {0}. Reverting to fallback texture.")]
    ResourceNotFound(String),

    #[error("Invalid content type found. Found: {found}, but the only valid types are: {}", .accepted.join(", "))]
    UnsupportedContentType { found: String, accepted: Vec<String> },

    #[error("Could not open URL {url} for processing. Error was: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("Could not download {url}. Error was: {reason}")]
    Network { url: String, reason: String },

    #[error("Could not parse image. Error was: {0}")]
    Decode(String),

    #[error("Could not parse GIF due to no frames being present. Is this a real direct link or a fake one?")]
    NoFrames,

    #[error("Could not upload texture {label} to the GPU. Error was: {reason}")]
    Upload { label: String, reason: String },
}

impl TextureError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        TextureError::Decode(err.to_string())
    }
}
