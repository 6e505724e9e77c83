//! Remote texture downloads.
//!
//! Only the `Content-Type` header matters: it decides whether the body is
//! rejected, decoded as a still image or decoded as an animation. The body
//! is not read until the type has been accepted.

use std::io::Read;

use image::ImageFormat;
use reqwest::Url;

use crate::{config::RenderConfig, error::TextureError};

/// A response whose body has not been read yet.
pub struct Fetched {
    pub content_type: Option<String>,
    pub body: Box<dyn Read>,
}

impl Fetched {
    pub fn new(content_type: Option<&str>, body: impl Read + 'static) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            body: Box::new(body),
        }
    }
}

/// Blocking transport used by the texture cache.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Fetched, TextureError>;
}

/// [`Fetcher`] over HTTP(S) with the timeout and user agent from [`RenderConfig`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &RenderConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Fetched, TextureError> {
        log::info!("Downloading texture from {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| TextureError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Ok(Fetched {
            content_type,
            body: Box::new(response),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Still,
    Animated,
}

/// `image/<extension>` for every format the decoder can read.
pub fn accepted_content_types() -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for format in ImageFormat::all().filter(|format| format.reading_enabled()) {
        for extension in format.extensions_str() {
            let mime = format!("image/{extension}");
            if !types.contains(&mime) {
                types.push(mime);
            }
        }
    }
    types
}

/// Decides how a response body is decoded, or rejects it.
///
/// Parameters such as `; charset=binary` are ignored and the comparison is
/// case-insensitive. Only `gif` goes down the animated path.
pub fn classify(content_type: Option<&str>, accepted: &[String]) -> Result<ContentKind, TextureError> {
    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if !accepted.iter().any(|valid| *valid == mime) {
        return Err(TextureError::UnsupportedContentType {
            found: content_type.unwrap_or("none").to_string(),
            accepted: accepted.to_vec(),
        });
    }
    if mime.ends_with("gif") {
        Ok(ContentKind::Animated)
    } else {
        Ok(ContentKind::Still)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_enabled_decoder() {
        let accepted = accepted_content_types();
        for mime in ["image/png", "image/jpg", "image/jpeg", "image/gif", "image/bmp", "image/webp"] {
            assert!(accepted.iter().any(|a| a == mime), "{mime} missing from {accepted:?}");
        }
        assert!(!accepted.iter().any(|a| a == "text/html"));
    }

    #[test]
    fn gif_is_the_only_animated_type() {
        let accepted = accepted_content_types();
        assert_eq!(classify(Some("image/gif"), &accepted), Ok(ContentKind::Animated));
        assert_eq!(classify(Some("image/webp"), &accepted), Ok(ContentKind::Still));
        assert_eq!(classify(Some("IMAGE/PNG; charset=binary"), &accepted), Ok(ContentKind::Still));
    }

    #[test]
    fn missing_header_is_rejected() {
        let accepted = accepted_content_types();
        let err = classify(None, &accepted).unwrap_err();
        assert!(err.to_string().contains("Found: none"), "{err}");
    }
}
