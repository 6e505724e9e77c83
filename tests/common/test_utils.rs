#![allow(dead_code)]

use std::{cell::Cell, collections::HashMap, io::Cursor, rc::Rc};

use flow_render::{
    backend::headless::HeadlessBackend,
    config::RenderConfig,
    error::TextureError,
    resources::{
        animation::AnimationClock,
        fetch::{Fetched, Fetcher},
    },
    render::Renderer,
    Vertex,
};
use image::{
    Delay, Frame, ImageFormat, Rgba, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
};
use instant::Duration;
use reqwest::Url;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

enum Response {
    Body {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Failure(String),
}

/// In-memory [`Fetcher`] that counts how often it was asked for something.
#[derive(Default)]
pub(crate) struct StubFetcher {
    responses: HashMap<String, Response>,
    calls: Rc<Cell<usize>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(mut self, url: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        self.responses.insert(
            url.to_string(),
            Response::Body {
                content_type: content_type.map(str::to_string),
                bytes,
            },
        );
        self
    }

    pub(crate) fn fail(mut self, url: &str, reason: &str) -> Self {
        self.responses
            .insert(url.to_string(), Response::Failure(reason.to_string()));
        self
    }

    /// Shared counter, still readable after the fetcher moved into a cache.
    pub(crate) fn calls(&self) -> Rc<Cell<usize>> {
        self.calls.clone()
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &Url) -> Result<Fetched, TextureError> {
        self.calls.set(self.calls.get() + 1);
        match self.responses.get(url.as_str()) {
            Some(Response::Body {
                content_type,
                bytes,
            }) => Ok(Fetched::new(content_type.as_deref(), Cursor::new(bytes.clone()))),
            Some(Response::Failure(reason)) => Err(TextureError::Network {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Err(TextureError::Network {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

pub(crate) fn solid(width: u32, height: u32, colour: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(colour))
}

pub(crate) fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("PNG encoding of a test image failed");
    bytes.into_inner()
}

/// A 2x2 GIF with one solid frame per entry of `delays_ms`.
pub(crate) fn gif_bytes(delays_ms: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder
            .set_repeat(Repeat::Infinite)
            .expect("GIF repeat could not be set");
        let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
            let shade = (i as u8).wrapping_mul(80);
            Frame::from_parts(
                solid(2, 2, [shade, 255 - shade, 0, 255]),
                0,
                0,
                Delay::from_numer_denom_ms(ms, 1),
            )
        });
        encoder
            .encode_frames(frames)
            .expect("GIF encoding of test frames failed");
    }
    bytes
}

/// Two counter-clockwise triangles covering `[-0.5, 0.5]²` facing +z.
pub(crate) fn quad() -> Vec<Vertex> {
    let v = |x: f32, y: f32| Vertex::new([0.0, 0.0, 1.0], [x + 0.5, 0.5 - y], [x, y, 0.0]);
    vec![
        v(-0.5, -0.5),
        v(0.5, -0.5),
        v(0.5, 0.5),
        v(-0.5, -0.5),
        v(0.5, 0.5),
        v(-0.5, 0.5),
    ]
}

/// A headless renderer whose animations are frozen at zero.
pub(crate) fn headless_renderer(fetcher: StubFetcher, config: &RenderConfig) -> Renderer<HeadlessBackend> {
    init_logger();
    let mut renderer = Renderer::with_fetcher(HeadlessBackend::new(), config, Box::new(fetcher))
        .expect("headless renderer could not be created");
    renderer.set_clock(AnimationClock::fixed(Duration::ZERO));
    renderer
}
