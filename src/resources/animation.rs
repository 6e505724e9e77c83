//! Animated textures.
//!
//! A GIF is decoded into one RGBA image per frame plus the frame's delay.
//! After upload the frames form an [`AnimatedSequence`] whose current frame
//! is a pure function of elapsed time, so any number of renderables can
//! share one sequence without per-consumer state.

use std::io::Cursor;

use image::{AnimationDecoder, RgbaImage, codecs::gif::GifDecoder};
use instant::{Duration, Instant};

use crate::{data_structures::handle::TextureHandle, error::TextureError};

/// One decoded, not yet uploaded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

/// Decodes every frame of a GIF.
///
/// A GIF without frames is an error: there is nothing sensible to show.
pub fn decode_gif(bytes: &[u8]) -> Result<Vec<DecodedFrame>, TextureError> {
    // The decoder reports a frameless file as a truncated one, so check the
    // block structure first to tell the two apart.
    if contains_image_block(bytes) == Some(false) {
        return Err(TextureError::NoFrames);
    }
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(TextureError::decode)?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(TextureError::decode)?;
    if frames.is_empty() {
        return Err(TextureError::NoFrames);
    }
    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = Duration::from_micros(u64::from(numer) * 1000 / u64::from(denom.max(1)));
            DecodedFrame {
                image: frame.into_buffer(),
                delay,
            }
        })
        .collect())
}

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Walks the GIF block structure up to the first image descriptor.
///
/// `Some(false)` means the file is well formed and ends without a single
/// image. `None` means it is not a GIF or is cut off before that point.
fn contains_image_block(bytes: &[u8]) -> Option<bool> {
    let header = bytes.get(..13)?;
    if !header.starts_with(b"GIF87a") && !header.starts_with(b"GIF89a") {
        return None;
    }
    let packed = header[10];
    let mut at = 13;
    if packed & 0x80 != 0 {
        at += 3 * (1usize << ((packed & 0x07) + 1));
    }
    loop {
        match *bytes.get(at)? {
            IMAGE_SEPARATOR => return Some(true),
            TRAILER => return Some(false),
            EXTENSION_INTRODUCER => {
                // introducer, label, then sub-blocks until a zero length
                at += 2;
                loop {
                    let len = usize::from(*bytes.get(at)?);
                    at += 1 + len;
                    if len == 0 {
                        break;
                    }
                }
            }
            _ => return None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnimationFrame {
    pub texture: TextureHandle,
    pub delay: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedSequence {
    frames: Vec<AnimationFrame>,
    total: Duration,
}

impl AnimatedSequence {
    pub fn new(frames: Vec<AnimationFrame>) -> Result<Self, TextureError> {
        if frames.is_empty() {
            return Err(TextureError::NoFrames);
        }
        let total = frames.iter().map(|frame| frame.delay).sum();
        Ok(Self { frames, total })
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// Index of the frame shown `elapsed` after the animation clock started.
    ///
    /// The sequence loops forever. If every frame has a zero delay the first
    /// frame is shown.
    pub fn frame_index_at(&self, elapsed: Duration) -> usize {
        let total = self.total.as_nanos();
        if total == 0 {
            return 0;
        }
        let mut remainder = elapsed.as_nanos() % total;
        for (index, frame) in self.frames.iter().enumerate() {
            let delay = frame.delay.as_nanos();
            if remainder < delay {
                return index;
            }
            remainder -= delay;
        }
        self.frames.len() - 1
    }

    pub fn texture_at(&self, elapsed: Duration) -> TextureHandle {
        self.frames[self.frame_index_at(elapsed)].texture
    }
}

/// Time source for animated textures.
#[derive(Copy, Clone, Debug)]
pub enum AnimationClock {
    /// Wall clock time since the given instant.
    Running(Instant),
    /// A frozen point in time, for deterministic output.
    Fixed(Duration),
}

impl AnimationClock {
    pub fn start() -> Self {
        AnimationClock::Running(Instant::now())
    }

    pub fn fixed(elapsed: Duration) -> Self {
        AnimationClock::Fixed(elapsed)
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            AnimationClock::Running(start) => start.elapsed(),
            AnimationClock::Fixed(elapsed) => *elapsed,
        }
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::start()
    }
}
