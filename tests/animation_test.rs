use flow_render::{
    error::TextureError,
    resources::animation::{AnimatedSequence, AnimationClock, AnimationFrame, decode_gif},
};
use instant::Duration;

use crate::common::test_utils::gif_bytes;

mod common;

fn sequence(delays_ms: &[u64]) -> AnimatedSequence {
    let frames = delays_ms
        .iter()
        .enumerate()
        .map(|(i, &ms)| AnimationFrame {
            texture: texture_handle(i),
            delay: Duration::from_millis(ms),
        })
        .collect();
    AnimatedSequence::new(frames).unwrap()
}

// Handles are opaque outside the crate; borrow real ones from a cache.
fn texture_handle(index: usize) -> flow_render::TextureHandle {
    use flow_render::{backend::headless::HeadlessBackend, config::RenderConfig, resources::texture::TextureCache};

    use crate::common::test_utils::{StubFetcher, solid};

    let mut backend = HeadlessBackend::new();
    let mut cache = TextureCache::new(&mut backend, &RenderConfig::default(), Box::new(StubFetcher::new())).unwrap();
    let mut handle = cache.missing_texture();
    for i in 0..=index {
        handle = cache
            .register_alias(&mut backend, &format!("frame{i}"), &solid(1, 1, [0, 0, 0, 255]))
            .unwrap();
    }
    handle
}

#[test]
fn frame_selection_follows_cumulative_delays() {
    let animation = sequence(&[100, 200, 50]);

    assert_eq!(animation.total_duration(), Duration::from_millis(350));
    let index_at = |ms| animation.frame_index_at(Duration::from_millis(ms));
    assert_eq!(index_at(0), 0);
    assert_eq!(index_at(99), 0);
    assert_eq!(index_at(100), 1);
    assert_eq!(index_at(299), 1);
    assert_eq!(index_at(300), 2);
    assert_eq!(index_at(349), 2);
}

#[test]
fn animation_loops() {
    let animation = sequence(&[100, 200, 50]);

    for ms in [0, 150, 320] {
        assert_eq!(
            animation.frame_index_at(Duration::from_millis(ms)),
            animation.frame_index_at(Duration::from_millis(ms + 350 * 7)),
        );
    }
    assert_eq!(
        animation.texture_at(Duration::from_millis(350 + 120)),
        animation.frames()[1].texture
    );
}

#[test]
fn zero_delays_pin_the_first_frame() {
    let animation = sequence(&[0, 0]);

    assert_eq!(animation.total_duration(), Duration::ZERO);
    assert_eq!(animation.frame_index_at(Duration::from_secs(10)), 0);
}

#[test]
fn empty_sequence_is_rejected() {
    assert_eq!(AnimatedSequence::new(Vec::new()), Err(TextureError::NoFrames));
    assert!(TextureError::NoFrames.to_string().contains("no frames"));
}

#[test]
fn decoder_keeps_frame_order_and_delays() {
    let frames = decode_gif(&gif_bytes(&[100, 200, 50])).unwrap();

    let delays: Vec<_> = frames.iter().map(|frame| frame.delay).collect();
    assert_eq!(delays, [100, 200, 50].map(Duration::from_millis).to_vec());
    assert!(frames.iter().all(|frame| frame.image.dimensions() == (2, 2)));
    assert_ne!(frames[0].image.get_pixel(0, 0), frames[1].image.get_pixel(0, 0));
}

#[test]
fn truncated_gif_is_a_decode_error() {
    let mut bytes = gif_bytes(&[100]);
    bytes.truncate(8);

    assert!(matches!(decode_gif(&bytes), Err(TextureError::Decode(_))));
}

#[test]
fn gif_without_image_blocks_has_no_frames() {
    let header_and_trailer = b"GIF89a\x01\x00\x01\x00\x00\x00\x00\x3B";
    assert_eq!(decode_gif(header_and_trailer), Err(TextureError::NoFrames));

    // a comment extension is not a frame either
    let comment_only = b"GIF89a\x01\x00\x01\x00\x00\x00\x00\x21\xFE\x02hi\x00\x3B";
    let err = decode_gif(comment_only).unwrap_err();
    assert_eq!(err, TextureError::NoFrames);
    assert!(err.to_string().contains("no frames being present"), "{err}");
}

#[test]
fn fixed_clock_does_not_advance() {
    let clock = AnimationClock::fixed(Duration::from_millis(120));
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(clock.elapsed(), Duration::from_millis(120));

    let running = AnimationClock::start();
    std::thread::sleep(Duration::from_millis(5));
    assert!(running.elapsed() >= Duration::from_millis(5));
}
