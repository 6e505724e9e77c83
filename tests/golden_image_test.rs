#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use flow_render::context::Context;
    use wgpu::Color;

    crate::common::test_utils::init_logger();
    let mut ctx = Context::headless_blocking(32, 32).expect("no GPU adapter available");
    let mut backend = ctx.backend().unwrap();
    ctx.clear_colour = Color::WHITE;

    ctx.submit(&mut backend, true);
    let image = ctx.read_pixels_blocking().unwrap();

    for pixel in image.pixels() {
        assert_eq!(*pixel, image::Rgba([255, 255, 255, 255]));
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_unlit_untextured_quad() {
    use flow_render::{Color, RenderConfig, RenderableObject, context::Context, render::Renderer};

    use crate::common::test_utils::{StubFetcher, init_logger, quad};

    init_logger();
    let ctx = Context::headless_blocking(64, 64).expect("no GPU adapter available");
    let backend = ctx.backend().unwrap();
    let mut renderer =
        Renderer::with_fetcher(backend, &RenderConfig::default(), Box::new(StubFetcher::new())).unwrap();

    let mut object = RenderableObject::new("red quad", None, Color::new(1.0, 0.0, 0.0), quad(), true);
    object.disable_lighting = true;
    renderer.render(&mut object).unwrap();
    assert_eq!(renderer.backend().pending_draws(), 1);

    ctx.submit(renderer.backend_mut(), true);
    let image = ctx.read_pixels_blocking().unwrap();

    // the quad spans the middle half of clip space
    assert_eq!(*image.get_pixel(32, 32), image::Rgba([255, 0, 0, 255]));
    assert_eq!(*image.get_pixel(2, 2), image::Rgba([0, 0, 0, 255]));
    assert_eq!(*image.get_pixel(61, 61), image::Rgba([0, 0, 0, 255]));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_wide_lines_at_pixel_width() {
    use flow_render::{Color, RenderConfig, RenderableObject, Vertex, context::Context, render::Renderer};

    use crate::common::test_utils::{StubFetcher, init_logger};

    init_logger();
    let ctx = Context::headless_blocking(64, 64).expect("no GPU adapter available");
    let backend = ctx.backend().unwrap();
    let mut renderer =
        Renderer::with_fetcher(backend, &RenderConfig::default(), Box::new(StubFetcher::new())).unwrap();

    let segment = vec![Vertex::at([-0.5, 0.0, 0.0]), Vertex::at([0.5, 0.0, 0.0])];
    let mut object = RenderableObject::lines("wide line", Color::new(1.0, 0.0, 0.0), segment, 8.0);
    object.disable_lighting = true;
    renderer.render(&mut object).unwrap();

    ctx.submit(renderer.backend_mut(), true);
    let image = ctx.read_pixels_blocking().unwrap();

    // 8px centred on the middle row
    assert_eq!(*image.get_pixel(32, 29), image::Rgba([255, 0, 0, 255]));
    assert_eq!(*image.get_pixel(32, 34), image::Rgba([255, 0, 0, 255]));
    assert_eq!(*image.get_pixel(32, 22), image::Rgba([0, 0, 0, 255]));
    assert_eq!(*image.get_pixel(32, 41), image::Rgba([0, 0, 0, 255]));
}
