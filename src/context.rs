//! Offscreen GPU context.
//!
//! Owns the wgpu device and queue together with a color and a depth target.
//! There is no window: frames are rendered into the color target and can be
//! read back with [`Context::read_pixels`], which is what the golden image
//! tests do.

use std::iter;

use image::RgbaImage;
use instant::Duration;

use crate::{backend::gpu::WgpuBackend, data_structures::texture::Texture};

/// Format of the offscreen color target.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_target: Texture,
    pub depth_texture: Texture,
    pub clear_colour: wgpu::Color,
    size: [u32; 2],
}

impl Context {
    /// Requests an adapter without a surface and creates `width` x `height` targets.
    pub async fn headless(width: u32, height: u32) -> anyhow::Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("device and queue on {}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flow-render device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await?;

        let size = [width.max(1), height.max(1)];
        let color_target = Texture::create_render_target(&device, size, COLOR_FORMAT, "color_target");
        let depth_texture = Texture::create_depth_texture(&device, size, "depth_texture");

        Ok(Self {
            device,
            queue,
            color_target,
            depth_texture,
            clear_colour: wgpu::Color::BLACK,
            size,
        })
    }

    /// [`Context::headless`] for callers without an async runtime.
    pub fn headless_blocking(width: u32, height: u32) -> anyhow::Result<Self> {
        futures::executor::block_on(Self::headless(width, height))
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// A backend that shares this context's device and renders into its targets.
    pub fn backend(&self) -> anyhow::Result<WgpuBackend> {
        WgpuBackend::new(self.device.clone(), self.queue.clone(), COLOR_FORMAT, self.size)
    }

    /// Replays everything `backend` recorded into the targets and submits it.
    ///
    /// With `clear` set the targets are first cleared to [`Context::clear_colour`].
    pub fn submit(&self, backend: &mut WgpuBackend, clear: bool) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        backend.encode(
            &mut encoder,
            &self.color_target.view,
            &self.depth_texture.view,
            clear.then_some(self.clear_colour),
        );
        self.queue.submit(iter::once(encoder.finish()));
    }

    /// Copies the color target back to the CPU.
    pub async fn read_pixels(&self) -> anyhow::Result<RgbaImage> {
        let [width, height] = self.size;
        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("Readback Buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.color_target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away if the caller stopped waiting.
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow::anyhow!("readback channel closed before mapping finished"))??;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            data.chunks(padded as usize)
                .flat_map(|row| &row[..unpadded as usize])
                .copied()
                .collect::<Vec<u8>>()
        };
        output_buffer.unmap();
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("readback of {width}x{height} returned too few bytes"))
    }

    /// [`Context::read_pixels`] for callers without an async runtime.
    pub fn read_pixels_blocking(&self) -> anyhow::Result<RgbaImage> {
        futures::executor::block_on(self.read_pixels())
    }
}
