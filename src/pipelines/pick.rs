//! Offscreen pick target and single pixel readback.
//!
//! Pick draws write the big-endian identifier bytes of each vertex straight
//! into an `Rgba8Unorm` target, so a pixel read returns the bytes unchanged.
//! The target is cleared to zero, the "no hit" identifier.

use std::iter;

use crate::data_structures::texture::Texture;

pub const PICK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug)]
pub struct PickTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: Texture,
    size: [u32; 2],
}

impl PickTarget {
    pub fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let size = [size[0].max(1), size[1].max(1)];
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick texture"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = Texture::create_depth_texture(device, size, "Pick depth texture");
        Self {
            texture,
            view,
            depth,
            size,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Copies the texel at `(x, y)` into a staging buffer and blocks until it
    /// is mapped. `None` outside the target or when the map fails.
    pub fn read_pixel(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        x: u32,
        y: u32,
    ) -> Option<[u8; 4]> {
        if x >= self.size[0] || y >= self.size[1] {
            return None;
        }
        // a single row still has to honour the copy pitch
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick readback buffer"),
            size: u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pick readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(iter::once(encoder.finish()));

        futures::executor::block_on(read_mapped_pixel(&output_buffer, device))
    }
}

async fn read_mapped_pixel(buffer: &wgpu::Buffer, device: &wgpu::Device) -> Option<[u8; 4]> {
    let buffer_slice = buffer.slice(..);
    // NOTE: the mapping has to be requested THEN the device polled before
    // awaiting, otherwise this never resolves.
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    if let Err(err) = device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    }) {
        log::error!("device poll during pick readback failed: {err}");
        return None;
    }
    match rx.receive().await {
        Some(Ok(())) => {}
        Some(Err(err)) => {
            log::error!("pick readback mapping failed: {err}");
            return None;
        }
        None => {
            log::error!("pick readback mapping was dropped");
            return None;
        }
    }

    let mut pixel = [0; 4];
    {
        let data = buffer_slice.get_mapped_range();
        pixel.copy_from_slice(&data[..4]);
    }
    buffer.unmap();
    Some(pixel)
}
