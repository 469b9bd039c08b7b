//! Texture images and GPU textures.
//!
//! [`TextureImage`] is decoded RGBA8 pixel data, the form every
//! [`GraphicsDevice`](crate::device::GraphicsDevice) accepts. [`Texture`] is
//! the wgpu side: a texture with its view and sampler, plus helpers for the
//! depth attachment and the solid placeholder bound to unused texture units.

use anyhow::{Context as _, Result, bail};
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// Decoded RGBA8 image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl TextureImage {
    /// Decodes image file contents (PNG, JPEG, ...).
    ///
    /// # Arguments
    ///
    /// * `bytes` are the raw file contents
    /// * `format` is an optional file extension hint (e.g. "png"). If `None`, the format is guessed.
    pub fn from_bytes(bytes: &[u8], format: Option<&str>) -> Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes).context("failed to decode texture image")?,
            Some(ext) => {
                let format = ImageFormat::from_extension(ext)
                    .with_context(|| format!("unknown texture image format '{ext}'"))?;
                load_from_memory_with_format(bytes, format)
                    .with_context(|| format!("failed to decode {ext} texture image"))?
            }
        };
        Ok(Self::from_image(&img))
    }

    pub fn from_image(img: &image::DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba: img.to_rgba8().into_raw(),
        }
    }

    /// Wraps raw RGBA8 pixels. Fails unless `rgba` holds exactly
    /// `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("texture image must not be empty ({width}x{height})");
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            bail!(
                "{width}x{height} texture image needs {expected} bytes, got {}",
                rgba.len()
            );
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Image filled with one colour.
    pub fn solid(width: u32, height: u32, colour: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let rgba = colour
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0; 4];
        px.copy_from_slice(&self.rgba[idx..idx + 4]);
        Some(px)
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Uploads `image` as an sRGB colour texture.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            image.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// 1x1 white texture bound to texture units a draw does not use.
    pub fn create_placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_image(
            device,
            queue,
            &TextureImage::solid(1, 1, [255, 255, 255, 255]),
            Some("placeholder texture"),
        )
    }
}

/// Repeat-addressed linear sampler shared by all colour textures.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}
