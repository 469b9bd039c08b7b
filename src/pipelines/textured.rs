//! Per-draw uniforms and the multi-texture bind group.
//!
//! Every draw gets one [`DrawUniform`] slot in a dynamic-offset uniform
//! buffer: its colour, a few switches and the state of up to
//! [`MAX_TEXTURE_LAYERS`] texture layers. Textured draws additionally bind
//! group 2, eight texture views plus one sampler. Units a draw does not use
//! are filled with a placeholder texture.

use crate::{
    pipelines::MAX_TEXTURE_LAYERS,
    render::DrawCall,
};

/// Offset between two draws in the dynamic uniform buffer. A multiple of the
/// 256 byte `min_uniform_buffer_offset_alignment` every backend accepts.
pub const DRAW_UNIFORM_STRIDE: u64 = 1024;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LayerUniform {
    pub transform: [[f32; 4]; 4],
    /// flip s, flip t, scale s, scale t
    pub flip_scale: [f32; 4],
    /// x is the layer alpha, y is 1 when the texel alpha cuts the layer
    /// alpha, the rest is padding
    pub alpha: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub colour: [f32; 4],
    /// layer count, blend mode, lit, unused
    pub params: [u32; 4],
    pub layers: [LayerUniform; MAX_TEXTURE_LAYERS],
}

impl DrawUniform {
    pub fn from_call(call: &DrawCall) -> Self {
        let mut uniform: DrawUniform = bytemuck::Zeroable::zeroed();
        uniform.colour = call.colour;
        if let Some(binding) = &call.textures {
            uniform.params = [
                binding.layers.len().min(MAX_TEXTURE_LAYERS) as u32,
                binding.mode.shader_value(),
                u32::from(binding.lit),
                0,
            ];
            let count = binding.layers.len().min(MAX_TEXTURE_LAYERS);
            for (idx, (slot, layer)) in uniform
                .layers
                .iter_mut()
                .zip(&binding.layers)
                .enumerate()
            {
                let cuts = binding.mode.cuts_with_texel_alpha(idx, count);
                *slot = LayerUniform {
                    transform: layer.transform,
                    flip_scale: [layer.flip[0], layer.flip[1], layer.scale[0], layer.scale[1]],
                    alpha: [layer.alpha, if cuts { 1.0 } else { 0.0 }, 0.0, 0.0],
                };
            }
        }
        uniform
    }
}

pub fn draw_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("draw_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
            },
            count: None,
        }],
    })
}

/// Bindings `0..8` are the layer textures, binding 8 the shared sampler.
pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..MAX_TEXTURE_LAYERS as u32)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        })
        .collect();
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: MAX_TEXTURE_LAYERS as u32,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &entries,
    })
}

/// Bind group for one textured draw. `views` are in texture unit order and
/// padded with `placeholder`.
pub fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    views: &[&wgpu::TextureView],
    placeholder: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let mut entries: Vec<wgpu::BindGroupEntry> = (0..MAX_TEXTURE_LAYERS)
        .map(|unit| wgpu::BindGroupEntry {
            binding: unit as u32,
            resource: wgpu::BindingResource::TextureView(
                views.get(unit).copied().unwrap_or(placeholder),
            ),
        })
        .collect();
    entries.push(wgpu::BindGroupEntry {
        binding: MAX_TEXTURE_LAYERS as u32,
        resource: wgpu::BindingResource::Sampler(sampler),
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("texture_bind_group"),
        layout,
        entries: &entries,
    })
}
