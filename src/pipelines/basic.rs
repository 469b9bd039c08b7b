//! Render pipelines of the wgpu backend.
//!
//! A wgpu pipeline bakes in state the core treats as per-draw (primitive,
//! polygon mode, depth bias, target format, blending). [`PipelineCache`]
//! therefore builds one pipeline per distinct [`PipelineKey`] the first time a
//! frame needs it and keeps it for the lifetime of the context.

use std::collections::HashMap;

use crate::{
    data_structures::{buffer::Vertex, texture::Texture},
    pipelines::{
        ProgramKey,
        pick::PICK_FORMAT,
        textured::{draw_layout, texture_layout},
    },
    render::{DrawCall, Pass, PolygonMode, Primitive},
};

/// Shader entry points a program maps to. Both textured programs share one
/// family; the layer count, blend mode and lighting switch are uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderFamily {
    Shaded,
    Flat,
    VertexColor,
    Pick,
    Textured,
}

impl From<ProgramKey> for ShaderFamily {
    fn from(key: ProgramKey) -> Self {
        match key {
            ProgramKey::Shaded => ShaderFamily::Shaded,
            ProgramKey::Flat => ShaderFamily::Flat,
            ProgramKey::VertexColor => ShaderFamily::VertexColor,
            ProgramKey::Pick => ShaderFamily::Pick,
            ProgramKey::Textured { .. } | ProgramKey::TexturedUnlit => ShaderFamily::Textured,
        }
    }
}

impl ShaderFamily {
    fn entry_points(self) -> (&'static str, &'static str) {
        match self {
            ShaderFamily::Shaded => ("vs_main", "fs_shaded"),
            ShaderFamily::Flat => ("vs_main", "fs_flat"),
            ShaderFamily::VertexColor => ("vs_colored", "fs_vertex_color"),
            ShaderFamily::Pick => ("vs_pick", "fs_pick"),
            ShaderFamily::Textured => ("vs_main", "fs_textured"),
        }
    }

    /// Whether the family reads the per-vertex colour buffer in slot 1.
    pub fn uses_colors(self) -> bool {
        matches!(self, ShaderFamily::VertexColor | ShaderFamily::Pick)
    }

    pub fn is_textured(self) -> bool {
        self == ShaderFamily::Textured
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub family: ShaderFamily,
    /// Already lowered, see [`Primitive::lowered`].
    pub primitive: Primitive,
    pub polygon: PolygonMode,
    /// Constant and slope scale bits.
    pub depth_bias: Option<(i32, u32)>,
    pub pass: Pass,
    pub blend: bool,
}

impl PipelineKey {
    pub fn new(program: ProgramKey, call: &DrawCall, pass: Pass, polygon_line: bool) -> Self {
        let primitive = call.primitive.lowered();
        let triangles = primitive == Primitive::Triangles;
        Self {
            family: program.into(),
            primitive,
            polygon: if polygon_line && triangles {
                call.polygon
            } else {
                PolygonMode::Fill
            },
            // wgpu rejects depth bias on line and point topologies
            depth_bias: call
                .depth_bias
                .filter(|_| triangles)
                .map(|bias| (bias.constant, bias.slope_scale.to_bits())),
            pass,
            blend: call.blend && pass == Pass::Color,
        }
    }
}

/// Group 0 of every pipeline: camera at binding 0, lighting at binding 1.
pub fn frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("frame_bind_group_layout"),
    })
}

/// Slot 1 layout: one RGBA8 colour per vertex at location 3.
pub fn color_desc() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Unorm8x4];
    wgpu::VertexBufferLayout {
        array_stride: 4,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBS,
    }
}

#[derive(Debug)]
pub struct PipelineCache {
    scene_shader: wgpu::ShaderModule,
    textured_shader: wgpu::ShaderModule,
    frame_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    plain_layout: wgpu::PipelineLayout,
    textured_layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let scene_source = include_str!("scene.wgsl");
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(scene_source.into()),
        });
        // the textured entry points reuse the scene structs and lighting
        let textured_source = format!("{scene_source}\n{}", include_str!("textured.wgsl"));
        let textured_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Textured Shader"),
            source: wgpu::ShaderSource::Wgsl(textured_source.into()),
        });

        let frame_layout = frame_layout(device);
        let draw_layout = draw_layout(device);
        let texture_layout = texture_layout(device);
        let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            immediate_size: 0,
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Textured Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout, &texture_layout],
            immediate_size: 0,
        });

        Self {
            scene_shader,
            textured_shader,
            frame_layout,
            draw_layout,
            texture_layout,
            plain_layout,
            textured_layout,
            color_format,
            pipelines: HashMap::new(),
        }
    }

    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    pub fn draw_layout(&self) -> &wgpu::BindGroupLayout {
        &self.draw_layout
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    /// Builds the pipeline for `key` unless it exists already.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let (layout, module) = if key.family.is_textured() {
            (&self.textured_layout, &self.textured_shader)
        } else {
            (&self.plain_layout, &self.scene_shader)
        };
        let color_format = match key.pass {
            Pass::Pick => PICK_FORMAT,
            Pass::Color => self.color_format,
        };
        let blend = if key.blend {
            wgpu::BlendState::ALPHA_BLENDING
        } else {
            wgpu::BlendState::REPLACE
        };
        let (topology, strip_index_format) = match key.primitive {
            Primitive::Points => (wgpu::PrimitiveTopology::PointList, None),
            Primitive::Lines => (wgpu::PrimitiveTopology::LineList, None),
            Primitive::LineStrip | Primitive::LineLoop => (
                wgpu::PrimitiveTopology::LineStrip,
                Some(wgpu::IndexFormat::Uint32),
            ),
            Primitive::Triangles | Primitive::Quads => {
                (wgpu::PrimitiveTopology::TriangleList, None)
            }
        };
        let primitive = wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            // both faces are lit, see fs_shaded
            cull_mode: None,
            polygon_mode: match key.polygon {
                PolygonMode::Fill => wgpu::PolygonMode::Fill,
                PolygonMode::Line => wgpu::PolygonMode::Line,
            },
            unclipped_depth: false,
            conservative: false,
        };
        let bias = key
            .depth_bias
            .map(|(constant, slope_bits)| wgpu::DepthBiasState {
                constant,
                slope_scale: f32::from_bits(slope_bits),
                clamp: 0.0,
            })
            .unwrap_or_default();

        let mut vertex_layouts = vec![Vertex::desc()];
        if key.family.uses_colors() {
            vertex_layouts.push(color_desc());
        }

        let pipeline = mk_render_pipeline(
            device,
            layout,
            module,
            key.family.entry_points(),
            color_format,
            blend,
            &vertex_layouts,
            primitive,
            bias,
        );
        log::debug!("built pipeline for {key:?}");
        self.pipelines.insert(key, pipeline);
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    (vs_entry, fs_entry): (&str, &str),
    color_format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    primitive: wgpu::PrimitiveState,
    bias: wgpu::DepthBiasState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive,
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
