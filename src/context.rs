//! The wgpu backend.
//!
//! [`Context`] owns the wgpu device and queue and implements
//! [`GraphicsDevice`]. Buffer and texture calls map one to one onto wgpu
//! resources. Draw commands are collected per frame and replayed by
//! [`Context::render`] into two render passes: the offscreen pick target and
//! the colour target the host hands in.

use std::{collections::HashMap, iter, ops::Range};

use anyhow::{Context as _, bail};
use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    config::Config,
    data_structures::texture::{Texture, TextureImage, create_default_sampler},
    device::{BufferHandle, BufferTarget, DeviceCaps, GraphicsDevice, TextureId},
    pipelines::{
        MAX_TEXTURE_LAYERS, ProgramId, ProgramKey,
        basic::{PipelineCache, PipelineKey},
        light::{self, Lighting, LightingUniform},
        pick::PickTarget,
        textured::{DRAW_UNIFORM_STRIDE, DrawUniform, texture_bind_group},
    },
    render::{Command, DrawCall, DrawRange, Pass, PolygonMode, lower_primitive},
};

#[derive(Debug)]
struct Allocation {
    target: BufferTarget,
    buffer: wgpu::Buffer,
    // element indices are needed on the host to lower quads and line loops
    mirror: Option<Vec<u8>>,
}

/// Everything one draw needs once the frame is resolved against wgpu.
struct PreparedDraw {
    pass: Pass,
    key: PipelineKey,
    vertices: wgpu::Buffer,
    colors: Option<wgpu::Buffer>,
    indices: Option<(wgpu::Buffer, u32)>,
    sequential: Range<u32>,
    textures: Option<wgpu::BindGroup>,
    slot: u32,
}

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub(crate) depth_texture: Texture,
    color_format: wgpu::TextureFormat,
    size: [u32; 2],
    caps: DeviceCaps,
    clear_colour: wgpu::Color,
    buffers: HashMap<BufferHandle, Allocation>,
    next_buffer: u32,
    textures: HashMap<TextureId, Texture>,
    next_texture: u32,
    placeholder: Texture,
    sampler: wgpu::Sampler,
    programs: Vec<ProgramKey>,
    pipelines: PipelineCache,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_slots: u64,
    draw_bind_group: wgpu::BindGroup,
    pick: PickTarget,
    offscreen: Option<Texture>,
    frame: Vec<Command>,
    warned_polygon_line: bool,
}

impl Context {
    /// Wraps a device the host created, e.g. alongside its window surface.
    /// `color_format` is the format of the views passed to [`Context::render`].
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: &Config,
    ) -> Self {
        let size = [width.max(1), height.max(1)];
        let caps = DeviceCaps {
            buffer_objects: true,
            max_texture_units: (device.limits().max_sampled_textures_per_shader_stage as usize)
                .min(MAX_TEXTURE_LAYERS),
            polygon_line_mode: device.features().contains(wgpu::Features::POLYGON_MODE_LINE),
        };

        let pipelines = PipelineCache::new(&device, color_format);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lighting_buffer = light::mk_buffer(&device, Lighting::default().to_uniform());
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: pipelines.frame_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lighting_buffer.as_entire_binding(),
                },
            ],
            label: Some("frame_bind_group"),
        });

        let draw_slots = 64;
        let (draw_buffer, draw_bind_group) = mk_draw_buffer(&device, &pipelines, draw_slots);

        let placeholder = Texture::create_placeholder(&device, &queue);
        let sampler = create_default_sampler(&device);
        let depth_texture = Texture::create_depth_texture(&device, size, "depth_texture");
        let pick = PickTarget::new(&device, size);

        log::info!(
            "wgpu context ready: {}x{}, {} texture units, wireframe {}",
            size[0],
            size[1],
            caps.max_texture_units,
            if caps.polygon_line_mode { "native" } else { "unavailable" }
        );

        Self {
            device,
            queue,
            depth_texture,
            color_format,
            size,
            caps,
            clear_colour: config.clear_colour,
            buffers: HashMap::new(),
            next_buffer: 0,
            textures: HashMap::new(),
            next_texture: 0,
            placeholder,
            sampler,
            programs: Vec::new(),
            pipelines,
            camera_buffer,
            lighting_buffer,
            frame_bind_group,
            draw_buffer,
            draw_slots,
            draw_bind_group,
            pick,
            offscreen: None,
            frame: Vec::new(),
            warned_polygon_line: false,
        }
    }

    /// Creates a context without a window. Frames go to an internal target,
    /// see [`Context::render_offscreen`].
    pub async fn headless(width: u32, height: u32, config: &Config) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::debug!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("airframe-gfx device"),
                required_features: adapter.features() & wgpu::Features::POLYGON_MODE_LINE,
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create the graphics device")?;

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let mut ctx = Self::from_device(device, queue, format, width, height, config);
        ctx.offscreen = Some(ctx.mk_offscreen());
        Ok(ctx)
    }

    fn mk_offscreen(&self) -> Texture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen target"),
            size: wgpu::Extent3d {
                width: self.size[0],
                height: self.size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Texture {
            texture,
            view,
            sampler: None,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Recreates the size dependent targets.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = [width, height];
        self.depth_texture = Texture::create_depth_texture(&self.device, self.size, "depth_texture");
        self.pick = PickTarget::new(&self.device, self.size);
        if self.offscreen.is_some() {
            self.offscreen = Some(self.mk_offscreen());
        }
    }

    /// Renders the recorded frame into the internal target of a headless
    /// context.
    pub fn render_offscreen(&mut self) -> anyhow::Result<()> {
        let Some(target) = self.offscreen.as_ref() else {
            bail!("context was not created headless");
        };
        let view = target.view.clone();
        self.render(&view);
        Ok(())
    }

    /// Replays the recorded frame: the pick pass first, then the colour pass
    /// into `view`. The pick target keeps its contents until the next call so
    /// hosts can pick in between.
    pub fn render(&mut self, view: &wgpu::TextureView) {
        let frame = std::mem::take(&mut self.frame);

        let mut camera = None;
        let mut lighting: Option<LightingUniform> = None;
        let mut current = None;
        let mut calls: Vec<(Pass, &DrawCall)> = Vec::new();
        for command in &frame {
            match command {
                Command::SetCamera(uniform) => camera = Some(*uniform),
                Command::SetLighting(uniform) => lighting = Some(*uniform),
                Command::BeginPass(pass) => current = Some(*pass),
                Command::Draw(call) => match current {
                    Some(pass) => calls.push((pass, call)),
                    None => log::warn!("draw recorded outside of a pass, dropped"),
                },
            }
        }
        if let Some(camera) = camera {
            self.queue
                .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera]));
        }
        if let Some(lighting) = lighting {
            self.queue
                .write_buffer(&self.lighting_buffer, 0, bytemuck::cast_slice(&[lighting]));
        }

        let mut uniforms = Vec::with_capacity(calls.len());
        let mut draws = Vec::with_capacity(calls.len());
        for (pass, call) in calls {
            let slot = uniforms.len() as u32;
            if let Some(draw) = self.prepare_draw(pass, call, slot) {
                uniforms.push(DrawUniform::from_call(call));
                draws.push(draw);
            }
        }
        self.upload_draw_uniforms(&uniforms);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.pick.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(depth_attachment(&self.pick.depth.view)),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            self.replay(&mut render_pass, &draws, Pass::Pick);
        }
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Color Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(depth_attachment(&self.depth_texture.view)),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            self.replay(&mut render_pass, &draws, Pass::Color);
        }
        self.queue.submit(iter::once(encoder.finish()));
    }

    fn prepare_draw(&mut self, pass: Pass, call: &DrawCall, slot: u32) -> Option<PreparedDraw> {
        let Some(program) = self.programs.get(call.program.0 as usize).copied() else {
            log::warn!("draw with unknown program {:?} dropped", call.program);
            return None;
        };
        if call.polygon == PolygonMode::Line
            && !self.caps.polygon_line_mode
            && !self.warned_polygon_line
        {
            log::warn!("device cannot rasterise polygons as lines, wireframes are drawn filled");
            self.warned_polygon_line = true;
        }
        let key = PipelineKey::new(program, call, pass, self.caps.polygon_line_mode);

        let vertices = self.buffers.get(&call.vertices)?.buffer.clone();
        let colors = if key.family.uses_colors() {
            let Some(colors) = call.colors.and_then(|handle| self.buffers.get(&handle)) else {
                log::warn!("{:?} draw without a colour buffer dropped", key.family);
                return None;
            };
            Some(colors.buffer.clone())
        } else {
            None
        };

        let (indices, sequential) = match call.range {
            DrawRange::Elements { buffer, count } => {
                let allocation = self.buffers.get(&buffer)?;
                let host: Option<Vec<u32>> = allocation.mirror.as_ref().map(|bytes| {
                    bytes
                        .chunks_exact(4)
                        .map(|word| u32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
                        .collect()
                });
                match lower_primitive(call.primitive, host.as_deref(), 0, count) {
                    Some(lowered) => (Some(self.mk_index_buffer(&lowered)), 0..0),
                    None => (Some((allocation.buffer.clone(), count)), 0..0),
                }
            }
            DrawRange::Sequential { first, count } => {
                match lower_primitive(call.primitive, None, first, count) {
                    Some(lowered) => (Some(self.mk_index_buffer(&lowered)), 0..0),
                    None => (None, first..first.saturating_add(count)),
                }
            }
        };

        let textures = match (&call.textures, key.family.is_textured()) {
            (Some(binding), true) => {
                let views: Vec<&wgpu::TextureView> = binding
                    .layers
                    .iter()
                    .map(|layer| {
                        self.textures
                            .get(&layer.texture)
                            .map_or(&self.placeholder.view, |texture| &texture.view)
                    })
                    .collect();
                Some(texture_bind_group(
                    &self.device,
                    self.pipelines.texture_layout(),
                    &views,
                    &self.placeholder.view,
                    &self.sampler,
                ))
            }
            (None, true) => {
                log::warn!("textured draw without texture layers dropped");
                return None;
            }
            _ => None,
        };

        self.pipelines.prepare(&self.device, key);
        Some(PreparedDraw {
            pass,
            key,
            vertices,
            colors,
            indices,
            sequential,
            textures,
            slot,
        })
    }

    fn mk_index_buffer(&self, indices: &[u32]) -> (wgpu::Buffer, u32) {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Lowered Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        (buffer, indices.len() as u32)
    }

    fn upload_draw_uniforms(&mut self, uniforms: &[DrawUniform]) {
        let needed = uniforms.len() as u64;
        if needed > self.draw_slots {
            self.draw_slots = needed.next_power_of_two();
            let (buffer, bind_group) = mk_draw_buffer(&self.device, &self.pipelines, self.draw_slots);
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
            log::debug!("draw uniform buffer grown to {} slots", self.draw_slots);
        }
        for (slot, uniform) in uniforms.iter().enumerate() {
            self.queue.write_buffer(
                &self.draw_buffer,
                slot as u64 * DRAW_UNIFORM_STRIDE,
                bytemuck::cast_slice(&[*uniform]),
            );
        }
    }

    fn replay(&self, render_pass: &mut wgpu::RenderPass<'_>, draws: &[PreparedDraw], pass: Pass) {
        for draw in draws.iter().filter(|draw| draw.pass == pass) {
            let Some(pipeline) = self.pipelines.get(&draw.key) else {
                continue;
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            let offset = u64::from(draw.slot) * DRAW_UNIFORM_STRIDE;
            render_pass.set_bind_group(1, &self.draw_bind_group, &[offset as u32]);
            if let Some(textures) = &draw.textures {
                render_pass.set_bind_group(2, textures, &[]);
            }
            render_pass.set_vertex_buffer(0, draw.vertices.slice(..));
            if let Some(colors) = &draw.colors {
                render_pass.set_vertex_buffer(1, colors.slice(..));
            }
            match &draw.indices {
                Some((indices, count)) => {
                    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..*count, 0, 0..1);
                }
                None => render_pass.draw(draw.sequential.clone(), 0..1),
            }
        }
    }
}

fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

fn mk_draw_buffer(
    device: &wgpu::Device,
    pipelines: &PipelineCache,
    slots: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: slots * DRAW_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: pipelines.draw_layout(),
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
            }),
        }],
        label: Some("draw_bind_group"),
    });
    (buffer, bind_group)
}

impl GraphicsDevice for Context {
    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn create_buffer(&mut self, target: BufferTarget, size: u64) -> BufferHandle {
        // copies and writes work in 4 byte units
        let size = size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(match target {
                BufferTarget::Vertex => "Vertex Buffer",
                BufferTarget::Color => "Color Buffer",
                BufferTarget::Element => "Element Buffer",
            }),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.next_buffer += 1;
        let handle = BufferHandle(self.next_buffer);
        self.buffers.insert(
            handle,
            Allocation {
                target,
                buffer,
                mirror: (target == BufferTarget::Element).then(|| vec![0; size as usize]),
            },
        );
        handle
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(allocation) = self.buffers.get_mut(&buffer) else {
            log::error!("write to unknown buffer {buffer:?}");
            return;
        };
        if offset + data.len() as u64 > allocation.buffer.size() {
            log::error!(
                "write of {} bytes at {offset} overflows a {} byte {:?} buffer",
                data.len(),
                allocation.buffer.size(),
                allocation.target
            );
            return;
        }
        self.queue.write_buffer(&allocation.buffer, offset, data);
        if let Some(mirror) = allocation.mirror.as_mut() {
            let start = offset as usize;
            mirror[start..start + data.len()].copy_from_slice(data);
        }
    }

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        let (Some(source), Some(destination)) = (self.buffers.get(&src), self.buffers.get(&dst))
        else {
            log::error!("copy between unknown buffers {src:?} and {dst:?}");
            return;
        };
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if size > source.buffer.size() || size > destination.buffer.size() {
            log::error!("copy of {size} bytes from {src:?} to {dst:?} out of bounds");
            return;
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Buffer Copy Encoder"),
            });
        encoder.copy_buffer_to_buffer(&source.buffer, 0, &destination.buffer, 0, size);
        self.queue.submit(iter::once(encoder.finish()));

        let copied = source
            .mirror
            .as_ref()
            .map(|mirror| mirror[..size as usize].to_vec());
        if let (Some(copied), Some(allocation)) = (copied, self.buffers.get_mut(&dst)) {
            if let Some(mirror) = allocation.mirror.as_mut() {
                mirror[..copied.len()].copy_from_slice(&copied);
            }
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.remove(&buffer) {
            Some(allocation) => allocation.buffer.destroy(),
            None => log::error!("destroying unknown buffer {buffer:?}"),
        }
    }

    fn create_texture(&mut self, image: &TextureImage) -> anyhow::Result<TextureId> {
        let max = self.device.limits().max_texture_dimension_2d;
        if image.width() > max || image.height() > max {
            bail!(
                "texture of {}x{} exceeds the device limit of {max}",
                image.width(),
                image.height()
            );
        }
        self.next_texture += 1;
        let texture = TextureId(self.next_texture);
        let label = format!("texture {}", texture.0);
        self.textures.insert(
            texture,
            Texture::from_image(&self.device, &self.queue, image, Some(&label)),
        );
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(texture) = self.textures.remove(&texture) {
            texture.texture.destroy();
        }
    }

    fn program(&mut self, key: ProgramKey) -> Option<ProgramId> {
        let available = match key {
            ProgramKey::Textured { layers, .. } => usize::from(layers) <= self.caps.max_texture_units,
            ProgramKey::TexturedUnlit => self.caps.max_texture_units > 0,
            _ => true,
        };
        if !available {
            return None;
        }
        let idx = match self.programs.iter().position(|known| *known == key) {
            Some(idx) => idx,
            None => {
                self.programs.push(key);
                self.programs.len() - 1
            }
        };
        Some(ProgramId(idx as u32))
    }

    fn record(&mut self, command: Command) {
        // the host skipped render(), drop the stale frame
        if matches!(command, Command::SetCamera(_))
            && self
                .frame
                .iter()
                .any(|recorded| matches!(recorded, Command::BeginPass(Pass::Color)))
        {
            self.frame.clear();
        }
        self.frame.push(command);
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pick.read_pixel(&self.device, &self.queue, x, y)
    }
}
