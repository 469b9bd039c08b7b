//! Growable GPU buffers.
//!
//! [`GpuBuffer`] is a type-agnostic, append-only byte arena bound to one
//! [`BufferTarget`]. It owns a capacity, a logical end and a device
//! allocation, and only ever grows: when an append overflows the capacity the
//! buffer allocates a larger block (overflow rounded up to the configured
//! increment), copies its live range `0..end` across and frees the old block.
//!
//! The typed wrappers know their element stride and draw shape:
//!
//! - [`VertexBuffer`] holds interleaved [`Vertex`] data and keeps a host copy
//!   for vertex lookups (pick positions)
//! - [`ColorBuffer`] holds one RGBA8 colour per vertex
//! - [`ElementBuffer`] holds `u32` indices into the vertex buffer
//!
//! On a device without buffer objects every operation is a no-op.

use crate::{
    config::Config,
    device::{BufferHandle, BufferTarget, GraphicsDevice},
    render::{Bindings, DrawRange},
};

#[derive(Debug)]
pub struct GpuBuffer {
    target: BufferTarget,
    handle: Option<BufferHandle>,
    capacity: u64,
    end: u64,
    increment: u64,
    supported: bool,
}

impl GpuBuffer {
    /// Creates an empty buffer. Nothing is allocated until the first append.
    ///
    /// # Panics
    ///
    /// With `config.strict_capabilities` set (the default in debug builds)
    /// when the device has no buffer objects.
    pub fn new(device: &dyn GraphicsDevice, target: BufferTarget, config: &Config) -> Self {
        let supported = device.caps().buffer_objects;
        if !supported {
            assert!(
                !config.strict_capabilities,
                "device does not support buffer objects"
            );
            log::warn!("{target:?} buffer created without device buffer objects, it will stay empty");
        }
        Self {
            target,
            handle: None,
            capacity: 0,
            end: 0,
            increment: config.buffer_increment.max(4),
            supported,
        }
    }

    /// Copies `data` to the logical end, growing the allocation if needed.
    pub fn append(&mut self, device: &mut dyn GraphicsDevice, data: &[u8]) {
        if !self.supported || data.is_empty() {
            return;
        }
        let new_end = self.end + data.len() as u64;
        if new_end > self.capacity {
            self.grow(device, new_end - self.capacity);
        }
        if let Some(handle) = self.handle {
            device.write_buffer(handle, self.end, data);
            self.end = new_end;
        }
    }

    fn grow(&mut self, device: &mut dyn GraphicsDevice, overflow: u64) {
        let new_capacity = self.capacity + overflow.next_multiple_of(self.increment);
        let new_handle = device.create_buffer(self.target, new_capacity);
        if let Some(old) = self.handle.take() {
            if self.end > 0 {
                device.copy_buffer(old, new_handle, self.end);
            }
            device.destroy_buffer(old);
        }
        log::debug!(
            "{:?} buffer grew from {} to {} bytes",
            self.target,
            self.capacity,
            new_capacity
        );
        self.handle = Some(new_handle);
        self.capacity = new_capacity;
    }

    /// Resets the logical end. The allocation is kept for reuse.
    pub fn empty(&mut self) {
        self.end = 0;
    }

    /// Binds the live range to this buffer's target. Returns `false` when
    /// there is nothing to bind.
    pub fn bind(&self, bindings: &mut Bindings) -> bool {
        match self.handle {
            Some(handle) if self.supported => {
                bindings.bind(self.target, handle, self.end);
                true
            }
            _ => false,
        }
    }

    pub fn unbind(&self, bindings: &mut Bindings) {
        bindings.unbind(self.target);
    }

    /// Releases the device allocation.
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(handle) = self.handle.take() {
            device.destroy_buffer(handle);
        }
        self.capacity = 0;
        self.end = 0;
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn handle(&self) -> Option<BufferHandle> {
        self.handle
    }

    /// Logical length in bytes.
    pub fn len(&self) -> u64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }
}

/// Interleaved vertex as stored in a [`VertexBuffer`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 0.0],
        }
    }

    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = normal;
        self
    }

    pub fn with_tex_coords(mut self, tex_coords: [f32; 2]) -> Self {
        self.tex_coords = tex_coords;
        self
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: Vertex::STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[derive(Debug)]
pub struct VertexBuffer {
    buffer: GpuBuffer,
    vertices: Vec<Vertex>,
}

impl VertexBuffer {
    pub fn new(device: &dyn GraphicsDevice, config: &Config) -> Self {
        Self {
            buffer: GpuBuffer::new(device, BufferTarget::Vertex, config),
            vertices: Vec::new(),
        }
    }

    pub fn append(&mut self, device: &mut dyn GraphicsDevice, vertices: &[Vertex]) {
        if !self.buffer.is_supported() {
            return;
        }
        self.buffer.append(device, bytemuck::cast_slice(vertices));
        self.vertices.extend_from_slice(vertices);
    }

    pub fn empty(&mut self) {
        self.buffer.empty();
        self.vertices.clear();
    }

    pub fn vertex_count(&self) -> u32 {
        (self.buffer.len() / Vertex::STRIDE) as u32
    }

    /// Host copy of vertex `index`. Reading past the logical end is a caller
    /// bug.
    pub fn vertex(&self, index: u32) -> Option<Vertex> {
        debug_assert!(
            index < self.vertex_count(),
            "vertex {index} is beyond the buffer end ({})",
            self.vertex_count()
        );
        self.vertices.get(index as usize).copied()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn draw_range(&self) -> DrawRange {
        DrawRange::Sequential {
            first: 0,
            count: self.vertex_count(),
        }
    }

    pub fn bind(&self, bindings: &mut Bindings) -> bool {
        self.buffer.bind(bindings)
    }

    pub fn unbind(&self, bindings: &mut Bindings) {
        self.buffer.unbind(bindings)
    }

    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.buffer.destroy(device);
        self.vertices.clear();
    }

    pub fn raw(&self) -> &GpuBuffer {
        &self.buffer
    }
}

/// One RGBA8 colour per vertex.
#[derive(Debug)]
pub struct ColorBuffer {
    buffer: GpuBuffer,
}

impl ColorBuffer {
    pub const STRIDE: u64 = 4;

    pub fn new(device: &dyn GraphicsDevice, config: &Config) -> Self {
        Self {
            buffer: GpuBuffer::new(device, BufferTarget::Color, config),
        }
    }

    pub fn append(&mut self, device: &mut dyn GraphicsDevice, colors: &[[u8; 4]]) {
        self.buffer.append(device, bytemuck::cast_slice(colors));
    }

    pub fn empty(&mut self) {
        self.buffer.empty();
    }

    pub fn color_count(&self) -> u32 {
        (self.buffer.len() / Self::STRIDE) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn bind(&self, bindings: &mut Bindings) -> bool {
        self.buffer.bind(bindings)
    }

    pub fn unbind(&self, bindings: &mut Bindings) {
        self.buffer.unbind(bindings)
    }

    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.buffer.destroy(device);
    }

    pub fn raw(&self) -> &GpuBuffer {
        &self.buffer
    }
}

/// `u32` indices into a [`VertexBuffer`].
#[derive(Debug)]
pub struct ElementBuffer {
    buffer: GpuBuffer,
}

impl ElementBuffer {
    pub const STRIDE: u64 = 4;

    pub fn new(device: &dyn GraphicsDevice, config: &Config) -> Self {
        Self {
            buffer: GpuBuffer::new(device, BufferTarget::Element, config),
        }
    }

    pub fn append(&mut self, device: &mut dyn GraphicsDevice, indices: &[u32]) {
        self.buffer.append(device, bytemuck::cast_slice(indices));
    }

    pub fn empty(&mut self) {
        self.buffer.empty();
    }

    pub fn index_count(&self) -> u32 {
        (self.buffer.len() / Self::STRIDE) as u32
    }

    pub fn draw_range(&self) -> Option<DrawRange> {
        self.buffer.handle().map(|buffer| DrawRange::Elements {
            buffer,
            count: self.index_count(),
        })
    }

    pub fn bind(&self, bindings: &mut Bindings) -> bool {
        self.buffer.bind(bindings)
    }

    pub fn unbind(&self, bindings: &mut Bindings) {
        self.buffer.unbind(bindings)
    }

    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.buffer.destroy(device);
    }

    pub fn raw(&self) -> &GpuBuffer {
        &self.buffer
    }
}
