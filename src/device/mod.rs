//! The graphics device seam.
//!
//! The rendering core never talks to a GPU API directly. Everything it needs
//! from the device (growable buffer objects, textures, shader programs, an
//! immediate-style draw stream and a single-pixel readback) goes through the
//! object-safe [`GraphicsDevice`] trait. Two implementations ship with the
//! crate:
//!
//! - [`crate::context::Context`] drives wgpu and replays each frame's commands
//!   into a pick pass and a colour pass.
//! - [`headless::HeadlessDevice`] keeps everything in host memory and records
//!   the command stream. It backs headless builds and the test suite.

pub mod headless;

use crate::{
    data_structures::texture::TextureImage,
    pipelines::{ProgramId, ProgramKey},
    render::Command,
};

/// The GPU binding point a buffer is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Color,
    Element,
}

impl BufferTarget {
    pub(crate) const ALL: [BufferTarget; 3] =
        [BufferTarget::Vertex, BufferTarget::Color, BufferTarget::Element];

    pub(crate) fn slot(self) -> usize {
        match self {
            BufferTarget::Vertex => 0,
            BufferTarget::Color => 1,
            BufferTarget::Element => 2,
        }
    }
}

/// Device allocation backing a [`crate::data_structures::buffer::GpuBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// What the device can do. Queried once per object at construction and per
/// frame for program selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    /// Growable buffer objects are available. Without them every buffer
    /// operation degrades to a no-op.
    pub buffer_objects: bool,
    /// Combined texture units usable by one draw call, capped at
    /// [`crate::pipelines::MAX_TEXTURE_LAYERS`].
    pub max_texture_units: usize,
    /// Wireframe polygons can be rasterised as lines.
    pub polygon_line_mode: bool,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            buffer_objects: true,
            max_texture_units: crate::pipelines::MAX_TEXTURE_LAYERS,
            polygon_line_mode: true,
        }
    }
}

/// Immediate-style rendering API consumed by the scene core.
///
/// All calls are synchronous and come from the single render thread.
/// Implementations must tolerate unknown handles (log and ignore) because the
/// core never treats a device failure as fatal.
pub trait GraphicsDevice {
    fn caps(&self) -> DeviceCaps;

    /// Allocates `size` bytes for `target`. The contents are undefined.
    fn create_buffer(&mut self, target: BufferTarget, size: u64) -> BufferHandle;

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Copies the first `size` bytes of `src` to the start of `dst`.
    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64);

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn create_texture(&mut self, image: &TextureImage) -> anyhow::Result<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    /// Resolves a shader program. `None` when the device cannot provide it,
    /// e.g. a texture count beyond its texture-unit limit.
    fn program(&mut self, key: ProgramKey) -> Option<ProgramId>;

    /// Appends a command to the current frame.
    fn record(&mut self, command: Command);

    /// Reads one RGBA pixel of the pick target. `None` when the coordinate is
    /// outside the target or the read failed.
    fn read_pixel(&mut self, x: u32, y: u32) -> Option<[u8; 4]>;
}
