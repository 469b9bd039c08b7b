//! Frame command model.
//!
//! The scene records one [`Command`] stream per frame through
//! [`GraphicsDevice::record`](crate::device::GraphicsDevice::record). A backend
//! either executes the commands as they arrive or, like the wgpu
//! [`Context`](crate::context::Context), batches them per [`Pass`] and
//! replays them when the host presents.
//!
//! # Key types
//!
//! - [`Command`] is one entry of the stream
//! - [`DrawCall`] carries everything a single draw needs: program, primitive,
//!   rasteriser state, bound buffers, range and per-draw uniforms
//! - [`Bindings`] tracks which buffer is bound to which target while a draw
//!   call is assembled
//!

use crate::{
    camera::CameraUniform,
    data_structures::texture_manager::TextureBinding,
    device::{BufferHandle, BufferTarget},
    pipelines::{ProgramId, light::LightingUniform},
};

/// Primitive type of a renderable. Orthogonal to its render style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    Quads,
}

impl Primitive {
    /// Primitive that is actually rasterised once [`lower_primitive`] has
    /// rewritten the index stream.
    pub fn lowered(self) -> Primitive {
        match self {
            Primitive::LineLoop => Primitive::LineStrip,
            Primitive::Quads => Primitive::Triangles,
            other => other,
        }
    }

    pub fn is_line(self) -> bool {
        matches!(
            self,
            Primitive::Lines | Primitive::LineLoop | Primitive::LineStrip
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// Depth offset applied to a draw. Same meaning as `glPolygonOffset(slope_scale, constant)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant: i32,
    pub slope_scale: f32,
}

/// Pushes the filled pass of a wire-frame-solid mesh behind its own edges.
/// Changing these values brings back z-fighting between the two passes.
pub const SOLID_PASS_DEPTH_BIAS: DepthBias = DepthBias {
    constant: 1,
    slope_scale: 1.0,
};

/// Render target a draw goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Offscreen colour-coded identifier target, read back by picking.
    Pick,
    /// The visible frame.
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRange {
    /// Walk the vertex buffer from `first`.
    Sequential { first: u32, count: u32 },
    /// Index into the vertex buffer through an element buffer.
    Elements { buffer: BufferHandle, count: u32 },
}

impl DrawRange {
    pub fn count(&self) -> u32 {
        match self {
            DrawRange::Sequential { count, .. } | DrawRange::Elements { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub primitive: Primitive,
    pub polygon: PolygonMode,
    pub depth_bias: Option<DepthBias>,
    pub vertices: BufferHandle,
    /// Per-vertex RGBA8 colours. Pick draws bind the identifier codes here.
    pub colors: Option<BufferHandle>,
    pub range: DrawRange,
    pub colour: [f32; 4],
    pub point_size: f32,
    pub line_width: f32,
    pub textures: Option<TextureBinding>,
    /// Alpha blending against the frame.
    pub blend: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginPass(Pass),
    SetCamera(CameraUniform),
    SetLighting(LightingUniform),
    Draw(DrawCall),
}

/// Bound length, in bytes, of one buffer target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundBuffer {
    pub handle: BufferHandle,
    pub len: u64,
}

/// Buffers bound for the draw call being assembled.
///
/// Binding is not re-entrant: binding a buffer to a target that is already
/// occupied is a caller bug.
#[derive(Debug, Default)]
pub struct Bindings {
    slots: [Option<BoundBuffer>; 3],
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, target: BufferTarget, handle: BufferHandle, len: u64) {
        let slot = &mut self.slots[target.slot()];
        debug_assert!(
            slot.is_none(),
            "{target:?} target is already bound to {:?}",
            slot
        );
        *slot = Some(BoundBuffer { handle, len });
    }

    pub fn unbind(&mut self, target: BufferTarget) {
        self.slots[target.slot()] = None;
    }

    pub fn get(&self, target: BufferTarget) -> Option<BoundBuffer> {
        self.slots[target.slot()]
    }

    pub fn is_bound(&self, target: BufferTarget) -> bool {
        self.get(target).is_some()
    }

    pub fn clear(&mut self) {
        for target in BufferTarget::ALL {
            self.unbind(target);
        }
    }
}

/// Rewrites primitives a backend cannot rasterise natively.
///
/// Quads become two triangles each (`a b c`, `a c d`), a line loop becomes a
/// line strip that returns to its first vertex. Every other primitive returns
/// `None` and is drawn as is. `indices` are the element indices when the draw
/// goes through an element buffer, otherwise the draw walks
/// `first..first + count`.
pub fn lower_primitive(
    primitive: Primitive,
    indices: Option<&[u32]>,
    first: u32,
    count: u32,
) -> Option<Vec<u32>> {
    if !matches!(primitive, Primitive::Quads | Primitive::LineLoop) {
        return None;
    }
    let source: Vec<u32> = match indices {
        Some(indices) => indices.iter().take(count as usize).copied().collect(),
        None => (first..first.saturating_add(count)).collect(),
    };
    match primitive {
        Primitive::Quads => Some(
            source
                .chunks_exact(4)
                .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
                .collect(),
        ),
        Primitive::LineLoop => {
            let mut looped = source;
            if let Some(&start) = looped.first() {
                looped.push(start);
            }
            Some(looped)
        }
        _ => None,
    }
}
