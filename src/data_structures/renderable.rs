//! Scene objects and their draw strategies.
//!
//! Every object registered with a [`Scene`](crate::scene::Scene) is a
//! [`SceneObject`]: either a [`Renderable`] (an [`Entity`](RenderableKind::Entity)
//! surface or a [`Marker`](RenderableKind::Marker) of points and lines) or a
//! [`Pickable`] mirroring another renderable for mouse picking.
//!
//! All objects share the same three-phase lifecycle, gated by
//! [`ObjectState`]:
//!
//! - `predraw` renders into the pick target. Entities draw themselves as
//!   depth-only occluders (identifier 0) so hidden pickables cannot be hit.
//! - `draw` renders into the visible frame.
//! - `postdraw` clears per-frame state such as pick highlights.
//!
//! A renderable records at most one draw call per phase, except for the
//! wire-frame-solid style which records a depth-biased filled pass followed by
//! the wire pass.

use crate::{
    config::Config,
    data_structures::{
        buffer::{ColorBuffer, ElementBuffer, Vertex, VertexBuffer},
        texture_manager::TextureManager,
    },
    device::{BufferTarget, GraphicsDevice, TextureId},
    pick::Pickable,
    pipelines::{ProgramId, ProgramTable},
    render::{
        Bindings, Command, DrawCall, DrawRange, PolygonMode, Primitive, SOLID_PASS_DEPTH_BIAS,
    },
    scene::Handle,
};

/// Visibility and lifecycle switches of one scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectState {
    pub visible: bool,
    predraw_enabled: bool,
    postdraw_enabled: bool,
}

impl Default for ObjectState {
    fn default() -> Self {
        Self {
            visible: true,
            predraw_enabled: false,
            postdraw_enabled: false,
        }
    }
}

impl ObjectState {
    pub fn should_predraw(&self) -> bool {
        self.visible && self.predraw_enabled
    }

    pub fn should_draw(&self) -> bool {
        self.visible
    }

    pub fn should_postdraw(&self) -> bool {
        self.visible && self.postdraw_enabled
    }

    pub fn predraw_enabled(&self) -> bool {
        self.predraw_enabled
    }

    pub fn postdraw_enabled(&self) -> bool {
        self.postdraw_enabled
    }

    pub fn set_predraw_enabled(&mut self, enabled: bool) {
        self.predraw_enabled = enabled;
    }

    pub fn set_postdraw_enabled(&mut self, enabled: bool) {
        self.postdraw_enabled = enabled;
    }
}

/// How an entity's surface is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStyle {
    #[default]
    MeshShaded,
    MeshTextured,
    WireFrame,
    /// Wireframe with hidden lines removed: the surface is filled with the
    /// background colour first, pushed back by [`SOLID_PASS_DEPTH_BIAS`].
    WireFrameSolid,
}

/// Per-object draw attributes. Read at draw time only.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub mesh_colour: [f32; 4],
    pub line_colour: [f32; 4],
    pub point_colour: [f32; 4],
    pub text_colour: [f32; 4],
    pub line_width: f32,
    pub point_size: f32,
    pub text_size: f32,
    pub primitive: Primitive,
    pub render_style: RenderStyle,
    /// Index the vertex buffer through the element buffer.
    pub use_elements: bool,
    /// Alpha-blend against what is already in the frame.
    pub blend: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            mesh_colour: [0.7, 0.7, 0.7, 1.0],
            line_colour: [0.0, 0.0, 0.0, 1.0],
            point_colour: [0.0, 0.0, 0.0, 1.0],
            text_colour: [0.0, 0.0, 0.0, 1.0],
            line_width: 1.0,
            point_size: 1.0,
            text_size: 12.0,
            primitive: Primitive::Triangles,
            render_style: RenderStyle::MeshShaded,
            use_elements: false,
            blend: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderableKind {
    /// Triangulated surface.
    Entity,
    /// Points and lines, optionally with per-vertex colours.
    Marker,
}

/// Read access to the renderables of a scene, used by pickables to reach
/// their source geometry.
pub trait RenderableLookup {
    fn renderable(&self, handle: Handle) -> Option<&Renderable>;
}

/// Everything an object needs to record its draw calls.
pub struct DrawContext<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub programs: &'a ProgramTable,
    pub objects: &'a dyn RenderableLookup,
    /// Lighting is on for this frame.
    pub lighting: bool,
    pub background: [f32; 4],
    pub highlight: [f32; 4],
}

impl DrawContext<'_> {
    pub(crate) fn submit(&mut self, call: DrawCall) {
        self.device.record(Command::Draw(call));
    }
}

#[derive(Debug)]
pub struct Renderable {
    pub state: ObjectState,
    kind: RenderableKind,
    vertices: VertexBuffer,
    colors: ColorBuffer,
    elements: ElementBuffer,
    pub style: Style,
    pub textures: TextureManager,
}

impl Renderable {
    pub fn new(kind: RenderableKind, device: &dyn GraphicsDevice, config: &Config) -> Self {
        let style = match kind {
            RenderableKind::Entity => Style::default(),
            RenderableKind::Marker => Style {
                primitive: Primitive::Points,
                ..Style::default()
            },
        };
        Self {
            state: ObjectState::default(),
            kind,
            vertices: VertexBuffer::new(device, config),
            colors: ColorBuffer::new(device, config),
            elements: ElementBuffer::new(device, config),
            style,
            textures: TextureManager::new(),
        }
    }

    pub fn kind(&self) -> RenderableKind {
        self.kind
    }

    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    pub fn colors(&self) -> &ColorBuffer {
        &self.colors
    }

    pub fn elements(&self) -> &ElementBuffer {
        &self.elements
    }

    pub fn append_vertices(&mut self, device: &mut dyn GraphicsDevice, vertices: &[Vertex]) {
        self.vertices.append(device, vertices);
    }

    pub fn append_colors(&mut self, device: &mut dyn GraphicsDevice, colors: &[[u8; 4]]) {
        self.colors.append(device, colors);
    }

    pub fn append_elements(&mut self, device: &mut dyn GraphicsDevice, indices: &[u32]) {
        self.elements.append(device, indices);
    }

    /// Drops all geometry. Device allocations are kept for the next upload.
    pub fn empty(&mut self) {
        self.vertices.empty();
        self.colors.empty();
        self.elements.empty();
    }

    /// Attaches `texture` on the next texture unit the device offers.
    pub fn attach_texture(&mut self, texture: TextureId, device: &dyn GraphicsDevice) -> Option<u32> {
        self.textures.add(texture, device.caps().max_texture_units)
    }

    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.vertices.destroy(device);
        self.colors.destroy(device);
        self.elements.destroy(device);
    }

    /// Draw call over this renderable's geometry with the style defaults.
    /// `None` when there is nothing to draw.
    pub(crate) fn draw_call(&self, program: ProgramId, colors: Option<&ColorBuffer>) -> Option<DrawCall> {
        let mut bindings = Bindings::new();
        if !self.vertices.bind(&mut bindings) {
            return None;
        }
        if let Some(colors) = colors {
            colors.bind(&mut bindings);
        }
        if self.style.use_elements {
            self.elements.bind(&mut bindings);
        }
        let call = self.assemble(&bindings, program);
        bindings.clear();
        call.filter(|call| call.range.count() > 0)
    }

    fn assemble(&self, bindings: &Bindings, program: ProgramId) -> Option<DrawCall> {
        let vertices = bindings.get(BufferTarget::Vertex)?;
        let range = if self.style.use_elements {
            let elements = bindings.get(BufferTarget::Element)?;
            DrawRange::Elements {
                buffer: elements.handle,
                count: (elements.len / ElementBuffer::STRIDE) as u32,
            }
        } else {
            DrawRange::Sequential {
                first: 0,
                count: (vertices.len / Vertex::STRIDE) as u32,
            }
        };
        Some(DrawCall {
            program,
            primitive: self.style.primitive,
            polygon: PolygonMode::Fill,
            depth_bias: None,
            vertices: vertices.handle,
            colors: bindings.get(BufferTarget::Color).map(|bound| bound.handle),
            range,
            colour: self.style.mesh_colour,
            point_size: self.style.point_size,
            line_width: self.style.line_width,
            textures: None,
            blend: self.style.blend,
        })
    }

    /// Depth-only occluder in the pick pass. Markers never occlude.
    pub fn predraw(&self, ctx: &mut DrawContext) {
        if !self.state.should_predraw() || self.kind == RenderableKind::Marker {
            return;
        }
        let Some(program) = ctx.programs.flat() else {
            return;
        };
        if let Some(call) = self.draw_call(program, None) {
            ctx.submit(DrawCall {
                colour: [0.0; 4],
                // pick points on the surface must win against it
                depth_bias: Some(SOLID_PASS_DEPTH_BIAS),
                blend: false,
                ..call
            });
        }
    }

    pub fn draw(&self, ctx: &mut DrawContext) {
        if !self.state.should_draw() {
            return;
        }
        match self.kind {
            RenderableKind::Entity => self.draw_entity(ctx),
            RenderableKind::Marker => self.draw_marker(ctx),
        }
    }

    /// Renderables keep no per-frame state.
    pub fn postdraw(&mut self) {}

    fn draw_entity(&self, ctx: &mut DrawContext) {
        match self.style.render_style {
            RenderStyle::MeshShaded => self.draw_shaded(ctx),
            RenderStyle::MeshTextured => {
                let Some(binding) = self.textures.bind(ctx.programs, ctx.lighting) else {
                    self.draw_shaded(ctx);
                    return;
                };
                if let Some(call) = self.draw_call(binding.program, None) {
                    ctx.submit(DrawCall {
                        textures: Some(binding),
                        ..call
                    });
                }
            }
            RenderStyle::WireFrame => self.draw_wire(ctx, self.style.line_colour),
            RenderStyle::WireFrameSolid => {
                let Some(program) = ctx.programs.flat() else {
                    return;
                };
                if let Some(call) = self.draw_call(program, None) {
                    ctx.submit(DrawCall {
                        colour: ctx.background,
                        depth_bias: Some(SOLID_PASS_DEPTH_BIAS),
                        blend: false,
                        ..call
                    });
                }
                self.draw_wire(ctx, self.style.line_colour);
            }
        }
    }

    fn draw_shaded(&self, ctx: &mut DrawContext) {
        let program = if ctx.lighting {
            ctx.programs.shaded()
        } else {
            ctx.programs.flat()
        };
        if let Some(call) = program.and_then(|program| self.draw_call(program, None)) {
            ctx.submit(call);
        }
    }

    /// Surface edges in `colour`.
    pub(crate) fn draw_wire(&self, ctx: &mut DrawContext, colour: [f32; 4]) {
        let Some(program) = ctx.programs.flat() else {
            return;
        };
        if let Some(call) = self.draw_call(program, None) {
            let polygon = if call.primitive.is_line() || call.primitive == Primitive::Points {
                PolygonMode::Fill
            } else {
                PolygonMode::Line
            };
            ctx.submit(DrawCall {
                polygon,
                colour,
                ..call
            });
        }
    }

    fn draw_marker(&self, ctx: &mut DrawContext) {
        let colour = if self.style.primitive == Primitive::Points {
            self.style.point_colour
        } else {
            self.style.line_colour
        };
        let vertex_colored = (!self.colors.is_empty())
            .then(|| ctx.programs.vertex_color())
            .flatten();
        let call = match vertex_colored {
            Some(program) => self.draw_call(program, Some(&self.colors)),
            None => ctx
                .programs
                .flat()
                .and_then(|program| self.draw_call(program, None)),
        };
        if let Some(call) = call {
            ctx.submit(DrawCall { colour, ..call });
        }
    }
}

/// Closed set of objects a scene can hold.
#[derive(Debug)]
pub enum SceneObject {
    Renderable(Renderable),
    Pickable(Pickable),
}

impl SceneObject {
    pub fn state(&self) -> &ObjectState {
        match self {
            SceneObject::Renderable(renderable) => &renderable.state,
            SceneObject::Pickable(pickable) => &pickable.state,
        }
    }

    pub fn state_mut(&mut self) -> &mut ObjectState {
        match self {
            SceneObject::Renderable(renderable) => &mut renderable.state,
            SceneObject::Pickable(pickable) => &mut pickable.state,
        }
    }

    pub fn as_renderable(&self) -> Option<&Renderable> {
        match self {
            SceneObject::Renderable(renderable) => Some(renderable),
            SceneObject::Pickable(_) => None,
        }
    }

    pub fn as_renderable_mut(&mut self) -> Option<&mut Renderable> {
        match self {
            SceneObject::Renderable(renderable) => Some(renderable),
            SceneObject::Pickable(_) => None,
        }
    }

    pub fn as_pickable(&self) -> Option<&Pickable> {
        match self {
            SceneObject::Pickable(pickable) => Some(pickable),
            SceneObject::Renderable(_) => None,
        }
    }

    pub fn as_pickable_mut(&mut self) -> Option<&mut Pickable> {
        match self {
            SceneObject::Pickable(pickable) => Some(pickable),
            SceneObject::Renderable(_) => None,
        }
    }

    pub fn predraw(&self, ctx: &mut DrawContext) {
        match self {
            SceneObject::Renderable(renderable) => renderable.predraw(ctx),
            SceneObject::Pickable(pickable) => pickable.predraw(ctx),
        }
    }

    pub fn draw(&self, ctx: &mut DrawContext) {
        match self {
            SceneObject::Renderable(renderable) => renderable.draw(ctx),
            SceneObject::Pickable(pickable) => pickable.draw(ctx),
        }
    }

    pub fn postdraw(&mut self) {
        if !self.state().should_postdraw() {
            return;
        }
        match self {
            SceneObject::Renderable(renderable) => renderable.postdraw(),
            SceneObject::Pickable(pickable) => pickable.postdraw(),
        }
    }
}
