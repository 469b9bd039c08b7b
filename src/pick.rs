//! Colour-coded picking.
//!
//! A [`Pickable`] mirrors the geometry of a source [`Renderable`] and owns a
//! block of identifiers from the scene's
//! [`ColorCoder`](crate::data_structures::color_coder::ColorCoder). The
//! picking protocol works as follows:
//! 1. During predraw every pickable renders its source geometry into the pick
//!    target with its identifiers as vertex colours. Entities render as
//!    occluders with identifier 0, so depth testing rejects hidden picks.
//! 2. The host asks the scene to pick at a pixel. The scene reads that pixel,
//!    decodes the identifier and hands it to every pickable.
//! 3. The pickable whose block contains the identifier marks itself
//!    highlighted and, in per-vertex mode, remembers `id - start` as the hit
//!    vertex.
//! 4. The next draw renders the highlight, the postdraw after it clears it.
//!
//! Identifier 0 is the background and never matches.

use crate::{
    config::Config,
    data_structures::{
        buffer::ColorBuffer,
        color_coder::{ColorCoder, IdBlock},
        renderable::{DrawContext, ObjectState, Renderable},
    },
    device::GraphicsDevice,
    render::{DrawCall, DrawRange, PolygonMode, Primitive},
    scene::Handle,
};

/// Point size of pick and highlight points. Devices that rasterise fixed
/// 1-pixel points, such as the wgpu [`Context`](crate::context::Context),
/// ignore it.
pub const DEFAULT_PICK_POINT_SIZE: f32 = 8.0;

/// Granularity of a pickable, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickableKind {
    /// One identifier per source vertex.
    PerVertex,
    /// One identifier for the whole source geometry.
    PerObject,
}

/// Outcome of a successful [`Scene::pick`](crate::scene::Scene::pick).
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub id: u32,
    /// The pickable that owns `id`.
    pub pickable: Handle,
    /// The renderable the pickable mirrors.
    pub source: Handle,
    /// Hit vertex for per-vertex pickables.
    pub index: Option<u32>,
    /// Position of the hit vertex.
    pub position: Option<[f32; 3]>,
}

#[derive(Debug)]
pub struct Pickable {
    pub state: ObjectState,
    kind: PickableKind,
    // cleared when the source is removed from the scene
    source: Option<Handle>,
    block: Option<IdBlock>,
    codes: ColorBuffer,
    // source vertex count the codes were written for
    coded_vertices: u32,
    highlighted: bool,
    hit_index: Option<u32>,
    /// Recorded on pick and highlight point draws. Only devices with
    /// adjustable point size honour it; on wgpu pick points are 1 pixel.
    pub point_size: f32,
}

impl Pickable {
    pub fn new(
        kind: PickableKind,
        source: Handle,
        device: &dyn GraphicsDevice,
        config: &Config,
    ) -> Self {
        Self {
            state: ObjectState::default(),
            kind,
            source: Some(source),
            block: None,
            codes: ColorBuffer::new(device, config),
            coded_vertices: 0,
            highlighted: false,
            hit_index: None,
            point_size: DEFAULT_PICK_POINT_SIZE,
        }
    }

    pub fn kind(&self) -> PickableKind {
        self.kind
    }

    /// The mirrored renderable. `None` once it was removed from the scene.
    pub fn source(&self) -> Option<Handle> {
        self.source
    }

    pub fn block(&self) -> Option<IdBlock> {
        self.block
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn hit_index(&self) -> Option<u32> {
        self.hit_index
    }

    /// Re-sizes the identifier block to the source's current vertex count.
    /// `None` means the source is gone, which releases the block.
    pub fn sync(
        &mut self,
        source_vertices: Option<u32>,
        coder: &mut ColorCoder,
        device: &mut dyn GraphicsDevice,
    ) {
        let vertices = source_vertices.unwrap_or(0);
        if vertices == self.coded_vertices && self.block.is_some() == (vertices > 0) {
            return;
        }
        self.release(coder);
        if vertices == 0 {
            return;
        }
        let count = match self.kind {
            PickableKind::PerVertex => vertices,
            PickableKind::PerObject => 1,
        };
        let mut codes = Vec::with_capacity(vertices as usize);
        let Some(block) = coder.allocate(count, &mut codes) else {
            return;
        };
        if self.kind == PickableKind::PerObject {
            // every vertex carries the single object identifier
            codes = vec![codes[0]; vertices as usize];
        }
        self.codes.append(device, &codes);
        self.block = Some(block);
        self.coded_vertices = vertices;
        log::debug!(
            "pickable of {:?} now owns ids {}..={}",
            self.source,
            block.start,
            block.end
        );
    }

    fn release(&mut self, coder: &mut ColorCoder) {
        if let Some(block) = self.block.take() {
            coder.free(block);
        }
        self.codes.empty();
        self.coded_vertices = 0;
        self.highlighted = false;
        self.hit_index = None;
    }

    /// Detaches the pickable from its removed source. The pickable stays
    /// registered but owns no identifiers and draws nothing from then on, even
    /// when the source's handle is handed to a new object.
    pub fn orphan(&mut self, coder: &mut ColorCoder) {
        self.source = None;
        self.release(coder);
    }

    /// Returns the identifier block and the code buffer.
    pub fn destroy(&mut self, coder: &mut ColorCoder, device: &mut dyn GraphicsDevice) {
        self.release(coder);
        self.codes.destroy(device);
    }

    /// Claims `id` if it lies in this pickable's block.
    pub fn process_picking_result(&mut self, id: u32) -> bool {
        let Some(block) = self.block.filter(|block| block.contains(id)) else {
            return false;
        };
        self.highlighted = true;
        self.hit_index = match self.kind {
            PickableKind::PerVertex => Some(id - block.start),
            PickableKind::PerObject => None,
        };
        true
    }

    /// Position of the hit vertex, read from the source's host copy.
    pub fn hit_position(&self, source: &Renderable) -> Option<[f32; 3]> {
        let index = self.hit_index?;
        if index >= source.vertices().vertex_count() {
            return None;
        }
        source.vertices().vertex(index).map(|vertex| vertex.position)
    }

    fn coded_source<'a>(&self, ctx: &DrawContext<'a>) -> Option<&'a Renderable> {
        self.block?;
        let objects = ctx.objects;
        let source = objects.renderable(self.source?)?;
        // the source changed since the last sync
        (source.vertices().vertex_count() == self.coded_vertices).then_some(source)
    }

    pub fn predraw(&self, ctx: &mut DrawContext) {
        if !self.state.should_predraw() {
            return;
        }
        let Some(source) = self.coded_source(ctx) else {
            return;
        };
        let Some(program) = ctx.programs.pick() else {
            return;
        };
        let Some(call) = source.draw_call(program, Some(&self.codes)) else {
            return;
        };
        let call = DrawCall {
            polygon: PolygonMode::Fill,
            depth_bias: None,
            colour: [0.0; 4],
            textures: None,
            blend: false,
            ..call
        };
        match self.kind {
            PickableKind::PerVertex => ctx.submit(DrawCall {
                primitive: Primitive::Points,
                range: DrawRange::Sequential {
                    first: 0,
                    count: self.coded_vertices,
                },
                point_size: self.point_size,
                ..call
            }),
            PickableKind::PerObject => ctx.submit(call),
        }
    }

    /// Draws the highlight of the last pick, if any.
    pub fn draw(&self, ctx: &mut DrawContext) {
        if !self.state.should_draw() || !self.highlighted {
            return;
        }
        let Some(source) = self.coded_source(ctx) else {
            return;
        };
        let highlight = ctx.highlight;
        match self.kind {
            PickableKind::PerVertex => {
                let Some(index) = self.hit_index.filter(|index| *index < self.coded_vertices) else {
                    return;
                };
                let Some(program) = ctx.programs.flat() else {
                    return;
                };
                if let Some(call) = source.draw_call(program, None) {
                    ctx.submit(DrawCall {
                        primitive: Primitive::Points,
                        polygon: PolygonMode::Fill,
                        depth_bias: None,
                        range: DrawRange::Sequential {
                            first: index,
                            count: 1,
                        },
                        colour: highlight,
                        point_size: self.point_size,
                        textures: None,
                        blend: false,
                        ..call
                    });
                }
            }
            PickableKind::PerObject => source.draw_wire(ctx, highlight),
        }
    }

    pub fn postdraw(&mut self) {
        self.highlighted = false;
        self.hit_index = None;
    }
}
