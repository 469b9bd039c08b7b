//! Scene registry and frame orchestration.
//!
//! A [`Scene`] owns every registered [`SceneObject`] under a recycled
//! [`Handle`], the shared [`Lighting`] state, the identifier allocator used by
//! its pickables and the [`GraphicsDevice`] everything is drawn with.
//!
//! The host drives one frame as `predraw()`, `draw()`, `postdraw()` (or
//! [`Scene::render_frame`]) and calls [`Scene::pick`] with mouse coordinates
//! after a frame has been presented. Objects are drawn in registration order;
//! callers order blended objects after opaque ones themselves.

use std::fmt;

use crate::{
    camera::CameraUniform,
    config::Config,
    data_structures::{
        color_coder::{ColorCoder, decode_id},
        renderable::{DrawContext, Renderable, RenderableKind, RenderableLookup, SceneObject},
        texture::TextureImage,
    },
    device::{GraphicsDevice, TextureId},
    logging::init_logging,
    pick::{PickHit, Pickable, PickableKind},
    pipelines::{ProgramTable, light::Lighting},
    render::{Command, Pass},
};

/// Identifies a registered scene object. Distinct from pick identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Recycling handle source. Released handles are reused most recent first,
/// new ones come from a counter starting at 1.
#[derive(Debug, Default)]
struct HandlePool {
    next_id: u32,
    free: Vec<u32>,
}

impl HandlePool {
    fn acquire(&mut self) -> Option<Handle> {
        if let Some(id) = self.free.pop() {
            return Some(Handle(id));
        }
        self.next_id = self.next_id.checked_add(1)?;
        Some(Handle(self.next_id))
    }

    fn release(&mut self, handle: Handle) {
        debug_assert!(!self.free.contains(&handle.0), "{handle} released twice");
        self.free.push(handle.0);
    }
}

/// What [`Scene::create_object`] should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Entity,
    Marker,
    /// Makes the renderable `source` pickable.
    Pickable { source: Handle, kind: PickableKind },
}

#[derive(Debug)]
struct Entry {
    handle: Handle,
    object: SceneObject,
}

/// Registered objects in registration order.
#[derive(Debug, Default)]
struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    fn position(&self, handle: Handle) -> Option<usize> {
        self.entries.iter().position(|entry| entry.handle == handle)
    }

    fn get(&self, handle: Handle) -> Option<&SceneObject> {
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| &entry.object)
    }

    fn get_mut(&mut self, handle: Handle) -> Option<&mut SceneObject> {
        self.entries
            .iter_mut()
            .find(|entry| entry.handle == handle)
            .map(|entry| &mut entry.object)
    }
}

impl RenderableLookup for Registry {
    fn renderable(&self, handle: Handle) -> Option<&Renderable> {
        self.get(handle)?.as_renderable()
    }
}

pub struct Scene<D: GraphicsDevice> {
    device: D,
    config: Config,
    programs: ProgramTable,
    registry: Registry,
    handles: HandlePool,
    coder: ColorCoder,
    lighting: Lighting,
    camera: CameraUniform,
    pickable_count: usize,
    selection: Option<PickHit>,
}

impl<D: GraphicsDevice> Scene<D> {
    /// Creates an empty scene drawing with `device`. Resolves the program
    /// table once. Installs `env_logger` only when the config asks for it.
    pub fn new(mut device: D, config: Config) -> Self {
        if config.install_logger {
            init_logging(config.logging.clone());
        }
        let programs = ProgramTable::build(&mut device);
        let mut lighting = Lighting::default();
        lighting.enabled = config.lighting;
        log::info!("scene created, device caps {:?}", device.caps());
        Self {
            device,
            config,
            programs,
            registry: Registry::default(),
            handles: HandlePool::default(),
            coder: ColorCoder::new(),
            lighting,
            camera: CameraUniform::new(),
            pickable_count: 0,
            selection: None,
        }
    }

    /// Registers a new object. `None` when a pickable's source is not a
    /// registered renderable or the handle space is exhausted.
    pub fn create_object(&mut self, object_type: ObjectType) -> Option<Handle> {
        let object = match object_type {
            ObjectType::Entity => SceneObject::Renderable(Renderable::new(
                RenderableKind::Entity,
                &self.device,
                &self.config,
            )),
            ObjectType::Marker => SceneObject::Renderable(Renderable::new(
                RenderableKind::Marker,
                &self.device,
                &self.config,
            )),
            ObjectType::Pickable { source, kind } => {
                if self.registry.renderable(source).is_none() {
                    log::warn!("cannot make {source} pickable: it is not a renderable");
                    return None;
                }
                SceneObject::Pickable(Pickable::new(kind, source, &self.device, &self.config))
            }
        };
        let Some(handle) = self.handles.acquire() else {
            log::error!("scene handle space exhausted");
            return None;
        };
        let mut object = object;
        let picking = self.pickable_count > 0;
        object.state_mut().set_predraw_enabled(picking);
        object.state_mut().set_postdraw_enabled(picking);
        let is_pickable = object.as_pickable().is_some();
        self.registry.entries.push(Entry { handle, object });

        if is_pickable {
            self.pickable_count += 1;
            if self.pickable_count == 1 {
                self.set_pick_lifecycle(true);
            }
        }
        log::debug!("registered {object_type:?} as {handle}");
        Some(handle)
    }

    /// Unregisters and destroys an object. Its handle becomes reusable.
    pub fn remove_object(&mut self, handle: Handle) -> bool {
        let Some(idx) = self.registry.position(handle) else {
            return false;
        };
        let Entry { object, .. } = self.registry.entries.remove(idx);
        match object {
            SceneObject::Renderable(mut renderable) => {
                renderable.destroy(&mut self.device);
                self.orphan_pickables_of(handle);
            }
            SceneObject::Pickable(mut pickable) => {
                pickable.destroy(&mut self.coder, &mut self.device);
                self.pickable_count -= 1;
                if self.pickable_count == 0 {
                    self.set_pick_lifecycle(false);
                }
            }
        }
        if self
            .selection
            .as_ref()
            .is_some_and(|hit| hit.pickable == handle || hit.source == handle)
        {
            self.selection = None;
        }
        self.handles.release(handle);
        log::debug!("removed {handle}");
        true
    }

    // The handle of a removed source is recycled, pickables must not follow it.
    fn orphan_pickables_of(&mut self, source: Handle) {
        for entry in self.registry.entries.iter_mut() {
            if let Some(pickable) = entry.object.as_pickable_mut() {
                if pickable.source() == Some(source) {
                    pickable.orphan(&mut self.coder);
                    log::debug!("{} lost its source {source}", entry.handle);
                }
            }
        }
    }

    // Predraw and postdraw only matter while something is pickable.
    fn set_pick_lifecycle(&mut self, enabled: bool) {
        for entry in self.registry.entries.iter_mut() {
            let state = entry.object.state_mut();
            state.set_predraw_enabled(enabled);
            state.set_postdraw_enabled(enabled);
        }
        log::debug!("pick pass {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn object(&self, handle: Handle) -> Option<&SceneObject> {
        self.registry.get(handle)
    }

    pub fn renderable(&self, handle: Handle) -> Option<&Renderable> {
        self.registry.renderable(handle)
    }

    pub fn pickable(&self, handle: Handle) -> Option<&Pickable> {
        self.registry.get(handle)?.as_pickable()
    }

    /// Runs `f` on a registered object together with the device, e.g. to
    /// upload geometry or change its style.
    pub fn update<R>(
        &mut self,
        handle: Handle,
        f: impl FnOnce(&mut SceneObject, &mut dyn GraphicsDevice) -> R,
    ) -> Option<R> {
        let object = self.registry.get_mut(handle)?;
        Some(f(object, &mut self.device))
    }

    /// Handles in registration order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.registry.entries.iter().map(|entry| entry.handle)
    }

    pub fn len(&self) -> usize {
        self.registry.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.entries.is_empty()
    }

    pub fn pickable_count(&self) -> usize {
        self.pickable_count
    }

    /// Uploads a texture. The scene does not track it; release it with
    /// [`Scene::remove_texture`].
    pub fn create_texture(&mut self, image: &TextureImage) -> anyhow::Result<TextureId> {
        self.device.create_texture(image)
    }

    /// Detaches `texture` from every renderable and destroys it.
    pub fn remove_texture(&mut self, texture: TextureId) {
        for entry in self.registry.entries.iter_mut() {
            if let Some(renderable) = entry.object.as_renderable_mut() {
                renderable.textures.detach_texture(texture);
            }
        }
        self.device.destroy_texture(texture);
    }

    /// Attaches `texture` to a renderable. `None` when `handle` is not a
    /// renderable or its texture units are exhausted.
    pub fn attach_texture(&mut self, handle: Handle, texture: TextureId) -> Option<u32> {
        let renderable = self.registry.get_mut(handle)?.as_renderable_mut()?;
        renderable.attach_texture(texture, &self.device)
    }

    pub fn camera(&self) -> &CameraUniform {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: CameraUniform) {
        self.camera = camera;
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn lighting_mut(&mut self) -> &mut Lighting {
        &mut self.lighting
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn programs(&self) -> &ProgramTable {
        &self.programs
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn coder(&self) -> &ColorCoder {
        &self.coder
    }

    fn lighting_on(&self) -> bool {
        self.lighting.enabled && self.lighting.active_lights() > 0
    }

    // Keeps every pickable's identifier block in step with its source.
    fn sync_pickables(&mut self) {
        let registry = &self.registry;
        let pending: Vec<(usize, Option<u32>)> = registry
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let pickable = entry.object.as_pickable()?;
                let vertices = pickable
                    .source()
                    .and_then(|source| registry.renderable(source))
                    .map(|source| source.vertices().vertex_count());
                Some((idx, vertices))
            })
            .collect();
        for (idx, vertices) in pending {
            if let Some(pickable) = self.registry.entries[idx].object.as_pickable_mut() {
                pickable.sync(vertices, &mut self.coder, &mut self.device);
            }
        }
    }

    /// Renders the pick target. Skipped while nothing is pickable.
    pub fn predraw(&mut self) {
        if self.pickable_count == 0 {
            return;
        }
        self.sync_pickables();
        self.device.record(Command::SetCamera(self.camera));
        self.device.record(Command::BeginPass(Pass::Pick));

        let lighting = self.lighting_on();
        let mut ctx = DrawContext {
            device: &mut self.device,
            programs: &self.programs,
            objects: &self.registry,
            lighting,
            background: self.config.background(),
            highlight: self.config.highlight_colour,
        };
        for entry in self.registry.entries.iter() {
            entry.object.predraw(&mut ctx);
        }
    }

    /// Uploads camera and lighting, then draws every object in registration
    /// order.
    pub fn draw(&mut self) {
        self.device.record(Command::SetCamera(self.camera));
        self.device
            .record(Command::SetLighting(self.lighting.to_uniform()));
        self.device.record(Command::BeginPass(Pass::Color));

        let lighting = self.lighting_on();
        let mut ctx = DrawContext {
            device: &mut self.device,
            programs: &self.programs,
            objects: &self.registry,
            lighting,
            background: self.config.background(),
            highlight: self.config.highlight_colour,
        };
        for entry in self.registry.entries.iter() {
            entry.object.draw(&mut ctx);
        }
    }

    pub fn postdraw(&mut self) {
        for entry in self.registry.entries.iter_mut() {
            entry.object.postdraw();
        }
    }

    pub fn render_frame(&mut self) {
        self.predraw();
        self.draw();
        self.postdraw();
    }

    /// Reads the pick target at `(x, y)` and forwards the decoded identifier
    /// to every pickable. The hit, if any, becomes the scene selection.
    pub fn pick(&mut self, x: u32, y: u32) -> Option<PickHit> {
        self.selection = None;
        let id = decode_id(self.device.read_pixel(x, y)?)?;

        let mut claimed = None;
        for entry in self.registry.entries.iter_mut() {
            if let Some(pickable) = entry.object.as_pickable_mut() {
                if pickable.process_picking_result(id) {
                    claimed = Some(entry.handle);
                }
            }
        }
        let Some(pickable_handle) = claimed else {
            log::debug!("id {id} at ({x}, {y}) belongs to no pickable");
            return None;
        };

        let pickable = self.pickable(pickable_handle)?;
        let source = pickable.source()?;
        let hit = PickHit {
            id,
            pickable: pickable_handle,
            source,
            index: pickable.hit_index(),
            position: self
                .renderable(source)
                .and_then(|renderable| pickable.hit_position(renderable)),
        };
        log::info!("picked id {id} of {pickable_handle} at ({x}, {y})");
        self.selection = Some(hit.clone());
        Some(hit)
    }

    /// The last successful pick.
    pub fn selection(&self) -> Option<&PickHit> {
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}
