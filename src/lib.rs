//! airframe-gfx
//!
//! Rendering core of a parametric aircraft geometry viewer. The crate keeps a
//! registry of scene objects (shaded entities, markers and colour-coded
//! pickables), streams their geometry into growable GPU buffers and turns each
//! frame into a short command list for a pluggable graphics device. Hosts own
//! the window, the camera controller and the event loop; the core only needs a
//! [`device::GraphicsDevice`] and a [`config::Config`].
//!
//! High-level modules
//! - `camera`: the view-projection uniform uploaded once per frame
//! - `config`: engine configuration with defaults
//! - `context`: the wgpu backend, replays frames into a pick and a colour pass
//! - `data_structures`: GPU buffers, renderables, the identifier allocator and
//!   the texture manager
//! - `device`: the graphics device trait and the host-memory device
//! - `logging`: optional `env_logger` setup
//! - `pick`: colour-coded picking
//! - `pipelines`: shader program dispatch, wgpu pipelines and uniforms
//! - `render`: the per-frame command model
//! - `scene`: object registry and frame orchestration
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod device;
pub mod logging;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use config::Config;
pub use context::Context;
pub use data_structures::buffer::Vertex;
pub use data_structures::renderable::{RenderStyle, Renderable, SceneObject};
pub use data_structures::texture::TextureImage;
pub use data_structures::texture_manager::BlendMode;
pub use device::{GraphicsDevice, headless::HeadlessDevice};
pub use pick::{PickHit, Pickable, PickableKind};
pub use render::Primitive;
pub use scene::{Handle, ObjectType, Scene};
pub use cgmath;
pub use wgpu;
