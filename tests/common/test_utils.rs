#![allow(dead_code)]

use airframe_gfx::{
    Config, Handle, HeadlessDevice, ObjectType, Scene, SceneObject, Vertex,
    data_structures::renderable::RenderStyle,
    device::{DeviceCaps, GraphicsDevice},
};

/// Small growth step so tests exercise reallocation without megabytes.
pub const TEST_INCREMENT: u64 = 64;

pub fn test_config() -> Config {
    Config::default()
        .with_buffer_increment(TEST_INCREMENT)
        .with_strict_capabilities(false)
}

pub fn headless_scene() -> Scene<HeadlessDevice> {
    Scene::new(HeadlessDevice::new(), test_config())
}

pub fn scene_with_caps(caps: DeviceCaps) -> Scene<HeadlessDevice> {
    Scene::new(HeadlessDevice::new().with_caps(caps), test_config())
}

/// Unit quad in the z = 0 plane as two triangles.
pub fn quad_triangles() -> Vec<Vertex> {
    let corners = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    [0, 1, 2, 0, 2, 3]
        .iter()
        .map(|&idx| Vertex::new(corners[idx]))
        .collect()
}

pub fn points(count: u32) -> Vec<Vertex> {
    (0..count)
        .map(|idx| Vertex::new([idx as f32, 0.5 * idx as f32, -1.0]))
        .collect()
}

/// Registers an entity and uploads `vertices`.
pub fn add_entity<D: GraphicsDevice>(scene: &mut Scene<D>, vertices: &[Vertex]) -> Handle {
    let handle = scene
        .create_object(ObjectType::Entity)
        .expect("entity is registered");
    upload(scene, handle, vertices);
    handle
}

pub fn add_marker<D: GraphicsDevice>(scene: &mut Scene<D>, vertices: &[Vertex]) -> Handle {
    let handle = scene
        .create_object(ObjectType::Marker)
        .expect("marker is registered");
    upload(scene, handle, vertices);
    handle
}

pub fn upload<D: GraphicsDevice>(scene: &mut Scene<D>, handle: Handle, vertices: &[Vertex]) {
    scene
        .update(handle, |object, device| {
            object
                .as_renderable_mut()
                .expect("handle is a renderable")
                .append_vertices(device, vertices);
        })
        .expect("handle is registered");
}

pub fn set_style<D: GraphicsDevice>(scene: &mut Scene<D>, handle: Handle, style: RenderStyle) {
    scene.update(handle, |object, _| {
        if let SceneObject::Renderable(renderable) = object {
            renderable.style.render_style = style;
        }
    });
}
