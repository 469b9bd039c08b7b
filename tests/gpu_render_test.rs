#[cfg(feature = "integration-tests")]
use airframe_gfx::{Context, ObjectType, PickableKind, RenderStyle, Scene};

#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{quad_triangles, set_style, test_config, upload};
#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn gpu_scene(width: u32, height: u32) -> Scene<Context> {
    let config = test_config();
    let context = futures::executor::block_on(Context::headless(width, height, &config))
        .expect("a graphics adapter is available");
    Scene::new(context, config)
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_pick_the_quad_under_the_cursor() {
    let mut scene = gpu_scene(64, 64);
    // identity camera: the quad covers the upper right quarter of the target
    let entity = scene
        .create_object(ObjectType::Entity)
        .expect("registered");
    upload(&mut scene, entity, &quad_triangles());
    let pickable = scene
        .create_object(ObjectType::Pickable {
            source: entity,
            kind: PickableKind::PerObject,
        })
        .expect("registered");

    scene.render_frame();
    scene
        .device_mut()
        .render_offscreen()
        .expect("headless context");

    let hit = scene.pick(48, 16).expect("quad is hit");
    assert_eq!(hit.pickable, pickable);
    assert_eq!(hit.source, entity);
    assert_eq!(scene.pick(8, 56), None);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_every_style_without_validation_errors() {
    let mut scene = gpu_scene(32, 32);
    for style in [
        RenderStyle::MeshShaded,
        RenderStyle::MeshTextured,
        RenderStyle::WireFrame,
        RenderStyle::WireFrameSolid,
    ] {
        let entity = scene
            .create_object(ObjectType::Entity)
            .expect("registered");
        upload(&mut scene, entity, &quad_triangles());
        set_style(&mut scene, entity, style);
    }
    let texture = scene
        .create_texture(&airframe_gfx::TextureImage::solid(4, 4, [0, 128, 255, 255]))
        .expect("uploaded");
    let textured = scene.handles().nth(1).expect("registered");
    assert_eq!(scene.attach_texture(textured, texture), Some(1));

    for _ in 0..2 {
        scene.render_frame();
        scene
            .device_mut()
            .render_offscreen()
            .expect("headless context");
    }
    scene.remove_texture(texture);
}
