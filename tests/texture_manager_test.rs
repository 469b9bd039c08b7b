use std::io::Cursor;

use airframe_gfx::{
    BlendMode, HeadlessDevice, TextureImage,
    data_structures::texture_manager::TextureManager,
    device::{DeviceCaps, TextureId},
    pipelines::{MAX_TEXTURE_LAYERS, ProgramKey, ProgramTable},
};

fn manager_with(count: u32) -> TextureManager {
    let mut manager = TextureManager::new();
    for texture in 1..=count {
        manager
            .add(TextureId(texture), MAX_TEXTURE_LAYERS)
            .expect("unit available");
    }
    manager
}

#[test]
fn add_stops_at_the_texture_unit_limit() {
    let mut manager = TextureManager::new();
    for texture in 1..=3 {
        assert_eq!(manager.add(TextureId(texture), 3), Some(texture));
    }
    assert_eq!(manager.add(TextureId(4), 3), None);
    assert_eq!(manager.len(), 3);

    // the device limit never exceeds what the shaders can sample
    let mut manager = TextureManager::new();
    let added = (1..=12)
        .filter_map(|texture| manager.add(TextureId(texture), 32))
        .count();
    assert_eq!(added, MAX_TEXTURE_LAYERS);
}

#[test]
fn removal_compacts_and_keeps_unit_order() {
    let mut manager = manager_with(3);
    let removed = manager.remove(2).expect("attached");
    assert_eq!(removed.texture(), TextureId(2));
    assert_eq!(manager.remove(2), None);

    let order: Vec<TextureId> = manager
        .attachments()
        .iter()
        .map(|attachment| attachment.texture())
        .collect();
    assert_eq!(order, vec![TextureId(1), TextureId(3)]);

    // handles are never reused
    assert_eq!(manager.add(TextureId(9), MAX_TEXTURE_LAYERS), Some(4));
    manager.detach_texture(TextureId(1));
    assert_eq!(manager.len(), 2);
    assert!(manager.get(1).is_none());
}

#[test]
fn bind_selects_the_program_for_count_and_mode() {
    let mut device = HeadlessDevice::new();
    let programs = ProgramTable::build(&mut device);
    let mut manager = manager_with(3);
    manager.set_blend_mode(BlendMode::Cull);

    let binding = manager.bind(&programs, true).expect("program available");
    assert_eq!(Some(binding.program), programs.textured(3, BlendMode::Cull));
    assert_eq!(
        device.program_key(binding.program),
        Some(ProgramKey::Textured {
            layers: 3,
            mode: BlendMode::Cull
        })
    );
    assert_eq!(binding.mode, BlendMode::Cull);
    assert!(binding.lit);
    assert_eq!(binding.layers.len(), 3);

    let textures: Vec<TextureId> = binding.layers.iter().map(|layer| layer.texture).collect();
    assert_eq!(textures, vec![TextureId(1), TextureId(2), TextureId(3)]);
}

#[test]
fn single_layer_ignores_the_blend_mode() {
    let mut device = HeadlessDevice::new();
    let programs = ProgramTable::build(&mut device);
    let mut manager = manager_with(1);
    manager.set_blend_mode(BlendMode::Layer);

    let binding = manager.bind(&programs, true).expect("program available");
    assert_eq!(binding.mode, BlendMode::Blend);
    assert_eq!(
        device.program_key(binding.program),
        Some(ProgramKey::Textured {
            layers: 1,
            mode: BlendMode::Blend
        })
    );
}

#[test]
fn lighting_off_falls_back_to_the_first_layer_unlit() {
    let mut device = HeadlessDevice::new();
    let programs = ProgramTable::build(&mut device);
    let manager = manager_with(4);

    let binding = manager.bind(&programs, false).expect("unlit program available");
    assert_eq!(Some(binding.program), programs.textured_unlit());
    assert!(!binding.lit);
    assert_eq!(binding.layers.len(), 1);
    assert_eq!(binding.layers[0].texture, TextureId(1));
}

#[test]
fn missing_lit_programs_fall_back_to_unlit() {
    let mut device = HeadlessDevice::new().with_lit_textures(false);
    let programs = ProgramTable::build(&mut device);
    assert_eq!(programs.textured(1, BlendMode::Blend), None);

    let binding = manager_with(2)
        .bind(&programs, true)
        .expect("unlit program available");
    assert!(!binding.lit);
    assert_eq!(binding.layers.len(), 1);

    // a device with fewer units than attachments
    let caps = DeviceCaps {
        max_texture_units: 2,
        ..DeviceCaps::default()
    };
    let mut device = HeadlessDevice::new().with_caps(caps);
    let programs = ProgramTable::build(&mut device);
    assert!(programs.textured(2, BlendMode::Layer).is_some());
    assert_eq!(programs.textured(3, BlendMode::Layer), None);
    let binding = manager_with(3)
        .bind(&programs, true)
        .expect("unlit program available");
    assert!(!binding.lit);
}

#[test]
fn no_texture_units_means_no_binding() {
    let caps = DeviceCaps {
        max_texture_units: 0,
        ..DeviceCaps::default()
    };
    let mut device = HeadlessDevice::new().with_caps(caps);
    let programs = ProgramTable::build(&mut device);
    assert_eq!(manager_with(1).bind(&programs, true), None);

    let mut device = HeadlessDevice::new();
    let programs = ProgramTable::build(&mut device);
    assert_eq!(TextureManager::new().bind(&programs, true), None);
}

#[test]
fn only_the_topmost_culling_layer_cuts_with_texel_alpha() {
    let cutting: Vec<usize> = (0..3)
        .filter(|&layer| BlendMode::Cull.cuts_with_texel_alpha(layer, 3))
        .collect();
    assert_eq!(cutting, vec![2]);
    assert!(BlendMode::Cull.cuts_with_texel_alpha(7, 8));
    assert!(!BlendMode::Cull.cuts_with_texel_alpha(1, 8));
    // a single layer always blends
    assert!(!BlendMode::Cull.cuts_with_texel_alpha(0, 1));
    for mode in [BlendMode::Blend, BlendMode::Layer] {
        assert!((0..4).all(|layer| !mode.cuts_with_texel_alpha(layer, 4)));
    }
}

#[test]
fn layer_state_carries_transform_flip_and_alpha() {
    let mut device = HeadlessDevice::new();
    let programs = ProgramTable::build(&mut device);
    let mut manager = manager_with(1);
    let attachment = manager.get_mut(1).expect("attached");
    attachment.translate = [0.5, 0.25];
    attachment.scale = [2.0, 3.0];
    attachment.flip = [true, false];
    attachment.alpha = 1.5;

    let binding = manager.bind(&programs, true).expect("program available");
    let layer = &binding.layers[0];
    assert_eq!(
        layer.transform,
        [
            [2.0, 0.0, 0.0, 0.0],
            [0.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.5, 0.25, 0.0, 1.0],
        ]
    );
    assert_eq!(layer.flip, [1.0, 0.0]);
    assert_eq!(layer.scale, [2.0, 3.0]);
    assert_eq!(layer.alpha, 1.0);
}

#[test]
fn texture_images_decode_and_validate() {
    let raw = vec![255, 0, 0, 255, 0, 0, 255, 128];
    let rgba = image::RgbaImage::from_raw(2, 1, raw.clone()).expect("valid size");
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .expect("encodes");

    let decoded = TextureImage::from_bytes(&png, Some("png")).expect("decodes");
    assert_eq!((decoded.width(), decoded.height()), (2, 1));
    assert_eq!(decoded.pixels(), raw.as_slice());
    assert_eq!(decoded.pixel(1, 0), Some([0, 0, 255, 128]));
    assert_eq!(decoded.pixel(2, 0), None);
    assert_eq!(TextureImage::from_bytes(&png, None).expect("guessed"), decoded);

    assert!(TextureImage::from_bytes(&png, Some("definitely-not-a-format")).is_err());
    assert!(TextureImage::from_bytes(&[1, 2, 3], Some("png")).is_err());
    assert!(TextureImage::from_rgba(2, 2, vec![0; 15]).is_err());
    assert!(TextureImage::from_rgba(0, 2, Vec::new()).is_err());
    assert_eq!(
        TextureImage::from_rgba(1, 1, vec![1, 2, 3, 4]).expect("valid").pixel(0, 0),
        Some([1, 2, 3, 4])
    );
}
