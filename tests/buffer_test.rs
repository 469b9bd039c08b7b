use airframe_gfx::{
    Config, HeadlessDevice, Vertex,
    data_structures::buffer::{ElementBuffer, GpuBuffer, VertexBuffer},
    device::{BufferTarget, DeviceCaps},
    render::DrawRange,
};

use crate::common::test_utils::test_config;
mod common;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|idx| (idx * 7 % 251) as u8).collect()
}

fn contents(device: &HeadlessDevice, buffer: &GpuBuffer) -> Vec<u8> {
    let handle = buffer.handle().expect("buffer is allocated");
    device.buffer_contents(handle).expect("allocation is live")[..buffer.len() as usize].to_vec()
}

#[test]
fn appends_are_independent_of_chunking() {
    let data = payload(300);
    let chunkings: [&[usize]; 4] = [&[300], &[1, 299], &[64, 64, 64, 64, 44], &[7; 42]];

    let mut results = Vec::new();
    for chunks in chunkings {
        let mut device = HeadlessDevice::new();
        let mut buffer = GpuBuffer::new(&device, BufferTarget::Vertex, &test_config());
        let mut offset = 0;
        for &len in chunks {
            buffer.append(&mut device, &data[offset..offset + len]);
            offset += len;
        }
        // 7 * 42 = 294, the tail goes in as one
        buffer.append(&mut device, &data[offset..]);

        assert_eq!(buffer.len(), 300);
        assert!(buffer.capacity() >= buffer.len());
        assert_eq!(device.buffer_count(), 1);
        results.push(contents(&device, &buffer));
    }
    for result in &results {
        assert_eq!(result, &data);
    }
}

#[test]
fn growth_rounds_to_increment_and_keeps_old_bytes() {
    let mut device = HeadlessDevice::new();
    let config = Config::default().with_buffer_increment(16);
    let mut buffer = GpuBuffer::new(&device, BufferTarget::Color, &config);
    assert_eq!(buffer.capacity(), 0);
    assert!(buffer.handle().is_none());

    buffer.append(&mut device, &[1; 10]);
    assert_eq!(buffer.capacity(), 16);
    assert_eq!(device.allocation_count(), 1);
    assert_eq!(device.copy_count(), 0);

    buffer.append(&mut device, &[2; 10]);
    assert_eq!(buffer.capacity(), 32);
    assert_eq!(device.allocation_count(), 2);
    assert_eq!(device.copy_count(), 1);
    // the old block is gone
    assert_eq!(device.buffer_count(), 1);

    let mut expected = vec![1; 10];
    expected.extend([2; 10]);
    assert_eq!(contents(&device, &buffer), expected);
}

#[test]
fn empty_keeps_the_allocation() {
    let mut device = HeadlessDevice::new();
    let mut buffer = GpuBuffer::new(&device, BufferTarget::Vertex, &test_config());
    buffer.append(&mut device, &payload(40));
    let handle = buffer.handle();
    let capacity = buffer.capacity();

    buffer.empty();
    assert!(buffer.is_empty());
    assert_eq!(buffer.handle(), handle);
    assert_eq!(buffer.capacity(), capacity);

    buffer.append(&mut device, &[9, 9, 9, 9]);
    assert_eq!(buffer.len(), 4);
    assert_eq!(device.allocation_count(), 1);
    assert_eq!(contents(&device, &buffer), vec![9, 9, 9, 9]);
}

#[test]
fn destroy_releases_the_allocation() {
    let mut device = HeadlessDevice::new();
    let mut buffer = GpuBuffer::new(&device, BufferTarget::Element, &test_config());
    buffer.append(&mut device, &payload(8));
    assert_eq!(device.buffer_count(), 1);

    buffer.destroy(&mut device);
    assert_eq!(device.buffer_count(), 0);
    assert!(buffer.handle().is_none());
    assert_eq!(buffer.len(), 0);
}

#[test]
fn unsupported_device_degrades_to_no_ops() {
    let caps = DeviceCaps {
        buffer_objects: false,
        ..DeviceCaps::default()
    };
    let mut device = HeadlessDevice::new().with_caps(caps);
    let mut vertices = VertexBuffer::new(&device, &test_config());

    vertices.append(&mut device, &[Vertex::new([0.0, 0.0, 0.0])]);
    assert_eq!(vertices.vertex_count(), 0);
    assert!(vertices.vertices().is_empty());
    assert!(!vertices.raw().is_supported());
    assert_eq!(device.allocation_count(), 0);
}

#[test]
#[should_panic(expected = "does not support buffer objects")]
fn unsupported_device_asserts_when_strict() {
    let caps = DeviceCaps {
        buffer_objects: false,
        ..DeviceCaps::default()
    };
    let device = HeadlessDevice::new().with_caps(caps);
    let config = test_config().with_strict_capabilities(true);
    let _ = GpuBuffer::new(&device, BufferTarget::Vertex, &config);
}

#[test]
fn vertex_buffer_keeps_a_host_copy() {
    let mut device = HeadlessDevice::new();
    let mut vertices = VertexBuffer::new(&device, &test_config());
    let first = Vertex::new([1.0, 2.0, 3.0]).with_tex_coords([0.5, 0.25]);
    let second = Vertex::new([4.0, 5.0, 6.0]).with_normal([0.0, 1.0, 0.0]);
    vertices.append(&mut device, &[first]);
    vertices.append(&mut device, &[second]);

    assert_eq!(vertices.vertex_count(), 2);
    assert_eq!(vertices.vertex(1), Some(second));
    assert_eq!(
        vertices.draw_range(),
        DrawRange::Sequential { first: 0, count: 2 }
    );
    let handle = vertices.raw().handle().expect("allocated");
    let bytes = &device.buffer_contents(handle).expect("live")[..2 * Vertex::STRIDE as usize];
    assert_eq!(bytes, bytemuck::cast_slice::<Vertex, u8>(&[first, second]));
}

#[test]
fn element_buffer_draws_its_indices() {
    let mut device = HeadlessDevice::new();
    let mut elements = ElementBuffer::new(&device, &test_config());
    assert_eq!(elements.draw_range(), None);

    elements.append(&mut device, &[0, 1, 2, 2, 3, 0]);
    let handle = elements.raw().handle().expect("allocated");
    assert_eq!(
        elements.draw_range(),
        Some(DrawRange::Elements {
            buffer: handle,
            count: 6
        })
    );
}
