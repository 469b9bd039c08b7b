use airframe_gfx::{
    device::{BufferHandle, BufferTarget},
    render::{Bindings, Primitive, lower_primitive},
};

#[test]
fn quads_become_two_triangles_each() {
    assert_eq!(
        lower_primitive(Primitive::Quads, None, 0, 8),
        Some(vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7])
    );
    // through an element buffer
    assert_eq!(
        lower_primitive(Primitive::Quads, Some(&[9, 8, 7, 6]), 0, 4),
        Some(vec![9, 8, 7, 9, 7, 6])
    );
    // sequential draws start at `first`
    assert_eq!(
        lower_primitive(Primitive::Quads, None, 4, 4),
        Some(vec![4, 5, 6, 4, 6, 7])
    );
}

#[test]
fn incomplete_quads_are_dropped() {
    assert_eq!(
        lower_primitive(Primitive::Quads, None, 0, 7),
        Some(vec![0, 1, 2, 0, 2, 3])
    );
    assert_eq!(lower_primitive(Primitive::Quads, None, 0, 3), Some(vec![]));
    // only the first `count` element indices are used
    assert_eq!(
        lower_primitive(Primitive::Quads, Some(&[0, 1, 2, 3, 4, 5]), 0, 4),
        Some(vec![0, 1, 2, 0, 2, 3])
    );
}

#[test]
fn line_loops_close_on_their_first_vertex() {
    assert_eq!(
        lower_primitive(Primitive::LineLoop, None, 2, 3),
        Some(vec![2, 3, 4, 2])
    );
    assert_eq!(
        lower_primitive(Primitive::LineLoop, Some(&[5, 1, 3]), 0, 3),
        Some(vec![5, 1, 3, 5])
    );
    assert_eq!(lower_primitive(Primitive::LineLoop, None, 0, 0), Some(vec![]));
}

#[test]
fn native_primitives_are_not_lowered() {
    for primitive in [
        Primitive::Points,
        Primitive::Lines,
        Primitive::LineStrip,
        Primitive::Triangles,
    ] {
        assert_eq!(lower_primitive(primitive, None, 0, 6), None);
    }
    assert_eq!(Primitive::Quads.lowered(), Primitive::Triangles);
    assert_eq!(Primitive::LineLoop.lowered(), Primitive::LineStrip);
}

#[test]
fn bindings_track_one_buffer_per_target() {
    let mut bindings = Bindings::new();
    bindings.bind(BufferTarget::Vertex, BufferHandle(1), 48);
    bindings.bind(BufferTarget::Element, BufferHandle(2), 24);
    assert!(bindings.is_bound(BufferTarget::Vertex));
    assert!(!bindings.is_bound(BufferTarget::Color));
    assert_eq!(
        bindings.get(BufferTarget::Element).map(|bound| bound.len),
        Some(24)
    );

    bindings.unbind(BufferTarget::Vertex);
    bindings.bind(BufferTarget::Vertex, BufferHandle(3), 12);
    assert_eq!(
        bindings.get(BufferTarget::Vertex).map(|bound| bound.handle),
        Some(BufferHandle(3))
    );

    bindings.clear();
    assert!(!bindings.is_bound(BufferTarget::Vertex));
    assert!(!bindings.is_bound(BufferTarget::Element));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "already bound")]
fn binding_an_occupied_target_panics_in_debug_builds() {
    let mut bindings = Bindings::new();
    bindings.bind(BufferTarget::Color, BufferHandle(1), 4);
    bindings.bind(BufferTarget::Color, BufferHandle(2), 4);
}
