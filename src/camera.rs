//! Camera uniform.
//!
//! Camera control belongs to the host; the core only forwards the matrices it
//! is given to the device once per frame.

use cgmath::SquareMatrix;

/// View-projection matrix and eye position as uploaded to the shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    // w is unused padding
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: cgmath::Matrix4::identity().into(),
            eye: [0.0, 0.0, 1.0, 1.0],
        }
    }

    pub fn update_view_proj(
        &mut self,
        view: cgmath::Matrix4<f32>,
        projection: cgmath::Matrix4<f32>,
        eye: cgmath::Point3<f32>,
    ) {
        self.view_proj = (projection * view).into();
        self.eye = [eye.x, eye.y, eye.z, 1.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}
