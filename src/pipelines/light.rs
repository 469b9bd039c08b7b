use wgpu::util::DeviceExt;

/// Number of light sources the shaders evaluate.
pub const MAX_LIGHTS: usize = 8;

/// One light source. `position.w == 0` makes it directional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub enabled: bool,
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl Default for Light {
    fn default() -> Self {
        Self {
            enabled: false,
            position: [0.0, 0.0, 1.0, 0.0],
            ambient: [0.0, 0.0, 0.0, 1.0],
            diffuse: [1.0, 1.0, 1.0, 1.0],
            specular: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Shared lighting state of a scene. Uploaded once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub enabled: bool,
    pub global_ambient: [f32; 4],
    lights: [Light; MAX_LIGHTS],
}

impl Default for Lighting {
    fn default() -> Self {
        let mut lights = [Light::default(); MAX_LIGHTS];
        // head light
        lights[0].enabled = true;
        lights[0].specular = [0.3, 0.3, 0.3, 1.0];
        Self {
            enabled: true,
            global_ambient: [0.2, 0.2, 0.2, 1.0],
            lights,
        }
    }
}

impl Lighting {
    pub fn light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    pub fn active_lights(&self) -> usize {
        self.lights.iter().filter(|light| light.enabled).count()
    }

    pub fn to_uniform(&self) -> LightingUniform {
        let mut uniform = LightingUniform::zeroed_default();
        for (idx, light) in self.lights.iter().enumerate() {
            uniform.lights[idx] = LightRaw {
                position: light.position,
                ambient: light.ambient,
                diffuse: light.diffuse,
                specular: light.specular,
            };
            uniform.switches[idx / 4][idx % 4] = if light.enabled { 1.0 } else { 0.0 };
        }
        uniform.global_ambient = self.global_ambient;
        uniform.enabled = [u32::from(self.enabled), 0, 0, 0];
        uniform
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

/// GPU layout of [`Lighting`]. Uniform arrays need 16 byte strides, hence the
/// eight on/off switches packed into two `vec4`s.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub lights: [LightRaw; MAX_LIGHTS],
    pub switches: [[f32; 4]; 2],
    pub global_ambient: [f32; 4],
    pub enabled: [u32; 4],
}

impl LightingUniform {
    fn zeroed_default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

pub fn mk_buffer(device: &wgpu::Device, uniform: LightingUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lighting Buffer"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}
