//! Shader programs and their dispatch table.
//!
//! [`ProgramKey`] names every program the core can ask for. The
//! [`ProgramTable`] resolves all of them once against a device and is then
//! consulted per draw: the texture manager picks a textured program by
//! `(layer count, blend mode)` and falls back to the unlit single-texture
//! program when the lit one is missing.
//!
//! The submodules hold the wgpu side: pipeline layouts and the pipeline cache
//! (`basic`), the pick target (`pick`), the multi-texture bind group
//! (`textured`) and the lighting uniform (`light`).

pub mod basic;
pub mod light;
pub mod pick;
pub mod textured;

use crate::{data_structures::texture_manager::BlendMode, device::GraphicsDevice};

/// Most texture layers a single draw can combine.
pub const MAX_TEXTURE_LAYERS: usize = 8;

/// Device-side handle of a resolved program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKey {
    /// Lit, uniform mesh colour.
    Shaded,
    /// Unlit, uniform colour. Wireframes, markers, highlights.
    Flat,
    /// Unlit, per-vertex colours from the colour buffer.
    VertexColor,
    /// Writes the per-vertex identifier codes untouched.
    Pick,
    /// Lit, `layers` textures combined with `mode`.
    Textured { layers: u8, mode: BlendMode },
    /// Unlit, single texture.
    TexturedUnlit,
}

/// Programs resolved for one device, built once per scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramTable {
    shaded: Option<ProgramId>,
    flat: Option<ProgramId>,
    vertex_color: Option<ProgramId>,
    pick: Option<ProgramId>,
    textured: [[Option<ProgramId>; BlendMode::COUNT]; MAX_TEXTURE_LAYERS],
    textured_unlit: Option<ProgramId>,
}

impl ProgramTable {
    pub fn build(device: &mut dyn GraphicsDevice) -> Self {
        let mut textured = [[None; BlendMode::COUNT]; MAX_TEXTURE_LAYERS];
        for (idx, row) in textured.iter_mut().enumerate() {
            let layers = idx + 1;
            for mode in BlendMode::ALL {
                // A single layer has nothing to blend with.
                let mode_key = if layers == 1 { BlendMode::Blend } else { mode };
                row[mode.index()] = device.program(ProgramKey::Textured {
                    layers: layers as u8,
                    mode: mode_key,
                });
            }
        }
        let table = Self {
            shaded: device.program(ProgramKey::Shaded),
            flat: device.program(ProgramKey::Flat),
            vertex_color: device.program(ProgramKey::VertexColor),
            pick: device.program(ProgramKey::Pick),
            textured,
            textured_unlit: device.program(ProgramKey::TexturedUnlit),
        };
        log::debug!(
            "program table built, {} textured programs available",
            table.textured.iter().flatten().flatten().count()
        );
        table
    }

    pub fn shaded(&self) -> Option<ProgramId> {
        self.shaded
    }

    pub fn flat(&self) -> Option<ProgramId> {
        self.flat
    }

    pub fn vertex_color(&self) -> Option<ProgramId> {
        self.vertex_color
    }

    pub fn pick(&self) -> Option<ProgramId> {
        self.pick
    }

    /// Lit program combining `layers` textures, if the device has one.
    pub fn textured(&self, layers: usize, mode: BlendMode) -> Option<ProgramId> {
        if layers == 0 {
            return None;
        }
        self.textured
            .get(layers - 1)
            .and_then(|row| row[mode.index()])
    }

    pub fn textured_unlit(&self) -> Option<ProgramId> {
        self.textured_unlit
    }
}
