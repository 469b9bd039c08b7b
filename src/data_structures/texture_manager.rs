//! Multi-texture attachments and textured program selection.
//!
//! A [`TextureManager`] belongs to one renderable. Its attachment order is the
//! texture unit order; removing an attachment only compacts the list. When the
//! renderable draws textured, [`TextureManager::bind`] resolves the shader
//! program for `(attachment count, blend mode)` and produces the per-layer
//! state (transform, flip, scale, alpha) the program consumes.

use cgmath::{Matrix4, vec3};

use crate::{
    device::TextureId,
    pipelines::{MAX_TEXTURE_LAYERS, ProgramId, ProgramTable},
};

/// How the texture layers of one draw are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Layers multiply with each other.
    #[default]
    Blend,
    /// Like `Blend`, but the topmost layer keeps its texel alpha where it is
    /// lower than the layer alpha, so its transparent texels cut through.
    Cull,
    /// Front-to-back alpha compositing.
    Layer,
}

impl BlendMode {
    pub const COUNT: usize = 3;
    pub const ALL: [BlendMode; Self::COUNT] = [BlendMode::Blend, BlendMode::Cull, BlendMode::Layer];

    pub fn index(self) -> usize {
        match self {
            BlendMode::Blend => 0,
            BlendMode::Cull => 1,
            BlendMode::Layer => 2,
        }
    }

    /// Value of the `mode` uniform read by the textured shader.
    pub fn shader_value(self) -> u32 {
        self.index() as u32
    }

    /// Whether layer `layer` of `count` takes `min(texel alpha, layer alpha)`
    /// instead of the plain layer alpha. Only the topmost culling layer does.
    pub fn cuts_with_texel_alpha(self, layer: usize, count: usize) -> bool {
        self == BlendMode::Cull && count > 1 && layer + 1 == count
    }
}

/// One texture attached to a renderable plus its coordinate state.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAttachment {
    handle: u32,
    texture: TextureId,
    /// Texture coordinate offset (s, t).
    pub translate: [f32; 2],
    /// Texture coordinate scale (s, t). Also the wrap boundary the shader uses
    /// to sample across the texture edge.
    pub scale: [f32; 2],
    /// Mirror the s and t coordinates.
    pub flip: [bool; 2],
    pub alpha: f32,
}

impl TextureAttachment {
    fn new(handle: u32, texture: TextureId) -> Self {
        Self {
            handle,
            texture,
            translate: [0.0, 0.0],
            scale: [1.0, 1.0],
            flip: [false, false],
            alpha: 1.0,
        }
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Texture coordinate transform, `translate * scale`.
    pub fn transform(&self) -> Matrix4<f32> {
        Matrix4::from_translation(vec3(self.translate[0], self.translate[1], 0.0))
            * Matrix4::from_nonuniform_scale(self.scale[0], self.scale[1], 1.0)
    }

    fn to_layer(&self) -> TextureLayer {
        TextureLayer {
            texture: self.texture,
            transform: self.transform().into(),
            flip: [f32::from(u8::from(self.flip[0])), f32::from(u8::from(self.flip[1]))],
            scale: self.scale,
            alpha: self.alpha.clamp(0.0, 1.0),
        }
    }
}

/// Per-layer state handed to the device with a textured draw.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureLayer {
    pub texture: TextureId,
    pub transform: [[f32; 4]; 4],
    pub flip: [f32; 2],
    pub scale: [f32; 2],
    pub alpha: f32,
}

/// Result of [`TextureManager::bind`]: the program to draw with and the layers
/// it samples, in texture unit order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub program: ProgramId,
    pub mode: BlendMode,
    /// `false` when the unlit single-texture fallback was selected.
    pub lit: bool,
    pub layers: Vec<TextureLayer>,
}

#[derive(Debug, Default, Clone)]
pub struct TextureManager {
    attachments: Vec<TextureAttachment>,
    next_handle: u32,
    mode: BlendMode,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `texture` on the next free texture unit. `None` once
    /// `max_units` (or [`MAX_TEXTURE_LAYERS`]) attachments exist.
    pub fn add(&mut self, texture: TextureId, max_units: usize) -> Option<u32> {
        let limit = max_units.min(MAX_TEXTURE_LAYERS);
        if self.attachments.len() >= limit {
            log::warn!(
                "cannot attach {texture:?}: all {limit} texture units are in use"
            );
            return None;
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.attachments.push(TextureAttachment::new(handle, texture));
        Some(handle)
    }

    pub fn remove(&mut self, handle: u32) -> Option<TextureAttachment> {
        let idx = self
            .attachments
            .iter()
            .position(|attachment| attachment.handle == handle)?;
        Some(self.attachments.remove(idx))
    }

    /// Drops every attachment that samples `texture`.
    pub fn detach_texture(&mut self, texture: TextureId) {
        self.attachments
            .retain(|attachment| attachment.texture != texture);
    }

    pub fn get(&self, handle: u32) -> Option<&TextureAttachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.handle == handle)
    }

    pub fn get_mut(&mut self, handle: u32) -> Option<&mut TextureAttachment> {
        self.attachments
            .iter_mut()
            .find(|attachment| attachment.handle == handle)
    }

    pub fn attachments(&self) -> &[TextureAttachment] {
        &self.attachments
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.mode = mode;
    }

    /// Selects the textured program for the current attachments.
    ///
    /// With lighting on, the lit program for `(len, mode)` is used when the
    /// device provides it. Otherwise the unlit single-texture program draws
    /// the first attachment only. `None` when nothing is attached or the
    /// device has no textured program at all.
    pub fn bind(&self, programs: &ProgramTable, lighting: bool) -> Option<TextureBinding> {
        let first = self.attachments.first()?;
        let count = self.attachments.len();
        if lighting {
            if let Some(program) = programs.textured(count, self.mode) {
                return Some(TextureBinding {
                    program,
                    mode: if count == 1 { BlendMode::Blend } else { self.mode },
                    lit: true,
                    layers: self.attachments.iter().map(TextureAttachment::to_layer).collect(),
                });
            }
        }
        let program = programs.textured_unlit()?;
        if count > 1 {
            log::debug!("no program for {count} lit layers, drawing the first layer unlit");
        }
        Some(TextureBinding {
            program,
            mode: BlendMode::Blend,
            lit: false,
            layers: vec![first.to_layer()],
        })
    }
}
