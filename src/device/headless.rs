//! Host-memory graphics device.
//!
//! [`HeadlessDevice`] implements [`GraphicsDevice`] without a GPU: buffers are
//! byte vectors, textures only keep their size, and the commands of the
//! current frame are recorded for inspection. The pick target is a sparse
//! pixel map the host fills with [`HeadlessDevice::set_pixel`]; unset pixels
//! read back as the background.

use std::collections::HashMap;

use crate::{
    data_structures::texture::TextureImage,
    device::{BufferHandle, BufferTarget, DeviceCaps, GraphicsDevice, TextureId},
    pipelines::{ProgramId, ProgramKey},
    render::{Command, DrawCall, Pass},
};

#[derive(Debug)]
struct HeadlessBuffer {
    target: BufferTarget,
    bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct HeadlessDevice {
    caps: DeviceCaps,
    lit_textures: bool,
    viewport: [u32; 2],
    buffers: HashMap<BufferHandle, HeadlessBuffer>,
    next_buffer: u32,
    textures: HashMap<TextureId, [u32; 2]>,
    next_texture: u32,
    programs: Vec<ProgramKey>,
    frame: Vec<Command>,
    pixels: HashMap<(u32, u32), [u8; 4]>,
    allocations: usize,
    copies: usize,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            caps: DeviceCaps::default(),
            lit_textures: true,
            viewport: [1024, 768],
            buffers: HashMap::new(),
            next_buffer: 0,
            textures: HashMap::new(),
            next_texture: 0,
            programs: Vec::new(),
            frame: Vec::new(),
            pixels: HashMap::new(),
            allocations: 0,
            copies: 0,
        }
    }

    pub fn with_caps(mut self, caps: DeviceCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Whether lit textured programs exist. Without them textured draws use
    /// the unlit single-texture program.
    pub fn with_lit_textures(mut self, available: bool) -> Self {
        self.lit_textures = available;
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = [width, height];
        self
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|buffer| buffer.bytes.as_slice())
    }

    pub fn buffer_target(&self, buffer: BufferHandle) -> Option<BufferTarget> {
        self.buffers.get(&buffer).map(|buffer| buffer.target)
    }

    /// Live buffer allocations.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Buffer allocations made so far, including destroyed ones.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    pub fn copy_count(&self) -> usize {
        self.copies
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn program_key(&self, program: ProgramId) -> Option<ProgramKey> {
        self.programs.get(program.0 as usize).copied()
    }

    /// Commands of the current frame.
    pub fn commands(&self) -> &[Command] {
        &self.frame
    }

    /// Returns and clears the recorded commands.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.frame)
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.frame.iter().filter_map(|command| match command {
            Command::Draw(call) => Some(call),
            _ => None,
        })
    }

    /// Draw calls recorded after the last `BeginPass(pass)`.
    pub fn draw_calls_in(&self, pass: Pass) -> Vec<&DrawCall> {
        let mut current = None;
        let mut calls = Vec::new();
        for command in &self.frame {
            match command {
                Command::BeginPass(begun) => current = Some(*begun),
                Command::Draw(call) if current == Some(pass) => calls.push(call),
                _ => {}
            }
        }
        calls
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.pixels.insert((x, y), rgba);
    }

    pub fn clear_pixels(&mut self) {
        self.pixels.clear();
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn create_buffer(&mut self, target: BufferTarget, size: u64) -> BufferHandle {
        self.next_buffer += 1;
        let handle = BufferHandle(self.next_buffer);
        self.buffers.insert(
            handle,
            HeadlessBuffer {
                target,
                bytes: vec![0; size as usize],
            },
        );
        self.allocations += 1;
        handle
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(buffer) = self.buffers.get_mut(&buffer) else {
            log::error!("write to unknown buffer {buffer:?}");
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.bytes.len() {
            log::error!(
                "write of {} bytes at {offset} overflows a {} byte buffer",
                data.len(),
                buffer.bytes.len()
            );
            return;
        }
        buffer.bytes[start..end].copy_from_slice(data);
    }

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        let Some(bytes) = self
            .buffers
            .get(&src)
            .and_then(|src| src.bytes.get(..size as usize))
            .map(<[u8]>::to_vec)
        else {
            log::error!("copy of {size} bytes from invalid source {src:?}");
            return;
        };
        self.write_buffer(dst, 0, &bytes);
        self.copies += 1;
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            log::error!("destroying unknown buffer {buffer:?}");
        }
    }

    fn create_texture(&mut self, image: &TextureImage) -> anyhow::Result<TextureId> {
        self.next_texture += 1;
        let texture = TextureId(self.next_texture);
        self.textures
            .insert(texture, [image.width(), image.height()]);
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn program(&mut self, key: ProgramKey) -> Option<ProgramId> {
        let available = match key {
            ProgramKey::Textured { layers, .. } => {
                self.lit_textures && usize::from(layers) <= self.caps.max_texture_units
            }
            ProgramKey::TexturedUnlit => self.caps.max_texture_units > 0,
            _ => true,
        };
        if !available {
            return None;
        }
        let idx = match self.programs.iter().position(|known| *known == key) {
            Some(idx) => idx,
            None => {
                self.programs.push(key);
                self.programs.len() - 1
            }
        };
        Some(ProgramId(idx as u32))
    }

    fn record(&mut self, command: Command) {
        // a camera upload after a colour pass starts the next frame
        if matches!(command, Command::SetCamera(_))
            && self
                .frame
                .iter()
                .any(|recorded| matches!(recorded, Command::BeginPass(Pass::Color)))
        {
            self.frame.clear();
        }
        self.frame.push(command);
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.viewport[0] || y >= self.viewport[1] {
            return None;
        }
        Some(self.pixels.get(&(x, y)).copied().unwrap_or([0; 4]))
    }
}
