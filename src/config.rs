//! Engine configuration.
//!
//! [`Config`] is handed to [`crate::scene::Scene::new`] and to the wgpu
//! [`crate::context::Context`]. Every field has a sensible default so hosts
//! usually only touch the colours.

use crate::logging::LoggingConfig;

/// Growth step of GPU buffers (1 MiB).
pub const DEFAULT_BUFFER_INCREMENT: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Buffers grow in multiples of this many bytes. Always a multiple of 4.
    pub buffer_increment: u64,
    /// Assert when a buffer is constructed on a device without buffer
    /// objects. When `false` the buffer only logs a warning and every
    /// operation on it is a no-op.
    pub strict_capabilities: bool,
    /// Global lighting switch. Textured meshes use the unlit single-texture
    /// program while this is off.
    pub lighting: bool,
    pub clear_colour: wgpu::Color,
    /// Colour used for picked vertices and picked geometry.
    pub highlight_colour: [f32; 4],
    /// Install `env_logger` when a scene is created. Off by default so hosts
    /// keep their own logger.
    pub install_logger: bool,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_increment: DEFAULT_BUFFER_INCREMENT,
            strict_capabilities: cfg!(debug_assertions),
            lighting: true,
            clear_colour: wgpu::Color::WHITE,
            highlight_colour: [1.0, 1.0, 0.0, 1.0],
            install_logger: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn with_buffer_increment(mut self, bytes: u64) -> Self {
        // wgpu copies and writes in 4 byte units
        self.buffer_increment = bytes.max(4).next_multiple_of(4);
        self
    }

    pub fn with_strict_capabilities(mut self, strict: bool) -> Self {
        self.strict_capabilities = strict;
        self
    }

    pub fn with_lighting(mut self, lighting: bool) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_clear_colour(mut self, colour: wgpu::Color) -> Self {
        self.clear_colour = colour;
        self
    }

    pub fn with_highlight_colour(mut self, colour: [f32; 4]) -> Self {
        self.highlight_colour = colour;
        self
    }

    /// Lets [`crate::scene::Scene::new`] install `env_logger` with `logging`.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.install_logger = true;
        self.logging = logging;
        self
    }

    /// Background as `f32` RGBA, used to fill the solid pass of
    /// wire-frame-solid meshes.
    pub fn background(&self) -> [f32; 4] {
        [
            self.clear_colour.r as f32,
            self.clear_colour.g as f32,
            self.clear_colour.b as f32,
            self.clear_colour.a as f32,
        ]
    }
}
