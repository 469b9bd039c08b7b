//! Scene data: GPU buffers, scene objects, identifiers and textures.
//!
//! - `buffer` contains the growable GPU buffer and its typed vertex, colour and element wrappers
//! - `color_coder` hands out the identifier blocks used for colour-coded picking
//! - `renderable` holds the scene object variants and their draw strategies
//! - `texture` contains decoded images and the wgpu texture wrapper
//! - `texture_manager` tracks texture attachments and picks the textured program

pub mod buffer;
pub mod color_coder;
pub mod renderable;
pub mod texture;
pub mod texture_manager;
