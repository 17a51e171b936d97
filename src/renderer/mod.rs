//! Render-side data packing
//!
//! The scene itself is drawn by the page; the crate only hands it entity
//! updates and one packed uniform block per frame.

pub mod uniforms;

pub use uniforms::FrameUniforms;
