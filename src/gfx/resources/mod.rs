// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Size-dependent render targets owned by the presentation surface.

pub mod texture_resource;

// Re-export main types
pub use texture_resource::DepthTexture;
