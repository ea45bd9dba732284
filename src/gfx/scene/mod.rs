//! # Scene Management Module
//!
//! In-memory scene data: meshes and lights with transforms, plus the
//! selection state the editor works on.
//!
//! ## Key Components
//!
//! - [`SceneStore`] - Insertion-ordered meshes and lights with independent selections
//! - [`MeshEntity`] - A named, transformable mesh owning its vertex buffer
//! - [`LightEntity`] - A point light (position, color, intensity)
//! - [`Transform`] - Position, Euler rotation in degrees, and scale
//!
//! The store holds no synchronization logic. Removed meshes are handed back to
//! the caller, which retires their buffers once the GPU is done with them.

pub mod object;
pub mod scene;

// Re-export main types
pub use object::{LightEntity, MeshEntity, Transform};
pub use scene::SceneStore;
