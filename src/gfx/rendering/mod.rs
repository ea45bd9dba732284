// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Owns the swapchain, the in-flight frame slots and their synchronization,
//! and the per-frame command recording.

pub mod frame_renderer;
pub mod frame_sync;
pub mod surface;

// Re-export main types
pub use frame_renderer::{ActiveFrame, DrawConstants, DrawStats, FrameRenderer, FrameState};
pub use frame_sync::{FrameSynchronizer, GpuFence, QueueFence};
pub use surface::{select_present_mode, PresentationSurface, Viewport};
