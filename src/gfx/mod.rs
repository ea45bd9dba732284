//! # Graphics Module
//!
//! GPU-facing half of the editor: camera math, geometry upload, scene data,
//! and the double-buffered frame loop.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Yaw/pitch fly camera driven by an input snapshot
//! - **Geometry** ([`geometry`]) - Position streams and their upload into vertex buffers
//! - **Scene Management** ([`scene`]) - Meshes, lights and selection
//! - **Rendering** ([`rendering`]) - Swapchain, frame slots, fence synchronization, recording
//! - **Resources** ([`resources`]) - Surface-sized render targets
//!
//! ## Frame lifecycle
//!
//! ```text
//! acquire back buffer ─► wait slot fence ─► record ─► submit ─► signal ─► present
//! ```
//!
//! The CPU may record frame *k+1* while the GPU executes frame *k*; a slot is
//! never rewritten before its previous fence value has completed.

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::{CameraController, CameraState, InputSnapshot};
pub use rendering::{FrameRenderer, FrameSynchronizer, PresentationSurface};
pub use scene::SceneStore;
