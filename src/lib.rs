// src/lib.rs
//! ggine
//!
//! An interactive 3D scene viewer/editor built on wgpu and winit. The core is
//! a double-buffered frame loop in which scene edits on the CPU and rendering
//! on the GPU never race: every frame slot is reused only after the GPU has
//! signalled completion of its previous frame.

pub mod app;
pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod performance;
pub mod ui;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::GgineApp;
pub use config::EngineConfig;
pub use engine::Engine;

/// Runs the editor with configuration taken from the environment
pub fn run() -> anyhow::Result<()> {
    GgineApp::new(EngineConfig::from_env())?.run()
}
