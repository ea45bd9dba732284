//! # User Interface Module
//!
//! Dear ImGui overlay for the editor.
//!
//! ## Key Components
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu
//! - [`Editor`] - Tools, hierarchy, inspector and asset panels
//! - [`EditorCommand`] - Structural edits requested by the panels
//!
//! ## Input Handling
//!
//! Window events reach the UI first. When ImGui wants the mouse or keyboard
//! the flags are copied into the camera's input snapshot, so camera control
//! pauses while a widget is active.

pub mod editor;
pub mod manager;

// Re-export main types
pub use editor::{Editor, EditorCommand, EditorView, PresentStatus};
pub use manager::UiManager;
