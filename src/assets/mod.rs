//! Asset discovery and loading
//!
//! [`AssetLibrary`] lists the `.obj` files in the asset folder; [`obj`] turns
//! one of them into a vertex stream ready for upload.

pub mod library;
pub mod obj;

pub use library::{scan_obj_files, AssetLibrary};
pub use obj::{load_obj_positions, parse_obj};
