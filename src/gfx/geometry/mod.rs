//! # Geometry upload
//!
//! Turns position streams into GPU vertex buffers.
//!
//! The pipeline consumes positions only (`Float32x3`, 12-byte stride), drawn
//! non-indexed. Indexed sources such as the procedural cube or a parsed OBJ
//! file are flattened with [`GeometryData::expand`] before upload.
//!
//! Uploading goes through the [`GeometryUploader`] trait so the scene store
//! can be driven without a device; [`WgpuUploader`] is the real implementation.

pub mod primitives;
pub mod uploader;

pub use primitives::*;
pub use uploader::{VertexBuffer, WgpuUploader};

use crate::error::UploadError;

/// Bytes per vertex: three `f32` position components
pub const POSITION_STRIDE: u64 = std::mem::size_of::<[f32; 3]>() as u64;

/// Indexed triangle geometry, positions only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Triangle indices, 0-based, three per triangle
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Resolves indices into a non-indexed vertex stream
    ///
    /// Triangles referencing a missing vertex are dropped whole, as is a
    /// trailing partial triangle.
    pub fn expand(&self) -> Vec<[f32; 3]> {
        let mut stream = Vec::with_capacity(self.indices.len());
        for tri in self.indices.chunks_exact(3) {
            let corners = [
                self.vertices.get(tri[0] as usize),
                self.vertices.get(tri[1] as usize),
                self.vertices.get(tri[2] as usize),
            ];
            if let [Some(a), Some(b), Some(c)] = corners {
                stream.extend_from_slice(&[*a, *b, *c]);
            }
        }
        stream
    }
}

/// Stride and size of an uploaded vertex buffer, fixed at upload time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferView {
    pub stride: u64,
    pub size: u64,
}

impl VertexBufferView {
    pub fn for_positions(count: usize) -> Self {
        Self {
            stride: POSITION_STRIDE,
            size: count as u64 * POSITION_STRIDE,
        }
    }
}

/// A GPU-resident vertex stream with its layout
#[derive(Debug)]
pub struct GpuGeometry<B> {
    pub buffer: B,
    pub view: VertexBufferView,
    pub vertex_count: u32,
}

/// Creates write-once vertex buffers from position streams
///
/// An upload either returns a complete [`GpuGeometry`] or an error; callers
/// rely on this to keep scene edits all-or-nothing.
pub trait GeometryUploader {
    type Buffer;

    fn upload(
        &self,
        label: &str,
        positions: &[[f32; 3]],
    ) -> Result<GpuGeometry<Self::Buffer>, UploadError>;
}

/// Vertex buffer layout matching [`POSITION_STRIDE`], shader location 0
pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    wgpu::VertexBufferLayout {
        array_stride: POSITION_STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_view_size() {
        let view = VertexBufferView::for_positions(cube_vertices().len());
        assert_eq!(view.stride, 12);
        assert_eq!(view.size, 36 * 12);
    }

    #[test]
    fn test_expand_drops_out_of_range_triangles() {
        let data = GeometryData {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2, 0, 2, 7, 1, 2],
        };

        let stream = data.expand();

        assert_eq!(stream, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }
}
