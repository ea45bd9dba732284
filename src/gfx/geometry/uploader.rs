use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::{GeometryUploader, GpuGeometry, VertexBufferView};
use crate::error::UploadError;

/// Vertex buffer handle owned by a single mesh
pub type VertexBuffer = wgpu::Buffer;

/// Uploads position streams into mapped-at-creation vertex buffers
///
/// The data is copied once while the buffer is created and is never mapped
/// again. No queue work is involved, so uploading is safe at any point of a
/// frame.
pub struct WgpuUploader {
    device: Arc<wgpu::Device>,
}

impl WgpuUploader {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }
}

impl GeometryUploader for WgpuUploader {
    type Buffer = VertexBuffer;

    fn upload(
        &self,
        label: &str,
        positions: &[[f32; 3]],
    ) -> Result<GpuGeometry<VertexBuffer>, UploadError> {
        if positions.is_empty() {
            return Err(UploadError::Empty);
        }
        let vertex_count =
            u32::try_from(positions.len()).map_err(|_| UploadError::TooLarge(positions.len()))?;
        let view = VertexBufferView::for_positions(positions.len());
        if view.size > self.device.limits().max_buffer_size {
            return Err(UploadError::TooLarge(positions.len()));
        }

        // Allocation failures are reported asynchronously; scope them to this buffer
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(error) = out_of_memory.or(validation) {
            buffer.destroy();
            log::warn!("Vertex upload for '{}' failed: {}", label, error);
            return Err(UploadError::Allocation(error.to_string()));
        }

        log::debug!(
            "Uploaded '{}': {} vertices, {} bytes",
            label,
            vertex_count,
            view.size
        );

        Ok(GpuGeometry {
            buffer,
            view,
            vertex_count,
        })
    }
}
