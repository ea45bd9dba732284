// src/wgpu_utils/uniform_buffer.rs - Per-draw uniform entries with dynamic offsets
use std::{marker::PhantomData, num::NonZeroU64};

/// Rounds `size` up to the next multiple of `alignment` (a power of two)
pub fn align_to(size: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// Uniform buffer holding `capacity` copies of `Content`, each at its own
/// aligned offset, bound with a dynamic offset per draw
///
/// Entries are written into a CPU staging area and uploaded with a single
/// `write_buffer` per frame. The staging area is allocated once.
pub struct DynamicUniformBuffer<Content> {
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
    stride: u64,
    capacity: u32,
    len: u32,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> DynamicUniformBuffer<Content> {
    fn name() -> &'static str {
        let type_name = std::any::type_name::<Content>();
        let pos = type_name.rfind(':').unwrap_or(0);
        if pos > 0 {
            &type_name[(pos + 1)..]
        } else {
            type_name
        }
    }

    /// Distance in bytes between consecutive entries on this device
    ///
    /// Never below 256 bytes, the constant-buffer alignment the engine
    /// standardizes on, even when the device would accept less.
    pub fn entry_stride(device: &wgpu::Device) -> u64 {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment).max(256);
        align_to(std::mem::size_of::<Content>() as u64, alignment)
    }

    /// Create a buffer with room for `capacity` entries
    pub fn new(device: &wgpu::Device, capacity: u32, label: &str) -> Self {
        let stride = Self::entry_stride(device);
        let size = stride * u64::from(capacity.max(1));

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("DynamicUniformBuffer<{}>: {}", Self::name(), label)),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        DynamicUniformBuffer {
            buffer,
            staging: vec![0; size as usize],
            stride,
            capacity: capacity.max(1),
            len: 0,
            content_type: PhantomData,
        }
    }

    /// Forget all staged entries; capacity is kept
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Stage one entry and return its dynamic offset
    ///
    /// Returns `None` once the buffer is full.
    pub fn push(&mut self, content: &Content) -> Option<u32> {
        if self.len >= self.capacity {
            return None;
        }
        let start = (u64::from(self.len) * self.stride) as usize;
        let bytes = bytemuck::bytes_of(content);
        self.staging[start..start + bytes.len()].copy_from_slice(bytes);
        self.len += 1;
        u32::try_from(start).ok()
    }

    /// Upload every staged entry
    pub fn flush(&self, queue: &wgpu::Queue) {
        if self.len == 0 {
            return;
        }
        let used = (u64::from(self.len) * self.stride) as usize;
        queue.write_buffer(&self.buffer, 0, &self.staging[..used]);
    }

    /// Binding covering exactly one entry; the dynamic offset selects which
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(std::mem::size_of::<Content>() as u64),
        })
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_pads_to_256() {
        let matrix = std::mem::size_of::<[[f32; 4]; 4]>() as u64;
        assert_eq!(matrix, 64);
        assert_eq!(align_to(matrix, 256), 256);
    }

    #[test]
    fn test_align_to_exact_multiple() {
        assert_eq!(align_to(512, 256), 512);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(0, 256), 0);
    }
}
