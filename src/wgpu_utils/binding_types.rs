// src/wgpu_utils/binding_types.rs
//! WGPU binding type utilities

use std::num::NonZeroU64;

/// Uniform binding addressed with a per-draw dynamic offset
pub fn uniform_dynamic(min_binding_size: u64) -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: true,
        min_binding_size: NonZeroU64::new(min_binding_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_uniform_binding() {
        match uniform_dynamic(64) {
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size,
            } => {
                assert!(has_dynamic_offset);
                assert_eq!(min_binding_size.map(NonZeroU64::get), Some(64));
            }
            other => panic!("unexpected binding type {:?}", other),
        }
    }
}
