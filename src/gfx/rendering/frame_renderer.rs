//! Per-frame command recording
//!
//! A frame moves through `Idle → Recording → Submitted → Presented → Idle`.
//! [`FrameRenderer::begin_frame`] acquires a back buffer and waits for the
//! matching slot to retire, [`FrameRenderer::record_scene`] encodes the scene
//! pass, and [`FrameRenderer::end_frame`] submits, signals and presents.

use std::sync::Arc;

use log::warn;

use super::{
    frame_sync::{FrameSynchronizer, GpuFence},
    surface::PresentationSurface,
};
use crate::{
    config::FRAME_COUNT,
    error::{EngineError, FrameError},
    gfx::{
        camera::{camera_utils, CameraState},
        geometry::{position_layout, VertexBuffer},
        resources::DepthTexture,
        scene::SceneStore,
    },
    wgpu_utils::{uniform_dynamic, DynamicUniformBuffer},
};

/// Where the renderer is in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recording,
    Submitted,
    Presented,
}

impl FrameState {
    /// The only state reachable from `self`
    pub fn successor(self) -> FrameState {
        match self {
            FrameState::Idle => FrameState::Recording,
            FrameState::Recording => FrameState::Submitted,
            FrameState::Submitted => FrameState::Presented,
            FrameState::Presented => FrameState::Idle,
        }
    }

    pub fn transition(self, to: FrameState) -> Result<FrameState, FrameError> {
        if self.successor() == to {
            Ok(to)
        } else {
            Err(FrameError::Transition { from: self, to })
        }
    }
}

/// Per-draw constant: the combined model-view-projection matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawConstants {
    pub mvp: [[f32; 4]; 4],
}

/// Draw counts of the last recorded frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: u32,
    /// Meshes skipped because the slot's constant buffer was full
    pub dropped: u32,
}

/// Resources reused every `FRAME_COUNT` frames
struct FrameSlot {
    constants: DynamicUniformBuffer<DrawConstants>,
    bind_group: wgpu::BindGroup,
}

impl FrameSlot {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        index: usize,
        max_draws: u32,
    ) -> Self {
        let constants = DynamicUniformBuffer::new(device, max_draws, &format!("frame slot {}", index));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Frame Slot {} Bind Group", index)),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: constants.binding_resource(),
            }],
        });
        Self {
            constants,
            bind_group,
        }
    }
}

/// A frame between [`FrameRenderer::begin_frame`] and [`FrameRenderer::end_frame`]
///
/// Overlays may record into `encoder` targeting `view` before the frame ends.
pub struct ActiveFrame {
    slot: usize,
    surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl ActiveFrame {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

pub struct FrameRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::RenderPipeline,
    slots: [FrameSlot; FRAME_COUNT],
    state: FrameState,
    clear_color: wgpu::Color,
    last_stats: DrawStats,
}

impl FrameRenderer {
    /// Builds the scene pipeline and the per-slot constant buffers
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
        max_draws_per_frame: u32,
        clear_color: [f64; 4],
    ) -> Result<Self, EngineError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Constants Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: uniform_dynamic(std::mem::size_of::<DrawConstants>() as u64),
                count: None,
            }],
        });
        let pipeline = Self::create_pipeline(&device, &bind_group_layout, surface_format);

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(EngineError::Pipeline(err.to_string()));
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let slots = std::array::from_fn(|index| {
            FrameSlot::new(&device, &bind_group_layout, index, max_draws_per_frame)
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(EngineError::FrameSlots(err.to_string()));
        }

        let [r, g, b, a] = clear_color;
        Ok(Self {
            device,
            queue,
            pipeline,
            slots,
            state: FrameState::Idle,
            clear_color: wgpu::Color { r, g, b, a },
            last_stats: DrawStats::default(),
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[position_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Acquires a back buffer and claims its frame slot
    ///
    /// Blocks on the swapchain's frame-latency limit, then on the slot's
    /// fence. `Ok(None)` means no back buffer was available and the frame is
    /// skipped; the renderer stays idle.
    pub fn begin_frame<F: GpuFence>(
        &mut self,
        surface: &mut PresentationSurface,
        sync: &mut FrameSynchronizer<F>,
    ) -> Result<Option<ActiveFrame>, FrameError> {
        let next = self.state.transition(FrameState::Recording)?;

        let Some(surface_texture) = surface.acquire()? else {
            return Ok(None);
        };
        let slot = surface.back_buffer_index();

        // Slot resources are only touched once its previous frame retired
        sync.begin_frame(slot)?;

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("Frame Encoder (slot {})", slot)),
            });

        self.state = next;
        Ok(Some(ActiveFrame {
            slot,
            surface_texture,
            view,
            encoder,
        }))
    }

    /// Records the scene pass: clear, then one draw per drawable mesh
    ///
    /// Every draw gets its own entry in the slot's constant buffer. Meshes
    /// beyond the buffer's capacity are dropped for this frame.
    pub fn record_scene(
        &mut self,
        frame: &mut ActiveFrame,
        surface: &PresentationSurface,
        scene: &SceneStore<VertexBuffer>,
        camera: &CameraState,
    ) -> Result<DrawStats, FrameError> {
        if self.state != FrameState::Recording {
            return Err(FrameError::Transition {
                from: self.state,
                to: FrameState::Recording,
            });
        }

        let viewport = surface.viewport();
        let view_proj = camera.build_view_projection_matrix(viewport.width, viewport.height);
        let slot = &mut self.slots[frame.slot];
        slot.constants.clear();

        let mut stats = DrawStats::default();
        for mesh in scene.meshes().iter().filter(|m| m.is_drawable()) {
            let mvp = view_proj * camera_utils::model_matrix(&mesh.transform);
            let constants = DrawConstants {
                mvp: camera_utils::convert_matrix4_to_array(mvp),
            };
            match slot.constants.push(&constants) {
                Some(_) => stats.drawn += 1,
                None => stats.dropped += 1,
            }
        }
        slot.constants.flush(&self.queue);

        if stats.dropped > 0 {
            warn!(
                "Constant buffer full: dropped {} of {} draws",
                stats.dropped,
                stats.drawn + stats.dropped
            );
        }

        {
            let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: surface.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_viewport(
                0.0,
                0.0,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_scissor_rect(0, 0, viewport.width, viewport.height);
            render_pass.set_pipeline(&self.pipeline);

            // Same order and filter as staging, so entry i belongs to draw i
            let stride = slot.constants.stride();
            let drawable = scene.meshes().iter().filter(|m| m.is_drawable());
            for (index, mesh) in drawable.take(stats.drawn as usize).enumerate() {
                let offset = (index as u64 * stride) as u32;
                render_pass.set_bind_group(0, &slot.bind_group, &[offset]);
                render_pass.set_vertex_buffer(0, mesh.buffer().slice(..));
                render_pass.draw(0..mesh.vertex_count(), 0..1);
            }
        }

        self.last_stats = stats;
        Ok(stats)
    }

    /// Submits the frame, signals its slot's fence value and presents
    pub fn end_frame<F: GpuFence>(
        &mut self,
        frame: ActiveFrame,
        surface: &mut PresentationSurface,
        sync: &mut FrameSynchronizer<F>,
    ) -> Result<(), FrameError> {
        let ActiveFrame {
            slot,
            surface_texture,
            encoder,
            ..
        } = frame;

        self.state = self.state.transition(FrameState::Submitted)?;
        self.queue.submit(std::iter::once(encoder.finish()));
        sync.end_frame(slot);

        self.state = self.state.transition(FrameState::Presented)?;
        surface.present(surface_texture);

        self.state = self.state.transition(FrameState::Idle)?;
        Ok(())
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn last_stats(&self) -> DrawStats {
        self.last_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_returns_to_idle() {
        let mut state = FrameState::Idle;
        for to in [
            FrameState::Recording,
            FrameState::Submitted,
            FrameState::Presented,
            FrameState::Idle,
        ] {
            state = state.transition(to).unwrap();
        }
        assert_eq!(state, FrameState::Idle);
    }

    #[test]
    fn test_cannot_skip_submission() {
        let err = FrameState::Recording
            .transition(FrameState::Presented)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transition {
                from: FrameState::Recording,
                to: FrameState::Presented
            }
        ));
    }

    #[test]
    fn test_cannot_begin_twice() {
        assert!(FrameState::Recording
            .transition(FrameState::Recording)
            .is_err());
        assert!(FrameState::Submitted.transition(FrameState::Idle).is_err());
    }

    #[test]
    fn test_draw_constants_layout() {
        assert_eq!(std::mem::size_of::<DrawConstants>(), 64);
    }
}
