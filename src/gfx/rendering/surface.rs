//! Device, swapchain and depth-target ownership
//!
//! [`PresentationSurface`] is the only owner of the swapchain images and the
//! depth buffer. Anything that destroys them (resize, present-mode changes)
//! first drains the GPU through the [`FrameSynchronizer`].

use std::sync::Arc;

use log::{debug, info, warn};
use winit::window::Window;

use super::frame_sync::{FrameSynchronizer, GpuFence};
use crate::{
    config::{EngineConfig, FRAME_COUNT},
    error::{EngineError, FrameError},
    gfx::resources::DepthTexture,
};

/// Picks a present mode for the requested sync behavior
///
/// Vsync always presents with `Fifo`. Without vsync, tearing (`Immediate`) is
/// used only when requested and supported; otherwise `Mailbox` is preferred
/// over `Fifo`.
pub fn select_present_mode(
    vsync: bool,
    tearing_requested: bool,
    supported: &[wgpu::PresentMode],
) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    if tearing_requested && supported.contains(&wgpu::PresentMode::Immediate) {
        return wgpu::PresentMode::Immediate;
    }
    if supported.contains(&wgpu::PresentMode::Mailbox) {
        wgpu::PresentMode::Mailbox
    } else {
        wgpu::PresentMode::Fifo
    }
}

/// A zero-sized dimension means the window is minimized; nothing is touched
pub fn resize_applies(width: u32, height: u32) -> bool {
    width != 0 && height != 0
}

/// Back buffer following `index` in the rotation
pub fn next_back_buffer(index: usize) -> usize {
    (index + 1) % FRAME_COUNT
}

/// Rectangle every frame's viewport and scissor are set to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

pub struct PresentationSurface {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,
    depth: DepthTexture,
    viewport: Viewport,
    back_buffer_index: usize,
    vsync: bool,
    tearing_requested: bool,
}

impl PresentationSurface {
    /// Creates the device and a swapchain of [`FRAME_COUNT`] images for `window`
    ///
    /// Any failure here is fatal; no partially initialized surface escapes.
    pub async fn new(window: Arc<Window>, config: &EngineConfig) -> Result<Self, EngineError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let adapter_info = adapter.get_info();
        info!(
            "Using adapter '{}' ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ggine device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(EngineError::NoSurfaceFormat)?;
        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let width = if size.width > 0 { size.width } else { config.width };
        let height = if size.height > 0 { size.height } else { config.height };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: select_present_mode(
                config.vsync,
                config.allow_tearing,
                &capabilities.present_modes,
            ),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: FRAME_COUNT as u32,
        };

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        surface.configure(&device, &surface_config);
        let depth = DepthTexture::create_depth_texture(&device, &surface_config, "depth_texture");
        if let Some(err) = device.pop_error_scope().await {
            return Err(EngineError::SurfaceResources(err.to_string()));
        }

        let tearing_supported = capabilities
            .present_modes
            .contains(&wgpu::PresentMode::Immediate);
        info!(
            "Surface {}x{} {:?}, present mode {:?} (tearing {})",
            surface_config.width,
            surface_config.height,
            format,
            surface_config.present_mode,
            if tearing_supported { "supported" } else { "unsupported" }
        );

        Ok(Self {
            surface,
            device,
            queue,
            viewport: Viewport {
                width: surface_config.width,
                height: surface_config.height,
            },
            config: surface_config,
            present_modes: capabilities.present_modes,
            depth,
            back_buffer_index: 0,
            vsync: config.vsync,
            tearing_requested: config.allow_tearing,
        })
    }

    /// Waits for the next back buffer, bounded by the frame-latency limit
    ///
    /// `Ok(None)` means the frame should be skipped: the wait timed out or the
    /// swapchain had to be reconfigured.
    pub fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>, FrameError> {
        match self.surface.get_current_texture() {
            Ok(texture) => {
                if texture.suboptimal {
                    debug!("Acquired suboptimal back buffer");
                }
                Ok(Some(texture))
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out waiting for a back buffer, skipping frame");
                Ok(None)
            }
            Err(err @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                warn!("Surface {}, reconfiguring", err);
                self.surface.configure(&self.device, &self.config);
                self.back_buffer_index = 0;
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(FrameError::OutOfMemory),
            Err(err) => {
                warn!("Failed to acquire back buffer: {}", err);
                Ok(None)
            }
        }
    }

    /// Queues `texture` for display and rotates to the next back buffer
    pub fn present(&mut self, texture: wgpu::SurfaceTexture) {
        texture.present();
        self.back_buffer_index = next_back_buffer(self.back_buffer_index);
    }

    /// Resizes the swapchain and depth buffer
    ///
    /// A zero dimension is ignored. Otherwise the GPU is drained first, since
    /// the old back buffers and depth target may still be read by in-flight
    /// frames. On failure the previous size is kept. Returns whether the
    /// surface now has the requested size.
    pub fn resize<F: GpuFence>(
        &mut self,
        width: u32,
        height: u32,
        sync: &mut FrameSynchronizer<F>,
    ) -> bool {
        if !resize_applies(width, height) {
            return false;
        }
        if (width, height) == (self.config.width, self.config.height) {
            return true;
        }

        if let Err(err) = sync.wait_for_idle() {
            warn!("Resize to {}x{} skipped, GPU did not idle: {}", width, height, err);
            return false;
        }

        let previous = self.config.clone();
        self.config.width = width;
        self.config.height = height;

        if let Err(err) = self.reconfigure() {
            warn!("Resize to {}x{} failed, keeping {}x{}: {}", width, height, previous.width, previous.height, err);
            self.config = previous;
            if let Err(err) = self.reconfigure() {
                warn!("Restoring previous surface configuration failed: {}", err);
            }
            return false;
        }

        info!("Resized surface to {}x{}", width, height);
        true
    }

    /// Switches vsync on or off, reconfiguring the swapchain
    pub fn set_vsync<F: GpuFence>(&mut self, vsync: bool, sync: &mut FrameSynchronizer<F>) {
        self.vsync = vsync;
        self.apply_present_mode(sync);
    }

    /// Requests tearing for when vsync is off; ignored if unsupported
    pub fn set_tearing<F: GpuFence>(&mut self, requested: bool, sync: &mut FrameSynchronizer<F>) {
        self.tearing_requested = requested;
        self.apply_present_mode(sync);
    }

    fn apply_present_mode<F: GpuFence>(&mut self, sync: &mut FrameSynchronizer<F>) {
        let mode = select_present_mode(self.vsync, self.tearing_requested, &self.present_modes);
        if mode == self.config.present_mode {
            return;
        }
        if let Err(err) = sync.wait_for_idle() {
            warn!("Present mode change skipped, GPU did not idle: {}", err);
            return;
        }

        let previous = self.config.present_mode;
        self.config.present_mode = mode;
        match self.reconfigure() {
            Ok(()) => info!("Present mode {:?}", mode),
            Err(err) => {
                warn!("Present mode {:?} rejected: {}", mode, err);
                self.config.present_mode = previous;
                if let Err(err) = self.reconfigure() {
                    warn!("Restoring present mode {:?} failed: {}", previous, err);
                }
            }
        }
    }

    /// Applies `self.config` to the swapchain and rebuilds size-dependent targets
    fn reconfigure(&mut self) -> Result<(), String> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        self.surface.configure(&self.device, &self.config);
        let depth = DepthTexture::create_depth_texture(&self.device, &self.config, "depth_texture");

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = out_of_memory.or(validation) {
            return Err(err.to_string());
        }

        self.depth = depth;
        self.viewport = Viewport {
            width: self.config.width,
            height: self.config.height,
        };
        // Fresh swapchain images; rotation starts over
        self.back_buffer_index = 0;
        Ok(())
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Index of the back buffer the next frame renders into
    pub fn back_buffer_index(&self) -> usize {
        self.back_buffer_index
    }

    pub fn present_mode(&self) -> wgpu::PresentMode {
        self.config.present_mode
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn tearing_requested(&self) -> bool {
        self.tearing_requested
    }

    pub fn tearing_supported(&self) -> bool {
        self.present_modes.contains(&wgpu::PresentMode::Immediate)
    }

    /// Tearing is active only with vsync off, the request set and backend support
    pub fn tearing_active(&self) -> bool {
        self.config.present_mode == wgpu::PresentMode::Immediate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::PresentMode;

    const ALL: &[PresentMode] = &[
        PresentMode::Fifo,
        PresentMode::Mailbox,
        PresentMode::Immediate,
    ];

    #[test]
    fn test_vsync_always_fifo() {
        assert_eq!(select_present_mode(true, true, ALL), PresentMode::Fifo);
        assert_eq!(select_present_mode(true, false, ALL), PresentMode::Fifo);
    }

    #[test]
    fn test_tearing_needs_request_and_support() {
        assert_eq!(select_present_mode(false, true, ALL), PresentMode::Immediate);
        assert_eq!(select_present_mode(false, false, ALL), PresentMode::Mailbox);
        assert_eq!(
            select_present_mode(false, true, &[PresentMode::Fifo, PresentMode::Mailbox]),
            PresentMode::Mailbox
        );
    }

    #[test]
    fn test_falls_back_to_fifo() {
        assert_eq!(
            select_present_mode(false, true, &[PresentMode::Fifo]),
            PresentMode::Fifo
        );
    }

    #[test]
    fn test_zero_dimension_resize_is_noop() {
        assert!(!resize_applies(0, 720));
        assert!(!resize_applies(1280, 0));
        assert!(!resize_applies(0, 0));
        assert!(resize_applies(1, 1));
    }

    #[test]
    fn test_back_buffer_rotation() {
        let mut index = 0;
        let mut seen = Vec::new();
        for _ in 0..FRAME_COUNT * 2 {
            seen.push(index);
            index = next_back_buffer(index);
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
    }
}
