//! Engine composition root
//!
//! [`Engine`] owns the device, swapchain, frame slots, scene, camera and
//! editor, and exposes the calls the host loop drives: [`Engine::update`]
//! at a fixed step, [`Engine::render`] once per iteration and
//! [`Engine::resize`] on window size changes.
//!
//! Within one render call the order is fixed: acquire and wait for the frame
//! slot, build the UI, apply structural edits, validate selections, record,
//! submit, present. Scene data is never mutated while draws are recorded.

use std::{path::Path, sync::Arc, time::Instant};

use log::{error, info, warn};
use winit::{
    event::WindowEvent,
    window::{Window, WindowId},
};

use crate::{
    assets::{load_obj_positions, AssetLibrary},
    config::EngineConfig,
    error::{AssetError, EngineError, FrameError, UploadError},
    gfx::{
        camera::{CameraController, CameraState, InputSnapshot},
        geometry::{cube_vertices, WgpuUploader},
        rendering::{FrameRenderer, FrameSynchronizer, PresentationSurface, QueueFence},
        scene::{LightEntity, SceneStore},
    },
    performance::FrameTimings,
    ui::{Editor, EditorCommand, EditorView, PresentStatus, UiManager},
};

pub struct Engine {
    window: Arc<Window>,
    surface: PresentationSurface,
    sync: FrameSynchronizer<QueueFence>,
    renderer: FrameRenderer,
    uploader: WgpuUploader,
    scene: SceneStore,
    camera: CameraState,
    controller: CameraController,
    assets: AssetLibrary,
    timings: FrameTimings,
    ui: UiManager,
    editor: Editor,
    /// Edits collected while building the UI; reused every frame
    commands: Vec<EditorCommand>,
    last_wait_ms: f32,
    skipped_frames: u64,
}

impl Engine {
    /// Creates every GPU resource and the starting scene (one cube, one light)
    ///
    /// Any failure is fatal and no engine is returned.
    pub async fn new(window: Arc<Window>, config: &EngineConfig) -> Result<Self, EngineError> {
        let surface = PresentationSurface::new(Arc::clone(&window), config).await?;
        let device = Arc::clone(surface.device());
        let queue = Arc::clone(surface.queue());

        let sync = FrameSynchronizer::new(QueueFence::new(Arc::clone(&device), Arc::clone(&queue)));
        let renderer = FrameRenderer::new(
            Arc::clone(&device),
            Arc::clone(&queue),
            surface.format(),
            config.max_draws_per_frame,
            config.clear_color,
        )?;
        let uploader = WgpuUploader::new(Arc::clone(&device));

        let mut scene = SceneStore::new();
        scene.add_mesh_from_positions("Cube", cube_vertices(), &uploader)?;
        scene.add_light(LightEntity::new("Light"));

        let mut ui = UiManager::new(&device, &queue, surface.format(), &window);
        let (width, height) = surface.size();
        ui.update_display_size(width, height);

        info!("Engine initialized");

        Ok(Self {
            window,
            surface,
            sync,
            renderer,
            uploader,
            scene,
            camera: CameraState::default(),
            controller: CameraController::new(config.move_speed, config.look_sensitivity),
            assets: AssetLibrary::new(&config.assets_dir, config.asset_rescan_interval),
            timings: FrameTimings::new(config.frame_time_samples),
            ui,
            editor: Editor::new(),
            commands: Vec::new(),
            last_wait_ms: 0.0,
            skipped_frames: 0,
        })
    }

    /// Advances camera and asset polling by one fixed step
    pub fn update(&mut self, dt: f64, input: &InputSnapshot) {
        self.controller.apply(&mut self.camera, input, dt as f32);
        self.assets.update(dt);
    }

    /// Renders one frame: scene, then the editor overlay
    ///
    /// A frame without an available back buffer is skipped and counted.
    pub fn render(&mut self) -> Result<(), FrameError> {
        self.timings.record(Instant::now());

        let wait_start = Instant::now();
        let frame = self.renderer.begin_frame(&mut self.surface, &mut self.sync)?;
        self.last_wait_ms = wait_start.elapsed().as_secs_f32() * 1000.0;
        let Some(mut frame) = frame else {
            self.skipped_frames += 1;
            return Ok(());
        };

        let mut commands = std::mem::take(&mut self.commands);
        commands.clear();
        let view = EditorView {
            scene: &mut self.scene,
            camera: &mut self.camera,
            timings: &self.timings,
            assets: &self.assets,
            present: PresentStatus {
                vsync: self.surface.vsync(),
                tearing_requested: self.surface.tearing_requested(),
                tearing_supported: self.surface.tearing_supported(),
                tearing_active: self.surface.tearing_active(),
                present_mode: self.surface.present_mode(),
                last_wait_ms: self.last_wait_ms,
                skipped_frames: self.skipped_frames,
            },
            stats: self.renderer.last_stats(),
        };
        let editor = &mut self.editor;
        self.ui
            .build_frame(&self.window, |ui| editor.build(ui, view, &mut commands));

        // Swapchain changes wait until the back buffer has been presented
        self.apply_scene_commands(&mut commands);

        self.scene.validate_selection();
        self.renderer
            .record_scene(&mut frame, &self.surface, &self.scene, &self.camera)?;
        self.ui.render(
            self.surface.device(),
            self.surface.queue(),
            &mut frame.encoder,
            &frame.view,
        );

        self.window.pre_present_notify();
        self.renderer
            .end_frame(frame, &mut self.surface, &mut self.sync)?;

        self.apply_surface_commands(&mut commands);
        self.commands = commands;
        Ok(())
    }

    /// Applies every scene edit in `commands`, leaving only swapchain changes
    fn apply_scene_commands(&mut self, commands: &mut Vec<EditorCommand>) {
        commands.retain(|command| {
            match command {
                EditorCommand::SetVsync(_) | EditorCommand::SetTearing(_) => return true,
                EditorCommand::AddObj(path) => {
                    if let Err(err) = Self::load_obj(&mut self.scene, &self.uploader, path) {
                        warn!("Could not add {}: {}", path.display(), err);
                    }
                }
                command => match command
                    .clone()
                    .apply(&mut self.scene, &mut self.camera, &self.uploader)
                {
                    Ok(Some(mesh)) => self.sync.defer_release(mesh.into_buffer()),
                    Ok(None) => {}
                    Err(err) => warn!("{:?} failed: {}", command, err),
                },
            }
            false
        });
    }

    fn apply_surface_commands(&mut self, commands: &mut Vec<EditorCommand>) {
        for command in commands.drain(..) {
            match command {
                EditorCommand::SetVsync(vsync) => self.surface.set_vsync(vsync, &mut self.sync),
                EditorCommand::SetTearing(tearing) => {
                    self.surface.set_tearing(tearing, &mut self.sync)
                }
                _ => {}
            }
        }
    }

    /// Resizes the swapchain; a zero dimension is ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.surface.resize(width, height, &mut self.sync) {
            self.ui.update_display_size(width, height);
        }
    }

    /// Feeds a window event to the UI; true if the UI captured it
    pub fn handle_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> bool {
        self.ui.handle_input(&self.window, window_id, event)
    }

    pub fn ui_wants_mouse(&self) -> bool {
        self.ui.wants_mouse()
    }

    pub fn ui_wants_keyboard(&self) -> bool {
        self.ui.wants_keyboard()
    }

    pub fn add_cube(&mut self) -> Result<usize, UploadError> {
        self.scene
            .add_mesh_from_positions("Cube", cube_vertices(), &self.uploader)
    }

    pub fn add_light(&mut self) -> usize {
        self.scene.add_light(LightEntity::new("Light"))
    }

    /// Loads an OBJ file as a new mesh named after the file
    pub fn add_obj(&mut self, path: &Path) -> Result<usize, AssetError> {
        Self::load_obj(&mut self.scene, &self.uploader, path)
    }

    fn load_obj(
        scene: &mut SceneStore,
        uploader: &WgpuUploader,
        path: &Path,
    ) -> Result<usize, AssetError> {
        let positions = load_obj_positions(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("OBJ"));
        Ok(scene.add_mesh_from_positions(&name, positions, uploader)?)
    }

    pub fn duplicate_mesh(&mut self, index: usize) -> Result<Option<usize>, UploadError> {
        self.scene.duplicate_mesh(index, &self.uploader)
    }

    /// Removes a mesh; its buffer is released once in-flight frames retire
    pub fn delete_mesh(&mut self, index: usize) -> bool {
        match self.scene.delete_mesh(index) {
            Some(mesh) => {
                self.sync.defer_release(mesh.into_buffer());
                true
            }
            None => false,
        }
    }

    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneStore {
        &mut self.scene
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(err) = self.sync.wait_for_idle() {
            error!("GPU did not idle during shutdown: {}", err);
        }
        for mesh in self.scene.drain_meshes() {
            mesh.into_buffer().destroy();
        }
        info!("Engine shut down");
    }
}
