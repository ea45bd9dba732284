//! Editor panels: tools, hierarchy, inspector and assets
//!
//! Widgets edit transforms, colors and the camera in place. Anything that
//! changes the shape of the scene (add, duplicate, delete, rename, select) or
//! the swapchain is returned as an [`EditorCommand`] and applied by the
//! engine after the UI is built and before the frame is recorded.

use std::path::PathBuf;

use imgui::{Condition, Drag, MouseButton, SliderFlags, TreeNodeFlags, Ui};
use log::info;

use crate::{
    assets::AssetLibrary,
    error::UploadError,
    gfx::{
        camera::{fly_camera::PITCH_LIMIT, CameraState},
        geometry::{cube_vertices, GeometryUploader},
        rendering::DrawStats,
        scene::{LightEntity, MeshEntity, SceneStore},
    },
    performance::FrameTimings,
};

/// Upper bound of the light intensity drag
pub const MAX_LIGHT_INTENSITY: f32 = 32.0;

/// A structural edit requested from the UI
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    AddCube,
    AddLight,
    AddObj(PathBuf),
    SelectMesh(Option<usize>),
    DuplicateMesh(usize),
    DeleteMesh(usize),
    RenameMesh(usize, String),
    SelectLight(Option<usize>),
    DuplicateLight(usize),
    DeleteLight(usize),
    RenameLight(usize, String),
    RenameCamera(String),
    SetVsync(bool),
    SetTearing(bool),
}

impl EditorCommand {
    /// Applies a scene or camera edit
    ///
    /// A deleted mesh is handed back so its buffer can be retired once the GPU
    /// is done with it. Swapchain and file commands are left to the caller and
    /// do nothing here.
    pub fn apply<U: GeometryUploader>(
        self,
        scene: &mut SceneStore<U::Buffer>,
        camera: &mut CameraState,
        uploader: &U,
    ) -> Result<Option<MeshEntity<U::Buffer>>, UploadError> {
        match self {
            EditorCommand::AddCube => {
                scene.add_mesh_from_positions("Cube", cube_vertices(), uploader)?;
            }
            EditorCommand::AddLight => {
                scene.add_light(LightEntity::new("Light"));
            }
            EditorCommand::SelectMesh(index) => scene.select_mesh(index),
            EditorCommand::DuplicateMesh(index) => {
                scene.duplicate_mesh(index, uploader)?;
            }
            EditorCommand::DeleteMesh(index) => return Ok(scene.delete_mesh(index)),
            EditorCommand::RenameMesh(index, name) => {
                scene.rename_mesh(index, name);
            }
            EditorCommand::SelectLight(index) => scene.select_light(index),
            EditorCommand::DuplicateLight(index) => {
                scene.duplicate_light(index);
            }
            EditorCommand::DeleteLight(index) => {
                scene.delete_light(index);
            }
            EditorCommand::RenameLight(index, name) => {
                scene.rename_light(index, name);
            }
            EditorCommand::RenameCamera(name) => {
                info!("Renamed camera to '{}'", name);
                camera.name = name;
            }
            EditorCommand::AddObj(_) | EditorCommand::SetVsync(_) | EditorCommand::SetTearing(_) => {}
        }
        Ok(None)
    }
}

/// Swapchain and pacing state shown in the tools panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentStatus {
    pub vsync: bool,
    pub tearing_requested: bool,
    pub tearing_supported: bool,
    pub tearing_active: bool,
    pub present_mode: wgpu::PresentMode,
    /// Time the last frame spent waiting for a back buffer
    pub last_wait_ms: f32,
    pub skipped_frames: u64,
}

/// Everything the panels read or edit in place for one frame
pub struct EditorView<'a> {
    pub scene: &'a mut SceneStore,
    pub camera: &'a mut CameraState,
    pub timings: &'a FrameTimings,
    pub assets: &'a AssetLibrary,
    pub present: PresentStatus,
    pub stats: DrawStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameTarget {
    Camera,
    Mesh(usize),
    Light(usize),
}

/// UI state that outlives a single frame
#[derive(Debug, Default)]
pub struct Editor {
    rename_target: Option<RenameTarget>,
    rename_buffer: String,
    selected_asset: Option<usize>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every panel, pushing structural edits onto `commands`
    pub fn build(&mut self, ui: &Ui, view: EditorView<'_>, commands: &mut Vec<EditorCommand>) {
        let EditorView {
            scene,
            camera,
            timings,
            assets,
            present,
            stats,
        } = view;

        self.tools_panel(ui, timings, present, stats, commands);
        self.hierarchy_panel(ui, scene, camera, commands);
        self.inspector_panel(ui, scene, camera);
        self.assets_panel(ui, assets, commands);
    }

    fn tools_panel(
        &self,
        ui: &Ui,
        timings: &FrameTimings,
        present: PresentStatus,
        stats: DrawStats,
        commands: &mut Vec<EditorCommand>,
    ) {
        ui.window("Tools")
            .size([320.0, 230.0], Condition::FirstUseEver)
            .position([10.0, 10.0], Condition::FirstUseEver)
            .build(|| {
                let mut vsync = present.vsync;
                if ui.checkbox("VSync", &mut vsync) {
                    commands.push(EditorCommand::SetVsync(vsync));
                }
                if present.tearing_supported {
                    let mut tearing = present.tearing_requested;
                    if ui.checkbox("Allow tearing", &mut tearing) {
                        commands.push(EditorCommand::SetTearing(tearing));
                    }
                }
                ui.text(format!(
                    "Present mode: {:?}{}",
                    present.present_mode,
                    if present.tearing_active { " (tearing)" } else { "" }
                ));

                ui.separator();
                ui.text("Frame time (0-40 ms)");
                timings.render_plot(ui);

                ui.separator();
                ui.text(format!(
                    "Latency wait: {:.2} ms, skipped frames: {}",
                    present.last_wait_ms, present.skipped_frames
                ));
                ui.text(format!("Draws: {}", stats.drawn));
                if stats.dropped > 0 {
                    ui.text_colored(
                        [1.0, 0.6, 0.2, 1.0],
                        format!("Dropped draws: {}", stats.dropped),
                    );
                }
            });
    }

    fn hierarchy_panel(
        &mut self,
        ui: &Ui,
        scene: &SceneStore,
        camera: &CameraState,
        commands: &mut Vec<EditorCommand>,
    ) {
        ui.window("Hierarchy")
            .size([280.0, 360.0], Condition::FirstUseEver)
            .position([10.0, 250.0], Condition::FirstUseEver)
            .build(|| {
                {
                    let _id = ui.push_id("camera");
                    ui.selectable(&camera.name);
                    if ui.is_item_clicked_with_button(MouseButton::Right) {
                        self.rename_target = None;
                        ui.open_popup("camera_context");
                    }
                    ui.popup("camera_context", || {
                        self.rename_item(ui, RenameTarget::Camera, &camera.name, commands);
                        if ui.menu_item("Add Cube") {
                            commands.push(EditorCommand::AddCube);
                        }
                        if ui.menu_item("Add Light") {
                            commands.push(EditorCommand::AddLight);
                        }
                    });
                }

                if ui.collapsing_header("Meshes", TreeNodeFlags::DEFAULT_OPEN) {
                    for (index, mesh) in scene.meshes().iter().enumerate() {
                        let _id = ui.push_id_usize(index);
                        let selected = scene.selected_mesh() == Some(index);
                        if ui.selectable_config(&mesh.name).selected(selected).build() {
                            commands.push(EditorCommand::SelectMesh(Some(index)));
                        }
                        if ui.is_item_clicked_with_button(MouseButton::Right) {
                            self.rename_target = None;
                            ui.open_popup("mesh_context");
                        }
                        ui.popup("mesh_context", || {
                            if ui.menu_item("Duplicate") {
                                commands.push(EditorCommand::DuplicateMesh(index));
                            }
                            if ui.menu_item("Delete") {
                                commands.push(EditorCommand::DeleteMesh(index));
                            }
                            self.rename_item(ui, RenameTarget::Mesh(index), &mesh.name, commands);
                            ui.separator();
                            if ui.menu_item("Add Cube") {
                                commands.push(EditorCommand::AddCube);
                            }
                            if ui.menu_item("Add Light") {
                                commands.push(EditorCommand::AddLight);
                            }
                        });
                    }
                }

                if ui.collapsing_header("Lights", TreeNodeFlags::DEFAULT_OPEN) {
                    for (index, light) in scene.lights().iter().enumerate() {
                        let _id = ui.push_id_usize(index);
                        let selected = scene.selected_light() == Some(index);
                        if ui.selectable_config(&light.name).selected(selected).build() {
                            commands.push(EditorCommand::SelectLight(Some(index)));
                        }
                        if ui.is_item_clicked_with_button(MouseButton::Right) {
                            self.rename_target = None;
                            ui.open_popup("light_context");
                        }
                        ui.popup("light_context", || {
                            if ui.menu_item("Duplicate") {
                                commands.push(EditorCommand::DuplicateLight(index));
                            }
                            if ui.menu_item("Delete") {
                                commands.push(EditorCommand::DeleteLight(index));
                            }
                            self.rename_item(ui, RenameTarget::Light(index), &light.name, commands);
                            ui.separator();
                            if ui.menu_item("Add Cube") {
                                commands.push(EditorCommand::AddCube);
                            }
                            if ui.menu_item("Add Light") {
                                commands.push(EditorCommand::AddLight);
                            }
                        });
                    }
                }
            });
    }

    /// Inline rename field inside a context popup; Enter commits
    fn rename_item(
        &mut self,
        ui: &Ui,
        target: RenameTarget,
        current: &str,
        commands: &mut Vec<EditorCommand>,
    ) {
        if self.rename_target != Some(target) {
            self.rename_target = Some(target);
            self.rename_buffer.clear();
            self.rename_buffer.push_str(current);
        }

        let committed = ui
            .input_text("Rename", &mut self.rename_buffer)
            .enter_returns_true(true)
            .build();
        if committed && !self.rename_buffer.is_empty() {
            let name = self.rename_buffer.clone();
            commands.push(match target {
                RenameTarget::Camera => EditorCommand::RenameCamera(name),
                RenameTarget::Mesh(index) => EditorCommand::RenameMesh(index, name),
                RenameTarget::Light(index) => EditorCommand::RenameLight(index, name),
            });
            self.rename_target = None;
            ui.close_current_popup();
        }
    }

    fn inspector_panel(&mut self, ui: &Ui, scene: &mut SceneStore, camera: &mut CameraState) {
        ui.window("Inspector")
            .size([320.0, 330.0], Condition::FirstUseEver)
            .position([300.0, 10.0], Condition::FirstUseEver)
            .build(|| {
                if ui.collapsing_header("Camera", TreeNodeFlags::DEFAULT_OPEN) {
                    let _id = ui.push_id("camera_inspector");
                    let mut position: [f32; 3] = camera.position.into();
                    if Drag::new("Position").speed(0.01).build_array(ui, &mut position) {
                        camera.position = position.into();
                    }
                    let mut yaw = camera.yaw;
                    if Drag::new("Yaw").speed(0.005).build(ui, &mut yaw) {
                        camera.yaw = yaw;
                    }
                    let mut pitch = camera.pitch;
                    if Drag::new("Pitch").speed(0.005).build(ui, &mut pitch) {
                        camera.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
                    }
                }

                if let Some(mesh) = scene.selected_mesh().and_then(|i| scene.mesh_mut(i)) {
                    if ui.collapsing_header("Mesh", TreeNodeFlags::DEFAULT_OPEN) {
                        let _id = ui.push_id("mesh_inspector");
                        ui.text(&mesh.name);
                        ui.text_disabled(format!("{} vertices", mesh.vertex_count()));
                        let transform = &mut mesh.transform;
                        Drag::new("Position")
                            .speed(0.01)
                            .build_array(ui, &mut transform.position);
                        Drag::new("Rotation")
                            .speed(0.5)
                            .display_format("%.1f deg")
                            .build_array(ui, &mut transform.rotation);
                        Drag::new("Scale")
                            .speed(0.01)
                            .build_array(ui, &mut transform.scale);
                    }
                }

                if let Some(light) = scene.selected_light().and_then(|i| scene.light_mut(i)) {
                    if ui.collapsing_header("Light", TreeNodeFlags::DEFAULT_OPEN) {
                        let _id = ui.push_id("light_inspector");
                        ui.text(&light.name);
                        Drag::new("Position")
                            .speed(0.01)
                            .build_array(ui, &mut light.transform.position);
                        ui.color_edit3("Color", &mut light.color);
                        Drag::new("Intensity")
                            .speed(0.05)
                            .range(0.0, MAX_LIGHT_INTENSITY)
                            .flags(SliderFlags::ALWAYS_CLAMP)
                            .build(ui, &mut light.intensity);
                    }
                }
            });
    }

    fn assets_panel(&mut self, ui: &Ui, assets: &AssetLibrary, commands: &mut Vec<EditorCommand>) {
        ui.window("Assets")
            .size([320.0, 220.0], Condition::FirstUseEver)
            .position([300.0, 350.0], Condition::FirstUseEver)
            .build(|| {
                ui.text_disabled(assets.root().display().to_string());
                let files = assets.files();
                if self.selected_asset.is_some_and(|i| i >= files.len()) {
                    self.selected_asset = None;
                }

                if files.is_empty() {
                    ui.text("No .obj files found");
                }
                for (index, path) in files.iter().enumerate() {
                    let label = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    let _id = ui.push_id_usize(index);
                    if ui
                        .selectable_config(&label)
                        .selected(self.selected_asset == Some(index))
                        .build()
                    {
                        self.selected_asset = Some(index);
                    }
                }

                ui.separator();
                if ui.button("Add Selected OBJ") {
                    if let Some(path) = self.selected_asset.and_then(|i| files.get(i)) {
                        commands.push(EditorCommand::AddObj(path.clone()));
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::gfx::geometry::{GpuGeometry, VertexBufferView};

    #[derive(Default)]
    struct CountingUploader {
        uploads: Cell<u32>,
    }

    impl GeometryUploader for CountingUploader {
        type Buffer = u32;

        fn upload(
            &self,
            _label: &str,
            positions: &[[f32; 3]],
        ) -> Result<GpuGeometry<u32>, UploadError> {
            let id = self.uploads.get();
            self.uploads.set(id + 1);
            Ok(GpuGeometry {
                buffer: id,
                view: VertexBufferView::for_positions(positions.len()),
                vertex_count: positions.len() as u32,
            })
        }
    }

    fn apply_all(
        commands: Vec<EditorCommand>,
        scene: &mut SceneStore<u32>,
        camera: &mut CameraState,
        uploader: &CountingUploader,
    ) -> Vec<MeshEntity<u32>> {
        commands
            .into_iter()
            .filter_map(|command| command.apply(scene, camera, uploader).unwrap())
            .collect()
    }

    #[test]
    fn test_add_cube_and_light() {
        let uploader = CountingUploader::default();
        let mut scene = SceneStore::new();
        let mut camera = CameraState::default();

        apply_all(
            vec![EditorCommand::AddCube, EditorCommand::AddLight],
            &mut scene,
            &mut camera,
            &uploader,
        );

        assert_eq!(scene.meshes()[0].name, "Cube");
        assert_eq!(scene.meshes()[0].vertex_count(), 36);
        assert_eq!(scene.lights()[0].name, "Light");
        assert_eq!(scene.lights()[0].intensity, 1.0);
        assert_eq!(scene.selected_mesh(), Some(0));
        assert_eq!(scene.selected_light(), Some(0));
    }

    #[test]
    fn test_delete_returns_mesh_for_retirement() {
        let uploader = CountingUploader::default();
        let mut scene = SceneStore::new();
        let mut camera = CameraState::default();

        let retired = apply_all(
            vec![
                EditorCommand::AddCube,
                EditorCommand::DuplicateMesh(0),
                EditorCommand::DeleteMesh(0),
            ],
            &mut scene,
            &mut camera,
            &uploader,
        );

        assert_eq!(retired.len(), 1);
        assert_eq!(scene.meshes().len(), 1);
        assert_eq!(scene.meshes()[0].name, "Cube (copy)");
        assert_eq!(uploader.uploads.get(), 2);
    }

    #[test]
    fn test_renames() {
        let uploader = CountingUploader::default();
        let mut scene = SceneStore::new();
        let mut camera = CameraState::default();

        apply_all(
            vec![
                EditorCommand::AddLight,
                EditorCommand::RenameLight(0, "Key".into()),
                EditorCommand::RenameCamera("Main".into()),
            ],
            &mut scene,
            &mut camera,
            &uploader,
        );

        assert_eq!(scene.lights()[0].name, "Key");
        assert_eq!(camera.name, "Main");
    }

    #[test]
    fn test_surface_commands_leave_scene_alone() {
        let uploader = CountingUploader::default();
        let mut scene = SceneStore::new();
        let mut camera = CameraState::default();

        apply_all(
            vec![
                EditorCommand::SetVsync(false),
                EditorCommand::SetTearing(true),
                EditorCommand::AddObj(PathBuf::from("missing.obj")),
            ],
            &mut scene,
            &mut camera,
            &uploader,
        );

        assert!(scene.meshes().is_empty());
        assert_eq!(uploader.uploads.get(), 0);
    }
}
