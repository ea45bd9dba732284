use log::info;

use crate::{
    error::UploadError,
    gfx::geometry::{GeometryUploader, VertexBuffer},
};

use super::object::{LightEntity, MeshEntity};

/// Meshes and lights in insertion order, each list with its own selection
///
/// A selection is always `None` or a valid index into its list. Deleting the
/// selected entity clears the selection; deleting another entity leaves it
/// alone unless it now points past the end.
#[derive(Debug)]
pub struct SceneStore<B = VertexBuffer> {
    meshes: Vec<MeshEntity<B>>,
    lights: Vec<LightEntity>,
    selected_mesh: Option<usize>,
    selected_light: Option<usize>,
}

impl<B> Default for SceneStore<B> {
    fn default() -> Self {
        Self {
            meshes: Vec::new(),
            lights: Vec::new(),
            selected_mesh: None,
            selected_light: None,
        }
    }
}

impl<B> SceneStore<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meshes(&self) -> &[MeshEntity<B>] {
        &self.meshes
    }

    pub fn lights(&self) -> &[LightEntity] {
        &self.lights
    }

    pub fn mesh_mut(&mut self, index: usize) -> Option<&mut MeshEntity<B>> {
        self.meshes.get_mut(index)
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut LightEntity> {
        self.lights.get_mut(index)
    }

    pub fn selected_mesh(&self) -> Option<usize> {
        self.selected_mesh
    }

    pub fn selected_light(&self) -> Option<usize> {
        self.selected_light
    }

    /// Selects a mesh; an out-of-range index clears the selection
    pub fn select_mesh(&mut self, index: Option<usize>) {
        self.selected_mesh = index.filter(|&i| i < self.meshes.len());
    }

    /// Selects a light; an out-of-range index clears the selection
    pub fn select_light(&mut self, index: Option<usize>) {
        self.selected_light = index.filter(|&i| i < self.lights.len());
    }

    /// Appends an already uploaded mesh and returns its index
    pub fn add_mesh(&mut self, mesh: MeshEntity<B>) -> usize {
        info!("Added mesh '{}' ({} vertices)", mesh.name, mesh.vertex_count());
        self.meshes.push(mesh);
        if self.selected_mesh.is_none() {
            self.selected_mesh = Some(0);
        }
        self.meshes.len() - 1
    }

    /// Uploads `positions` and appends the resulting mesh
    ///
    /// On upload failure the store is left untouched.
    pub fn add_mesh_from_positions<U>(
        &mut self,
        name: &str,
        positions: Vec<[f32; 3]>,
        uploader: &U,
    ) -> Result<usize, UploadError>
    where
        U: GeometryUploader<Buffer = B>,
    {
        let mesh = MeshEntity::upload(name, positions, uploader)?;
        Ok(self.add_mesh(mesh))
    }

    /// Re-uploads the mesh at `index` as a new entity and selects it
    ///
    /// Returns `Ok(None)` if `index` does not name a mesh.
    pub fn duplicate_mesh<U>(
        &mut self,
        index: usize,
        uploader: &U,
    ) -> Result<Option<usize>, UploadError>
    where
        U: GeometryUploader<Buffer = B>,
    {
        let Some(original) = self.meshes.get(index) else {
            return Ok(None);
        };
        let copy = original.duplicate(uploader)?;
        let new_index = self.add_mesh(copy);
        self.selected_mesh = Some(new_index);
        Ok(Some(new_index))
    }

    /// Removes the mesh at `index` and hands it back to the caller
    ///
    /// The returned entity still owns its vertex buffer; the caller decides
    /// when it is safe to drop.
    pub fn delete_mesh(&mut self, index: usize) -> Option<MeshEntity<B>> {
        if index >= self.meshes.len() {
            return None;
        }
        let mesh = self.meshes.remove(index);
        self.selected_mesh = after_delete(self.selected_mesh, index, self.meshes.len());
        info!("Deleted mesh '{}'", mesh.name);
        Some(mesh)
    }

    pub fn rename_mesh(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.meshes.get_mut(index) {
            Some(mesh) => {
                mesh.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn add_light(&mut self, light: LightEntity) -> usize {
        info!("Added light '{}'", light.name);
        self.lights.push(light);
        if self.selected_light.is_none() {
            self.selected_light = Some(0);
        }
        self.lights.len() - 1
    }

    pub fn duplicate_light(&mut self, index: usize) -> Option<usize> {
        let copy = self.lights.get(index)?.duplicate();
        let new_index = self.add_light(copy);
        self.selected_light = Some(new_index);
        Some(new_index)
    }

    pub fn delete_light(&mut self, index: usize) -> Option<LightEntity> {
        if index >= self.lights.len() {
            return None;
        }
        let light = self.lights.remove(index);
        self.selected_light = after_delete(self.selected_light, index, self.lights.len());
        info!("Deleted light '{}'", light.name);
        Some(light)
    }

    pub fn rename_light(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.lights.get_mut(index) {
            Some(light) => {
                light.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Clears any selection that no longer names an entity
    ///
    /// Runs before every draw recording.
    pub fn validate_selection(&mut self) {
        self.selected_mesh = self.selected_mesh.filter(|&i| i < self.meshes.len());
        self.selected_light = self.selected_light.filter(|&i| i < self.lights.len());
    }

    /// Removes every entity, returning the meshes for deferred release
    pub fn drain_meshes(&mut self) -> Vec<MeshEntity<B>> {
        self.selected_mesh = None;
        std::mem::take(&mut self.meshes)
    }
}

fn after_delete(selected: Option<usize>, deleted: usize, new_len: usize) -> Option<usize> {
    match selected {
        Some(i) if i == deleted => None,
        Some(i) if i >= new_len => None,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::gfx::geometry::{cube_vertices, GpuGeometry, VertexBufferView};

    /// Hands out numbered buffers; optionally fails every upload
    #[derive(Default)]
    struct MockUploader {
        next_id: Cell<u32>,
        fail: bool,
    }

    impl GeometryUploader for MockUploader {
        type Buffer = u32;

        fn upload(
            &self,
            _label: &str,
            positions: &[[f32; 3]],
        ) -> Result<GpuGeometry<u32>, UploadError> {
            if self.fail {
                return Err(UploadError::Allocation("out of memory".into()));
            }
            if positions.is_empty() {
                return Err(UploadError::Empty);
            }
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            Ok(GpuGeometry {
                buffer: id,
                view: VertexBufferView::for_positions(positions.len()),
                vertex_count: positions.len() as u32,
            })
        }
    }

    fn store_with_cubes(count: usize, uploader: &MockUploader) -> SceneStore<u32> {
        let mut store = SceneStore::new();
        for _ in 0..count {
            store
                .add_mesh_from_positions("Cube", cube_vertices(), uploader)
                .unwrap();
        }
        store
    }

    #[test]
    fn test_first_mesh_is_selected() {
        let uploader = MockUploader::default();
        let store = store_with_cubes(3, &uploader);

        assert_eq!(store.meshes().len(), 3);
        assert_eq!(store.selected_mesh(), Some(0));
    }

    #[test]
    fn test_duplicate_gets_its_own_buffer() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(4, &uploader);

        let copy = store.duplicate_mesh(2, &uploader).unwrap().unwrap();

        assert_eq!(copy, 4);
        assert_eq!(store.meshes()[copy].name, "Cube (copy)");
        assert_ne!(store.meshes()[copy].buffer(), store.meshes()[2].buffer());
        assert_eq!(store.selected_mesh(), Some(copy));
    }

    #[test]
    fn test_deleting_original_keeps_duplicate_renderable() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(1, &uploader);
        store.duplicate_mesh(0, &uploader).unwrap();

        let removed = store.delete_mesh(0).unwrap();

        assert_eq!(store.meshes().len(), 1);
        let survivor = &store.meshes()[0];
        assert_ne!(*survivor.buffer(), removed.into_buffer());
        assert!(survivor.is_drawable());
        assert_eq!(survivor.vertex_count(), 36);
        assert_eq!(survivor.view().size, 36 * 12);
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(3, &uploader);
        store.select_mesh(Some(1));

        store.delete_mesh(1);

        assert_eq!(store.selected_mesh(), None);
    }

    #[test]
    fn test_delete_other_keeps_selection_in_range() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(3, &uploader);
        store.select_mesh(Some(1));

        store.delete_mesh(2);
        assert_eq!(store.selected_mesh(), Some(1));

        store.delete_mesh(0);
        // Index 1 now exceeds the single remaining mesh
        assert_eq!(store.selected_mesh(), None);
    }

    #[test]
    fn test_failed_upload_leaves_store_untouched() {
        let good = MockUploader::default();
        let mut store = store_with_cubes(2, &good);
        let failing = MockUploader {
            fail: true,
            ..Default::default()
        };

        assert!(store
            .add_mesh_from_positions("Cube", cube_vertices(), &failing)
            .is_err());
        assert!(store.duplicate_mesh(0, &failing).is_err());

        assert_eq!(store.meshes().len(), 2);
        assert_eq!(store.selected_mesh(), Some(0));
    }

    #[test]
    fn test_duplicate_missing_index_is_noop() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(1, &uploader);

        assert_eq!(store.duplicate_mesh(5, &uploader).unwrap(), None);
        assert_eq!(store.meshes().len(), 1);
    }

    #[test]
    fn test_light_selection_rules() {
        let mut store: SceneStore<u32> = SceneStore::new();
        store.add_light(LightEntity::new("Light"));
        store.add_light(LightEntity::new("Light"));
        assert_eq!(store.selected_light(), Some(0));

        let copy = store.duplicate_light(0).unwrap();
        assert_eq!(store.lights()[copy].name, "Light (copy)");
        assert_eq!(store.lights()[copy].transform.position, [0.0, 1.0, 0.0]);
        assert_eq!(store.selected_light(), Some(2));

        store.delete_light(2);
        assert_eq!(store.selected_light(), None);
    }

    #[test]
    fn test_rename() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(1, &uploader);

        assert!(store.rename_mesh(0, "Crate"));
        assert!(!store.rename_mesh(3, "Nope"));
        assert_eq!(store.meshes()[0].name, "Crate");
    }

    #[test]
    fn test_validate_selection_clears_stale_index() {
        let uploader = MockUploader::default();
        let mut store = store_with_cubes(2, &uploader);
        store.selected_mesh = Some(7);
        store.selected_light = Some(0);

        store.validate_selection();

        assert_eq!(store.selected_mesh(), None);
        assert_eq!(store.selected_light(), None);
    }
}
