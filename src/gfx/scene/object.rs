//! Scene entities: meshes and lights

use std::sync::Arc;

use crate::{
    error::UploadError,
    gfx::geometry::{GeometryUploader, GpuGeometry, VertexBuffer, VertexBufferView},
};

/// Position, Euler rotation in degrees, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    /// Euler angles in degrees (x, y, z)
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    pub fn is_finite(&self) -> bool {
        self.position
            .iter()
            .chain(&self.rotation)
            .chain(&self.scale)
            .all(|v| v.is_finite())
    }
}

/// A renderable mesh with exclusive ownership of its vertex buffer
///
/// The CPU-side positions are kept so a duplicate can be re-uploaded into a
/// buffer of its own instead of aliasing this one.
#[derive(Debug)]
pub struct MeshEntity<B = VertexBuffer> {
    pub name: String,
    pub transform: Transform,
    geometry: GpuGeometry<B>,
    positions: Arc<[[f32; 3]]>,
}

impl<B> MeshEntity<B> {
    /// Uploads `positions` and wraps the result in a new entity
    ///
    /// Nothing is created if the upload fails.
    pub fn upload<U>(
        name: impl Into<String>,
        positions: Vec<[f32; 3]>,
        uploader: &U,
    ) -> Result<Self, UploadError>
    where
        U: GeometryUploader<Buffer = B>,
    {
        let name = name.into();
        let geometry = uploader.upload(&name, &positions)?;
        Ok(Self {
            name,
            transform: Transform::default(),
            geometry,
            positions: positions.into(),
        })
    }

    /// Re-uploads this entity's geometry into a fresh buffer
    ///
    /// The copy is named `"<name> (copy)"` and shares no GPU resource with
    /// the original.
    pub fn duplicate<U>(&self, uploader: &U) -> Result<Self, UploadError>
    where
        U: GeometryUploader<Buffer = B>,
    {
        let name = format!("{} (copy)", self.name);
        let geometry = uploader.upload(&name, &self.positions)?;
        Ok(Self {
            name,
            transform: self.transform,
            geometry,
            positions: Arc::clone(&self.positions),
        })
    }

    pub fn buffer(&self) -> &B {
        &self.geometry.buffer
    }

    pub fn view(&self) -> VertexBufferView {
        self.geometry.view
    }

    pub fn vertex_count(&self) -> u32 {
        self.geometry.vertex_count
    }

    /// Whether this mesh can be drawn at all
    pub fn is_drawable(&self) -> bool {
        self.geometry.vertex_count > 0
    }

    /// Consumes the entity, handing back its buffer for deferred release
    pub fn into_buffer(self) -> B {
        self.geometry.buffer
    }
}

/// A point light. Only the transform's position is meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct LightEntity {
    pub name: String,
    pub transform: Transform,
    /// Linear RGB, nominally 0..1 but not clamped
    pub color: [f32; 3],
    /// Editor clamps to 0..32; not enforced here
    pub intensity: f32,
}

impl LightEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform {
                position: [0.0, 1.0, 0.0],
                ..Transform::default()
            },
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }

    pub fn duplicate(&self) -> Self {
        Self {
            name: format!("{} (copy)", self.name),
            ..self.clone()
        }
    }
}
