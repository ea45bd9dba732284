use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use super::camera_utils::{aspect_ratio, look_to_lh, perspective_lh, FOV_Y, Z_FAR, Z_NEAR};

/// Pitch is kept just short of straight up/down so the view basis never degenerates
pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Free-flying yaw/pitch camera
///
/// Only position and the two angles are stored. The forward, right and up
/// vectors are derived on demand, so they can never go stale after an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub name: String,
    pub position: Point3<f32>,
    /// Rotation about world +Y in radians; zero looks down +Z
    pub yaw: f32,
    /// Elevation in radians, clamped to [`PITCH_LIMIT`]
    pub pitch: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            name: "Camera".to_string(),
            position: Point3::new(0.0, 0.0, -3.5),
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl CameraState {
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn right(&self) -> Vector3<f32> {
        self.up().cross(self.forward()).normalize()
    }

    /// World up. Vertical movement ignores pitch.
    pub fn up(&self) -> Vector3<f32> {
        Vector3::unit_y()
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.yaw += delta;
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.pitch = (self.pitch + delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.position += offset;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        look_to_lh(self.position, self.forward(), self.up())
    }

    pub fn projection_matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        perspective_lh(FOV_Y, aspect_ratio(width, height), Z_NEAR, Z_FAR)
    }

    /// Combined projection * view for a surface of the given size
    pub fn build_view_projection_matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        self.projection_matrix(width, height) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_at_rest_is_world_forward() {
        let camera = CameraState::default();
        let forward = camera.forward();

        assert!(forward.x.abs() < 1e-6);
        assert!(forward.y.abs() < 1e-6);
        assert!((forward.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let camera = CameraState {
            yaw: 0.7,
            pitch: -0.3,
            ..CameraState::default()
        };

        let forward = camera.forward();
        let right = camera.right();

        assert!((forward.magnitude() - 1.0).abs() < 1e-5);
        assert!((right.magnitude() - 1.0).abs() < 1e-5);
        assert!(forward.dot(right).abs() < 1e-5);
        assert!(right.y.abs() < 1e-6);
    }

    #[test]
    fn test_right_at_rest_is_positive_x() {
        let right = CameraState::default().right();
        assert!((right.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_clamps() {
        let mut camera = CameraState::default();
        camera.add_pitch(10.0);
        assert_eq!(camera.pitch, PITCH_LIMIT);
        camera.add_pitch(-20.0);
        assert_eq!(camera.pitch, -PITCH_LIMIT);
    }
}
