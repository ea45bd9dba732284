//! Matrix helpers for the left-handed, zero-to-one depth convention wgpu uses
//!
//! Matrices follow cgmath's column-vector convention, so a row-vector product
//! `S * R * T * V * P` is written here as `P * V * T * R * S`.

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3};

use crate::gfx::scene::Transform;

/// Vertical field of view in radians
pub const FOV_Y: f32 = 0.9;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// Builds a left-handed view matrix looking from `eye` along `dir`
pub fn look_to_lh(eye: Point3<f32>, dir: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let z = dir.normalize();
    let x = up.cross(z).normalize();
    let y = z.cross(x);
    let e = Vector3::new(eye.x, eye.y, eye.z);

    #[rustfmt::skip]
    let view = Matrix4::new(
        x.x, y.x, z.x, 0.0,
        x.y, y.y, z.y, 0.0,
        x.z, y.z, z.z, 0.0,
        -x.dot(e), -y.dot(e), -z.dot(e), 1.0,
    );
    view
}

/// Left-handed perspective projection mapping depth to `[0, 1]`
pub fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let h = 1.0 / (fov_y * 0.5).tan();
    let w = h / aspect;
    let range = far / (far - near);

    #[rustfmt::skip]
    let proj = Matrix4::new(
        w,   0.0, 0.0,             0.0,
        0.0, h,   0.0,             0.0,
        0.0, 0.0, range,           1.0,
        0.0, 0.0, -range * near,   0.0,
    );
    proj
}

/// Model matrix for a transform: scale, then rotate (Z, X, Y), then translate
///
/// Rotation angles are stored in degrees.
pub fn model_matrix(transform: &Transform) -> Matrix4<f32> {
    let [sx, sy, sz] = transform.scale;
    let [rx, ry, rz] = transform.rotation;
    let [tx, ty, tz] = transform.position;

    let scale = Matrix4::from_nonuniform_scale(sx, sy, sz);
    let rotation =
        Matrix4::from_angle_y(Deg(ry)) * Matrix4::from_angle_x(Deg(rx)) * Matrix4::from_angle_z(Deg(rz));
    let translation = Matrix4::from_translation(Vector3::new(tx, ty, tz));

    translation * rotation * scale
}

/// Aspect ratio of a surface, falling back to 1.0 for degenerate sizes
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_view_puts_target_on_positive_z() {
        let eye = Point3::new(0.0, 0.0, -3.5);
        let view = look_to_lh(eye, Vector3::unit_z(), Vector3::unit_y());
        let p = view * Vector4::new(0.0, 0.0, 0.0, 1.0);

        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, 0.0));
        assert!(approx(p.z, 3.5));
    }

    #[test]
    fn test_projection_depth_range() {
        let proj = perspective_lh(FOV_Y, 16.0 / 9.0, Z_NEAR, Z_FAR);

        let near = proj * Vector4::new(0.0, 0.0, Z_NEAR, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, Z_FAR, 1.0);

        assert!(approx(near.z / near.w, 0.0));
        assert!(approx(far.z / far.w, 1.0));
    }

    #[test]
    fn test_model_matrix_applies_scale_before_translation() {
        let transform = Transform {
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [2.0, 2.0, 2.0],
        };
        let p = model_matrix(&transform) * Vector4::new(1.0, 0.0, 0.0, 1.0);

        assert!(approx(p.x, 3.0));
        assert!(approx(p.y, 2.0));
        assert!(approx(p.z, 3.0));
    }

    #[test]
    fn test_model_matrix_rotation_in_degrees() {
        let transform = Transform {
            rotation: [0.0, 90.0, 0.0],
            ..Transform::default()
        };
        let p = model_matrix(&transform) * Vector4::new(0.0, 0.0, 1.0, 0.0);

        assert!(approx(p.x, 1.0));
        assert!(approx(p.z, 0.0));
    }

    #[test]
    fn test_aspect_ratio_guards_zero() {
        assert!(approx(aspect_ratio(1280, 720), 1280.0 / 720.0));
        assert!(approx(aspect_ratio(0, 720), 1.0));
        assert!(approx(aspect_ratio(1280, 0), 1.0));
    }
}
