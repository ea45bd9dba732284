use super::fly_camera::CameraState;

/// Input state sampled by the host for one update tick
///
/// The engine never queries the OS for input. The host fills this in from its
/// window events and hands it to [`Engine::update`](crate::engine::Engine::update).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub up: bool,
    /// Right mouse button held
    pub look_active: bool,
    /// Cursor motion in pixels since the previous snapshot
    pub mouse_delta: (f32, f32),
    pub ui_wants_mouse: bool,
    pub ui_wants_keyboard: bool,
}

impl InputSnapshot {
    /// Copy of this snapshot with the mouse motion removed
    ///
    /// Used for the second and later fixed steps of one host iteration so
    /// motion is applied once.
    pub fn without_motion(&self) -> Self {
        Self {
            mouse_delta: (0.0, 0.0),
            ..*self
        }
    }
}

/// WASD/QE movement and right-drag look
pub struct CameraController {
    pub move_speed: f32,
    pub look_sensitivity: f32,
}

impl CameraController {
    pub fn new(move_speed: f32, look_sensitivity: f32) -> Self {
        Self {
            move_speed,
            look_sensitivity,
        }
    }

    pub fn apply(&self, camera: &mut CameraState, input: &InputSnapshot, dt: f32) {
        if input.look_active && !input.ui_wants_mouse {
            let (dx, dy) = input.mouse_delta;
            camera.add_yaw(dx * self.look_sensitivity);
            camera.add_pitch(-dy * self.look_sensitivity);
        }

        if input.ui_wants_keyboard {
            return;
        }

        // Basis is taken after the look update so movement follows the new heading
        let step = self.move_speed * dt;
        let forward = camera.forward();
        let right = camera.right();
        let up = camera.up();

        if input.forward {
            camera.translate(forward * step);
        }
        if input.back {
            camera.translate(-forward * step);
        }
        if input.left {
            camera.translate(-right * step);
        }
        if input.right {
            camera.translate(right * step);
        }
        if input.down {
            camera.translate(-up * step);
        }
        if input.up {
            camera.translate(up * step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    fn controller() -> CameraController {
        CameraController::new(3.0, 0.005)
    }

    #[test]
    fn test_forward_moves_along_view() {
        let mut camera = CameraState::default();
        let input = InputSnapshot {
            forward: true,
            ..Default::default()
        };

        controller().apply(&mut camera, &input, 1.0);

        assert!((camera.position.z - (-0.5)).abs() < 1e-5);
        assert!(camera.position.x.abs() < 1e-5);
    }

    #[test]
    fn test_strafe_and_vertical() {
        let mut camera = CameraState {
            position: Point3::new(0.0, 0.0, 0.0),
            ..CameraState::default()
        };
        let input = InputSnapshot {
            right: true,
            up: true,
            ..Default::default()
        };

        controller().apply(&mut camera, &input, 0.5);

        assert!((camera.position.x - 1.5).abs() < 1e-5);
        assert!((camera.position.y - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_look_requires_right_button() {
        let mut camera = CameraState::default();
        let mut input = InputSnapshot {
            mouse_delta: (100.0, 40.0),
            ..Default::default()
        };

        controller().apply(&mut camera, &input, 0.0);
        assert_eq!(camera.yaw, 0.0);

        input.look_active = true;
        controller().apply(&mut camera, &input, 0.0);
        assert!((camera.yaw - 0.5).abs() < 1e-6);
        assert!((camera.pitch + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_ui_capture_blocks_camera() {
        let mut camera = CameraState::default();
        let input = InputSnapshot {
            forward: true,
            look_active: true,
            mouse_delta: (10.0, 10.0),
            ui_wants_mouse: true,
            ui_wants_keyboard: true,
            ..Default::default()
        };

        controller().apply(&mut camera, &input, 1.0);

        assert_eq!(camera, CameraState::default());
    }

    #[test]
    fn test_without_motion_keeps_keys() {
        let input = InputSnapshot {
            forward: true,
            mouse_delta: (3.0, 4.0),
            ..Default::default()
        };
        let stripped = input.without_motion();

        assert!(stripped.forward);
        assert_eq!(stripped.mouse_delta, (0.0, 0.0));
    }
}
