//! Free-look camera driven by pointer and key events.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Rotation sensitivity in degrees per pointer pixel.
const ROTATE_SPEED: f32 = 0.3;
/// Translation speed in world units per frame.
const MOVE_SPEED: f32 = 0.05;

/// Pointer buttons the camera distinguishes. Secondary (right) is the look button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Per-frame movement key state, polled by the host event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// First-person camera with yaw/pitch orientation.
///
/// Invariants: `yaw` is wrapped into [0, 360) and `pitch` is clamped to
/// [-89, 89] after every update. Orientation only changes while the look
/// button is held.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Heading in degrees, wrapped to [0, 360).
    pub yaw: f32,
    /// Elevation in degrees, clamped to [-89, 89].
    pub pitch: f32,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    control_enabled: bool,
    prev_pointer: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.5, 8.0),
            yaw: 0.0,
            pitch: -20.0,
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            control_enabled: false,
            prev_pointer: Vec2::ZERO,
        }
    }
}

impl Camera {
    /// View direction derived from yaw/pitch: rotY(yaw) * rotX(pitch) * -Z.
    pub fn front(&self) -> Vec3 {
        let rot = Mat4::from_rotation_y(self.yaw.to_radians())
            * Mat4::from_rotation_x(self.pitch.to_radians());
        (rot * Vec4::new(0.0, 0.0, -1.0, 0.0)).truncate()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front(), self.up)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    pub fn control_enabled(&self) -> bool {
        self.control_enabled
    }

    /// Reset pose to the startup view.
    pub fn reset(&mut self) {
        self.position = Vec3::new(0.0, 2.5, 8.0);
        self.yaw = 0.0;
        self.pitch = -20.0;
    }

    /// Absolute pointer position update. Rotates the view by the delta against
    /// the last recorded position while the look button is held.
    pub fn handle_move(&mut self, x: f32, y: f32) {
        if !self.control_enabled {
            return;
        }
        let pos = Vec2::new(x, y);
        let delta = pos - self.prev_pointer;

        self.yaw = (self.yaw - delta.x * ROTATE_SPEED).rem_euclid(360.0);
        self.pitch = (self.pitch - delta.y * ROTATE_SPEED).clamp(-89.0, 89.0);

        self.prev_pointer = pos;
    }

    /// Look-button press enables control and resets the reference position;
    /// release disables it. Other buttons are ignored.
    pub fn handle_button(&mut self, button: PointerButton, pressed: bool, x: f32, y: f32) {
        if button != PointerButton::Secondary {
            return;
        }
        if pressed {
            self.prev_pointer = Vec2::new(x, y);
            self.control_enabled = true;
        } else {
            self.control_enabled = false;
        }
    }

    /// Fixed-speed translation along the current basis, while control is held.
    pub fn handle_keys(&mut self, keys: &MoveKeys) {
        if !self.control_enabled {
            return;
        }
        let front = self.front();
        if keys.forward {
            self.position += MOVE_SPEED * front;
        }
        if keys.back {
            self.position -= MOVE_SPEED * front;
        }

        let right = self.up.cross(-front).normalize();
        if keys.right {
            self.position += MOVE_SPEED * right;
        }
        if keys.left {
            self.position -= MOVE_SPEED * right;
        }

        let up = (-front).cross(right).normalize();
        if keys.up {
            self.position += MOVE_SPEED * up;
        }
        if keys.down {
            self.position -= MOVE_SPEED * up;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn looking(camera: &mut Camera) {
        camera.handle_button(PointerButton::Secondary, true, 100.0, 100.0);
    }

    #[test]
    fn yaw_wraps_and_pitch_clamps() {
        let mut camera = Camera::default();
        looking(&mut camera);

        // Large sweeps in both axes, several frames.
        let moves = [
            (100.0, 100.0),
            (-2000.0, 900.0),
            (5000.0, -5000.0),
            (43.5, 12.25),
            (-1.0, 100000.0),
        ];
        for (x, y) in moves {
            camera.handle_move(x, y);
            assert!(camera.yaw >= 0.0 && camera.yaw < 360.0, "yaw={}", camera.yaw);
            assert!(
                camera.pitch >= -89.0 && camera.pitch <= 89.0,
                "pitch={}",
                camera.pitch
            );
        }
    }

    #[test]
    fn move_rotates_by_delta() {
        let mut camera = Camera::default();
        looking(&mut camera);
        camera.handle_move(110.0, 100.0); // dx = +10
        assert!((camera.yaw - 357.0).abs() < EPS); // 0 - 10*0.3, wrapped
        camera.handle_move(110.0, 90.0); // dy = -10
        assert!((camera.pitch - (-17.0)).abs() < EPS); // -20 + 3
    }

    #[test]
    fn events_ignored_while_control_disabled() {
        let mut camera = Camera::default();
        let (yaw, pitch, pos) = (camera.yaw, camera.pitch, camera.position);

        camera.handle_move(500.0, 500.0);
        camera.handle_keys(&MoveKeys {
            forward: true,
            ..Default::default()
        });
        assert_eq!(camera.yaw, yaw);
        assert_eq!(camera.pitch, pitch);
        assert_eq!(camera.position, pos);

        // Non-look buttons never enable control.
        camera.handle_button(PointerButton::Primary, true, 0.0, 0.0);
        assert!(!camera.control_enabled());
    }

    #[test]
    fn control_spans_press_to_release() {
        let mut camera = Camera::default();
        camera.handle_button(PointerButton::Secondary, true, 10.0, 10.0);
        assert!(camera.control_enabled());
        camera.handle_button(PointerButton::Secondary, false, 10.0, 10.0);
        assert!(!camera.control_enabled());
    }

    #[test]
    fn press_resets_reference_position() {
        let mut camera = Camera::default();
        looking(&mut camera);
        camera.handle_move(200.0, 100.0);
        let yaw = camera.yaw;

        // Re-press far away: the next move must be measured from the new origin.
        camera.handle_button(PointerButton::Secondary, false, 0.0, 0.0);
        camera.handle_button(PointerButton::Secondary, true, 900.0, 900.0);
        camera.handle_move(900.0, 900.0);
        assert!((camera.yaw - yaw).abs() < EPS);
    }

    #[test]
    fn front_matches_yaw_pitch() {
        let mut camera = Camera::default();
        camera.yaw = 0.0;
        camera.pitch = 0.0;
        let front = camera.front();
        assert!((front - Vec3::new(0.0, 0.0, -1.0)).length() < EPS);

        camera.yaw = 90.0;
        let front = camera.front();
        assert!((front - Vec3::new(-1.0, 0.0, 0.0)).length() < EPS);
    }

    #[test]
    fn keys_translate_along_basis() {
        let mut camera = Camera::default();
        camera.yaw = 0.0;
        camera.pitch = 0.0;
        looking(&mut camera);
        let start = camera.position;

        camera.handle_keys(&MoveKeys {
            forward: true,
            ..Default::default()
        });
        assert!((camera.position - (start + Vec3::new(0.0, 0.0, -0.05))).length() < EPS);

        camera.handle_keys(&MoveKeys {
            right: true,
            ..Default::default()
        });
        assert!((camera.position.x - 0.05).abs() < EPS);
    }
}
