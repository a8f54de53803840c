//! Free-fly and orbit-tour camera control.
//!
//! [`CameraController`] owns the [`Camera`] and a [`TourState`]. Each frame it
//! either applies held movement keys and mouse-look (free-fly) or places the
//! camera on a fixed circle around the scene (tour).
//!
//! ```ignore
//! let view = controller.update(&input.movement(), mouse.take(), time.delta);
//! ```
//!
//! # Tour speed
//!
//! By default the tour advances a fixed number of degrees per *frame*, so its
//! real-time speed follows the frame rate. Setting
//! [`TourState::time_normalized`] makes the step degrees per *second* instead.

use glam::{Mat4, Vec2, Vec3};

use crate::camera::Camera;
use crate::config::{CameraConfig, TourConfig};
use crate::input::MovementInput;

/// Which mode drove the camera on the last update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMode {
    /// Keyboard movement plus mouse-look, clamped to the floor.
    FreeFly,
    /// Automatic sweep on a circle around the scene.
    Tour,
}

/// Automatic circular camera path.
#[derive(Clone, Debug, PartialEq)]
pub struct TourState {
    pub enabled: bool,
    /// Current sweep angle in degrees.
    pub angle: f32,
    pub radius: f32,
    /// Camera height while touring. Not subject to the floor clamp.
    pub height: f32,
    /// Fixed look-at point.
    pub target: Vec3,
    /// Sweep increment per frame (or per second when `time_normalized`).
    pub step: f32,
    pub time_normalized: bool,
}

impl TourState {
    pub fn from_config(config: &TourConfig) -> Self {
        Self {
            enabled: false,
            angle: 0.0,
            radius: config.radius,
            height: config.height,
            target: Vec3::from_array(config.target),
            step: config.degrees_per_step,
            time_normalized: config.time_normalized,
        }
    }

    /// Camera position on the tour circle at the given angle.
    pub fn position_at(&self, angle_degrees: f32) -> Vec3 {
        let a = angle_degrees.to_radians();
        Vec3::new(a.sin() * self.radius, self.height, a.cos() * self.radius)
    }

    fn advance(&mut self, dt: f32) {
        self.angle += if self.time_normalized {
            self.step * dt
        } else {
            self.step
        };
    }
}

/// Owns the view state and turns input into a view matrix each frame.
#[derive(Clone, Debug)]
pub struct CameraController {
    pub camera: Camera,
    pub tour: TourState,
    /// Distance moved per frame per held direction key.
    pub move_speed: f32,
    /// Lowest Y the free-fly camera may reach.
    pub floor: f32,
    /// Degrees per frame for the object-rotation keys.
    pub object_rotation_speed: f32,
    view: Mat4,
}

impl CameraController {
    pub fn new(camera: &CameraConfig, tour: &TourConfig) -> Self {
        let cam = Camera {
            position: Vec3::from_array(camera.position),
            fov: camera.fov,
            near: camera.near,
            far: camera.far,
            ..Camera::default()
        }
        .with_angles(camera.yaw, camera.pitch);

        Self {
            view: cam.view_matrix(),
            camera: cam,
            tour: TourState::from_config(tour),
            move_speed: camera.move_speed,
            floor: camera.floor,
            object_rotation_speed: camera.object_rotation_speed,
        }
    }

    pub fn mode(&self) -> CameraMode {
        if self.tour.enabled {
            CameraMode::Tour
        } else {
            CameraMode::FreeFly
        }
    }

    /// Turn the tour on or off. The change is picked up by the next
    /// [`update`](Self::update); leaving the tour keeps the tour position.
    pub fn set_tour(&mut self, enabled: bool) {
        self.tour.enabled = enabled;
    }

    pub fn toggle_tour(&mut self) -> bool {
        self.set_tour(!self.tour.enabled);
        self.tour.enabled
    }

    /// View matrix from the most recent update.
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Update the camera from held keys and a (yaw, pitch) mouse offset in degrees.
    pub fn update(&mut self, movement: &MovementInput, look: Vec2, dt: f32) -> Mat4 {
        self.view = match self.mode() {
            CameraMode::Tour => {
                let position = self.tour.position_at(self.tour.angle);
                self.tour.advance(dt);
                self.camera.position = position;
                Mat4::look_at_rh(position, self.tour.target, Vec3::Y)
            }
            CameraMode::FreeFly => {
                self.camera.rotate(look.x, look.y);
                self.apply_movement(movement);
                self.clamp_to_floor();
                self.camera.view_matrix()
            }
        };
        self.view
    }

    /// Rotation in degrees the held Q/E keys apply to the user-rotated object
    /// this frame. Zero while touring.
    pub fn object_rotation_delta(&self, movement: &MovementInput) -> f32 {
        if self.tour.enabled {
            return 0.0;
        }
        let mut delta = 0.0;
        if movement.rotate_ccw {
            delta -= self.object_rotation_speed;
        }
        if movement.rotate_cw {
            delta += self.object_rotation_speed;
        }
        delta
    }

    fn apply_movement(&mut self, movement: &MovementInput) {
        let forward = self.camera.forward();
        let right = self.camera.right();

        if movement.forward {
            self.camera.position += forward * self.move_speed;
        }
        if movement.backward {
            self.camera.position -= forward * self.move_speed;
        }
        if movement.left {
            self.camera.position -= right * self.move_speed;
        }
        if movement.right {
            self.camera.position += right * self.move_speed;
        }
    }

    fn clamp_to_floor(&mut self) {
        if self.camera.position.y < self.floor {
            self.camera.position.y = self.floor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller() -> CameraController {
        CameraController::new(&CameraConfig::default(), &TourConfig::default())
    }

    fn held(f: impl FnOnce(&mut MovementInput)) -> MovementInput {
        let mut m = MovementInput::default();
        f(&mut m);
        m
    }

    #[test]
    fn forward_moves_along_view_direction() {
        let mut c = controller();
        c.update(&held(|m| m.forward = true), Vec2::ZERO, 0.016);
        assert_relative_eq!(c.camera.position.z, 2.5, epsilon = 1e-5);
        c.update(&held(|m| m.right = true), Vec2::ZERO, 0.016);
        assert_relative_eq!(c.camera.position.x, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn free_fly_never_goes_below_floor() {
        let mut c = controller();
        // look steeply down and walk forward
        c.update(&MovementInput::default(), Vec2::new(0.0, -80.0), 0.016);
        for _ in 0..50 {
            c.update(&held(|m| m.forward = true), Vec2::ZERO, 0.016);
            assert!(c.camera.position.y >= c.floor);
        }
        assert_eq!(c.camera.position.y, 0.0);
    }

    #[test]
    fn mouse_pitch_stays_in_range() {
        let mut c = controller();
        for delta in [120.0, -30.0, -400.0, 89.5, 1000.0] {
            c.update(&MovementInput::default(), Vec2::new(3.0, delta), 0.016);
            assert!((-89.0..=89.0).contains(&c.camera.pitch));
        }
    }

    #[test]
    fn tour_starts_at_angle_zero_and_stays_on_circle() {
        let mut c = controller();
        c.set_tour(true);
        c.update(&MovementInput::default(), Vec2::ZERO, 0.016);
        assert_relative_eq!(c.camera.position.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(c.camera.position.y, 10.0);
        assert_relative_eq!(c.camera.position.z, 30.0, epsilon = 1e-5);

        for _ in 0..1000 {
            c.update(&held(|m| m.forward = true), Vec2::new(5.0, 5.0), 0.016);
            let p = c.camera.position;
            assert_relative_eq!(p.x * p.x + p.z * p.z, 900.0, max_relative = 1e-4);
        }
    }

    #[test]
    fn tour_advances_per_frame_not_per_second() {
        let mut c = controller();
        c.set_tour(true);
        c.update(&MovementInput::default(), Vec2::ZERO, 0.001);
        c.update(&MovementInput::default(), Vec2::ZERO, 1.0);
        assert_relative_eq!(c.tour.angle, 1.0);
    }

    #[test]
    fn time_normalized_tour_scales_with_delta() {
        let tour = TourConfig {
            degrees_per_step: 10.0,
            time_normalized: true,
            ..TourConfig::default()
        };
        let mut c = CameraController::new(&CameraConfig::default(), &tour);
        c.set_tour(true);
        c.update(&MovementInput::default(), Vec2::ZERO, 0.5);
        assert_relative_eq!(c.tour.angle, 5.0);
    }

    #[test]
    fn leaving_tour_keeps_position() {
        let mut c = controller();
        c.set_tour(true);
        for _ in 0..10 {
            c.update(&MovementInput::default(), Vec2::ZERO, 0.016);
        }
        let toured = c.camera.position;
        c.set_tour(false);
        c.update(&MovementInput::default(), Vec2::ZERO, 0.016);
        assert_eq!(c.camera.position, toured);
        assert_eq!(c.mode(), CameraMode::FreeFly);
    }

    #[test]
    fn object_rotation_is_not_camera_rotation() {
        let mut c = controller();
        let yaw = c.camera.yaw;
        let m = held(|m| m.rotate_cw = true);
        assert_eq!(c.object_rotation_delta(&m), 1.0);
        c.update(&m, Vec2::ZERO, 0.016);
        assert_eq!(c.camera.yaw, yaw);
        c.set_tour(true);
        assert_eq!(c.object_rotation_delta(&m), 0.0);
    }
}
