//! All mutable viewer state in one place.
//!
//! [`RenderContext`] owns the camera, lights, placement table, snow pool,
//! render mode and raw input state. It touches no GPU resources, so a whole
//! frame of simulation can run headless:
//!
//! ```ignore
//! let mut ctx = RenderContext::new(&ViewerConfig::default())?;
//! ctx.begin_frame(queue.drain(), clock.tick());
//! renderer.render(&ctx)?;
//! ```

use glam::{Mat4, Vec3};
use winit::keyboard::KeyCode;

use crate::camera_controller::CameraController;
use crate::clock::FrameTime;
use crate::config::{ShadowConfig, ViewerConfig};
use crate::error::ConfigError;
use crate::input::{Command, Input, InputEvent, MouseLook};
use crate::lighting::{LightId, LightingState, LightingUniforms};
use crate::particles::SnowPool;
use crate::render_mode::RenderMode;
use crate::scene::Scene;
use crate::shadow::light_space_transform;

/// Viewer state advanced once per frame.
pub struct RenderContext {
    pub controller: CameraController,
    pub lighting: LightingState,
    pub scene: Scene,
    pub snow: SnowPool,
    pub render_mode: RenderMode,
    input: Input,
    mouse: MouseLook,
    shadow: ShadowConfig,
    viewport: (u32, u32),
    time: FrameTime,
    quit: bool,
}

impl RenderContext {
    pub fn new(config: &ViewerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            controller: CameraController::new(&config.camera, &config.tour),
            lighting: LightingState::new(&config.lighting),
            scene: Scene::from_description(&config.scene)?,
            snow: SnowPool::new(&config.snow),
            render_mode: RenderMode::default(),
            input: Input::new(),
            mouse: MouseLook::new(config.camera.mouse_sensitivity),
            shadow: config.shadow.clone(),
            viewport: (config.window.width.max(1), config.window.height.max(1)),
            time: FrameTime::default(),
            quit: false,
        })
    }

    /// Apply one input event. Only records state; nothing is simulated here.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { code, pressed } => {
                let fresh = self.input.set_key(code, pressed);
                if fresh {
                    if let Some(command) = Command::from_key(code) {
                        self.apply_command(command);
                    }
                }
            }
            InputEvent::MouseMotion(delta) => self.mouse.moved(delta),
            InputEvent::Resized { width, height } => {
                if width > 0 && height > 0 {
                    self.viewport = (width, height);
                }
            }
        }
    }

    pub fn apply_command(&mut self, command: Command) {
        match command {
            Command::RenderSolid => self.set_render_mode(RenderMode::Solid),
            Command::RenderWireframe => self.set_render_mode(RenderMode::Wireframe),
            Command::RenderPoint => self.set_render_mode(RenderMode::Point),
            Command::ToggleFog => {
                let state = self.lighting.toggle_fog();
                log::info!("Fog {}", on_off(state.is_on()));
            }
            Command::ToggleTour => {
                let touring = self.controller.toggle_tour();
                log::info!("Tour mode {}", on_off(touring));
            }
            Command::ToggleSnow => {
                let state = self.snow.toggle();
                log::info!("Snow {}", on_off(state.is_on()));
            }
            Command::ToggleLantern => self.toggle_light(LightId::Lantern),
            Command::ToggleCampfire => self.toggle_light(LightId::Campfire),
            Command::ToggleSun => self.toggle_light(LightId::Sun),
            Command::Quit => {
                log::info!("Quit requested");
                self.quit = true;
            }
        }
    }

    fn set_render_mode(&mut self, mode: RenderMode) {
        if self.render_mode != mode {
            log::info!("Render mode {mode:?}");
        }
        self.render_mode = mode;
    }

    fn toggle_light(&mut self, id: LightId) {
        let state = self.lighting.toggle(id);
        log::info!("{id:?} {}", on_off(state.is_on()));
    }

    /// Run the simulation half of a frame.
    ///
    /// Events are applied first, then the camera, lights, placements and snow
    /// are advanced in that order.
    pub fn begin_frame(&mut self, events: impl IntoIterator<Item = InputEvent>, time: FrameTime) {
        for event in events {
            self.handle_event(event);
        }
        self.time = time;

        let movement = self.input.movement();
        let look = self.mouse.take();
        self.controller.update(&movement, look, time.delta);

        self.lighting.update(time.elapsed);

        let rotation = self.controller.object_rotation_delta(&movement);
        self.scene.animate(rotation);

        self.snow.update(time.delta);
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.input.key_down(key)
    }

    pub fn time(&self) -> FrameTime {
        self.time
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1 as f32
    }

    pub fn camera_position(&self) -> Vec3 {
        self.controller.camera.position
    }

    pub fn view(&self) -> Mat4 {
        self.controller.view()
    }

    pub fn projection(&self) -> Mat4 {
        self.controller.camera.projection_matrix(self.aspect())
    }

    /// Sun frustum for this frame; shared by the depth and main passes.
    pub fn light_space(&self) -> Mat4 {
        light_space_transform(self.lighting.sun_direction(), &self.shadow)
    }

    pub fn lighting_uniforms(&self) -> LightingUniforms {
        self.lighting.uniforms(&self.view())
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_controller::CameraMode;
    use glam::Vec2;

    fn context() -> RenderContext {
        RenderContext::new(&ViewerConfig::default()).unwrap()
    }

    fn press(code: KeyCode) -> [InputEvent; 2] {
        [
            InputEvent::Key {
                code,
                pressed: true,
            },
            InputEvent::Key {
                code,
                pressed: false,
            },
        ]
    }

    fn frame(n: u64) -> FrameTime {
        FrameTime::new(n as f32 / 60.0, 1.0 / 60.0, n)
    }

    #[test]
    fn render_mode_commands() {
        let mut ctx = context();
        let start = ctx.render_mode.polygon_mode();
        ctx.begin_frame(press(KeyCode::Digit2), frame(0));
        assert_eq!(ctx.render_mode, RenderMode::Wireframe);
        ctx.begin_frame(press(KeyCode::Digit3), frame(1));
        assert_eq!(ctx.render_mode, RenderMode::Point);
        ctx.begin_frame(press(KeyCode::Digit1), frame(2));
        assert_eq!(ctx.render_mode, RenderMode::Solid);
        assert_eq!(ctx.render_mode.polygon_mode(), start);
    }

    #[test]
    fn held_key_toggles_once() {
        let mut ctx = context();
        let held = InputEvent::Key {
            code: KeyCode::KeyF,
            pressed: true,
        };
        ctx.begin_frame([held, held, held], frame(0));
        assert!(ctx.lighting.fog.switch.is_on());
    }

    #[test]
    fn escape_requests_quit() {
        let mut ctx = context();
        assert!(!ctx.should_quit());
        ctx.begin_frame(press(KeyCode::Escape), frame(0));
        assert!(ctx.should_quit());
    }

    #[test]
    fn held_w_moves_forward_each_frame() {
        let mut ctx = context();
        let start = ctx.camera_position();
        ctx.begin_frame(
            [InputEvent::Key {
                code: KeyCode::KeyW,
                pressed: true,
            }],
            frame(0),
        );
        ctx.begin_frame([], frame(1));
        // default yaw looks down -Z
        assert!((ctx.camera_position().z - (start.z - 1.0)).abs() < 1e-5);
    }

    #[test]
    fn q_and_e_rotate_the_teapot_not_the_camera() {
        let mut ctx = context();
        let yaw = ctx.controller.camera.yaw;
        ctx.begin_frame(
            [InputEvent::Key {
                code: KeyCode::KeyE,
                pressed: true,
            }],
            frame(0),
        );
        assert_eq!(ctx.controller.camera.yaw, yaw);
        assert_eq!(ctx.scene.find("teapot").unwrap().angle, 1.0);
    }

    #[test]
    fn mouse_look_turns_the_camera_after_baseline() {
        let mut ctx = context();
        ctx.begin_frame([InputEvent::MouseMotion(Vec2::new(100.0, 100.0))], frame(0));
        assert_eq!(ctx.controller.camera.yaw, -90.0);
        ctx.begin_frame([InputEvent::MouseMotion(Vec2::new(50.0, 0.0))], frame(1));
        assert!((ctx.controller.camera.yaw - -85.0).abs() < 1e-4);
    }

    #[test]
    fn mouse_look_keeps_turning_past_a_half_turn() {
        let mut ctx = context();
        ctx.begin_frame([InputEvent::MouseMotion(Vec2::ZERO)], frame(0));
        // 0.1°/unit by default: 40 frames of 100 units is 400°.
        for n in 1..=40 {
            ctx.begin_frame([InputEvent::MouseMotion(Vec2::new(100.0, 0.0))], frame(n));
        }
        assert!((ctx.controller.camera.yaw - 310.0).abs() < 1e-2);
        assert_eq!(ctx.controller.camera.pitch, 0.0);
    }

    #[test]
    fn resize_updates_aspect_and_ignores_zero() {
        let mut ctx = context();
        ctx.handle_event(InputEvent::Resized {
            width: 1600,
            height: 800,
        });
        assert_eq!(ctx.aspect(), 2.0);
        ctx.handle_event(InputEvent::Resized {
            width: 0,
            height: 0,
        });
        assert_eq!(ctx.viewport(), (1600, 800));
    }

    #[test]
    fn light_space_ignores_the_camera() {
        let mut ctx = context();
        let before = ctx.light_space();
        ctx.begin_frame(press(KeyCode::KeyP), frame(0));
        ctx.begin_frame([], frame(1));
        assert_eq!(ctx.controller.mode(), CameraMode::Tour);
        assert_eq!(before.to_cols_array(), ctx.light_space().to_cols_array());
    }

    #[test]
    fn windmill_blades_spin_every_frame() {
        let mut ctx = context();
        for n in 0..10 {
            ctx.begin_frame([], frame(n));
        }
        assert_eq!(ctx.scene.find("windmill_blades").unwrap().angle, 10.0);
        assert_eq!(ctx.scene.find("windmill").unwrap().angle, 0.0);
    }
}
