//! Sun, lantern and campfire lights plus fog.
//!
//! Every light is always present in the uniform block. A light that is
//! switched off contributes black, so the shader evaluates the same terms
//! every frame and the uniform layout never changes.
//!
//! Point-light positions are sent in eye space because the main pass lights
//! fragments in eye space.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::{FlickerConfig, LightingConfig};

/// On/off state of a single light or effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Switch {
    #[default]
    On,
    Off,
}

impl Switch {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::On } else { Self::Off }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

/// Where a light shines from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Infinitely distant light. Direction points *toward* the light.
    Directional { direction: Vec3 },
    /// Local light at a world-space position.
    Point { position: Vec3 },
}

/// Deterministic campfire flicker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flicker {
    pub baseline: f32,
    pub amplitude_a: f32,
    pub frequency_a: f32,
    pub amplitude_b: f32,
    pub frequency_b: f32,
}

impl Flicker {
    pub fn from_config(config: &FlickerConfig) -> Self {
        Self {
            baseline: config.baseline,
            amplitude_a: config.amplitude_a,
            frequency_a: config.frequency_a,
            amplitude_b: config.amplitude_b,
            frequency_b: config.frequency_b,
        }
    }

    /// Brightness factor at `t` seconds.
    pub fn factor(&self, t: f32) -> f32 {
        self.baseline
            + self.amplitude_a * (t * self.frequency_a).sin()
            + self.amplitude_b * (t * self.frequency_b).cos()
    }
}

/// A light with a base color, an on/off switch and optional animation.
#[derive(Clone, Debug, PartialEq)]
pub struct LightSource {
    pub kind: LightKind,
    pub color: Vec3,
    /// Scalar applied on top of the color (and flicker).
    pub intensity: f32,
    pub switch: Switch,
    pub flicker: Option<Flicker>,
}

impl LightSource {
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional { direction },
            color,
            intensity: 1.0,
            switch: Switch::On,
            flicker: None,
        }
    }

    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Point { position },
            color,
            intensity: 1.0,
            switch: Switch::On,
            flicker: None,
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_flicker(mut self, flicker: Flicker) -> Self {
        self.flicker = Some(flicker);
        self
    }

    pub fn with_switch(mut self, switch: Switch) -> Self {
        self.switch = switch;
        self
    }

    /// Color this light contributes at `t` seconds. Black when switched off.
    pub fn contribution(&self, t: f32) -> Vec3 {
        match self.switch {
            Switch::Off => Vec3::ZERO,
            Switch::On => {
                let animated = self.flicker.map_or(1.0, |f| f.factor(t));
                self.color * animated * self.intensity
            }
        }
    }

    /// Position (point light) or direction (directional) in eye space.
    pub fn eye_space(&self, view: &Mat4) -> Vec3 {
        match self.kind {
            LightKind::Directional { direction } => {
                view.transform_vector3(direction).normalize_or_zero()
            }
            LightKind::Point { position } => view.transform_point3(position),
        }
    }
}

/// Identifies one of the scene's lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightId {
    Sun,
    Lantern,
    Campfire,
}

/// Distance fog parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub switch: Switch,
    pub density: f32,
    pub color: Vec3,
}

/// Lighting uniform block shared by the main pass shader (std140-compatible).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightingUniforms {
    /// xyz = eye-space direction toward the sun.
    pub sun_direction: [f32; 4],
    /// rgb = sun contribution (black when off).
    pub sun_color: [f32; 4],
    /// xyz = eye-space lantern position.
    pub lantern_position: [f32; 4],
    pub lantern_color: [f32; 4],
    /// xyz = eye-space campfire position.
    pub campfire_position: [f32; 4],
    pub campfire_color: [f32; 4],
    /// rgb = fog color, w = density.
    pub fog_color_density: [f32; 4],
    /// x = 1.0 when fog is on.
    pub fog_enabled: [f32; 4],
}

/// Current state of every light and fog.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingState {
    pub sun: LightSource,
    pub lantern: LightSource,
    pub campfire: LightSource,
    pub fog: Fog,
    time: f32,
}

impl LightingState {
    pub fn new(config: &LightingConfig) -> Self {
        Self {
            sun: LightSource::directional(
                Vec3::from_array(config.sun_direction),
                Vec3::from_array(config.sun_color),
            )
            .with_switch(Switch::from_enabled(config.sun_enabled)),
            lantern: LightSource::point(
                Vec3::from_array(config.lantern_position),
                Vec3::from_array(config.lantern_color),
            )
            .with_switch(Switch::from_enabled(config.lantern_enabled)),
            campfire: LightSource::point(
                Vec3::from_array(config.campfire_position),
                Vec3::from_array(config.campfire_color),
            )
            .with_intensity(config.campfire_intensity)
            .with_flicker(Flicker::from_config(&config.flicker))
            .with_switch(Switch::from_enabled(config.campfire_enabled)),
            fog: Fog {
                switch: Switch::from_enabled(config.fog_enabled),
                density: config.fog_density,
                color: Vec3::from_array(config.fog_color),
            },
            time: 0.0,
        }
    }

    pub fn light(&self, id: LightId) -> &LightSource {
        match id {
            LightId::Sun => &self.sun,
            LightId::Lantern => &self.lantern,
            LightId::Campfire => &self.campfire,
        }
    }

    fn light_mut(&mut self, id: LightId) -> &mut LightSource {
        match id {
            LightId::Sun => &mut self.sun,
            LightId::Lantern => &mut self.lantern,
            LightId::Campfire => &mut self.campfire,
        }
    }

    /// Flip a light on or off, returning its new state.
    pub fn toggle(&mut self, id: LightId) -> Switch {
        let light = self.light_mut(id);
        light.switch = light.switch.toggled();
        light.switch
    }

    pub fn toggle_fog(&mut self) -> Switch {
        self.fog.switch = self.fog.switch.toggled();
        self.fog.switch
    }

    pub fn sun_enabled(&self) -> bool {
        self.sun.switch.is_on()
    }

    /// World-space direction toward the sun (unnormalized, as configured).
    pub fn sun_direction(&self) -> Vec3 {
        match self.sun.kind {
            LightKind::Directional { direction } => direction,
            LightKind::Point { position } => position,
        }
    }

    /// Record the wall-clock time used for animated terms this frame.
    pub fn update(&mut self, elapsed: f32) {
        self.time = elapsed;
    }

    /// Compose the uniform block for the given view matrix.
    pub fn uniforms(&self, view: &Mat4) -> LightingUniforms {
        let t = self.time;
        LightingUniforms {
            sun_direction: self.sun.eye_space(view).extend(0.0).to_array(),
            sun_color: self.sun.contribution(t).extend(1.0).to_array(),
            lantern_position: self.lantern.eye_space(view).extend(1.0).to_array(),
            lantern_color: self.lantern.contribution(t).extend(1.0).to_array(),
            campfire_position: self.campfire.eye_space(view).extend(1.0).to_array(),
            campfire_color: self.campfire.contribution(t).extend(1.0).to_array(),
            fog_color_density: self.fog.color.extend(self.fog.density).to_array(),
            fog_enabled: [
                if self.fog.switch.is_on() { 1.0 } else { 0.0 },
                0.0,
                0.0,
                0.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lighting() -> LightingState {
        LightingState::new(&LightingConfig::default())
    }

    #[test]
    fn disabled_lights_are_black_regardless_of_time_or_position() {
        let mut state = lighting();
        state.toggle(LightId::Campfire);
        state.toggle(LightId::Lantern);
        state.toggle(LightId::Sun);
        for t in [0.0, 0.37, 12.5, 999.0] {
            state.update(t);
            let view = Mat4::from_translation(Vec3::new(t, -t, 2.0 * t));
            let u = state.uniforms(&view);
            assert_eq!(&u.campfire_color[..3], &[0.0; 3]);
            assert_eq!(&u.lantern_color[..3], &[0.0; 3]);
            assert_eq!(&u.sun_color[..3], &[0.0; 3]);
        }
    }

    #[test]
    fn campfire_flickers_around_baseline() {
        let state = lighting();
        let flicker = state.campfire.flicker.unwrap();
        assert_relative_eq!(flicker.factor(0.0), 0.9);
        for i in 0..200 {
            let f = flicker.factor(i as f32 * 0.013);
            assert!((0.6..=1.0).contains(&f));
        }
        let c = state.campfire.contribution(0.0);
        assert_relative_eq!(c.x, 1.0 * 0.9 * 5.0, epsilon = 1e-5);
        assert_relative_eq!(c.y, 0.4 * 0.9 * 5.0, epsilon = 1e-5);
        assert_eq!(c.z, 0.0);
    }

    #[test]
    fn dim_sun_leaves_the_campfire_dominant() {
        let state = lighting();
        let sun = state.sun.contribution(0.0);
        assert!((sun - Vec3::splat(0.2)).length() < 1e-6);
        assert!(state.campfire.contribution(0.0).x > 10.0 * sun.x);
    }

    #[test]
    fn toggling_twice_restores_contribution() {
        let mut state = lighting();
        let before = state.lantern.contribution(1.0);
        assert_eq!(state.toggle(LightId::Lantern), Switch::Off);
        assert_eq!(state.toggle(LightId::Lantern), Switch::On);
        assert_eq!(state.lantern.contribution(1.0), before);
    }

    #[test]
    fn point_lights_are_sent_in_eye_space() {
        let state = lighting();
        let view = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = state.uniforms(&view);
        assert_relative_eq!(u.lantern_position[0], -12.0);
        assert_relative_eq!(u.lantern_position[1], 2.6, epsilon = 1e-5);
        assert_relative_eq!(u.lantern_position[2], -1.0);
        // directions ignore translation
        let sun = Vec3::from_slice(&u.sun_direction[..3]);
        assert_relative_eq!(sun.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn fog_flag_follows_toggle() {
        let mut state = lighting();
        assert_eq!(state.uniforms(&Mat4::IDENTITY).fog_enabled[0], 0.0);
        state.toggle_fog();
        assert_eq!(state.uniforms(&Mat4::IDENTITY).fog_enabled[0], 1.0);
    }
}
