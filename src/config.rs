//! Viewer configuration with built-in defaults, RON loading and CLI overrides.
//!
//! Every section is `#[serde(default)]`, so a config file only has to name the
//! values it changes:
//!
//! ```ron
//! (
//!     window: (width: 1280, height: 720),
//!     snow: (capacity: 4000),
//!     log_level: "debug",
//! )
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scene::SceneDescription;

/// Command-line arguments. Values given here override the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "winterscape", about = "Outdoor scene viewer")]
pub struct CliArgs {
    /// Path to a RON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory that model and skybox paths are resolved against.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Top-level viewer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub tour: TourConfig,
    pub lighting: LightingConfig,
    pub shadow: ShadowConfig,
    pub snow: SnowConfig,
    pub skybox: SkyboxConfig,
    pub scene: SceneDescription,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            tour: TourConfig::default(),
            lighting: LightingConfig::default(),
            shadow: ShadowConfig::default(),
            snow: SnowConfig::default(),
            skybox: SkyboxConfig::default(),
            scene: SceneDescription::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Winterscape".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

/// Free-fly camera configuration. Angles are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    /// Distance moved per frame while a movement key is held.
    pub move_speed: f32,
    /// Degrees of rotation per pixel of mouse travel.
    pub mouse_sensitivity: f32,
    /// Lowest world-space height the free-fly camera may reach.
    pub floor: f32,
    /// Vertical field of view.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Degrees per frame the user-rotated object turns while Q/E is held.
    pub object_rotation_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            move_speed: 0.5,
            mouse_sensitivity: 0.1,
            floor: 0.0,
            fov: 45.0,
            near: 0.1,
            far: 200.0,
            object_rotation_speed: 1.0,
        }
    }
}

/// Orbit-tour configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TourConfig {
    pub radius: f32,
    /// Fixed camera height while touring.
    pub height: f32,
    pub target: [f32; 3],
    /// Sweep increment. Degrees per frame, or degrees per second when
    /// `time_normalized` is set.
    pub degrees_per_step: f32,
    /// Advance the sweep by elapsed time instead of by frame count.
    pub time_normalized: bool,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            radius: 30.0,
            height: 10.0,
            target: [0.0, 2.0, 0.0],
            degrees_per_step: 0.5,
            time_normalized: false,
        }
    }
}

/// Light placement, colors and initial toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Direction toward the sun in world space (need not be normalized).
    pub sun_direction: [f32; 3],
    pub sun_color: [f32; 3],
    pub sun_enabled: bool,
    pub lantern_position: [f32; 3],
    pub lantern_color: [f32; 3],
    pub lantern_enabled: bool,
    pub campfire_position: [f32; 3],
    pub campfire_color: [f32; 3],
    pub campfire_intensity: f32,
    pub campfire_enabled: bool,
    pub flicker: FlickerConfig,
    pub fog_enabled: bool,
    pub fog_density: f32,
    pub fog_color: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sun_direction: [0.0, 20.0, 20.0],
            sun_color: [0.2, 0.2, 0.2],
            sun_enabled: true,
            lantern_position: [-13.0, 0.6, -4.0],
            lantern_color: [1.0, 0.6, 0.0],
            lantern_enabled: true,
            campfire_position: [-18.0, 0.8, -44.5],
            campfire_color: [1.0, 0.4, 0.0],
            campfire_intensity: 5.0,
            campfire_enabled: true,
            flicker: FlickerConfig::default(),
            fog_enabled: false,
            fog_density: 0.05,
            fog_color: [0.5, 0.5, 0.5],
        }
    }
}

/// `baseline + amplitude_a * sin(t * frequency_a) + amplitude_b * cos(t * frequency_b)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlickerConfig {
    pub baseline: f32,
    pub amplitude_a: f32,
    pub frequency_a: f32,
    pub amplitude_b: f32,
    pub frequency_b: f32,
}

impl Default for FlickerConfig {
    fn default() -> Self {
        Self {
            baseline: 0.8,
            amplitude_a: 0.1,
            frequency_a: 10.0,
            amplitude_b: 0.1,
            frequency_b: 23.0,
        }
    }
}

/// Shadow map resolution and light frustum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowConfig {
    /// Width and height of the square depth target.
    pub resolution: u32,
    /// Symmetric orthographic half-extent.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    /// Distance of the light eye from the origin along the sun direction.
    pub light_distance: f32,
    pub target: [f32; 3],
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 4096,
            half_extent: 150.0,
            near: 0.1,
            far: 400.0,
            light_distance: 150.0,
            target: [0.0, 0.0, 50.0],
        }
    }
}

/// Snow particle pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SnowConfig {
    pub capacity: usize,
    /// Half side length of the horizontal spawn square, centered on the origin.
    pub half_extent: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Particles below this height are recycled.
    pub floor: f32,
    /// Range of downward speed, units per second.
    pub fall_speed: [f32; 2],
    /// Maximum horizontal drift speed, units per second.
    pub jitter: f32,
    pub point_size: f32,
    pub color: [f32; 4],
    pub seed: u64,
    pub enabled: bool,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            capacity: 3000,
            half_extent: 60.0,
            min_height: 2.0,
            max_height: 40.0,
            floor: -1.0,
            fall_speed: [1.0, 3.0],
            jitter: 0.5,
            point_size: 0.08,
            color: [1.0, 1.0, 1.0, 0.85],
            seed: 0x5eed,
            enabled: false,
        }
    }
}

/// Face images for both sky backdrops, in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SkyboxConfig {
    pub day: Vec<PathBuf>,
    pub night: Vec<PathBuf>,
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        Self {
            day: cube_faces("skybox"),
            night: cube_faces("skybox_night"),
        }
    }
}

fn cube_faces(dir: &str) -> Vec<PathBuf> {
    ["posx", "negx", "posy", "negy", "posz", "negz"]
        .iter()
        .map(|face| Path::new(dir).join(format!("{face}.jpg")))
        .collect()
}

impl ViewerConfig {
    /// Load a config from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Resolve the effective config: file (if given) or defaults, then CLI overrides.
    pub fn resolve(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli_overrides(args);
        config.scene.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(root) = &args.assets {
            self.scene.asset_root = root.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = ViewerConfig::from_ron("(window: (width: 640), snow: (capacity: 10))").unwrap();
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 768);
        assert_eq!(config.snow.capacity, 10);
        assert_eq!(config.tour, TourConfig::default());
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = ViewerConfig::default();
        let args = CliArgs {
            width: Some(1920),
            log_level: Some("debug".into()),
            assets: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scene.asset_root, PathBuf::from("/data"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ViewerConfig::load(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        assert!(ViewerConfig::from_ron("(window: (width: \"wide\"))").is_err());
    }

    #[test]
    fn default_skybox_has_six_faces_each() {
        let sky = SkyboxConfig::default();
        assert_eq!(sky.day.len(), 6);
        assert_eq!(sky.night.len(), 6);
        assert_eq!(sky.day[0], Path::new("skybox").join("posx.jpg"));
    }

    #[test]
    fn default_config_round_trips_through_ron() {
        let config = ViewerConfig::default();
        let text = ron::to_string(&config).unwrap();
        assert_eq!(ViewerConfig::from_ron(&text).unwrap(), config);
    }
}
