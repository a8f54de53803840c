//! # Winterscape
//!
//! **A real-time outdoor scene viewer: a snowy village lit by the sun, a
//! lantern and a flickering campfire.**
//!
//! Every frame runs the same fixed sequence on one thread:
//!
//! 1. input events queued since the last frame are applied
//! 2. the camera moves (free-fly or the orbit tour)
//! 3. lights, animated placements and snow advance
//! 4. the sun's shadow map is rendered
//! 5. the placements are drawn lit, fogged and shadowed
//! 6. the day or night sky fills the background
//! 7. snow is blended on top
//!
//! Steps 1–3 live in [`RenderContext`], which has no GPU dependency and can be
//! driven headless. Steps 4–7 are the [`Renderer`].
//!
//! ## Controls
//!
//! | Key         | Action                          |
//! |-------------|---------------------------------|
//! | W A S D     | Move                            |
//! | Mouse       | Look                            |
//! | Q / E       | Rotate the teapot               |
//! | 1 / 2 / 3   | Solid / wireframe / point       |
//! | F           | Fog                             |
//! | P           | Orbit tour                      |
//! | N           | Snow                            |
//! | L / C / T   | Lantern / campfire / sun        |
//! | Escape      | Quit                            |
//!
//! ## Quick Start
//!
//! ```no_run
//! use winterscape::ViewerConfig;
//!
//! fn main() -> Result<(), winterscape::ViewerError> {
//!     winterscape::run(ViewerConfig::default())
//! }
//! ```

mod app;
mod camera;
mod camera_controller;
mod clock;
mod compositor;
mod config;
mod context;
mod error;
mod geometry;
mod gpu;
mod input;
mod lighting;
mod mesh;
mod particles;
mod program;
mod render_mode;
mod renderer;
mod scene;
mod shadow;
mod skybox;
mod texture;

pub use app::run;
pub use camera::Camera;
pub use camera_controller::{CameraController, CameraMode, TourState};
pub use clock::{FrameClock, FrameTime};
pub use compositor::{FrameUniforms, SceneCompositor};
pub use config::{
    CameraConfig, CliArgs, FlickerConfig, LightingConfig, ShadowConfig, SkyboxConfig, SnowConfig,
    TourConfig, ViewerConfig, WindowConfig,
};
pub use context::RenderContext;
pub use error::{AssetError, ConfigError, ViewerError};
pub use geometry::{ModelData, RawGeometry, load_model};
pub use gpu::GpuContext;
pub use input::{Command, EventQueue, Input, InputEvent, MouseLook, MovementInput};
pub use lighting::{Flicker, Fog, LightId, LightKind, LightSource, LightingState, LightingUniforms, Switch};
pub use mesh::{Mesh, Model, ModelPart, Vertex3d};
pub use particles::{SnowBounds, SnowParticle, SnowPass, SnowPool};
pub use program::{ObjectUniforms, UniformLayout, UniformSlot};
pub use render_mode::RenderMode;
pub use renderer::Renderer;
pub use scene::{
    Anchor, AnchorSpec, Animation, ModelId, ModelSpec, Placement, PlacementSpec, Scene,
    SceneDescription, normal_matrix,
};
pub use shadow::{ShadowMap, ShadowPass, light_space_transform};
pub use skybox::{Sky, SkyboxSelector};
pub use texture::{Cubemap, Texture};

// Re-export commonly used types
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
pub use winit::keyboard::KeyCode;
