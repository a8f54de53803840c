//! The placement table: which model goes where.
//!
//! A [`SceneDescription`] is plain data (loadable from the config file) naming
//! the models and their placements. [`Scene`] is the runtime form with model
//! indices resolved, animated angles, and the transform math shared by the
//! shadow and main passes.
//!
//! # Transform order
//!
//! A placement's model matrix is `translate(position) · rotate(angle, axis) ·
//! scale(scale)`, with the rotation skipped when the angle is zero. An
//! anchored placement (the windmill blades) takes its translation from its
//! parent and adds a local offset before rotating:
//! `translate(parent.position) · translate(offset) · rotate · scale`.

use std::path::PathBuf;

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A model file to load, referenced by name from placements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub path: PathBuf,
}

/// How a placement's rotation angle changes over time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum Animation {
    /// Fixed after construction.
    #[default]
    Static,
    /// Turned by the object-rotation keys.
    UserRotated,
    /// Spins continuously, degrees per frame.
    Spin(f32),
}

/// Places a child relative to another placement's translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnchorSpec {
    /// Name of the parent placement.
    pub parent: String,
    pub offset: [f32; 3],
}

/// One entry of the placement table as written in config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementSpec {
    pub name: String,
    /// Name of a [`ModelSpec`].
    pub model: String,
    pub position: [f32; 3],
    pub scale: [f32; 3],
    /// Initial rotation in degrees.
    pub angle: f32,
    pub axis: [f32; 3],
    pub anchor: Option<AnchorSpec>,
    pub animation: Animation,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            model: String::new(),
            position: [0.0; 3],
            scale: [1.0; 3],
            angle: 0.0,
            axis: [0.0, 1.0, 0.0],
            anchor: None,
            animation: Animation::Static,
        }
    }
}

impl PlacementSpec {
    fn new(name: &str, model: &str, position: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            position,
            ..Self::default()
        }
    }

    fn scaled(mut self, s: f32) -> Self {
        self.scale = [s; 3];
        self
    }
}

/// Models plus their placements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneDescription {
    /// Directory relative model and skybox paths are resolved against.
    pub asset_root: PathBuf,
    pub models: Vec<ModelSpec>,
    pub placements: Vec<PlacementSpec>,
}

impl Default for SceneDescription {
    fn default() -> Self {
        let models = [
            ("teapot", "models/teapot/teapot20segUT.obj"),
            ("ground", "models/ground/ground.obj"),
            ("watch_tower", "models/watch_tower/watch_tower.obj"),
            ("house", "models/house/house.obj"),
            ("trees", "models/trees/trees.obj"),
            ("fence", "models/fence/gard.obj"),
            ("big_tree", "models/big_tree/big_tree.obj"),
            ("big_tree2", "models/big_tree2/big_tree2.obj"),
            ("big_tree3", "models/big_tree3/big_tree3.obj"),
            ("windmill", "models/windmill/windmill.obj"),
            ("blades", "models/blades/blades.obj"),
            ("lantern", "models/lantern/lantern.obj"),
            ("well", "models/well/well.obj"),
            ("cottage", "models/casuta/casuta.obj"),
            ("bear", "models/bear/bear.obj"),
            ("campfire", "models/campfire/campfire.obj"),
        ]
        .into_iter()
        .map(|(name, path)| ModelSpec {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
        .collect();

        let placements = vec![
            PlacementSpec {
                animation: Animation::UserRotated,
                ..PlacementSpec::new("teapot", "teapot", [-5.0, -3.0, 5.0]).scaled(0.25)
            },
            PlacementSpec::new("ground", "ground", [0.0, -1.0, 0.0]),
            PlacementSpec::new("watch_tower", "watch_tower", [2.0, -1.0, -3.0]),
            PlacementSpec::new("house", "house", [-1.0, -0.8, -1.0]),
            PlacementSpec::new("fence", "fence", [0.0, -1.0, 0.0]),
            PlacementSpec::new("trees", "trees", [-2.0, -1.0, -2.0]),
            PlacementSpec::new("big_tree", "big_tree", [3.0, -1.0, -4.0]),
            PlacementSpec::new("big_tree2", "big_tree2", [-3.0, -1.0, -4.0]),
            PlacementSpec::new("big_tree3", "big_tree3", [0.0, -1.0, -5.0]),
            PlacementSpec::new("lantern", "lantern", [-7.0, -0.4, -1.0]).scaled(0.5),
            PlacementSpec::new("well", "well", [5.0, -1.0, 5.0]),
            PlacementSpec::new("cottage", "cottage", [-5.0, -3.0, 5.0]),
            PlacementSpec::new("bear", "bear", [0.0, -0.05, -3.0]).scaled(0.5),
            PlacementSpec::new("windmill", "windmill", [20.0, 20.0, 100.0]).scaled(0.5),
            PlacementSpec::new("campfire", "campfire", [-7.0, -1.1, -5.0]),
            PlacementSpec {
                axis: [0.0, 0.0, 1.0],
                anchor: Some(AnchorSpec {
                    parent: "windmill".to_string(),
                    offset: [0.0, 4.0, -2.8],
                }),
                animation: Animation::Spin(1.0),
                ..PlacementSpec::new("windmill_blades", "blades", [0.0; 3]).scaled(0.5)
            },
        ];

        Self {
            asset_root: PathBuf::from("."),
            models,
            placements,
        }
    }
}

impl SceneDescription {
    /// Check that every model and anchor reference resolves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Scene::from_description(self).map(|_| ())
    }
}

/// Index into the loaded model list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(pub usize);

/// Anchor resolved to a placement index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub parent: usize,
    pub offset: Vec3,
}

/// One drawable instance in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub name: String,
    pub model: ModelId,
    pub position: Vec3,
    pub scale: Vec3,
    /// Rotation in degrees about `axis`.
    pub angle: f32,
    pub axis: Vec3,
    pub anchor: Option<Anchor>,
    pub animation: Animation,
}

/// Runtime placement table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub placements: Vec<Placement>,
}

impl Scene {
    /// Resolve names in a description into model and placement indices.
    ///
    /// Model ids follow the order of `description.models`.
    pub fn from_description(description: &SceneDescription) -> Result<Self, ConfigError> {
        let model_index = |name: &str| {
            description
                .models
                .iter()
                .position(|m| m.name == name)
                .map(ModelId)
                .ok_or_else(|| ConfigError::InvalidScene(format!("unknown model '{name}'")))
        };

        let mut placements = Vec::with_capacity(description.placements.len());
        for spec in &description.placements {
            let anchor = match &spec.anchor {
                Some(anchor) => {
                    let parent = description
                        .placements
                        .iter()
                        .position(|p| p.name == anchor.parent)
                        .ok_or_else(|| {
                            ConfigError::InvalidScene(format!(
                                "placement '{}' is anchored to unknown '{}'",
                                spec.name, anchor.parent
                            ))
                        })?;
                    if description.placements[parent].anchor.is_some() {
                        return Err(ConfigError::InvalidScene(format!(
                            "placement '{}' is anchored to '{}', which is itself anchored",
                            spec.name, anchor.parent
                        )));
                    }
                    Some(Anchor {
                        parent,
                        offset: Vec3::from_array(anchor.offset),
                    })
                }
                None => None,
            };

            placements.push(Placement {
                name: spec.name.clone(),
                model: model_index(&spec.model)?,
                position: Vec3::from_array(spec.position),
                scale: Vec3::from_array(spec.scale),
                angle: spec.angle,
                axis: Vec3::from_array(spec.axis).normalize_or(Vec3::Y),
                anchor,
                animation: spec.animation,
            });
        }

        Ok(Self { placements })
    }

    /// Advance animated placements by one frame.
    ///
    /// `user_rotation` is the object-rotation offset in degrees for this frame.
    pub fn animate(&mut self, user_rotation: f32) {
        for placement in &mut self.placements {
            match placement.animation {
                Animation::Static => {}
                Animation::UserRotated => placement.angle += user_rotation,
                Animation::Spin(degrees) => placement.angle += degrees,
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.name == name)
    }

    /// World transform of the placement at `index`.
    pub fn model_matrix(&self, index: usize) -> Mat4 {
        let placement = &self.placements[index];
        let translation = match placement.anchor {
            Some(anchor) => {
                Mat4::from_translation(self.placements[anchor.parent].position)
                    * Mat4::from_translation(anchor.offset)
            }
            None => Mat4::from_translation(placement.position),
        };

        let rotation = if placement.angle != 0.0 {
            Mat4::from_axis_angle(placement.axis, placement.angle.to_radians())
        } else {
            Mat4::IDENTITY
        };

        translation * rotation * Mat4::from_scale(placement.scale)
    }
}

/// Inverse-transpose of the linear part of `view · model`, for eye-space normals.
pub fn normal_matrix(view: &Mat4, model: &Mat4) -> Mat3 {
    Mat3::from_mat4(*view * *model).inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_scene_resolves() {
        let scene = Scene::from_description(&SceneDescription::default()).unwrap();
        assert_eq!(scene.placements.len(), 16);
        let blades = scene.find("windmill_blades").unwrap();
        let base = scene.placements.iter().position(|p| p.name == "windmill").unwrap();
        assert_eq!(blades.anchor.unwrap().parent, base);
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut description = SceneDescription::default();
        description.placements[0].model = "dragon".into();
        assert!(matches!(
            Scene::from_description(&description),
            Err(ConfigError::InvalidScene(_))
        ));
    }

    #[test]
    fn unknown_anchor_is_rejected() {
        let mut description = SceneDescription::default();
        let last = description.placements.len() - 1;
        description.placements[last].anchor.as_mut().unwrap().parent = "mill".into();
        assert!(description.validate().is_err());
    }

    #[test]
    fn model_matrix_is_translate_rotate_scale() {
        let scene = Scene::from_description(&SceneDescription::default()).unwrap();
        let lantern = scene.placements.iter().position(|p| p.name == "lantern").unwrap();
        let m = scene.model_matrix(lantern);
        let p = m.transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(p.x, -6.0);
        assert_relative_eq!(p.y, -0.4);
        assert_relative_eq!(p.z, -1.0);
    }

    #[test]
    fn user_rotation_only_turns_the_teapot() {
        let mut scene = Scene::from_description(&SceneDescription::default()).unwrap();
        scene.animate(3.0);
        assert_eq!(scene.find("teapot").unwrap().angle, 3.0);
        assert_eq!(scene.find("house").unwrap().angle, 0.0);
        assert_eq!(scene.find("windmill_blades").unwrap().angle, 1.0);
    }

    #[test]
    fn blades_follow_the_base_and_spin_about_z() {
        let mut scene = Scene::from_description(&SceneDescription::default()).unwrap();
        let idx = scene
            .placements
            .iter()
            .position(|p| p.name == "windmill_blades")
            .unwrap();
        let hub = scene.model_matrix(idx).transform_point3(Vec3::ZERO);
        assert!((hub - Vec3::new(20.0, 24.0, 97.2)).length() < 1e-4);

        for _ in 0..90 {
            scene.animate(0.0);
        }
        // a point on the blade's local +X now points along +Y (scaled by 0.5)
        let tip = scene.model_matrix(idx).transform_point3(Vec3::X * 2.0);
        assert!((tip - Vec3::new(20.0, 25.0, 97.2)).length() < 1e-4);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(&Mat4::IDENTITY, &model);
        let normal = (n * Vec3::new(1.0, 1.0, 0.0)).normalize();
        // the stretched tangent (2,-1,0) stays perpendicular to the normal
        let tangent = model.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert_relative_eq!(normal.dot(tangent), 0.0, epsilon = 1e-5);
    }
}
