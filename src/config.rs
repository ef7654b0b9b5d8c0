//! Run configuration, loaded from JSON
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Command-line flags are applied on top by the binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::octree::OctreeConfig;
use crate::render::{RenderMode, ShaderKind};
use crate::scene::Scene;

/// Explicit camera placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub gaze: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

/// Settings for one culling run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullConfig {
    /// Viewport size in pixels
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees
    pub fovy: f32,
    /// Near plane (negative). Derived from the scene when unset.
    pub near: Option<f32>,
    /// Far plane (negative). Derived from the scene when unset.
    pub far: Option<f32>,
    /// Placed outside the scene's max corner when unset
    pub camera: Option<CameraConfig>,
    pub mode: RenderMode,
    pub shader: ShaderKind,
    pub octree: OctreeConfig,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fovy: 45.0,
            near: None,
            far: None,
            camera: None,
            mode: RenderMode::default(),
            shader: ShaderKind::default(),
            octree: OctreeConfig::default(),
        }
    }
}

impl CullConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: CullConfig = serde_json::from_str(&json)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "viewport must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.fovy > 0.0 && self.fovy < 180.0) {
            return Err(Error::Config(format!("fovy must be in (0, 180) degrees, got {}", self.fovy)));
        }
        if let Some(near) = self.near {
            if !(near < 0.0) {
                return Err(Error::Config(format!("near must be negative, got {}", near)));
            }
        }
        if let Some(far) = self.far {
            if !(far < self.near.unwrap_or(0.0)) {
                return Err(Error::Config(format!("far must be farther than near, got {}", far)));
            }
        }
        if self.octree.max_leaf_triangles == 0 {
            return Err(Error::Config("octree.max_leaf_triangles must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Camera for `scene`: the configured placement, or the default one, with
    /// any configured clip planes applied.
    pub fn camera_for(&self, scene: &Scene) -> Result<Camera> {
        let mut camera = match &self.camera {
            Some(c) => {
                let position = Vec3::from_array(c.position);
                Camera::new(
                    position,
                    self.fovy,
                    self.aspect(),
                    self.near.unwrap_or(-0.1),
                    self.far.unwrap_or_else(|| scene.enclosing_far(position)),
                    Vec3::from_array(c.gaze),
                    Vec3::from_array(c.up),
                )?
            }
            None => scene.default_camera(self.fovy, self.aspect())?,
        };
        if self.near.is_some() || self.far.is_some() {
            let near = self.near.unwrap_or(camera.near());
            let far = self.far.unwrap_or(camera.far());
            camera.set_clip_planes(near, far)?;
        }
        Ok(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Triangle;
    use tempfile::TempDir;

    fn scene() -> Scene {
        Scene::from_triangles(vec![Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y)]).unwrap()
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cull.json");
        std::fs::write(&path, r#"{ "width": 640, "mode": "zpyramid", "octree": { "max_depth": 4 } }"#).unwrap();

        let config = CullConfig::load(&path).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 1080);
        assert_eq!(config.mode, RenderMode::ZPyramid);
        assert_eq!(config.octree.max_depth, 4);
        assert_eq!(config.octree.max_leaf_triangles, 16);
        assert_eq!(config.shader, ShaderKind::Normal);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cull.json");
        let config = CullConfig {
            camera: Some(CameraConfig { position: [0.0, 0.0, 5.0], gaze: [0.0, 0.0, -1.0], up: default_up() }),
            far: Some(-40.0),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(CullConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate() {
        assert!(CullConfig::default().validate().is_ok());
        assert!(CullConfig { width: 0, ..Default::default() }.validate().is_err());
        assert!(CullConfig { fovy: 190.0, ..Default::default() }.validate().is_err());
        assert!(CullConfig { near: Some(0.5), ..Default::default() }.validate().is_err());
        assert!(CullConfig { near: Some(-1.0), far: Some(-0.5), ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_camera_for_explicit_placement() {
        let config = CullConfig {
            camera: Some(CameraConfig { position: [0.0, 0.0, 5.0], gaze: [0.0, 0.0, -1.0], up: default_up() }),
            near: Some(-0.5),
            ..Default::default()
        };
        let camera = config.camera_for(&scene()).unwrap();
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.near(), -0.5);
        assert!(camera.far() < -5.0);
        assert!((camera.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn test_camera_for_default_placement() {
        let config = CullConfig { far: Some(-1000.0), ..Default::default() };
        let scene = scene();
        let camera = config.camera_for(&scene).unwrap();
        assert!(camera.position().x > scene.max().x);
        assert_eq!(camera.far(), -1000.0);
    }
}
