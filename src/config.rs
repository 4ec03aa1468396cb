//! Showroom configuration.
//!
//! [`ShowroomConfig::default`] describes the built-in showroom: a main hall with
//! three stands, each leading to its own detail scene. A JSON file can override
//! any subset of the fields; missing fields keep their defaults.
//!
//! ```json
//! {
//!   "stands": [
//!     { "id": 1, "texture": "textures/texture1.png", "position": [3.0, 0.0, -1.0] }
//!   ],
//!   "post": { "bloom_strength": 0.2 }
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VitrineError};
use crate::parallax;
use crate::pipeline::QualityTier;
use crate::scene::Easing;

/// Top-level configuration for a showroom session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowroomConfig {
    pub window: WindowConfig,
    /// Stands placed in the main hall, in registration order.
    pub stands: Vec<StandConfig>,
    pub main_camera: CameraConfig,
    /// Camera used by every stand detail scene.
    pub stand_camera: CameraConfig,
    pub post: PostProcessParams,
    pub glass: GlassParams,
    pub transition: TransitionConfig,
    pub interaction: InteractionConfig,
    /// Forces a quality tier instead of detecting one from the viewport.
    pub quality: Option<QualityTier>,
    /// Equirectangular HDR used as the scene background.
    pub environment_map: String,
    /// Directory every asset path is resolved against.
    pub asset_root: PathBuf,
}

impl Default for ShowroomConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            stands: vec![
                StandConfig::new(1, "textures/texture1.png", [3.0, 0.0, -1.0]),
                StandConfig::new(2, "textures/cssAwwords.png", [-3.0, 0.0, -1.0]),
                StandConfig::new(3, "textures/awwords.png", [0.0, 0.0, 1.5]),
            ],
            main_camera: CameraConfig {
                fov_degrees: 75.0,
                near: 0.1,
                far: 1000.0,
                position: [5.0, 4.0, 5.0],
                target: [0.0, 1.0, 0.0],
                mode: CameraMode::Orbit,
            },
            stand_camera: CameraConfig {
                fov_degrees: 60.0,
                near: 0.1,
                far: 100.0,
                position: [0.0, 2.0, 4.0],
                target: [0.0, 1.0, 0.0],
                mode: CameraMode::parallax(),
            },
            post: PostProcessParams::default(),
            glass: GlassParams::default(),
            transition: TransitionConfig::default(),
            interaction: InteractionConfig::default(),
            quality: None,
            environment_map: "textures/venice_sunset_1k.hdr".to_string(),
            asset_root: PathBuf::from("assets"),
        }
    }
}

impl ShowroomConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON configuration string.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stand in &self.stands {
            if stand.id == 0 {
                return Err(VitrineError::Config(
                    "stand id 0 is reserved for the main scene".to_string(),
                ));
            }
            if !seen.insert(stand.id) {
                return Err(VitrineError::Config(format!(
                    "stand id {} is configured more than once",
                    stand.id
                )));
            }
        }
        if self.transition.duration_ms == 0 {
            return Err(VitrineError::Config(
                "transition duration must be positive".to_string(),
            ));
        }
        if self.transition.threshold <= 0.0 {
            return Err(VitrineError::Config(
                "transition threshold must be positive".to_string(),
            ));
        }
        if self.transition.patterns.is_empty() {
            return Err(VitrineError::Config(
                "at least one wipe pattern is required".to_string(),
            ));
        }
        if self.transition.default_pattern >= self.transition.patterns.len() {
            return Err(VitrineError::Config(format!(
                "default wipe pattern {} is out of range ({} patterns)",
                self.transition.default_pattern,
                self.transition.patterns.len()
            )));
        }
        Ok(())
    }

    /// Resolves an asset path against [`asset_root`](Self::asset_root).
    pub fn asset_path(&self, relative: &str) -> PathBuf {
        self.asset_root.join(relative)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vitrine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// One stand in the main hall and the detail scene it leads to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandConfig {
    /// Scene index of the detail scene; also the stand's identity.
    pub id: u32,
    /// Artwork shown on the stand's billboard.
    pub texture: String,
    pub position: [f32; 3],
}

impl StandConfig {
    pub fn new(id: u32, texture: &str, position: [f32; 3]) -> Self {
        Self {
            id,
            texture: texture.to_string(),
            position,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    /// Look-at point, also the orbit pivot.
    pub target: [f32; 3],
    pub mode: CameraMode,
}

/// How a scene's camera responds to the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraMode {
    /// Drag to orbit, scroll to zoom.
    Orbit,
    /// Camera leans toward the pointer around its rest pose.
    Parallax {
        /// Largest deflection from the rest pose, in degrees.
        max_angle_deg: f32,
        /// Approach rate per second toward the pointer-driven pose.
        smoothing: f32,
    },
}

impl CameraMode {
    pub fn parallax() -> Self {
        Self::Parallax {
            max_angle_deg: parallax::DEFAULT_MAX_ANGLE_DEG,
            smoothing: parallax::DEFAULT_SMOOTHING,
        }
    }
}

/// Tunables shared by every post-processing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessParams {
    /// Overall strength of the depth-of-field blur.
    pub blur_amount: f32,
    /// Box blur kernel radius in taps.
    pub blur_size: f32,
    /// Texel spacing between box blur taps.
    pub blur_spread: f32,
    /// Distance from the focus plane where blur starts.
    pub dof_min_distance: f32,
    /// Distance from the focus plane where blur is complete.
    pub dof_max_distance: f32,
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub bloom_threshold: f32,
}

impl Default for PostProcessParams {
    fn default() -> Self {
        Self {
            blur_amount: 1.0,
            blur_size: 2.0,
            blur_spread: 4.0,
            dof_min_distance: 1.0,
            dof_max_distance: 3.0,
            bloom_strength: 0.1,
            bloom_radius: 0.23,
            bloom_threshold: 0.373,
        }
    }
}

/// Parameters for the glass tops of the stands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlassParams {
    pub color: [f32; 3],
    pub transmission: f32,
    pub thickness: f32,
    pub roughness: f32,
    pub ior: f32,
    pub metalness: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub dispersion: f32,
    pub env_map_intensity: f32,
}

impl Default for GlassParams {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            transmission: 1.0,
            thickness: 1.5,
            roughness: 0.0,
            ior: 1.15,
            metalness: 0.0,
            clearcoat: 1.0,
            clearcoat_roughness: 0.1,
            dispersion: 0.25,
            env_map_intensity: 1.0,
        }
    }
}

impl GlassParams {
    /// Opacity approximated from transmission and thickness.
    pub fn opacity(&self) -> f32 {
        let absorbed = (1.0 - self.transmission).clamp(0.0, 1.0);
        (0.15 + absorbed * 0.85 + self.thickness * 0.02).clamp(0.05, 1.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub duration_ms: u64,
    /// Softness of the wipe edge.
    pub threshold: f32,
    pub easing: Easing,
    /// Wipe pattern textures, grayscale.
    pub patterns: Vec<String>,
    /// Pattern used when the destination has no dedicated one.
    pub default_pattern: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1200,
            threshold: 0.3,
            easing: Easing::Linear,
            patterns: (1..=6)
                .map(|i| format!("textures/transition/transition{i}.png"))
                .collect(),
            default_pattern: 0,
        }
    }
}

impl TransitionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Longest press-release gap still treated as a click.
    pub click_window_ms: u64,
    /// Focus smoothing rate per second.
    pub focus_rate: f32,
    /// Focus point before the first frame is resolved.
    pub default_focus: [f32; 3],
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            click_window_ms: 300,
            focus_rate: 5.0,
            default_focus: [0.0, 1.0, 0.0],
        }
    }
}

impl InteractionConfig {
    pub fn click_window(&self) -> Duration {
        Duration::from_millis(self.click_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ShowroomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stands.len(), 3);
        assert_eq!(config.transition.patterns.len(), 6);
        assert_eq!(config.transition.duration(), Duration::from_millis(1200));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ShowroomConfig::from_json(r#"{ "post": { "bloom_strength": 0.5 } }"#)
            .expect("valid config");
        assert_eq!(config.post.bloom_strength, 0.5);
        assert_eq!(config.post.bloom_threshold, 0.373);
        assert_eq!(config.stands.len(), 3);
    }

    #[test]
    fn camera_mode_parses_tagged() {
        let config = ShowroomConfig::from_json(
            r#"{ "main_camera": { "fov_degrees": 50.0, "near": 0.1, "far": 10.0,
                 "position": [0.0, 1.0, 2.0], "target": [0.0, 0.0, 0.0],
                 "mode": { "kind": "parallax", "max_angle_deg": 10.0, "smoothing": 2.0 } } }"#,
        )
        .expect("valid config");
        assert_eq!(
            config.main_camera.mode,
            CameraMode::Parallax {
                max_angle_deg: 10.0,
                smoothing: 2.0
            }
        );
    }

    #[test]
    fn duplicate_stand_ids_are_rejected() {
        let mut config = ShowroomConfig::default();
        config.stands.push(StandConfig::new(2, "x.png", [0.0; 3]));
        assert!(matches!(config.validate(), Err(VitrineError::Config(_))));
    }

    #[test]
    fn stand_id_zero_is_reserved() {
        let mut config = ShowroomConfig::default();
        config.stands[0].id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            ShowroomConfig::from_json("{ not json"),
            Err(VitrineError::Json(_))
        ));
    }
}
