use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use facegate_core::shared::constants::{DEFAULT_MODEL_BASE, DEFAULT_SCORE_THRESHOLD};
use facegate_core::video::infrastructure::ffmpeg_camera::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

/// Persisted preferences. Fields missing from an older file take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_format: String,
    pub camera_device: String,
    /// Model directory or http(s) base URL.
    pub model_base: String,
    /// Detection score threshold in percent.
    pub score_threshold: u32,
    pub show_landmarks: bool,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let camera = CameraConfig::default();
        Self {
            camera_format: camera.format,
            camera_device: camera.device,
            model_base: DEFAULT_MODEL_BASE.to_string(),
            score_threshold: (DEFAULT_SCORE_THRESHOLD * 100.0).round() as u32,
            show_landmarks: true,
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceGate").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|json| Self::from_json(&json))
            .unwrap_or_default()
    }

    /// Unreadable JSON yields defaults rather than an error.
    fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings: {e}");
            Self::default()
        })
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(path, json);
            }
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            format: self.camera_format.clone(),
            device: self.camera_device.clone(),
            ..CameraConfig::default()
        }
    }

    pub fn score_threshold(&self) -> f64 {
        self.score_threshold as f64 / 100.0
    }

    /// Models stay loaded for the life of the process, so an edited model
    /// base only applies after relaunching.
    pub fn model_base_needs_relaunch(&self, loaded_from: Option<&str>) -> bool {
        loaded_from.is_some_and(|base| base.trim() != self.model_base.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_detector_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.score_threshold, 50);
        assert_eq!(settings.score_threshold(), 0.5);
        assert_eq!(settings.model_base, "models");
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let settings = Settings::from_json(r#"{ "appearance": "dark", "score_threshold": 70 }"#);

        assert_eq!(settings.appearance, Appearance::Dark);
        assert_eq!(settings.score_threshold, 70);
        assert!(settings.show_landmarks);
        assert_eq!(settings.camera_device, Settings::default().camera_device);
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        assert_eq!(Settings::from_json("{ not json"), Settings::default());
    }

    #[test]
    fn test_model_base_change_after_load_needs_relaunch() {
        let settings = Settings {
            model_base: "https://cdn.example.com/models".into(),
            ..Settings::default()
        };

        assert!(settings.model_base_needs_relaunch(Some("models")));
        assert!(!settings.model_base_needs_relaunch(Some("https://cdn.example.com/models")));
        assert!(!settings.model_base_needs_relaunch(None));
    }

    #[test]
    fn test_camera_config_uses_saved_device() {
        let settings = Settings {
            camera_device: "/dev/video2".into(),
            ..Settings::default()
        };
        assert_eq!(settings.camera_config().device, "/dev/video2");
    }
}
