//! Application configuration.

use std::path::{Path, PathBuf};

use gazeclick_gaze_model::landmark::LandmarkMap;
use gazeclick_platform_core::ScreenSize;
use serde::{Deserialize, Serialize};

use crate::clock::LoopClock;
use crate::error::{GazeError, GazeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Cursor mapping, smoothing, and blink-click parameters.
    pub tracking: TrackingConfig,

    /// Detector-specific landmark indices.
    pub landmarks: LandmarkMap,

    /// Screen size override. Detected from the display server when unset.
    pub screen: Option<ScreenSize>,

    /// Cursor output settings.
    pub cursor: CursorConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters of the gaze tracking loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Multiplier applied to the mapped screen position.
    pub speed_factor: f64,

    /// EMA weight of the newest raw position, in (0, 1].
    pub smooth_factor: f64,

    /// Eyelid gap (normalized) below which a blink is declared.
    pub click_threshold: f64,

    /// Minimum time between accepted blink-clicks.
    pub click_cooldown_ms: u64,

    /// Require the eye to reopen before another click can register.
    pub rearm_on_open: bool,

    /// Mirror frames horizontally before detection.
    pub mirror: bool,
}

/// Cursor backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CursorBackendKind {
    /// Drive the X11 pointer through `xdotool`.
    #[default]
    Xdotool,
    /// Record actions without touching the OS pointer.
    DryRun,
}

/// Cursor output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CursorConfig {
    pub backend: CursorBackendKind,

    /// X display to target (for example ":0"). Inherits `DISPLAY` when unset.
    pub display: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gazeclick=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            landmarks: LandmarkMap::default(),
            screen: None,
            cursor: CursorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            speed_factor: 1.5,
            smooth_factor: 0.5,
            click_threshold: 0.006,
            click_cooldown_ms: 1000,
            rearm_on_open: true,
            mirror: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl TrackingConfig {
    /// Cooldown as nanoseconds, matching frame timestamps.
    pub fn click_cooldown_ns(&self) -> u64 {
        LoopClock::ms_to_ns(self.click_cooldown_ms)
    }
}

impl GazeConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> GazeResult<Self> {
        if !path.exists() {
            return Err(GazeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Check value ranges before the loop is built.
    pub fn validate(&self) -> GazeResult<()> {
        let t = &self.tracking;
        if !t.speed_factor.is_finite() || t.speed_factor <= 0.0 {
            return Err(GazeError::config(format!(
                "speed_factor must be a positive number, got {}",
                t.speed_factor
            )));
        }
        if !(t.smooth_factor > 0.0 && t.smooth_factor <= 1.0) {
            return Err(GazeError::config(format!(
                "smooth_factor must be in (0, 1], got {}",
                t.smooth_factor
            )));
        }
        if !t.click_threshold.is_finite() {
            return Err(GazeError::config("click_threshold must be finite"));
        }
        if let Some(screen) = self.screen {
            if screen.is_empty() {
                return Err(GazeError::invalid_geometry(
                    "screen",
                    screen.width,
                    screen.height,
                ));
            }
        }
        self.landmarks
            .validate()
            .map_err(|e| GazeError::config(e.to_string()))?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gazeclick").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let config = GazeConfig::default();
        assert_eq!(config.tracking.speed_factor, 1.5);
        assert_eq!(config.tracking.smooth_factor, 0.5);
        assert_eq!(config.tracking.click_threshold, 0.006);
        assert_eq!(config.tracking.click_cooldown_ns(), 1_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let raw = r#"{ "tracking": { "speed_factor": 2.0 }, "screen": { "width": 2560, "height": 1440 } }"#;
        let config: GazeConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.tracking.speed_factor, 2.0);
        assert_eq!(config.tracking.smooth_factor, 0.5);
        assert_eq!(config.screen, Some(ScreenSize::new(2560, 1440)));
        assert_eq!(config.cursor.backend, CursorBackendKind::Xdotool);
    }

    #[test]
    fn validate_rejects_out_of_range_smoothing() {
        let mut config = GazeConfig::default();
        config.tracking.smooth_factor = 0.0;
        assert!(matches!(config.validate(), Err(GazeError::Config { .. })));

        config.tracking.smooth_factor = 1.2;
        assert!(config.validate().is_err());

        config.tracking.smooth_factor = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_screen() {
        let mut config = GazeConfig::default();
        config.screen = Some(ScreenSize::new(0, 1080));
        assert!(matches!(
            config.validate(),
            Err(GazeError::InvalidGeometry { what: "screen", .. })
        ));
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = std::env::temp_dir().join("gazeclick_test_config");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let mut config = GazeConfig::default();
        config.tracking.click_cooldown_ms = 750;
        config.cursor.backend = CursorBackendKind::DryRun;
        config.save_to(&path).unwrap();

        let loaded = GazeConfig::load_from(&path).unwrap();
        assert_eq!(loaded.tracking.click_cooldown_ms, 750);
        assert_eq!(loaded.cursor.backend, CursorBackendKind::DryRun);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_from_missing_path_is_file_not_found() {
        let path = std::env::temp_dir().join("gazeclick_definitely_missing.json");
        assert!(matches!(
            GazeConfig::load_from(&path),
            Err(GazeError::FileNotFound { .. })
        ));
    }
}
