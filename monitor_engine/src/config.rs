use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::background::BackgroundKind;
use crate::error::EngineError;
use crate::layout::{Rotation, MIN_SCREEN_SIDE};

/// Display settings, read once at startup. Every key has a default so a
/// partial file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Stored as counter-clockwise degrees: 0, 90, 180 or 270.
    pub rotation: Rotation,
    pub fullscreen: bool,
    pub show_mouse: bool,
    pub maximize_console: bool,
    pub font_size: u32,
    pub background_id: u32,
    pub neural_net: bool,
    pub neural_net_always_visible: bool,
    pub neural_visible_secs: f32,
    pub use_camera: bool,
    /// Relative asset paths below are resolved against this directory.
    pub ui_root: PathBuf,
    pub font_path: PathBuf,
    pub terminal_font_path: PathBuf,
    pub background_image: PathBuf,
    pub slideshow_dir: PathBuf,
    pub background_videos: [PathBuf; 2],
    pub brain_nodes: usize,
    pub max_particles: usize,
    pub target_fps: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 480,
            rotation: Rotation::Deg0,
            fullscreen: false,
            show_mouse: true,
            maximize_console: false,
            font_size: 14,
            background_id: 1,
            neural_net: true,
            neural_net_always_visible: false,
            neural_visible_secs: 15.0,
            use_camera: false,
            ui_root: PathBuf::from("UI"),
            font_path: PathBuf::from("mono.ttf"),
            terminal_font_path: PathBuf::from("pixelmix.ttf"),
            background_image: PathBuf::from("background.png"),
            slideshow_dir: PathBuf::from("img"),
            background_videos: [PathBuf::from("video/bg1.ogv"), PathBuf::from("video/bg2.ogv")],
            brain_nodes: 300,
            max_particles: 800,
            target_fps: 60,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.screen_width < MIN_SCREEN_SIDE || self.screen_height < MIN_SCREEN_SIDE {
            return Err(EngineError::ScreenTooSmall {
                width: self.screen_width,
                height: self.screen_height,
                min: MIN_SCREEN_SIDE,
            });
        }
        if BackgroundKind::from_id(self.background_id).is_none() {
            return Err(EngineError::InvalidConfig {
                key: "background_id",
                reason: format!("{} is not in 0..=4", self.background_id),
            });
        }
        if self.font_size == 0 {
            return Err(EngineError::InvalidConfig {
                key: "font_size",
                reason: "must be positive".into(),
            });
        }
        if self.target_fps == 0 {
            return Err(EngineError::InvalidConfig {
                key: "target_fps",
                reason: "must be positive".into(),
            });
        }
        if !self.neural_visible_secs.is_finite() || self.neural_visible_secs < 0.0 {
            return Err(EngineError::InvalidConfig {
                key: "neural_visible_secs",
                reason: format!("{} is not a duration", self.neural_visible_secs),
            });
        }
        Ok(())
    }

    pub fn background(&self) -> BackgroundKind {
        BackgroundKind::from_id(self.background_id).unwrap_or_default()
    }

    /// `path` below `ui_root`. An absolute `path` replaces the root, as
    /// [`Path::join`] does.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.ui_root.join(path)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }
}

pub fn load_config(path: &Path) -> Result<MonitorConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading monitor config {}", path.display()))?;
    let config: MonitorConfig = serde_json::from_str(&data)
        .with_context(|| format!("parsing monitor config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating monitor config {}", path.display()))?;
    Ok(config)
}
