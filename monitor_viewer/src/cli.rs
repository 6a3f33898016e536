use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use monitor_engine::{EngineError, MonitorConfig, Rotation, load_config};

#[derive(Parser, Debug)]
#[command(about = "Status display for the embodied agent", version)]
pub struct Args {
    /// Monitor config JSON; every key is optional
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the screen width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Override the screen height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Override the counter-clockwise rotation (0, 90, 180 or 270)
    #[arg(long)]
    pub rotation: Option<u32>,

    /// Override the starting background (0 plain, 1 stars, 2 image, 3/4 video)
    #[arg(long)]
    pub background: Option<u32>,

    /// Open the window fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Keep the neural overlay visible instead of hiding it when idle
    #[arg(long)]
    pub always_show_brain: bool,

    /// Feed scripted dialogue lines and triggers into the display
    #[arg(long)]
    pub demo: bool,

    /// Skip microphone capture; the spectrum panels stay empty
    #[arg(long)]
    pub no_audio: bool,

    /// Run without a window for --ticks frames
    #[arg(long)]
    pub headless: bool,

    /// Frames to simulate in headless mode
    #[arg(long, default_value_t = 120)]
    pub ticks: u32,

    /// When set, write the final headless frame to disk (PNG)
    #[arg(long)]
    pub dump_frame: Option<PathBuf>,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => MonitorConfig::default(),
        };
        let config = self
            .apply_overrides(config)
            .context("validating command-line overrides")?;
        config
            .validate()
            .context("validating command-line overrides")?;
        Ok(config)
    }

    pub fn apply_overrides(&self, mut config: MonitorConfig) -> Result<MonitorConfig, EngineError> {
        if let Some(width) = self.width {
            config.screen_width = width;
        }
        if let Some(height) = self.height {
            config.screen_height = height;
        }
        if let Some(rotation) = self.rotation {
            config.rotation = Rotation::from_degrees(rotation)?;
        }
        if let Some(background) = self.background {
            config.background_id = background;
        }
        config.fullscreen |= self.fullscreen;
        config.neural_net_always_visible |= self.always_show_brain;
        Ok(config)
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn overrides_replace_file_values() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(br#"{ "screen_width": 1024, "screen_height": 600, "background_id": 2 }"#)
            .expect("write config");
        let path = file.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from([
            "monitor_viewer",
            "--config",
            path.as_str(),
            "--height",
            "768",
            "--rotation",
            "90",
            "--always-show-brain",
        ])
        .expect("parse");
        let config = args.monitor_config().expect("config");
        assert_eq!((config.screen_width, config.screen_height), (1024, 768));
        assert_eq!(config.rotation, Rotation::Deg90);
        assert_eq!(config.background_id, 2);
        assert!(config.neural_net_always_visible);
        assert!(!config.fullscreen);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = Args::try_parse_from(["monitor_viewer", "--rotation", "45"]).expect("parse");
        let err = args.monitor_config().expect_err("rotation 45");
        let message = format!("{err:#}");
        assert!(message.contains("command-line overrides"));
        assert!(message.contains("unsupported rotation 45"));
    }

    #[test]
    fn headless_defaults() {
        let args = Args::try_parse_from(["monitor_viewer", "--headless"]).expect("parse");
        assert!(args.headless);
        assert_eq!(args.ticks, 120);
        assert!(args.dump_frame.is_none());
        assert_eq!(args.monitor_config().expect("config"), MonitorConfig::default());
    }
}
