use std::path::PathBuf;

use thiserror::Error;

/// Typed failures raised by the display engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("screen {width}x{height} is smaller than the supported minimum side of {min} px")]
    ScreenTooSmall { width: u32, height: u32, min: u32 },
    #[error("unsupported rotation {0}; expected 0, 90, 180 or 270")]
    InvalidRotation(u32),
    #[error("invalid config value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
    #[error("no slideshow images found in {}", .0.display())]
    NoAssets(PathBuf),
    #[error("failed to read asset directory {}: {source}", path.display())]
    AssetDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
