//! Per-panel renderers. Each one draws into a canvas of its panel's
//! canonical (unrotated) size; the compositor rotates and places it.

pub mod bars;
pub mod buttons;
pub mod camera;
pub mod console;
pub mod eye;
pub mod slideshow;
pub mod terminal;
pub mod waveform;

use std::collections::HashMap;

use anyhow::Result;
use monitor_feed::SpectrumFrame;

use crate::canvas::Canvas;
use crate::layout::PanelId;
use crate::text::Typeface;

pub use bars::BarsPanel;
pub use buttons::{button_at, button_rects, dispatch, ButtonAction, ButtonBar, ButtonHost, ButtonSpec, BUTTONS};
pub use camera::CameraPanel;
pub use console::{severity_color, ConsolePanel};
pub use eye::EyePanel;
pub use slideshow::{Slideshow, SlideshowPanel};
pub use terminal::TerminalPanel;
pub use waveform::WaveformPanel;

/// Shared, read-only inputs for one frame.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub typeface: &'a Typeface,
    pub terminal_typeface: &'a Typeface,
    pub font_px: f32,
    /// Layout scale relative to the 800x600 design size.
    pub scale: f32,
    /// Seconds since the compositor started.
    pub clock: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// True when the panel being drawn fills the screen.
    pub expanded: bool,
    pub silence_frames: u32,
    pub spectrum: Option<&'a SpectrumFrame>,
}

impl FrameContext<'_> {
    /// Scale a design-size length, truncating like the layout does.
    pub fn px(&self, length: f32) -> i32 {
        (length * self.scale) as i32
    }
}

pub trait PanelRenderer {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()>;
}

/// Logs a panel failure once per distinct reason instead of every tick.
#[derive(Debug, Default)]
pub struct PanelWarnings {
    last: HashMap<PanelId, String>,
}

impl PanelWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the failure was logged.
    pub fn record(&mut self, panel: PanelId, err: &anyhow::Error) -> bool {
        let reason = format!("{err:#}");
        if self.last.get(&panel) == Some(&reason) {
            return false;
        }
        log::warn!("{} panel skipped: {reason}", panel.label());
        self.last.insert(panel, reason);
        true
    }

    pub fn clear(&mut self, panel: PanelId) {
        if self.last.remove(&panel).is_some() {
            log::info!("{} panel recovered", panel.label());
        }
    }

    pub fn is_failing(&self, panel: PanelId) -> bool {
        self.last.contains_key(&panel)
    }
}

/// Normalize a spectrum to its own peak. All-zero input stays zero.
pub fn normalized(bins: &[f32]) -> Vec<f32> {
    let peak = bins
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return vec![0.0; bins.len()];
    }
    bins.iter()
        .map(|value| {
            if value.is_finite() {
                (value / peak).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod panel_support_tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn warnings_repeat_only_on_new_reason() {
        let mut warnings = PanelWarnings::new();
        assert!(warnings.record(PanelId::Camera, &anyhow!("device gone")));
        assert!(!warnings.record(PanelId::Camera, &anyhow!("device gone")));
        assert!(warnings.record(PanelId::Camera, &anyhow!("bad frame")));
        assert!(warnings.record(PanelId::Slideshow, &anyhow!("device gone")));
        warnings.clear(PanelId::Camera);
        assert!(!warnings.is_failing(PanelId::Camera));
        assert!(warnings.record(PanelId::Camera, &anyhow!("bad frame")));
    }

    #[test]
    fn normalization_handles_silence_and_nan() {
        assert_eq!(normalized(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(normalized(&[2.0, 4.0, f32::NAN]), vec![0.5, 1.0, 0.0]);
    }
}
