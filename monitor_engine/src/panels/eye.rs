use std::f32::consts::TAU;

use anyhow::Result;

use super::{FrameContext, PanelRenderer};
use crate::canvas::{with_alpha, Canvas, Rgba};

const BACKGROUND: Rgba = [10, 10, 10, 220];
const RIM: Rgba = [90, 90, 90, 255];
const IRIS: [u8; 3] = [200, 20, 20];
const CORE: [u8; 3] = [255, 90, 60];
/// Seconds per pulse.
const PULSE_PERIOD: f32 = 2.4;

/// Ambient status eye: a red lens that breathes slowly.
#[derive(Debug, Default)]
pub struct EyePanel;

impl EyePanel {
    pub fn new() -> Self {
        Self
    }

    /// Pulse strength in `0..=1` at `clock` seconds.
    pub fn pulse(clock: f32) -> f32 {
        0.5 - 0.5 * (TAU * clock / PULSE_PERIOD).cos()
    }
}

impl PanelRenderer for EyePanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        canvas.fill_rect(0, 0, w, h, BACKGROUND);

        let radius = w.min(h) * 2 / 5;
        if radius < 2 {
            return Ok(());
        }
        let (cx, cy) = (w / 2, h / 2);
        let pulse = Self::pulse(frame.clock);

        canvas.fill_circle(cx, cy, radius, RIM);
        canvas.fill_circle(cx, cy, radius - radius / 8 - 1, [0, 0, 0, 255]);
        let iris = (radius as f32 * (0.45 + 0.15 * pulse)) as i32;
        canvas.add_glow(cx, cy, iris * 2, with_alpha(IRIS, (60.0 + 120.0 * pulse) as u8));
        canvas.fill_circle(cx, cy, iris, with_alpha(IRIS, 255));
        canvas.fill_circle(cx, cy, (iris / 3).max(1), with_alpha(CORE, (150.0 + 105.0 * pulse) as u8));
        Ok(())
    }
}
