use std::collections::VecDeque;
use std::f32::consts::TAU;

use anyhow::Result;

use super::{normalized, FrameContext, PanelRenderer};
use crate::canvas::Canvas;

pub const TRAIL_DEPTH: usize = 22;
const TRAIL_DECAY: f32 = 0.9;
/// Offset applied per trail step, design pixels.
const PERSPECTIVE_SHIFT: (f32, f32) = (-2.0, 5.0);
/// Negative padding lets the wave run past both edges.
const PADDING: f32 = -35.0;
const MAX_AMPLITUDE: f32 = 70.0;
const CYCLES: f32 = 3.0;

/// Spectrum drawn as a sine-modulated line with a fading motion trail.
#[derive(Debug, Default)]
pub struct WaveformPanel {
    history: VecDeque<Vec<(i32, i32)>>,
}

impl WaveformPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trail_len(&self) -> usize {
        self.history.len()
    }

    /// Add a wave for `bins`. Returns false when there was nothing to draw.
    fn push(&mut self, bins: &[f32], width: u32, height: u32, scale: f32) -> bool {
        let levels = normalized(bins);
        if levels.is_empty() || levels.iter().all(|level| *level == 0.0) {
            return false;
        }
        let padding = (PADDING * scale) as i32;
        let span = (width as i32 - 2 * padding).max(2);
        let amplitude = MAX_AMPLITUDE * scale;
        let mid = (height / 2) as f32;
        let points = (padding..width as i32 - padding)
            .map(|x| {
                let offset = x - padding;
                let bin = (offset as usize * levels.len() / span as usize).min(levels.len() - 1);
                let t = offset as f32 / span as f32;
                let y = levels[bin] * amplitude * (TAU * t * CYCLES).sin() + mid;
                (x, y as i32)
            })
            .collect();
        self.history.push_front(points);
        self.history.truncate(TRAIL_DEPTH);
        true
    }
}

impl PanelRenderer for WaveformPanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let pushed = frame.spectrum.is_some_and(|spectrum| {
            self.push(&spectrum.bins, canvas.width(), canvas.height(), frame.scale)
        });
        if !pushed {
            // no input: the trail drains one step per frame
            self.history.pop_back();
        }
        // oldest first: it gets no shift and is fully transparent
        for (step, wave) in self.history.iter().rev().enumerate() {
            let alpha = (255.0 * (1.0 - TRAIL_DECAY.powi(step as i32))) as u8;
            if alpha == 0 {
                continue;
            }
            let dx = (PERSPECTIVE_SHIFT.0 * frame.scale * step as f32) as i32;
            let dy = (PERSPECTIVE_SHIFT.1 * frame.scale * step as f32) as i32;
            let color = [255, 255, 255, alpha];
            for pair in wave.windows(2) {
                canvas.draw_line(
                    (pair[0].0 + dx, pair[0].1 + dy),
                    (pair[1].0 + dx, pair[1].1 + dy),
                    2,
                    color,
                );
            }
        }
        Ok(())
    }
}
