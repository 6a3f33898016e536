use anyhow::Result;

use super::console::draw_progress;
use super::{FrameContext, PanelRenderer};
use crate::canvas::{mix_rgb, with_alpha, Canvas, Rgba};

const BACKGROUND: Rgba = [0, 0, 0, 200];
const BORDER: Rgba = [76, 194, 230, 255];
const SMOOTHING: f32 = 0.3;
const BAR_SPACING: f32 = 1.0;
const HEIGHT_SHARE: f32 = 0.9;
/// Levels below this snap to zero once the input is gone.
const FLOOR: f32 = 1e-3;
const GRADIENT: [[u8; 3]; 8] = [
    [255, 0, 0],
    [255, 165, 0],
    [255, 255, 0],
    [0, 255, 0],
    [0, 255, 255],
    [0, 0, 255],
    [128, 0, 128],
    [255, 0, 255],
];

/// Colour at `position` (0..=1) along the bar gradient.
pub fn gradient_color(position: f32) -> [u8; 3] {
    let scaled = position.clamp(0.0, 1.0) * (GRADIENT.len() - 1) as f32;
    let low = scaled as usize;
    let high = (low + 1).min(GRADIENT.len() - 1);
    mix_rgb(GRADIENT[low], GRADIENT[high], scaled - low as f32)
}

/// Spectrum bars behind the neural overlay, with the silence progress bar.
#[derive(Debug, Default)]
pub struct BarsPanel {
    previous: Vec<f32>,
    levels: Vec<f32>,
}

impl BarsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    /// Smooth toward `bins`, or toward zero when there is no audible input.
    fn update(&mut self, bins: Option<&[f32]>, bar_count: usize) {
        let resampled = match bins {
            Some(bins) if bins.iter().any(|value| *value != 0.0) => resample(bins, bar_count),
            _ => {
                if self.previous.iter().all(|level| *level == 0.0) {
                    self.previous.clear();
                    self.levels.clear();
                    return;
                }
                vec![0.0; bar_count]
            }
        };

        if self.previous.len() != bar_count {
            self.previous = vec![0.0; bar_count];
        }
        for (previous, value) in self.previous.iter_mut().zip(&resampled) {
            *previous = *previous * (1.0 - SMOOTHING) + value * SMOOTHING;
            if *previous < FLOOR {
                *previous = 0.0;
            }
        }

        let mut smoothed = self.previous.clone();
        for index in 1..bar_count.saturating_sub(1) {
            smoothed[index] =
                (self.previous[index - 1] + self.previous[index] + self.previous[index + 1]) / 3.0;
        }
        self.levels = smoothed;
    }
}

/// Average `bins` into `bar_count` bars normalised to the loudest one.
fn resample(bins: &[f32], bar_count: usize) -> Vec<f32> {
    let mut resampled: Vec<f32> = (0..bar_count)
        .map(|bar| {
            let start = bar * bins.len() / bar_count;
            let end = ((bar + 1) * bins.len() / bar_count).min(bins.len());
            if start >= end {
                bins[start.min(bins.len() - 1)]
            } else {
                bins[start..end].iter().sum::<f32>() / (end - start) as f32
            }
        })
        .collect();
    let peak = resampled.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for value in &mut resampled {
            *value /= peak;
        }
    }
    resampled
}

impl PanelRenderer for BarsPanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        canvas.fill_rect(0, 0, w, h, BACKGROUND);

        let bar_count = (canvas.width() / 3).max(1) as usize;
        self.update(
            frame.spectrum.map(|spectrum| spectrum.bins.as_slice()),
            bar_count,
        );

        let bar_width =
            (canvas.width() as f32 - (bar_count as f32 - 1.0) * BAR_SPACING) / bar_count as f32;
        let count = self.levels.len().max(1) as f32;
        for (index, level) in self.levels.iter().enumerate() {
            let bar_height = (level * h as f32 * HEIGHT_SHARE) as i32;
            if bar_height <= 0 {
                continue;
            }
            let x = (index as f32 * (bar_width + BAR_SPACING)) as i32;
            let color = gradient_color(index as f32 / count);
            canvas.fill_rect(
                x,
                h - bar_height,
                bar_width.ceil().max(1.0) as i32,
                bar_height,
                with_alpha(color, 255),
            );
        }

        let margin = frame.px(10.0).max(2);
        draw_progress(
            canvas,
            margin,
            margin,
            w - 2 * margin,
            frame.px(10.0).max(6),
            frame.silence_frames,
        );
        canvas.stroke_rect(0, 0, w, h, frame.px(2.0).max(1), BORDER);
        Ok(())
    }
}
