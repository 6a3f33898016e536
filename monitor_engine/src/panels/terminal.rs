use std::collections::VecDeque;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameContext, PanelRenderer};
use crate::canvas::{with_alpha, Canvas, Rgba};

const BACKGROUND: Rgba = [0, 0, 0, 80];
const TEXT_COLOR: [u8; 3] = [0, 255, 0];
const FLASH_COLORS: [[u8; 3]; 3] = [[0, 0, 255], [255, 255, 255], [255, 0, 0]];
const CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 +-*/=<>[](){};:'\"";
const SNIPPETS: [&str; 14] = [
    "def foo(bar):",
    "if x == y:",
    "print('Hello, world!')",
    "return x * y",
    "while True:",
    "class MyClass(object):",
    "try:",
    "except Exception as e:",
    "import sys",
    "print('Debug info')",
    "elif condition:",
    "else:",
    "with open('file.txt') as f:",
    "play_wav('ashley.wave'):",
];
const BASE_FONT_PX: f32 = 8.0;
const MIN_LINE_HEIGHT: u32 = 10;
/// Pixels scrolled per reference tick are picked from this range.
const SCROLL_SPEEDS: std::ops::RangeInclusive<u32> = 1..=5;
const BLINK_PERIOD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
struct TerminalLine {
    text: String,
    flash: Option<[u8; 3]>,
}

impl TerminalLine {
    fn blank() -> Self {
        Self {
            text: String::new(),
            flash: None,
        }
    }
}

/// Decorative "code" scrolling upward with random pauses and clears.
pub struct TerminalPanel {
    rng: StdRng,
    lines: VecDeque<TerminalLine>,
    offset: f32,
    speed: u32,
    paused_until: f32,
    next_clear: Option<f32>,
    geometry: Option<(u32, u32, f32)>,
    line_height: u32,
    max_chars: usize,
}

impl TerminalPanel {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            lines: VecDeque::new(),
            offset: 0.0,
            speed: 1,
            paused_until: 0.0,
            next_clear: None,
            geometry: None,
            line_height: MIN_LINE_HEIGHT,
            max_chars: 5,
        }
    }

    pub fn is_paused(&self, clock: f32) -> bool {
        clock < self.paused_until
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn font_px(frame: &FrameContext<'_>) -> f32 {
        (BASE_FONT_PX * frame.scale).floor().max(BASE_FONT_PX)
    }

    fn fit(&mut self, width: u32, height: u32, frame: &FrameContext<'_>) {
        let font_px = Self::font_px(frame);
        if self.geometry == Some((width, height, font_px)) {
            return;
        }
        self.geometry = Some((width, height, font_px));
        let typeface = frame.terminal_typeface;
        self.line_height = typeface.line_height(font_px).max(MIN_LINE_HEIGHT);
        let char_width = typeface.measure("A", font_px).max(1);
        self.max_chars = ((width.saturating_sub(10) / char_width) as usize).max(5);
        let rows = (height / self.line_height) as usize + 1;
        self.lines = (0..rows).map(|_| TerminalLine::blank()).collect();
        self.offset = 0.0;
    }

    fn random_text(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| CHARSET[self.rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    }

    fn generate_line(&mut self) -> TerminalLine {
        let roll: f64 = self.rng.gen();
        let text = if roll < 0.1 {
            String::new()
        } else if roll < 0.3 {
            let length = self
                .rng
                .gen_range(self.max_chars.saturating_sub(5).max(1)..=self.max_chars);
            self.random_text(length)
        } else if self.rng.gen_bool(0.5) {
            SNIPPETS[self.rng.gen_range(0..SNIPPETS.len())].to_string()
        } else {
            let length = self.rng.gen_range(10..=30);
            self.random_text(length)
        };
        let flash = if !text.is_empty() && self.rng.gen_bool(0.05) {
            Some(FLASH_COLORS[self.rng.gen_range(0..FLASH_COLORS.len())])
        } else {
            None
        };
        TerminalLine { text, flash }
    }

    /// Advance scrolling by `dt` seconds at time `clock`.
    fn step(&mut self, clock: f32, dt: f32) {
        let next_clear = *self
            .next_clear
            .get_or_insert_with(|| clock + self.rng.gen_range(10.0..60.0));
        if clock >= next_clear {
            for line in self.lines.iter_mut() {
                *line = TerminalLine::blank();
            }
            self.offset = 0.0;
            self.next_clear = Some(clock + self.rng.gen_range(10.0..60.0));
        }

        if !self.is_paused(clock) {
            self.offset += self.speed as f32 * dt * 60.0;
        }

        while self.offset >= self.line_height as f32 && !self.lines.is_empty() {
            self.offset -= self.line_height as f32;
            self.lines.pop_front();
            let line = self.generate_line();
            self.lines.push_back(line);

            if self.rng.gen_bool(0.5) {
                self.speed = self.rng.gen_range(SCROLL_SPEEDS);
            }
            if self.rng.gen_bool(0.1) {
                self.paused_until = clock + self.rng.gen_range(0.5..5.0);
                self.offset = 0.0;
            }
        }
    }
}

impl Default for TerminalPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelRenderer for TerminalPanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        self.fit(canvas.width(), canvas.height(), frame);
        self.step(frame.clock, frame.dt);

        canvas.fill_rect(0, 0, canvas.width() as i32, canvas.height() as i32, BACKGROUND);
        let font_px = Self::font_px(frame);
        let blink_on = (frame.clock / BLINK_PERIOD) as u64 % 2 == 0;
        for (row, line) in self.lines.iter().enumerate() {
            let color = match line.flash {
                Some(color) if blink_on => color,
                Some(_) => continue,
                None => TEXT_COLOR,
            };
            let y = row as i32 * self.line_height as i32 - self.offset as i32;
            frame.terminal_typeface.draw(
                canvas,
                5,
                y,
                &line.text,
                font_px,
                with_alpha(color, 255),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod terminal_panel_tests {
    use super::*;
    use crate::text::Typeface;

    fn frame(typeface: &Typeface, clock: f32) -> FrameContext<'_> {
        FrameContext {
            typeface,
            terminal_typeface: typeface,
            font_px: 10.0,
            scale: 1.0,
            clock,
            dt: 1.0 / 60.0,
            expanded: false,
            silence_frames: 0,
            spectrum: None,
        }
    }

    #[test]
    fn rows_cover_the_panel() {
        let typeface = Typeface::fallback();
        let mut panel = TerminalPanel::with_seed(1);
        let mut canvas = Canvas::new(200, 100);
        panel.render(&mut canvas, &frame(&typeface, 0.0)).expect("render");
        // fallback line height at 8 px is 10
        assert_eq!(panel.line_count(), 11);
    }

    #[test]
    fn text_appears_after_scrolling() {
        let typeface = Typeface::fallback();
        let mut panel = TerminalPanel::with_seed(7);
        let mut canvas = Canvas::new(200, 100);
        let mut clock = 0.0;
        for _ in 0..300 {
            clock += 1.0 / 60.0;
            panel.render(&mut canvas, &frame(&typeface, clock)).expect("render");
        }
        assert!(panel.lines.iter().any(|line| !line.text.is_empty()));
        let green = canvas
            .pixels()
            .chunks_exact(4)
            .any(|px| px[1] > 100 && px[0] < 50 && px[2] < 50);
        assert!(green);
    }

    #[test]
    fn generated_lines_fit_the_width() {
        let typeface = Typeface::fallback();
        let mut panel = TerminalPanel::with_seed(3);
        let mut canvas = Canvas::new(200, 50);
        panel.render(&mut canvas, &frame(&typeface, 0.0)).expect("render");
        for _ in 0..500 {
            let line = panel.generate_line();
            assert!(line.text.chars().count() <= panel.max_chars.max(30));
            if line.text.is_empty() {
                assert!(line.flash.is_none());
            }
        }
    }

    #[test]
    fn periodic_clear_blanks_every_line() {
        let typeface = Typeface::fallback();
        let mut panel = TerminalPanel::with_seed(5);
        let mut canvas = Canvas::new(200, 100);
        panel.render(&mut canvas, &frame(&typeface, 0.0)).expect("render");
        for line in panel.lines.iter_mut() {
            line.text = "x".into();
        }
        panel.render(&mut canvas, &frame(&typeface, 61.0)).expect("render");
        assert!(panel.lines.iter().filter(|line| line.text.is_empty()).count() >= panel.line_count() - 1);
    }
}
