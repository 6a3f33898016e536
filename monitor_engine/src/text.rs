use std::collections::HashMap;
use std::fs;
use std::mem;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};

use crate::canvas::{Canvas, Rgba};

/// Rasterizes text into a [`Canvas`]. Falls back to fixed-width block glyphs
/// when no font file could be loaded so the display still shows line shapes.
pub struct Typeface {
    font: Option<Font>,
    glyphs: Mutex<HashMap<(char, u32), GlyphBitmap>>,
}

#[derive(Clone)]
struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    advance: f32,
    alpha: Arc<[u8]>,
}

impl Typeface {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|err| anyhow!("parsing font {}: {err}", path.display()))?;
        Ok(Self {
            font: Some(font),
            glyphs: Mutex::new(HashMap::new()),
        })
    }

    pub fn fallback() -> Self {
        Self {
            font: None,
            glyphs: Mutex::new(HashMap::new()),
        }
    }

    pub fn load_or_fallback(path: &Path) -> Self {
        match Self::load(path) {
            Ok(typeface) => typeface,
            Err(err) => {
                log::warn!("{err:#}; using block glyphs");
                Self::fallback()
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.font.is_none()
    }

    pub fn line_height(&self, px: f32) -> u32 {
        let size = match &self.font {
            Some(font) => font
                .horizontal_line_metrics(px)
                .map(|metrics| metrics.new_line_size)
                .unwrap_or(px + px / 5.0),
            None => px + px / 5.0,
        };
        size.ceil().max(1.0) as u32
    }

    fn ascent(&self, px: f32) -> i32 {
        match &self.font {
            Some(font) => font
                .horizontal_line_metrics(px)
                .map(|metrics| metrics.ascent)
                .unwrap_or(px * 0.8)
                .round() as i32,
            None => (px * 0.8).round() as i32,
        }
    }

    fn advance(&self, ch: char, px: f32) -> f32 {
        match &self.font {
            Some(font) => font.metrics(ch, px).advance_width,
            None => fallback_advance(px),
        }
    }

    pub fn measure(&self, text: &str, px: f32) -> u32 {
        text.chars()
            .map(|ch| self.advance(ch, px))
            .sum::<f32>()
            .ceil() as u32
    }

    /// Draw a single line with its top edge at `y`. Returns the advance width.
    pub fn draw(&self, canvas: &mut Canvas, x: i32, y: i32, text: &str, px: f32, color: Rgba) -> u32 {
        let baseline = y + self.ascent(px);
        let mut pen = x as f32;
        for ch in text.chars() {
            if ch == '\r' {
                continue;
            }
            let glyph = self.glyph(ch, px);
            blit_glyph(canvas, pen.round() as i32, baseline, &glyph, color);
            pen += glyph.advance;
        }
        (pen - x as f32).max(0.0).ceil() as u32
    }

    fn glyph(&self, ch: char, px: f32) -> GlyphBitmap {
        let key = (ch, px.to_bits());
        let mut cache = self.glyphs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(glyph) = cache.get(&key) {
            return glyph.clone();
        }
        let glyph = match &self.font {
            Some(font) => {
                let (metrics, bitmap) = font.rasterize(ch, px);
                GlyphBitmap {
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    xmin: metrics.xmin,
                    ymin: metrics.ymin,
                    advance: metrics.advance_width,
                    alpha: Arc::from(bitmap.into_boxed_slice()),
                }
            }
            None => block_glyph(ch, px),
        };
        cache.insert(key, glyph.clone());
        glyph
    }

    /// Word-wrap `text` to `max_width` pixels. Words wider than a line are
    /// broken between characters; every paragraph yields at least one line.
    pub fn wrap(&self, text: &str, px: f32, max_width: u32) -> Vec<String> {
        let max_width = max_width.max(1) as f32;
        let space = self.advance(' ', px);
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            let mut current_width = 0.0f32;
            for word in paragraph.split_whitespace() {
                let word_width: f32 = word.chars().map(|ch| self.advance(ch, px)).sum();
                let joined_width = if current.is_empty() {
                    word_width
                } else {
                    current_width + space + word_width
                };
                if joined_width <= max_width {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(word);
                    current_width = joined_width;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(mem::take(&mut current));
                    current_width = 0.0;
                }
                if word_width <= max_width {
                    current.push_str(word);
                    current_width = word_width;
                    continue;
                }
                for ch in word.chars() {
                    let advance = self.advance(ch, px);
                    if !current.is_empty() && current_width + advance > max_width {
                        lines.push(mem::take(&mut current));
                        current_width = 0.0;
                    }
                    current.push(ch);
                    current_width += advance;
                }
            }
            lines.push(current);
        }
        lines
    }
}

fn fallback_advance(px: f32) -> f32 {
    (px * 3.0 / 5.0).ceil()
}

fn block_glyph(ch: char, px: f32) -> GlyphBitmap {
    let advance = fallback_advance(px);
    if ch.is_whitespace() {
        return GlyphBitmap {
            width: 0,
            height: 0,
            xmin: 0,
            ymin: 0,
            advance,
            alpha: Arc::from([]),
        };
    }
    let width = ((advance * 0.7) as u32).max(1);
    let height = ((px * 3.0 / 5.0) as u32).max(1);
    GlyphBitmap {
        width,
        height,
        xmin: 0,
        ymin: 0,
        advance,
        alpha: Arc::from(vec![160u8; (width * height) as usize].into_boxed_slice()),
    }
}

fn blit_glyph(canvas: &mut Canvas, pen_x: i32, baseline: i32, glyph: &GlyphBitmap, color: Rgba) {
    if glyph.width == 0 || glyph.height == 0 {
        return;
    }
    let start_x = pen_x + glyph.xmin;
    let start_y = baseline - (glyph.ymin + glyph.height as i32);
    for gy in 0..glyph.height {
        let row = gy as usize * glyph.width as usize;
        for gx in 0..glyph.width {
            let coverage = glyph.alpha[row + gx as usize];
            if coverage == 0 {
                continue;
            }
            let alpha = (coverage as u16 * color[3] as u16 / u8::MAX as u16) as u8;
            canvas.blend_pixel(
                start_x + gx as i32,
                start_y + gy as i32,
                [color[0], color[1], color[2], alpha],
            );
        }
    }
}
