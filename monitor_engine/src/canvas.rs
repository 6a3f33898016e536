//! CPU RGBA raster used for every panel and for the composited frame.
//!
//! Pixels are straight (non-premultiplied) RGBA8, row-major, no padding.
//! Drawing clips silently at the edges.

use crate::layout::{PanelRect, Rotation};

pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
pub const BLACK: Rgba = [0, 0, 0, 255];
pub const WHITE: Rgba = [255, 255, 255, 255];

pub fn with_alpha(color: [u8; 3], alpha: u8) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

/// Linear blend between two RGB colours, `t` clamped to `[0, 1]`.
pub fn mix_rgb(from: [u8; 3], to: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    [lerp(from[0], to[0]), lerp(from[1], to[1]), lerp(from[2], to[2])]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Reallocate for new dimensions and clear to transparent.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize * 4, 0);
    }

    pub fn fill(&mut self, color: Rgba) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let idx = self.index(x as i32, y as i32)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(((y as u32 * self.width + x as u32) * 4) as usize)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx..idx + 4].copy_from_slice(&color);
        }
    }

    /// Source-over compositing of a single pixel.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let src_alpha = color[3] as f32 / 255.0;
        if src_alpha <= 0.0 {
            return;
        }
        let pixel = &mut self.pixels[idx..idx + 4];
        if color[3] == u8::MAX {
            pixel.copy_from_slice(&color);
            return;
        }
        let dst_alpha = pixel[3] as f32 / 255.0;
        let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
        for channel in 0..3 {
            let blended = (color[channel] as f32 * src_alpha
                + pixel[channel] as f32 * dst_alpha * (1.0 - src_alpha))
                / out_alpha;
            pixel[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        pixel[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// Additive blending, weighted by the source alpha.
    pub fn add_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let weight = color[3] as f32 / 255.0;
        if weight <= 0.0 {
            return;
        }
        let pixel = &mut self.pixels[idx..idx + 4];
        for channel in 0..3 {
            let sum = pixel[channel] as f32 + color[channel] as f32 * weight;
            pixel[channel] = sum.min(255.0) as u8;
        }
        pixel[3] = pixel[3].max(color[3]);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width).min(self.width as i32);
        let y1 = (y + height).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: i32, y: i32, width: i32, height: i32, thickness: i32, color: Rgba) {
        let t = thickness.max(1).min(width.max(1)).min(height.max(1));
        self.fill_rect(x, y, width, t, color);
        self.fill_rect(x, y + height - t, width, t, color);
        self.fill_rect(x, y + t, t, height - 2 * t, color);
        self.fill_rect(x + width - t, y + t, t, height - 2 * t, color);
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgba) {
        let radius = radius.max(0);
        if radius == 0 {
            self.blend_pixel(cx, cy, color);
            return;
        }
        let radius_sq = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius_sq {
                    self.blend_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Additive disc whose intensity falls off linearly toward the rim.
    pub fn add_glow(&mut self, cx: i32, cy: i32, radius: i32, color: Rgba) {
        let radius = radius.max(1);
        let radius_f = radius as f32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let distance = ((dx * dx + dy * dy) as f32).sqrt();
                if distance > radius_f {
                    continue;
                }
                let falloff = 1.0 - distance / radius_f;
                let alpha = (color[3] as f32 * falloff) as u8;
                self.add_pixel(cx + dx, cy + dy, [color[0], color[1], color[2], alpha]);
            }
        }
    }

    /// One-pixel ring, midpoint algorithm.
    pub fn stroke_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgba) {
        if radius <= 0 {
            self.blend_pixel(cx, cy, color);
            return;
        }
        let mut x = radius;
        let mut y = 0;
        let mut err = 1 - radius;
        while x >= y {
            for (px, py) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.blend_pixel(cx + px, cy + py, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    pub fn draw_line(
        &mut self,
        (mut x0, mut y0): (i32, i32),
        (x1, y1): (i32, i32),
        thickness: i32,
        color: Rgba,
    ) {
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let radius = (thickness - 1).max(0) / 2;

        loop {
            if radius == 0 {
                self.blend_pixel(x0, y0, color);
            } else {
                self.fill_circle(x0, y0, radius, color);
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = err * 2;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Composite `src` with its top-left corner at `(x, y)`.
    pub fn blit(&mut self, src: &Canvas, x: i32, y: i32, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        for sy in 0..src.height as i32 {
            let dy = y + sy;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width as i32 {
                let dx = x + sx;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                let idx = ((sy as u32 * src.width + sx as u32) * 4) as usize;
                let mut color = [0u8; 4];
                color.copy_from_slice(&src.pixels[idx..idx + 4]);
                color[3] = (color[3] as f32 * opacity).round() as u8;
                self.blend_pixel(dx, dy, color);
            }
        }
    }

    /// Nearest-neighbour scale of an RGBA buffer into `dest`.
    pub fn blit_scaled(
        &mut self,
        src_width: u32,
        src_height: u32,
        src: &[u8],
        dest: PanelRect,
        opacity: f32,
    ) {
        if src_width == 0 || src_height == 0 || dest.width == 0 || dest.height == 0 {
            return;
        }
        if src.len() < src_width as usize * src_height as usize * 4 {
            return;
        }
        let opacity = opacity.clamp(0.0, 1.0);
        for dy in 0..dest.height {
            let sy = (dy as u64 * src_height as u64 / dest.height as u64) as u32;
            for dx in 0..dest.width {
                let sx = (dx as u64 * src_width as u64 / dest.width as u64) as u32;
                let idx = ((sy * src_width + sx) * 4) as usize;
                let mut color = [src[idx], src[idx + 1], src[idx + 2], src[idx + 3]];
                color[3] = (color[3] as f32 * opacity).round() as u8;
                self.blend_pixel((dest.x + dx) as i32, (dest.y + dy) as i32, color);
            }
        }
    }

    /// Copy rotated counter-clockwise by `rotation`.
    pub fn rotated(&self, rotation: Rotation) -> Canvas {
        let (w, h) = (self.width, self.height);
        let mut out = match rotation {
            Rotation::Deg0 => return self.clone(),
            Rotation::Deg180 => Canvas::new(w, h),
            Rotation::Deg90 | Rotation::Deg270 => Canvas::new(h, w),
        };
        for y in 0..h {
            for x in 0..w {
                let (u, v) = match rotation {
                    Rotation::Deg0 => (x, y),
                    Rotation::Deg90 => (y, w - 1 - x),
                    Rotation::Deg180 => (w - 1 - x, h - 1 - y),
                    Rotation::Deg270 => (h - 1 - y, x),
                };
                let src = ((y * w + x) * 4) as usize;
                let dst = ((v * out.width + u) * 4) as usize;
                out.pixels[dst..dst + 4].copy_from_slice(&self.pixels[src..src + 4]);
            }
        }
        out
    }
}
