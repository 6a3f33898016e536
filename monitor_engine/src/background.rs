//! Full-screen backdrops drawn before any panel.

use anyhow::Result;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::canvas::Canvas;
use crate::layout::PanelRect;

pub const STAR_COUNT: usize = 1800;
const STAR_COLOR: [f32; 3] = [173.0, 216.0, 230.0];
const STAR_FOCAL: f32 = 200.0;
const STAR_MAX_SIZE: f32 = 5.0;
const FLICKER: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackgroundKind {
    #[default]
    Plain,
    Starfield,
    Image,
    VideoA,
    VideoB,
}

impl BackgroundKind {
    pub const ALL: [BackgroundKind; 5] = [
        BackgroundKind::Plain,
        BackgroundKind::Starfield,
        BackgroundKind::Image,
        BackgroundKind::VideoA,
        BackgroundKind::VideoB,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u32 {
        match self {
            BackgroundKind::Plain => 0,
            BackgroundKind::Starfield => 1,
            BackgroundKind::Image => 2,
            BackgroundKind::VideoA => 3,
            BackgroundKind::VideoB => 4,
        }
    }

    /// Next variant, wrapping back to plain after the last video.
    pub fn next(self) -> Self {
        Self::ALL[(self.id() as usize + 1) % Self::ALL.len()]
    }

    fn video_slot(self) -> Option<usize> {
        match self {
            BackgroundKind::VideoA => Some(0),
            BackgroundKind::VideoB => Some(1),
            _ => None,
        }
    }
}

/// A looping source of RGBA frames, such as a decoded video.
pub trait FrameSource {
    /// Move playback forward by `dt` seconds.
    fn advance(&mut self, dt: f32) -> Result<()>;
    /// Latest frame as (width, height, RGBA pixels).
    fn frame(&self) -> Option<(u32, u32, &[u8])>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Star {
    x: f32,
    y: f32,
    z: f32,
    speed: f32,
}

/// Stars flying toward the viewer from random depths.
pub struct Starfield {
    width: u32,
    height: u32,
    stars: Vec<Star>,
    rng: StdRng,
}

impl Starfield {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_rng(width, height, STAR_COUNT, StdRng::from_entropy())
    }

    pub fn with_seed(width: u32, height: u32, count: usize, seed: u64) -> Self {
        Self::with_rng(width, height, count, StdRng::seed_from_u64(seed))
    }

    fn with_rng(width: u32, height: u32, count: usize, mut rng: StdRng) -> Self {
        let (width, height) = (width.max(2), height.max(2));
        let stars = (0..count)
            .map(|_| spawn_star(&mut rng, width, height))
            .collect();
        Self {
            width,
            height,
            stars,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Stars move `speed` depth units per reference tick.
    pub fn advance(&mut self, dt: f32) {
        let ticks = dt * 60.0;
        for index in 0..self.stars.len() {
            let star = &mut self.stars[index];
            star.z -= star.speed * ticks;
            if star.z <= 0.0 {
                self.stars[index] = spawn_star(&mut self.rng, self.width, self.height);
            }
        }
    }

    pub fn draw(&mut self, canvas: &mut Canvas) {
        let (half_w, half_h) = ((self.width / 2) as f32, (self.height / 2) as f32);
        for star in &self.stars {
            let factor = STAR_FOCAL / star.z;
            let x = star.x * factor + half_w;
            let y = star.y * factor + half_h;
            if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
                continue;
            }
            let size = factor.clamp(1.0, STAR_MAX_SIZE) as i32;
            let brightness = 1.0 - star.z / self.width as f32;
            let flicker = self.rng.gen_range(-FLICKER..=FLICKER);
            let color = STAR_COLOR
                .map(|channel| ((channel * brightness) as i32 + flicker).clamp(0, 255) as u8);
            canvas.fill_circle(x as i32, y as i32, size, [color[0], color[1], color[2], 255]);
        }
    }
}

fn spawn_star(rng: &mut StdRng, width: u32, height: u32) -> Star {
    let (w, h) = (width as i32, height as i32);
    Star {
        x: rng.gen_range(-w..w) as f32,
        y: rng.gen_range(-h..h) as f32,
        z: rng.gen_range(1..w) as f32,
        speed: rng.gen_range(2.0..5.0),
    }
}

/// The selectable backdrop and the sources behind each variant.
pub struct Backgrounds {
    kind: BackgroundKind,
    starfield: Starfield,
    image: Option<RgbaImage>,
    videos: [Option<Box<dyn FrameSource>>; 2],
}

impl Backgrounds {
    pub fn new(kind: BackgroundKind, starfield: Starfield) -> Self {
        Self {
            kind,
            starfield,
            image: None,
            videos: [None, None],
        }
    }

    pub fn with_image(mut self, image: Option<RgbaImage>) -> Self {
        self.image = image;
        self
    }

    pub fn with_videos(
        mut self,
        first: Option<Box<dyn FrameSource>>,
        second: Option<Box<dyn FrameSource>>,
    ) -> Self {
        self.videos = [first, second];
        self
    }

    pub fn kind(&self) -> BackgroundKind {
        self.kind
    }

    pub fn cycle(&mut self) -> BackgroundKind {
        self.kind = self.kind.next();
        log::info!("background -> {:?}", self.kind);
        self.kind
    }

    pub fn has_video(&self, kind: BackgroundKind) -> bool {
        kind.video_slot()
            .map(|slot| self.videos[slot].is_some())
            .unwrap_or(false)
    }

    /// Drop every video source, closing their files.
    pub fn release(&mut self) {
        for video in &mut self.videos {
            video.take();
        }
    }

    /// Draw the current backdrop over the full `canvas`. A video that fails
    /// is dropped and the backdrop stays plain from then on.
    pub fn draw(&mut self, canvas: &mut Canvas, dt: f32) {
        let full = PanelRect::new(0, 0, canvas.width(), canvas.height());
        match self.kind {
            BackgroundKind::Plain => {}
            BackgroundKind::Starfield => {
                self.starfield.advance(dt);
                self.starfield.draw(canvas);
            }
            BackgroundKind::Image => {
                if let Some(image) = &self.image {
                    canvas.blit_scaled(image.width(), image.height(), image.as_raw(), full, 1.0);
                }
            }
            BackgroundKind::VideoA | BackgroundKind::VideoB => {
                let Some(slot) = self.kind.video_slot() else {
                    return;
                };
                let Some(video) = self.videos[slot].as_mut() else {
                    return;
                };
                if let Err(err) = video.advance(dt) {
                    log::warn!("background video stopped: {err:#}");
                    self.videos[slot] = None;
                    return;
                }
                if let Some((width, height, pixels)) = video.frame() {
                    canvas.blit_scaled(width, height, pixels, full, 1.0);
                }
            }
        }
    }
}
