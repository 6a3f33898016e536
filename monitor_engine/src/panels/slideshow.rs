use std::path::{Path, PathBuf};

use anyhow::Result;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use walkdir::WalkDir;

use super::{FrameContext, PanelRenderer};
use crate::canvas::{Canvas, Rgba};
use crate::error::EngineError;
use crate::layout::PanelRect;

pub const DISPLAY_SECS: f32 = 15.0;
pub const FADE_SECS: f32 = 1.0;
const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const BACKGROUND: Rgba = [0, 0, 0, 200];
const PLACEHOLDER: &str = "NO IMAGES";
const PLACEHOLDER_COLOR: Rgba = [150, 150, 150, 255];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Showing { elapsed: f32 },
    Fading { next: usize, elapsed: f32 },
}

/// Image rotation with a timed cross-fade. Images decode on first use.
pub struct Slideshow {
    paths: Vec<PathBuf>,
    images: Vec<Option<RgbaImage>>,
    current: usize,
    phase: Phase,
    rng: StdRng,
}

impl Slideshow {
    /// Collect the images directly inside `dir`, sorted by path.
    pub fn load(dir: &Path) -> Result<Self, EngineError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| EngineError::AssetDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_file() && has_image_extension(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        if paths.is_empty() {
            return Err(EngineError::NoAssets(dir.to_path_buf()));
        }
        paths.sort();
        log::info!("slideshow: {} images in {}", paths.len(), dir.display());

        Ok(Self {
            images: vec![None; paths.len()],
            paths,
            current: 0,
            phase: Phase::Showing { elapsed: 0.0 },
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Image fading in, if a transition is running.
    pub fn incoming(&self) -> Option<usize> {
        match self.phase {
            Phase::Fading { next, .. } => Some(next),
            Phase::Showing { .. } => None,
        }
    }

    /// Opacity of the incoming image.
    pub fn fade(&self) -> f32 {
        match self.phase {
            Phase::Fading { elapsed, .. } => (elapsed / FADE_SECS).clamp(0.0, 1.0),
            Phase::Showing { .. } => 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        let mut budget = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        loop {
            match self.phase {
                Phase::Showing { elapsed } => {
                    let elapsed = elapsed + budget;
                    if elapsed < DISPLAY_SECS || self.paths.len() < 2 {
                        self.phase = Phase::Showing {
                            elapsed: elapsed.min(DISPLAY_SECS),
                        };
                        return;
                    }
                    budget = elapsed - DISPLAY_SECS;
                    let next = self.pick_next();
                    self.phase = Phase::Fading { next, elapsed: 0.0 };
                }
                Phase::Fading { next, elapsed } => {
                    let elapsed = elapsed + budget;
                    if elapsed < FADE_SECS {
                        self.phase = Phase::Fading { next, elapsed };
                        return;
                    }
                    budget = elapsed - FADE_SECS;
                    self.current = next;
                    self.phase = Phase::Showing { elapsed: 0.0 };
                }
            }
        }
    }

    fn pick_next(&mut self) -> usize {
        let offset = self.rng.gen_range(1..self.paths.len());
        (self.current + offset) % self.paths.len()
    }

    /// Decoded pixels for `index`. A failed decode is retried on the next call.
    pub fn image(&mut self, index: usize) -> Result<&RgbaImage, EngineError> {
        let slot = &mut self.images[index];
        if slot.is_none() {
            let path = &self.paths[index];
            let decoded = image::open(path)
                .map_err(|source| EngineError::ImageDecode {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();
            log::debug!("decoded {} ({}x{})", path.display(), decoded.width(), decoded.height());
            *slot = Some(decoded);
        }
        Ok(slot.get_or_insert_with(|| RgbaImage::new(0, 0)))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Draws the slideshow, or a placeholder when no assets were found.
#[derive(Default)]
pub struct SlideshowPanel {
    slideshow: Option<Slideshow>,
}

impl SlideshowPanel {
    pub fn new(slideshow: Option<Slideshow>) -> Self {
        Self { slideshow }
    }

    pub fn slideshow(&self) -> Option<&Slideshow> {
        self.slideshow.as_ref()
    }
}

impl PanelRenderer for SlideshowPanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        canvas.fill_rect(0, 0, w, h, BACKGROUND);
        let Some(slideshow) = self.slideshow.as_mut() else {
            let text_width = frame.typeface.measure(PLACEHOLDER, frame.font_px) as i32;
            let line_height = frame.typeface.line_height(frame.font_px) as i32;
            frame.typeface.draw(
                canvas,
                (w - text_width) / 2,
                (h - line_height) / 2,
                PLACEHOLDER,
                frame.font_px,
                PLACEHOLDER_COLOR,
            );
            return Ok(());
        };

        slideshow.advance(frame.dt);
        let dest = PanelRect::new(0, 0, canvas.width(), canvas.height());
        let current = slideshow.current();
        let image = slideshow.image(current)?;
        canvas.blit_scaled(image.width(), image.height(), image.as_raw(), dest, 1.0);

        if let Some(next) = slideshow.incoming() {
            let fade = slideshow.fade();
            let image = slideshow.image(next)?;
            canvas.blit_scaled(image.width(), image.height(), image.as_raw(), dest, fade);
        }
        Ok(())
    }
}

#[cfg(test)]
mod slideshow_tests {
    use super::*;
    use crate::text::Typeface;
    use image::Rgba as Pixel;
    use std::fs;
    use tempfile::tempdir;

    fn write_image(dir: &Path, name: &str, color: [u8; 4]) {
        RgbaImage::from_pixel(4, 4, Pixel(color))
            .save(dir.join(name))
            .expect("write image");
    }

    fn frame(typeface: &Typeface, dt: f32) -> FrameContext<'_> {
        FrameContext {
            typeface,
            terminal_typeface: typeface,
            font_px: 10.0,
            scale: 1.0,
            clock: 0.0,
            dt,
            expanded: false,
            silence_frames: 0,
            spectrum: None,
        }
    }

    #[test]
    fn load_filters_and_sorts_images() {
        let dir = tempdir().expect("tempdir");
        write_image(dir.path(), "b.png", [0, 0, 255, 255]);
        write_image(dir.path(), "a.png", [255, 0, 0, 255]);
        fs::write(dir.path().join("notes.txt"), "not an image").expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        write_image(&dir.path().join("nested"), "c.png", [0, 255, 0, 255]);

        let slideshow = Slideshow::load(dir.path()).expect("load");
        let names: Vec<_> = slideshow
            .paths()
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[test]
    fn empty_directory_reports_no_assets() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("readme.md"), "x").expect("write");
        assert!(matches!(
            Slideshow::load(dir.path()),
            Err(EngineError::NoAssets(_))
        ));
    }

    #[test]
    fn missing_directory_is_distinct_from_no_assets() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("absent");
        assert!(matches!(
            Slideshow::load(&missing),
            Err(EngineError::AssetDirectory { .. })
        ));
    }

    #[test]
    fn corrupt_image_is_a_decode_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("broken.png"), b"not png").expect("write");
        let mut slideshow = Slideshow::load(dir.path()).expect("load");
        assert!(matches!(
            slideshow.image(0),
            Err(EngineError::ImageDecode { .. })
        ));
    }

    #[test]
    fn timer_cross_fades_to_a_different_image() {
        let dir = tempdir().expect("tempdir");
        write_image(dir.path(), "a.png", [255, 0, 0, 255]);
        write_image(dir.path(), "b.png", [0, 0, 255, 255]);
        let mut slideshow = Slideshow::load(dir.path()).expect("load").with_seed(4);

        slideshow.advance(14.0);
        assert_eq!(slideshow.incoming(), None);
        slideshow.advance(1.5);
        assert_eq!(slideshow.incoming(), Some(1));
        assert!((slideshow.fade() - 0.5).abs() < 1e-4);
        slideshow.advance(0.6);
        assert_eq!(slideshow.current(), 1);
        assert_eq!(slideshow.incoming(), None);
    }

    #[test]
    fn never_repeats_the_current_image() {
        let dir = tempdir().expect("tempdir");
        for name in ["a.png", "b.png", "c.png"] {
            write_image(dir.path(), name, [10, 10, 10, 255]);
        }
        let mut slideshow = Slideshow::load(dir.path()).expect("load").with_seed(9);
        for _ in 0..50 {
            let before = slideshow.current();
            slideshow.advance(DISPLAY_SECS + FADE_SECS);
            assert_ne!(slideshow.current(), before);
        }
    }

    #[test]
    fn single_image_never_fades() {
        let dir = tempdir().expect("tempdir");
        write_image(dir.path(), "only.png", [10, 10, 10, 255]);
        let mut slideshow = Slideshow::load(dir.path()).expect("load");
        slideshow.advance(100.0);
        assert_eq!(slideshow.current(), 0);
        assert_eq!(slideshow.incoming(), None);
    }

    #[test]
    fn panel_draws_current_image() {
        let dir = tempdir().expect("tempdir");
        write_image(dir.path(), "a.png", [255, 0, 0, 255]);
        let mut panel = SlideshowPanel::new(Some(Slideshow::load(dir.path()).expect("load")));
        let typeface = Typeface::fallback();
        let mut canvas = Canvas::new(32, 24);
        panel.render(&mut canvas, &frame(&typeface, 0.1)).expect("render");
        assert_eq!(canvas.pixel(16, 12), Some([255, 0, 0, 255]));
    }

    #[test]
    fn panel_without_assets_shows_placeholder() {
        let mut panel = SlideshowPanel::new(None);
        let typeface = Typeface::fallback();
        let mut canvas = Canvas::new(120, 40);
        panel.render(&mut canvas, &frame(&typeface, 0.1)).expect("render");
        assert!(canvas
            .pixels()
            .chunks_exact(4)
            .any(|px| px[0] == px[1] && px[1] == px[2] && px[0] > 50));
    }
}
