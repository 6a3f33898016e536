//! Looping Theora playback for the video backgrounds.

mod yuv;

use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use monitor_engine::FrameSource;
use theorafile_rs::{
    OggTheora_File, th_pixel_fmt, tf_close, tf_eos, tf_fopen, tf_hasvideo, tf_readvideo,
    tf_videoinfo,
};

use self::yuv::{FrameLayout, Subsampling};

const FALLBACK_FPS: f64 = 30.0;

/// Open each configured video, keeping the ones that load.
pub fn open_background_videos(
    paths: [PathBuf; 2],
) -> (Option<Box<dyn FrameSource>>, Option<Box<dyn FrameSource>>) {
    let [first, second] = paths.map(|path| match TheoraVideo::open(&path) {
        Ok(video) => {
            log::info!(
                "background video {} ({}x{})",
                path.display(),
                video.width,
                video.height
            );
            Some(Box::new(video) as Box<dyn FrameSource>)
        }
        Err(err) => {
            log::warn!("background video unavailable: {err:#}");
            None
        }
    });
    (first, second)
}

/// An open Theora file. Closed on drop.
struct TheoraFile {
    file: OggTheora_File,
}

impl TheoraFile {
    fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("video file '{}' not found", path.display()));
        }
        let c_path = CString::new(path.to_string_lossy().as_bytes())
            .with_context(|| format!("video path '{}' contains NUL byte", path.display()))?;
        let mut file = MaybeUninit::<OggTheora_File>::zeroed();
        let open_rc = unsafe { tf_fopen(c_path.as_ptr(), file.as_mut_ptr()) };
        if open_rc != 0 {
            return Err(anyhow!(
                "failed to open Theora video '{}' (error code {open_rc})",
                path.display()
            ));
        }
        let mut opened = Self {
            file: unsafe { file.assume_init() },
        };
        if unsafe { tf_hasvideo(&mut opened.file) } == 0 {
            return Err(anyhow!(
                "Theora file '{}' does not contain a video stream",
                path.display()
            ));
        }
        Ok(opened)
    }

    fn info(&mut self) -> (i32, i32, f64, th_pixel_fmt) {
        let mut width: i32 = 0;
        let mut height: i32 = 0;
        let mut fps: f64 = 0.0;
        let mut pixel_format: th_pixel_fmt = 0;
        unsafe {
            tf_videoinfo(
                &mut self.file,
                &mut width as *mut i32,
                &mut height as *mut i32,
                &mut fps as *mut f64,
                &mut pixel_format as *mut th_pixel_fmt,
            );
        }
        (width, height, fps, pixel_format)
    }

    fn read_frame(&mut self, buffer: &mut [u8]) -> i32 {
        unsafe { tf_readvideo(&mut self.file, buffer.as_mut_ptr() as *mut c_char, 1) }
    }

    fn at_end(&mut self) -> bool {
        unsafe { tf_eos(&mut self.file) != 0 }
    }
}

impl Drop for TheoraFile {
    fn drop(&mut self) {
        unsafe {
            tf_close(&mut self.file);
        }
    }
}

/// A video that restarts from its first frame when it reaches the end.
pub struct TheoraVideo {
    path: PathBuf,
    file: TheoraFile,
    width: u32,
    height: u32,
    frame_secs: f64,
    layout: FrameLayout,
    yuv: Vec<u8>,
    rgba: Vec<u8>,
    elapsed: f64,
    decoded: u64,
    has_frame: bool,
}

impl TheoraVideo {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = TheoraFile::open(path)?;
        let (width, height, fps, pixel_format) = file.info();
        let width = u32::try_from(width)
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| anyhow!("bad video width {width} in '{}'", path.display()))?;
        let height = u32::try_from(height)
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| anyhow!("bad video height {height} in '{}'", path.display()))?;
        let subsampling = Subsampling::from_theora(pixel_format).ok_or_else(|| {
            anyhow!("unsupported pixel format {pixel_format} for '{}'", path.display())
        })?;
        let layout = FrameLayout::new(width as usize, height as usize, subsampling);
        let yuv_len = layout
            .yuv_len()
            .ok_or_else(|| anyhow!("video buffer size overflow for '{}'", path.display()))?;
        let rgba_len = layout
            .rgba_len()
            .ok_or_else(|| anyhow!("RGBA buffer size overflow for '{}'", path.display()))?;
        let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            width,
            height,
            frame_secs: 1.0 / fps,
            layout,
            yuv: vec![0; yuv_len],
            rgba: vec![0; rgba_len],
            elapsed: 0.0,
            decoded: 0,
            has_frame: false,
        })
    }

    fn rewind(&mut self) -> Result<()> {
        if self.decoded == 0 {
            return Err(anyhow!(
                "Theora video '{}' ended without yielding a frame",
                self.path.display()
            ));
        }
        log::debug!("looping {}", self.path.display());
        self.file = TheoraFile::open(&self.path)?;
        self.elapsed = (self.elapsed - self.decoded as f64 * self.frame_secs).max(0.0);
        self.decoded = 0;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<()> {
        match self.file.read_frame(&mut self.yuv) {
            1 => {
                self.layout.convert(&self.yuv, &mut self.rgba);
                self.has_frame = true;
                self.decoded += 1;
                Ok(())
            }
            0 if self.file.at_end() => self.rewind(),
            // Duplicate frame: the previous picture stays on screen.
            0 => {
                self.decoded += 1;
                Ok(())
            }
            other => Err(anyhow!(
                "Theora decoder for '{}' returned unexpected status {other}",
                self.path.display()
            )),
        }
    }
}

impl FrameSource for TheoraVideo {
    fn advance(&mut self, dt: f32) -> Result<()> {
        self.elapsed += dt.max(0.0) as f64;
        while self.decoded <= (self.elapsed / self.frame_secs).floor() as u64 {
            self.decode_next()?;
        }
        Ok(())
    }

    fn frame(&self) -> Option<(u32, u32, &[u8])> {
        self.has_frame
            .then_some((self.width, self.height, self.rgba.as_slice()))
    }
}
