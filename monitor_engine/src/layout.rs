//! Rotation-aware dashboard layout.
//!
//! Every panel is laid out in a canonical (unrotated) frame and then mapped to
//! screen coordinates, so renderers always draw upright into a buffer of the
//! panel's canonical size and the compositor rotates it once at blit time.
//! For 90 and 270 degrees the canonical frame is the transposed screen and the
//! panels form a vertical stack; otherwise they form a console column plus a
//! grid with a status bar underneath.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const BASE_WIDTH: f32 = 800.0;
pub const BASE_HEIGHT: f32 = 600.0;
pub const MIN_SCREEN_SIDE: u32 = 8;
const STATUS_BAR_BASE_HEIGHT: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Result<Self, EngineError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(EngineError::InvalidRotation(other)),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// True when the canonical frame is the transposed screen.
    pub fn transposes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<u32> for Rotation {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
    }
}

impl From<Rotation> for u32 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PanelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PanelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x as i32
            && py >= self.y as i32
            && px < self.right() as i32
            && py < self.bottom() as i32
    }

    pub fn intersects(&self, other: &PanelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn union(&self, other: &PanelRect) -> PanelRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        PanelRect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Clip to a `width` x `height` frame anchored at the origin.
    pub fn clipped_to(&self, width: u32, height: u32) -> Option<PanelRect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clipped = PanelRect::new(
            self.x,
            self.y,
            self.width.min(width - self.x),
            self.height.min(height - self.y),
        );
        (clipped.width > 0 && clipped.height > 0).then_some(clipped)
    }

    /// Map a rect in a `frame_width` x `frame_height` canonical frame into the
    /// rotated frame, counter-clockwise.
    fn rotate_within(&self, frame_width: u32, frame_height: u32, rotation: Rotation) -> PanelRect {
        match rotation {
            Rotation::Deg0 => *self,
            Rotation::Deg90 => PanelRect::new(
                self.y,
                frame_width - self.right(),
                self.height,
                self.width,
            ),
            Rotation::Deg180 => PanelRect::new(
                frame_width - self.right(),
                frame_height - self.bottom(),
                self.width,
                self.height,
            ),
            Rotation::Deg270 => PanelRect::new(
                frame_height - self.bottom(),
                self.x,
                self.height,
                self.width,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Console,
    Eye,
    Terminal,
    Slideshow,
    Waveform,
    Camera,
    System,
    /// Overlay covering the five grid panels while neural activity is shown.
    Brain,
}

impl PanelId {
    pub const ALL: [PanelId; 8] = [
        PanelId::Console,
        PanelId::Eye,
        PanelId::Terminal,
        PanelId::Slideshow,
        PanelId::Waveform,
        PanelId::Camera,
        PanelId::System,
        PanelId::Brain,
    ];

    /// Panels that partition the screen.
    pub const TILED: [PanelId; 7] = [
        PanelId::Console,
        PanelId::Eye,
        PanelId::Terminal,
        PanelId::Slideshow,
        PanelId::Waveform,
        PanelId::Camera,
        PanelId::System,
    ];

    /// Panels hidden behind the brain overlay.
    pub const GRID: [PanelId; 5] = [
        PanelId::Eye,
        PanelId::Terminal,
        PanelId::Slideshow,
        PanelId::Waveform,
        PanelId::Camera,
    ];

    pub fn is_expandable(self) -> bool {
        matches!(self, PanelId::Console | PanelId::Camera)
    }

    pub fn label(self) -> &'static str {
        match self {
            PanelId::Console => "console",
            PanelId::Eye => "eye",
            PanelId::Terminal => "terminal",
            PanelId::Slideshow => "slideshow",
            PanelId::Waveform => "waveform",
            PanelId::Camera => "camera",
            PanelId::System => "system",
            PanelId::Brain => "brain",
        }
    }

    pub fn index(self) -> usize {
        match self {
            PanelId::Console => 0,
            PanelId::Eye => 1,
            PanelId::Terminal => 2,
            PanelId::Slideshow => 3,
            PanelId::Waveform => 4,
            PanelId::Camera => 5,
            PanelId::System => 6,
            PanelId::Brain => 7,
        }
    }
}

/// A laid-out panel: where it lands on screen and the upright size its
/// renderer draws at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panel {
    pub id: PanelId,
    pub screen: PanelRect,
    pub canonical_width: u32,
    pub canonical_height: u32,
    pub rotation: Rotation,
}

impl Panel {
    fn place(
        id: PanelId,
        canonical: PanelRect,
        frame: (u32, u32),
        rotation: Rotation,
    ) -> Self {
        Self {
            id,
            screen: canonical.rotate_within(frame.0, frame.1, rotation),
            canonical_width: canonical.width,
            canonical_height: canonical.height,
            rotation,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.screen.contains(x, y)
    }

    /// Map a rect given in this panel's canonical coordinates to the screen.
    pub fn canonical_to_screen(&self, rect: PanelRect) -> Option<PanelRect> {
        let rect = rect.clipped_to(self.canonical_width, self.canonical_height)?;
        let (pw, ph) = (self.canonical_width, self.canonical_height);
        let (sx, sy) = (self.screen.x, self.screen.y);
        let mapped = match self.rotation {
            Rotation::Deg0 => PanelRect::new(sx + rect.x, sy + rect.y, rect.width, rect.height),
            Rotation::Deg90 => PanelRect::new(
                sx + rect.y,
                sy + (pw - rect.x - rect.width),
                rect.height,
                rect.width,
            ),
            Rotation::Deg180 => PanelRect::new(
                sx + (pw - rect.x - rect.width),
                sy + (ph - rect.y - rect.height),
                rect.width,
                rect.height,
            ),
            Rotation::Deg270 => PanelRect::new(
                sx + (ph - rect.y - rect.height),
                sy + rect.x,
                rect.height,
                rect.width,
            ),
        };
        Some(mapped)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardLayout {
    screen_width: u32,
    screen_height: u32,
    rotation: Rotation,
    scale: f32,
    panels: [Panel; 8],
}

impl DashboardLayout {
    pub fn compute(width: u32, height: u32, rotation: Rotation) -> Result<Self, EngineError> {
        if width < MIN_SCREEN_SIDE || height < MIN_SCREEN_SIDE {
            return Err(EngineError::ScreenTooSmall {
                width,
                height,
                min: MIN_SCREEN_SIDE,
            });
        }

        let scale = (width as f32 / BASE_WIDTH).min(height as f32 / BASE_HEIGHT);
        let bar_height = ((STATUS_BAR_BASE_HEIGHT * scale) as u32).max(1);
        let frame = if rotation.transposes() {
            (height, width)
        } else {
            (width, height)
        };
        let rects = if rotation.transposes() {
            stacked_rects(frame.0, frame.1, bar_height)
        } else {
            columned_rects(frame.0, frame.1, bar_height)
        };

        let panels = PanelId::ALL.map(|id| Panel::place(id, rects[id.index()], frame, rotation));
        Ok(Self {
            screen_width: width,
            screen_height: height,
            rotation,
            scale,
            panels,
        })
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Ratio of the screen to the 800x600 reference layout.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn panel(&self, id: PanelId) -> &Panel {
        &self.panels[id.index()]
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn tiled(&self) -> impl Iterator<Item = &Panel> {
        PanelId::TILED.into_iter().map(move |id| self.panel(id))
    }

    /// Tiled panel under a screen point.
    pub fn panel_at(&self, x: i32, y: i32) -> Option<PanelId> {
        self.tiled()
            .find(|panel| panel.contains(x, y))
            .map(|panel| panel.id)
    }

    /// Geometry of `id` when it fills the whole screen.
    pub fn expanded(&self, id: PanelId) -> Panel {
        let (canonical_width, canonical_height) = if self.rotation.transposes() {
            (self.screen_height, self.screen_width)
        } else {
            (self.screen_width, self.screen_height)
        };
        Panel {
            id,
            screen: PanelRect::new(0, 0, self.screen_width, self.screen_height),
            canonical_width,
            canonical_height,
            rotation: self.rotation,
        }
    }
}

/// Split `total` into `parts` runs; the last run absorbs the remainder.
fn split_evenly<const N: usize>(total: u32) -> [(u32, u32); N] {
    let base = total / N as u32;
    let mut runs = [(0, base); N];
    for (index, run) in runs.iter_mut().enumerate() {
        run.0 = base * index as u32;
    }
    runs[N - 1].1 = total - base * (N as u32 - 1);
    runs
}

/// Console column on the left, three-up and two-up rows on the right, status
/// bar under the rows. Indexed like `PanelId::index`.
fn columned_rects(width: u32, height: u32, bar_height: u32) -> [PanelRect; 8] {
    let console_width = (width / 2).clamp(1, width - 3);
    let right_width = width - console_width;
    let bar_height = bar_height.min(height - 2);
    let grid_height = height - bar_height;
    let top_height = grid_height / 2;
    let bottom_height = grid_height - top_height;

    let top = split_evenly::<3>(right_width);
    let bottom = split_evenly::<2>(right_width);
    let x0 = console_width;

    [
        PanelRect::new(0, 0, console_width, height),
        PanelRect::new(x0 + top[0].0, 0, top[0].1, top_height),
        PanelRect::new(x0 + top[1].0, 0, top[1].1, top_height),
        PanelRect::new(x0 + top[2].0, 0, top[2].1, top_height),
        PanelRect::new(x0 + bottom[0].0, top_height, bottom[0].1, bottom_height),
        PanelRect::new(x0 + bottom[1].0, top_height, bottom[1].1, bottom_height),
        PanelRect::new(x0, grid_height, right_width, bar_height),
        PanelRect::new(x0, 0, right_width, grid_height),
    ]
}

/// Console on top, then the three-up row, the two-up row and the status bar.
fn stacked_rects(width: u32, height: u32, bar_height: u32) -> [PanelRect; 8] {
    let mut console_height = height / 2;
    let mut bar_height = bar_height;
    if console_height + bar_height + 2 > height {
        bar_height = height.saturating_sub(console_height + 2).max(1);
        if console_height + bar_height + 2 > height {
            console_height = height - bar_height - 2;
        }
    }
    let grid_height = height - console_height - bar_height;
    let upper_height = grid_height / 2;
    let lower_height = grid_height - upper_height;
    let upper_y = console_height;
    let lower_y = console_height + upper_height;

    let upper = split_evenly::<3>(width);
    let lower = split_evenly::<2>(width);

    [
        PanelRect::new(0, 0, width, console_height),
        PanelRect::new(upper[0].0, upper_y, upper[0].1, upper_height),
        PanelRect::new(upper[1].0, upper_y, upper[1].1, upper_height),
        PanelRect::new(upper[2].0, upper_y, upper[2].1, upper_height),
        PanelRect::new(lower[0].0, lower_y, lower[0].1, lower_height),
        PanelRect::new(lower[1].0, lower_y, lower[1].1, lower_height),
        PanelRect::new(0, console_height + grid_height, width, bar_height),
        PanelRect::new(0, console_height, width, grid_height),
    ]
}
