use anyhow::Result;
use monitor_feed::{LogEntry, Severity, SILENCE_FRAMES_MAX};

use super::{FrameContext, PanelRenderer};
use crate::canvas::{with_alpha, Canvas, Rgba};
use crate::console::ConsoleLog;
use crate::text::Typeface;

const BACKGROUND: Rgba = [0, 0, 0, 160];
const BORDER: Rgba = [76, 194, 230, 255];
const TITLE: &str = "System Console";
const TITLE_COLOR: Rgba = [150, 150, 150, 255];
const PROGRESS_OUTLINE: Rgba = [100, 100, 100, 255];
const PROGRESS_FILL: Rgba = [0, 215, 90, 255];
const SCROLL_TRACK: Rgba = [60, 60, 60, 160];
/// Space reserved above the first log line for the title row.
const HEADER_HEIGHT: i32 = 40;
const SIDE_MARGIN: i32 = 20;

pub fn severity_color(severity: Severity) -> [u8; 3] {
    match severity {
        Severity::Tars => [76, 194, 230],
        Severity::Highlight => [0, 215, 90],
        Severity::User => [255, 255, 255],
        Severity::Info => [200, 200, 200],
        Severity::Debug => [100, 200, 100],
        Severity::Error => [255, 100, 100],
        Severity::System => [100, 100, 255],
    }
}

/// The scrolling message console.
#[derive(Debug, Default)]
pub struct ConsolePanel {
    log: ConsoleLog,
}

impl ConsolePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry, typeface: &Typeface) {
        self.log.push(entry, typeface);
    }

    pub fn log(&self) -> &ConsoleLog {
        &self.log
    }

    /// Wheel input; positive `lines` scrolls toward older entries.
    pub fn scroll(&mut self, lines: i32) {
        self.log.scroll_lines(-lines);
    }

    /// Wrap width and visible rows for a panel of the given canonical size.
    pub fn fit(&mut self, typeface: &Typeface, width: u32, height: u32, font_px: f32, scale: f32) {
        let line_height = line_height(font_px, scale);
        let wrap_width = (width as i32 - 2 * SIDE_MARGIN).max(1) as u32;
        let visible = ((height as i32 - HEADER_HEIGHT).max(0) / line_height) as usize;
        self.log.set_viewport(typeface, wrap_width, visible, font_px);
    }
}

fn line_height(font_px: f32, scale: f32) -> i32 {
    (font_px as i32 + (7.0 * scale) as i32).max(1)
}

impl PanelRenderer for ConsolePanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let (width, height) = (canvas.width(), canvas.height());
        self.fit(frame.typeface, width, height, frame.font_px, frame.scale);
        let (w, h) = (width as i32, height as i32);

        canvas.fill_rect(0, 0, w, h, BACKGROUND);
        canvas.stroke_rect(0, 0, w, h, frame.px(2.0).max(1), BORDER);
        let title_width =
            frame
                .typeface
                .draw(canvas, 10, 5, TITLE, frame.font_px, TITLE_COLOR) as i32;

        if frame.expanded {
            let x = 10 + title_width + 20;
            let bar_width = (w - x - 20).min(frame.px(200.0).max(40));
            draw_progress(canvas, x, 8, bar_width, frame.px(12.0).max(6), frame.silence_frames);
        }

        let line_height = line_height(frame.font_px, frame.scale);
        for (row, line) in self.log.window().iter().enumerate() {
            let y = HEADER_HEIGHT + row as i32 * line_height;
            let color = with_alpha(severity_color(line.severity), 255);
            frame
                .typeface
                .draw(canvas, SIDE_MARGIN, y, &line.text, frame.font_px, color);
        }

        if self.log.is_overflowing() {
            draw_scroll_indicator(canvas, &self.log, w, h);
        }
        Ok(())
    }
}

/// Silence countdown: filled share of `frames` out of the maximum.
pub(crate) fn draw_progress(canvas: &mut Canvas, x: i32, y: i32, width: i32, height: i32, frames: u32) {
    if width <= 2 || height <= 2 {
        return;
    }
    let share = frames.min(SILENCE_FRAMES_MAX) as f32 / SILENCE_FRAMES_MAX as f32;
    let filled = ((width - 2) as f32 * share) as i32;
    canvas.fill_rect(x + 1, y + 1, filled, height - 2, PROGRESS_FILL);
    canvas.stroke_rect(x, y, width, height, 1, PROGRESS_OUTLINE);
}

fn draw_scroll_indicator(canvas: &mut Canvas, log: &ConsoleLog, width: i32, height: i32) {
    let track_x = width - 8;
    let track_y = HEADER_HEIGHT;
    let track_height = (height - HEADER_HEIGHT - 6).max(1);
    canvas.fill_rect(track_x, track_y, 4, track_height, SCROLL_TRACK);

    let total = log.total_lines().max(1) as f32;
    let thumb_height = ((log.visible_lines() as f32 / total) * track_height as f32).max(4.0) as i32;
    let travel = (track_height - thumb_height).max(0) as f32;
    let position = if log.max_offset() == 0 {
        0.0
    } else {
        log.scroll_offset() as f32 / log.max_offset() as f32
    };
    let thumb_y = track_y + (travel * position) as i32;
    canvas.fill_rect(track_x, thumb_y, 4, thumb_height, BORDER);
}

#[cfg(test)]
mod console_panel_tests {
    use super::*;
    use crate::canvas::TRANSPARENT;

    fn frame<'a>(typeface: &'a Typeface, expanded: bool) -> FrameContext<'a> {
        FrameContext {
            typeface,
            terminal_typeface: typeface,
            font_px: 10.0,
            scale: 1.0,
            clock: 0.0,
            dt: 1.0 / 60.0,
            expanded,
            silence_frames: 10,
            spectrum: None,
        }
    }

    #[test]
    fn fit_derives_rows_from_height() {
        let typeface = Typeface::fallback();
        let mut panel = ConsolePanel::new();
        // line height 10 + 7 = 17, (210 - 40) / 17 = 10 rows
        panel.fit(&typeface, 400, 210, 10.0, 1.0);
        assert_eq!(panel.log().visible_lines(), 10);
    }

    #[test]
    fn lines_are_drawn_in_severity_colour() {
        let typeface = Typeface::fallback();
        let mut panel = ConsolePanel::new();
        let mut canvas = Canvas::new(300, 120);
        panel.render(&mut canvas, &frame(&typeface, false)).expect("render");
        panel.push(LogEntry::new("", "ERR", Severity::Error), &typeface);
        canvas.fill(TRANSPARENT);
        panel.render(&mut canvas, &frame(&typeface, false)).expect("render");
        let reddish = canvas
            .pixels()
            .chunks_exact(4)
            .any(|px| px[0] > 150 && px[1] < 100 && px[2] < 100 && px[3] > 100);
        assert!(reddish);
    }

    #[test]
    fn wheel_up_scrolls_back_when_overflowing() {
        let typeface = Typeface::fallback();
        let mut panel = ConsolePanel::new();
        panel.fit(&typeface, 400, 74, 10.0, 1.0);
        for index in 0..6 {
            panel.push(LogEntry::new("STT", format!("{index}"), Severity::User), &typeface);
        }
        let bottom = panel.log().scroll_offset();
        panel.scroll(1);
        assert_eq!(panel.log().scroll_offset(), bottom - 1);
    }

    #[test]
    fn expanded_console_shows_silence_progress() {
        let typeface = Typeface::fallback();
        let mut panel = ConsolePanel::new();
        let mut collapsed = Canvas::new(400, 100);
        let mut expanded = Canvas::new(400, 100);
        panel.render(&mut collapsed, &frame(&typeface, false)).expect("render");
        panel.render(&mut expanded, &frame(&typeface, true)).expect("render");
        let green = |canvas: &Canvas| {
            canvas
                .pixels()
                .chunks_exact(4)
                .filter(|px| px[0] == 0 && px[1] == 215 && px[2] == 90)
                .count()
        };
        assert_eq!(green(&collapsed), 0);
        assert!(green(&expanded) > 0);
    }
}
