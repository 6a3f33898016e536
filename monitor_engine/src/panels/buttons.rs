use anyhow::Result;

use super::{FrameContext, PanelRenderer};
use crate::canvas::{Canvas, Rgba};
use crate::layout::{Panel, PanelRect};

const BACKGROUND: Rgba = [0, 0, 0, 160];
const BUTTON_FILL: Rgba = [40, 40, 40, 220];
const BUTTON_BORDER: Rgba = [76, 194, 230, 255];
const LABEL_COLOR: Rgba = [220, 220, 220, 255];

/// Something the operator can ask the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Shutdown,
    CycleBackground,
}

/// Receiver of button actions. The display only signals intent.
pub trait ButtonHost {
    fn shutdown(&mut self);
    fn cycle_background(&mut self);
}

pub struct ButtonSpec {
    pub action: ButtonAction,
    pub label: &'static str,
    handler: fn(&mut dyn ButtonHost),
}

pub static BUTTONS: [ButtonSpec; 2] = [
    ButtonSpec {
        action: ButtonAction::Shutdown,
        label: "SHUTDOWN",
        handler: shutdown,
    },
    ButtonSpec {
        action: ButtonAction::CycleBackground,
        label: "BG",
        handler: cycle_background,
    },
];

fn shutdown(host: &mut dyn ButtonHost) {
    host.shutdown();
}

fn cycle_background(host: &mut dyn ButtonHost) {
    host.cycle_background();
}

pub fn dispatch(action: ButtonAction, host: &mut dyn ButtonHost) {
    if let Some(button) = BUTTONS.iter().find(|button| button.action == action) {
        log::info!("button {}", button.label);
        (button.handler)(host);
    }
}

/// Button rectangles in the panel's upright coordinates.
fn canonical_rects(width: u32, height: u32, scale: f32) -> Vec<(ButtonAction, PanelRect)> {
    let spacing = (140.0 * scale) as u32;
    let margin = (10.0 * scale) as u32;
    let button_width = (130.0 * scale) as u32;
    let button_height = height.saturating_sub((20.0 * scale) as u32);
    if button_width == 0 || button_height == 0 {
        return Vec::new();
    }
    BUTTONS
        .iter()
        .enumerate()
        .filter_map(|(index, button)| {
            let rect = PanelRect::new(margin + index as u32 * spacing, margin, button_width, button_height);
            rect.clipped_to(width, height).map(|rect| (button.action, rect))
        })
        .collect()
}

/// Screen-space hit boxes for the system panel's buttons.
pub fn button_rects(panel: &Panel, scale: f32) -> Vec<(ButtonAction, PanelRect)> {
    canonical_rects(panel.canonical_width, panel.canonical_height, scale)
        .into_iter()
        .filter_map(|(action, rect)| panel.canonical_to_screen(rect).map(|rect| (action, rect)))
        .collect()
}

pub fn button_at(panel: &Panel, scale: f32, x: i32, y: i32) -> Option<ButtonAction> {
    button_rects(panel, scale)
        .into_iter()
        .find(|(_, rect)| rect.contains(x, y))
        .map(|(action, _)| action)
}

/// The status bar with its action buttons.
#[derive(Debug, Default)]
pub struct ButtonBar;

impl ButtonBar {
    pub fn new() -> Self {
        Self
    }
}

impl PanelRenderer for ButtonBar {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let (w, h) = (canvas.width(), canvas.height());
        canvas.fill_rect(0, 0, w as i32, h as i32, BACKGROUND);
        let line_height = frame.typeface.line_height(frame.font_px) as i32;

        for (action, rect) in canonical_rects(w, h, frame.scale) {
            let label = BUTTONS
                .iter()
                .find(|button| button.action == action)
                .map(|button| button.label)
                .unwrap_or_default();
            let (x, y) = (rect.x as i32, rect.y as i32);
            let (bw, bh) = (rect.width as i32, rect.height as i32);
            canvas.fill_rect(x, y, bw, bh, BUTTON_FILL);
            canvas.stroke_rect(x, y, bw, bh, 1, BUTTON_BORDER);
            let text_width = frame.typeface.measure(label, frame.font_px) as i32;
            frame.typeface.draw(
                canvas,
                x + (bw - text_width) / 2,
                y + (bh - line_height) / 2,
                label,
                frame.font_px,
                LABEL_COLOR,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod button_tests {
    use super::*;
    use crate::layout::{DashboardLayout, PanelId, Rotation};

    #[derive(Default)]
    struct RecordingHost {
        shutdowns: u32,
        cycles: u32,
    }

    impl ButtonHost for RecordingHost {
        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }

        fn cycle_background(&mut self) {
            self.cycles += 1;
        }
    }

    #[test]
    fn dispatch_routes_to_the_matching_handler() {
        let mut host = RecordingHost::default();
        dispatch(ButtonAction::CycleBackground, &mut host);
        dispatch(ButtonAction::CycleBackground, &mut host);
        dispatch(ButtonAction::Shutdown, &mut host);
        assert_eq!((host.shutdowns, host.cycles), (1, 2));
    }

    #[test]
    fn upright_rects_follow_the_design_grid() {
        let rects = canonical_rects(800, 60, 1.0);
        assert_eq!(
            rects,
            vec![
                (ButtonAction::Shutdown, PanelRect::new(10, 10, 130, 40)),
                (ButtonAction::CycleBackground, PanelRect::new(150, 10, 130, 40)),
            ]
        );
    }

    #[test]
    fn hit_boxes_stay_inside_the_panel_for_every_rotation() {
        for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
            let (width, height) = if rotation.transposes() { (480, 800) } else { (800, 480) };
            let layout = DashboardLayout::compute(width, height, rotation).expect("layout");
            let panel = layout.panel(PanelId::System);
            let rects = button_rects(panel, layout.scale());
            assert_eq!(rects.len(), 2, "rotation {rotation:?}");
            for (action, rect) in rects {
                assert!(rect.x >= panel.screen.x && rect.right() <= panel.screen.right());
                assert!(rect.y >= panel.screen.y && rect.bottom() <= panel.screen.bottom());
                let (cx, cy) = ((rect.x + rect.width / 2) as i32, (rect.y + rect.height / 2) as i32);
                assert_eq!(button_at(panel, layout.scale(), cx, cy), Some(action));
            }
        }
    }

    #[test]
    fn rotated_hit_boxes_are_transposed() {
        let layout = DashboardLayout::compute(480, 800, Rotation::Deg90).expect("layout");
        let panel = layout.panel(PanelId::System);
        let upright = canonical_rects(panel.canonical_width, panel.canonical_height, layout.scale());
        let screen = button_rects(panel, layout.scale());
        for ((_, a), (_, b)) in upright.iter().zip(&screen) {
            assert_eq!((a.width, a.height), (b.height, b.width));
        }
    }

    #[test]
    fn nothing_hit_in_the_gap() {
        let layout = DashboardLayout::compute(800, 600, Rotation::Deg0).expect("layout");
        let panel = layout.panel(PanelId::System);
        let (x, y) = (panel.screen.x as i32 + 2, panel.screen.y as i32 + 2);
        assert_eq!(button_at(panel, layout.scale(), x, y), None);
    }
}
